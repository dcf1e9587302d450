pub mod apply;
pub mod diff;
pub mod profile;
pub mod show;
pub mod validate;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use tassa_core::{document, profile as stored, ConfigError, DesiredConfig};

use crate::remote::RestTaskRouter;

/// Credential overrides shared by every command that talks to the remote.
///
/// Flags win over environment variables, which win over the stored profile.
#[derive(Args, Debug, Default)]
pub struct RemoteArgs {
    /// Account SID (overrides the stored profile).
    #[arg(long, env = "TASSA_ACCOUNT_SID")]
    pub account_sid: Option<String>,

    /// Auth token (overrides the stored profile).
    #[arg(long, env = "TASSA_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// API base URL (overrides the stored profile).
    #[arg(long, env = "TASSA_BASE_URL")]
    pub base_url: Option<String>,
}

impl RemoteArgs {
    pub fn profile(&self) -> Result<stored::Profile> {
        let saved = match stored::load() {
            Ok(profile) => Some(profile),
            Err(ConfigError::ProfileNotFound { .. }) => None,
            Err(e) => return Err(e).context("failed to load credential profile"),
        };

        let account_sid = self
            .account_sid
            .clone()
            .or_else(|| saved.as_ref().map(|p| p.account_sid.clone()));
        let auth_token = self
            .auth_token
            .clone()
            .or_else(|| saved.as_ref().map(|p| p.auth_token.clone()));
        let (Some(account_sid), Some(auth_token)) = (account_sid, auth_token) else {
            bail!(
                "no credentials configured; run `tassa profile set` or pass \
                 --account-sid and --auth-token"
            );
        };

        Ok(stored::Profile {
            account_sid,
            auth_token,
            base_url: self
                .base_url
                .clone()
                .or_else(|| saved.as_ref().and_then(|p| p.base_url.clone())),
            timeout_secs: saved.as_ref().and_then(|p| p.timeout_secs),
        })
    }

    pub fn connect(&self) -> Result<RestTaskRouter> {
        let profile = self.profile()?;
        tracing::debug!("connecting to {} as {}", profile.base_url(), profile.account_sid);
        Ok(RestTaskRouter::new(&profile))
    }
}

/// Read and validate a document before anything talks to the remote.
/// Violations go to stdout, one per line.
pub fn load_document(path: &Path) -> Result<DesiredConfig> {
    let shown = path.display();
    match document::load_path(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::Invalid { errors }) => {
            for error in &errors {
                println!("  {} {error}", "✗".red().bold());
            }
            bail!("{shown} is invalid ({} problem(s))", errors.len())
        }
        Err(e) => Err(e).with_context(|| format!("failed to read {shown}")),
    }
}
