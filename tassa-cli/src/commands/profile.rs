//! `tassa profile set` and `tassa profile show`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use tassa_core::profile::{self, Profile};

/// Manage the stored credential profile.
#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Store credentials in `~/.tassa/profile.yaml`.
    Set(SetArgs),

    /// Print the stored profile with the token masked.
    Show,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Account SID.
    #[arg(long)]
    pub account_sid: String,

    /// Auth token.
    #[arg(long)]
    pub auth_token: String,

    /// API base URL; defaults to the public endpoint.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

pub fn run(cmd: ProfileCommand) -> Result<()> {
    match cmd {
        ProfileCommand::Set(args) => set(args),
        ProfileCommand::Show => show(),
    }
}

fn set(args: SetArgs) -> Result<()> {
    let profile = Profile {
        account_sid: args.account_sid,
        auth_token: args.auth_token,
        base_url: args.base_url,
        timeout_secs: args.timeout_secs,
    };
    let path = profile::save(&profile).context("failed to save profile")?;
    println!("✓ Saved profile to {}", path.display());
    Ok(())
}

fn show() -> Result<()> {
    let profile = profile::load().context("no profile stored; run `tassa profile set` first")?;
    println!("account sid:  {}", profile.account_sid);
    println!("auth token:   {}", profile.masked_token());
    println!("base url:     {}", profile.base_url());
    println!("timeout:      {}s", profile.timeout_secs());
    Ok(())
}
