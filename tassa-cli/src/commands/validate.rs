//! `tassa validate <file>`: structural checks, no remote calls.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use tassa_core::DesiredConfig;

use super::load_document;

/// Arguments for `tassa validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Desired-state document (`.json`, `.yaml` or `.yml`).
    pub file: PathBuf,
}

impl ValidateArgs {
    pub fn run(self) -> Result<()> {
        let config = load_document(&self.file)?;
        println!("✓ {} is valid", self.file.display());
        println!("  {}", summary(&config));
        Ok(())
    }
}

fn summary(config: &DesiredConfig) -> String {
    fn count<T>(items: &Option<Vec<T>>) -> String {
        items
            .as_ref()
            .map_or_else(|| "-".to_string(), |v| v.len().to_string())
    }
    format!(
        "workspace {} | {} activities | {} task queues | {} workflows | {} workers",
        config.workspace,
        count(&config.activities),
        count(&config.task_queues),
        count(&config.workflows),
        count(&config.workers),
    )
}
