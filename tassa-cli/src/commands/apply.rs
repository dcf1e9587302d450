//! `tassa apply <file>`: reconcile a workspace against a document.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use tassa_core::ResourceKind;
use tassa_sync::{ReconcileOptions, ReconciliationResult, WorkspaceReconciler};

use super::{load_document, RemoteArgs};

/// Arguments for `tassa apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Desired-state document (`.json`, `.yaml` or `.yml`).
    pub file: PathBuf,

    /// Plan the changes without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the reconciliation result as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

impl ApplyArgs {
    pub fn run(self) -> Result<()> {
        let config = load_document(&self.file)?;
        let api = self.remote.connect()?;
        let options = ReconcileOptions {
            dry_run: self.dry_run,
        };

        match WorkspaceReconciler::with_options(&api, options).reconcile(&config) {
            Ok(result) => self.report(&result),
            Err(err) => {
                if let Some(partial) = err.partial() {
                    println!("{}", "Applied before the failure:".yellow().bold());
                    self.report(partial)?;
                }
                Err(anyhow::Error::new(err)
                    .context(format!("apply failed for {}", self.file.display())))
            }
        }
    }

    fn report(&self, result: &ReconciliationResult) -> Result<()> {
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(result).context("failed to serialize result JSON")?
            );
            return Ok(());
        }
        print_result(result);
        Ok(())
    }
}

#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "added")]
    added: usize,
    #[tabled(rename = "updated")]
    updated: usize,
    #[tabled(rename = "deleted")]
    deleted: usize,
}

pub(crate) fn workspace_label(result: &ReconciliationResult) -> String {
    match (&result.workspace_name, &result.workspace_sid) {
        (Some(name), Some(sid)) => format!("'{name}' ({sid})"),
        (Some(name), None) => format!("'{name}'"),
        (None, Some(sid)) => sid.to_string(),
        (None, None) => "<unknown>".to_string(),
    }
}

fn print_result(result: &ReconciliationResult) {
    let prefix = if result.dry_run { "[dry-run] " } else { "" };
    let workspace = workspace_label(result);

    if result.is_converged() {
        println!("{prefix}✓ {workspace} is up to date");
    } else {
        println!("{prefix}✓ {workspace} reconciled");
        if result.workspace_created {
            println!("  + workspace created");
        }
        if result.settings.updated {
            println!("  ~ settings updated");
        }

        let rows: Vec<KindRow> = ResourceKind::all()
            .iter()
            .map(|&kind| {
                let diff = result.diff(kind);
                KindRow {
                    kind: kind.to_string(),
                    added: diff.added.len(),
                    updated: diff.updated.len(),
                    deleted: diff.deleted.len(),
                }
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");

        for &kind in ResourceKind::all() {
            let diff = result.diff(kind);
            for name in &diff.added {
                println!("  {} {kind} '{name}'", "+".green().bold());
            }
            for name in &diff.updated {
                println!("  {} {kind} '{name}'", "~".yellow().bold());
            }
            for name in &diff.deleted {
                println!("  {} {kind} '{name}'", "-".red().bold());
            }
        }
    }

    for warning in &result.warnings {
        println!(
            "  {} {} '{}': {}",
            "!".yellow().bold(),
            warning.kind,
            warning.resource,
            warning.message
        );
    }
}
