//! `tassa diff <file>`: field-level differences, nothing is written.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;

use tassa_core::ResourceKind;
use tassa_sync::{
    diff::render_unified, settings::declared_fields, FieldChange, ReconcileOptions,
    WorkspaceReconciler,
};

use super::{apply::workspace_label, load_document, RemoteArgs};

/// Arguments for `tassa diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Desired-state document (`.json`, `.yaml` or `.yml`).
    pub file: PathBuf,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let config = load_document(&self.file)?;
        let api = self.remote.connect()?;

        let result = WorkspaceReconciler::with_options(&api, ReconcileOptions { dry_run: true })
            .reconcile(&config)
            .with_context(|| format!("diff failed for {}", self.file.display()))?;

        let workspace = workspace_label(&result);
        if result.is_converged() {
            println!("No differences for workspace {workspace}.");
        } else {
            println!("Workspace {workspace}");
            if result.workspace_created {
                println!("{} workspace {workspace}", "+".green().bold());
            }
            if result.settings.updated {
                if let Some(settings) = &config.settings {
                    println!(
                        "{} settings ({})",
                        "~".yellow().bold(),
                        declared_fields(settings).join(", ")
                    );
                }
            }
            for &kind in ResourceKind::all() {
                let Some(plan) = result.plan(kind) else {
                    continue;
                };
                for name in &plan.added {
                    println!("{} {kind} '{name}'", "+".green().bold());
                }
                for update in &plan.updated {
                    println!("{} {kind} '{}'", "~".yellow().bold(), update.name);
                    for change in &update.changes {
                        print_change(kind, &update.name, change);
                    }
                }
                for name in &plan.deleted {
                    println!("{} {kind} '{name}'", "-".red().bold());
                }
            }
        }

        for warning in &result.warnings {
            println!(
                "{} {} '{}': {}",
                "!".yellow().bold(),
                warning.kind,
                warning.resource,
                warning.message
            );
        }
        Ok(())
    }
}

fn print_change(kind: ResourceKind, name: &str, change: &FieldChange) {
    if kind == ResourceKind::Workflow && change.field == "configuration" {
        let unified = render_unified(
            &format!("workflows/{name}"),
            &change.current,
            &change.desired,
        );
        for line in unified.lines() {
            println!("    {}", colorize(line));
        }
        return;
    }
    println!(
        "    {}: {} → {}",
        change.field,
        display(&change.current).red(),
        display(&change.desired).green()
    );
}

fn colorize(line: &str) -> String {
    if line.starts_with("+++") || line.starts_with("---") {
        line.bold().to_string()
    } else if line.starts_with('+') {
        line.green().to_string()
    } else if line.starts_with('-') {
        line.red().to_string()
    } else if line.starts_with("@@") {
        line.cyan().to_string()
    } else {
        line.to_string()
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => "(none)".to_string(),
        Value::String(s) => format!("{s:?}"),
        other => other.to_string(),
    }
}
