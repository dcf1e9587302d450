//! `tassa show`: read-only listing of a workspace.

use anyhow::{Context, Result};
use clap::{ArgGroup, Args};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use tassa_core::{Sid, WorkspaceRef};
use tassa_sync::{snapshot::snapshot, WorkspaceSnapshot};

use super::RemoteArgs;

/// Arguments for `tassa show`.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["sid", "name"])))]
pub struct ShowArgs {
    /// Workspace SID.
    #[arg(long)]
    pub sid: Option<String>,

    /// Workspace friendly name.
    #[arg(long)]
    pub name: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

impl ShowArgs {
    pub fn run(self) -> Result<()> {
        let target = match (&self.sid, &self.name) {
            (Some(sid), _) => WorkspaceRef::Sid(Sid::from(sid.as_str())),
            (None, Some(name)) => WorkspaceRef::Name(name.clone()),
            (None, None) => anyhow::bail!("provide --sid or --name"),
        };
        let api = self.remote.connect()?;
        let snap = snapshot(&api, &target)
            .with_context(|| format!("failed to read workspace {target}"))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&snap).context("failed to serialize workspace JSON")?
            );
            return Ok(());
        }
        print_snapshot(&snap);
        Ok(())
    }
}

#[derive(Tabled)]
struct ActivityRow {
    #[tabled(rename = "activity")]
    name: String,
    #[tabled(rename = "available")]
    available: bool,
    #[tabled(rename = "sid")]
    sid: String,
}

#[derive(Tabled)]
struct TaskQueueRow {
    #[tabled(rename = "task queue")]
    name: String,
    #[tabled(rename = "target workers")]
    target_workers: String,
    #[tabled(rename = "order")]
    task_order: String,
    #[tabled(rename = "assignment")]
    assignment: String,
    #[tabled(rename = "reservation")]
    reservation: String,
}

#[derive(Tabled)]
struct WorkflowRow {
    #[tabled(rename = "workflow")]
    name: String,
    #[tabled(rename = "reservation timeout")]
    timeout: String,
    #[tabled(rename = "sid")]
    sid: String,
}

#[derive(Tabled)]
struct WorkerRow {
    #[tabled(rename = "worker")]
    name: String,
    #[tabled(rename = "activity")]
    activity: String,
    #[tabled(rename = "attributes")]
    attributes: String,
}

fn print_snapshot(snap: &WorkspaceSnapshot) {
    let ws = &snap.workspace;
    println!(
        "{} ({}) | {} activities | {} task queues | {} workflows | {} workers",
        ws.friendly_name.bold(),
        ws.sid,
        snap.activities.len(),
        snap.task_queues.len(),
        snap.workflows.len(),
        snap.workers.len(),
    );
    if let Some(url) = &ws.event_callback_url {
        println!("  event callback: {url}");
    }
    println!("  multi-tasking: {}", ws.multi_task_enabled);

    let activity = |sid: &Option<Sid>| -> String {
        match sid {
            Some(sid) => snap.activity_name(sid).unwrap_or(sid.as_str()).to_string(),
            None => "-".to_string(),
        }
    };
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    print_table(
        snap.activities
            .iter()
            .map(|a| ActivityRow {
                name: a.friendly_name.clone(),
                available: a.available,
                sid: a.sid.to_string(),
            })
            .collect(),
    );
    print_table(
        snap.task_queues
            .iter()
            .map(|q| TaskQueueRow {
                name: q.friendly_name.clone(),
                target_workers: or_dash(&q.target_workers),
                task_order: or_dash(&q.task_order),
                assignment: activity(&q.assignment_activity_sid),
                reservation: activity(&q.reservation_activity_sid),
            })
            .collect(),
    );
    print_table(
        snap.workflows
            .iter()
            .map(|w| WorkflowRow {
                name: w.friendly_name.clone(),
                timeout: w
                    .task_reservation_timeout
                    .map_or_else(|| "-".to_string(), |t| format!("{t}s")),
                sid: w.sid.to_string(),
            })
            .collect(),
    );
    print_table(
        snap.workers
            .iter()
            .map(|w| WorkerRow {
                name: w.friendly_name.clone(),
                activity: w
                    .activity_name
                    .clone()
                    .unwrap_or_else(|| activity(&w.activity_sid)),
                attributes: w.attributes.clone(),
            })
            .collect(),
    );
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
