//! Domain types for tassa.
//!
//! Desired-state records mirror the configuration document and are keyed by
//! friendly name. Remote records mirror what the task-routing API reports and
//! additionally carry the remote-assigned [`Sid`].
//!
//! Every type serializes with camelCase keys, the casing of the document.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifier prefix of workspace root resources.
pub const WORKSPACE_SID_PREFIX: &str = "WS";
/// Identifier prefix of activities.
pub const ACTIVITY_SID_PREFIX: &str = "WA";
/// Identifier prefix of task queues.
pub const TASK_QUEUE_SID_PREFIX: &str = "WQ";
/// Identifier prefix of workflows.
pub const WORKFLOW_SID_PREFIX: &str = "WW";
/// Identifier prefix of workers.
pub const WORKER_SID_PREFIX: &str = "WK";

/// A remote-assigned resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sid(pub String);

impl Sid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Sid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Sid {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// How a document names its target workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceRef {
    /// Explicit remote identifier; used as-is.
    Sid(Sid),
    /// Friendly name; looked up, and created when absent.
    Name(String),
}

impl fmt::Display for WorkspaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceRef::Sid(sid) => write!(f, "{sid}"),
            WorkspaceRef::Name(name) => write!(f, "'{name}'"),
        }
    }
}

// ---------------------------------------------------------------------------
// Resource kinds
// ---------------------------------------------------------------------------

/// The four workspace-scoped resource kinds, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Activity,
    TaskQueue,
    Workflow,
    Worker,
}

impl ResourceKind {
    /// All kinds in the order reconciliation visits them.
    pub fn all() -> &'static [ResourceKind] {
        &[
            ResourceKind::Activity,
            ResourceKind::TaskQueue,
            ResourceKind::Workflow,
            ResourceKind::Worker,
        ]
    }

    pub fn sid_prefix(self) -> &'static str {
        match self {
            ResourceKind::Activity => ACTIVITY_SID_PREFIX,
            ResourceKind::TaskQueue => TASK_QUEUE_SID_PREFIX,
            ResourceKind::Workflow => WORKFLOW_SID_PREFIX,
            ResourceKind::Worker => WORKER_SID_PREFIX,
        }
    }

    /// Key of this kind's collection in the document and in results.
    pub fn collection_key(self) -> &'static str {
        match self {
            ResourceKind::Activity => "activities",
            ResourceKind::TaskQueue => "taskQueues",
            ResourceKind::Workflow => "workflows",
            ResourceKind::Worker => "workers",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Activity => write!(f, "activity"),
            ResourceKind::TaskQueue => write!(f, "task queue"),
            ResourceKind::Workflow => write!(f, "workflow"),
            ResourceKind::Worker => write!(f, "worker"),
        }
    }
}

/// Anything keyed by friendly name within its kind.
pub trait Named {
    fn friendly_name(&self) -> &str;
}

/// A remote record that carries its identifier.
pub trait Identified: Named {
    fn sid(&self) -> &Sid;
}

// ---------------------------------------------------------------------------
// Desired state
// ---------------------------------------------------------------------------

/// Top-level workspace properties. Every field is optional; only declared
/// fields are ever written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_task_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_activity_sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prioritize_queue_order: Option<String>,
}

impl Settings {
    /// `true` when no field is declared.
    pub fn is_empty(&self) -> bool {
        self == &Settings::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySpec {
    pub friendly_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Desired task queue. Activities are referenced by friendly name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueueSpec {
    pub friendly_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_workers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reserved_workers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_order: Option<String>,
    /// Empty string clears the reference on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_activity_name: Option<String>,
    /// Empty string clears the reference on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_activity_name: Option<String>,
}

/// Desired workflow. `configuration` embeds task queues by friendly name
/// under `queue` keys at any depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpec {
    pub friendly_name: String,
    pub configuration: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_reservation_timeout: Option<u64>,
}

/// Desired worker. There is deliberately no activity field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSpec {
    pub friendly_name: String,
    /// JSON-encoded attribute object, treated as opaque text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<String>,
}

/// A validated desired-state document.
///
/// A collection set to `None` was absent from the document and leaves that
/// kind untouched; `Some(vec![])` declares that no resource of the kind
/// should exist.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredConfig {
    pub workspace: WorkspaceRef,
    pub settings: Option<Settings>,
    pub activities: Option<Vec<ActivitySpec>>,
    pub task_queues: Option<Vec<TaskQueueSpec>>,
    pub workflows: Option<Vec<WorkflowSpec>>,
    pub workers: Option<Vec<WorkerSpec>>,
}

impl DesiredConfig {
    /// An empty document targeting `workspace`.
    pub fn for_workspace(workspace: WorkspaceRef) -> Self {
        Self {
            workspace,
            settings: None,
            activities: None,
            task_queues: None,
            workflows: None,
            workers: None,
        }
    }

    /// Friendly name of the target workspace, when the document names one.
    pub fn workspace_name(&self) -> Option<&str> {
        match &self.workspace {
            WorkspaceRef::Name(name) => Some(name),
            WorkspaceRef::Sid(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Observed state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWorkspace {
    pub sid: Sid,
    pub friendly_name: String,
    pub event_callback_url: Option<String>,
    pub events_filter: Option<String>,
    pub multi_task_enabled: bool,
    pub timeout_activity_sid: Option<Sid>,
    pub prioritize_queue_order: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteActivity {
    pub sid: Sid,
    pub friendly_name: String,
    pub available: bool,
    pub timeout: Option<u64>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTaskQueue {
    pub sid: Sid,
    pub friendly_name: String,
    pub target_workers: Option<String>,
    pub max_reserved_workers: Option<u64>,
    pub task_order: Option<String>,
    pub assignment_activity_sid: Option<Sid>,
    pub reservation_activity_sid: Option<Sid>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWorkflow {
    pub sid: Sid,
    pub friendly_name: String,
    /// Routing configuration as the remote stores it: JSON text.
    pub configuration: String,
    pub task_reservation_timeout: Option<u64>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWorker {
    pub sid: Sid,
    pub friendly_name: String,
    pub attributes: String,
    /// Live assignment; owned by the routing backend, never by tassa.
    pub activity_sid: Option<Sid>,
    pub activity_name: Option<String>,
    pub available: bool,
    pub date_created: Option<DateTime<Utc>>,
    pub date_updated: Option<DateTime<Utc>>,
}

macro_rules! impl_named {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Named for $ty {
                fn friendly_name(&self) -> &str {
                    &self.friendly_name
                }
            }
        )*
    };
}

macro_rules! impl_identified {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identified for $ty {
                fn sid(&self) -> &Sid {
                    &self.sid
                }
            }
        )*
    };
}

impl_named!(
    ActivitySpec,
    TaskQueueSpec,
    WorkflowSpec,
    WorkerSpec,
    RemoteWorkspace,
    RemoteActivity,
    RemoteTaskQueue,
    RemoteWorkflow,
    RemoteWorker,
);

impl_identified!(
    RemoteWorkspace,
    RemoteActivity,
    RemoteTaskQueue,
    RemoteWorkflow,
    RemoteWorker,
);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sid_display_and_equality() {
        assert_eq!(Sid::from("WQ123").to_string(), "WQ123");
        assert_eq!(Sid::from("WQ1"), Sid::from(String::from("WQ1")));
    }

    #[test]
    fn kinds_are_in_dependency_order() {
        assert_eq!(
            ResourceKind::all(),
            &[
                ResourceKind::Activity,
                ResourceKind::TaskQueue,
                ResourceKind::Workflow,
                ResourceKind::Worker
            ]
        );
        assert_eq!(ResourceKind::TaskQueue.sid_prefix(), "WQ");
        assert_eq!(ResourceKind::TaskQueue.collection_key(), "taskQueues");
    }

    #[test]
    fn settings_is_empty_only_without_declared_fields() {
        assert!(Settings::default().is_empty());
        let settings = Settings {
            multi_task_enabled: Some(false),
            ..Settings::default()
        };
        assert!(!settings.is_empty());
    }

    #[test]
    fn specs_use_camel_case_on_the_wire() {
        let queue: TaskQueueSpec = serde_json::from_value(json!({
            "friendlyName": "Sales",
            "maxReservedWorkers": 2,
            "assignmentActivityName": "Busy"
        }))
        .expect("deserialize");
        assert_eq!(queue.max_reserved_workers, Some(2));
        assert_eq!(queue.assignment_activity_name.as_deref(), Some("Busy"));

        let back = serde_json::to_value(&queue).expect("serialize");
        assert_eq!(back["friendlyName"], "Sales");
        assert!(back.get("taskOrder").is_none(), "absent fields stay absent");
    }

    #[test]
    fn workspace_ref_display() {
        assert_eq!(WorkspaceRef::Sid(Sid::from("WS1")).to_string(), "WS1");
        assert_eq!(WorkspaceRef::Name("Support".into()).to_string(), "'Support'");
    }
}
