//! The remote resource-management seam.
//!
//! [`TaskRouterApi`] is the only way the engine talks to the routing backend.
//! Every call is a blocking request/response; implementations own transport,
//! authentication and request timeouts.
//!
//! Payload structs carry only what the caller declares: `None` fields are not
//! sent, so the remote keeps its current value.

use serde::Serialize;

use tassa_core::{
    RemoteActivity, RemoteTaskQueue, RemoteWorker, RemoteWorkflow, RemoteWorkspace, Settings,
    Sid,
};

use crate::error::RemoteError;

/// Per-kind CRUD plus workspace operations.
pub trait TaskRouterApi {
    fn fetch_workspace(&self, workspace: &Sid) -> Result<RemoteWorkspace, RemoteError>;
    /// All workspaces whose friendly name equals `friendly_name`.
    fn find_workspaces(&self, friendly_name: &str) -> Result<Vec<RemoteWorkspace>, RemoteError>;
    fn create_workspace(&self, params: &WorkspaceParams) -> Result<RemoteWorkspace, RemoteError>;
    fn update_workspace(
        &self,
        workspace: &Sid,
        params: &WorkspaceParams,
    ) -> Result<RemoteWorkspace, RemoteError>;

    fn list_activities(&self, workspace: &Sid) -> Result<Vec<RemoteActivity>, RemoteError>;
    fn create_activity(
        &self,
        workspace: &Sid,
        params: &ActivityParams,
    ) -> Result<RemoteActivity, RemoteError>;
    fn update_activity(
        &self,
        workspace: &Sid,
        activity: &Sid,
        params: &ActivityParams,
    ) -> Result<RemoteActivity, RemoteError>;
    fn remove_activity(&self, workspace: &Sid, activity: &Sid) -> Result<(), RemoteError>;

    fn list_task_queues(&self, workspace: &Sid) -> Result<Vec<RemoteTaskQueue>, RemoteError>;
    fn create_task_queue(
        &self,
        workspace: &Sid,
        params: &TaskQueueParams,
    ) -> Result<RemoteTaskQueue, RemoteError>;
    fn update_task_queue(
        &self,
        workspace: &Sid,
        queue: &Sid,
        params: &TaskQueueParams,
    ) -> Result<RemoteTaskQueue, RemoteError>;
    fn remove_task_queue(&self, workspace: &Sid, queue: &Sid) -> Result<(), RemoteError>;

    fn list_workflows(&self, workspace: &Sid) -> Result<Vec<RemoteWorkflow>, RemoteError>;
    fn create_workflow(
        &self,
        workspace: &Sid,
        params: &WorkflowParams,
    ) -> Result<RemoteWorkflow, RemoteError>;
    fn update_workflow(
        &self,
        workspace: &Sid,
        workflow: &Sid,
        params: &WorkflowParams,
    ) -> Result<RemoteWorkflow, RemoteError>;
    fn remove_workflow(&self, workspace: &Sid, workflow: &Sid) -> Result<(), RemoteError>;

    fn list_workers(&self, workspace: &Sid) -> Result<Vec<RemoteWorker>, RemoteError>;
    fn create_worker(&self, workspace: &Sid, params: &NewWorker)
        -> Result<RemoteWorker, RemoteError>;
    /// There is no way to pass an activity here: existing workers keep
    /// whatever activity the routing backend has them in.
    fn update_worker(
        &self,
        workspace: &Sid,
        worker: &Sid,
        params: &WorkerUpdate,
    ) -> Result<RemoteWorker, RemoteError>;
    fn remove_worker(&self, workspace: &Sid, worker: &Sid) -> Result<(), RemoteError>;
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Workspace create/update payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_callback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_task_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_activity_sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prioritize_queue_order: Option<String>,
}

impl WorkspaceParams {
    /// Sparse update carrying exactly the declared settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            friendly_name: None,
            event_callback_url: settings.event_callback_url.clone(),
            events_filter: settings.events_filter.clone(),
            multi_task_enabled: settings.multi_task_enabled,
            timeout_activity_sid: settings.timeout_activity_sid.clone(),
            prioritize_queue_order: settings.prioritize_queue_order.clone(),
        }
    }

    /// Creation payload for a new workspace root resource. The timeout
    /// activity is left out: a new workspace has no activity to point at.
    pub fn for_creation(friendly_name: &str, settings: Option<&Settings>) -> Self {
        let mut params = settings.map(Self::from_settings).unwrap_or_default();
        params.friendly_name = Some(friendly_name.to_string());
        params.timeout_activity_sid = None;
        params
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// An activity reference to write on a task queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActivityReference {
    Set(Sid),
    /// Serialized as `null`.
    Clear,
}

impl ActivityReference {
    pub fn sid(&self) -> Option<&Sid> {
        match self {
            ActivityReference::Set(sid) => Some(sid),
            ActivityReference::Clear => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueueParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_workers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_reserved_workers: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_order: Option<String>,
    #[serde(rename = "assignmentActivitySid", skip_serializing_if = "Option::is_none")]
    pub assignment_activity: Option<ActivityReference>,
    #[serde(rename = "reservationActivitySid", skip_serializing_if = "Option::is_none")]
    pub reservation_activity: Option<ActivityReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    /// Routing configuration as JSON text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_reservation_timeout: Option<u64>,
}

/// Creation payload for a worker; the only place an activity is ever set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorker {
    pub friendly_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_sid: Option<Sid>,
}

/// Update payload for an existing worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<String>,
}
