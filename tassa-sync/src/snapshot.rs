//! Read-only view of a whole workspace.

use serde::Serialize;

use tassa_core::{
    RemoteActivity, RemoteTaskQueue, RemoteWorker, RemoteWorkflow, RemoteWorkspace, Sid,
    WorkspaceRef,
};

use crate::api::TaskRouterApi;
use crate::error::{remote_err, workspace_err, SyncError};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    pub workspace: RemoteWorkspace,
    pub activities: Vec<RemoteActivity>,
    pub task_queues: Vec<RemoteTaskQueue>,
    pub workflows: Vec<RemoteWorkflow>,
    pub workers: Vec<RemoteWorker>,
}

impl WorkspaceSnapshot {
    /// Friendly name of the activity with identifier `sid`.
    pub fn activity_name(&self, sid: &Sid) -> Option<&str> {
        self.activities
            .iter()
            .find(|a| &a.sid == sid)
            .map(|a| a.friendly_name.as_str())
    }
}

/// Read the root resource and every resource of the four kinds.
pub fn snapshot<A: TaskRouterApi + ?Sized>(
    api: &A,
    target: &WorkspaceRef,
) -> Result<WorkspaceSnapshot, SyncError> {
    let workspace = match target {
        WorkspaceRef::Sid(sid) => api
            .fetch_workspace(sid)
            .map_err(workspace_err(sid, "fetch workspace"))?,
        WorkspaceRef::Name(name) => api
            .find_workspaces(name)
            .map_err(remote_err(format!("look up workspace '{name}'")))?
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::WorkspaceNotFound {
                workspace: target.to_string(),
            })?,
    };

    let sid = &workspace.sid;
    let activities = api
        .list_activities(sid)
        .map_err(workspace_err(sid, "list activities"))?;
    let task_queues = api
        .list_task_queues(sid)
        .map_err(workspace_err(sid, "list task queues"))?;
    let workflows = api
        .list_workflows(sid)
        .map_err(workspace_err(sid, "list workflows"))?;
    let workers = api
        .list_workers(sid)
        .map_err(workspace_err(sid, "list workers"))?;

    Ok(WorkspaceSnapshot {
        workspace,
        activities,
        task_queues,
        workflows,
        workers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTaskRouter;

    #[test]
    fn snapshot_by_name_and_by_sid_agree() {
        let api = InMemoryTaskRouter::new();
        let ws = api.seed_workspace("Support");
        let offline = api.seed_activity(&ws, "Offline", false);
        api.seed_task_queue(&ws, "Sales");
        api.seed_worker(&ws, "Alice", "{}", Some(&offline));

        let by_name = snapshot(&api, &WorkspaceRef::Name("Support".into())).unwrap();
        let by_sid = snapshot(&api, &WorkspaceRef::Sid(ws.clone())).unwrap();

        assert_eq!(by_name.workspace.sid, ws);
        assert_eq!(by_sid.workers, by_name.workers);
        assert_eq!(by_name.task_queues.len(), 1);
        assert_eq!(by_name.activity_name(&offline), Some("Offline"));
        assert_eq!(by_name.workers[0].activity_name.as_deref(), Some("Offline"));
    }

    #[test]
    fn unknown_name_is_workspace_not_found() {
        let api = InMemoryTaskRouter::new();
        let err = snapshot(&api, &WorkspaceRef::Name("Nowhere".into())).unwrap_err();
        assert!(err.is_workspace_not_found());
        assert_eq!(err.to_string(), "workspace 'Nowhere' not found");
    }

    #[test]
    fn unknown_sid_is_workspace_not_found() {
        let api = InMemoryTaskRouter::new();
        let err = snapshot(&api, &WorkspaceRef::Sid(Sid::from("WSnope"))).unwrap_err();
        assert!(err.is_workspace_not_found());
    }
}
