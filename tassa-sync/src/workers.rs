//! Worker synchronization.
//!
//! Only `attributes` is ever compared or written on an existing worker. A
//! worker's activity belongs to the routing backend (it tracks live calls
//! and tasks); the only activity this module ever sends is the starting
//! activity of a newly created worker.

use serde_json::Value;

use tassa_core::{RemoteWorker, ResourceKind, Sid, WorkerSpec};

use crate::api::{NewWorker, TaskRouterApi, WorkerUpdate};
use crate::diff::FieldChange;
use crate::error::{remote_err, workspace_err, SyncError};
use crate::index::NameIndex;
use crate::resolver::ReferenceResolver;
use crate::synchronizer::{ResourceSynchronizer, Warning};

pub struct WorkerSynchronizer<'a, A: TaskRouterApi + ?Sized> {
    api: &'a A,
    workspace: &'a Sid,
    /// Resolved on the first create of the phase.
    default_activity: Option<Option<Sid>>,
    warnings: Vec<Warning>,
}

impl<'a, A: TaskRouterApi + ?Sized> WorkerSynchronizer<'a, A> {
    pub fn new(api: &'a A, workspace: &'a Sid) -> Self {
        Self {
            api,
            workspace,
            default_activity: None,
            warnings: Vec::new(),
        }
    }

    fn default_activity(&mut self) -> Result<Option<Sid>, SyncError> {
        if let Some(resolved) = &self.default_activity {
            return Ok(resolved.clone());
        }
        let resolved = ReferenceResolver::new(self.api, self.workspace).default_worker_activity()?;
        self.default_activity = Some(resolved.clone());
        Ok(resolved)
    }
}

/// `true` when the attribute texts carry the same JSON value.
fn same_attributes(desired: &str, current: &str) -> bool {
    if desired == current {
        return true;
    }
    match (
        serde_json::from_str::<Value>(desired),
        serde_json::from_str::<Value>(current),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl<A: TaskRouterApi + ?Sized> ResourceSynchronizer for WorkerSynchronizer<'_, A> {
    type Spec = WorkerSpec;
    type Resolved = WorkerSpec;
    type Remote = RemoteWorker;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Worker
    }

    fn list(&mut self) -> Result<Vec<RemoteWorker>, SyncError> {
        self.api
            .list_workers(self.workspace)
            .map_err(workspace_err(self.workspace, "list workers"))
    }

    fn resolve(&mut self, desired: NameIndex<WorkerSpec>) -> Result<NameIndex<WorkerSpec>, SyncError> {
        Ok(desired)
    }

    fn changes(&self, desired: &WorkerSpec, remote: &RemoteWorker) -> Vec<FieldChange> {
        match &desired.attributes {
            Some(attributes) if !same_attributes(attributes, &remote.attributes) => {
                vec![FieldChange::new(
                    "attributes",
                    remote.attributes.as_str(),
                    attributes.as_str(),
                )]
            }
            _ => Vec::new(),
        }
    }

    fn create(&mut self, name: &str, desired: &WorkerSpec) -> Result<(), SyncError> {
        let activity_sid = self.default_activity()?;
        if activity_sid.is_none() {
            tracing::warn!("worker '{name}': workspace has no activities, created without one");
            self.warnings.push(Warning::new(
                ResourceKind::Worker,
                name,
                "no activity to start in; created without an activity",
            ));
        }
        let params = NewWorker {
            friendly_name: name.to_string(),
            attributes: desired.attributes.clone(),
            activity_sid,
        };
        self.api
            .create_worker(self.workspace, &params)
            .map_err(remote_err(format!("create worker '{name}'")))?;
        Ok(())
    }

    fn update(
        &mut self,
        name: &str,
        desired: &WorkerSpec,
        remote: &RemoteWorker,
    ) -> Result<(), SyncError> {
        let params = WorkerUpdate {
            attributes: desired.attributes.clone(),
        };
        self.api
            .update_worker(self.workspace, &remote.sid, &params)
            .map_err(remote_err(format!("update worker '{name}'")))?;
        Ok(())
    }

    fn remove(&mut self, remote: &RemoteWorker) -> Result<(), SyncError> {
        self.api
            .remove_worker(self.workspace, &remote.sid)
            .map_err(remote_err(format!(
                "delete worker '{}'",
                remote.friendly_name
            )))
    }

    fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}
