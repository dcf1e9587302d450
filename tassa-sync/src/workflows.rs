//! Workflow synchronization.
//!
//! Routing configuration is resolved (queue names to identifiers) before it
//! is diffed, then compared structurally against the remote's stored text.

use serde_json::Value;

use tassa_core::{RemoteWorkflow, ResourceKind, Sid, WorkflowSpec};

use crate::api::{TaskRouterApi, WorkflowParams};
use crate::diff::{canonical_json, declared, FieldChange};
use crate::error::{remote_err, workspace_err, SyncError};
use crate::index::NameIndex;
use crate::resolver::{resolve_queue_references_with, ReferenceResolver};
use crate::synchronizer::{ResourceSynchronizer, Warning};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWorkflow {
    pub configuration: Value,
    pub task_reservation_timeout: Option<u64>,
}

impl ResolvedWorkflow {
    fn params(&self, friendly_name: Option<String>) -> WorkflowParams {
        WorkflowParams {
            friendly_name,
            configuration: Some(self.configuration.to_string()),
            task_reservation_timeout: self.task_reservation_timeout,
        }
    }
}

pub struct WorkflowSynchronizer<'a, A: TaskRouterApi + ?Sized> {
    api: &'a A,
    workspace: &'a Sid,
    warnings: Vec<Warning>,
}

impl<'a, A: TaskRouterApi + ?Sized> WorkflowSynchronizer<'a, A> {
    pub fn new(api: &'a A, workspace: &'a Sid) -> Self {
        Self {
            api,
            workspace,
            warnings: Vec::new(),
        }
    }
}

impl<A: TaskRouterApi + ?Sized> ResourceSynchronizer for WorkflowSynchronizer<'_, A> {
    type Spec = WorkflowSpec;
    type Resolved = ResolvedWorkflow;
    type Remote = RemoteWorkflow;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Workflow
    }

    fn list(&mut self) -> Result<Vec<RemoteWorkflow>, SyncError> {
        self.api
            .list_workflows(self.workspace)
            .map_err(workspace_err(self.workspace, "list workflows"))
    }

    fn resolve(
        &mut self,
        desired: NameIndex<WorkflowSpec>,
    ) -> Result<NameIndex<ResolvedWorkflow>, SyncError> {
        let mut resolved = NameIndex::new();
        if desired.is_empty() {
            return Ok(resolved);
        }

        let queues = ReferenceResolver::new(self.api, self.workspace).queue_index()?;
        for (name, spec) in desired.iter() {
            let outcome = resolve_queue_references_with(&queues, &spec.configuration);
            for queue in &outcome.unresolved {
                tracing::warn!("workflow '{name}': task queue '{queue}' not found");
                self.warnings.push(Warning::new(
                    ResourceKind::Workflow,
                    name,
                    format!("task queue '{queue}' not found"),
                ));
            }
            resolved.insert(
                name,
                ResolvedWorkflow {
                    configuration: outcome.configuration,
                    task_reservation_timeout: spec.task_reservation_timeout,
                },
            );
        }
        Ok(resolved)
    }

    fn changes(&self, desired: &ResolvedWorkflow, remote: &RemoteWorkflow) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        let stored = canonical_json(&remote.configuration);
        if stored != desired.configuration {
            changes.push(FieldChange::new(
                "configuration",
                stored,
                desired.configuration.clone(),
            ));
        }
        declared(
            &mut changes,
            "taskReservationTimeout",
            desired.task_reservation_timeout.as_ref(),
            remote.task_reservation_timeout.as_ref(),
        );
        changes
    }

    fn create(&mut self, name: &str, desired: &ResolvedWorkflow) -> Result<(), SyncError> {
        self.api
            .create_workflow(self.workspace, &desired.params(Some(name.to_string())))
            .map_err(remote_err(format!("create workflow '{name}'")))?;
        Ok(())
    }

    fn update(
        &mut self,
        name: &str,
        desired: &ResolvedWorkflow,
        remote: &RemoteWorkflow,
    ) -> Result<(), SyncError> {
        self.api
            .update_workflow(self.workspace, &remote.sid, &desired.params(None))
            .map_err(remote_err(format!("update workflow '{name}'")))?;
        Ok(())
    }

    fn remove(&mut self, remote: &RemoteWorkflow) -> Result<(), SyncError> {
        self.api
            .remove_workflow(self.workspace, &remote.sid)
            .map_err(remote_err(format!(
                "delete workflow '{}'",
                remote.friendly_name
            )))
    }

    fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}
