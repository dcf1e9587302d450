//! Task queue synchronization.
//!
//! Queues name their assignment and reservation activities. Those names are
//! resolved against one fresh activity index per phase and compared as
//! identifiers, since the remote stores identifiers.

use tassa_core::{RemoteTaskQueue, ResourceKind, Sid, TaskQueueSpec};

use crate::api::{ActivityReference, TaskQueueParams, TaskRouterApi};
use crate::diff::{declared, FieldChange};
use crate::error::{remote_err, workspace_err, SyncError};
use crate::index::NameIndex;
use crate::resolver::ReferenceResolver;
use crate::synchronizer::{ResourceSynchronizer, Warning};

/// An activity reference after name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityRef {
    /// Not in the document; neither compared nor written.
    Undeclared,
    /// Declared as an empty string.
    Clear,
    Resolved(Sid),
    /// Declared, but no activity has that name. Treated like
    /// [`ActivityRef::Undeclared`] after the warning is recorded.
    Unresolved(String),
}

impl ActivityRef {
    fn from_name(name: Option<&str>, activities: &NameIndex<Sid>) -> Self {
        match name {
            None => ActivityRef::Undeclared,
            Some("") => ActivityRef::Clear,
            Some(name) => match activities.get(name) {
                Some(sid) => ActivityRef::Resolved(sid.clone()),
                None => ActivityRef::Unresolved(name.to_string()),
            },
        }
    }

    /// What to compare against the remote identifier, if anything.
    fn expected(&self) -> Option<Option<&Sid>> {
        match self {
            ActivityRef::Clear => Some(None),
            ActivityRef::Resolved(sid) => Some(Some(sid)),
            ActivityRef::Undeclared | ActivityRef::Unresolved(_) => None,
        }
    }

    fn for_update(&self) -> Option<ActivityReference> {
        match self {
            ActivityRef::Clear => Some(ActivityReference::Clear),
            ActivityRef::Resolved(sid) => Some(ActivityReference::Set(sid.clone())),
            ActivityRef::Undeclared | ActivityRef::Unresolved(_) => None,
        }
    }

    /// A new queue has nothing to clear.
    fn for_create(&self) -> Option<ActivityReference> {
        match self {
            ActivityRef::Resolved(sid) => Some(ActivityReference::Set(sid.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTaskQueue {
    pub spec: TaskQueueSpec,
    pub assignment: ActivityRef,
    pub reservation: ActivityRef,
}

impl ResolvedTaskQueue {
    fn params(&self, friendly_name: Option<String>, creating: bool) -> TaskQueueParams {
        let pick = |r: &ActivityRef| {
            if creating {
                r.for_create()
            } else {
                r.for_update()
            }
        };
        TaskQueueParams {
            friendly_name,
            target_workers: self.spec.target_workers.clone(),
            max_reserved_workers: self.spec.max_reserved_workers,
            task_order: self.spec.task_order.clone(),
            assignment_activity: pick(&self.assignment),
            reservation_activity: pick(&self.reservation),
        }
    }
}

pub struct TaskQueueSynchronizer<'a, A: TaskRouterApi + ?Sized> {
    api: &'a A,
    workspace: &'a Sid,
    warnings: Vec<Warning>,
}

impl<'a, A: TaskRouterApi + ?Sized> TaskQueueSynchronizer<'a, A> {
    pub fn new(api: &'a A, workspace: &'a Sid) -> Self {
        Self {
            api,
            workspace,
            warnings: Vec::new(),
        }
    }

    fn unresolved(&mut self, queue: &str, field: &str, reference: &ActivityRef) {
        if let ActivityRef::Unresolved(activity) = reference {
            tracing::warn!("task queue '{queue}': activity '{activity}' not found, {field} left unset");
            self.warnings.push(Warning::new(
                ResourceKind::TaskQueue,
                queue,
                format!("{field} '{activity}' not found"),
            ));
        }
    }
}

impl<A: TaskRouterApi + ?Sized> ResourceSynchronizer for TaskQueueSynchronizer<'_, A> {
    type Spec = TaskQueueSpec;
    type Resolved = ResolvedTaskQueue;
    type Remote = RemoteTaskQueue;

    fn kind(&self) -> ResourceKind {
        ResourceKind::TaskQueue
    }

    fn list(&mut self) -> Result<Vec<RemoteTaskQueue>, SyncError> {
        self.api
            .list_task_queues(self.workspace)
            .map_err(workspace_err(self.workspace, "list task queues"))
    }

    fn resolve(
        &mut self,
        desired: NameIndex<TaskQueueSpec>,
    ) -> Result<NameIndex<ResolvedTaskQueue>, SyncError> {
        let references_activities = desired.iter().any(|(_, q)| {
            q.assignment_activity_name.as_deref().is_some_and(|n| !n.is_empty())
                || q.reservation_activity_name.as_deref().is_some_and(|n| !n.is_empty())
        });
        let activities = if references_activities {
            ReferenceResolver::new(self.api, self.workspace).activity_index()?
        } else {
            NameIndex::new()
        };

        let mut resolved = NameIndex::new();
        for (name, spec) in desired.iter() {
            let assignment =
                ActivityRef::from_name(spec.assignment_activity_name.as_deref(), &activities);
            let reservation =
                ActivityRef::from_name(spec.reservation_activity_name.as_deref(), &activities);
            self.unresolved(name, "assignmentActivityName", &assignment);
            self.unresolved(name, "reservationActivityName", &reservation);
            resolved.insert(
                name,
                ResolvedTaskQueue {
                    spec: spec.clone(),
                    assignment,
                    reservation,
                },
            );
        }
        Ok(resolved)
    }

    fn changes(&self, desired: &ResolvedTaskQueue, remote: &RemoteTaskQueue) -> Vec<FieldChange> {
        let spec = &desired.spec;
        let mut changes = Vec::new();
        declared(
            &mut changes,
            "targetWorkers",
            spec.target_workers.as_ref(),
            remote.target_workers.as_ref(),
        );
        declared(
            &mut changes,
            "maxReservedWorkers",
            spec.max_reserved_workers.as_ref(),
            remote.max_reserved_workers.as_ref(),
        );
        declared(
            &mut changes,
            "taskOrder",
            spec.task_order.as_ref(),
            remote.task_order.as_ref(),
        );
        let activity_fields = [
            (
                "assignmentActivitySid",
                &desired.assignment,
                remote.assignment_activity_sid.as_ref(),
            ),
            (
                "reservationActivitySid",
                &desired.reservation,
                remote.reservation_activity_sid.as_ref(),
            ),
        ];
        for (field, wanted, current) in activity_fields {
            if let Some(expected) = wanted.expected() {
                if expected != current {
                    changes.push(FieldChange::new(
                        field,
                        current.map(|s| s.to_string()),
                        expected.map(|s| s.to_string()),
                    ));
                }
            }
        }
        changes
    }

    fn create(&mut self, name: &str, desired: &ResolvedTaskQueue) -> Result<(), SyncError> {
        let params = desired.params(Some(name.to_string()), true);
        self.api
            .create_task_queue(self.workspace, &params)
            .map_err(remote_err(format!("create task queue '{name}'")))?;
        Ok(())
    }

    fn update(
        &mut self,
        name: &str,
        desired: &ResolvedTaskQueue,
        remote: &RemoteTaskQueue,
    ) -> Result<(), SyncError> {
        let params = desired.params(None, false);
        self.api
            .update_task_queue(self.workspace, &remote.sid, &params)
            .map_err(remote_err(format!("update task queue '{name}'")))?;
        Ok(())
    }

    fn remove(&mut self, remote: &RemoteTaskQueue) -> Result<(), SyncError> {
        self.api
            .remove_task_queue(self.workspace, &remote.sid)
            .map_err(remote_err(format!(
                "delete task queue '{}'",
                remote.friendly_name
            )))
    }

    fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}
