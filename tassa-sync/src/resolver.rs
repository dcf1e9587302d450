//! Friendly-name → identifier resolution.
//!
//! Every lookup reads the remote fresh: nothing here is cached between calls.
//! A name that does not resolve is not an error. Callers get `None` (or the
//! name back in `unresolved`) and turn it into a [`Warning`](crate::Warning).

use serde_json::Value;

use tassa_core::{RemoteActivity, ResourceKind, Sid};

use crate::api::TaskRouterApi;
use crate::error::{workspace_err, SyncError};
use crate::index::NameIndex;

/// Name of the activity new workers start in, when it exists.
pub const DEFAULT_WORKER_ACTIVITY: &str = "Offline";

/// Key whose string values name task queues inside routing configuration.
pub const QUEUE_KEY: &str = "queue";

/// A routing configuration with queue names replaced by identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfiguration {
    pub configuration: Value,
    /// Queue names that matched no task queue, in tree order.
    pub unresolved: Vec<String>,
}

/// Resolves references against one workspace.
pub struct ReferenceResolver<'a, A: TaskRouterApi + ?Sized> {
    api: &'a A,
    workspace: &'a Sid,
}

impl<'a, A: TaskRouterApi + ?Sized> ReferenceResolver<'a, A> {
    pub fn new(api: &'a A, workspace: &'a Sid) -> Self {
        Self { api, workspace }
    }

    /// Identifier of the activity called `name`, or `None`.
    pub fn resolve_activity_name(&self, name: &str) -> Result<Option<Sid>, SyncError> {
        Ok(self.activity_index()?.get(name).cloned())
    }

    /// Fresh friendlyName → identifier index of every activity.
    pub fn activity_index(&self) -> Result<NameIndex<Sid>, SyncError> {
        Ok(NameIndex::of_sids(&self.list_activities()?))
    }

    /// Fresh friendlyName → identifier index of every task queue.
    pub fn queue_index(&self) -> Result<NameIndex<Sid>, SyncError> {
        let queues = self
            .api
            .list_task_queues(self.workspace)
            .map_err(workspace_err(self.workspace, "list task queues"))?;
        Ok(NameIndex::of_sids(&queues))
    }

    /// Replace every queue name under a `queue` key with its identifier.
    pub fn resolve_queue_references(
        &self,
        configuration: &Value,
    ) -> Result<ResolvedConfiguration, SyncError> {
        Ok(resolve_queue_references_with(&self.queue_index()?, configuration))
    }

    /// The activity a new worker starts in: "Offline" if present, else the
    /// first available activity, else the first activity. `None` only when
    /// the workspace has no activities at all.
    pub fn default_worker_activity(&self) -> Result<Option<Sid>, SyncError> {
        Ok(pick_default_activity(&self.list_activities()?))
    }

    fn list_activities(&self) -> Result<Vec<RemoteActivity>, SyncError> {
        self.api
            .list_activities(self.workspace)
            .map_err(workspace_err(self.workspace, "list activities"))
    }
}

/// `true` if `value` already has the identifier shape of `kind`.
pub fn is_sid_of(kind: ResourceKind, value: &str) -> bool {
    value.starts_with(kind.sid_prefix())
}

/// Pure tree walk behind [`ReferenceResolver::resolve_queue_references`].
///
/// Only string values bound to a `queue` key are touched. Values that
/// already look like queue identifiers pass through, which makes the walk
/// idempotent. Unknown names are left in place and reported.
pub fn resolve_queue_references_with(
    queues: &NameIndex<Sid>,
    configuration: &Value,
) -> ResolvedConfiguration {
    let mut resolved = configuration.clone();
    let mut unresolved = Vec::new();
    walk(&mut resolved, queues, &mut unresolved);
    ResolvedConfiguration {
        configuration: resolved,
        unresolved,
    }
}

fn walk(node: &mut Value, queues: &NameIndex<Sid>, unresolved: &mut Vec<String>) {
    match node {
        Value::Array(items) => {
            for item in items {
                walk(item, queues, unresolved);
            }
        }
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                if key == QUEUE_KEY {
                    if let Value::String(name) = value {
                        if is_sid_of(ResourceKind::TaskQueue, name) {
                            continue;
                        }
                        match queues.get(name) {
                            Some(sid) => *value = Value::String(sid.to_string()),
                            None => unresolved.push(name.clone()),
                        }
                    }
                    continue;
                }
                walk(value, queues, unresolved);
            }
        }
        _ => {}
    }
}

fn pick_default_activity(activities: &[RemoteActivity]) -> Option<Sid> {
    activities
        .iter()
        .find(|a| a.friendly_name == DEFAULT_WORKER_ACTIVITY)
        .or_else(|| activities.iter().find(|a| a.available))
        .or_else(|| activities.first())
        .map(|a| a.sid.clone())
}
