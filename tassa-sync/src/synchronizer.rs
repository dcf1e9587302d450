//! The per-kind synchronization pipeline.
//!
//! Every kind runs the same three steps: list the remote, resolve the
//! desired specs, diff. The result is a [`Planned`] value that can be
//! inspected (dry run) or applied. Applying walks the plan in phase order,
//! added, then updated, then deleted, and records each name only after its
//! write succeeded.

use serde::Serialize;

use tassa_core::{Identified, Named, ResourceKind};

use crate::diff::{plan_kind, DiffResult, FieldChange, KindPlan};
use crate::error::SyncError;
use crate::index::NameIndex;

/// A non-fatal condition surfaced in the result, such as a name that did
/// not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: ResourceKind,
    /// Friendly name of the resource the warning is about.
    pub resource: String,
    pub message: String,
}

impl Warning {
    pub fn new(kind: ResourceKind, resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            resource: resource.into(),
            message: message.into(),
        }
    }
}

/// One resource kind's list/diff/write operations against a workspace.
pub trait ResourceSynchronizer {
    /// Desired spec as validated from the document.
    type Spec: Named + Clone;
    /// Desired spec with name references resolved.
    type Resolved;
    type Remote: Identified;

    fn kind(&self) -> ResourceKind;

    fn list(&mut self) -> Result<Vec<Self::Remote>, SyncError>;

    /// Resolve references for the whole desired set. Runs once per phase.
    fn resolve(
        &mut self,
        desired: NameIndex<Self::Spec>,
    ) -> Result<NameIndex<Self::Resolved>, SyncError>;

    /// Declared fields that differ. Empty means unchanged.
    fn changes(&self, desired: &Self::Resolved, remote: &Self::Remote) -> Vec<FieldChange>;

    fn create(&mut self, name: &str, desired: &Self::Resolved) -> Result<(), SyncError>;

    fn update(
        &mut self,
        name: &str,
        desired: &Self::Resolved,
        remote: &Self::Remote,
    ) -> Result<(), SyncError>;

    fn remove(&mut self, remote: &Self::Remote) -> Result<(), SyncError>;

    /// Drain warnings collected so far.
    fn take_warnings(&mut self) -> Vec<Warning>;
}

/// A computed plan plus the records needed to apply it.
pub struct Planned<S: ResourceSynchronizer> {
    pub plan: KindPlan,
    desired: NameIndex<S::Resolved>,
    observed: NameIndex<S::Remote>,
}

impl<S: ResourceSynchronizer> Planned<S> {
    pub fn observed(&self) -> &NameIndex<S::Remote> {
        &self.observed
    }
}

/// Read the remote and diff it against `specs`. Issues no writes.
pub fn plan<S: ResourceSynchronizer>(
    sync: &mut S,
    specs: &[S::Spec],
) -> Result<Planned<S>, SyncError> {
    let kind = sync.kind();
    tracing::debug!("planning {kind} phase ({} declared)", specs.len());

    let observed: NameIndex<S::Remote> = index_remote(sync.list()?);
    let desired = sync.resolve(specs.iter().cloned().collect())?;
    let plan = plan_kind(kind, &desired, &observed, |d, r| sync.changes(d, r));

    Ok(Planned {
        plan,
        desired,
        observed,
    })
}

/// Apply a plan. Names land in `done` as their write succeeds, so on error
/// `done` holds exactly what was applied.
pub fn apply<S: ResourceSynchronizer>(
    sync: &mut S,
    planned: &Planned<S>,
    done: &mut DiffResult,
) -> Result<(), SyncError> {
    let kind = sync.kind();

    for name in &planned.plan.added {
        if let Some(desired) = planned.desired.get(name) {
            sync.create(name, desired)?;
            tracing::info!("created {kind} '{name}'");
            done.added.push(name.clone());
        }
    }

    for update in &planned.plan.updated {
        let name = &update.name;
        if let (Some(desired), Some(remote)) =
            (planned.desired.get(name), planned.observed.get(name))
        {
            sync.update(name, desired, remote)?;
            let fields: Vec<&str> = update.changes.iter().map(|c| c.field).collect();
            tracing::info!("updated {kind} '{name}' ({})", fields.join(", "));
            done.updated.push(name.clone());
        }
    }

    for name in &planned.plan.deleted {
        if let Some(remote) = planned.observed.get(name) {
            sync.remove(remote)?;
            tracing::info!("deleted {kind} '{name}' ({})", remote.sid());
            done.deleted.push(name.clone());
        }
    }

    Ok(())
}

fn index_remote<R: Identified>(records: Vec<R>) -> NameIndex<R> {
    let mut index = NameIndex::new();
    for record in records {
        let name = record.friendly_name().to_string();
        if let Some(shadowed) = index.insert(name.clone(), record) {
            tracing::warn!(
                "several remote resources are named '{name}'; ignoring {}",
                shadowed.sid()
            );
        }
    }
    index
}
