//! Workspace reconciliation.
//!
//! [`WorkspaceReconciler::reconcile`] locates (or creates) the target
//! workspace, then runs the phases in a fixed order:
//!
//! 1. settings
//! 2. activities
//! 3. task queues (reference activities by name)
//! 4. workflows (reference task queues by name)
//! 5. workers
//!
//! Each phase reads the remote fresh, so identifiers created by an earlier
//! phase are visible to the next. A failure stops the run where it is;
//! nothing already applied is rolled back.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tassa_core::{DesiredConfig, Named, ResourceKind, Sid, WorkspaceRef};

use crate::activities::ActivitySynchronizer;
use crate::api::{TaskRouterApi, WorkspaceParams};
use crate::diff::{plan_kind, DiffResult, KindPlan};
use crate::error::{remote_err, SyncError};
use crate::index::NameIndex;
use crate::settings::SettingsSynchronizer;
use crate::synchronizer::{self, ResourceSynchronizer, Warning};
use crate::task_queues::TaskQueueSynchronizer;
use crate::workers::WorkerSynchronizer;
use crate::workflows::WorkflowSynchronizer;

// ---------------------------------------------------------------------------
// Options and result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Read and diff, but write nothing.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettingsResult {
    pub updated: bool,
}

/// Outcome of one reconciliation run. In a dry run the per-kind lists hold
/// what would have been written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    /// `None` only in a dry run whose named workspace does not exist yet.
    pub workspace_sid: Option<Sid>,
    pub workspace_name: Option<String>,
    pub workspace_created: bool,
    pub dry_run: bool,
    pub settings: SettingsResult,
    pub activities: DiffResult,
    pub task_queues: DiffResult,
    pub workflows: DiffResult,
    pub workers: DiffResult,
    pub warnings: Vec<Warning>,
    pub synced_at: DateTime<Utc>,
    /// Field-level plans of every phase that ran, in phase order.
    #[serde(skip)]
    pub plans: Vec<KindPlan>,
}

impl ReconciliationResult {
    fn new(dry_run: bool) -> Self {
        Self {
            workspace_sid: None,
            workspace_name: None,
            workspace_created: false,
            dry_run,
            settings: SettingsResult::default(),
            activities: DiffResult::default(),
            task_queues: DiffResult::default(),
            workflows: DiffResult::default(),
            workers: DiffResult::default(),
            warnings: Vec::new(),
            synced_at: Utc::now(),
            plans: Vec::new(),
        }
    }

    pub fn diff(&self, kind: ResourceKind) -> &DiffResult {
        match kind {
            ResourceKind::Activity => &self.activities,
            ResourceKind::TaskQueue => &self.task_queues,
            ResourceKind::Workflow => &self.workflows,
            ResourceKind::Worker => &self.workers,
        }
    }

    pub fn diff_mut(&mut self, kind: ResourceKind) -> &mut DiffResult {
        match kind {
            ResourceKind::Activity => &mut self.activities,
            ResourceKind::TaskQueue => &mut self.task_queues,
            ResourceKind::Workflow => &mut self.workflows,
            ResourceKind::Worker => &mut self.workers,
        }
    }

    pub fn plan(&self, kind: ResourceKind) -> Option<&KindPlan> {
        self.plans.iter().find(|p| p.kind == kind)
    }

    /// `true` when the run wrote (or would write) nothing at all.
    pub fn is_converged(&self) -> bool {
        !self.workspace_created
            && !self.settings.updated
            && ResourceKind::all().iter().all(|&k| self.diff(k).is_empty())
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct WorkspaceReconciler<'a, A: TaskRouterApi + ?Sized> {
    api: &'a A,
    options: ReconcileOptions,
}

impl<'a, A: TaskRouterApi + ?Sized> WorkspaceReconciler<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self::with_options(api, ReconcileOptions::default())
    }

    pub fn with_options(api: &'a A, options: ReconcileOptions) -> Self {
        Self { api, options }
    }

    /// Converge the target workspace to `config`.
    ///
    /// A workspace that does not exist is reported as a bare
    /// [`SyncError::WorkspaceNotFound`] as long as nothing was written yet.
    /// Any other failure, or a not-found after the first write, comes back
    /// as [`SyncError::Aborted`] carrying what was applied before it.
    pub fn reconcile(&self, config: &DesiredConfig) -> Result<ReconciliationResult, SyncError> {
        let mut result = ReconciliationResult::new(self.options.dry_run);
        result.workspace_name = config.workspace_name().map(String::from);

        match self.run(config, &mut result) {
            Ok(()) => {
                tracing::info!(
                    "reconciled workspace {}{}",
                    config.workspace,
                    if result.dry_run { " (dry run)" } else { "" }
                );
                Ok(result)
            }
            Err(err @ SyncError::WorkspaceNotFound { .. }) if result.is_converged() => Err(err),
            Err(err) => {
                tracing::error!("reconciliation of {} aborted: {err}", config.workspace);
                Err(SyncError::Aborted {
                    source: Box::new(err),
                    partial: Box::new(result),
                })
            }
        }
    }

    fn run(&self, config: &DesiredConfig, result: &mut ReconciliationResult) -> Result<(), SyncError> {
        let Some(workspace) = self.locate_workspace(config, result)? else {
            self.plan_unborn(config, result);
            return Ok(());
        };
        result.workspace_sid = Some(workspace.clone());

        if let Some(settings) = &config.settings {
            result.settings.updated = if self.options.dry_run {
                !settings.is_empty()
            } else {
                SettingsSynchronizer::new(self.api, &workspace).sync(settings)?
            };
        }

        self.phase(
            ActivitySynchronizer::new(self.api, &workspace),
            config.activities.as_deref(),
            result,
        )?;
        self.phase(
            TaskQueueSynchronizer::new(self.api, &workspace),
            config.task_queues.as_deref(),
            result,
        )?;
        self.phase(
            WorkflowSynchronizer::new(self.api, &workspace),
            config.workflows.as_deref(),
            result,
        )?;
        self.phase(
            WorkerSynchronizer::new(self.api, &workspace),
            config.workers.as_deref(),
            result,
        )?;
        Ok(())
    }

    /// Identifier of the target workspace. `None` means a dry run whose
    /// named workspace would be created.
    fn locate_workspace(
        &self,
        config: &DesiredConfig,
        result: &mut ReconciliationResult,
    ) -> Result<Option<Sid>, SyncError> {
        let name = match &config.workspace {
            WorkspaceRef::Sid(sid) => return Ok(Some(sid.clone())),
            WorkspaceRef::Name(name) => name,
        };

        let found = self
            .api
            .find_workspaces(name)
            .map_err(remote_err(format!("look up workspace '{name}'")))?;
        if found.len() > 1 {
            tracing::warn!(
                "{} workspaces are named '{name}'; using {}",
                found.len(),
                found[0].sid
            );
        }
        if let Some(first) = found.into_iter().next() {
            return Ok(Some(first.sid));
        }

        result.workspace_created = true;
        if self.options.dry_run {
            tracing::info!("workspace '{name}' does not exist and would be created");
            return Ok(None);
        }

        let params = WorkspaceParams::for_creation(name, config.settings.as_ref());
        let created = self
            .api
            .create_workspace(&params)
            .map_err(remote_err(format!("create workspace '{name}'")))?;
        tracing::info!("created workspace '{name}' ({})", created.sid);
        Ok(Some(created.sid))
    }

    /// Dry run against a workspace that does not exist yet: everything
    /// declared would be added.
    fn plan_unborn(&self, config: &DesiredConfig, result: &mut ReconciliationResult) {
        result.settings.updated = config.settings.as_ref().is_some_and(|s| !s.is_empty());
        if let Some(specs) = &config.activities {
            record_plan(result, all_added(ResourceKind::Activity, specs));
        }
        if let Some(specs) = &config.task_queues {
            record_plan(result, all_added(ResourceKind::TaskQueue, specs));
        }
        if let Some(specs) = &config.workflows {
            record_plan(result, all_added(ResourceKind::Workflow, specs));
        }
        if let Some(specs) = &config.workers {
            record_plan(result, all_added(ResourceKind::Worker, specs));
        }
    }

    fn phase<S: ResourceSynchronizer>(
        &self,
        mut sync: S,
        specs: Option<&[S::Spec]>,
        result: &mut ReconciliationResult,
    ) -> Result<(), SyncError> {
        let Some(specs) = specs else {
            tracing::debug!("{} not declared; left untouched", sync.kind());
            return Ok(());
        };
        let outcome = self.plan_and_apply(&mut sync, specs, result);
        result.warnings.extend(sync.take_warnings());
        outcome
    }

    fn plan_and_apply<S: ResourceSynchronizer>(
        &self,
        sync: &mut S,
        specs: &[S::Spec],
        result: &mut ReconciliationResult,
    ) -> Result<(), SyncError> {
        let planned = synchronizer::plan(sync, specs)?;
        if self.options.dry_run {
            record_plan(result, planned.plan);
            return Ok(());
        }
        result.plans.push(planned.plan.clone());
        synchronizer::apply(sync, &planned, result.diff_mut(planned.plan.kind))
    }
}

fn record_plan(result: &mut ReconciliationResult, plan: KindPlan) {
    *result.diff_mut(plan.kind) = plan.names();
    result.plans.push(plan);
}

fn all_added<T: Named + Clone>(kind: ResourceKind, specs: &[T]) -> KindPlan {
    let desired: NameIndex<T> = specs.iter().cloned().collect();
    plan_kind(kind, &desired, &NameIndex::<()>::new(), |_, _| Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTaskRouter;
    use tassa_core::{ActivitySpec, Settings, WorkerSpec};

    fn named(name: &str) -> DesiredConfig {
        DesiredConfig::for_workspace(WorkspaceRef::Name(name.into()))
    }

    #[test]
    fn absent_collections_are_left_untouched() {
        let api = InMemoryTaskRouter::new();
        let ws = api.seed_workspace("Support");
        api.seed_activity(&ws, "Break", false);

        let result = WorkspaceReconciler::new(&api).reconcile(&named("Support")).unwrap();

        assert!(result.is_converged());
        assert!(result.plans.is_empty());
        assert_eq!(api.activities(&ws).len(), 1);
    }

    #[test]
    fn empty_collection_deletes_everything_of_that_kind() {
        let api = InMemoryTaskRouter::new();
        let ws = api.seed_workspace("Support");
        api.seed_activity(&ws, "Break", false);
        api.seed_activity(&ws, "Lunch", false);

        let mut config = named("Support");
        config.activities = Some(vec![]);
        let result = WorkspaceReconciler::new(&api).reconcile(&config).unwrap();

        assert_eq!(result.activities.deleted, vec!["Break", "Lunch"]);
        assert!(api.activities(&ws).is_empty());
    }

    #[test]
    fn dry_run_against_missing_workspace_plans_everything_as_added() {
        let api = InMemoryTaskRouter::new();
        let mut config = named("Fresh");
        config.settings = Some(Settings {
            multi_task_enabled: Some(true),
            ..Settings::default()
        });
        config.activities = Some(vec![ActivitySpec {
            friendly_name: "Offline".into(),
            available: Some(false),
            timeout: None,
        }]);
        config.workers = Some(vec![
            WorkerSpec {
                friendly_name: "Alice".into(),
                attributes: None,
            },
            WorkerSpec {
                friendly_name: "Alice".into(),
                attributes: Some("{}".into()),
            },
        ]);

        let result = WorkspaceReconciler::with_options(&api, ReconcileOptions { dry_run: true })
            .reconcile(&config)
            .unwrap();

        assert!(result.dry_run);
        assert!(result.workspace_created);
        assert_eq!(result.workspace_sid, None);
        assert!(result.settings.updated);
        assert_eq!(result.activities.added, vec!["Offline"]);
        assert_eq!(result.workers.added, vec!["Alice"]);
        assert!(result.task_queues.is_empty());
        assert!(api.journal().is_empty());
    }

    #[test]
    fn first_of_several_same_named_workspaces_is_reused() {
        let api = InMemoryTaskRouter::new();
        let first = api.seed_workspace("Twin");
        api.seed_workspace("Twin");

        let result = WorkspaceReconciler::new(&api).reconcile(&named("Twin")).unwrap();
        assert_eq!(result.workspace_sid, Some(first));
        assert!(!result.workspace_created);
    }

    #[test]
    fn result_serializes_with_camel_case_keys() {
        let api = InMemoryTaskRouter::new();
        api.seed_workspace("Support");
        let result = WorkspaceReconciler::new(&api).reconcile(&named("Support")).unwrap();
        let value = serde_json::to_value(&result).unwrap();

        for key in [
            "workspaceSid",
            "workspaceName",
            "workspaceCreated",
            "dryRun",
            "settings",
            "activities",
            "taskQueues",
            "workflows",
            "workers",
            "warnings",
            "syncedAt",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value.get("plans").is_none());
        assert_eq!(value["settings"]["updated"], false);
    }
}
