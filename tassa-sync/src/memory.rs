//! In-process [`TaskRouterApi`].
//!
//! [`InMemoryTaskRouter`] keeps workspaces and their resources in memory,
//! assigns prefixed identifiers, applies the remote's creation defaults and
//! journals every mutating call. Tests drive the engine against it; it also
//! serves embedders that want a fake remote.

use std::cell::RefCell;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use tassa_core::types::WORKSPACE_SID_PREFIX;
use tassa_core::{
    RemoteActivity, RemoteTaskQueue, RemoteWorker, RemoteWorkflow, RemoteWorkspace, ResourceKind,
    Sid,
};

use crate::api::{
    ActivityParams, ActivityReference, NewWorker, TaskQueueParams, TaskRouterApi, WorkerUpdate,
    WorkflowParams, WorkspaceParams,
};
use crate::error::RemoteError;

/// Remote defaults applied when a create leaves a field out.
pub const DEFAULT_TARGET_WORKERS: &str = "1==1";
pub const DEFAULT_MAX_RESERVED_WORKERS: u64 = 1;
pub const DEFAULT_TASK_ORDER: &str = "FIFO";
pub const DEFAULT_WORKER_ATTRIBUTES: &str = "{}";
pub const DEFAULT_TASK_RESERVATION_TIMEOUT: u64 = 120;

/// One journaled mutating call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Trait method name, e.g. `"update_worker"`.
    pub operation: &'static str,
    pub workspace: Option<Sid>,
    /// Resource addressed by an update or remove.
    pub target: Option<Sid>,
    /// The serialized payload; `Null` for removes.
    pub payload: Value,
}

#[derive(Debug, Default)]
struct Workspace {
    record: Option<RemoteWorkspace>,
    activities: Vec<RemoteActivity>,
    task_queues: Vec<RemoteTaskQueue>,
    workflows: Vec<RemoteWorkflow>,
    workers: Vec<RemoteWorker>,
}

#[derive(Debug, Default)]
struct State {
    workspaces: Vec<Workspace>,
    next_id: u64,
    journal: Vec<Call>,
    failures: Vec<(String, RemoteError)>,
}

impl State {
    fn sid(&mut self, prefix: &str) -> Sid {
        self.next_id += 1;
        Sid(format!("{prefix}{:032x}", self.next_id))
    }

    fn workspace(&mut self, sid: &Sid) -> Result<&mut Workspace, RemoteError> {
        self.workspaces
            .iter_mut()
            .find(|w| w.record.as_ref().is_some_and(|r| &r.sid == sid))
            .ok_or_else(|| not_found("workspace", sid))
    }

    fn fail_if_armed(&mut self, operation: &str) -> Result<(), RemoteError> {
        match self.failures.iter().position(|(op, _)| op == operation) {
            Some(pos) => Err(self.failures.remove(pos).1),
            None => Ok(()),
        }
    }

    fn record(
        &mut self,
        operation: &'static str,
        workspace: Option<&Sid>,
        target: Option<&Sid>,
        payload: impl Serialize,
    ) {
        self.journal.push(Call {
            operation,
            workspace: workspace.cloned(),
            target: target.cloned(),
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
        });
    }
}

fn not_found(what: &str, sid: &Sid) -> RemoteError {
    RemoteError::NotFound {
        resource: format!("{what} {sid}"),
    }
}

fn duplicate(kind: ResourceKind, name: &str) -> RemoteError {
    RemoteError::Rejected {
        status: 409,
        code: None,
        message: format!("a {kind} named '{name}' already exists"),
    }
}

fn find_mut<'a, T>(
    items: &'a mut [T],
    sid: &Sid,
    what: &str,
    sid_of: impl Fn(&T) -> &Sid,
) -> Result<&'a mut T, RemoteError> {
    items
        .iter_mut()
        .find(|item| sid_of(&**item) == sid)
        .ok_or_else(|| not_found(what, sid))
}

fn remove_by_sid<T>(
    items: &mut Vec<T>,
    sid: &Sid,
    what: &str,
    sid_of: impl Fn(&T) -> &Sid,
) -> Result<(), RemoteError> {
    let pos = items
        .iter()
        .position(|item| sid_of(item) == sid)
        .ok_or_else(|| not_found(what, sid))?;
    items.remove(pos);
    Ok(())
}

fn apply_reference(slot: &mut Option<Sid>, reference: &Option<ActivityReference>) {
    if let Some(reference) = reference {
        *slot = reference.sid().cloned();
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTaskRouter {
    state: RefCell<State>,
}

impl InMemoryTaskRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `operation` (a trait method name) fail with
    /// `error`. Each armed failure fires once.
    pub fn fail_next(&self, operation: &str, error: RemoteError) {
        self.state
            .borrow_mut()
            .failures
            .push((operation.to_string(), error));
    }

    /// Every mutating call so far, oldest first.
    pub fn journal(&self) -> Vec<Call> {
        self.state.borrow().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state.borrow_mut().journal.clear();
    }

    // -- seeding (not journaled) -------------------------------------------

    pub fn seed_workspace(&self, friendly_name: &str) -> Sid {
        let mut state = self.state.borrow_mut();
        let sid = state.sid(WORKSPACE_SID_PREFIX);
        state.workspaces.push(Workspace {
            record: Some(new_workspace(sid.clone(), friendly_name)),
            ..Workspace::default()
        });
        sid
    }

    pub fn seed_activity(&self, workspace: &Sid, friendly_name: &str, available: bool) -> Sid {
        let mut state = self.state.borrow_mut();
        let sid = state.sid(ResourceKind::Activity.sid_prefix());
        if let Ok(ws) = state.workspace(workspace) {
            ws.activities.push(RemoteActivity {
                sid: sid.clone(),
                friendly_name: friendly_name.to_string(),
                available,
                timeout: None,
                date_created: Some(Utc::now()),
                date_updated: Some(Utc::now()),
            });
        }
        sid
    }

    pub fn seed_task_queue(&self, workspace: &Sid, friendly_name: &str) -> Sid {
        let mut state = self.state.borrow_mut();
        let sid = state.sid(ResourceKind::TaskQueue.sid_prefix());
        if let Ok(ws) = state.workspace(workspace) {
            ws.task_queues.push(new_task_queue(sid.clone(), friendly_name));
        }
        sid
    }

    pub fn seed_workflow(&self, workspace: &Sid, friendly_name: &str, configuration: &str) -> Sid {
        let mut state = self.state.borrow_mut();
        let sid = state.sid(ResourceKind::Workflow.sid_prefix());
        if let Ok(ws) = state.workspace(workspace) {
            ws.workflows.push(RemoteWorkflow {
                sid: sid.clone(),
                friendly_name: friendly_name.to_string(),
                configuration: configuration.to_string(),
                task_reservation_timeout: Some(DEFAULT_TASK_RESERVATION_TIMEOUT),
                date_created: Some(Utc::now()),
                date_updated: Some(Utc::now()),
            });
        }
        sid
    }

    pub fn seed_worker(
        &self,
        workspace: &Sid,
        friendly_name: &str,
        attributes: &str,
        activity: Option<&Sid>,
    ) -> Sid {
        let mut state = self.state.borrow_mut();
        let sid = state.sid(ResourceKind::Worker.sid_prefix());
        if let Ok(ws) = state.workspace(workspace) {
            let mut worker = RemoteWorker {
                sid: sid.clone(),
                friendly_name: friendly_name.to_string(),
                attributes: attributes.to_string(),
                activity_sid: None,
                activity_name: None,
                available: false,
                date_created: Some(Utc::now()),
                date_updated: Some(Utc::now()),
            };
            assign_activity(&mut worker, &ws.activities, activity);
            ws.workers.push(worker);
        }
        sid
    }

    /// Move a worker to another activity, as the routing backend would when
    /// an agent changes state.
    pub fn set_worker_activity(&self, workspace: &Sid, worker: &Sid, activity: &Sid) {
        let mut state = self.state.borrow_mut();
        if let Ok(ws) = state.workspace(workspace) {
            let activities = ws.activities.clone();
            if let Some(record) = ws.workers.iter_mut().find(|w| &w.sid == worker) {
                assign_activity(record, &activities, Some(activity));
            }
        }
    }

    // -- inspection --------------------------------------------------------

    pub fn workspace(&self, sid: &Sid) -> Option<RemoteWorkspace> {
        let mut state = self.state.borrow_mut();
        state.workspace(sid).ok().and_then(|w| w.record.clone())
    }

    pub fn activities(&self, workspace: &Sid) -> Vec<RemoteActivity> {
        self.read(workspace, |w| w.activities.clone())
    }

    pub fn task_queues(&self, workspace: &Sid) -> Vec<RemoteTaskQueue> {
        self.read(workspace, |w| w.task_queues.clone())
    }

    pub fn workflows(&self, workspace: &Sid) -> Vec<RemoteWorkflow> {
        self.read(workspace, |w| w.workflows.clone())
    }

    pub fn workers(&self, workspace: &Sid) -> Vec<RemoteWorker> {
        self.read(workspace, |w| w.workers.clone())
    }

    fn read<T: Default>(&self, workspace: &Sid, f: impl FnOnce(&Workspace) -> T) -> T {
        let mut state = self.state.borrow_mut();
        state.workspace(workspace).map(|w| f(w)).unwrap_or_default()
    }

    /// Run a list call: arm check, then clone out of the workspace.
    fn list<T>(
        &self,
        operation: &str,
        workspace: &Sid,
        f: impl FnOnce(&Workspace) -> Vec<T>,
    ) -> Result<Vec<T>, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed(operation)?;
        state.workspace(workspace).map(|w| f(w))
    }
}

fn new_workspace(sid: Sid, friendly_name: &str) -> RemoteWorkspace {
    RemoteWorkspace {
        sid,
        friendly_name: friendly_name.to_string(),
        event_callback_url: None,
        events_filter: None,
        multi_task_enabled: false,
        timeout_activity_sid: None,
        prioritize_queue_order: Some("FIFO".to_string()),
        date_created: Some(Utc::now()),
        date_updated: Some(Utc::now()),
    }
}

fn new_task_queue(sid: Sid, friendly_name: &str) -> RemoteTaskQueue {
    RemoteTaskQueue {
        sid,
        friendly_name: friendly_name.to_string(),
        target_workers: Some(DEFAULT_TARGET_WORKERS.to_string()),
        max_reserved_workers: Some(DEFAULT_MAX_RESERVED_WORKERS),
        task_order: Some(DEFAULT_TASK_ORDER.to_string()),
        assignment_activity_sid: None,
        reservation_activity_sid: None,
        date_created: Some(Utc::now()),
        date_updated: Some(Utc::now()),
    }
}

fn assign_activity(worker: &mut RemoteWorker, activities: &[RemoteActivity], activity: Option<&Sid>) {
    let found = activity.and_then(|sid| activities.iter().find(|a| &a.sid == sid));
    worker.activity_sid = found.map(|a| a.sid.clone());
    worker.activity_name = found.map(|a| a.friendly_name.clone());
    worker.available = found.is_some_and(|a| a.available);
}

fn apply_workspace_params(record: &mut RemoteWorkspace, params: &WorkspaceParams) {
    if let Some(name) = &params.friendly_name {
        record.friendly_name = name.clone();
    }
    if let Some(url) = &params.event_callback_url {
        record.event_callback_url = Some(url.clone());
    }
    if let Some(filter) = &params.events_filter {
        record.events_filter = Some(filter.clone());
    }
    if let Some(enabled) = params.multi_task_enabled {
        record.multi_task_enabled = enabled;
    }
    if let Some(sid) = &params.timeout_activity_sid {
        record.timeout_activity_sid = Some(Sid::from(sid.as_str()));
    }
    if let Some(order) = &params.prioritize_queue_order {
        record.prioritize_queue_order = Some(order.clone());
    }
    record.date_updated = Some(Utc::now());
}

impl TaskRouterApi for InMemoryTaskRouter {
    fn fetch_workspace(&self, workspace: &Sid) -> Result<RemoteWorkspace, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("fetch_workspace")?;
        state
            .workspace(workspace)?
            .record
            .clone()
            .ok_or_else(|| not_found("workspace", workspace))
    }

    fn find_workspaces(&self, friendly_name: &str) -> Result<Vec<RemoteWorkspace>, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("find_workspaces")?;
        Ok(state
            .workspaces
            .iter()
            .filter_map(|w| w.record.clone())
            .filter(|r| r.friendly_name == friendly_name)
            .collect())
    }

    fn create_workspace(&self, params: &WorkspaceParams) -> Result<RemoteWorkspace, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("create_workspace")?;
        let name = params.friendly_name.clone().ok_or(RemoteError::Rejected {
            status: 400,
            code: None,
            message: "FriendlyName is required".to_string(),
        })?;
        let sid = state.sid(WORKSPACE_SID_PREFIX);
        let mut record = new_workspace(sid, &name);
        apply_workspace_params(&mut record, params);
        state.record("create_workspace", None, None, params);
        state.workspaces.push(Workspace {
            record: Some(record.clone()),
            ..Workspace::default()
        });
        Ok(record)
    }

    fn update_workspace(
        &self,
        workspace: &Sid,
        params: &WorkspaceParams,
    ) -> Result<RemoteWorkspace, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("update_workspace")?;
        let ws = state.workspace(workspace)?;
        let record = ws
            .record
            .as_mut()
            .ok_or_else(|| not_found("workspace", workspace))?;
        apply_workspace_params(record, params);
        let updated = record.clone();
        state.record("update_workspace", Some(workspace), None, params);
        Ok(updated)
    }

    fn list_activities(&self, workspace: &Sid) -> Result<Vec<RemoteActivity>, RemoteError> {
        self.list("list_activities", workspace, |w| w.activities.clone())
    }

    fn create_activity(
        &self,
        workspace: &Sid,
        params: &ActivityParams,
    ) -> Result<RemoteActivity, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("create_activity")?;
        let sid = state.sid(ResourceKind::Activity.sid_prefix());
        let ws = state.workspace(workspace)?;
        let name = params.friendly_name.clone().unwrap_or_default();
        if ws.activities.iter().any(|a| a.friendly_name == name) {
            return Err(duplicate(ResourceKind::Activity, &name));
        }
        let activity = RemoteActivity {
            sid,
            friendly_name: name,
            available: params.available.unwrap_or(false),
            timeout: params.timeout,
            date_created: Some(Utc::now()),
            date_updated: Some(Utc::now()),
        };
        ws.activities.push(activity.clone());
        state.record("create_activity", Some(workspace), None, params);
        Ok(activity)
    }

    fn update_activity(
        &self,
        workspace: &Sid,
        activity: &Sid,
        params: &ActivityParams,
    ) -> Result<RemoteActivity, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("update_activity")?;
        let ws = state.workspace(workspace)?;
        let record = find_mut(&mut ws.activities, activity, "activity", |a| &a.sid)?;
        if let Some(name) = &params.friendly_name {
            record.friendly_name = name.clone();
        }
        if let Some(available) = params.available {
            record.available = available;
        }
        if let Some(timeout) = params.timeout {
            record.timeout = Some(timeout);
        }
        record.date_updated = Some(Utc::now());
        let updated = record.clone();
        state.record("update_activity", Some(workspace), Some(activity), params);
        Ok(updated)
    }

    fn remove_activity(&self, workspace: &Sid, activity: &Sid) -> Result<(), RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("remove_activity")?;
        let ws = state.workspace(workspace)?;
        remove_by_sid(&mut ws.activities, activity, "activity", |a| &a.sid)?;
        state.record("remove_activity", Some(workspace), Some(activity), Value::Null);
        Ok(())
    }

    fn list_task_queues(&self, workspace: &Sid) -> Result<Vec<RemoteTaskQueue>, RemoteError> {
        self.list("list_task_queues", workspace, |w| w.task_queues.clone())
    }

    fn create_task_queue(
        &self,
        workspace: &Sid,
        params: &TaskQueueParams,
    ) -> Result<RemoteTaskQueue, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("create_task_queue")?;
        let sid = state.sid(ResourceKind::TaskQueue.sid_prefix());
        let ws = state.workspace(workspace)?;
        let name = params.friendly_name.clone().unwrap_or_default();
        if ws.task_queues.iter().any(|q| q.friendly_name == name) {
            return Err(duplicate(ResourceKind::TaskQueue, &name));
        }
        let mut queue = new_task_queue(sid, &name);
        apply_queue_params(&mut queue, params);
        ws.task_queues.push(queue.clone());
        state.record("create_task_queue", Some(workspace), None, params);
        Ok(queue)
    }

    fn update_task_queue(
        &self,
        workspace: &Sid,
        queue: &Sid,
        params: &TaskQueueParams,
    ) -> Result<RemoteTaskQueue, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("update_task_queue")?;
        let ws = state.workspace(workspace)?;
        let record = find_mut(&mut ws.task_queues, queue, "task queue", |q| &q.sid)?;
        apply_queue_params(record, params);
        let updated = record.clone();
        state.record("update_task_queue", Some(workspace), Some(queue), params);
        Ok(updated)
    }

    fn remove_task_queue(&self, workspace: &Sid, queue: &Sid) -> Result<(), RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("remove_task_queue")?;
        let ws = state.workspace(workspace)?;
        remove_by_sid(&mut ws.task_queues, queue, "task queue", |q| &q.sid)?;
        state.record("remove_task_queue", Some(workspace), Some(queue), Value::Null);
        Ok(())
    }

    fn list_workflows(&self, workspace: &Sid) -> Result<Vec<RemoteWorkflow>, RemoteError> {
        self.list("list_workflows", workspace, |w| w.workflows.clone())
    }

    fn create_workflow(
        &self,
        workspace: &Sid,
        params: &WorkflowParams,
    ) -> Result<RemoteWorkflow, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("create_workflow")?;
        let sid = state.sid(ResourceKind::Workflow.sid_prefix());
        let ws = state.workspace(workspace)?;
        let name = params.friendly_name.clone().unwrap_or_default();
        if ws.workflows.iter().any(|w| w.friendly_name == name) {
            return Err(duplicate(ResourceKind::Workflow, &name));
        }
        let workflow = RemoteWorkflow {
            sid,
            friendly_name: name,
            configuration: params.configuration.clone().unwrap_or_default(),
            task_reservation_timeout: Some(
                params
                    .task_reservation_timeout
                    .unwrap_or(DEFAULT_TASK_RESERVATION_TIMEOUT),
            ),
            date_created: Some(Utc::now()),
            date_updated: Some(Utc::now()),
        };
        ws.workflows.push(workflow.clone());
        state.record("create_workflow", Some(workspace), None, params);
        Ok(workflow)
    }

    fn update_workflow(
        &self,
        workspace: &Sid,
        workflow: &Sid,
        params: &WorkflowParams,
    ) -> Result<RemoteWorkflow, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("update_workflow")?;
        let ws = state.workspace(workspace)?;
        let record = find_mut(&mut ws.workflows, workflow, "workflow", |w| &w.sid)?;
        if let Some(name) = &params.friendly_name {
            record.friendly_name = name.clone();
        }
        if let Some(configuration) = &params.configuration {
            record.configuration = configuration.clone();
        }
        if let Some(timeout) = params.task_reservation_timeout {
            record.task_reservation_timeout = Some(timeout);
        }
        record.date_updated = Some(Utc::now());
        let updated = record.clone();
        state.record("update_workflow", Some(workspace), Some(workflow), params);
        Ok(updated)
    }

    fn remove_workflow(&self, workspace: &Sid, workflow: &Sid) -> Result<(), RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("remove_workflow")?;
        let ws = state.workspace(workspace)?;
        remove_by_sid(&mut ws.workflows, workflow, "workflow", |w| &w.sid)?;
        state.record("remove_workflow", Some(workspace), Some(workflow), Value::Null);
        Ok(())
    }

    fn list_workers(&self, workspace: &Sid) -> Result<Vec<RemoteWorker>, RemoteError> {
        self.list("list_workers", workspace, |w| w.workers.clone())
    }

    fn create_worker(&self, workspace: &Sid, params: &NewWorker) -> Result<RemoteWorker, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("create_worker")?;
        let sid = state.sid(ResourceKind::Worker.sid_prefix());
        let ws = state.workspace(workspace)?;
        if ws.workers.iter().any(|w| w.friendly_name == params.friendly_name) {
            return Err(duplicate(ResourceKind::Worker, &params.friendly_name));
        }
        let mut worker = RemoteWorker {
            sid,
            friendly_name: params.friendly_name.clone(),
            attributes: params
                .attributes
                .clone()
                .unwrap_or_else(|| DEFAULT_WORKER_ATTRIBUTES.to_string()),
            activity_sid: None,
            activity_name: None,
            available: false,
            date_created: Some(Utc::now()),
            date_updated: Some(Utc::now()),
        };
        assign_activity(&mut worker, &ws.activities, params.activity_sid.as_ref());
        ws.workers.push(worker.clone());
        state.record("create_worker", Some(workspace), None, params);
        Ok(worker)
    }

    fn update_worker(
        &self,
        workspace: &Sid,
        worker: &Sid,
        params: &WorkerUpdate,
    ) -> Result<RemoteWorker, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("update_worker")?;
        let ws = state.workspace(workspace)?;
        let record = find_mut(&mut ws.workers, worker, "worker", |w| &w.sid)?;
        if let Some(attributes) = &params.attributes {
            record.attributes = attributes.clone();
        }
        record.date_updated = Some(Utc::now());
        let updated = record.clone();
        state.record("update_worker", Some(workspace), Some(worker), params);
        Ok(updated)
    }

    fn remove_worker(&self, workspace: &Sid, worker: &Sid) -> Result<(), RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fail_if_armed("remove_worker")?;
        let ws = state.workspace(workspace)?;
        remove_by_sid(&mut ws.workers, worker, "worker", |w| &w.sid)?;
        state.record("remove_worker", Some(workspace), Some(worker), Value::Null);
        Ok(())
    }
}

fn apply_queue_params(queue: &mut RemoteTaskQueue, params: &TaskQueueParams) {
    if let Some(name) = &params.friendly_name {
        queue.friendly_name = name.clone();
    }
    if let Some(target) = &params.target_workers {
        queue.target_workers = Some(target.clone());
    }
    if let Some(max) = params.max_reserved_workers {
        queue.max_reserved_workers = Some(max);
    }
    if let Some(order) = &params.task_order {
        queue.task_order = Some(order.clone());
    }
    apply_reference(&mut queue.assignment_activity_sid, &params.assignment_activity);
    apply_reference(&mut queue.reservation_activity_sid, &params.reservation_activity);
    queue.date_updated = Some(Utc::now());
}
