//! Blocking REST client for the TaskRouter v1 API.
//!
//! Requests are form-encoded and authenticated with HTTP basic auth (account
//! SID + auth token). List calls follow `meta.next_page_url` until the last
//! page. Response bodies use snake_case keys and are mapped onto the
//! `tassa_core` remote records here.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tassa_core::profile::Profile;
use tassa_core::{
    RemoteActivity, RemoteTaskQueue, RemoteWorker, RemoteWorkflow, RemoteWorkspace, Sid,
};
use tassa_sync::api::{
    ActivityParams, NewWorker, TaskQueueParams, WorkerUpdate, WorkflowParams, WorkspaceParams,
};
use tassa_sync::{RemoteError, TaskRouterApi};

const API_VERSION: &str = "v1";

pub struct RestTaskRouter {
    agent: ureq::Agent,
    base_url: String,
    authorization: String,
}

impl RestTaskRouter {
    pub fn new(profile: &Profile) -> Self {
        let timeout = Duration::from_secs(profile.timeout_secs());
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build();
        Self {
            agent,
            base_url: profile.base_url().trim_end_matches('/').to_string(),
            authorization: basic_auth(&profile.account_sid, &profile.auth_token),
        }
    }

    fn url(&self, segments: &[&str]) -> String {
        format!("{}/{API_VERSION}/{}", self.base_url, segments.join("/"))
    }

    fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T, RemoteError> {
        tracing::debug!("GET {url}");
        let mut request = self.agent.get(url).set("Authorization", &self.authorization);
        for (key, value) in query {
            request = request.query(key, value);
        }
        decode(request.call(), what)
    }

    fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        payload: &impl Serialize,
        what: &str,
    ) -> Result<T, RemoteError> {
        let fields = form_fields(payload)?;
        tracing::debug!("POST {url} ({} fields)", fields.len());
        let form: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let response = self
            .agent
            .post(url)
            .set("Authorization", &self.authorization)
            .send_form(&form);
        decode(response, what)
    }

    fn delete(&self, url: &str, what: &str) -> Result<(), RemoteError> {
        tracing::debug!("DELETE {url}");
        self.agent
            .delete(url)
            .set("Authorization", &self.authorization)
            .call()
            .map(|_| ())
            .map_err(|e| classify(e, what))
    }

    /// Collect every page of a list endpoint. `key` names the array in
    /// each page body.
    fn list<W: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        key: &str,
        what: &str,
    ) -> Result<Vec<W>, RemoteError> {
        let mut items = Vec::new();
        let mut page: Value = self.get(&self.url(segments), query, what)?;
        loop {
            let records = page.get_mut(key).map(Value::take).unwrap_or(Value::Null);
            if !records.is_null() {
                let mut batch: Vec<W> = serde_json::from_value(records)
                    .map_err(|e| RemoteError::Decode(format!("{what}: {e}")))?;
                items.append(&mut batch);
            }
            let next = page
                .pointer("/meta/next_page_url")
                .and_then(Value::as_str)
                .map(|next| self.absolute(next));
            match next {
                Some(url) => page = self.get(&url, &[], what)?,
                None => return Ok(items),
            }
        }
    }

    fn absolute(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }
}

fn basic_auth(account_sid: &str, auth_token: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{account_sid}:{auth_token}")))
}

fn decode<T: DeserializeOwned>(
    response: Result<ureq::Response, ureq::Error>,
    what: &str,
) -> Result<T, RemoteError> {
    response
        .map_err(|e| classify(e, what))?
        .into_json()
        .map_err(|e| RemoteError::Decode(format!("{what}: {e}")))
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<u32>,
    message: Option<String>,
}

fn classify(error: ureq::Error, what: &str) -> RemoteError {
    match error {
        ureq::Error::Status(404, _) => RemoteError::NotFound {
            resource: what.to_string(),
        },
        ureq::Error::Status(429, _) => RemoteError::RateLimited,
        ureq::Error::Status(status, response) => {
            let body: ErrorBody = response.into_json().unwrap_or_default();
            RemoteError::Rejected {
                status,
                code: body.code,
                message: body
                    .message
                    .unwrap_or_else(|| format!("request for {what} failed")),
            }
        }
        ureq::Error::Transport(transport) => RemoteError::Transport(transport.to_string()),
    }
}

/// Flatten a camelCase payload into PascalCase form fields. `null` becomes
/// an empty value, which clears the field remotely.
fn form_fields(payload: &impl Serialize) -> Result<Vec<(String, String)>, RemoteError> {
    let value = serde_json::to_value(payload)
        .map_err(|e| RemoteError::Decode(format!("encode request: {e}")))?;
    let Value::Object(map) = value else {
        return Ok(Vec::new());
    };
    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (pascal_case(&key), value)
        })
        .collect())
}

fn pascal_case(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

fn timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc))
}

fn sid(raw: Option<String>) -> Option<Sid> {
    raw.filter(|s| !s.is_empty()).map(Sid::from)
}

#[derive(Debug, Deserialize)]
struct WireWorkspace {
    sid: String,
    friendly_name: String,
    event_callback_url: Option<String>,
    events_filter: Option<String>,
    #[serde(default)]
    multi_task_enabled: bool,
    timeout_activity_sid: Option<String>,
    prioritize_queue_order: Option<String>,
    date_created: Option<String>,
    date_updated: Option<String>,
}

impl From<WireWorkspace> for RemoteWorkspace {
    fn from(w: WireWorkspace) -> Self {
        Self {
            sid: Sid::from(w.sid),
            friendly_name: w.friendly_name,
            event_callback_url: w.event_callback_url,
            events_filter: w.events_filter,
            multi_task_enabled: w.multi_task_enabled,
            timeout_activity_sid: sid(w.timeout_activity_sid),
            prioritize_queue_order: w.prioritize_queue_order,
            date_created: timestamp(w.date_created),
            date_updated: timestamp(w.date_updated),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireActivity {
    sid: String,
    friendly_name: String,
    #[serde(default)]
    available: bool,
    timeout: Option<u64>,
    date_created: Option<String>,
    date_updated: Option<String>,
}

impl From<WireActivity> for RemoteActivity {
    fn from(a: WireActivity) -> Self {
        Self {
            sid: Sid::from(a.sid),
            friendly_name: a.friendly_name,
            available: a.available,
            timeout: a.timeout,
            date_created: timestamp(a.date_created),
            date_updated: timestamp(a.date_updated),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireTaskQueue {
    sid: String,
    friendly_name: String,
    target_workers: Option<String>,
    max_reserved_workers: Option<u64>,
    task_order: Option<String>,
    assignment_activity_sid: Option<String>,
    reservation_activity_sid: Option<String>,
    date_created: Option<String>,
    date_updated: Option<String>,
}

impl From<WireTaskQueue> for RemoteTaskQueue {
    fn from(q: WireTaskQueue) -> Self {
        Self {
            sid: Sid::from(q.sid),
            friendly_name: q.friendly_name,
            target_workers: q.target_workers,
            max_reserved_workers: q.max_reserved_workers,
            task_order: q.task_order,
            assignment_activity_sid: sid(q.assignment_activity_sid),
            reservation_activity_sid: sid(q.reservation_activity_sid),
            date_created: timestamp(q.date_created),
            date_updated: timestamp(q.date_updated),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireWorkflow {
    sid: String,
    friendly_name: String,
    #[serde(default)]
    configuration: String,
    task_reservation_timeout: Option<u64>,
    date_created: Option<String>,
    date_updated: Option<String>,
}

impl From<WireWorkflow> for RemoteWorkflow {
    fn from(w: WireWorkflow) -> Self {
        Self {
            sid: Sid::from(w.sid),
            friendly_name: w.friendly_name,
            configuration: w.configuration,
            task_reservation_timeout: w.task_reservation_timeout,
            date_created: timestamp(w.date_created),
            date_updated: timestamp(w.date_updated),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireWorker {
    sid: String,
    friendly_name: String,
    #[serde(default)]
    attributes: String,
    activity_sid: Option<String>,
    activity_name: Option<String>,
    #[serde(default)]
    available: bool,
    date_created: Option<String>,
    date_updated: Option<String>,
}

impl From<WireWorker> for RemoteWorker {
    fn from(w: WireWorker) -> Self {
        Self {
            sid: Sid::from(w.sid),
            friendly_name: w.friendly_name,
            attributes: w.attributes,
            activity_sid: sid(w.activity_sid),
            activity_name: w.activity_name,
            available: w.available,
            date_created: timestamp(w.date_created),
            date_updated: timestamp(w.date_updated),
        }
    }
}

fn converted<W, R: From<W>>(records: Vec<W>) -> Vec<R> {
    records.into_iter().map(R::from).collect()
}

// ---------------------------------------------------------------------------
// TaskRouterApi
// ---------------------------------------------------------------------------

impl TaskRouterApi for RestTaskRouter {
    fn fetch_workspace(&self, workspace: &Sid) -> Result<RemoteWorkspace, RemoteError> {
        let wire: WireWorkspace = self.get(
            &self.url(&["Workspaces", workspace.as_str()]),
            &[],
            &format!("workspace {workspace}"),
        )?;
        Ok(wire.into())
    }

    fn find_workspaces(&self, friendly_name: &str) -> Result<Vec<RemoteWorkspace>, RemoteError> {
        let wire: Vec<WireWorkspace> = self.list(
            &["Workspaces"],
            &[("FriendlyName", friendly_name)],
            "workspaces",
            "workspaces",
        )?;
        Ok(converted::<_, RemoteWorkspace>(wire)
            .into_iter()
            .filter(|w| w.friendly_name == friendly_name)
            .collect())
    }

    fn create_workspace(&self, params: &WorkspaceParams) -> Result<RemoteWorkspace, RemoteError> {
        let wire: WireWorkspace = self.post(&self.url(&["Workspaces"]), params, "workspace")?;
        Ok(wire.into())
    }

    fn update_workspace(
        &self,
        workspace: &Sid,
        params: &WorkspaceParams,
    ) -> Result<RemoteWorkspace, RemoteError> {
        let wire: WireWorkspace = self.post(
            &self.url(&["Workspaces", workspace.as_str()]),
            params,
            &format!("workspace {workspace}"),
        )?;
        Ok(wire.into())
    }

    fn list_activities(&self, workspace: &Sid) -> Result<Vec<RemoteActivity>, RemoteError> {
        let wire: Vec<WireActivity> = self.list(
            &["Workspaces", workspace.as_str(), "Activities"],
            &[],
            "activities",
            &format!("workspace {workspace}"),
        )?;
        Ok(converted(wire))
    }

    fn create_activity(
        &self,
        workspace: &Sid,
        params: &ActivityParams,
    ) -> Result<RemoteActivity, RemoteError> {
        let wire: WireActivity = self.post(
            &self.url(&["Workspaces", workspace.as_str(), "Activities"]),
            params,
            &format!("workspace {workspace}"),
        )?;
        Ok(wire.into())
    }

    fn update_activity(
        &self,
        workspace: &Sid,
        activity: &Sid,
        params: &ActivityParams,
    ) -> Result<RemoteActivity, RemoteError> {
        let wire: WireActivity = self.post(
            &self.url(&["Workspaces", workspace.as_str(), "Activities", activity.as_str()]),
            params,
            &format!("activity {activity}"),
        )?;
        Ok(wire.into())
    }

    fn remove_activity(&self, workspace: &Sid, activity: &Sid) -> Result<(), RemoteError> {
        self.delete(
            &self.url(&["Workspaces", workspace.as_str(), "Activities", activity.as_str()]),
            &format!("activity {activity}"),
        )
    }

    fn list_task_queues(&self, workspace: &Sid) -> Result<Vec<RemoteTaskQueue>, RemoteError> {
        let wire: Vec<WireTaskQueue> = self.list(
            &["Workspaces", workspace.as_str(), "TaskQueues"],
            &[],
            "task_queues",
            &format!("workspace {workspace}"),
        )?;
        Ok(converted(wire))
    }

    fn create_task_queue(
        &self,
        workspace: &Sid,
        params: &TaskQueueParams,
    ) -> Result<RemoteTaskQueue, RemoteError> {
        let wire: WireTaskQueue = self.post(
            &self.url(&["Workspaces", workspace.as_str(), "TaskQueues"]),
            params,
            &format!("workspace {workspace}"),
        )?;
        Ok(wire.into())
    }

    fn update_task_queue(
        &self,
        workspace: &Sid,
        queue: &Sid,
        params: &TaskQueueParams,
    ) -> Result<RemoteTaskQueue, RemoteError> {
        let wire: WireTaskQueue = self.post(
            &self.url(&["Workspaces", workspace.as_str(), "TaskQueues", queue.as_str()]),
            params,
            &format!("task queue {queue}"),
        )?;
        Ok(wire.into())
    }

    fn remove_task_queue(&self, workspace: &Sid, queue: &Sid) -> Result<(), RemoteError> {
        self.delete(
            &self.url(&["Workspaces", workspace.as_str(), "TaskQueues", queue.as_str()]),
            &format!("task queue {queue}"),
        )
    }

    fn list_workflows(&self, workspace: &Sid) -> Result<Vec<RemoteWorkflow>, RemoteError> {
        let wire: Vec<WireWorkflow> = self.list(
            &["Workspaces", workspace.as_str(), "Workflows"],
            &[],
            "workflows",
            &format!("workspace {workspace}"),
        )?;
        Ok(converted(wire))
    }

    fn create_workflow(
        &self,
        workspace: &Sid,
        params: &WorkflowParams,
    ) -> Result<RemoteWorkflow, RemoteError> {
        let wire: WireWorkflow = self.post(
            &self.url(&["Workspaces", workspace.as_str(), "Workflows"]),
            params,
            &format!("workspace {workspace}"),
        )?;
        Ok(wire.into())
    }

    fn update_workflow(
        &self,
        workspace: &Sid,
        workflow: &Sid,
        params: &WorkflowParams,
    ) -> Result<RemoteWorkflow, RemoteError> {
        let wire: WireWorkflow = self.post(
            &self.url(&["Workspaces", workspace.as_str(), "Workflows", workflow.as_str()]),
            params,
            &format!("workflow {workflow}"),
        )?;
        Ok(wire.into())
    }

    fn remove_workflow(&self, workspace: &Sid, workflow: &Sid) -> Result<(), RemoteError> {
        self.delete(
            &self.url(&["Workspaces", workspace.as_str(), "Workflows", workflow.as_str()]),
            &format!("workflow {workflow}"),
        )
    }

    fn list_workers(&self, workspace: &Sid) -> Result<Vec<RemoteWorker>, RemoteError> {
        let wire: Vec<WireWorker> = self.list(
            &["Workspaces", workspace.as_str(), "Workers"],
            &[],
            "workers",
            &format!("workspace {workspace}"),
        )?;
        Ok(converted(wire))
    }

    fn create_worker(&self, workspace: &Sid, params: &NewWorker) -> Result<RemoteWorker, RemoteError> {
        let wire: WireWorker = self.post(
            &self.url(&["Workspaces", workspace.as_str(), "Workers"]),
            params,
            &format!("workspace {workspace}"),
        )?;
        Ok(wire.into())
    }

    fn update_worker(
        &self,
        workspace: &Sid,
        worker: &Sid,
        params: &WorkerUpdate,
    ) -> Result<RemoteWorker, RemoteError> {
        let wire: WireWorker = self.post(
            &self.url(&["Workspaces", workspace.as_str(), "Workers", worker.as_str()]),
            params,
            &format!("worker {worker}"),
        )?;
        Ok(wire.into())
    }

    fn remove_worker(&self, workspace: &Sid, worker: &Sid) -> Result<(), RemoteError> {
        self.delete(
            &self.url(&["Workspaces", workspace.as_str(), "Workers", worker.as_str()]),
            &format!("worker {worker}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tassa_sync::api::ActivityReference;

    fn profile(base_url: Option<&str>) -> Profile {
        Profile {
            account_sid: "ACxxxxxxxx".into(),
            auth_token: "secret".into(),
            base_url: base_url.map(String::from),
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn urls_are_versioned_and_slash_safe() {
        let client = RestTaskRouter::new(&profile(Some("http://localhost:8080/")));
        assert_eq!(
            client.url(&["Workspaces", "WS1", "TaskQueues"]),
            "http://localhost:8080/v1/Workspaces/WS1/TaskQueues"
        );
        assert_eq!(
            client.absolute("/v1/Workspaces?Page=1"),
            "http://localhost:8080/v1/Workspaces?Page=1"
        );
        assert_eq!(
            client.absolute("https://taskrouter.twilio.com/v1/Workspaces?Page=2"),
            "https://taskrouter.twilio.com/v1/Workspaces?Page=2"
        );
    }

    #[test]
    fn basic_auth_encodes_sid_and_token() {
        assert_eq!(basic_auth("admin", "secret"), "Basic YWRtaW46c2VjcmV0");
    }

    #[test]
    fn payloads_become_pascal_case_form_fields() {
        let params = TaskQueueParams {
            friendly_name: Some("Sales".into()),
            max_reserved_workers: Some(2),
            assignment_activity: Some(ActivityReference::Clear),
            ..TaskQueueParams::default()
        };
        let mut fields = form_fields(&params).unwrap();
        fields.sort();
        assert_eq!(
            fields,
            vec![
                ("AssignmentActivitySid".to_string(), String::new()),
                ("FriendlyName".to_string(), "Sales".to_string()),
                ("MaxReservedWorkers".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn wire_worker_maps_onto_remote_record() {
        let wire: WireWorker = serde_json::from_value(json!({
            "sid": "WK1",
            "friendly_name": "Alice",
            "attributes": "{}",
            "activity_sid": "WA1",
            "activity_name": "Offline",
            "available": false,
            "date_created": "2024-05-14T10:50:02Z",
            "date_updated": "not a date",
            "links": {}
        }))
        .unwrap();
        let worker = RemoteWorker::from(wire);
        assert_eq!(worker.activity_sid, Some(Sid::from("WA1")));
        assert!(worker.date_created.is_some());
        assert!(worker.date_updated.is_none());
    }

    #[test]
    fn empty_reference_sids_are_none() {
        let wire: WireTaskQueue = serde_json::from_value(json!({
            "sid": "WQ1",
            "friendly_name": "Sales",
            "target_workers": "1==1",
            "max_reserved_workers": 1,
            "task_order": "FIFO",
            "assignment_activity_sid": "",
            "reservation_activity_sid": null
        }))
        .unwrap();
        let queue = RemoteTaskQueue::from(wire);
        assert_eq!(queue.assignment_activity_sid, None);
        assert_eq!(queue.reservation_activity_sid, None);
    }
}
