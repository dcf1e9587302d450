//! Structural validation of the desired-state document.
//!
//! Validation is all-or-nothing: [`validate`] collects every violation in
//! document order, and [`into_config`] only produces a [`DesiredConfig`] when
//! that list is empty. `null` counts as absent for every optional field.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::types::{
    ActivitySpec, DesiredConfig, Settings, Sid, TaskQueueSpec, WorkerSpec, WorkflowSpec,
    WorkspaceRef,
};

/// Expected JSON type of an optional field.
#[derive(Debug, Clone, Copy)]
enum Expect {
    String,
    Boolean,
    Count,
}

impl Expect {
    fn matches(self, value: &Value) -> bool {
        match self {
            Expect::String => value.is_string(),
            Expect::Boolean => value.is_boolean(),
            Expect::Count => value.is_u64(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Expect::String => "a string",
            Expect::Boolean => "a boolean",
            Expect::Count => "a non-negative integer",
        }
    }
}

const SETTINGS_FIELDS: &[(&str, Expect)] = &[
    ("eventCallbackUrl", Expect::String),
    ("eventsFilter", Expect::String),
    ("multiTaskEnabled", Expect::Boolean),
    ("timeoutActivitySid", Expect::String),
    ("prioritizeQueueOrder", Expect::String),
];

const ACTIVITY_FIELDS: &[(&str, Expect)] =
    &[("available", Expect::Boolean), ("timeout", Expect::Count)];

const TASK_QUEUE_FIELDS: &[(&str, Expect)] = &[
    ("targetWorkers", Expect::String),
    ("maxReservedWorkers", Expect::Count),
    ("taskOrder", Expect::String),
    ("assignmentActivityName", Expect::String),
    ("reservationActivityName", Expect::String),
];

const WORKFLOW_FIELDS: &[(&str, Expect)] = &[("taskReservationTimeout", Expect::Count)];

/// Validate a parsed document. Returns every violation; empty means valid.
pub fn validate(doc: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(root) = doc.as_object() else {
        errors.push("Configuration must be a valid JSON object".to_string());
        return errors;
    };

    let sid = present(root, "workspaceSid");
    let name = present(root, "workspaceName");
    if !is_non_empty_string(sid) && !is_non_empty_string(name) {
        errors.push("Either workspaceSid or workspaceName is required".to_string());
    }
    if sid.is_some_and(|v| !v.is_string()) {
        errors.push("workspaceSid must be a string".to_string());
    }
    if name.is_some_and(|v| !v.is_string()) {
        errors.push("workspaceName must be a string".to_string());
    }

    if let Some(settings) = present(root, "settings") {
        match settings.as_object() {
            Some(map) => {
                for (field, expect) in SETTINGS_FIELDS {
                    if present(map, field).is_some_and(|v| !expect.matches(v)) {
                        errors.push(format!("Settings {field} must be {}", expect.describe()));
                    }
                }
            }
            None => errors.push("Settings must be an object".to_string()),
        }
    }

    validate_collection(root, "activities", "Activities", "Activity", &mut errors, |item, label, errors| {
        check_fields(item, label, ACTIVITY_FIELDS, errors);
    });

    validate_collection(root, "taskQueues", "Task queues", "TaskQueue", &mut errors, |item, label, errors| {
        check_fields(item, label, TASK_QUEUE_FIELDS, errors);
    });

    validate_collection(root, "workflows", "Workflows", "Workflow", &mut errors, |item, label, errors| {
        if !present(item, "configuration").is_some_and(Value::is_object) {
            errors.push(format!("{label}: configuration is required and must be an object"));
        }
        check_fields(item, label, WORKFLOW_FIELDS, errors);
    });

    validate_collection(root, "workers", "Workers", "Worker", &mut errors, |item, label, errors| {
        if present(item, "attributes").is_some_and(|v| !v.is_string()) {
            errors.push(format!("{label}: attributes must be a JSON string"));
        }
    });

    errors
}

/// Validate and convert a parsed document into a [`DesiredConfig`].
pub fn into_config(doc: Value) -> Result<DesiredConfig, ConfigError> {
    let errors = validate(&doc);
    if !errors.is_empty() {
        return Err(ConfigError::Invalid { errors });
    }

    let Value::Object(root) = doc else {
        return Err(ConfigError::invalid("Configuration must be a valid JSON object"));
    };

    let workspace = match (string_field(&root, "workspaceSid"), string_field(&root, "workspaceName")) {
        (Some(sid), _) if !sid.is_empty() => WorkspaceRef::Sid(Sid::from(sid)),
        (_, Some(name)) => WorkspaceRef::Name(name.to_string()),
        _ => return Err(ConfigError::invalid("Either workspaceSid or workspaceName is required")),
    };

    Ok(DesiredConfig {
        workspace,
        settings: typed_field::<Settings>(&root, "settings")?,
        activities: typed_field::<Vec<ActivitySpec>>(&root, "activities")?,
        task_queues: typed_field::<Vec<TaskQueueSpec>>(&root, "taskQueues")?,
        workflows: typed_field::<Vec<WorkflowSpec>>(&root, "workflows")?,
        workers: typed_field::<Vec<WorkerSpec>>(&root, "workers")?,
    })
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn validate_collection<F>(
    root: &Map<String, Value>,
    key: &str,
    title: &str,
    item_label: &str,
    errors: &mut Vec<String>,
    check_item: F,
) where
    F: Fn(&Map<String, Value>, &str, &mut Vec<String>),
{
    let Some(value) = present(root, key) else {
        return;
    };
    let Some(items) = value.as_array() else {
        errors.push(format!("{title} must be an array"));
        return;
    };

    for (index, item) in items.iter().enumerate() {
        let label = format!("{item_label}[{index}]");
        let Some(map) = item.as_object() else {
            errors.push(format!("{label}: must be an object"));
            continue;
        };
        if !is_non_empty_string(map.get("friendlyName")) {
            errors.push(format!("{label}: friendlyName is required and must be a string"));
        }
        check_item(map, &label, errors);
    }
}

fn check_fields(
    item: &Map<String, Value>,
    label: &str,
    fields: &[(&str, Expect)],
    errors: &mut Vec<String>,
) {
    for (field, expect) in fields {
        if present(item, field).is_some_and(|v| !expect.matches(v)) {
            errors.push(format!("{label}: {field} must be {}", expect.describe()));
        }
    }
}

/// The value at `key`, treating `null` as absent.
fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn is_non_empty_string(value: Option<&Value>) -> bool {
    value.and_then(Value::as_str).is_some_and(|s| !s.is_empty())
}

fn string_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    present(map, key).and_then(Value::as_str)
}

fn typed_field<T: DeserializeOwned>(
    map: &Map<String, Value>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match present(map, key) {
        None => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ConfigError::invalid(format!("{key}: {e}"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_named_document_is_valid() {
        let config = into_config(json!({ "workspaceName": "Support" })).expect("valid");
        assert_eq!(config.workspace, WorkspaceRef::Name("Support".into()));
        assert!(config.activities.is_none());
        assert!(config.settings.is_none());
    }

    #[test]
    fn sid_wins_over_name() {
        let config = into_config(json!({ "workspaceSid": "WS1", "workspaceName": "Support" }))
            .expect("valid");
        assert_eq!(config.workspace, WorkspaceRef::Sid(Sid::from("WS1")));
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert_eq!(
            validate(&json!([1, 2])),
            vec!["Configuration must be a valid JSON object".to_string()]
        );
    }

    #[test]
    fn missing_workspace_identifier_is_reported() {
        let errors = validate(&json!({ "activities": [] }));
        assert_eq!(errors, vec!["Either workspaceSid or workspaceName is required"]);
    }

    #[test]
    fn violations_are_collected_in_document_order() {
        let errors = validate(&json!({
            "workspaceName": "Support",
            "settings": { "multiTaskEnabled": "yes" },
            "activities": [{ "available": "no" }],
            "taskQueues": "Sales",
            "workflows": [{ "friendlyName": "Main", "taskReservationTimeout": -1 }],
            "workers": [{ "friendlyName": "Alice", "attributes": { "skills": [] } }]
        }));
        assert_eq!(
            errors,
            vec![
                "Settings multiTaskEnabled must be a boolean",
                "Activity[0]: friendlyName is required and must be a string",
                "Activity[0]: available must be a boolean",
                "Task queues must be an array",
                "Workflow[0]: configuration is required and must be an object",
                "Workflow[0]: taskReservationTimeout must be a non-negative integer",
                "Worker[0]: attributes must be a JSON string",
            ]
        );
    }

    #[test]
    fn invalid_document_never_yields_a_config() {
        let err = into_config(json!({
            "workspaceName": "Support",
            "workers": [{ "attributes": "{}" }]
        }))
        .unwrap_err();
        assert_eq!(
            err.violations(),
            &["Worker[0]: friendlyName is required and must be a string".to_string()]
        );
    }

    #[test]
    fn nulls_count_as_absent() {
        let config = into_config(json!({
            "workspaceSid": "WS1",
            "workspaceName": null,
            "settings": null,
            "taskQueues": [{ "friendlyName": "Sales", "targetWorkers": null }],
            "workers": null
        }))
        .expect("valid");
        let queues = config.task_queues.expect("queues declared");
        assert_eq!(queues[0].target_workers, None);
        assert!(config.workers.is_none());
    }

    #[test]
    fn empty_collection_is_declared() {
        let config = into_config(json!({ "workspaceSid": "WS1", "workers": [] })).expect("valid");
        assert_eq!(config.workers, Some(vec![]));
    }

    #[test]
    fn non_object_entries_are_reported() {
        let errors = validate(&json!({ "workspaceSid": "WS1", "activities": ["Offline"] }));
        assert_eq!(errors, vec!["Activity[0]: must be an object"]);
    }
}
