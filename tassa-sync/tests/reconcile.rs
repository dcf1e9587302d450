use rstest::rstest;
use serde_json::{json, Value};
use tassa_core::{ResourceKind, Sid};
use tassa_sync::{
    pipeline::{run, DocumentSource},
    InMemoryTaskRouter, ReconcileOptions, ReconciliationResult, RemoteError, SyncError,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn apply(api: &InMemoryTaskRouter, doc: Value) -> ReconciliationResult {
    init_logging();
    run(api, DocumentSource::Value(doc), ReconcileOptions::default()).expect("reconcile")
}

fn dry_run(api: &InMemoryTaskRouter, doc: Value) -> ReconciliationResult {
    init_logging();
    run(api, DocumentSource::Value(doc), ReconcileOptions { dry_run: true }).expect("dry run")
}

fn routing(queue: &str) -> Value {
    json!({
        "task_routing": {
            "filters": [
                {
                    "filter_friendly_name": "English",
                    "expression": "language == 'en'",
                    "targets": [{ "queue": queue, "priority": 5 }]
                }
            ],
            "default_filter": { "queue": queue }
        }
    })
}

fn full_document(workspace: &Sid) -> Value {
    json!({
        "workspaceSid": workspace.to_string(),
        "settings": { "eventsFilter": "task.created,task.completed" },
        "activities": [
            { "friendlyName": "Offline", "available": false },
            { "friendlyName": "Available", "available": true },
            { "friendlyName": "Busy", "available": false, "timeout": 300 }
        ],
        "taskQueues": [
            {
                "friendlyName": "Sales",
                "targetWorkers": "skills HAS 'sales'",
                "maxReservedWorkers": 2,
                "assignmentActivityName": "Busy",
                "reservationActivityName": "Busy"
            },
            { "friendlyName": "Support", "taskOrder": "LIFO" }
        ],
        "workflows": [
            { "friendlyName": "Inbound", "configuration": routing("Sales"), "taskReservationTimeout": 60 }
        ],
        "workers": [
            { "friendlyName": "Alice", "attributes": "{\"skills\":[\"sales\"]}" },
            { "friendlyName": "Bob" }
        ]
    })
}

fn sid_of<'a>(names: impl IntoIterator<Item = (&'a str, &'a Sid)>, wanted: &str) -> Sid {
    names
        .into_iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, sid)| sid.clone())
        .unwrap_or_else(|| panic!("{wanted} not found"))
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

#[test]
fn second_run_with_unchanged_document_is_empty() {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");

    let first = apply(&api, full_document(&ws));
    assert_eq!(first.activities.added, vec!["Offline", "Available", "Busy"]);
    assert_eq!(first.task_queues.added, vec!["Sales", "Support"]);
    assert_eq!(first.workflows.added, vec!["Inbound"]);
    assert_eq!(first.workers.added, vec!["Alice", "Bob"]);

    api.clear_journal();
    let second = apply(&api, full_document(&ws));

    for kind in ResourceKind::all() {
        assert!(second.diff(*kind).is_empty(), "{kind} changed on second run");
    }
    assert!(second.warnings.is_empty());

    // Settings are written without a read, so they are the only write left.
    let operations: Vec<_> = api.journal().iter().map(|c| c.operation).collect();
    assert_eq!(operations, vec!["update_workspace"]);
}

#[test]
fn external_drift_is_corrected_on_rerun() {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");
    apply(&api, full_document(&ws));

    let stray = api.seed_task_queue(&ws, "Temp");
    let result = apply(&api, full_document(&ws));

    assert_eq!(result.task_queues.deleted, vec!["Temp"]);
    assert!(api.task_queues(&ws).iter().all(|q| q.sid != stray));
    assert!(result.task_queues.added.is_empty());
}

// ---------------------------------------------------------------------------
// Name keys
// ---------------------------------------------------------------------------

#[test]
fn duplicate_friendly_names_collapse_to_the_last_declaration() {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");

    let result = apply(
        &api,
        json!({
            "workspaceSid": ws.to_string(),
            "workers": [
                { "friendlyName": "Alice", "attributes": "{\"v\":1}" },
                { "friendlyName": "Bob" },
                { "friendlyName": "Alice", "attributes": "{\"v\":2}" }
            ]
        }),
    );

    assert_eq!(result.workers.added, vec!["Alice", "Bob"]);
    let workers = api.workers(&ws);
    assert_eq!(workers.len(), 2);
    let alice = workers.iter().find(|w| w.friendly_name == "Alice").expect("alice");
    assert_eq!(alice.attributes, "{\"v\":2}");
}

// ---------------------------------------------------------------------------
// Worker activity
// ---------------------------------------------------------------------------

#[rstest]
#[case("{\"skills\":[\"sales\"]}")]
#[case("{\"skills\":[\"support\"],\"level\":3}")]
#[case("{}")]
fn existing_workers_never_get_an_activity_written(#[case] attributes: &str) {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");
    api.seed_activity(&ws, "Offline", false);
    let on_call = api.seed_activity(&ws, "On Call", false);
    let alice = api.seed_worker(&ws, "Alice", "{\"skills\":[]}", Some(&on_call));

    let result = apply(
        &api,
        json!({
            "workspaceSid": ws.to_string(),
            "workers": [{ "friendlyName": "Alice", "attributes": attributes }]
        }),
    );
    assert_eq!(result.workers.updated, vec!["Alice"]);

    for call in api.journal() {
        if call.operation == "update_worker" {
            assert_eq!(call.target.as_ref(), Some(&alice));
            let payload = call.payload.as_object().expect("object payload");
            assert!(!payload.contains_key("activitySid"), "{payload:?}");
            assert_eq!(payload.len(), 1);
        }
    }
    let alice = &api.workers(&ws)[0];
    assert_eq!(alice.activity_sid.as_ref(), Some(&on_call));
    assert_eq!(alice.attributes, attributes);
}

#[test]
fn activity_drift_alone_is_not_an_update() {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");
    let offline = api.seed_activity(&ws, "Offline", false);
    let busy = api.seed_activity(&ws, "Busy", false);
    let alice = api.seed_worker(&ws, "Alice", "{}", Some(&offline));
    api.set_worker_activity(&ws, &alice, &busy);

    let result = apply(
        &api,
        json!({
            "workspaceSid": ws.to_string(),
            "workers": [{ "friendlyName": "Alice", "attributes": "{ }" }]
        }),
    );

    assert!(result.workers.is_empty());
    assert!(api.journal().is_empty());
    assert_eq!(api.workers(&ws)[0].activity_sid.as_ref(), Some(&busy));
}

#[rstest]
#[case::offline_first(&[("Available", true), ("Offline", false)], "Offline")]
#[case::first_available(&[("Break", false), ("Ready", true)], "Ready")]
#[case::first_of_any(&[("Break", false), ("Lunch", false)], "Break")]
fn new_workers_start_in_the_default_activity(
    #[case] activities: &[(&str, bool)],
    #[case] expected: &str,
) {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");
    for (name, available) in activities {
        api.seed_activity(&ws, name, *available);
    }

    apply(
        &api,
        json!({ "workspaceSid": ws.to_string(), "workers": [{ "friendlyName": "Alice" }] }),
    );

    let worker = &api.workers(&ws)[0];
    assert_eq!(worker.activity_name.as_deref(), Some(expected));
}

#[test]
fn workspace_without_activities_creates_worker_with_warning() {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");

    let result = apply(
        &api,
        json!({ "workspaceSid": ws.to_string(), "workers": [{ "friendlyName": "Alice" }] }),
    );

    assert_eq!(result.workers.added, vec!["Alice"]);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind, ResourceKind::Worker);
    assert_eq!(result.warnings[0].resource, "Alice");
    assert_eq!(api.workers(&ws)[0].activity_sid, None);
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

#[test]
fn references_resolve_to_identifiers_created_earlier_in_the_run() {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");
    apply(&api, full_document(&ws));

    let activities = api.activities(&ws);
    let busy = sid_of(activities.iter().map(|a| (a.friendly_name.as_str(), &a.sid)), "Busy");
    let queues = api.task_queues(&ws);
    let sales = queues.iter().find(|q| q.friendly_name == "Sales").expect("sales");
    assert_eq!(sales.assignment_activity_sid.as_ref(), Some(&busy));
    assert_eq!(sales.reservation_activity_sid.as_ref(), Some(&busy));

    let workflow = &api.workflows(&ws)[0];
    let stored: Value = serde_json::from_str(&workflow.configuration).expect("stored json");
    assert_eq!(stored, routing(sales.sid.as_str()));
    assert_eq!(workflow.task_reservation_timeout, Some(60));
}

#[test]
fn unknown_activity_name_is_omitted_with_a_warning() {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");

    let result = apply(
        &api,
        json!({
            "workspaceSid": ws.to_string(),
            "taskQueues": [{ "friendlyName": "Sales", "assignmentActivityName": "DoesNotExist" }]
        }),
    );

    assert_eq!(result.task_queues.added, vec!["Sales"]);
    assert_eq!(api.task_queues(&ws)[0].assignment_activity_sid, None);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind, ResourceKind::TaskQueue);
    assert!(result.warnings[0].message.contains("DoesNotExist"));

    let create = &api.journal()[0];
    assert!(!create
        .payload
        .as_object()
        .expect("object")
        .contains_key("assignmentActivitySid"));
}

#[test]
fn unknown_queue_name_in_routing_is_kept_with_a_warning() {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");

    let result = apply(
        &api,
        json!({
            "workspaceSid": ws.to_string(),
            "workflows": [{ "friendlyName": "Inbound", "configuration": routing("Nowhere") }]
        }),
    );

    assert_eq!(result.workflows.added, vec!["Inbound"]);
    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings.iter().all(|w| w.kind == ResourceKind::Workflow));
    let stored: Value =
        serde_json::from_str(&api.workflows(&ws)[0].configuration).expect("stored json");
    assert_eq!(stored, routing("Nowhere"));
}

#[test]
fn empty_activity_name_clears_the_reference() {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");
    apply(&api, full_document(&ws));

    let mut doc = full_document(&ws);
    doc["taskQueues"][0]["assignmentActivityName"] = json!("");
    let result = apply(&api, doc);

    assert_eq!(result.task_queues.updated, vec!["Sales"]);
    let plan = result.plan(ResourceKind::TaskQueue).expect("plan");
    assert_eq!(plan.updated[0].changes[0].field, "assignmentActivitySid");
    let sales = api
        .task_queues(&ws)
        .into_iter()
        .find(|q| q.friendly_name == "Sales")
        .expect("sales");
    assert_eq!(sales.assignment_activity_sid, None);
    assert!(sales.reservation_activity_sid.is_some());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn failure_mid_run_keeps_applied_phases_and_stops() {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");
    api.fail_next(
        "create_task_queue",
        RemoteError::Rejected {
            status: 400,
            code: Some(20001),
            message: "Invalid TargetWorkers".into(),
        },
    );

    let err = run(
        &api,
        DocumentSource::Value(full_document(&ws)),
        ReconcileOptions::default(),
    )
    .expect_err("must abort");

    let partial = err.partial().expect("partial result");
    assert_eq!(partial.activities.added, vec!["Offline", "Available", "Busy"]);
    assert!(partial.task_queues.is_empty());
    assert!(partial.workflows.is_empty());
    assert!(partial.workers.is_empty());
    match err.root() {
        SyncError::Remote { operation, source } => {
            assert_eq!(operation, "create task queue 'Sales'");
            assert!(matches!(source, RemoteError::Rejected { status: 400, .. }));
        }
        other => panic!("unexpected root error: {other:?}"),
    }

    assert_eq!(api.activities(&ws).len(), 3);
    assert!(api.workers(&ws).is_empty());

    // Re-running converges.
    let retry = apply(&api, full_document(&ws));
    assert!(retry.activities.is_empty());
    assert_eq!(retry.task_queues.added, vec!["Sales", "Support"]);
    assert_eq!(retry.workers.added, vec!["Alice", "Bob"]);
}

#[test]
fn unknown_workspace_identifier_is_not_found() {
    let api = InMemoryTaskRouter::new();
    let err = run(
        &api,
        DocumentSource::Value(json!({
            "workspaceSid": "WS00000000000000000000000000000000",
            "activities": [{ "friendlyName": "Offline" }]
        })),
        ReconcileOptions::default(),
    )
    .expect_err("must fail");

    assert!(matches!(err, SyncError::WorkspaceNotFound { .. }));
    assert!(api.journal().is_empty());
}

#[test]
fn workspace_vanishing_after_writes_keeps_partial_result() {
    init_logging();
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");
    api.fail_next(
        "list_task_queues",
        RemoteError::NotFound {
            resource: format!("workspace {ws}"),
        },
    );

    let err = run(
        &api,
        DocumentSource::Value(full_document(&ws)),
        ReconcileOptions::default(),
    )
    .expect_err("must abort");

    assert!(err.is_workspace_not_found());
    assert!(matches!(err, SyncError::Aborted { .. }));
    let partial = err.partial().expect("partial result");
    assert_eq!(partial.workspace_sid.as_ref(), Some(&ws));
    assert!(partial.settings.updated);
    assert_eq!(partial.activities.added, vec!["Offline", "Available", "Busy"]);
    assert!(partial.task_queues.is_empty());
    assert!(partial.workers.is_empty());
    assert_eq!(api.activities(&ws).len(), 3);
}

#[test]
fn rate_limit_on_list_aborts_without_writes() {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");
    api.fail_next("list_workers", RemoteError::RateLimited);

    let err = run(
        &api,
        DocumentSource::Value(json!({ "workspaceSid": ws.to_string(), "workers": [] })),
        ReconcileOptions::default(),
    )
    .expect_err("must fail");

    assert!(!err.is_workspace_not_found());
    assert!(matches!(
        err.root(),
        SyncError::Remote { source: RemoteError::RateLimited, .. }
    ));
}

// ---------------------------------------------------------------------------
// Workspace lookup and dry runs
// ---------------------------------------------------------------------------

#[test]
fn missing_named_workspace_is_created_with_settings() {
    let api = InMemoryTaskRouter::new();

    let result = apply(
        &api,
        json!({
            "workspaceName": "Helpdesk",
            "settings": {
                "eventCallbackUrl": "https://example.com/events",
                "multiTaskEnabled": true,
                "prioritizeQueueOrder": "PRIORITY"
            }
        }),
    );

    assert!(result.workspace_created);
    assert!(result.settings.updated);
    let sid = result.workspace_sid.expect("sid");
    let workspace = api.workspace(&sid).expect("created");
    assert_eq!(workspace.friendly_name, "Helpdesk");
    assert_eq!(workspace.event_callback_url.as_deref(), Some("https://example.com/events"));
    assert!(workspace.multi_task_enabled);
    assert_eq!(workspace.prioritize_queue_order.as_deref(), Some("PRIORITY"));

    let again = apply(&api, json!({ "workspaceName": "Helpdesk" }));
    assert!(!again.workspace_created);
    assert_eq!(again.workspace_sid, Some(sid));
}

#[test]
fn dry_run_writes_nothing_and_reports_what_a_real_run_does() {
    let api = InMemoryTaskRouter::new();
    let ws = api.seed_workspace("Support");
    api.seed_activity(&ws, "Offline", false);
    api.seed_activity(&ws, "Busy", true);
    api.seed_activity(&ws, "Legacy", false);
    api.seed_worker(&ws, "Carol", "{}", None);

    let planned = dry_run(&api, full_document(&ws));
    assert!(planned.dry_run);
    assert!(api.journal().is_empty());

    let applied = apply(&api, full_document(&ws));
    for kind in ResourceKind::all() {
        assert_eq!(planned.diff(*kind), applied.diff(*kind), "{kind}");
    }
    assert_eq!(planned.activities.updated, vec!["Busy"]);
    assert_eq!(planned.activities.deleted, vec!["Legacy"]);
    assert_eq!(planned.workers.deleted, vec!["Carol"]);
}
