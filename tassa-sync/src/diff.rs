//! Pure desired-vs-observed diffing.
//!
//! Nothing in this module talks to the remote. [`plan_kind`] turns two
//! name indexes and a field-change predicate into a [`KindPlan`]; the
//! synchronizers then apply the plan.

use serde::Serialize;
use serde_json::Value;
use similar::TextDiff;

use tassa_core::ResourceKind;

use crate::index::NameIndex;

/// One field whose declared value differs from the observed one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub current: Value,
    pub desired: Value,
}

impl FieldChange {
    pub fn new(field: &'static str, current: impl Into<Value>, desired: impl Into<Value>) -> Self {
        Self {
            field,
            current: current.into(),
            desired: desired.into(),
        }
    }
}

/// A resource present on both sides whose declared fields differ.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedUpdate {
    pub name: String,
    pub changes: Vec<FieldChange>,
}

/// Everything one kind needs, before any write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindPlan {
    pub kind: ResourceKind,
    pub added: Vec<String>,
    pub updated: Vec<PlannedUpdate>,
    pub deleted: Vec<String>,
}

impl KindPlan {
    pub fn empty(kind: ResourceKind) -> Self {
        Self {
            kind,
            added: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// The name-only view reported in results.
    pub fn names(&self) -> DiffResult {
        DiffResult {
            added: self.added.clone(),
            updated: self.updated.iter().map(|u| u.name.clone()).collect(),
            deleted: self.deleted.clone(),
        }
    }
}

/// Names added, updated and deleted for one kind. A name appears in at
/// most one of the three lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Diff one kind.
///
/// Added and updated follow desired insertion order; deleted follows
/// observed order.
pub fn plan_kind<D, R, F>(
    kind: ResourceKind,
    desired: &NameIndex<D>,
    observed: &NameIndex<R>,
    mut changes: F,
) -> KindPlan
where
    F: FnMut(&D, &R) -> Vec<FieldChange>,
{
    let mut plan = KindPlan::empty(kind);

    for (name, _) in desired.iter() {
        if !observed.contains(name) {
            plan.added.push(name.to_string());
        }
    }

    for (name, wanted) in desired.iter() {
        if let Some(current) = observed.get(name) {
            let fields = changes(wanted, current);
            if !fields.is_empty() {
                plan.updated.push(PlannedUpdate {
                    name: name.to_string(),
                    changes: fields,
                });
            }
        }
    }

    for name in observed.names() {
        if !desired.contains(name) {
            plan.deleted.push(name.to_string());
        }
    }

    plan
}

/// Record a change when `desired` is declared and differs from `current`.
/// Undeclared fields never count as different.
pub fn declared<T>(
    changes: &mut Vec<FieldChange>,
    field: &'static str,
    desired: Option<&T>,
    current: Option<&T>,
) where
    T: PartialEq + Clone + Into<Value>,
{
    if let Some(wanted) = desired {
        if current != Some(wanted) {
            changes.push(FieldChange::new(
                field,
                current.cloned().map(Into::into).unwrap_or(Value::Null),
                wanted.clone(),
            ));
        }
    }
}

/// Parse remote JSON text for structural comparison. Text that is not JSON
/// is kept as a string, so it never equals a parsed tree.
pub fn canonical_json(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Unified diff of two JSON trees, pretty-printed.
pub fn render_unified(label: &str, current: &Value, desired: &Value) -> String {
    let old = pretty(current);
    let new = pretty(desired);
    TextDiff::from_lines(&old, &new)
        .unified_diff()
        .header(&format!("a/{label}"), &format!("b/{label}"))
        .context_radius(3)
        .to_string()
}

fn pretty(value: &Value) -> String {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index(pairs: &[(&str, i64)]) -> NameIndex<i64> {
        let mut index = NameIndex::new();
        for (name, value) in pairs {
            index.insert(*name, *value);
        }
        index
    }

    fn numeric_change(desired: &i64, current: &i64) -> Vec<FieldChange> {
        if desired == current {
            vec![]
        } else {
            vec![FieldChange::new("value", *current, *desired)]
        }
    }

    #[test]
    fn phases_are_disjoint_and_ordered() {
        let desired = index(&[("c", 1), ("a", 2), ("b", 3)]);
        let observed = index(&[("x", 0), ("a", 2), ("b", 9), ("y", 0)]);

        let plan = plan_kind(ResourceKind::Activity, &desired, &observed, numeric_change);
        assert_eq!(plan.added, vec!["c"]);
        assert_eq!(plan.names().updated, vec!["b"]);
        assert_eq!(plan.deleted, vec!["x", "y"]);
        assert_eq!(plan.updated[0].changes, vec![FieldChange::new("value", 9, 3)]);
    }

    #[test]
    fn identical_sides_produce_empty_plan() {
        let both = index(&[("a", 1), ("b", 2)]);
        let plan = plan_kind(ResourceKind::Worker, &both, &both.clone(), numeric_change);
        assert!(plan.is_empty());
        assert!(plan.names().is_empty());
    }

    #[test]
    fn undeclared_fields_are_not_compared() {
        let mut changes = Vec::new();
        declared::<bool>(&mut changes, "available", None, Some(&true));
        assert!(changes.is_empty());

        declared(&mut changes, "available", Some(&true), Some(&true));
        assert!(changes.is_empty());

        declared(&mut changes, "timeout", Some(&30u64), None);
        assert_eq!(changes, vec![FieldChange::new("timeout", Value::Null, 30u64)]);
    }

    #[test]
    fn canonical_json_ignores_key_order_and_whitespace() {
        let stored = canonical_json(r#"{ "b": [1, 2], "a": { "queue": "WQ1" } }"#);
        assert_eq!(stored, json!({ "a": { "queue": "WQ1" }, "b": [1, 2] }));
        assert_eq!(canonical_json("not json"), Value::String("not json".into()));
    }

    #[test]
    fn unified_diff_has_headers_and_hunks() {
        let rendered = render_unified(
            "workflows/Inbound",
            &json!({ "default_filter": { "queue": "WQ1" } }),
            &json!({ "default_filter": { "queue": "WQ2" } }),
        );
        assert!(rendered.contains("--- a/workflows/Inbound"));
        assert!(rendered.contains("+++ b/workflows/Inbound"));
        assert!(rendered.contains("@@"));
        assert!(rendered.contains("-    \"queue\": \"WQ1\""));
        assert!(rendered.contains("+    \"queue\": \"WQ2\""));
    }
}
