//! One-call reconciliation entrypoint for embedders.
//!
//! Raw document in, [`ReconciliationResult`] out: parse, validate, then
//! reconcile. Nothing reaches the remote unless the whole document is valid.

use std::path::Path;

use serde_json::Value;

use tassa_core::{document, validation};

use crate::api::TaskRouterApi;
use crate::reconciler::{ReconcileOptions, ReconciliationResult, WorkspaceReconciler};
use crate::SyncError;

/// Where the desired-state document comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource<'a> {
    /// A `.json`, `.yaml` or `.yml` file.
    Path(&'a Path),
    /// JSON text.
    Text(&'a str),
    /// An already-parsed JSON tree.
    Value(Value),
}

/// Run the pipeline for one document.
pub fn run<A: TaskRouterApi + ?Sized>(
    api: &A,
    source: DocumentSource<'_>,
    options: ReconcileOptions,
) -> Result<ReconciliationResult, SyncError> {
    let config = match source {
        DocumentSource::Path(path) => document::load_path(path)?,
        DocumentSource::Text(text) => document::parse_str(text)?,
        DocumentSource::Value(value) => validation::into_config(value)?,
    };
    tracing::debug!("document targets workspace {}", config.workspace);
    WorkspaceReconciler::with_options(api, options).reconcile(&config)
}
