//! # tassa-sync
//!
//! Reconciles a task-routing workspace against a desired-state document.
//!
//! Call [`pipeline::run`] with a document and any [`TaskRouterApi`]
//! implementation, or drive a [`WorkspaceReconciler`] directly with a
//! validated [`DesiredConfig`](tassa_core::DesiredConfig).
//! [`snapshot::snapshot`] reads a workspace without changing it.

pub mod activities;
pub mod api;
pub mod diff;
pub mod error;
pub mod index;
pub mod memory;
pub mod pipeline;
pub mod reconciler;
pub mod resolver;
pub mod settings;
pub mod snapshot;
pub mod synchronizer;
pub mod task_queues;
pub mod workers;
pub mod workflows;

pub use api::TaskRouterApi;
pub use diff::{DiffResult, FieldChange, KindPlan};
pub use error::{RemoteError, SyncError};
pub use index::NameIndex;
pub use memory::InMemoryTaskRouter;
pub use pipeline::DocumentSource;
pub use reconciler::{ReconcileOptions, ReconciliationResult, WorkspaceReconciler};
pub use snapshot::WorkspaceSnapshot;
pub use synchronizer::Warning;
