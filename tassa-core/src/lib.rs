//! tassa core library: domain types, document validation, CLI profile.
//!
//! - [`types`]: identifiers, desired-state specs, remote mirrors
//! - [`validation`]: structural validation of the desired-state document
//! - [`document`]: parse documents from text or disk (JSON / YAML)
//! - [`profile`]: credential profile load / save
//! - [`error`]: [`ConfigError`]

pub mod document;
pub mod error;
pub mod profile;
pub mod types;
pub mod validation;

pub use error::ConfigError;
pub use types::{
    ActivitySpec, DesiredConfig, Identified, Named, RemoteActivity, RemoteTaskQueue,
    RemoteWorker, RemoteWorkflow, RemoteWorkspace, ResourceKind, Settings, Sid, TaskQueueSpec,
    WorkerSpec, WorkflowSpec, WorkspaceRef,
};
