//! Error types for tassa-sync.

use thiserror::Error;

use tassa_core::{ConfigError, Sid};

use crate::reconciler::ReconciliationResult;

/// Failure reported by a [`TaskRouterApi`](crate::api::TaskRouterApi)
/// implementation for a single call.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The addressed resource does not exist.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The remote asked us to slow down.
    #[error("rate limited by the remote API")]
    RateLimited,

    /// The remote refused the request (validation, conflict, server error).
    #[error("remote rejected the request with HTTP {status}: {message}")]
    Rejected {
        status: u16,
        code: Option<u32>,
        message: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response arrived but could not be decoded.
    #[error("could not decode remote response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

/// All errors that can arise from a reconciliation run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The document was rejected before any remote call.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The target workspace identifier or name does not resolve.
    #[error("workspace {workspace} not found")]
    WorkspaceNotFound { workspace: String },

    /// A remote call failed.
    #[error("{operation} failed: {source}")]
    Remote {
        operation: String,
        #[source]
        source: RemoteError,
    },

    /// A run failed after it started writing. `partial` holds everything
    /// applied before the failure; nothing is rolled back.
    #[error("reconciliation aborted: {source}")]
    Aborted {
        #[source]
        source: Box<SyncError>,
        partial: Box<ReconciliationResult>,
    },
}

impl SyncError {
    /// The innermost error, looking through [`SyncError::Aborted`].
    pub fn root(&self) -> &SyncError {
        match self {
            SyncError::Aborted { source, .. } => source.root(),
            other => other,
        }
    }

    /// `true` for the workspace-level not-found outcome.
    pub fn is_workspace_not_found(&self) -> bool {
        matches!(self.root(), SyncError::WorkspaceNotFound { .. })
    }

    /// Partial result of an aborted run.
    pub fn partial(&self) -> Option<&ReconciliationResult> {
        match self {
            SyncError::Aborted { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

/// Map a failure of a call on a single resource.
pub(crate) fn remote_err(operation: impl Into<String>) -> impl FnOnce(RemoteError) -> SyncError {
    let operation = operation.into();
    move |source| SyncError::Remote { operation, source }
}

/// Map a failure of a workspace-scoped call (workspace fetch/update, any
/// list). Not-found there means the workspace itself is missing.
pub(crate) fn workspace_err(
    workspace: &Sid,
    operation: impl Into<String>,
) -> impl FnOnce(RemoteError) -> SyncError {
    let workspace = workspace.to_string();
    let operation = operation.into();
    move |source| {
        if source.is_not_found() {
            SyncError::WorkspaceNotFound { workspace }
        } else {
            SyncError::Remote { operation, source }
        }
    }
}
