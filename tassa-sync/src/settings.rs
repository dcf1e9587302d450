//! Workspace settings: a sparse update with no read beforehand.
//!
//! Undeclared fields are never sent, so they keep whatever value the remote
//! holds. There is no way to unset a field.

use tassa_core::{Settings, Sid};

use crate::api::{TaskRouterApi, WorkspaceParams};
use crate::error::{workspace_err, SyncError};

pub struct SettingsSynchronizer<'a, A: TaskRouterApi + ?Sized> {
    api: &'a A,
    workspace: &'a Sid,
}

impl<'a, A: TaskRouterApi + ?Sized> SettingsSynchronizer<'a, A> {
    pub fn new(api: &'a A, workspace: &'a Sid) -> Self {
        Self { api, workspace }
    }

    /// Write every declared field. Returns whether an update was issued.
    pub fn sync(&self, settings: &Settings) -> Result<bool, SyncError> {
        let params = WorkspaceParams::from_settings(settings);
        if params.is_empty() {
            tracing::debug!("settings declared without fields; nothing to write");
            return Ok(false);
        }
        self.api
            .update_workspace(self.workspace, &params)
            .map_err(workspace_err(self.workspace, "update workspace settings"))?;
        tracing::info!(
            "updated workspace settings ({})",
            declared_fields(settings).join(", ")
        );
        Ok(true)
    }
}

/// Names of the declared settings fields, in document order.
pub fn declared_fields(settings: &Settings) -> Vec<&'static str> {
    [
        ("eventCallbackUrl", settings.event_callback_url.is_some()),
        ("eventsFilter", settings.events_filter.is_some()),
        ("multiTaskEnabled", settings.multi_task_enabled.is_some()),
        ("timeoutActivitySid", settings.timeout_activity_sid.is_some()),
        ("prioritizeQueueOrder", settings.prioritize_queue_order.is_some()),
    ]
    .into_iter()
    .filter_map(|(field, set)| set.then_some(field))
    .collect()
}
