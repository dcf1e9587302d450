//! Activity synchronization. Activities reference nothing, so resolution is
//! the identity.

use tassa_core::{ActivitySpec, RemoteActivity, ResourceKind, Sid};

use crate::api::{ActivityParams, TaskRouterApi};
use crate::diff::{declared, FieldChange};
use crate::error::{remote_err, workspace_err, SyncError};
use crate::index::NameIndex;
use crate::synchronizer::{ResourceSynchronizer, Warning};

pub struct ActivitySynchronizer<'a, A: TaskRouterApi + ?Sized> {
    api: &'a A,
    workspace: &'a Sid,
}

impl<'a, A: TaskRouterApi + ?Sized> ActivitySynchronizer<'a, A> {
    pub fn new(api: &'a A, workspace: &'a Sid) -> Self {
        Self { api, workspace }
    }
}

impl<A: TaskRouterApi + ?Sized> ResourceSynchronizer for ActivitySynchronizer<'_, A> {
    type Spec = ActivitySpec;
    type Resolved = ActivitySpec;
    type Remote = RemoteActivity;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Activity
    }

    fn list(&mut self) -> Result<Vec<RemoteActivity>, SyncError> {
        self.api
            .list_activities(self.workspace)
            .map_err(workspace_err(self.workspace, "list activities"))
    }

    fn resolve(
        &mut self,
        desired: NameIndex<ActivitySpec>,
    ) -> Result<NameIndex<ActivitySpec>, SyncError> {
        Ok(desired)
    }

    fn changes(&self, desired: &ActivitySpec, remote: &RemoteActivity) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        declared(
            &mut changes,
            "available",
            desired.available.as_ref(),
            Some(&remote.available),
        );
        declared(
            &mut changes,
            "timeout",
            desired.timeout.as_ref(),
            remote.timeout.as_ref(),
        );
        changes
    }

    fn create(&mut self, name: &str, desired: &ActivitySpec) -> Result<(), SyncError> {
        let params = ActivityParams {
            friendly_name: Some(name.to_string()),
            available: desired.available,
            timeout: desired.timeout,
        };
        self.api
            .create_activity(self.workspace, &params)
            .map_err(remote_err(format!("create activity '{name}'")))?;
        Ok(())
    }

    fn update(
        &mut self,
        name: &str,
        desired: &ActivitySpec,
        remote: &RemoteActivity,
    ) -> Result<(), SyncError> {
        let params = ActivityParams {
            friendly_name: None,
            available: desired.available,
            timeout: desired.timeout,
        };
        self.api
            .update_activity(self.workspace, &remote.sid, &params)
            .map_err(remote_err(format!("update activity '{name}'")))?;
        Ok(())
    }

    fn remove(&mut self, remote: &RemoteActivity) -> Result<(), SyncError> {
        self.api
            .remove_activity(self.workspace, &remote.sid)
            .map_err(remote_err(format!(
                "delete activity '{}'",
                remote.friendly_name
            )))
    }

    fn take_warnings(&mut self) -> Vec<Warning> {
        Vec::new()
    }
}
