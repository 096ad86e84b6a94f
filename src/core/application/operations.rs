//! Typed create/update/delete/clone/lifecycle operations.
//!
//! Every operation follows the same shape: build a JSON body for the
//! desired state or action, submit it, pull the job id out of the
//! `{id: {value}}` envelope, and hand off to the job monitor. A response
//! that carries no job id means the submission itself went wrong and is
//! escalated as a transport failure rather than quietly returned.

use crate::core::application::job_monitor::JobMonitor;
use crate::core::domain::{
    error::{OvmError, OvmResult},
    model::job::JobSubmission,
    model::resource::ResourceType,
};
use crate::core::infrastructure::api_client::ApiClient;
use serde_json::Value;
use tracing::debug;

/// Job-backed mutations against manager resources.
pub struct ResourceOps<'a> {
    api: &'a ApiClient,
    monitor: &'a JobMonitor<'a>,
}

impl<'a> ResourceOps<'a> {
    pub fn new(api: &'a ApiClient, monitor: &'a JobMonitor<'a>) -> Self {
        Self { api, monitor }
    }

    /// The create-path routing table. Nested resources are created under
    /// their parent; everything else creates under `Vm/{id}`. This mapping
    /// is fixed by the manager's resource model, not discovered.
    fn create_path(kind: ResourceType, parent_id: &str) -> String {
        match kind {
            ResourceType::VirtualDisk => format!("Repository/{parent_id}/VirtualDisk"),
            ResourceType::Diskmap => format!("Vm/{parent_id}/VmDiskMapping"),
            ResourceType::VirtualNic => format!("Vm/{parent_id}/VirtualNic"),
            _ => format!("Vm/{parent_id}"),
        }
    }

    /// Extracts the job id from a mutation response and waits the job out.
    async fn submit_and_await(&self, response: Value, context: &str) -> OvmResult<Option<String>> {
        let submission: JobSubmission =
            serde_json::from_value(response.clone()).map_err(|_| {
                OvmError::Transport(format!(
                    "no job id in response to {context}: {response}"
                ))
            })?;
        let job_id = submission.id.value;
        debug!(job_id = %job_id, context, "mutation submitted");
        self.monitor.await_job(&job_id).await
    }

    /// GET one resource's full representation.
    pub async fn get(&self, kind: ResourceType, id: &str) -> OvmResult<Value> {
        self.api
            .get(&format!("{}/{id}", kind.path_segment()))
            .await
    }

    /// POST a new resource under its parent. Returns the created
    /// resource's id when the job reports one.
    pub async fn create(
        &self,
        kind: ResourceType,
        parent_id: &str,
        body: &Value,
        query: &[(&str, String)],
    ) -> OvmResult<Option<String>> {
        let rel_path = Self::create_path(kind, parent_id);
        let response = self.api.post(&rel_path, body, query).await?;
        self.submit_and_await(response, &format!("create {kind} under {rel_path}"))
            .await
    }

    /// Clones a template VM into a repository and server pool, returning
    /// the new VM's id. The clone job is awaited exactly once.
    pub async fn clone_vm(
        &self,
        template_id: &str,
        repository_id: &str,
        server_pool_id: &str,
    ) -> OvmResult<String> {
        let response = self
            .api
            .put(
                &format!("Vm/{template_id}/clone"),
                None,
                &[
                    ("repositoryId", repository_id.to_string()),
                    ("serverPoolId", server_pool_id.to_string()),
                    ("createTemplate", "false".to_string()),
                ],
            )
            .await?;

        self.submit_and_await(response, "clone Vm")
            .await?
            .ok_or_else(|| {
                OvmError::Transport("clone job completed without a VM id".to_string())
            })
    }

    /// PUT a full updated representation of one resource.
    pub async fn update(
        &self,
        kind: ResourceType,
        id: &str,
        body: &Value,
    ) -> OvmResult<Option<String>> {
        let rel_path = format!("{}/{id}", kind.path_segment());
        let response = self.api.put(&rel_path, Some(body), &[]).await?;
        self.submit_and_await(response, &format!("update {rel_path}"))
            .await
    }

    /// DELETE a top-level resource.
    pub async fn delete(&self, kind: ResourceType, id: &str) -> OvmResult<Option<String>> {
        let rel_path = format!("{}/{id}", kind.path_segment());
        let response = self.api.delete(&rel_path).await?;
        self.submit_and_await(response, &format!("delete {rel_path}"))
            .await
    }

    /// DELETE a NIC nested under its VM.
    pub async fn delete_vm_nic(&self, vm_id: &str, nic_id: &str) -> OvmResult<Option<String>> {
        let rel_path = format!("Vm/{vm_id}/VirtualNic/{nic_id}");
        let response = self.api.delete(&rel_path).await?;
        self.submit_and_await(response, &format!("delete {rel_path}"))
            .await
    }

    /// Starts a VM.
    pub async fn start_vm(&self, vm_id: &str) -> OvmResult<()> {
        let response = self.api.put(&format!("Vm/{vm_id}/start"), None, &[]).await?;
        self.submit_and_await(response, "start Vm").await?;
        Ok(())
    }

    /// Hard-stops a VM via the manager's kill action.
    pub async fn stop_vm(&self, vm_id: &str) -> OvmResult<()> {
        let response = self.api.put(&format!("Vm/{vm_id}/kill"), None, &[]).await?;
        self.submit_and_await(response, "stop Vm").await?;
        Ok(())
    }
}
