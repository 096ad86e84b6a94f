#![feature(error_generic_member_access)]

mod core;


pub use crate::core::application::provision_service::ProvisionOutcome;
pub use crate::core::domain::error::{OvmError, OvmResult, ValidationError};
pub use crate::core::domain::model::config::PollConfig;
pub use crate::core::domain::model::resource::{ObjectId, ResourceRef, ResourceType};
pub use crate::core::domain::model::vm_spec::{
    DiskSpec, DomainType, GIB, NicSpec, Placement, VmSpec,
};
pub use tokio_util::sync::CancellationToken;

use crate::core::application::{
    job_monitor::JobMonitor, operations::ResourceOps, provision_service::ProvisionService,
    resolver::Resolver,
};
use crate::core::domain::model::connection::OvmConnection;
use crate::core::domain::value_object::manager_url::ManagerUrl;
use crate::core::infrastructure::api_client::ApiClient;
use std::backtrace::Backtrace;

/// A client for provisioning virtual machines through the Oracle VM
/// Manager REST API.
///
/// Every mutating call on the manager is asynchronous: it returns a job
/// that the client polls to completion before any dependent step runs.
/// One `provision` call drives one VM through the full sequence:
/// resolve, idempotency gate, clone, reconfigure, attach disks, rewire
/// network.
///
/// # Examples
///
/// ```no_run
/// use ovman::{OvmClient, OvmResult, Placement, VmSpec, DomainType};
///
/// #[tokio::main]
/// async fn main() -> OvmResult<()> {
///     let client = OvmClient::builder()
///         .host("https://ovm.example.com:7002")
///         .credentials("admin", "password")
///         .build()?;
///
///     let spec = VmSpec {
///         name: "web-01".to_string(),
///         memory_mib: 4096,
///         memory_limit_mib: None,
///         cpu_count: 2,
///         cpu_count_limit: None,
///         domain_type: DomainType::XenHvmPvDrivers,
///         boot_order: vec!["Disk".to_string()],
///         disks: vec![],
///         networks: vec![],
///     };
///     let placement = Placement {
///         repository: "repo-fast".to_string(),
///         server_pool: "pool-1".to_string(),
///         template: "ol9-template".to_string(),
///     };
///
///     let outcome = client.provision(&spec, &placement).await?;
///     println!("{outcome:?}");
///     Ok(())
/// }
/// ```
pub struct OvmClient {
    api: ApiClient,
    poll: PollConfig,
}

/// Builder for OvmClient configuration.
///
/// TLS verification defaults to ON; disabling it is an explicit opt-in
/// for managers running self-signed certificates.
#[derive(Debug, Default)]
pub struct OvmClientBuilder {
    host: Option<String>,
    username: Option<String>,
    password: Option<String>,
    danger_accept_invalid_certs: bool,
    poll: Option<PollConfig>,
}

impl OvmClientBuilder {
    /// The manager's base URL, e.g. `https://ovm.example.com:7002`.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Static basic credentials sent with every request.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Opts out of TLS certificate verification.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_certs = accept;
        self
    }

    /// Overrides the poll timing configuration.
    pub fn poll(mut self, poll: PollConfig) -> Self {
        self.poll = Some(poll);
        self
    }

    pub fn build(self) -> OvmResult<OvmClient> {
        let host = self.host.ok_or_else(|| OvmError::Validation {
            source: ValidationError::Field {
                field: "host".to_string(),
                message: "Host is required".to_string(),
            },
            trace: Backtrace::capture(),
        })?;
        let username = self.username.ok_or_else(|| OvmError::Validation {
            source: ValidationError::Field {
                field: "username".to_string(),
                message: "Username is required".to_string(),
            },
            trace: Backtrace::capture(),
        })?;
        let password = self.password.ok_or_else(|| OvmError::Validation {
            source: ValidationError::Field {
                field: "password".to_string(),
                message: "Password is required".to_string(),
            },
            trace: Backtrace::capture(),
        })?;

        let url = ManagerUrl::new(&host)?;
        let connection =
            OvmConnection::new(url, username, password, !self.danger_accept_invalid_certs);

        Ok(OvmClient {
            api: ApiClient::new(connection)?,
            poll: self.poll.unwrap_or_default(),
        })
    }
}

impl OvmClient {
    /// Creates a new builder for OvmClient configuration.
    pub fn builder() -> OvmClientBuilder {
        OvmClientBuilder::default()
    }

    /// Provisions one VM, returning `Unchanged` when a VM with the spec's
    /// name already exists and `Changed` with the created identifiers
    /// otherwise.
    pub async fn provision(&self, spec: &VmSpec, placement: &Placement) -> OvmResult<ProvisionOutcome> {
        self.provision_with_cancel(spec, placement, CancellationToken::new())
            .await
    }

    /// Like [`provision`](Self::provision), but aborts with
    /// `OvmError::Cancelled` as soon as `cancel` is raised during a poll
    /// wait. Already-created resources are not rolled back.
    pub async fn provision_with_cancel(
        &self,
        spec: &VmSpec,
        placement: &Placement,
        cancel: CancellationToken,
    ) -> OvmResult<ProvisionOutcome> {
        ProvisionService::new(&self.api, &self.poll, cancel)
            .execute(spec, placement)
            .await
    }

    /// Waits until the manager reports it is RUNNING. Useful right after
    /// a manager restart, before issuing provisioning work.
    pub async fn ensure_manager_ready(&self) -> OvmResult<()> {
        ProvisionService::new(&self.api, &self.poll, CancellationToken::new())
            .ensure_manager_ready()
            .await
    }

    /// Resolves a resource name to its manager identifier.
    pub async fn resolve(&self, kind: ResourceType, name: &str) -> OvmResult<Option<String>> {
        Resolver::new(&self.api).resolve(kind, name).await
    }

    /// Starts a VM by id, waiting the start job out.
    pub async fn start_vm(&self, vm_id: &str) -> OvmResult<()> {
        let monitor = JobMonitor::new(&self.api, &self.poll, CancellationToken::new());
        ResourceOps::new(&self.api, &monitor).start_vm(vm_id).await
    }

    /// Hard-stops a VM by id, waiting the kill job out.
    pub async fn stop_vm(&self, vm_id: &str) -> OvmResult<()> {
        let monitor = JobMonitor::new(&self.api, &self.poll, CancellationToken::new());
        ResourceOps::new(&self.api, &monitor).stop_vm(vm_id).await
    }
}
