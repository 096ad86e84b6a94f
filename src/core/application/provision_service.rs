//! The provisioning orchestrator.
//!
//! One run drives one VM through a strictly ordered sequence: resolve
//! names, gate on the idempotency check, clone, reconfigure, attach
//! disks, rewire the network. No step begins before its predecessor's job
//! has reached a terminal state, and no step ever branches back. There is
//! no rollback: a mid-run failure leaves already-created resources on the
//! manager, with their identifiers in the log for cleanup.

use crate::core::application::{
    job_monitor::JobMonitor, operations::ResourceOps, resolver::Resolver,
};
use crate::core::domain::{
    error::{OvmError, OvmResult},
    model::config::PollConfig,
    model::resource::ResourceType,
    model::vm_spec::{Placement, VmSpec},
};
use crate::core::infrastructure::api_client::ApiClient;
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The result of one provisioning run.
///
/// `Unchanged` is only ever produced by the idempotency gate: a VM with
/// the target name already exists and nothing was mutated. The gate is
/// name-based, not spec-based; re-running with a different spec against an
/// existing name is a no-op, never a reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Unchanged {
        vm_id: String,
    },
    Changed {
        vm_id: String,
        disk_ids: Vec<String>,
        nic_ids: Vec<String>,
    },
}

/// Orchestrates one VM provisioning run over a manager connection.
pub struct ProvisionService<'a> {
    api: &'a ApiClient,
    config: &'a PollConfig,
    cancel: CancellationToken,
}

impl<'a> ProvisionService<'a> {
    pub fn new(api: &'a ApiClient, config: &'a PollConfig, cancel: CancellationToken) -> Self {
        Self {
            api,
            config,
            cancel,
        }
    }

    /// Runs the full provisioning sequence for `spec`.
    ///
    /// The spec is validated before the first remote call; a bad spec can
    /// never leave the manager half-mutated. Errors from any step after
    /// the gate propagate unmodified.
    pub async fn execute(&self, spec: &VmSpec, placement: &Placement) -> OvmResult<ProvisionOutcome> {
        spec.validate()?;

        let resolver = Resolver::new(self.api);
        let monitor = JobMonitor::new(self.api, self.config, self.cancel.clone());
        let ops = ResourceOps::new(self.api, &monitor);

        // Step 1: resolve everything up front. Absence stays soft here;
        // it only turns fatal when the id is consumed below.
        let repository_id = resolver
            .resolve(ResourceType::Repository, &placement.repository)
            .await?;
        let server_pool_id = resolver
            .resolve(ResourceType::ServerPool, &placement.server_pool)
            .await?;
        let template_id = resolver.resolve(ResourceType::Vm, &placement.template).await?;
        let existing_vm = resolver.resolve(ResourceType::Vm, &spec.name).await?;

        // Step 2: idempotency gate.
        if let Some(vm_id) = existing_vm {
            info!(vm = %spec.name, vm_id = %vm_id, "VM already exists, nothing to do");
            return Ok(ProvisionOutcome::Unchanged { vm_id });
        }

        let repository_id = repository_id.ok_or_else(|| OvmError::NotFound {
            kind: ResourceType::Repository,
            name: placement.repository.clone(),
        })?;
        let server_pool_id = server_pool_id.ok_or_else(|| OvmError::NotFound {
            kind: ResourceType::ServerPool,
            name: placement.server_pool.clone(),
        })?;
        let template_id = template_id.ok_or_else(|| OvmError::NotFound {
            kind: ResourceType::Vm,
            name: placement.template.clone(),
        })?;

        // Step 3: clone.
        info!(vm = %spec.name, template = %placement.template, "cloning template");
        let vm_id = ops
            .clone_vm(&template_id, &repository_id, &server_pool_id)
            .await?;
        info!(vm_id = %vm_id, "clone complete");

        // Step 4: reconfigure compute/memory profile and await readiness.
        let vm_repr = self.reconfigure(&ops, &vm_id, spec).await?;

        // Step 5: attach disks.
        let disk_ids = self.attach_disks(&resolver, &ops, &vm_id, spec).await?;

        // Step 6: rewire network.
        let nic_ids = self
            .rewire_network(&resolver, &ops, &vm_id, &vm_repr, spec)
            .await?;

        Ok(ProvisionOutcome::Changed {
            vm_id,
            disk_ids,
            nic_ids,
        })
    }

    /// Overwrites the cloned VM's profile fields with the spec's values
    /// and submits a full update, then waits for the new representation
    /// to become visible.
    async fn reconfigure(
        &self,
        ops: &ResourceOps<'_>,
        vm_id: &str,
        spec: &VmSpec,
    ) -> OvmResult<Value> {
        let mut vm_repr = ops.get(ResourceType::Vm, vm_id).await?;

        vm_repr["name"] = json!(&spec.name);
        vm_repr["memory"] = json!(spec.memory_mib);
        vm_repr["memoryLimit"] = json!(spec.memory_limit());
        vm_repr["cpuCount"] = json!(spec.cpu_count);
        vm_repr["cpuCountLimit"] = json!(spec.cpu_limit());
        vm_repr["vmDomainType"] = json!(spec.domain_type.as_str());
        vm_repr["bootOrder"] = json!(&spec.boot_order);

        info!(vm_id, memory = spec.memory_mib, cpus = spec.cpu_count, "reconfiguring VM");
        ops.update(ResourceType::Vm, vm_id, &vm_repr).await?;

        self.await_vm_settle(ops, vm_id, &spec.name).await?;
        Ok(vm_repr)
    }

    /// Readiness check after the reconfigure update: poll the VM until its
    /// representation reports the new name, bounded by the settle timeout.
    /// A representation without a name field gives us no readiness signal,
    /// so fall back to one bounded fixed delay.
    async fn await_vm_settle(
        &self,
        ops: &ResourceOps<'_>,
        vm_id: &str,
        expected_name: &str,
    ) -> OvmResult<()> {
        let started = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                return Err(OvmError::Cancelled);
            }

            let vm_repr = ops.get(ResourceType::Vm, vm_id).await?;
            match vm_repr.get("name").and_then(Value::as_str) {
                Some(name) if name == expected_name => {
                    debug!(vm_id, elapsed = ?started.elapsed(), "VM settled");
                    return Ok(());
                }
                Some(_) => {}
                None => {
                    warn!(vm_id, "VM exposes no readiness signal, using fixed settle delay");
                    sleep(self.config.settle_delay).await;
                    return Ok(());
                }
            }

            if started.elapsed() >= self.config.settle_timeout {
                return Err(OvmError::Timeout {
                    job_id: format!("Vm/{vm_id}"),
                    waited: started.elapsed(),
                });
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(OvmError::Cancelled),
                _ = sleep(self.config.interval) => {}
            }
        }
    }

    /// Creates each declared disk and maps it onto the VM. Targets are a
    /// 1-based, gap-free sequence in creation order. Each disk is two
    /// dependent jobs; failure of either aborts the remaining loop.
    async fn attach_disks(
        &self,
        resolver: &Resolver<'_>,
        ops: &ResourceOps<'_>,
        vm_id: &str,
        spec: &VmSpec,
    ) -> OvmResult<Vec<String>> {
        let mut disk_ids = Vec::with_capacity(spec.disks.len());

        for (index, disk) in spec.disks.iter().enumerate() {
            let repository = resolver
                .resolve_required(ResourceType::Repository, &disk.repository)
                .await?;

            let disk_body = json!({
                "diskType": "VIRTUAL_DISK",
                "name": &disk.name,
                "description": &disk.description,
                "size": disk.size_bytes(),
                "shareable": false,
            });
            let disk_id = ops
                .create(ResourceType::VirtualDisk, &repository.id, &disk_body, &[])
                .await?
                .ok_or_else(|| {
                    OvmError::Transport(format!(
                        "disk creation job for '{}' produced no disk id",
                        disk.name
                    ))
                })?;
            info!(vm_id, disk = %disk.name, disk_id = %disk_id, "virtual disk created");

            let disk_repr = ops.get(ResourceType::VirtualDisk, &disk_id).await?;
            let mapping = json!({
                "id": {"type": ResourceType::Diskmap.wire_model()},
                "virtualDiskId": {
                    "type": ResourceType::VirtualDisk.wire_model(),
                    "value": &disk_id,
                },
                "diskTarget": index + 1,
                "name": disk_repr["name"].clone(),
                "description": disk_repr["description"].clone(),
                "diskWriteMode": "READ_WRITE",
            });
            ops.create(ResourceType::Diskmap, vm_id, &mapping, &[]).await?;
            debug!(vm_id, disk_id = %disk_id, target = index + 1, "disk mapped");

            disk_ids.push(disk_id);
        }

        Ok(disk_ids)
    }

    /// Deletes the template-inherited NIC, then attaches one NIC per spec
    /// entry, each referencing its resolved network.
    ///
    /// The deletion is unconditional: an empty network list leaves the VM
    /// with zero NICs.
    async fn rewire_network(
        &self,
        resolver: &Resolver<'_>,
        ops: &ResourceOps<'_>,
        vm_id: &str,
        vm_repr: &Value,
        spec: &VmSpec,
    ) -> OvmResult<Vec<String>> {
        if spec.networks.is_empty() {
            warn!(vm_id, "spec declares no networks; VM will be left without any NIC");
        }

        match vm_repr["virtualNicIds"][0]["value"].as_str() {
            Some(template_nic) => {
                info!(vm_id, nic_id = template_nic, "removing template-inherited NIC");
                ops.delete_vm_nic(vm_id, template_nic).await?;
            }
            None => debug!(vm_id, "template carried no NIC to remove"),
        }

        let mut nic_ids = Vec::with_capacity(spec.networks.len());
        for nic in &spec.networks {
            let network = resolver
                .resolve_required(ResourceType::Network, &nic.network)
                .await?;
            let network_repr = ops.get(ResourceType::Network, &network.id).await?;

            let body = json!({
                "networkId": {
                    "type": ResourceType::Network.wire_model(),
                    "value": network_repr["id"]["value"].clone(),
                    "uri": network_repr["id"]["uri"].clone(),
                    "name": &nic.name,
                },
            });
            let nic_id = ops
                .create(ResourceType::VirtualNic, vm_id, &body, &[])
                .await?;
            info!(vm_id, network = %nic.network, nic_id = nic_id.as_deref(), "virtual NIC attached");

            if let Some(nic_id) = nic_id {
                nic_ids.push(nic_id);
            }
        }

        Ok(nic_ids)
    }

    /// Blocks until the manager itself reports RUNNING, bounded by the job
    /// timeout. The manager refuses most work while it is starting up.
    pub async fn ensure_manager_ready(&self) -> OvmResult<()> {
        let started = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                return Err(OvmError::Cancelled);
            }

            let managers = self.api.get("Manager").await?;
            let run_state = managers[0]["managerRunState"].as_str().unwrap_or_default();
            if run_state.eq_ignore_ascii_case("RUNNING") {
                return Ok(());
            }

            if started.elapsed() >= self.config.job_timeout {
                return Err(OvmError::Timeout {
                    job_id: "Manager".to_string(),
                    waited: started.elapsed(),
                });
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(OvmError::Cancelled),
                _ = sleep(self.config.interval) => {}
            }
        }
    }
}
