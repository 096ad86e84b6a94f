//! Caller-supplied provisioning specs.
//!
//! A `VmSpec` is validated in full before the first remote call; a run
//! never discovers a bad spec halfway through mutating the manager.

use crate::core::domain::error::ValidationError;
use serde::{Deserialize, Serialize};

/// 1 GiB in bytes. Disk sizes are declared in whole GiB and converted to
/// bytes before submission.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Memory values must be multiples of this granularity (MiB).
const MEMORY_GRANULARITY_MIB: u64 = 1024;

/// Xen domain types the manager accepts for a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainType {
    XenHvm,
    XenPvm,
    XenHvmPvDrivers,
}

impl DomainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainType::XenHvm => "XEN_HVM",
            DomainType::XenPvm => "XEN_PVM",
            DomainType::XenHvmPvDrivers => "XEN_HVM_PV_DRIVERS",
        }
    }
}

impl Default for DomainType {
    fn default() -> Self {
        DomainType::XenHvmPvDrivers
    }
}

/// A virtual disk to create and map onto the VM.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DiskSpec {
    pub name: String,
    pub description: String,
    /// Declared in whole GiB; submitted as `size_gib * 1024^3` bytes.
    pub size_gib: u64,
    /// Name of the repository the disk is created in.
    pub repository: String,
}

impl DiskSpec {
    pub fn size_bytes(&self) -> u64 {
        self.size_gib * GIB
    }
}

/// A virtual NIC to attach, referencing a manager network by name.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NicSpec {
    pub name: String,
    pub network: String,
}

/// The desired state of the VM to provision.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VmSpec {
    pub name: String,
    pub memory_mib: u64,
    /// Defaults to `memory_mib` when unset.
    #[serde(default)]
    pub memory_limit_mib: Option<u64>,
    pub cpu_count: u32,
    /// Defaults to `cpu_count` when unset.
    #[serde(default)]
    pub cpu_count_limit: Option<u32>,
    #[serde(default)]
    pub domain_type: DomainType,
    /// Ordered boot device identifiers, e.g. `["Disk", "Network"]`.
    pub boot_order: Vec<String>,
    #[serde(default)]
    pub disks: Vec<DiskSpec>,
    #[serde(default)]
    pub networks: Vec<NicSpec>,
}

impl VmSpec {
    /// The effective memory ceiling, defaulting to the base value.
    pub fn memory_limit(&self) -> u64 {
        self.memory_limit_mib.unwrap_or(self.memory_mib)
    }

    /// The effective vCPU ceiling, defaulting to the base value.
    pub fn cpu_limit(&self) -> u32 {
        self.cpu_count_limit.unwrap_or(self.cpu_count)
    }

    /// Checks every precondition the manager would otherwise reject
    /// mid-run. Called by the orchestrator before any network I/O.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::Field {
                field: "name".to_string(),
                message: "VM name cannot be empty".to_string(),
            });
        }

        if self.memory_mib == 0 || self.memory_mib % MEMORY_GRANULARITY_MIB != 0 {
            return Err(ValidationError::ConstraintViolation(format!(
                "memory_mib must be a non-zero multiple of {}, got {}",
                MEMORY_GRANULARITY_MIB, self.memory_mib
            )));
        }

        if self.memory_limit() % MEMORY_GRANULARITY_MIB != 0 {
            return Err(ValidationError::ConstraintViolation(format!(
                "memory_limit_mib must be a multiple of {}, got {}",
                MEMORY_GRANULARITY_MIB,
                self.memory_limit()
            )));
        }

        if self.memory_limit() < self.memory_mib {
            return Err(ValidationError::ConstraintViolation(format!(
                "memory_limit_mib ({}) is below memory_mib ({})",
                self.memory_limit(),
                self.memory_mib
            )));
        }

        if self.cpu_count == 0 {
            return Err(ValidationError::Field {
                field: "cpu_count".to_string(),
                message: "at least one vCPU is required".to_string(),
            });
        }

        if self.cpu_limit() < self.cpu_count {
            return Err(ValidationError::ConstraintViolation(format!(
                "cpu_count_limit ({}) is below cpu_count ({})",
                self.cpu_limit(),
                self.cpu_count
            )));
        }

        if self.boot_order.is_empty() {
            return Err(ValidationError::Field {
                field: "boot_order".to_string(),
                message: "boot order cannot be empty".to_string(),
            });
        }

        for disk in &self.disks {
            if disk.name.is_empty() {
                return Err(ValidationError::Field {
                    field: "disks.name".to_string(),
                    message: "disk name cannot be empty".to_string(),
                });
            }
            if disk.size_gib == 0 {
                return Err(ValidationError::ConstraintViolation(format!(
                    "disk '{}' must be at least 1 GiB",
                    disk.name
                )));
            }
            if disk.repository.is_empty() {
                return Err(ValidationError::Field {
                    field: "disks.repository".to_string(),
                    message: format!("disk '{}' names no repository", disk.name),
                });
            }
        }

        for nic in &self.networks {
            if nic.network.is_empty() {
                return Err(ValidationError::Field {
                    field: "networks.network".to_string(),
                    message: format!("NIC '{}' names no network", nic.name),
                });
            }
        }

        Ok(())
    }
}

/// Name selectors for where the VM lands: the repository and server pool
/// the clone targets, and the template it is cloned from.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Placement {
    pub repository: String,
    pub server_pool: String,
    pub template: String,
}
