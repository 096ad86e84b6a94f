//! Manager-side resource identity types.
//!
//! Everything the manager exposes is addressed by a type segment plus an
//! opaque identifier; names are only ever used to look the identifier up.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The resource kinds exposed by the manager's REST surface.
///
/// `Diskmap` is the one kind whose path segment (`VmDiskMapping`) differs
/// from its name; everything else renders verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Manager,
    Vm,
    Repository,
    ServerPool,
    Network,
    VirtualDisk,
    VirtualNic,
    Diskmap,
    Job,
}

impl ResourceType {
    /// The path segment used when addressing this kind directly,
    /// e.g. `Vm/{id}` or `Network/id`.
    pub fn path_segment(&self) -> &'static str {
        match self {
            ResourceType::Manager => "Manager",
            ResourceType::Vm => "Vm",
            ResourceType::Repository => "Repository",
            ResourceType::ServerPool => "ServerPool",
            ResourceType::Network => "Network",
            ResourceType::VirtualDisk => "VirtualDisk",
            ResourceType::VirtualNic => "VirtualNic",
            ResourceType::Diskmap => "VmDiskMapping",
            ResourceType::Job => "Job",
        }
    }

    /// The fully-qualified wire model name the manager expects in typed
    /// id blobs, e.g. on `VmDiskMapping` bodies.
    pub fn wire_model(&self) -> String {
        format!("com.oracle.ovm.mgr.ws.model.{}", self.path_segment())
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// A resolved reference to a manager-side object.
///
/// Built once by the resolver and treated as opaque and immutable for the
/// remainder of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceType,
    pub id: String,
    pub name: Option<String>,
}

impl ResourceRef {
    pub fn new(kind: ResourceType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: None,
        }
    }

    pub fn named(kind: ResourceType, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

/// One row of a `/{Type}/id` listing: a display name and its identifier.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IdPair {
    pub name: String,
    pub value: String,
}

/// The manager's identifier blob, attached to every object and job.
///
/// Only `value` is guaranteed; `type`, `uri` and `name` appear on richer
/// representations (e.g. `Network.id`) and are carried through when the
/// manager requires the full blob back (VirtualNic creation).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObjectId {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ObjectId {
    pub fn bare(value: impl Into<String>) -> Self {
        Self {
            kind: None,
            value: value.into(),
            uri: None,
            name: None,
        }
    }
}
