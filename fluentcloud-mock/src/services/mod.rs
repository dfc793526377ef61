//! Service-side behavior per resource type: defaults, validation and the side effects
//! a real provider applies (disk attachment, key generation, fqdn assignment).

pub mod cache;
pub mod compute;
pub mod container;
pub mod network;

use crate::error::{ApiResult, CloudApiError};
use crate::store::StoreData;
use fluentcloud_common::compute::PowerState;
use fluentcloud_common::{
    cache as cache_model, compute as compute_model, container as container_model,
    network as network_model, Resource, ResourceId,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    VirtualMachine,
    Disk,
    DiskEncryptionSet,
    VirtualNetwork,
    RedisCache,
    ManagedCluster,
}

const ALL_KINDS: [ServiceKind; 6] = [
    ServiceKind::VirtualMachine,
    ServiceKind::Disk,
    ServiceKind::DiskEncryptionSet,
    ServiceKind::VirtualNetwork,
    ServiceKind::RedisCache,
    ServiceKind::ManagedCluster,
];

impl ServiceKind {
    pub fn namespace(self) -> &'static str {
        match self {
            ServiceKind::VirtualMachine | ServiceKind::Disk | ServiceKind::DiskEncryptionSet => {
                compute_model::NAMESPACE
            }
            ServiceKind::VirtualNetwork => network_model::NAMESPACE,
            ServiceKind::RedisCache => cache_model::NAMESPACE,
            ServiceKind::ManagedCluster => container_model::NAMESPACE,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            ServiceKind::VirtualMachine => compute_model::VIRTUAL_MACHINES,
            ServiceKind::Disk => compute_model::DISKS,
            ServiceKind::DiskEncryptionSet => compute_model::DISK_ENCRYPTION_SETS,
            ServiceKind::VirtualNetwork => network_model::VIRTUAL_NETWORKS,
            ServiceKind::RedisCache => cache_model::REDIS,
            ServiceKind::ManagedCluster => container_model::MANAGED_CLUSTERS,
        }
    }

    pub fn full_type(self) -> String {
        format!("{}/{}", self.namespace(), self.type_name())
    }

    pub fn resolve(namespace: &str, resource_type: &str) -> ApiResult<Self> {
        ALL_KINDS
            .iter()
            .copied()
            .find(|k| {
                k.namespace().eq_ignore_ascii_case(namespace)
                    && k.type_name().eq_ignore_ascii_case(resource_type)
            })
            .ok_or_else(|| {
                CloudApiError::bad_request(
                    "InvalidResourceType",
                    format!(
                        "The resource type '{}/{}' is not supported",
                        namespace, resource_type
                    ),
                )
            })
    }
}

/// Outcome of a POST action.
#[derive(Debug)]
pub enum ActionOutcome {
    /// Tracked as an operation; the power state is applied on completion.
    LongRunning {
        transitional: PowerState,
        terminal: PowerState,
    },
    /// Answered synchronously with this body.
    Body(Value),
}

fn decode<P: DeserializeOwned>(value: Value) -> ApiResult<Resource<P>> {
    serde_json::from_value(value)
        .map_err(|e| CloudApiError::bad_request("InvalidRequestContent", e.to_string()))
}

fn encode<P: Serialize>(resource: &Resource<P>) -> ApiResult<Value> {
    serde_json::to_value(resource).map_err(|e| CloudApiError::internal(e.to_string()))
}

fn is_kind(value: &Value, kind: ServiceKind) -> bool {
    value
        .get("type")
        .and_then(|t| t.as_str())
        .map(|t| t.eq_ignore_ascii_case(&kind.full_type()))
        .unwrap_or(false)
}

/// Typed view of a stored resource of `kind`; `None` when absent or of another type.
pub(crate) fn lookup<P: DeserializeOwned>(
    data: &StoreData,
    kind: ServiceKind,
    id: &str,
) -> Option<Resource<P>> {
    data.resource(id)
        .filter(|v| is_kind(v, kind))
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

pub(crate) fn all_of<P: DeserializeOwned>(data: &StoreData, kind: ServiceKind) -> Vec<Resource<P>> {
    data.resources_of_type(None, &kind.full_type())
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

pub(crate) fn same_id(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

type Provisioner<P> = fn(
    &mut StoreData,
    &ResourceId,
    Option<Resource<P>>,
    Resource<P>,
) -> ApiResult<Resource<P>>;

fn typed<P: Serialize + DeserializeOwned>(
    provisioner: Provisioner<P>,
    data: &mut StoreData,
    id: &ResourceId,
    existing: Option<Value>,
    body: Value,
) -> ApiResult<Value> {
    let incoming = decode::<P>(body)?;
    let existing = existing.map(decode::<P>).transpose()?;
    let out = provisioner(data, id, existing, incoming)?;
    encode(&out)
}

/// Validates a PUT (or merged PATCH) body and applies service defaults. Side effects on
/// other resources are only made once every check has passed.
pub fn provision(
    kind: ServiceKind,
    data: &mut StoreData,
    id: &ResourceId,
    existing: Option<Value>,
    body: Value,
) -> ApiResult<Value> {
    match kind {
        ServiceKind::VirtualMachine => typed(compute::provision_vm, data, id, existing, body),
        ServiceKind::Disk => typed(compute::provision_disk, data, id, existing, body),
        ServiceKind::DiskEncryptionSet => {
            typed(compute::provision_disk_encryption_set, data, id, existing, body)
        }
        ServiceKind::VirtualNetwork => typed(network::provision, data, id, existing, body),
        ServiceKind::RedisCache => typed(cache::provision, data, id, existing, body),
        ServiceKind::ManagedCluster => typed(container::provision, data, id, existing, body),
    }
}

/// Refuses deletes the provider would refuse (resource still referenced).
pub fn check_delete(kind: ServiceKind, data: &StoreData, id: &str) -> ApiResult<()> {
    match kind {
        ServiceKind::Disk => compute::check_disk_delete(data, id),
        ServiceKind::DiskEncryptionSet => compute::check_disk_encryption_set_delete(data, id),
        ServiceKind::VirtualNetwork => network::check_delete(data, id),
        _ => Ok(()),
    }
}

/// Cleanup applied when a delete completes.
pub fn on_deleted(kind: ServiceKind, data: &mut StoreData, id: &str) {
    if kind == ServiceKind::VirtualMachine {
        compute::release_vm_disks(data, id);
    }
}

pub fn action(
    kind: ServiceKind,
    data: &mut StoreData,
    id: &str,
    action: &str,
    body: Option<Value>,
) -> ApiResult<ActionOutcome> {
    match kind {
        ServiceKind::VirtualMachine => compute::vm_action(action),
        ServiceKind::RedisCache => cache::action(data, id, action, body),
        _ => Err(unsupported_action(kind, action)),
    }
}

pub(crate) fn unsupported_action(kind: ServiceKind, action: &str) -> CloudApiError {
    CloudApiError::bad_request(
        "InvalidAction",
        format!("Action '{}' is not supported on {}", action, kind.full_type()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_ignores_case() {
        assert_eq!(
            ServiceKind::resolve("fluent.compute", "VIRTUALMACHINES").unwrap(),
            ServiceKind::VirtualMachine
        );
        assert_eq!(
            ServiceKind::resolve("Fluent.Cache", "redis").unwrap().full_type(),
            "Fluent.Cache/redis"
        );
        let err = ServiceKind::resolve("Fluent.Compute", "images").unwrap_err();
        assert_eq!(err.code, "InvalidResourceType");
    }
}
