use super::compute::vm_size_catalog;
use crate::error::{ApiResult, CloudApiError};
use crate::store::StoreData;
use fluentcloud_common::container::{AgentPoolMode, KubernetesClusterData, DEFAULT_KUBERNETES_VERSION};
use fluentcloud_common::ResourceId;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

pub const FQDN_SUFFIX: &str = "fluentk8s.io";
const DEFAULT_POOL_OS_DISK_GB: i32 = 128;
const MAX_POOL_COUNT: i32 = 100;

fn parse_version(raw: &str) -> Option<(u32, u32, u32)> {
    let mut parts = raw.trim().split('.').map(|p| p.parse::<u32>().ok());
    let v = (parts.next()??, parts.next()??, parts.next()??);
    parts.next().is_none().then_some(v)
}

/// `{dnsPrefix}-{first 8 hex of sha256(id)}.hcp.{location}.fluentk8s.io`
pub fn cluster_fqdn(id: &str, dns_prefix: &str, location: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.to_ascii_lowercase().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!(
        "{}-{}.hcp.{}.{}",
        dns_prefix.to_ascii_lowercase(),
        &digest[..8],
        location,
        FQDN_SUFFIX
    )
}

fn valid_dns_prefix(prefix: &str) -> bool {
    !prefix.is_empty()
        && prefix.len() <= 54
        && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !prefix.starts_with('-')
        && !prefix.ends_with('-')
}

fn valid_pool_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 12
        && name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

pub fn provision(
    _data: &mut StoreData,
    id: &ResourceId,
    existing: Option<KubernetesClusterData>,
    mut cluster: KubernetesClusterData,
) -> ApiResult<KubernetesClusterData> {
    let props = &mut cluster.properties;

    let version = props
        .kubernetes_version
        .get_or_insert_with(|| DEFAULT_KUBERNETES_VERSION.to_string())
        .clone();
    let parsed = parse_version(&version).ok_or_else(|| {
        CloudApiError::bad_request(
            "InvalidKubernetesVersion",
            format!("'{}' is not a valid Kubernetes version", version),
        )
    })?;

    match &existing {
        Some(current) => {
            let current_version = current
                .properties
                .kubernetes_version
                .as_deref()
                .and_then(parse_version);
            if current_version.map(|c| parsed < c).unwrap_or(false) {
                return Err(CloudApiError::bad_request(
                    "InvalidKubernetesVersion",
                    "Kubernetes version cannot be downgraded",
                ));
            }
            props.dns_prefix = current.properties.dns_prefix.clone();
            props.linux_profile = current.properties.linux_profile.clone();
        }
        None => {
            let prefix = props.dns_prefix.as_deref().unwrap_or_default();
            if !valid_dns_prefix(prefix) {
                return Err(CloudApiError::invalid_parameter(format!(
                    "'{}' is not a valid dnsPrefix",
                    prefix
                )));
            }
            let profile = props
                .linux_profile
                .as_ref()
                .ok_or_else(|| CloudApiError::invalid_parameter("linuxProfile is required"))?;
            if profile.admin_username.trim().is_empty() || profile.ssh.public_keys.is_empty() {
                return Err(CloudApiError::invalid_parameter(
                    "linuxProfile needs an admin username and an SSH public key",
                ));
            }
        }
    }

    let pools = &mut props.agent_pool_profiles;
    if !pools.iter().any(|p| p.mode == AgentPoolMode::System) {
        return Err(CloudApiError::bad_request(
            "MustDefineAtLeastOneSystemPool",
            "A managed cluster needs at least one System agent pool",
        ));
    }
    let sizes: BTreeSet<String> = vm_size_catalog()
        .into_iter()
        .map(|s| s.name.to_ascii_lowercase())
        .collect();
    let mut names = BTreeSet::new();
    for pool in pools.iter_mut() {
        if !valid_pool_name(&pool.name) {
            return Err(CloudApiError::invalid_parameter(format!(
                "Agent pool name '{}' must be 1-12 lowercase alphanumerics starting with a letter",
                pool.name
            )));
        }
        if !names.insert(pool.name.clone()) {
            return Err(CloudApiError::invalid_parameter(format!(
                "Agent pool {} is defined twice",
                pool.name
            )));
        }
        if !(1..=MAX_POOL_COUNT).contains(&pool.count) {
            return Err(CloudApiError::invalid_parameter(format!(
                "Agent pool {} count must be between 1 and {}",
                pool.name, MAX_POOL_COUNT
            )));
        }
        if !sizes.contains(&pool.vm_size.as_str().to_ascii_lowercase()) {
            return Err(CloudApiError::conflict(
                "SkuNotAvailable",
                format!("VM size {} is not available", pool.vm_size),
            ));
        }
        let disk = *pool.os_disk_size_gb.get_or_insert(DEFAULT_POOL_OS_DISK_GB);
        if !(30..=2048).contains(&disk) {
            return Err(CloudApiError::invalid_parameter(format!(
                "Agent pool {} OS disk size {} GB is invalid",
                pool.name, disk
            )));
        }
    }

    let prefix = props.dns_prefix.clone().unwrap_or_default();
    props.fqdn = Some(cluster_fqdn(&id.to_string(), &prefix, cluster.location.name()));
    Ok(cluster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluentcloud_common::compute::{SshConfiguration, SshPublicKey, VirtualMachineSizeTypes};
    use fluentcloud_common::container::{AgentPoolProfile, ContainerServiceLinuxProfile};
    use fluentcloud_common::{Region, Resource};

    fn id() -> ResourceId {
        ResourceId::resource("s", "rg", "Fluent.ContainerService", "managedClusters", "aks1")
    }

    fn pool(name: &str, mode: AgentPoolMode, count: i32) -> AgentPoolProfile {
        AgentPoolProfile {
            name: name.to_string(),
            count,
            vm_size: VirtualMachineSizeTypes::STANDARD_D2_V2,
            mode,
            os_disk_size_gb: None,
        }
    }

    fn cluster(pools: Vec<AgentPoolProfile>) -> KubernetesClusterData {
        let mut c: KubernetesClusterData = Resource::new(Region::US_WEST2);
        c.properties.dns_prefix = Some("mydns".to_string());
        c.properties.agent_pool_profiles = pools;
        c.properties.linux_profile = Some(ContainerServiceLinuxProfile {
            admin_username: "aksuser".to_string(),
            ssh: SshConfiguration {
                public_keys: vec![SshPublicKey {
                    path: "/home/aksuser/.ssh/authorized_keys".to_string(),
                    key_data: "ssh-rsa AAAA".to_string(),
                }],
            },
        });
        c
    }

    #[test]
    fn fqdn_is_stable_and_scoped_to_region() {
        let a = cluster_fqdn("/x/Y", "MyDns", "westus2");
        assert_eq!(a, cluster_fqdn("/X/y", "mydns", "westus2"));
        assert!(a.starts_with("mydns-"));
        assert!(a.ends_with(".hcp.westus2.fluentk8s.io"));
    }

    #[test]
    fn defaults_applied() {
        let mut data = StoreData::default();
        let out = provision(&mut data, &id(), None, cluster(vec![pool("system", AgentPoolMode::System, 1)])).unwrap();
        assert_eq!(out.properties.kubernetes_version.as_deref(), Some(DEFAULT_KUBERNETES_VERSION));
        assert_eq!(out.properties.agent_pool_profiles[0].os_disk_size_gb, Some(128));
        assert!(out.properties.fqdn.unwrap().contains(".hcp.westus2."));
    }

    #[test]
    fn system_pool_and_counts_enforced() {
        let mut data = StoreData::default();
        let err = provision(&mut data, &id(), None, cluster(vec![pool("user", AgentPoolMode::User, 1)])).unwrap_err();
        assert_eq!(err.code, "MustDefineAtLeastOneSystemPool");
        let err = provision(&mut data, &id(), None, cluster(vec![pool("system", AgentPoolMode::System, 101)])).unwrap_err();
        assert_eq!(err.code, "InvalidParameter");
    }

    #[test]
    fn version_parsing() {
        assert_eq!(parse_version("1.29.4"), Some((1, 29, 4)));
        assert_eq!(parse_version("1.29"), None);
        assert_eq!(parse_version("1.29.4.1"), None);
    }
}
