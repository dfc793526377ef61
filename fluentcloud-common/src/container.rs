use crate::compute::{SshConfiguration, VirtualMachineSizeTypes};
use crate::{ProvisioningState, Resource};
use serde::{Deserialize, Serialize};

pub const NAMESPACE: &str = "Fluent.ContainerService";
pub const MANAGED_CLUSTERS: &str = "managedClusters";

pub const DEFAULT_KUBERNETES_VERSION: &str = "1.29.4";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum AgentPoolMode {
    System,
    User,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolProfile {
    pub name: String,
    pub count: i32,
    pub vm_size: VirtualMachineSizeTypes,
    pub mode: AgentPoolMode,
    #[serde(rename = "osDiskSizeGB", default, skip_serializing_if = "Option::is_none")]
    pub os_disk_size_gb: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContainerServiceLinuxProfile {
    pub admin_username: String,
    #[serde(default)]
    pub ssh: SshConfiguration,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default)]
    pub agent_pool_profiles: Vec<AgentPoolProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux_profile: Option<ContainerServiceLinuxProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

pub type KubernetesClusterData = Resource<ManagedClusterProperties>;
