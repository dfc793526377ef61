use super::{
    group_and_name, GroupableDefinition, GroupableResource, GroupableSpec, ResourceKind,
    TaggableUpdate,
};
use crate::error::{Result, SdkError};
use crate::manager::ResourceManager;
use crate::paging::PagedList;
use crate::poller::Poller;
use fluentcloud_common::compute::{SshConfiguration, SshPublicKey, VirtualMachineSizeTypes};
use fluentcloud_common::container::{
    self, AgentPoolMode, AgentPoolProfile, ContainerServiceLinuxProfile, KubernetesClusterData,
    ManagedClusterProperties, DEFAULT_KUBERNETES_VERSION,
};
use fluentcloud_common::ProvisioningState;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub const API_VERSION: &str = "2024-02-01";

pub struct KubernetesClusterKind;

impl ResourceKind for KubernetesClusterKind {
    const NAMESPACE: &'static str = container::NAMESPACE;
    const TYPE: &'static str = container::MANAGED_CLUSTERS;
    const API_VERSION: &'static str = API_VERSION;
    type Properties = ManagedClusterProperties;

    fn provisioning_state(properties: &Self::Properties) -> Option<ProvisioningState> {
        properties.provisioning_state
    }
}

/// Builder that an [`AgentPoolDefinition`] hands its pool back to.
pub trait AgentPoolParent: Sized {
    #[doc(hidden)]
    fn attach_agent_pool(self, pool: AgentPoolProfile) -> Self;
}

pub struct KubernetesClusters {
    manager: ResourceManager,
}

impl KubernetesClusters {
    pub(crate) fn new(manager: ResourceManager) -> Self {
        Self { manager }
    }

    pub fn define(&self, name: &str) -> KubernetesClusterDefinition {
        KubernetesClusterDefinition {
            manager: self.manager.clone(),
            name: name.to_string(),
            spec: GroupableSpec::default(),
            version: None,
            root_username: None,
            ssh_key: None,
            dns_prefix: None,
            pools: Vec::new(),
        }
    }

    pub async fn get_by_resource_group(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<KubernetesCluster> {
        let inner = self
            .manager
            .client::<KubernetesClusterKind>()
            .get(resource_group, name)
            .await?;
        Ok(KubernetesCluster::new(self.manager.clone(), inner))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<KubernetesCluster> {
        let inner = self
            .manager
            .client::<KubernetesClusterKind>()
            .get_by_id(id)
            .await?;
        Ok(KubernetesCluster::new(self.manager.clone(), inner))
    }

    pub fn list_by_resource_group(
        &self,
        resource_group: &str,
    ) -> PagedList<KubernetesClusterData, KubernetesCluster> {
        let manager = self.manager.clone();
        self.manager.client::<KubernetesClusterKind>().list(
            resource_group,
            Arc::new(move |inner| Ok(KubernetesCluster::new(manager.clone(), inner))),
        )
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.manager
            .client::<KubernetesClusterKind>()
            .begin_delete_by_id(id)
            .await?
            .until_done()
            .await
    }
}

/// A managed Kubernetes cluster read back from the service.
#[derive(Debug, Clone)]
pub struct KubernetesCluster {
    manager: ResourceManager,
    inner: KubernetesClusterData,
}

impl GroupableResource for KubernetesCluster {
    type Kind = KubernetesClusterKind;

    fn inner(&self) -> &KubernetesClusterData {
        &self.inner
    }
}

impl KubernetesCluster {
    fn new(manager: ResourceManager, inner: KubernetesClusterData) -> Self {
        Self { manager, inner }
    }

    pub fn version(&self) -> &str {
        self.inner
            .properties
            .kubernetes_version
            .as_deref()
            .unwrap_or_default()
    }

    pub fn dns_prefix(&self) -> &str {
        self.inner.properties.dns_prefix.as_deref().unwrap_or_default()
    }

    pub fn fqdn(&self) -> &str {
        self.inner.properties.fqdn.as_deref().unwrap_or_default()
    }

    pub fn linux_root_username(&self) -> Option<&str> {
        self.inner
            .properties
            .linux_profile
            .as_ref()
            .map(|p| p.admin_username.as_str())
    }

    /// Pools keyed by name.
    pub fn agent_pools(&self) -> BTreeMap<String, AgentPoolProfile> {
        self.inner
            .properties
            .agent_pool_profiles
            .iter()
            .map(|p| (p.name.clone(), p.clone()))
            .collect()
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let (group, name) = group_and_name(self.id())?;
        self.inner = self
            .manager
            .client::<KubernetesClusterKind>()
            .get(&group, &name)
            .await?;
        Ok(())
    }

    pub fn update(&self) -> KubernetesClusterUpdate {
        KubernetesClusterUpdate {
            manager: self.manager.clone(),
            inner: self.inner.clone(),
            missing_pools: Vec::new(),
        }
    }
}

/// One agent pool being defined on a cluster definition or update.
pub struct AgentPoolDefinition<P> {
    parent: P,
    profile: AgentPoolProfile,
}

impl<P: AgentPoolParent> AgentPoolDefinition<P> {
    fn new(parent: P, name: &str) -> Self {
        AgentPoolDefinition {
            parent,
            profile: AgentPoolProfile {
                name: name.to_string(),
                count: 1,
                vm_size: VirtualMachineSizeTypes::STANDARD_D2_V2,
                mode: AgentPoolMode::User,
                os_disk_size_gb: None,
            },
        }
    }

    pub fn with_virtual_machine_size(mut self, size: VirtualMachineSizeTypes) -> Self {
        self.profile.vm_size = size;
        self
    }

    pub fn with_agent_pool_virtual_machine_count(mut self, count: i32) -> Self {
        self.profile.count = count;
        self
    }

    pub fn with_agent_pool_mode(mut self, mode: AgentPoolMode) -> Self {
        self.profile.mode = mode;
        self
    }

    pub fn with_os_disk_size_in_gb(mut self, size: i32) -> Self {
        self.profile.os_disk_size_gb = Some(size);
        self
    }

    pub fn attach(self) -> P {
        self.parent.attach_agent_pool(self.profile)
    }
}

fn upsert_pool(pools: &mut Vec<AgentPoolProfile>, pool: AgentPoolProfile) {
    match pools.iter_mut().find(|p| p.name == pool.name) {
        Some(existing) => *existing = pool,
        None => pools.push(pool),
    }
}

pub struct KubernetesClusterDefinition {
    manager: ResourceManager,
    name: String,
    spec: GroupableSpec,
    version: Option<String>,
    root_username: Option<String>,
    ssh_key: Option<String>,
    dns_prefix: Option<String>,
    pools: Vec<AgentPoolProfile>,
}

impl GroupableDefinition for KubernetesClusterDefinition {
    fn groupable_spec(&mut self) -> &mut GroupableSpec {
        &mut self.spec
    }
}

impl AgentPoolParent for KubernetesClusterDefinition {
    fn attach_agent_pool(mut self, pool: AgentPoolProfile) -> Self {
        upsert_pool(&mut self.pools, pool);
        self
    }
}

impl KubernetesClusterDefinition {
    pub fn with_default_version(mut self) -> Self {
        self.version = Some(DEFAULT_KUBERNETES_VERSION.to_string());
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn with_root_username(mut self, username: &str) -> Self {
        self.root_username = Some(username.to_string());
        self
    }

    pub fn with_ssh_key(mut self, key: &str) -> Self {
        self.ssh_key = Some(key.to_string());
        self
    }

    pub fn with_dns_prefix(mut self, prefix: &str) -> Self {
        self.dns_prefix = Some(prefix.to_string());
        self
    }

    pub fn define_agent_pool(self, name: &str) -> AgentPoolDefinition<Self> {
        AgentPoolDefinition::new(self, name)
    }

    pub async fn begin_create(self) -> Result<Poller<KubernetesCluster>> {
        let admin_username = self
            .root_username
            .ok_or(SdkError::MissingField("root username"))?;
        let key = self.ssh_key.ok_or(SdkError::MissingField("ssh key"))?;
        if self.pools.is_empty() {
            return Err(SdkError::MissingField("agent pool"));
        }
        let (region, group) = self.spec.prepare(&self.manager).await?;

        let mut body: KubernetesClusterData = self.spec.envelope(region);
        body.properties = ManagedClusterProperties {
            kubernetes_version: self.version,
            dns_prefix: Some(self.dns_prefix.unwrap_or_else(|| format!("{}-dns", self.name))),
            fqdn: None,
            agent_pool_profiles: self.pools,
            linux_profile: Some(ContainerServiceLinuxProfile {
                ssh: SshConfiguration {
                    public_keys: vec![SshPublicKey {
                        path: format!("/home/{}/.ssh/authorized_keys", admin_username),
                        key_data: key,
                    }],
                },
                admin_username,
            }),
            provisioning_state: None,
        };

        let manager = self.manager.clone();
        let poller = self
            .manager
            .client::<KubernetesClusterKind>()
            .begin_put(&group, &self.name, &body)
            .await?;
        Ok(poller.map(move |inner| Ok(KubernetesCluster::new(manager, inner))))
    }

    pub async fn create(self) -> Result<KubernetesCluster> {
        self.begin_create().await?.until_done().await
    }
}

pub struct KubernetesClusterUpdate {
    manager: ResourceManager,
    inner: KubernetesClusterData,
    missing_pools: Vec<String>,
}

impl TaggableUpdate for KubernetesClusterUpdate {
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.inner.tags
    }
}

impl AgentPoolParent for KubernetesClusterUpdate {
    fn attach_agent_pool(mut self, pool: AgentPoolProfile) -> Self {
        upsert_pool(&mut self.inner.properties.agent_pool_profiles, pool);
        self
    }
}

impl KubernetesClusterUpdate {
    pub fn update_agent_pool_count(mut self, name: &str, count: i32) -> Self {
        match self
            .inner
            .properties
            .agent_pool_profiles
            .iter_mut()
            .find(|p| p.name == name)
        {
            Some(pool) => pool.count = count,
            None => self.missing_pools.push(name.to_string()),
        }
        self
    }

    pub fn define_agent_pool(self, name: &str) -> AgentPoolDefinition<Self> {
        AgentPoolDefinition::new(self, name)
    }

    pub fn without_agent_pool(mut self, name: &str) -> Self {
        self.inner
            .properties
            .agent_pool_profiles
            .retain(|p| p.name != name);
        self
    }

    pub async fn begin_apply(mut self) -> Result<Poller<KubernetesCluster>> {
        if let Some(name) = self.missing_pools.first() {
            return Err(SdkError::InvalidArgument(format!(
                "cluster has no agent pool named {}",
                name
            )));
        }
        let (group, name) = group_and_name(self.inner.id.as_deref().unwrap_or_default())?;
        info!(
            "[kubernetes] updating {} with {} agent pools",
            name,
            self.inner.properties.agent_pool_profiles.len()
        );
        self.inner.properties.provisioning_state = None;
        let manager = self.manager.clone();
        let poller = self
            .manager
            .client::<KubernetesClusterKind>()
            .begin_put(&group, &name, &self.inner)
            .await?;
        Ok(poller.map(move |inner| Ok(KubernetesCluster::new(manager, inner))))
    }

    pub async fn apply(self) -> Result<KubernetesCluster> {
        self.begin_apply().await?.until_done().await
    }
}
