use super::{
    group_and_name, GroupableDefinition, GroupableResource, GroupableSpec, ResourceKind,
    TaggableUpdate,
};
use crate::error::{Result, SdkError};
use crate::manager::ResourceManager;
use crate::paging::PagedList;
use crate::poller::Poller;
use fluentcloud_common::network::{self, NetworkData, NetworkProperties, Subnet};
use fluentcloud_common::ProvisioningState;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const API_VERSION: &str = "2023-09-01";

pub struct NetworkKind;

impl ResourceKind for NetworkKind {
    const NAMESPACE: &'static str = network::NAMESPACE;
    const TYPE: &'static str = network::VIRTUAL_NETWORKS;
    const API_VERSION: &'static str = API_VERSION;
    type Properties = NetworkProperties;

    fn provisioning_state(properties: &Self::Properties) -> Option<ProvisioningState> {
        properties.provisioning_state
    }
}

pub struct Networks {
    manager: ResourceManager,
}

impl Networks {
    pub(crate) fn new(manager: ResourceManager) -> Self {
        Self { manager }
    }

    pub fn define(&self, name: &str) -> NetworkDefinition {
        NetworkDefinition {
            manager: self.manager.clone(),
            name: name.to_string(),
            spec: GroupableSpec::default(),
            address_spaces: Vec::new(),
            subnets: Vec::new(),
        }
    }

    pub async fn get_by_resource_group(&self, resource_group: &str, name: &str) -> Result<Network> {
        let inner = self
            .manager
            .client::<NetworkKind>()
            .get(resource_group, name)
            .await?;
        Ok(Network::new(self.manager.clone(), inner))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Network> {
        let inner = self.manager.client::<NetworkKind>().get_by_id(id).await?;
        Ok(Network::new(self.manager.clone(), inner))
    }

    pub fn list_by_resource_group(&self, resource_group: &str) -> PagedList<NetworkData, Network> {
        let manager = self.manager.clone();
        self.manager.client::<NetworkKind>().list(
            resource_group,
            Arc::new(move |inner| Ok(Network::new(manager.clone(), inner))),
        )
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.manager
            .client::<NetworkKind>()
            .begin_delete_by_id(id)
            .await?
            .until_done()
            .await
    }
}

/// A virtual network read back from the service.
#[derive(Debug, Clone)]
pub struct Network {
    manager: ResourceManager,
    inner: NetworkData,
}

impl GroupableResource for Network {
    type Kind = NetworkKind;

    fn inner(&self) -> &NetworkData {
        &self.inner
    }
}

impl Network {
    fn new(manager: ResourceManager, inner: NetworkData) -> Self {
        Self { manager, inner }
    }

    pub fn address_spaces(&self) -> &[String] {
        &self.inner.properties.address_space.address_prefixes
    }

    /// Subnet name to address prefix.
    pub fn subnets(&self) -> BTreeMap<String, String> {
        self.inner
            .properties
            .subnets
            .iter()
            .map(|s| (s.name.clone(), s.address_prefix.clone()))
            .collect()
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let (group, name) = group_and_name(self.id())?;
        self.inner = self.manager.client::<NetworkKind>().get(&group, &name).await?;
        Ok(())
    }

    pub fn update(&self) -> NetworkUpdate {
        NetworkUpdate {
            manager: self.manager.clone(),
            inner: self.inner.clone(),
        }
    }
}

fn upsert_subnet(subnets: &mut Vec<Subnet>, name: &str, cidr: &str) {
    match subnets.iter_mut().find(|s| s.name == name) {
        Some(existing) => existing.address_prefix = cidr.to_string(),
        None => subnets.push(Subnet {
            name: name.to_string(),
            address_prefix: cidr.to_string(),
        }),
    }
}

pub struct NetworkDefinition {
    manager: ResourceManager,
    name: String,
    spec: GroupableSpec,
    address_spaces: Vec<String>,
    subnets: Vec<Subnet>,
}

impl GroupableDefinition for NetworkDefinition {
    fn groupable_spec(&mut self) -> &mut GroupableSpec {
        &mut self.spec
    }
}

impl NetworkDefinition {
    pub fn with_address_space(mut self, cidr: &str) -> Self {
        if !self.address_spaces.iter().any(|a| a == cidr) {
            self.address_spaces.push(cidr.to_string());
        }
        self
    }

    pub fn with_subnet(mut self, name: &str, cidr: &str) -> Self {
        upsert_subnet(&mut self.subnets, name, cidr);
        self
    }

    pub async fn begin_create(self) -> Result<Poller<Network>> {
        if self.address_spaces.is_empty() {
            return Err(SdkError::MissingField("address space"));
        }
        let (region, group) = self.spec.prepare(&self.manager).await?;

        let mut body: NetworkData = self.spec.envelope(region);
        body.properties.address_space.address_prefixes = self.address_spaces;
        body.properties.subnets = self.subnets;

        let manager = self.manager.clone();
        let poller = self
            .manager
            .client::<NetworkKind>()
            .begin_put(&group, &self.name, &body)
            .await?;
        Ok(poller.map(move |inner| Ok(Network::new(manager, inner))))
    }

    pub async fn create(self) -> Result<Network> {
        self.begin_create().await?.until_done().await
    }
}

pub struct NetworkUpdate {
    manager: ResourceManager,
    inner: NetworkData,
}

impl TaggableUpdate for NetworkUpdate {
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.inner.tags
    }
}

impl NetworkUpdate {
    pub fn with_address_space(mut self, cidr: &str) -> Self {
        let spaces = &mut self.inner.properties.address_space.address_prefixes;
        if !spaces.iter().any(|a| a == cidr) {
            spaces.push(cidr.to_string());
        }
        self
    }

    pub fn with_subnet(mut self, name: &str, cidr: &str) -> Self {
        upsert_subnet(&mut self.inner.properties.subnets, name, cidr);
        self
    }

    pub fn without_subnet(mut self, name: &str) -> Self {
        self.inner.properties.subnets.retain(|s| s.name != name);
        self
    }

    pub async fn begin_apply(mut self) -> Result<Poller<Network>> {
        let (group, name) = group_and_name(self.inner.id.as_deref().unwrap_or_default())?;
        self.inner.properties.provisioning_state = None;
        let manager = self.manager.clone();
        let poller = self
            .manager
            .client::<NetworkKind>()
            .begin_put(&group, &name, &self.inner)
            .await?;
        Ok(poller.map(move |inner| Ok(Network::new(manager, inner))))
    }

    pub async fn apply(self) -> Result<Network> {
        self.begin_apply().await?.until_done().await
    }
}
