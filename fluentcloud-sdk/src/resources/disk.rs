use super::{
    group_and_name, GroupableDefinition, GroupableResource, GroupableSpec, ResourceKind,
    TaggableUpdate,
};
use crate::error::{Result, SdkError};
use crate::manager::ResourceManager;
use crate::paging::PagedList;
use crate::poller::Poller;
use fluentcloud_common::compute::{
    self, CreationData, DiskCreateOption, DiskData, DiskProperties, DiskState, Encryption,
    EncryptionType, StorageAccountTypes,
};
use fluentcloud_common::{ProvisioningState, Sku};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const API_VERSION: &str = "2023-10-02";

/// Managed disks are billed by storage account type.
pub type DiskSkuTypes = StorageAccountTypes;

pub struct DiskKind;

impl ResourceKind for DiskKind {
    const NAMESPACE: &'static str = compute::NAMESPACE;
    const TYPE: &'static str = compute::DISKS;
    const API_VERSION: &'static str = API_VERSION;
    type Properties = DiskProperties;

    fn provisioning_state(properties: &Self::Properties) -> Option<ProvisioningState> {
        properties.provisioning_state
    }
}

fn sku_of(sku: DiskSkuTypes) -> Sku {
    Sku {
        name: sku.as_str().to_string(),
        ..Sku::default()
    }
}

fn encryption_of(set_id: &str, encryption_type: EncryptionType) -> Encryption {
    Encryption {
        encryption_type,
        disk_encryption_set_id: Some(set_id.to_string()),
    }
}

pub struct Disks {
    manager: ResourceManager,
}

impl Disks {
    pub(crate) fn new(manager: ResourceManager) -> Self {
        Self { manager }
    }

    pub fn define(&self, name: &str) -> DiskDefinition {
        DiskDefinition {
            manager: self.manager.clone(),
            name: name.to_string(),
            spec: GroupableSpec::default(),
            properties: DiskProperties::default(),
            sku: None,
        }
    }

    pub async fn get_by_resource_group(&self, resource_group: &str, name: &str) -> Result<Disk> {
        let inner = self
            .manager
            .client::<DiskKind>()
            .get(resource_group, name)
            .await?;
        Ok(Disk::new(self.manager.clone(), inner))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Disk> {
        let inner = self.manager.client::<DiskKind>().get_by_id(id).await?;
        Ok(Disk::new(self.manager.clone(), inner))
    }

    pub fn list_by_resource_group(&self, resource_group: &str) -> PagedList<DiskData, Disk> {
        let manager = self.manager.clone();
        self.manager.client::<DiskKind>().list(
            resource_group,
            Arc::new(move |inner| Ok(Disk::new(manager.clone(), inner))),
        )
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.manager
            .client::<DiskKind>()
            .begin_delete_by_id(id)
            .await?
            .until_done()
            .await
    }
}

/// A managed disk read back from the service.
#[derive(Debug, Clone)]
pub struct Disk {
    manager: ResourceManager,
    inner: DiskData,
}

impl GroupableResource for Disk {
    type Kind = DiskKind;

    fn inner(&self) -> &DiskData {
        &self.inner
    }
}

impl Disk {
    fn new(manager: ResourceManager, inner: DiskData) -> Self {
        Self { manager, inner }
    }

    pub fn size_in_gb(&self) -> i32 {
        self.inner.properties.disk_size_gb.unwrap_or(0)
    }

    pub fn sku(&self) -> Option<DiskSkuTypes> {
        self.inner
            .sku
            .as_ref()
            .and_then(|s| StorageAccountTypes::from_name(&s.name))
    }

    pub fn creation_method(&self) -> DiskCreateOption {
        self.inner.properties.creation_data.create_option
    }

    pub fn source_resource_id(&self) -> Option<&str> {
        self.inner.properties.creation_data.source_resource_id.as_deref()
    }

    pub fn is_attached_to_virtual_machine(&self) -> bool {
        self.inner.properties.disk_state == Some(DiskState::Attached)
    }

    pub fn virtual_machine_id(&self) -> Option<&str> {
        self.inner.properties.managed_by.as_deref()
    }

    pub fn encryption(&self) -> Option<&Encryption> {
        self.inner.properties.encryption.as_ref()
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let (group, name) = group_and_name(self.id())?;
        self.inner = self.manager.client::<DiskKind>().get(&group, &name).await?;
        Ok(())
    }

    pub fn update(&self) -> DiskUpdate {
        DiskUpdate {
            manager: self.manager.clone(),
            inner: self.inner.clone(),
        }
    }
}

pub struct DiskDefinition {
    manager: ResourceManager,
    name: String,
    spec: GroupableSpec,
    properties: DiskProperties,
    sku: Option<DiskSkuTypes>,
}

impl GroupableDefinition for DiskDefinition {
    fn groupable_spec(&mut self) -> &mut GroupableSpec {
        &mut self.spec
    }
}

impl DiskDefinition {
    /// Empty data disk; pair with [`DiskDefinition::with_size_in_gb`].
    pub fn with_data(mut self) -> Self {
        self.properties.creation_data = CreationData::default();
        self
    }

    pub fn with_size_in_gb(mut self, size: i32) -> Self {
        self.properties.disk_size_gb = Some(size);
        self
    }

    /// Copy of an existing disk. The size is taken from the source unless set explicitly.
    pub fn from_disk(mut self, source: &Disk) -> Self {
        self.properties.creation_data = CreationData {
            create_option: DiskCreateOption::Copy,
            source_resource_id: Some(source.id().to_string()),
        };
        self
    }

    pub fn with_sku(mut self, sku: DiskSkuTypes) -> Self {
        self.sku = Some(sku);
        self
    }

    pub fn with_disk_encryption_set(mut self, set_id: &str, encryption_type: EncryptionType) -> Self {
        self.properties.encryption = Some(encryption_of(set_id, encryption_type));
        self
    }

    pub async fn begin_create(self) -> Result<Poller<Disk>> {
        if self.properties.creation_data.create_option == DiskCreateOption::Empty
            && self.properties.disk_size_gb.is_none()
        {
            return Err(SdkError::MissingField("disk size"));
        }
        let (region, group) = self.spec.prepare(&self.manager).await?;

        let mut body: DiskData = self.spec.envelope(region);
        body.properties = self.properties;
        body.sku = self.sku.map(sku_of);

        let manager = self.manager.clone();
        let poller = self
            .manager
            .client::<DiskKind>()
            .begin_put(&group, &self.name, &body)
            .await?;
        Ok(poller.map(move |inner| Ok(Disk::new(manager, inner))))
    }

    pub async fn create(self) -> Result<Disk> {
        self.begin_create().await?.until_done().await
    }
}

pub struct DiskUpdate {
    manager: ResourceManager,
    inner: DiskData,
}

impl TaggableUpdate for DiskUpdate {
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.inner.tags
    }
}

impl DiskUpdate {
    pub fn with_size_in_gb(mut self, size: i32) -> Self {
        self.inner.properties.disk_size_gb = Some(size);
        self
    }

    pub fn with_sku(mut self, sku: DiskSkuTypes) -> Self {
        self.inner.sku = Some(sku_of(sku));
        self
    }

    pub fn with_disk_encryption_set(mut self, set_id: &str, encryption_type: EncryptionType) -> Self {
        self.inner.properties.encryption = Some(encryption_of(set_id, encryption_type));
        self
    }

    pub async fn begin_apply(mut self) -> Result<Poller<Disk>> {
        let (group, name) = group_and_name(self.inner.id.as_deref().unwrap_or_default())?;
        self.inner.properties.provisioning_state = None;
        let manager = self.manager.clone();
        let poller = self
            .manager
            .client::<DiskKind>()
            .begin_put(&group, &name, &self.inner)
            .await?;
        Ok(poller.map(move |inner| Ok(Disk::new(manager, inner))))
    }

    pub async fn apply(self) -> Result<Disk> {
        self.begin_apply().await?.until_done().await
    }
}
