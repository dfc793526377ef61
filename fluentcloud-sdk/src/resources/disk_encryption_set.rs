use super::{
    group_and_name, GroupableDefinition, GroupableResource, GroupableSpec, ResourceKind,
    TaggableUpdate,
};
use crate::error::{Result, SdkError};
use crate::manager::ResourceManager;
use crate::paging::PagedList;
use crate::poller::Poller;
use fluentcloud_common::compute::{
    self, DiskEncryptionSetData, DiskEncryptionSetProperties, DiskEncryptionSetType,
    KeyForDiskEncryptionSet, SubResource,
};
use fluentcloud_common::{ManagedIdentity, ProvisioningState};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const API_VERSION: &str = "2023-10-02";

pub struct DiskEncryptionSetKind;

impl ResourceKind for DiskEncryptionSetKind {
    const NAMESPACE: &'static str = compute::NAMESPACE;
    const TYPE: &'static str = compute::DISK_ENCRYPTION_SETS;
    const API_VERSION: &'static str = API_VERSION;
    type Properties = DiskEncryptionSetProperties;

    fn provisioning_state(properties: &Self::Properties) -> Option<ProvisioningState> {
        properties.provisioning_state
    }
}

pub struct DiskEncryptionSets {
    manager: ResourceManager,
}

impl DiskEncryptionSets {
    pub(crate) fn new(manager: ResourceManager) -> Self {
        Self { manager }
    }

    pub fn define(&self, name: &str) -> DiskEncryptionSetDefinition {
        DiskEncryptionSetDefinition {
            manager: self.manager.clone(),
            name: name.to_string(),
            spec: GroupableSpec::default(),
            encryption_type: DiskEncryptionSetType::EncryptionAtRestWithCustomerKey,
            vault_id: None,
            key_url: None,
            system_identity: false,
            auto_rotation: false,
        }
    }

    pub async fn get_by_resource_group(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<DiskEncryptionSet> {
        let inner = self
            .manager
            .client::<DiskEncryptionSetKind>()
            .get(resource_group, name)
            .await?;
        Ok(DiskEncryptionSet::new(self.manager.clone(), inner))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<DiskEncryptionSet> {
        let inner = self
            .manager
            .client::<DiskEncryptionSetKind>()
            .get_by_id(id)
            .await?;
        Ok(DiskEncryptionSet::new(self.manager.clone(), inner))
    }

    pub fn list_by_resource_group(
        &self,
        resource_group: &str,
    ) -> PagedList<DiskEncryptionSetData, DiskEncryptionSet> {
        let manager = self.manager.clone();
        self.manager.client::<DiskEncryptionSetKind>().list(
            resource_group,
            Arc::new(move |inner| Ok(DiskEncryptionSet::new(manager.clone(), inner))),
        )
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.manager
            .client::<DiskEncryptionSetKind>()
            .begin_delete_by_id(id)
            .await?
            .until_done()
            .await
    }
}

#[derive(Debug, Clone)]
pub struct DiskEncryptionSet {
    manager: ResourceManager,
    inner: DiskEncryptionSetData,
}

impl GroupableResource for DiskEncryptionSet {
    type Kind = DiskEncryptionSetKind;

    fn inner(&self) -> &DiskEncryptionSetData {
        &self.inner
    }
}

impl DiskEncryptionSet {
    fn new(manager: ResourceManager, inner: DiskEncryptionSetData) -> Self {
        Self { manager, inner }
    }

    pub fn encryption_type(&self) -> Option<DiskEncryptionSetType> {
        self.inner.properties.encryption_type
    }

    pub fn key_vault_id(&self) -> Option<&str> {
        self.inner
            .properties
            .active_key
            .as_ref()
            .and_then(|k| k.source_vault.as_ref())
            .map(|v| v.id.as_str())
    }

    pub fn encryption_key_url(&self) -> Option<&str> {
        self.inner
            .properties
            .active_key
            .as_ref()
            .map(|k| k.key_url.as_str())
    }

    pub fn system_assigned_managed_service_identity_principal_id(&self) -> Option<&str> {
        self.inner
            .identity
            .as_ref()
            .and_then(|i| i.principal_id.as_deref())
    }

    pub fn system_assigned_managed_service_identity_tenant_id(&self) -> Option<&str> {
        self.inner
            .identity
            .as_ref()
            .and_then(|i| i.tenant_id.as_deref())
    }

    pub fn is_automatic_key_rotation_enabled(&self) -> bool {
        self.inner
            .properties
            .rotation_to_latest_key_version_enabled
            .unwrap_or(false)
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let (group, name) = group_and_name(self.id())?;
        self.inner = self
            .manager
            .client::<DiskEncryptionSetKind>()
            .get(&group, &name)
            .await?;
        Ok(())
    }

    pub fn update(&self) -> DiskEncryptionSetUpdate {
        DiskEncryptionSetUpdate {
            manager: self.manager.clone(),
            inner: self.inner.clone(),
        }
    }
}

pub struct DiskEncryptionSetDefinition {
    manager: ResourceManager,
    name: String,
    spec: GroupableSpec,
    encryption_type: DiskEncryptionSetType,
    vault_id: Option<String>,
    key_url: Option<String>,
    system_identity: bool,
    auto_rotation: bool,
}

impl GroupableDefinition for DiskEncryptionSetDefinition {
    fn groupable_spec(&mut self) -> &mut GroupableSpec {
        &mut self.spec
    }
}

impl DiskEncryptionSetDefinition {
    pub fn with_encryption_type(mut self, encryption_type: DiskEncryptionSetType) -> Self {
        self.encryption_type = encryption_type;
        self
    }

    pub fn with_existing_key_vault(mut self, vault_id: &str) -> Self {
        self.vault_id = Some(vault_id.to_string());
        self
    }

    pub fn with_existing_key(mut self, key_url: &str) -> Self {
        self.key_url = Some(key_url.to_string());
        self
    }

    pub fn with_system_assigned_managed_service_identity(mut self) -> Self {
        self.system_identity = true;
        self
    }

    pub fn with_automatic_key_rotation(mut self) -> Self {
        self.auto_rotation = true;
        self
    }

    pub async fn begin_create(self) -> Result<Poller<DiskEncryptionSet>> {
        let vault_id = self.vault_id.ok_or(SdkError::MissingField("key vault"))?;
        let key_url = self.key_url.ok_or(SdkError::MissingField("key"))?;
        let (region, group) = self.spec.prepare(&self.manager).await?;

        let mut body: DiskEncryptionSetData = self.spec.envelope(region);
        body.properties = DiskEncryptionSetProperties {
            encryption_type: Some(self.encryption_type),
            active_key: Some(KeyForDiskEncryptionSet {
                key_url,
                source_vault: Some(SubResource::new(&vault_id)),
            }),
            rotation_to_latest_key_version_enabled: Some(self.auto_rotation),
            provisioning_state: None,
        };
        if self.system_identity {
            body.identity = Some(ManagedIdentity::system_assigned());
        }

        let manager = self.manager.clone();
        let poller = self
            .manager
            .client::<DiskEncryptionSetKind>()
            .begin_put(&group, &self.name, &body)
            .await?;
        Ok(poller.map(move |inner| Ok(DiskEncryptionSet::new(manager, inner))))
    }

    pub async fn create(self) -> Result<DiskEncryptionSet> {
        self.begin_create().await?.until_done().await
    }
}

pub struct DiskEncryptionSetUpdate {
    manager: ResourceManager,
    inner: DiskEncryptionSetData,
}

impl TaggableUpdate for DiskEncryptionSetUpdate {
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.inner.tags
    }
}

impl DiskEncryptionSetUpdate {
    /// Rotates to another key in the same vault.
    pub fn with_existing_key(mut self, key_url: &str) -> Self {
        let source_vault = self
            .inner
            .properties
            .active_key
            .take()
            .and_then(|k| k.source_vault);
        self.inner.properties.active_key = Some(KeyForDiskEncryptionSet {
            key_url: key_url.to_string(),
            source_vault,
        });
        self
    }

    pub fn with_automatic_key_rotation(mut self) -> Self {
        self.inner.properties.rotation_to_latest_key_version_enabled = Some(true);
        self
    }

    pub fn without_automatic_key_rotation(mut self) -> Self {
        self.inner.properties.rotation_to_latest_key_version_enabled = Some(false);
        self
    }

    pub async fn begin_apply(mut self) -> Result<Poller<DiskEncryptionSet>> {
        let (group, name) = group_and_name(self.inner.id.as_deref().unwrap_or_default())?;
        self.inner.properties.provisioning_state = None;
        let manager = self.manager.clone();
        let poller = self
            .manager
            .client::<DiskEncryptionSetKind>()
            .begin_put(&group, &name, &self.inner)
            .await?;
        Ok(poller.map(move |inner| Ok(DiskEncryptionSet::new(manager, inner))))
    }

    pub async fn apply(self) -> Result<DiskEncryptionSet> {
        self.begin_apply().await?.until_done().await
    }
}
