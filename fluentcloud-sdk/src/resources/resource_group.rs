use super::{encode, TaggableUpdate};
use crate::error::{Result, SdkError};
use crate::manager::ResourceManager;
use crate::paging::PagedList;
use crate::poller::Poller;
use fluentcloud_common::{ProvisioningState, Region, Resource, ResourceGroupData};
use reqwest::Method;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub const API_VERSION: &str = "2022-09-01";

fn group_path(manager: &ResourceManager, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}",
        encode(manager.subscription_id()),
        encode(name)
    )
}

/// Entry point for resource group operations.
pub struct ResourceGroups {
    manager: ResourceManager,
}

impl ResourceGroups {
    pub(crate) fn new(manager: ResourceManager) -> Self {
        Self { manager }
    }

    pub fn define(&self, name: &str) -> ResourceGroupDefinition {
        ResourceGroupDefinition {
            manager: self.manager.clone(),
            name: name.to_string(),
            region: None,
            tags: BTreeMap::new(),
        }
    }

    pub async fn get_by_name(&self, name: &str) -> Result<ResourceGroup> {
        let inner: ResourceGroupData = self
            .manager
            .pipeline()
            .get(&group_path(&self.manager, name), API_VERSION)
            .await?;
        Ok(ResourceGroup::new(self.manager.clone(), inner))
    }

    /// True when a group with this name exists.
    pub async fn contain(&self, name: &str) -> Result<bool> {
        match self.get_by_name(name).await {
            Ok(_) => Ok(true),
            Err(SdkError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn list(&self) -> PagedList<ResourceGroupData, ResourceGroup> {
        let manager = self.manager.clone();
        let url = self.manager.pipeline().url(&format!(
            "/subscriptions/{}/resourceGroups",
            encode(self.manager.subscription_id())
        ));
        PagedList::with_map(
            self.manager.pipeline().clone(),
            API_VERSION,
            url,
            Arc::new(move |inner| Ok(ResourceGroup::new(manager.clone(), inner))),
        )
    }

    /// Deletes the group and everything inside it.
    pub async fn begin_delete_by_name(&self, name: &str) -> Result<Poller<()>> {
        info!("[resource_groups] deleting {}", name);
        let initial = self
            .manager
            .pipeline()
            .send::<()>(
                Method::DELETE,
                &group_path(&self.manager, name),
                Some(API_VERSION),
                None,
            )
            .await?;
        Poller::discarding(self.manager.pipeline().clone(), API_VERSION, initial)
    }

    pub async fn delete_by_name(&self, name: &str) -> Result<()> {
        self.begin_delete_by_name(name).await?.until_done().await
    }
}

/// A resource group read back from the service.
#[derive(Debug, Clone)]
pub struct ResourceGroup {
    manager: ResourceManager,
    inner: ResourceGroupData,
}

impl ResourceGroup {
    fn new(manager: ResourceManager, inner: ResourceGroupData) -> Self {
        Self { manager, inner }
    }

    pub fn inner(&self) -> &ResourceGroupData {
        &self.inner
    }

    pub fn id(&self) -> &str {
        self.inner.id.as_deref().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.inner.name.as_deref().unwrap_or_default()
    }

    pub fn region(&self) -> &Region {
        &self.inner.location
    }

    pub fn region_name(&self) -> &str {
        self.inner.location.name()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.inner.tags
    }

    pub fn provisioning_state(&self) -> Option<ProvisioningState> {
        self.inner.properties.provisioning_state
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let fresh = self.manager.resource_groups().get_by_name(self.name()).await?;
        self.inner = fresh.inner;
        Ok(())
    }

    pub fn update(&self) -> ResourceGroupUpdate {
        ResourceGroupUpdate {
            manager: self.manager.clone(),
            name: self.name().to_string(),
            tags: self.inner.tags.clone(),
        }
    }
}

pub struct ResourceGroupDefinition {
    manager: ResourceManager,
    name: String,
    region: Option<Region>,
    tags: BTreeMap<String, String>,
}

impl ResourceGroupDefinition {
    pub fn with_region(mut self, region: impl Into<Region>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub async fn begin_create(self) -> Result<Poller<ResourceGroup>> {
        let region = self.region.ok_or(SdkError::MissingField("region"))?;
        let mut body: ResourceGroupData = Resource::new(region);
        body.tags = self.tags;

        let path = group_path(&self.manager, &self.name);
        let pipeline = self.manager.pipeline().clone();
        let initial = pipeline
            .send(Method::PUT, &path, Some(API_VERSION), Some(&body))
            .await?;
        let manager = self.manager;
        Ok(
            Poller::<ResourceGroupData>::new(
                pipeline.clone(),
                API_VERSION,
                initial,
                Some(pipeline.url(&path)),
            )?
            .map(move |inner| Ok(ResourceGroup::new(manager, inner))),
        )
    }

    pub async fn create(self) -> Result<ResourceGroup> {
        self.begin_create().await?.until_done().await
    }
}

pub struct ResourceGroupUpdate {
    manager: ResourceManager,
    name: String,
    tags: BTreeMap<String, String>,
}

impl TaggableUpdate for ResourceGroupUpdate {
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.tags
    }
}

impl ResourceGroupUpdate {
    pub async fn apply(self) -> Result<ResourceGroup> {
        let path = group_path(&self.manager, &self.name);
        let pipeline = self.manager.pipeline().clone();
        let resp = pipeline
            .send(
                Method::PATCH,
                &path,
                Some(API_VERSION),
                Some(&json!({ "tags": self.tags })),
            )
            .await?;
        Ok(ResourceGroup::new(self.manager, resp.json()?))
    }
}
