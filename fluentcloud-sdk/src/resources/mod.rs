//! Fluent define/update builders, one module per resource type.
//!
//! Shared plumbing lives here:
//! - [`ResourceKind`] names a resource type's namespace, type segment and api-version
//! - [`ResourceClient`] performs the generic PUT/PATCH/GET/DELETE/POST calls
//! - [`GroupableDefinition`] / [`TaggableUpdate`] carry the region, group and tag setters

use crate::error::{Result, SdkError};
use crate::manager::ResourceManager;
use crate::paging::PagedList;
use crate::pipeline::HttpPipeline;
use crate::poller::Poller;
use fluentcloud_common::{ProvisioningState, Region, Resource, ResourceId};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

pub mod disk;
pub mod disk_encryption_set;
pub mod kubernetes_cluster;
pub mod network;
pub mod redis_cache;
pub mod resource_group;
pub mod virtual_machine;

/// Static description of a provider resource type.
pub trait ResourceKind: Send + Sync + 'static {
    const NAMESPACE: &'static str;
    const TYPE: &'static str;
    const API_VERSION: &'static str;

    type Properties: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static;

    fn provisioning_state(properties: &Self::Properties) -> Option<ProvisioningState>;
}

pub(crate) fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Generic CRUD against `/subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}`.
pub(crate) struct ResourceClient<K> {
    pipeline: HttpPipeline,
    subscription_id: String,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> ResourceClient<K> {
    pub(crate) fn new(pipeline: HttpPipeline, subscription_id: &str) -> Self {
        ResourceClient {
            pipeline,
            subscription_id: subscription_id.to_string(),
            _kind: PhantomData,
        }
    }

    pub(crate) fn collection_path(&self, resource_group: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
            encode(&self.subscription_id),
            encode(resource_group),
            K::NAMESPACE,
            K::TYPE
        )
    }

    pub(crate) fn resource_path(&self, resource_group: &str, name: &str) -> String {
        format!("{}/{}", self.collection_path(resource_group), encode(name))
    }

    pub(crate) fn resource_id(&self, resource_group: &str, name: &str) -> String {
        ResourceId::resource(
            &self.subscription_id,
            resource_group,
            K::NAMESPACE,
            K::TYPE,
            name,
        )
        .to_string()
    }

    pub(crate) async fn get(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Resource<K::Properties>> {
        self.pipeline
            .get(&self.resource_path(resource_group, name), K::API_VERSION)
            .await
    }

    pub(crate) async fn get_by_id(&self, id: &str) -> Result<Resource<K::Properties>> {
        let rid = ResourceId::parse(id)?;
        self.check_kind(&rid)?;
        self.get(rid.resource_group_name(), rid.name()).await
    }

    pub(crate) async fn begin_put(
        &self,
        resource_group: &str,
        name: &str,
        body: &Resource<K::Properties>,
    ) -> Result<Poller<Resource<K::Properties>>> {
        let path = self.resource_path(resource_group, name);
        let initial = self
            .pipeline
            .send(Method::PUT, &path, Some(K::API_VERSION), Some(body))
            .await?;
        Poller::new(
            self.pipeline.clone(),
            K::API_VERSION,
            initial,
            Some(self.pipeline.url(&path)),
        )
    }

    pub(crate) async fn begin_patch(
        &self,
        resource_group: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<Poller<Resource<K::Properties>>> {
        let path = self.resource_path(resource_group, name);
        let initial = self
            .pipeline
            .send(Method::PATCH, &path, Some(K::API_VERSION), Some(patch))
            .await?;
        Poller::new(
            self.pipeline.clone(),
            K::API_VERSION,
            initial,
            Some(self.pipeline.url(&path)),
        )
    }

    pub(crate) async fn begin_delete(&self, resource_group: &str, name: &str) -> Result<Poller<()>> {
        let path = self.resource_path(resource_group, name);
        let initial = self
            .pipeline
            .send::<()>(Method::DELETE, &path, Some(K::API_VERSION), None)
            .await?;
        Poller::discarding(self.pipeline.clone(), K::API_VERSION, initial)
    }

    pub(crate) async fn begin_delete_by_id(&self, id: &str) -> Result<Poller<()>> {
        let rid = ResourceId::parse(id)?;
        self.check_kind(&rid)?;
        self.begin_delete(rid.resource_group_name(), rid.name()).await
    }

    /// Long-running POST action with no result body (power operations and the like).
    pub(crate) async fn begin_action(
        &self,
        resource_group: &str,
        name: &str,
        action: &str,
    ) -> Result<Poller<()>> {
        let path = format!("{}/{}", self.resource_path(resource_group, name), action);
        let initial = self
            .pipeline
            .send::<()>(Method::POST, &path, Some(K::API_VERSION), None)
            .await?;
        Poller::discarding(self.pipeline.clone(), K::API_VERSION, initial)
    }

    /// Synchronous POST action returning a body (key listing and the like).
    pub(crate) async fn action<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        resource_group: &str,
        name: &str,
        action: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let path = format!("{}/{}", self.resource_path(resource_group, name), action);
        self.pipeline
            .send(Method::POST, &path, Some(K::API_VERSION), body)
            .await?
            .json()
    }

    pub(crate) fn list<T: 'static>(
        &self,
        resource_group: &str,
        map: Arc<dyn Fn(Resource<K::Properties>) -> Result<T> + Send + Sync>,
    ) -> PagedList<Resource<K::Properties>, T> {
        PagedList::with_map(
            self.pipeline.clone(),
            K::API_VERSION,
            self.pipeline.url(&self.collection_path(resource_group)),
            map,
        )
    }

    fn check_kind(&self, rid: &ResourceId) -> Result<()> {
        let expected = format!("{}/{}", K::NAMESPACE, K::TYPE);
        match rid.resource_type() {
            Some(t) if t.eq_ignore_ascii_case(&expected) => Ok(()),
            other => Err(SdkError::InvalidArgument(format!(
                "expected a {} id, got {:?}",
                expected, other
            ))),
        }
    }
}

/// Read accessors shared by every resource handle that lives in a resource group.
pub trait GroupableResource {
    type Kind: ResourceKind;

    fn inner(&self) -> &Resource<<Self::Kind as ResourceKind>::Properties>;

    fn id(&self) -> &str {
        self.inner().id.as_deref().unwrap_or_default()
    }

    fn name(&self) -> &str {
        self.inner().name.as_deref().unwrap_or_default()
    }

    fn region(&self) -> &Region {
        &self.inner().location
    }

    fn region_name(&self) -> &str {
        self.inner().location.name()
    }

    fn tags(&self) -> &BTreeMap<String, String> {
        &self.inner().tags
    }

    fn resource_type(&self) -> &str {
        self.inner().resource_type.as_deref().unwrap_or_default()
    }

    fn resource_group_name(&self) -> String {
        ResourceId::parse(self.id())
            .map(|rid| rid.resource_group_name().to_string())
            .unwrap_or_default()
    }

    fn provisioning_state(&self) -> Option<ProvisioningState> {
        Self::Kind::provisioning_state(&self.inner().properties)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum GroupRef {
    Existing(String),
    New(String),
}

/// Region, resource group and tags collected by a definition.
#[derive(Debug, Clone, Default)]
pub struct GroupableSpec {
    pub(crate) region: Option<Region>,
    pub(crate) group: Option<GroupRef>,
    pub(crate) tags: BTreeMap<String, String>,
}

impl GroupableSpec {
    /// Validates region and group, creating the group first when it was defined as new.
    pub(crate) async fn prepare(&self, manager: &ResourceManager) -> Result<(Region, String)> {
        let region = self.region.clone().ok_or(SdkError::MissingField("region"))?;
        let group = match &self.group {
            Some(GroupRef::Existing(name)) => name.clone(),
            Some(GroupRef::New(name)) => {
                manager
                    .resource_groups()
                    .define(name)
                    .with_region(region.clone())
                    .create()
                    .await?;
                name.clone()
            }
            None => return Err(SdkError::MissingField("resource group")),
        };
        Ok((region, group))
    }

    pub(crate) fn envelope<P: Default>(&self, region: Region) -> Resource<P> {
        let mut resource = Resource::new(region);
        resource.tags = self.tags.clone();
        resource
    }
}

/// Setters every groupable definition supports.
pub trait GroupableDefinition: Sized {
    #[doc(hidden)]
    fn groupable_spec(&mut self) -> &mut GroupableSpec;

    fn with_region(mut self, region: impl Into<Region>) -> Self {
        self.groupable_spec().region = Some(region.into());
        self
    }

    fn with_existing_resource_group(mut self, name: &str) -> Self {
        self.groupable_spec().group = Some(GroupRef::Existing(name.to_string()));
        self
    }

    fn with_new_resource_group(mut self, name: &str) -> Self {
        self.groupable_spec().group = Some(GroupRef::New(name.to_string()));
        self
    }

    fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.groupable_spec()
            .tags
            .insert(key.to_string(), value.to_string());
        self
    }

    fn with_tags<K: Into<String>, V: Into<String>>(
        mut self,
        tags: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        let spec = self.groupable_spec();
        for (k, v) in tags {
            spec.tags.insert(k.into(), v.into());
        }
        self
    }
}

/// Tag setters every update builder supports.
pub trait TaggableUpdate: Sized {
    #[doc(hidden)]
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String>;

    fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags_mut().insert(key.to_string(), value.to_string());
        self
    }

    fn without_tag(mut self, key: &str) -> Self {
        self.tags_mut().remove(key);
        self
    }
}

/// Resource id parts of a handle that has been read back from the service.
pub(crate) fn group_and_name(id: &str) -> Result<(String, String)> {
    let rid = ResourceId::parse(id)?;
    Ok((rid.resource_group_name().to_string(), rid.name().to_string()))
}
