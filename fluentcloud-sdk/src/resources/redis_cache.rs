use super::{
    group_and_name, GroupableDefinition, GroupableResource, GroupableSpec, ResourceKind,
    TaggableUpdate,
};
use crate::error::{Result, SdkError};
use crate::manager::ResourceManager;
use crate::paging::PagedList;
use crate::poller::Poller;
use fluentcloud_common::cache::{
    self, RedisAccessKeys, RedisCacheData, RedisKeyType, RedisProperties, RedisSku,
    RegenerateKeyParameters, SkuName, TlsVersion,
};
use fluentcloud_common::ProvisioningState;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub const API_VERSION: &str = "2023-08-01";

pub struct RedisCacheKind;

impl ResourceKind for RedisCacheKind {
    const NAMESPACE: &'static str = cache::NAMESPACE;
    const TYPE: &'static str = cache::REDIS;
    const API_VERSION: &'static str = API_VERSION;
    type Properties = RedisProperties;

    fn provisioning_state(properties: &Self::Properties) -> Option<ProvisioningState> {
        properties.provisioning_state
    }
}

fn redis_sku(name: SkuName, capacity: i32) -> RedisSku {
    RedisSku {
        name,
        family: name.family(),
        capacity,
    }
}

pub struct RedisCaches {
    manager: ResourceManager,
}

impl RedisCaches {
    pub(crate) fn new(manager: ResourceManager) -> Self {
        Self { manager }
    }

    pub fn define(&self, name: &str) -> RedisCacheDefinition {
        RedisCacheDefinition {
            manager: self.manager.clone(),
            name: name.to_string(),
            spec: GroupableSpec::default(),
            properties: RedisProperties::default(),
        }
    }

    pub async fn get_by_resource_group(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<RedisCache> {
        let inner = self
            .manager
            .client::<RedisCacheKind>()
            .get(resource_group, name)
            .await?;
        Ok(RedisCache::new(self.manager.clone(), inner))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<RedisCache> {
        let inner = self.manager.client::<RedisCacheKind>().get_by_id(id).await?;
        Ok(RedisCache::new(self.manager.clone(), inner))
    }

    pub fn list_by_resource_group(
        &self,
        resource_group: &str,
    ) -> PagedList<RedisCacheData, RedisCache> {
        let manager = self.manager.clone();
        self.manager.client::<RedisCacheKind>().list(
            resource_group,
            Arc::new(move |inner| Ok(RedisCache::new(manager.clone(), inner))),
        )
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.manager
            .client::<RedisCacheKind>()
            .begin_delete_by_id(id)
            .await?
            .until_done()
            .await
    }
}

/// A Redis cache read back from the service.
#[derive(Debug, Clone)]
pub struct RedisCache {
    manager: ResourceManager,
    inner: RedisCacheData,
}

impl GroupableResource for RedisCache {
    type Kind = RedisCacheKind;

    fn inner(&self) -> &RedisCacheData {
        &self.inner
    }
}

impl RedisCache {
    fn new(manager: ResourceManager, inner: RedisCacheData) -> Self {
        Self { manager, inner }
    }

    pub fn host_name(&self) -> &str {
        self.inner.properties.host_name.as_deref().unwrap_or_default()
    }

    pub fn port(&self) -> i32 {
        self.inner.properties.port.unwrap_or(0)
    }

    pub fn ssl_port(&self) -> i32 {
        self.inner.properties.ssl_port.unwrap_or(0)
    }

    pub fn sku(&self) -> Option<RedisSku> {
        self.inner.properties.sku
    }

    pub fn non_ssl_port(&self) -> bool {
        self.inner.properties.enable_non_ssl_port.unwrap_or(false)
    }

    pub fn minimum_tls_version(&self) -> Option<TlsVersion> {
        self.inner.properties.minimum_tls_version
    }

    pub fn shard_count(&self) -> i32 {
        self.inner.properties.shard_count.unwrap_or(0)
    }

    pub fn redis_configuration(&self) -> &BTreeMap<String, String> {
        &self.inner.properties.redis_configuration
    }

    pub async fn keys(&self) -> Result<RedisAccessKeys> {
        let (group, name) = group_and_name(self.id())?;
        self.manager
            .client::<RedisCacheKind>()
            .action::<(), _>(&group, &name, "listKeys", None)
            .await
    }

    pub async fn regenerate_key(&self, key_type: RedisKeyType) -> Result<RedisAccessKeys> {
        let (group, name) = group_and_name(self.id())?;
        info!("[redis] regenerating {:?} key of {}", key_type, name);
        self.manager
            .client::<RedisCacheKind>()
            .action(
                &group,
                &name,
                "regenerateKey",
                Some(&RegenerateKeyParameters { key_type }),
            )
            .await
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let (group, name) = group_and_name(self.id())?;
        self.inner = self
            .manager
            .client::<RedisCacheKind>()
            .get(&group, &name)
            .await?;
        Ok(())
    }

    pub fn update(&self) -> RedisCacheUpdate {
        RedisCacheUpdate {
            manager: self.manager.clone(),
            id: self.id().to_string(),
            current_sku: self.inner.properties.sku,
            tags: self.inner.tags.clone(),
            properties: Map::new(),
            redis_configuration: BTreeMap::new(),
        }
    }
}

pub struct RedisCacheDefinition {
    manager: ResourceManager,
    name: String,
    spec: GroupableSpec,
    properties: RedisProperties,
}

impl GroupableDefinition for RedisCacheDefinition {
    fn groupable_spec(&mut self) -> &mut GroupableSpec {
        &mut self.spec
    }
}

impl RedisCacheDefinition {
    pub fn with_basic_sku(mut self, capacity: i32) -> Self {
        self.properties.sku = Some(redis_sku(SkuName::Basic, capacity));
        self
    }

    pub fn with_standard_sku(mut self, capacity: i32) -> Self {
        self.properties.sku = Some(redis_sku(SkuName::Standard, capacity));
        self
    }

    pub fn with_premium_sku(mut self, capacity: i32) -> Self {
        self.properties.sku = Some(redis_sku(SkuName::Premium, capacity));
        self
    }

    pub fn with_non_ssl_port(mut self) -> Self {
        self.properties.enable_non_ssl_port = Some(true);
        self
    }

    pub fn with_minimum_tls_version(mut self, version: TlsVersion) -> Self {
        self.properties.minimum_tls_version = Some(version);
        self
    }

    /// Only Premium caches can be clustered; the service rejects shards on other tiers.
    pub fn with_shard_count(mut self, count: i32) -> Self {
        self.properties.shard_count = Some(count);
        self
    }

    pub fn with_redis_configuration(mut self, key: &str, value: &str) -> Self {
        self.properties
            .redis_configuration
            .insert(key.to_string(), value.to_string());
        self
    }

    pub async fn begin_create(self) -> Result<Poller<RedisCache>> {
        if self.properties.sku.is_none() {
            return Err(SdkError::MissingField("sku"));
        }
        let (region, group) = self.spec.prepare(&self.manager).await?;

        let mut body: RedisCacheData = self.spec.envelope(region);
        body.properties = self.properties;

        let manager = self.manager.clone();
        let poller = self
            .manager
            .client::<RedisCacheKind>()
            .begin_put(&group, &self.name, &body)
            .await?;
        Ok(poller.map(move |inner| Ok(RedisCache::new(manager, inner))))
    }

    pub async fn create(self) -> Result<RedisCache> {
        self.begin_create().await?.until_done().await
    }
}

/// Collects only the changed properties and sends them as a PATCH.
pub struct RedisCacheUpdate {
    manager: ResourceManager,
    id: String,
    current_sku: Option<RedisSku>,
    tags: BTreeMap<String, String>,
    properties: Map<String, Value>,
    redis_configuration: BTreeMap<String, String>,
}

impl TaggableUpdate for RedisCacheUpdate {
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.tags
    }
}

impl RedisCacheUpdate {
    fn with_sku_name(mut self, name: SkuName) -> Self {
        let capacity = self.current_sku.map(|s| s.capacity).unwrap_or(1);
        let sku = redis_sku(name, capacity);
        self.current_sku = Some(sku);
        self.properties.insert("sku".to_string(), json!(sku));
        self
    }

    pub fn with_standard_sku(self) -> Self {
        self.with_sku_name(SkuName::Standard)
    }

    pub fn with_premium_sku(self) -> Self {
        self.with_sku_name(SkuName::Premium)
    }

    pub fn with_sku_capacity(mut self, capacity: i32) -> Self {
        if let Some(sku) = self.current_sku.as_mut() {
            sku.capacity = capacity;
            let sku = *sku;
            self.properties.insert("sku".to_string(), json!(sku));
        }
        self
    }

    pub fn with_non_ssl_port(mut self) -> Self {
        self.properties
            .insert("enableNonSslPort".to_string(), Value::Bool(true));
        self
    }

    pub fn without_non_ssl_port(mut self) -> Self {
        self.properties
            .insert("enableNonSslPort".to_string(), Value::Bool(false));
        self
    }

    pub fn with_minimum_tls_version(mut self, version: TlsVersion) -> Self {
        self.properties
            .insert("minimumTlsVersion".to_string(), json!(version));
        self
    }

    pub fn with_shard_count(mut self, count: i32) -> Self {
        self.properties.insert("shardCount".to_string(), json!(count));
        self
    }

    pub fn with_redis_configuration(mut self, key: &str, value: &str) -> Self {
        self.redis_configuration
            .insert(key.to_string(), value.to_string());
        self
    }

    fn patch_body(&self) -> Value {
        let mut properties = self.properties.clone();
        if !self.redis_configuration.is_empty() {
            properties.insert(
                "redisConfiguration".to_string(),
                json!(self.redis_configuration),
            );
        }
        json!({ "tags": self.tags, "properties": properties })
    }

    pub async fn begin_apply(self) -> Result<Poller<RedisCache>> {
        let (group, name) = group_and_name(&self.id)?;
        let patch = self.patch_body();
        let manager = self.manager.clone();
        let poller = self
            .manager
            .client::<RedisCacheKind>()
            .begin_patch(&group, &name, &patch)
            .await?;
        Ok(poller.map(move |inner| Ok(RedisCache::new(manager, inner))))
    }

    pub async fn apply(self) -> Result<RedisCache> {
        self.begin_apply().await?.until_done().await
    }
}
