use super::{ActionOutcome, ServiceKind};
use crate::error::{ApiResult, CloudApiError};
use crate::store::{key, StoreData};
use fluentcloud_common::cache::{
    RedisAccessKeys, RedisCacheData, RedisKeyType, RegenerateKeyParameters, SkuFamily, SkuName,
    TlsVersion,
};
use fluentcloud_common::ResourceId;
use serde_json::Value;

pub const HOST_SUFFIX: &str = "redis.cache.windows.net";
pub const PORT: i32 = 6379;
pub const SSL_PORT: i32 = 6380;
const MAX_SHARDS: i32 = 10;

const MAXMEMORY_POLICIES: [&str; 8] = [
    "volatile-lru",
    "allkeys-lru",
    "volatile-lfu",
    "allkeys-lfu",
    "volatile-random",
    "allkeys-random",
    "volatile-ttl",
    "noeviction",
];
const PREMIUM_ONLY_SETTINGS: [&str; 2] = ["rdb-backup-enabled", "aof-backup-enabled"];

/// Random access key.
fn generate_key() -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    STANDARD.encode(bytes)
}

fn capacity_range(family: SkuFamily) -> std::ops::RangeInclusive<i32> {
    match family {
        SkuFamily::C => 0..=6,
        SkuFamily::P => 1..=5,
    }
}

pub fn provision(
    _data: &mut StoreData,
    id: &ResourceId,
    existing: Option<RedisCacheData>,
    mut cache: RedisCacheData,
) -> ApiResult<RedisCacheData> {
    let props = &mut cache.properties;
    let sku = props
        .sku
        .as_mut()
        .ok_or_else(|| CloudApiError::invalid_parameter("properties.sku is required"))?;
    sku.family = sku.name.family();
    if !capacity_range(sku.family).contains(&sku.capacity) {
        return Err(CloudApiError::invalid_parameter(format!(
            "Capacity {} is not valid for the {:?} tier",
            sku.capacity, sku.name
        )));
    }
    let tier = sku.name;

    if let Some(current) = existing.as_ref().and_then(|e| e.properties.sku) {
        if tier < current.name {
            return Err(CloudApiError::bad_request(
                "SkuDowngradeNotAllowed",
                format!("Cannot scale from {:?} down to {:?}", current.name, tier),
            ));
        }
    }

    match props.shard_count {
        Some(n) if n > 0 && tier != SkuName::Premium => {
            return Err(CloudApiError::invalid_parameter(
                "Clustering (shardCount) is only available on the Premium tier",
            ));
        }
        Some(n) if n > MAX_SHARDS || n < 0 => {
            return Err(CloudApiError::invalid_parameter(format!(
                "shardCount must be between 1 and {}",
                MAX_SHARDS
            )));
        }
        Some(0) => props.shard_count = None,
        _ => {}
    }

    for (setting, value) in &props.redis_configuration {
        if setting == "maxmemory-policy" && !MAXMEMORY_POLICIES.contains(&value.as_str()) {
            return Err(CloudApiError::invalid_parameter(format!(
                "'{}' is not a valid maxmemory-policy",
                value
            )));
        }
        if PREMIUM_ONLY_SETTINGS.contains(&setting.as_str()) && tier != SkuName::Premium {
            return Err(CloudApiError::invalid_parameter(format!(
                "{} is only available on the Premium tier",
                setting
            )));
        }
    }

    props
        .minimum_tls_version
        .get_or_insert(TlsVersion::Tls1_2);
    props.enable_non_ssl_port.get_or_insert(false);
    props.host_name = Some(format!("{}.{}", id.name().to_ascii_lowercase(), HOST_SUFFIX));
    props.port = Some(PORT);
    props.ssl_port = Some(SSL_PORT);
    Ok(cache)
}

fn keys_for<'a>(data: &'a mut StoreData, id: &str) -> &'a mut RedisAccessKeys {
    data.redis_keys
        .entry(key(id))
        .or_insert_with(|| RedisAccessKeys {
            primary_key: generate_key(),
            secondary_key: generate_key(),
        })
}

fn keys_body(keys: &RedisAccessKeys) -> ApiResult<ActionOutcome> {
    serde_json::to_value(keys)
        .map(ActionOutcome::Body)
        .map_err(|e| CloudApiError::internal(e.to_string()))
}

pub fn action(
    data: &mut StoreData,
    id: &str,
    action: &str,
    body: Option<Value>,
) -> ApiResult<ActionOutcome> {
    match action.to_ascii_lowercase().as_str() {
        "listkeys" => keys_body(keys_for(data, id)),
        "regeneratekey" => {
            let params: RegenerateKeyParameters = body
                .ok_or_else(|| CloudApiError::invalid_parameter("keyType is required"))
                .and_then(|b| {
                    serde_json::from_value(b)
                        .map_err(|e| CloudApiError::invalid_parameter(e.to_string()))
                })?;
            let keys = keys_for(data, id);
            match params.key_type {
                RedisKeyType::Primary => keys.primary_key = generate_key(),
                RedisKeyType::Secondary => keys.secondary_key = generate_key(),
            }
            keys_body(keys)
        }
        _ => Err(super::unsupported_action(ServiceKind::RedisCache, action)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluentcloud_common::cache::RedisSku;
    use fluentcloud_common::{Region, Resource};
    use serde_json::json;

    const ID: &str = "/subscriptions/s/resourceGroups/rg/providers/Fluent.Cache/redis/Cache1";

    fn rid() -> ResourceId {
        ResourceId::parse(ID).unwrap()
    }

    fn cache(name: SkuName, capacity: i32) -> RedisCacheData {
        let mut c: RedisCacheData = Resource::new(Region::US_EAST);
        c.properties.sku = Some(RedisSku {
            name,
            family: SkuFamily::C,
            capacity,
        });
        c
    }

    #[test]
    fn defaults_and_endpoints() {
        let mut data = StoreData::default();
        let out = provision(&mut data, &rid(), None, cache(SkuName::Premium, 1)).unwrap();
        let props = out.properties;
        assert_eq!(props.sku.unwrap().family, SkuFamily::P);
        assert_eq!(props.host_name.as_deref(), Some("cache1.redis.cache.windows.net"));
        assert_eq!(props.port, Some(6379));
        assert_eq!(props.ssl_port, Some(6380));
        assert_eq!(props.minimum_tls_version, Some(TlsVersion::Tls1_2));
    }

    #[test]
    fn shards_need_premium_and_no_downgrade() {
        let mut data = StoreData::default();
        let mut basic = cache(SkuName::Basic, 1);
        basic.properties.shard_count = Some(2);
        assert!(provision(&mut data, &rid(), None, basic).is_err());

        let standard = provision(&mut data, &rid(), None, cache(SkuName::Standard, 1)).unwrap();
        let err = provision(&mut data, &rid(), Some(standard), cache(SkuName::Basic, 1)).unwrap_err();
        assert_eq!(err.code, "SkuDowngradeNotAllowed");
    }

    #[test]
    fn regenerate_changes_only_one_key() {
        let mut data = StoreData::default();
        let before = keys_for(&mut data, ID).clone();
        let outcome = action(
            &mut data,
            ID,
            "regenerateKey",
            Some(json!({ "keyType": "Secondary" })),
        )
        .unwrap();
        let ActionOutcome::Body(body) = outcome else {
            panic!("expected a body");
        };
        let after: RedisAccessKeys = serde_json::from_value(body).unwrap();
        assert_eq!(after.primary_key, before.primary_key);
        assert_ne!(after.secondary_key, before.secondary_key);
    }
}
