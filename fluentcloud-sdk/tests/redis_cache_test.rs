mod common;

use common::{create_group, setup};
use fluentcloud_sdk::models::cache::{RedisKeyType, SkuFamily, SkuName, TlsVersion};
use fluentcloud_sdk::models::Region;
use fluentcloud_sdk::prelude::*;

#[tokio::test]
async fn test_basic_cache_scaled_to_standard() {
    let env = setup().await;
    create_group(&env.manager, "rg-cache").await;

    let cache = env
        .manager
        .redis_caches()
        .define("cache-basic")
        .with_region(Region::US_EAST)
        .with_existing_resource_group("rg-cache")
        .with_basic_sku(1)
        .create()
        .await
        .unwrap();
    let sku = cache.sku().unwrap();
    assert_eq!(sku.name, SkuName::Basic);
    assert_eq!(sku.family, SkuFamily::C);
    assert_eq!(sku.capacity, 1);
    assert_eq!(cache.host_name(), "cache-basic.redis.cache.windows.net");
    assert_eq!(cache.port(), 6379);
    assert_eq!(cache.ssl_port(), 6380);
    assert!(!cache.non_ssl_port());
    assert_eq!(cache.minimum_tls_version(), Some(TlsVersion::Tls1_2));

    let cache = cache
        .update()
        .with_standard_sku()
        .with_non_ssl_port()
        .with_redis_configuration("maxmemory-policy", "allkeys-lru")
        .apply()
        .await
        .unwrap();
    let sku = cache.sku().unwrap();
    assert_eq!(sku.name, SkuName::Standard);
    assert_eq!(sku.capacity, 1);
    assert!(cache.non_ssl_port());
    assert_eq!(cache.redis_configuration()["maxmemory-policy"], "allkeys-lru");

    let err = cache
        .update()
        .with_sku_capacity(9)
        .apply()
        .await
        .unwrap_err();
    assert_eq!(err.service_code(), Some("InvalidParameter"));
}

#[tokio::test]
async fn test_premium_cache_with_shards() {
    let env = setup().await;
    let cache = env
        .manager
        .redis_caches()
        .define("cache-premium")
        .with_region(Region::US_EAST)
        .with_new_resource_group("rg-premium")
        .with_premium_sku(2)
        .with_shard_count(3)
        .with_minimum_tls_version(TlsVersion::Tls1_1)
        .create()
        .await
        .unwrap();
    let sku = cache.sku().unwrap();
    assert_eq!(sku.family, SkuFamily::P);
    assert_eq!(cache.shard_count(), 3);
    assert_eq!(cache.minimum_tls_version(), Some(TlsVersion::Tls1_1));

    let cache = cache.update().with_shard_count(5).apply().await.unwrap();
    assert_eq!(cache.shard_count(), 5);
}

#[tokio::test]
async fn test_tier_rules() {
    let env = setup().await;
    create_group(&env.manager, "rg-rules").await;
    let caches = env.manager.redis_caches();

    let err = caches
        .define("cache-sharded-basic")
        .with_region(Region::US_EAST)
        .with_existing_resource_group("rg-rules")
        .with_basic_sku(1)
        .with_shard_count(2)
        .create()
        .await
        .unwrap_err();
    assert_eq!(err.service_code(), Some("InvalidParameter"));
    assert_eq!(err.status(), Some(400));

    let standard = caches
        .define("cache-standard")
        .with_region(Region::US_EAST)
        .with_existing_resource_group("rg-rules")
        .with_standard_sku(1)
        .create()
        .await
        .unwrap();
    let premium = standard.update().with_premium_sku().apply().await.unwrap();
    assert_eq!(premium.sku().unwrap().name, SkuName::Premium);
    assert_eq!(premium.sku().unwrap().family, SkuFamily::P);

    // Re-creating with a lower tier is a downgrade.
    let downgrade = env
        .manager
        .redis_caches()
        .define("cache-standard")
        .with_region(Region::US_EAST)
        .with_existing_resource_group("rg-rules")
        .with_standard_sku(1)
        .create()
        .await
        .unwrap_err();
    assert_eq!(downgrade.service_code(), Some("SkuDowngradeNotAllowed"));
}

#[tokio::test]
async fn test_access_keys() {
    let env = setup().await;
    let cache = env
        .manager
        .redis_caches()
        .define("cache-keys")
        .with_region(Region::US_EAST)
        .with_new_resource_group("rg-keys")
        .with_standard_sku(0)
        .create()
        .await
        .unwrap();

    let keys = cache.keys().await.unwrap();
    assert!(!keys.primary_key.is_empty());
    assert_ne!(keys.primary_key, keys.secondary_key);
    assert_eq!(cache.keys().await.unwrap(), keys);

    let regenerated = cache.regenerate_key(RedisKeyType::Secondary).await.unwrap();
    assert_eq!(regenerated.primary_key, keys.primary_key);
    assert_ne!(regenerated.secondary_key, keys.secondary_key);
}
