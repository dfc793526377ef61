mod common;

use common::{create_group, setup};
use fluentcloud_sdk::models::compute::{
    DiskCreateOption, DiskEncryptionSetType, EncryptionType, StorageAccountTypes,
};
use fluentcloud_sdk::models::Region;
use fluentcloud_sdk::prelude::*;

const VAULT_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg-keys/providers/Fluent.KeyVault/vaults/kv-disks";
const KEY_V1: &str = "https://kv-disks.vault.fluentcloud.io/keys/disk-key/1";
const KEY_V2: &str = "https://kv-disks.vault.fluentcloud.io/keys/disk-key/2";

async fn create_encryption_set(manager: &ResourceManager, group: &str, name: &str) -> String {
    manager
        .disk_encryption_sets()
        .define(name)
        .with_region(Region::US_EAST)
        .with_existing_resource_group(group)
        .with_encryption_type(DiskEncryptionSetType::EncryptionAtRestWithCustomerKey)
        .with_existing_key_vault(VAULT_ID)
        .with_existing_key(KEY_V1)
        .with_system_assigned_managed_service_identity()
        .create()
        .await
        .unwrap()
        .id()
        .to_string()
}

#[tokio::test]
async fn test_empty_disk_copy_and_resize() {
    let env = setup().await;
    create_group(&env.manager, "rg-disk").await;
    let disks = env.manager.disks();

    let source = disks
        .define("disk-src")
        .with_region(Region::US_EAST)
        .with_existing_resource_group("rg-disk")
        .with_data()
        .with_size_in_gb(100)
        .with_sku(StorageAccountTypes::PremiumLrs)
        .create()
        .await
        .unwrap();
    assert_eq!(source.size_in_gb(), 100);
    assert_eq!(source.sku(), Some(StorageAccountTypes::PremiumLrs));
    assert_eq!(source.creation_method(), DiskCreateOption::Empty);
    assert_eq!(
        source.encryption().map(|e| e.encryption_type),
        Some(EncryptionType::EncryptionAtRestWithPlatformKey)
    );

    let copy = disks
        .define("disk-copy")
        .with_region(Region::US_EAST)
        .with_existing_resource_group("rg-disk")
        .from_disk(&source)
        .create()
        .await
        .unwrap();
    assert_eq!(copy.size_in_gb(), 100);
    assert_eq!(copy.creation_method(), DiskCreateOption::Copy);
    assert!(copy
        .source_resource_id()
        .unwrap()
        .eq_ignore_ascii_case(source.id()));
    // Unset sku defaults to Standard_LRS.
    assert_eq!(copy.sku(), Some(StorageAccountTypes::StandardLrs));

    let grown = copy.update().with_size_in_gb(200).apply().await.unwrap();
    assert_eq!(grown.size_in_gb(), 200);

    let err = grown.update().with_size_in_gb(50).apply().await.unwrap_err();
    assert_eq!(err.service_code(), Some("OperationNotAllowed"));
    assert_eq!(err.status(), Some(409));

    let listed = disks.list_by_resource_group("rg-disk").collect_all().await.unwrap();
    assert_eq!(listed.len(), 2);

    disks.delete_by_id(source.id()).await.unwrap();
    assert!(disks
        .get_by_resource_group("rg-disk", "disk-src")
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_empty_disk_needs_a_size() {
    let env = setup().await;
    let err = env
        .manager
        .disks()
        .define("disk-unsized")
        .with_region(Region::US_EAST)
        .with_new_resource_group("rg-unsized")
        .with_data()
        .create()
        .await
        .unwrap_err();
    assert!(matches!(err, fluentcloud_sdk::SdkError::MissingField("disk size")));
}

#[tokio::test]
async fn test_encryption_set_lifecycle() {
    let env = setup().await;
    create_group(&env.manager, "rg-des").await;
    let sets = env.manager.disk_encryption_sets();

    let id = create_encryption_set(&env.manager, "rg-des", "des-main").await;
    let set = sets.get_by_id(&id).await.unwrap();
    assert_eq!(
        set.encryption_type(),
        Some(DiskEncryptionSetType::EncryptionAtRestWithCustomerKey)
    );
    assert_eq!(set.key_vault_id(), Some(VAULT_ID));
    assert_eq!(set.encryption_key_url(), Some(KEY_V1));
    assert!(!set.is_automatic_key_rotation_enabled());
    let principal = set
        .system_assigned_managed_service_identity_principal_id()
        .unwrap()
        .to_string();
    assert!(set
        .system_assigned_managed_service_identity_tenant_id()
        .is_some());

    let rotated = set
        .update()
        .with_existing_key(KEY_V2)
        .with_automatic_key_rotation()
        .apply()
        .await
        .unwrap();
    assert_eq!(rotated.encryption_key_url(), Some(KEY_V2));
    assert_eq!(rotated.key_vault_id(), Some(VAULT_ID));
    assert!(rotated.is_automatic_key_rotation_enabled());
    // The identity survives updates.
    assert_eq!(
        rotated.system_assigned_managed_service_identity_principal_id(),
        Some(principal.as_str())
    );

    let manual = rotated
        .update()
        .without_automatic_key_rotation()
        .apply()
        .await
        .unwrap();
    assert!(!manual.is_automatic_key_rotation_enabled());
}

#[tokio::test]
async fn test_encryption_set_needs_identity() {
    let env = setup().await;
    let err = env
        .manager
        .disk_encryption_sets()
        .define("des-anonymous")
        .with_region(Region::US_EAST)
        .with_new_resource_group("rg-des-anon")
        .with_existing_key_vault(VAULT_ID)
        .with_existing_key(KEY_V1)
        .create()
        .await
        .unwrap_err();
    assert_eq!(err.service_code(), Some("InvalidParameter"));
}

#[tokio::test]
async fn test_customer_key_disk_pins_its_encryption_set() {
    let env = setup().await;
    create_group(&env.manager, "rg-cmk").await;
    let set_id = create_encryption_set(&env.manager, "rg-cmk", "des-cmk").await;

    let disk = env
        .manager
        .disks()
        .define("disk-cmk")
        .with_region(Region::US_EAST)
        .with_existing_resource_group("rg-cmk")
        .with_data()
        .with_size_in_gb(32)
        .with_disk_encryption_set(&set_id, EncryptionType::EncryptionAtRestWithCustomerKey)
        .create()
        .await
        .unwrap();
    let encryption = disk.encryption().unwrap();
    assert_eq!(
        encryption.encryption_type,
        EncryptionType::EncryptionAtRestWithCustomerKey
    );
    assert!(encryption
        .disk_encryption_set_id
        .as_deref()
        .unwrap()
        .eq_ignore_ascii_case(&set_id));

    let err = env
        .manager
        .disk_encryption_sets()
        .delete_by_id(&set_id)
        .await
        .unwrap_err();
    assert_eq!(err.service_code(), Some("InUseDiskEncryptionSetCannotBeDeleted"));

    env.manager.disks().delete_by_id(disk.id()).await.unwrap();
    env.manager
        .disk_encryption_sets()
        .delete_by_id(&set_id)
        .await
        .unwrap();

    let missing_set = format!("{}-gone", set_id);
    let err = env
        .manager
        .disks()
        .define("disk-dangling")
        .with_region(Region::US_EAST)
        .with_existing_resource_group("rg-cmk")
        .with_data()
        .with_size_in_gb(32)
        .with_disk_encryption_set(&missing_set, EncryptionType::EncryptionAtRestWithCustomerKey)
        .create()
        .await
        .unwrap_err();
    assert_eq!(err.service_code(), Some("InvalidResourceReference"));
}
