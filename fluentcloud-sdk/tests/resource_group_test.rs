mod common;

use common::{create_network, setup};
use fluentcloud_sdk::models::{ProvisioningState, Region};
use fluentcloud_sdk::prelude::*;
use fluentcloud_sdk::SdkError;

#[tokio::test]
async fn test_create_read_and_tag_group() {
    let env = setup().await;
    let groups = env.manager.resource_groups();

    let group = groups
        .define("rg-sdk")
        .with_region("West US 2")
        .with_tag("env", "test")
        .create()
        .await
        .unwrap();
    assert_eq!(group.name(), "rg-sdk");
    assert_eq!(group.region_name(), "westus2");
    assert_eq!(group.provisioning_state(), Some(ProvisioningState::Succeeded));
    assert_eq!(group.tags().get("env").map(String::as_str), Some("test"));

    let updated = group
        .update()
        .with_tag("owner", "platform")
        .without_tag("env")
        .apply()
        .await
        .unwrap();
    assert_eq!(updated.tags().len(), 1);
    assert_eq!(updated.tags()["owner"], "platform");

    let fetched = groups.get_by_name("RG-SDK").await.unwrap();
    assert_eq!(fetched.tags()["owner"], "platform");
    assert!(groups.contain("rg-sdk").await.unwrap());
    assert!(!groups.contain("rg-missing").await.unwrap());
}

#[tokio::test]
async fn test_missing_group_is_not_found() {
    let env = setup().await;
    let err = env
        .manager
        .resource_groups()
        .get_by_name("nope")
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{:?}", err);
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_group_without_region_is_rejected_locally() {
    let env = setup().await;
    let err = env
        .manager
        .resource_groups()
        .define("rg-no-region")
        .create()
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::MissingField("region")));
}

#[tokio::test]
async fn test_list_groups_across_pages() {
    let env = setup().await;
    for i in 0..7 {
        common::create_group(&env.manager, &format!("rg-list-{}", i)).await;
    }

    let mut pages = env.manager.resource_groups().list();
    let first = pages.next_page().await.unwrap().unwrap();
    assert_eq!(first.len(), 3);
    assert!(pages.has_more());

    let all = env.manager.resource_groups().list().collect_all().await.unwrap();
    assert_eq!(all.len(), 7);
    assert!(all.iter().any(|g| g.name() == "rg-list-6"));
}

#[tokio::test]
async fn test_delete_group_removes_its_resources() {
    let env = setup().await;
    let network = env
        .manager
        .networks()
        .define("vnet-doomed")
        .with_region(Region::US_EAST)
        .with_new_resource_group("rg-doomed")
        .with_address_space("10.1.0.0/16")
        .create()
        .await
        .unwrap();

    let mut poller = env
        .manager
        .resource_groups()
        .begin_delete_by_name("rg-doomed")
        .await
        .unwrap();
    while !poller.status().is_done() {
        poller.poll().await.unwrap();
    }

    assert!(!env.manager.resource_groups().contain("rg-doomed").await.unwrap());
    let err = env.manager.networks().get_by_id(network.id()).await.unwrap_err();
    assert!(err.is_not_found());

    // Deleting again is a no-op.
    env.manager
        .resource_groups()
        .delete_by_name("rg-doomed")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_resource_in_missing_group_fails() {
    let env = setup().await;
    let err = env
        .manager
        .networks()
        .define("vnet-orphan")
        .with_region(Region::US_EAST)
        .with_existing_resource_group("rg-ghost")
        .with_address_space("10.2.0.0/16")
        .create()
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{:?}", err);

    // The same definition works once the group exists.
    common::create_group(&env.manager, "rg-ghost").await;
    let network = create_network(&env.manager, "rg-ghost", "vnet-found").await;
    assert_eq!(network.resource_group_name(), "rg-ghost");
}
