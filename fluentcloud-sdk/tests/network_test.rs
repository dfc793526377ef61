mod common;

use common::{create_group, create_network, setup, SSH_KEY};
use fluentcloud_sdk::models::Region;
use fluentcloud_sdk::prelude::*;
use fluentcloud_sdk::resources::virtual_machine::KnownLinuxImage;

#[tokio::test]
async fn test_subnets_added_and_removed() {
    let env = setup().await;
    create_group(&env.manager, "rg-net").await;
    let network = create_network(&env.manager, "rg-net", "vnet-main").await;
    assert_eq!(network.address_spaces(), ["10.0.0.0/16".to_string()]);
    assert_eq!(network.subnets().len(), 2);

    let network = network
        .update()
        .with_subnet("frontend", "10.0.2.0/24")
        .without_subnet("backend")
        .with_tag("tier", "web")
        .apply()
        .await
        .unwrap();
    let subnets = network.subnets();
    assert_eq!(subnets.len(), 2);
    assert_eq!(subnets["frontend"], "10.0.2.0/24");
    assert!(!subnets.contains_key("backend"));
    assert_eq!(network.tags()["tier"], "web");

    let network = network
        .update()
        .with_address_space("192.168.0.0/24")
        .with_subnet("mgmt", "192.168.0.0/26")
        .apply()
        .await
        .unwrap();
    assert_eq!(network.address_spaces().len(), 2);

    let listed = env
        .manager
        .networks()
        .list_by_resource_group("rg-net")
        .collect_all()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].subnets().len(), 3);
}

#[tokio::test]
async fn test_invalid_prefixes_are_rejected() {
    let env = setup().await;
    create_group(&env.manager, "rg-bad").await;
    let define = |name: &str| {
        env.manager
            .networks()
            .define(name)
            .with_region(Region::US_EAST)
            .with_existing_resource_group("rg-bad")
    };

    let err = define("vnet-garbled")
        .with_address_space("10.0.0.0/33")
        .create()
        .await
        .unwrap_err();
    assert_eq!(err.service_code(), Some("InvalidAddressPrefixFormat"));

    let err = define("vnet-outside")
        .with_address_space("10.0.0.0/16")
        .with_subnet("stray", "10.1.0.0/24")
        .create()
        .await
        .unwrap_err();
    assert_eq!(err.service_code(), Some("NetcfgInvalidSubnet"));

    let err = define("vnet-overlap")
        .with_address_space("10.0.0.0/16")
        .with_subnet("a", "10.0.0.0/24")
        .with_subnet("b", "10.0.0.128/25")
        .create()
        .await
        .unwrap_err();
    assert_eq!(err.service_code(), Some("NetcfgSubnetRangesOverlap"));

    let err = define("vnet-empty").create().await.unwrap_err();
    assert!(matches!(err, fluentcloud_sdk::SdkError::MissingField(_)));
}

#[tokio::test]
async fn test_subnet_in_use_is_kept() {
    let env = setup().await;
    create_group(&env.manager, "rg-used").await;
    let network = create_network(&env.manager, "rg-used", "vnet-used").await;
    env.manager
        .virtual_machines()
        .define("vm-tenant")
        .with_region(Region::US_EAST)
        .with_existing_resource_group("rg-used")
        .with_existing_primary_network(&network, "backend")
        .with_popular_linux_image(KnownLinuxImage::UbuntuServer22_04Lts)
        .with_root_username("ops")
        .with_ssh_public_key(SSH_KEY)
        .create()
        .await
        .unwrap();

    let err = network
        .update()
        .without_subnet("backend")
        .apply()
        .await
        .unwrap_err();
    assert_eq!(err.service_code(), Some("InUseSubnetCannotBeDeleted"));

    let err = env
        .manager
        .networks()
        .delete_by_id(network.id())
        .await
        .unwrap_err();
    assert_eq!(err.service_code(), Some("InUseNetworkCannotBeDeleted"));
    assert_eq!(err.status(), Some(409));
}
