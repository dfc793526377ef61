// Common test utilities: an in-process mock service and a manager pointed at it
#![allow(dead_code)]

use fluentcloud_mock::{MockServer, MockSettings};
use fluentcloud_sdk::models::Region;
use fluentcloud_sdk::prelude::*;
use fluentcloud_sdk::resources::network::Network;
use fluentcloud_sdk::ClientSettings;
use std::time::Duration;

pub const TOKEN: &str = "sdk-test-token";
pub const SSH_KEY: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQC7 test@fluentcloud";

pub struct TestEnv {
    pub server: MockServer,
    pub manager: ResourceManager,
}

pub fn client_settings(server: &MockServer) -> ClientSettings {
    ClientSettings::new(&server.base_url(), server.subscription_id(), TOKEN)
        .with_poll_interval(Duration::from_millis(10))
        .with_retry_delay(Duration::from_millis(10))
}

pub async fn setup_with(settings: MockSettings) -> TestEnv {
    let server = fluentcloud_mock::spawn(settings.with_expected_token(TOKEN))
        .await
        .expect("mock server should start");
    let manager =
        ResourceManager::authenticate(client_settings(&server)).expect("settings are valid");
    TestEnv { server, manager }
}

/// One status read per operation, like most tests want.
pub async fn setup() -> TestEnv {
    setup_with(MockSettings::for_tests()).await
}

pub async fn create_group(manager: &ResourceManager, name: &str) {
    manager
        .resource_groups()
        .define(name)
        .with_region(Region::US_EAST)
        .create()
        .await
        .expect("resource group should be created");
}

pub async fn create_network(manager: &ResourceManager, group: &str, name: &str) -> Network {
    manager
        .networks()
        .define(name)
        .with_region(Region::US_EAST)
        .with_existing_resource_group(group)
        .with_address_space("10.0.0.0/16")
        .with_subnet("default", "10.0.0.0/24")
        .with_subnet("backend", "10.0.1.0/24")
        .create()
        .await
        .expect("network should be created")
}
