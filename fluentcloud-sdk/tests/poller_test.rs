mod common;

use common::{client_settings, create_group, setup, setup_with};
use fluentcloud_mock::MockSettings;
use fluentcloud_sdk::models::{ProvisioningState, Region, MOCK_TAG_FAIL_PROVISIONING};
use fluentcloud_sdk::prelude::*;
use fluentcloud_sdk::resources::network::NetworkDefinition;
use fluentcloud_sdk::{PollStatus, SdkError};

fn network(manager: &ResourceManager, name: &str) -> NetworkDefinition {
    manager
        .networks()
        .define(name)
        .with_region(Region::US_EAST)
        .with_existing_resource_group("rg-lro")
        .with_address_space("10.0.0.0/16")
}

#[tokio::test]
async fn test_manual_polling_reports_progress() {
    let env = setup_with(MockSettings::for_tests().with_polls_to_complete(3)).await;
    create_group(&env.manager, "rg-lro").await;

    let mut poller = network(&env.manager, "vnet-slow").begin_create().await.unwrap();
    assert_eq!(poller.status(), PollStatus::InProgress);
    assert_eq!(poller.attempts(), 0);

    // The resource is visible while it is being created.
    let pending = env
        .manager
        .networks()
        .get_by_resource_group("rg-lro", "vnet-slow")
        .await
        .unwrap();
    assert_eq!(pending.provisioning_state(), Some(ProvisioningState::Creating));

    assert_eq!(poller.poll().await.unwrap(), PollStatus::InProgress);
    assert_eq!(poller.poll().await.unwrap(), PollStatus::InProgress);
    assert_eq!(poller.poll().await.unwrap(), PollStatus::Succeeded);
    assert_eq!(poller.attempts(), 3);
    // Terminal states are sticky and cost no request.
    assert_eq!(poller.poll().await.unwrap(), PollStatus::Succeeded);
    assert_eq!(poller.attempts(), 3);

    let created = poller.until_done().await.unwrap();
    assert_eq!(created.provisioning_state(), Some(ProvisioningState::Succeeded));
}

#[tokio::test]
async fn test_synchronous_service_needs_no_polling() {
    let env = setup_with(MockSettings::for_tests().with_polls_to_complete(0)).await;
    create_group(&env.manager, "rg-lro").await;

    let poller = network(&env.manager, "vnet-fast").begin_create().await.unwrap();
    assert_eq!(poller.status(), PollStatus::Succeeded);
    let created = poller.until_done().await.unwrap();
    assert_eq!(created.name(), "vnet-fast");

    env.manager.networks().delete_by_id(created.id()).await.unwrap();
    assert!(env
        .manager
        .networks()
        .list_by_resource_group("rg-lro")
        .collect_all()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_failed_provisioning_surfaces_error() {
    let env = setup_with(MockSettings::for_tests().with_polls_to_complete(2)).await;
    create_group(&env.manager, "rg-lro").await;

    let err = network(&env.manager, "vnet-broken")
        .with_tag(MOCK_TAG_FAIL_PROVISIONING, "true")
        .create()
        .await
        .unwrap_err();
    match &err {
        SdkError::OperationFailed { code, .. } => assert_eq!(code, "ProvisioningFailed"),
        other => panic!("expected OperationFailed, got {:?}", other),
    }
    assert_eq!(err.service_code(), Some("ProvisioningFailed"));

    let stored = env
        .manager
        .networks()
        .get_by_resource_group("rg-lro", "vnet-broken")
        .await
        .unwrap();
    assert_eq!(stored.provisioning_state(), Some(ProvisioningState::Failed));
}

#[tokio::test]
async fn test_poll_budget_is_enforced() {
    let env = setup_with(MockSettings::for_tests().with_polls_to_complete(50)).await;
    create_group(&env.manager, "rg-lro").await;
    let impatient =
        ResourceManager::authenticate(client_settings(&env.server).with_max_poll_attempts(2))
            .unwrap();

    let err = network(&impatient, "vnet-stuck").create().await.unwrap_err();
    assert!(matches!(err, SdkError::PollTimeout { attempts: 2 }), "{:?}", err);
}

#[tokio::test]
async fn test_location_monitor_for_deletes() {
    let env = setup_with(MockSettings::for_tests().with_polls_to_complete(2)).await;
    create_group(&env.manager, "rg-lro").await;
    let created = network(&env.manager, "vnet-gone").create().await.unwrap();

    env.manager.networks().delete_by_id(created.id()).await.unwrap();
    let err = env
        .manager
        .networks()
        .get_by_id(created.id())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // Nothing to delete any more.
    env.manager.networks().delete_by_id(created.id()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wait_blocking_on_multi_thread_runtime() {
    let env = setup_with(MockSettings::for_tests().with_polls_to_complete(2)).await;
    create_group(&env.manager, "rg-lro").await;

    let poller = network(&env.manager, "vnet-blocking").begin_create().await.unwrap();
    let created = poller.wait_blocking().unwrap();
    assert_eq!(created.provisioning_state(), Some(ProvisioningState::Succeeded));
}

#[tokio::test]
async fn test_wait_blocking_refuses_current_thread_runtime() {
    let env = setup().await;
    create_group(&env.manager, "rg-lro").await;

    let poller = network(&env.manager, "vnet-refused").begin_create().await.unwrap();
    let err = poller.wait_blocking().err().unwrap();
    assert!(matches!(err, SdkError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_throttled_writes_are_retried() {
    let env = setup_with(MockSettings::for_tests().with_throttle_requests(2)).await;
    create_group(&env.manager, "rg-lro").await;
    let created = network(&env.manager, "vnet-retried").create().await.unwrap();
    assert_eq!(created.provisioning_state(), Some(ProvisioningState::Succeeded));
}

#[tokio::test]
async fn test_throttling_beyond_retry_budget_fails() {
    let env = setup_with(MockSettings::for_tests().with_throttle_requests(5)).await;
    let strict =
        ResourceManager::authenticate(client_settings(&env.server).with_max_retries(1)).unwrap();

    let err = strict
        .resource_groups()
        .define("rg-throttled")
        .with_region(Region::US_EAST)
        .create()
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(429));
    assert_eq!(err.service_code(), Some("TooManyRequests"));
}

#[tokio::test]
async fn test_wrong_token_is_rejected() {
    let env = setup().await;
    let mut settings = client_settings(&env.server);
    settings.token = "not-the-token".to_string();
    let intruder = ResourceManager::authenticate(settings).unwrap();

    let err = intruder.resource_groups().list().collect_all().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.service_code(), Some("InvalidAuthenticationToken"));
}

#[tokio::test]
async fn test_failed_location_operation_is_operation_failed() {
    use fluentcloud_mock::lro::{self, Completion};
    use fluentcloud_sdk::pipeline::RawResponse;
    use fluentcloud_sdk::Poller;
    use reqwest::header::{HeaderMap, HeaderValue};

    let env = setup().await;
    let operation_id = {
        let mut data = env.server.state.store.write().await;
        lro::start(
            &mut data,
            Completion::Provision {
                resource_id: "/subscriptions/s/resourceGroups/rg/providers/Fluent.Compute/disks/d"
                    .to_string(),
                fail: true,
            },
            1,
        )
        .unwrap()
    };
    let monitor = format!(
        "{}/subscriptions/{}/operationResults/{}",
        env.server.base_url(),
        env.server.subscription_id(),
        operation_id
    );
    let mut headers = HeaderMap::new();
    headers.insert("location", HeaderValue::from_str(&monitor).unwrap());
    let accepted = RawResponse {
        status: 202,
        headers,
        body: Vec::new(),
    };

    let mut poller =
        Poller::discarding(env.manager.pipeline().clone(), "2023-09-01", accepted).unwrap();
    assert_eq!(poller.poll().await.unwrap(), PollStatus::Failed);
    match poller.until_done().await.unwrap_err() {
        SdkError::OperationFailed { code, .. } => assert_eq!(code, "ProvisioningFailed"),
        other => panic!("unexpected error: {:?}", other),
    }
}
