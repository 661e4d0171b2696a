//! Tests for the one-shot helpers

use msgbus::domain::constants::{PROJECT_ID_REQUIRED, TOPIC_AND_SUBSCRIPTION_REQUIRED};
use msgbus::{
    AppConfig, BrokerConfig, CancellationToken, Error, ErrorKind, publish_message,
    receive_message, subscribe,
};
use tokio::sync::mpsc;

fn config_with(broker: BrokerConfig) -> AppConfig {
    AppConfig {
        broker,
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_publish_message_over_null_broker() {
    let config = config_with(BrokerConfig::null());
    let result = publish_message(&config, "orders", &serde_json::json!({"id": 1})).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_publish_message_validates_before_dispatch() {
    let config = config_with(BrokerConfig::memory());

    match publish_message(&config, "", "hello").await {
        Err(Error::Validation { .. }) => {}
        _ => panic!("Expected Validation error"),
    }
    match publish_message(&config, "orders", &Option::<u8>::None).await {
        Err(Error::Validation { .. }) => {}
        _ => panic!("Expected Validation error"),
    }
}

#[tokio::test]
async fn test_receive_message_pushes_construction_error_then_closes() {
    let config = config_with(BrokerConfig::nats("nats://localhost:4222", ""));
    let (tx, mut rx) = mpsc::channel(4);

    receive_message(&config, CancellationToken::new(), "orders", "billing", tx).await;

    match rx.recv().await {
        Some(Err(Error::Configuration { message, .. })) => assert_eq!(message, PROJECT_ID_REQUIRED),
        _ => panic!("Expected Configuration error"),
    }
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_receive_message_cancelled_closes_without_error() {
    let config = config_with(BrokerConfig::null());
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(4);
    cancel.cancel();

    receive_message(&config, cancel, "orders", "billing", tx).await;

    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_subscribe_reports_invalid_input_through_channel() {
    let config = config_with(BrokerConfig::memory());
    let (mut rx, session) = subscribe(&config, CancellationToken::new(), "orders", "")
        .await
        .unwrap();

    match rx.recv().await {
        Some(Err(error)) => {
            assert_eq!(error.kind(), ErrorKind::Validation);
            assert_eq!(
                error.to_string(),
                format!("Validation error: {TOPIC_AND_SUBSCRIPTION_REQUIRED}")
            );
        }
        _ => panic!("Expected Validation error"),
    }
    session.await.unwrap();
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_subscribe_rejects_invalid_config() {
    let config = config_with(BrokerConfig {
        max_concurrent_deliveries: 0,
        ..BrokerConfig::memory()
    });

    assert!(
        subscribe(&config, CancellationToken::new(), "orders", "billing")
            .await
            .is_err()
    );
}
