//! Facade tests: validation happens before any broker call

use crate::fakes::{FakeBackend, RecordingBroker};
use msgbus_application::{MessageApi, ProvisionedBroker};
use msgbus_domain::constants::{TOPIC_AND_MESSAGE_REQUIRED, TOPIC_AND_SUBSCRIPTION_REQUIRED};
use msgbus_domain::error::ErrorKind;
use msgbus_domain::Error;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Serialize)]
struct Order {
    id: u32,
}

fn api_with(broker: &Arc<RecordingBroker>) -> MessageApi {
    let broker: Arc<RecordingBroker> = Arc::clone(broker);
    MessageApi::new(broker)
}

#[tokio::test]
async fn test_publish_dispatches_once() {
    let broker = RecordingBroker::new();
    let api = api_with(&broker);

    api.publish(&CancellationToken::new(), "orders", &Order { id: 1 })
        .await
        .unwrap();

    let sent = broker.sent.lock().unwrap().clone();
    assert_eq!(sent, vec![("orders".to_string(), br#"{"id":1}"#.to_vec())]);
}

#[tokio::test]
async fn test_publish_empty_topic_is_rejected_without_broker_call() {
    let broker = RecordingBroker::new();
    let api = api_with(&broker);

    let error = api
        .publish(&CancellationToken::new(), "", &Order { id: 1 })
        .await
        .unwrap_err();

    match error {
        Error::Validation { message } => assert_eq!(message, TOPIC_AND_MESSAGE_REQUIRED),
        other => panic!("Expected Validation error, got {other:?}"),
    }
    assert_eq!(broker.calls(), 0);
}

#[tokio::test]
async fn test_publish_missing_message_is_rejected_without_broker_call() {
    let broker = RecordingBroker::new();
    let api = api_with(&broker);

    let error = api
        .publish(&CancellationToken::new(), "topic", &Option::<Order>::None)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(broker.calls(), 0);
}

#[tokio::test]
async fn test_publish_string_message() {
    let broker = RecordingBroker::new();
    let api = api_with(&broker);

    api.publish(&CancellationToken::new(), "topic", "message")
        .await
        .unwrap();
    assert_eq!(broker.calls(), 1);
}

#[tokio::test]
async fn test_publish_unencodable_message_is_serialization_error() {
    let broker = RecordingBroker::new();
    let api = api_with(&broker);
    let mut by_pair = HashMap::new();
    by_pair.insert((1, 2), "pair");

    let error = api
        .publish(&CancellationToken::new(), "topic", &by_pair)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Serialization);
    assert_eq!(broker.calls(), 0);
}

#[tokio::test]
async fn test_publish_propagates_broker_error() {
    let broker = RecordingBroker::new();
    broker.fail_send.store(true, Ordering::SeqCst);
    let api = api_with(&broker);

    let error = api
        .publish(&CancellationToken::new(), "orders", &Order { id: 1 })
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_receive_invalid_input_pushes_one_error_and_closes() {
    let broker = RecordingBroker::new();
    let api = api_with(&broker);

    for (topic, subscription) in [("", "order-sub"), ("orders", ""), ("", "")] {
        let (tx, mut rx) = mpsc::channel(4);
        api.receive(CancellationToken::new(), topic, subscription, tx)
            .await;

        match rx.recv().await {
            Some(Err(Error::Validation { message })) => {
                assert_eq!(message, TOPIC_AND_SUBSCRIPTION_REQUIRED);
            }
            other => panic!("Expected Validation error, got {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }
    assert_eq!(broker.calls(), 0);
}

#[tokio::test]
async fn test_receive_dispatches_valid_input() {
    let broker = RecordingBroker::new();
    let api = api_with(&broker);
    let (tx, mut rx) = mpsc::channel(4);

    api.receive(CancellationToken::new(), "orders", "order-sub", tx)
        .await;

    assert_eq!(rx.recv().await.unwrap().unwrap(), b"recorded".to_vec());
    assert!(rx.recv().await.is_none());
    assert_eq!(
        broker.receive_calls.lock().unwrap().clone(),
        vec![("orders".to_string(), "order-sub".to_string())]
    );
}

#[tokio::test]
async fn test_spawn_receive_end_to_end() {
    let backend = Arc::new(FakeBackend::new());
    let feed = backend.script_deliveries();
    let api = MessageApi::new(Arc::new(ProvisionedBroker::new(Arc::clone(&backend))));
    let cancel = CancellationToken::new();

    let (mut rx, session) = api.spawn_receive(cancel.clone(), "orders", "order-sub", 4);
    feed.deliver(br#"{"id":7}"#);

    assert_eq!(rx.recv().await.unwrap().unwrap(), br#"{"id":7}"#.to_vec());

    cancel.cancel();
    session.await.unwrap();
    assert!(rx.recv().await.is_none());
}
