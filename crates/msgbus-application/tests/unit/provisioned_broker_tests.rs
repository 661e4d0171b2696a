//! Publish and receive path tests against a scripted backend

use crate::fakes::FakeBackend;
use msgbus_application::{BrokerSettings, ProvisionedBroker};
use msgbus_domain::error::{ErrorKind, ProvisionStep};
use msgbus_domain::ports::MessageBroker;
use msgbus_domain::{Error, OutboundMessage};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn sequential() -> BrokerSettings {
    BrokerSettings {
        max_concurrent_deliveries: 1,
        ..BrokerSettings::default()
    }
}

fn order(id: u32) -> OutboundMessage {
    OutboundMessage::new("orders", &json!({ "id": id })).unwrap()
}

// ============================================================================
// Publish path
// ============================================================================

#[tokio::test]
async fn test_publish_submits_encoded_payload_once() {
    let backend = Arc::new(FakeBackend::new());
    let broker = ProvisionedBroker::new(Arc::clone(&backend));

    broker
        .send(&CancellationToken::new(), order(1))
        .await
        .unwrap();

    let published = backend.published.lock().unwrap().clone();
    assert_eq!(
        published,
        vec![("orders".to_string(), br#"{"id":1}"#.to_vec())]
    );
    assert_eq!(backend.creates(), 1);
}

#[tokio::test]
async fn test_repeated_publish_reuses_topic() {
    let backend = Arc::new(FakeBackend::new());
    let broker = ProvisionedBroker::new(Arc::clone(&backend));
    let cancel = CancellationToken::new();

    broker.send(&cancel, order(1)).await.unwrap();
    broker.send(&cancel, order(2)).await.unwrap();

    assert_eq!(backend.published.lock().unwrap().len(), 2);
    assert_eq!(backend.find_topic_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.creates(), 1);
}

#[tokio::test]
async fn test_publish_failure_is_transport_error() {
    let backend = Arc::new(FakeBackend::new());
    backend.fail_publish.store(true, Ordering::SeqCst);
    let broker = ProvisionedBroker::new(Arc::clone(&backend));

    let error = broker
        .send(&CancellationToken::new(), order(1))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Transport);
    assert!(error.to_string().contains("broker rejected message"));
}

#[tokio::test]
async fn test_publish_provisioning_failure_skips_submit() {
    let backend = Arc::new(FakeBackend::new());
    backend.fail_find_topic.store(true, Ordering::SeqCst);
    let broker = ProvisionedBroker::new(Arc::clone(&backend));

    let error = broker
        .send(&CancellationToken::new(), order(1))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Provisioning);
    assert!(backend.published.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_publish_deadline_elapses() {
    let backend = Arc::new(FakeBackend::new().with_publish_delay(Duration::from_secs(120)));
    let settings = BrokerSettings {
        publish_timeout: Duration::from_secs(2),
        ..BrokerSettings::default()
    };
    let broker = ProvisionedBroker::with_settings(Arc::clone(&backend), settings);

    let error = broker
        .send(&CancellationToken::new(), order(1))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Transport);
    assert!(backend.published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_publish_after_cancellation_is_cancelled() {
    let backend = Arc::new(FakeBackend::new());
    let broker = ProvisionedBroker::new(Arc::clone(&backend));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let error = broker.send(&cancel, order(1)).await.unwrap_err();
    assert!(error.is_cancelled());
    assert!(backend.published.lock().unwrap().is_empty());
}

// ============================================================================
// Receive path
// ============================================================================

#[tokio::test]
async fn test_receive_forwards_payloads_in_order_and_stays_open() {
    let backend = Arc::new(FakeBackend::new());
    let feed = backend.script_deliveries();
    let broker = Arc::new(ProvisionedBroker::with_settings(
        Arc::clone(&backend),
        sequential(),
    ));
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(8);

    feed.deliver(b"A");
    feed.deliver(b"B");

    let session = {
        let broker = Arc::clone(&broker);
        let cancel = cancel.clone();
        tokio::spawn(async move { broker.receive(cancel, "orders", "order-sub", tx).await })
    };

    assert_eq!(rx.recv().await.unwrap().unwrap(), b"A".to_vec());
    assert_eq!(rx.recv().await.unwrap().unwrap(), b"B".to_vec());

    // Nothing else arrives and the channel is not closed.
    assert!(
        tokio::time::timeout(Duration::from_millis(50), rx.recv())
            .await
            .is_err()
    );
    assert_eq!(backend.acks.load(Ordering::SeqCst), 2);
    assert_eq!(
        backend.create_subscription_calls.load(Ordering::SeqCst),
        1
    );

    cancel.cancel();
    session.await.unwrap();
    drop(feed);
}

#[tokio::test]
async fn test_receive_provisioning_failure_pushes_one_error_then_closes() {
    let backend = Arc::new(FakeBackend::new());
    backend.fail_find_topic.store(true, Ordering::SeqCst);
    let broker = ProvisionedBroker::new(Arc::clone(&backend));
    let (tx, mut rx) = mpsc::channel(8);

    broker
        .receive(CancellationToken::new(), "orders", "order-sub", tx)
        .await;

    match rx.recv().await {
        Some(Err(Error::Provisioning { step, .. })) => {
            assert_eq!(step, ProvisionStep::CheckTopic);
        }
        other => panic!("Expected Provisioning error, got {other:?}"),
    }
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_receive_cancellation_closes_channel_without_error() {
    let backend = Arc::new(FakeBackend::new());
    let feed = backend.script_deliveries();
    let broker = Arc::new(ProvisionedBroker::new(Arc::clone(&backend)));
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(8);

    let session = {
        let broker = Arc::clone(&broker);
        let cancel = cancel.clone();
        tokio::spawn(async move { broker.receive(cancel, "orders", "order-sub", tx).await })
    };

    feed.deliver(b"A");
    assert_eq!(rx.recv().await.unwrap().unwrap(), b"A".to_vec());

    cancel.cancel();
    let closed = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("channel should close promptly after cancellation");
    assert!(closed.is_none());

    feed.deliver(b"late");
    session.await.unwrap();
}

#[tokio::test]
async fn test_receive_cancelled_before_start_never_contacts_broker() {
    let backend = Arc::new(FakeBackend::new());
    let broker = ProvisionedBroker::new(Arc::clone(&backend));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let (tx, mut rx) = mpsc::channel(8);

    broker.receive(cancel, "orders", "order-sub", tx).await;

    assert!(rx.recv().await.is_none());
    assert_eq!(backend.find_topic_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_receive_listening_failure_is_terminal() {
    let backend = Arc::new(FakeBackend::new());
    let feed = backend.script_deliveries();
    let broker = ProvisionedBroker::with_settings(Arc::clone(&backend), sequential());
    let (tx, mut rx) = mpsc::channel(8);

    feed.deliver(b"A");
    feed.fail("connection reset");
    broker
        .receive(CancellationToken::new(), "orders", "order-sub", tx)
        .await;

    assert_eq!(rx.recv().await.unwrap().unwrap(), b"A".to_vec());
    let error = rx.recv().await.unwrap().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Transport);
    assert!(error.to_string().contains("connection reset"));
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_receive_pull_failure_is_transport_error() {
    let backend = Arc::new(FakeBackend::new());
    backend.fail_pull.store(true, Ordering::SeqCst);
    let broker = ProvisionedBroker::new(Arc::clone(&backend));
    let (tx, mut rx) = mpsc::channel(8);

    broker
        .receive(CancellationToken::new(), "orders", "order-sub", tx)
        .await;

    let error = rx.recv().await.unwrap().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Transport);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_receive_stream_end_is_reported() {
    let backend = Arc::new(FakeBackend::new());
    let feed = backend.script_deliveries();
    drop(feed);
    let broker = ProvisionedBroker::new(Arc::clone(&backend));
    let (tx, mut rx) = mpsc::channel(8);

    broker
        .receive(CancellationToken::new(), "orders", "order-sub", tx)
        .await;

    let error = rx.recv().await.unwrap().unwrap_err();
    assert!(error.to_string().contains("delivery stream ended"));
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_receive_leaves_message_unacked_when_consumer_is_gone() {
    let backend = Arc::new(FakeBackend::new());
    let feed = backend.script_deliveries();
    let broker = ProvisionedBroker::new(Arc::clone(&backend));
    let (tx, rx) = mpsc::channel(8);
    drop(rx);

    feed.deliver(b"A");
    tokio::time::timeout(
        Duration::from_secs(1),
        broker.receive(CancellationToken::new(), "orders", "order-sub", tx),
    )
    .await
    .expect("session should end once the consumer is gone");

    assert_eq!(backend.acks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_idle_session_ends_when_consumer_drops_receiver() {
    let backend = Arc::new(FakeBackend::new());
    let feed = backend.script_deliveries();
    let broker = ProvisionedBroker::new(Arc::clone(&backend));
    let (tx, rx) = mpsc::channel(8);
    drop(rx);

    // The feed stays open and never delivers.
    tokio::time::timeout(
        Duration::from_secs(1),
        broker.receive(CancellationToken::new(), "orders", "order-sub", tx),
    )
    .await
    .expect("idle session should end once the consumer is gone");

    assert_eq!(backend.acks.load(Ordering::SeqCst), 0);
    drop(feed);
}

#[tokio::test]
async fn test_spawned_session_finishes_after_receiver_dropped_mid_session() {
    let backend = Arc::new(FakeBackend::new());
    let feed = backend.script_deliveries();
    let broker = Arc::new(ProvisionedBroker::new(Arc::clone(&backend)));
    let (tx, mut rx) = mpsc::channel(8);

    let session = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move {
            broker
                .receive(CancellationToken::new(), "orders", "order-sub", tx)
                .await;
        })
    };

    feed.deliver(b"A");
    assert_eq!(rx.recv().await.unwrap().unwrap(), b"A".to_vec());
    drop(rx);

    tokio::time::timeout(Duration::from_secs(1), session)
        .await
        .expect("session task should finish after the receiver is dropped")
        .unwrap();
    assert_eq!(backend.acks.load(Ordering::SeqCst), 1);
    drop(feed);
}
