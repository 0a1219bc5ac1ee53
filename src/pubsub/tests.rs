use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::engine::PubSub;
use crate::broker::{BrokerClient, ConnectionConfig, MemoryBroker};
use crate::codec::{Payload, WireMessage};
use crate::config::Settings;
use crate::registry::Listener;
use crate::utils::PubSubError;

fn engine_on(broker: &Arc<MemoryBroker>, topic: &str, use_headers: bool) -> PubSub {
    let mut settings = Settings::default();
    settings.engine.topic = topic.to_string();
    settings.engine.use_headers = use_headers;
    PubSub::new(settings, broker.clone())
}

fn collector() -> (Listener, mpsc::UnboundedReceiver<Payload>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let listener: Listener = Arc::new(move |payload| {
        let _ = tx.send(payload);
    });
    (listener, rx)
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Payload>) -> Payload {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for a dispatch")
        .expect("listener channel closed")
}

#[tokio::test]
async fn test_envelope_round_trip() {
    let broker = Arc::new(MemoryBroker::with_topic("events"));
    let pubsub = engine_on(&broker, "events", false);

    let (listener, mut rx) = collector();
    pubsub.subscribe("orders", listener).await.unwrap();
    pubsub
        .publish("orders", json!({"id": 42}))
        .await
        .unwrap();

    assert_eq!(recv(&mut rx).await, Payload::Json(json!({"id": 42})));
}

#[tokio::test]
async fn test_header_mode_round_trip_delivers_raw_bytes() {
    let broker = Arc::new(MemoryBroker::with_topic("events"));
    let pubsub = engine_on(&broker, "events", true);

    let (listener, mut rx) = collector();
    pubsub.subscribe("orders", listener).await.unwrap();
    pubsub
        .publish("orders", json!({"id": 42}))
        .await
        .unwrap();

    let Payload::Raw(raw) = recv(&mut rx).await else {
        panic!("header mode should deliver raw bytes");
    };
    let parsed: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(parsed, json!({"id": 42}));
}

#[tokio::test]
async fn test_fan_out_reaches_every_listener_in_order() {
    let broker = Arc::new(MemoryBroker::with_topic("events"));
    let pubsub = engine_on(&broker, "events", false);

    let (listener_a, mut rx_a) = collector();
    let (listener_b, mut rx_b) = collector();
    pubsub.subscribe("orders", listener_a).await.unwrap();
    pubsub.subscribe("orders", listener_b).await.unwrap();

    pubsub.publish("orders", json!(1)).await.unwrap();
    pubsub.publish("orders", json!(2)).await.unwrap();

    for rx in [&mut rx_a, &mut rx_b] {
        assert_eq!(recv(rx).await, Payload::Json(json!(1)));
        assert_eq!(recv(rx).await, Payload::Json(json!(2)));
    }
}

#[tokio::test]
async fn test_channels_are_isolated() {
    let broker = Arc::new(MemoryBroker::with_topic("events"));
    let pubsub = engine_on(&broker, "events", false);

    let (listener_a, mut rx_a) = collector();
    let (listener_b, mut rx_b) = collector();
    pubsub.subscribe("a", listener_a).await.unwrap();
    pubsub.subscribe("b", listener_b).await.unwrap();

    pubsub.publish("b", json!("for b")).await.unwrap();

    assert_eq!(recv(&mut rx_b).await, Payload::Json(json!("for b")));
    assert!(rx_a.try_recv().is_err());
}

#[tokio::test]
async fn test_unsubscribed_listener_stops_receiving() {
    let broker = Arc::new(MemoryBroker::with_topic("events"));
    let pubsub = engine_on(&broker, "events", false);

    let (gone, mut rx_gone) = collector();
    let (kept, mut rx_kept) = collector();
    let id = pubsub.subscribe("orders", gone).await.unwrap();
    pubsub.subscribe("orders", kept).await.unwrap();

    pubsub.unsubscribe(id).unwrap();
    pubsub.publish("orders", json!(1)).await.unwrap();

    assert_eq!(recv(&mut rx_kept).await, Payload::Json(json!(1)));
    assert!(rx_gone.try_recv().is_err());
}

#[tokio::test]
async fn test_unsubscribe_unknown_id_is_an_error() {
    let broker = Arc::new(MemoryBroker::with_topic("events"));
    let pubsub = engine_on(&broker, "events", false);
    assert_eq!(
        pubsub.unsubscribe(7),
        Err(PubSubError::UnknownSubscription { id: 7 })
    );
}

#[tokio::test]
async fn test_missing_topic_fails_publish_and_subscribe() {
    let broker = Arc::new(MemoryBroker::with_topic("other"));
    let pubsub = engine_on(&broker, "events", false);

    let err = pubsub.publish("orders", json!(1)).await.unwrap_err();
    assert!(matches!(err, PubSubError::TopicNotFound { .. }));

    let (listener, _rx) = collector();
    let err = pubsub.subscribe("orders", listener).await.unwrap_err();
    assert!(matches!(err, PubSubError::TopicNotFound { .. }));
}

#[tokio::test]
async fn test_foreign_envelope_falls_back_to_the_topic_channel() {
    let broker = Arc::new(MemoryBroker::with_topic("events"));
    let pubsub = engine_on(&broker, "events", false);

    // Listen on the channel named after the topic itself.
    let (listener, mut rx) = collector();
    pubsub.subscribe("events", listener).await.unwrap();

    // A producer that does not use this abstraction writes a plain object.
    let producer = broker.producer(&ConnectionConfig::default()).await.unwrap();
    producer
        .produce(
            "events",
            WireMessage {
                key: None,
                value: serde_json::to_vec(&json!({"id": 7})).unwrap(),
                headers: None,
                timestamp: 0,
            },
        )
        .await
        .unwrap();

    assert_eq!(recv(&mut rx).await, Payload::Json(json!({"id": 7})));
}

#[tokio::test]
async fn test_malformed_envelope_is_dropped_and_the_loop_continues() {
    let broker = Arc::new(MemoryBroker::with_topic("events"));
    let pubsub = engine_on(&broker, "events", false);

    let (listener, mut rx) = collector();
    pubsub.subscribe("orders", listener).await.unwrap();

    // A body that is not JSON at all cannot be decoded in envelope mode.
    let producer = broker.producer(&ConnectionConfig::default()).await.unwrap();
    producer
        .produce(
            "events",
            WireMessage {
                key: None,
                value: b"not json".to_vec(),
                headers: None,
                timestamp: 0,
            },
        )
        .await
        .unwrap();

    // The bad message is dropped; the next valid publish still arrives.
    pubsub.publish("orders", json!({"id": 1})).await.unwrap();
    assert_eq!(recv(&mut rx).await, Payload::Json(json!({"id": 1})));
}

#[tokio::test]
async fn test_header_message_without_channel_is_dropped_and_the_loop_continues() {
    let broker = Arc::new(MemoryBroker::with_topic("events"));
    let pubsub = engine_on(&broker, "events", true);

    let (listener, mut rx) = collector();
    pubsub.subscribe("orders", listener).await.unwrap();

    // Header mode cannot route a message that carries no channel header.
    let producer = broker.producer(&ConnectionConfig::default()).await.unwrap();
    producer
        .produce(
            "events",
            WireMessage {
                key: None,
                value: b"{}".to_vec(),
                headers: None,
                timestamp: 0,
            },
        )
        .await
        .unwrap();

    pubsub.publish("orders", json!({"id": 2})).await.unwrap();
    let Payload::Raw(raw) = recv(&mut rx).await else {
        panic!("header mode should deliver raw bytes");
    };
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&raw).unwrap(),
        json!({"id": 2})
    );
}

#[tokio::test]
async fn test_closed_engine_rejects_further_use() {
    let broker = Arc::new(MemoryBroker::with_topic("events"));
    let pubsub = engine_on(&broker, "events", false);

    pubsub.publish("orders", json!(1)).await.unwrap();
    pubsub.close().await.unwrap();

    let err = pubsub.publish("orders", json!(2)).await.unwrap_err();
    assert_eq!(err, PubSubError::EngineClosed);

    let (listener, _rx) = collector();
    let err = pubsub.subscribe("orders", listener).await.unwrap_err();
    assert_eq!(err, PubSubError::EngineClosed);
}

#[tokio::test]
async fn test_key_fun_derives_the_partition_key() {
    let broker = Arc::new(MemoryBroker::with_topic("events"));
    let pubsub = engine_on(&broker, "events", false).with_key_fun(Arc::new(|payload| {
        payload.get("id").map(|id| id.to_string())
    }));

    pubsub.publish("orders", json!({"id": 42})).await.unwrap();

    let produced = broker.produced();
    assert_eq!(produced.len(), 1);
    assert_eq!(produced[0].0, "events");
    assert_eq!(produced[0].1.key.as_deref(), Some(b"42".as_slice()));
}

#[tokio::test]
async fn test_fifty_concurrent_publishes_start_one_connection() {
    let broker =
        Arc::new(MemoryBroker::with_topic("events").with_connect_delay(Duration::from_millis(20)));
    let pubsub = Arc::new(engine_on(&broker, "events", false));

    let mut handles = Vec::new();
    for i in 0..50 {
        let pubsub = pubsub.clone();
        handles.push(tokio::spawn(async move {
            pubsub.publish("orders", json!(i)).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(broker.producer_connects(), 1);
    assert_eq!(broker.produced().len(), 50);
}

#[tokio::test]
async fn test_each_engine_instance_gets_its_own_copy() {
    // No group id configured: both engines generate fresh ones and both
    // receive the full topic traffic.
    let broker = Arc::new(MemoryBroker::with_topic("events"));
    let first = engine_on(&broker, "events", false);
    let second = engine_on(&broker, "events", false);

    let (listener_a, mut rx_a) = collector();
    let (listener_b, mut rx_b) = collector();
    first.subscribe("orders", listener_a).await.unwrap();
    second.subscribe("orders", listener_b).await.unwrap();

    first.publish("orders", json!("broadcast")).await.unwrap();

    assert_eq!(recv(&mut rx_a).await, Payload::Json(json!("broadcast")));
    assert_eq!(recv(&mut rx_b).await, Payload::Json(json!("broadcast")));
}
