use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::info;

use muxsub::config::load_config;
use muxsub::utils::logging;
use muxsub::{MemoryBroker, Payload, PubSub};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let settings = load_config().expect("Failed to load configuration");
    logging::init("info");

    // Demo run against the in-process broker: one channel, one round trip.
    let broker = Arc::new(MemoryBroker::with_topic(&settings.engine.topic));
    let pubsub = PubSub::new(settings, broker);

    let id = pubsub
        .subscribe(
            "demo",
            Arc::new(|payload| match payload {
                Payload::Json(value) => info!(%value, "received"),
                Payload::Raw(bytes) => info!(len = bytes.len(), "received raw"),
            }),
        )
        .await
        .expect("subscribe failed");

    pubsub
        .publish("demo", json!({"hello": "world"}))
        .await
        .expect("publish failed");

    // Give the consume loop a beat to dispatch before shutting down.
    tokio::time::sleep(Duration::from_millis(50)).await;

    pubsub.unsubscribe(id).expect("unsubscribe failed");
    pubsub.close().await.expect("close failed");
}
