use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::broker::{BrokerClient, MessageCallback};
use crate::codec;
use crate::config::Settings;
use crate::connection::ConnectionManager;
use crate::registry::{Listener, SubscriptionId, SubscriptionRegistry};
use crate::utils::{PubSubError, PubSubResult};

/// Function deriving an optional broker partition key from an outgoing
/// payload. Configured programmatically on the engine, not from files.
pub type KeyFun = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// The pub/sub engine: multiplexes logical channels over one broker topic.
///
/// `publish` encodes the channel into the outgoing message, `subscribe`
/// registers a local listener and wires the single shared consume loop into
/// the fan-out registry. Connections come up lazily on first use, once per
/// direction per instance.
///
/// After [`PubSub::close`] the instance is spent: further publish or
/// subscribe calls fail with [`PubSubError::EngineClosed`]. Torn-down
/// connections are never reopened.
pub struct PubSub {
    settings: Settings,
    key_fun: Option<KeyFun>,
    connections: ConnectionManager,
    registry: Arc<SubscriptionRegistry>,
    closed: AtomicBool,
}

impl PubSub {
    pub fn new(settings: Settings, client: Arc<dyn BrokerClient>) -> Self {
        Self {
            connections: ConnectionManager::new(settings.clone(), client),
            settings,
            key_fun: None,
            registry: Arc::new(SubscriptionRegistry::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Sets the partition-key derivation function for outgoing messages.
    pub fn with_key_fun(mut self, key_fun: KeyFun) -> Self {
        self.key_fun = Some(key_fun);
        self
    }

    /// Publishes `payload` on a logical channel.
    ///
    /// Ensures the producer connection exists (idempotent), encodes the
    /// message in the configured wire mode, derives the partition key when a
    /// key function is set, and resolves once the broker acknowledges the
    /// send. A broker-side failure is surfaced to this caller only.
    pub async fn publish(&self, channel: &str, payload: Value) -> PubSubResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PubSubError::EngineClosed);
        }
        let producer = self.connections.ensure_producer().await?;

        let mut message = codec::encode(channel, &payload, self.settings.engine.use_headers)?;
        if let Some(key_fun) = &self.key_fun {
            message.key = key_fun(&payload).map(String::into_bytes);
        }

        producer.produce(&self.settings.engine.topic, message).await
    }

    /// Registers `listener` on a logical channel and returns its
    /// subscription id.
    ///
    /// The first subscribe call on an instance starts the shared consumer
    /// connection and consume loop; every inbound message is decoded and
    /// dispatched to whichever listeners its channel has at that moment.
    pub async fn subscribe(&self, channel: &str, listener: Listener) -> PubSubResult<SubscriptionId> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PubSubError::EngineClosed);
        }
        self.connections.ensure_consumer(self.on_message()).await?;
        Ok(self.registry.subscribe(channel, listener))
    }

    /// Removes the subscription with the given id. Takes effect for all
    /// future dispatches immediately; the shared consume loop keeps running
    /// for everyone else.
    pub fn unsubscribe(&self, id: SubscriptionId) -> PubSubResult<()> {
        self.registry.unsubscribe(id)
    }

    /// Shuts the engine down: disconnects producer and consumer and marks
    /// the instance closed. The only way to stop the consume loop; expected
    /// to be called once.
    pub async fn close(&self) -> PubSubResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.connections.close().await
    }

    /// The inbound path handed to the consumer connection: decode the
    /// channel, skip the payload work when nobody listens, dispatch
    /// otherwise. Decode failures drop the message with a warning and never
    /// touch the consume loop.
    fn on_message(&self) -> MessageCallback {
        let registry = self.registry.clone();
        let topic = self.settings.engine.topic.clone();
        let use_headers = self.settings.engine.use_headers;

        Arc::new(move |message| {
            let channel = match codec::decode_channel(&message, use_headers, &topic) {
                Ok(channel) => channel,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping inbound message");
                    return;
                }
            };
            if !registry.has_listeners(&channel) {
                return;
            }
            match codec::decode_payload(&message, use_headers) {
                Ok(payload) => registry.dispatch(&channel, payload),
                Err(e) => tracing::warn!(error = %e, %channel, "dropping inbound message"),
            }
        })
    }
}
