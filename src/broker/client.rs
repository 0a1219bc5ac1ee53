use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::codec::WireMessage;
use crate::utils::PubSubResult;

/// Callback invoked by a consumer's consume loop for every delivered message.
pub type MessageCallback = Arc<dyn Fn(WireMessage) + Send + Sync>;

/// The merged settings handed to the broker client when opening a connection.
///
/// Built by the connection manager in increasing precedence: built-in
/// defaults, then the bootstrap address under `bootstrap.servers`, then the
/// user's passthrough settings. Consumers additionally carry `group.id`.
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfig {
    pub settings: HashMap<String, String>,
}

impl ConnectionConfig {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }
}

/// Outbound half of the broker connection.
///
/// Implementations report send failures as [`PubSubError::Publish`] and
/// connection-level failures as [`PubSubError::Connection`].
///
/// [`PubSubError::Publish`]: crate::utils::PubSubError::Publish
/// [`PubSubError::Connection`]: crate::utils::PubSubError::Connection
#[async_trait]
pub trait ProducerTransport: Send + Sync {
    /// Lists the topic names the broker currently knows about.
    async fn topic_names(&self) -> PubSubResult<Vec<String>>;

    /// Sends one message; resolves when the broker acknowledges it.
    async fn produce(&self, topic: &str, message: WireMessage) -> PubSubResult<()>;

    async fn disconnect(&self) -> PubSubResult<()>;
}

impl std::fmt::Debug for dyn ProducerTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ProducerTransport")
    }
}

/// Inbound half of the broker connection.
#[async_trait]
pub trait ConsumerTransport: Send + Sync {
    /// Lists the topic names the broker currently knows about.
    async fn topic_names(&self) -> PubSubResult<Vec<String>>;

    /// Subscribes to `topic` and starts the continuous consume loop,
    /// invoking `on_message` for every delivered message until disconnect.
    async fn run(&self, topic: &str, on_message: MessageCallback) -> PubSubResult<()>;

    async fn disconnect(&self) -> PubSubResult<()>;
}

impl std::fmt::Debug for dyn ConsumerTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ConsumerTransport")
    }
}

/// Entry point to the broker: opens producer and consumer connections.
///
/// `producer`/`consumer` resolve once the broker reports the connection
/// ready, so a returned transport is immediately usable for metadata and
/// traffic.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn producer(&self, config: &ConnectionConfig) -> PubSubResult<Arc<dyn ProducerTransport>>;

    async fn consumer(&self, config: &ConnectionConfig) -> PubSubResult<Arc<dyn ConsumerTransport>>;
}
