use std::sync::Arc;

use futures::future;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::broker::{
    BrokerClient, ConnectionConfig, ConsumerTransport, MessageCallback, ProducerTransport,
};
use crate::config::Settings;
use crate::utils::{PubSubError, PubSubResult};

/// Owns the two broker connections of one engine instance.
///
/// Each direction is created lazily on first use and memoized, success or
/// failure alike: however many callers race the first `ensure_*` call,
/// exactly one creation sequence runs and everyone receives its outcome. A
/// direction that failed stays failed for the life of the instance; there is
/// no automatic retry or reconnect.
pub struct ConnectionManager {
    settings: Settings,
    client: Arc<dyn BrokerClient>,
    producer: OnceCell<PubSubResult<Arc<dyn ProducerTransport>>>,
    consumer: OnceCell<PubSubResult<Arc<dyn ConsumerTransport>>>,
}

impl ConnectionManager {
    pub fn new(settings: Settings, client: Arc<dyn BrokerClient>) -> Self {
        Self {
            settings,
            client,
            producer: OnceCell::new(),
            consumer: OnceCell::new(),
        }
    }

    /// The bootstrap address handed to the broker client: `host` alone when
    /// no port is configured, `host:port` otherwise.
    pub fn broker_address(&self) -> String {
        match self.settings.broker.port {
            Some(port) => format!("{}:{}", self.settings.broker.host, port),
            None => self.settings.broker.host.clone(),
        }
    }

    /// Returns the producer connection, establishing it on first call.
    pub async fn ensure_producer(&self) -> PubSubResult<Arc<dyn ProducerTransport>> {
        self.producer
            .get_or_init(|| self.open_producer())
            .await
            .clone()
    }

    /// Returns the consumer connection, establishing it on first call.
    ///
    /// `on_message` is only consulted by the call that actually creates the
    /// connection; later callers share the already-running consume loop.
    pub async fn ensure_consumer(
        &self,
        on_message: MessageCallback,
    ) -> PubSubResult<Arc<dyn ConsumerTransport>> {
        self.consumer
            .get_or_init(|| self.open_consumer(on_message))
            .await
            .clone()
    }

    /// Disconnects whatever connections exist, producer and consumer
    /// concurrently, and waits for both attempts. Failures from either side
    /// are collected into [`PubSubError::Close`] instead of short-circuiting.
    ///
    /// Each direction is resolved through the same memoized slot the
    /// `ensure_*` calls use: a creation sequence still in flight is awaited
    /// and its connection disconnected rather than leaked, and a direction
    /// that never connected has its slot sealed with
    /// [`PubSubError::EngineClosed`] so no connection can be opened later.
    pub async fn close(&self) -> PubSubResult<()> {
        let producer = self
            .producer
            .get_or_init(|| async { Err(PubSubError::EngineClosed) })
            .await
            .as_ref()
            .ok()
            .cloned();
        let consumer = self
            .consumer
            .get_or_init(|| async { Err(PubSubError::EngineClosed) })
            .await
            .as_ref()
            .ok()
            .cloned();

        let (producer_err, consumer_err) = future::join(
            async {
                match producer {
                    Some(p) => p.disconnect().await.err(),
                    None => None,
                }
            },
            async {
                match consumer {
                    Some(c) => c.disconnect().await.err(),
                    None => None,
                }
            },
        )
        .await;

        let failures: Vec<PubSubError> =
            [producer_err, consumer_err].into_iter().flatten().collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(PubSubError::Close(failures))
        }
    }

    /// Connection settings merged in increasing precedence: built-in
    /// defaults, the bootstrap address, then the user's passthrough maps.
    fn base_config(&self) -> ConnectionConfig {
        let mut config = ConnectionConfig::default();
        config
            .settings
            .insert("client.id".to_string(), "muxsub".to_string());
        config
            .settings
            .insert("bootstrap.servers".to_string(), self.broker_address());
        for (key, value) in &self.settings.broker.global_config {
            config.settings.insert(key.clone(), value.clone());
        }
        for (key, value) in &self.settings.broker.topic_config {
            config.settings.insert(format!("topic.{key}"), value.clone());
        }
        config
    }

    async fn open_producer(&self) -> PubSubResult<Arc<dyn ProducerTransport>> {
        let producer = self.client.producer(&self.base_config()).await?;
        let names = match producer.topic_names().await {
            Ok(names) => names,
            Err(e) => {
                let _ = producer.disconnect().await;
                return Err(e);
            }
        };
        if !names.iter().any(|name| name == &self.settings.engine.topic) {
            let _ = producer.disconnect().await;
            return Err(PubSubError::TopicNotFound {
                topic: self.settings.engine.topic.clone(),
            });
        }
        tracing::debug!(topic = %self.settings.engine.topic, "producer connection ready");
        Ok(producer)
    }

    async fn open_consumer(
        &self,
        on_message: MessageCallback,
    ) -> PubSubResult<Arc<dyn ConsumerTransport>> {
        let mut config = self.base_config();
        let group_id = self
            .settings
            .broker
            .group_id
            .clone()
            .unwrap_or_else(|| format!("muxsub-{}", Uuid::new_v4()));
        config.settings.insert("group.id".to_string(), group_id);

        let consumer = self.client.consumer(&config).await?;
        let names = match consumer.topic_names().await {
            Ok(names) => names,
            Err(e) => {
                let _ = consumer.disconnect().await;
                return Err(e);
            }
        };
        if !names.iter().any(|name| name == &self.settings.engine.topic) {
            let _ = consumer.disconnect().await;
            return Err(PubSubError::TopicNotFound {
                topic: self.settings.engine.topic.clone(),
            });
        }

        if let Err(e) = consumer.run(&self.settings.engine.topic, on_message).await {
            let _ = consumer.disconnect().await;
            return Err(e);
        }
        tracing::debug!(topic = %self.settings.engine.topic, "consumer connection ready");
        Ok(consumer)
    }
}
