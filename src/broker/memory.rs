use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::broker::client::{
    BrokerClient, ConnectionConfig, ConsumerTransport, MessageCallback, ProducerTransport,
};
use crate::codec::WireMessage;
use crate::utils::{PubSubError, PubSubResult};

/// An in-process broker implementing the [`BrokerClient`] traits.
///
/// It keeps a fixed topic registry and one unbounded queue per connected
/// consumer. Consumers that share a `group.id` split a topic's traffic
/// round-robin; consumers in distinct groups each receive a full copy, which
/// is exactly what engines with generated group ids get.
///
/// The broker also keeps connect/disconnect/produce accounting and a couple
/// of failure switches, so the connection layer's lifecycle guarantees can be
/// tested against it.
pub struct MemoryBroker {
    hub: Arc<Mutex<Hub>>,
    connect_delay: Option<Duration>,
}

#[derive(Default)]
struct Hub {
    topics: HashMap<String, TopicState>,
    produced: Vec<(String, WireMessage)>,
    producer_settings: Vec<HashMap<String, String>>,
    consumer_groups: Vec<String>,
    producer_connects: usize,
    consumer_connects: usize,
    producer_disconnects: usize,
    consumer_disconnects: usize,
    refuse_connects: bool,
    refuse_disconnects: bool,
}

#[derive(Default)]
struct TopicState {
    groups: HashMap<String, GroupState>,
}

#[derive(Default)]
struct GroupState {
    members: Vec<(Uuid, mpsc::UnboundedSender<WireMessage>)>,
    cursor: usize,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            hub: Arc::new(Mutex::new(Hub::default())),
            connect_delay: None,
        }
    }

    pub fn with_topic(name: &str) -> Self {
        let broker = Self::new();
        broker.add_topic(name);
        broker
    }

    /// Delays every connect by `delay`, widening the race window for tests
    /// that hammer the lazy-connection path concurrently.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn add_topic(&self, name: &str) {
        self.hub
            .lock()
            .unwrap()
            .topics
            .entry(name.to_string())
            .or_default();
    }

    /// Makes every subsequent connect fail with a connection error.
    pub fn refuse_connects(&self, refuse: bool) {
        self.hub.lock().unwrap().refuse_connects = refuse;
    }

    /// Makes every subsequent disconnect fail with a connection error.
    pub fn refuse_disconnects(&self, refuse: bool) {
        self.hub.lock().unwrap().refuse_disconnects = refuse;
    }

    pub fn producer_connects(&self) -> usize {
        self.hub.lock().unwrap().producer_connects
    }

    pub fn consumer_connects(&self) -> usize {
        self.hub.lock().unwrap().consumer_connects
    }

    pub fn producer_disconnects(&self) -> usize {
        self.hub.lock().unwrap().producer_disconnects
    }

    pub fn consumer_disconnects(&self) -> usize {
        self.hub.lock().unwrap().consumer_disconnects
    }

    /// Every message produced so far, with the topic it went to.
    pub fn produced(&self) -> Vec<(String, WireMessage)> {
        self.hub.lock().unwrap().produced.clone()
    }

    /// The merged settings each producer connect arrived with.
    pub fn producer_settings(&self) -> Vec<HashMap<String, String>> {
        self.hub.lock().unwrap().producer_settings.clone()
    }

    /// The group id of every consumer connect, in connect order.
    pub fn consumer_groups(&self) -> Vec<String> {
        self.hub.lock().unwrap().consumer_groups.clone()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerClient for MemoryBroker {
    async fn producer(
        &self,
        config: &ConnectionConfig,
    ) -> PubSubResult<Arc<dyn ProducerTransport>> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        let mut hub = self.hub.lock().unwrap();
        hub.producer_connects += 1;
        if hub.refuse_connects {
            return Err(PubSubError::Connection("broker unreachable".to_string()));
        }
        hub.producer_settings.push(config.settings.clone());
        Ok(Arc::new(MemoryProducer {
            hub: self.hub.clone(),
        }))
    }

    async fn consumer(
        &self,
        config: &ConnectionConfig,
    ) -> PubSubResult<Arc<dyn ConsumerTransport>> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        let mut hub = self.hub.lock().unwrap();
        hub.consumer_connects += 1;
        if hub.refuse_connects {
            return Err(PubSubError::Connection("broker unreachable".to_string()));
        }
        let group = config
            .get("group.id")
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        hub.consumer_groups.push(group.clone());
        Ok(Arc::new(MemoryConsumer {
            hub: self.hub.clone(),
            group,
            member: Uuid::new_v4(),
            registered: Mutex::new(None),
        }))
    }
}

struct MemoryProducer {
    hub: Arc<Mutex<Hub>>,
}

#[async_trait]
impl ProducerTransport for MemoryProducer {
    async fn topic_names(&self) -> PubSubResult<Vec<String>> {
        Ok(self.hub.lock().unwrap().topics.keys().cloned().collect())
    }

    async fn produce(&self, topic: &str, message: WireMessage) -> PubSubResult<()> {
        let mut hub = self.hub.lock().unwrap();
        if !hub.topics.contains_key(topic) {
            return Err(PubSubError::Publish(format!("unknown topic '{topic}'")));
        }
        hub.produced.push((topic.to_string(), message.clone()));

        if let Some(state) = hub.topics.get_mut(topic) {
            for group in state.groups.values_mut() {
                group.members.retain(|(_, tx)| !tx.is_closed());
                if group.members.is_empty() {
                    continue;
                }
                // One delivery per group, rotated across its members.
                let idx = group.cursor % group.members.len();
                group.cursor = group.cursor.wrapping_add(1);
                let (_, tx) = &group.members[idx];
                let _ = tx.send(message.clone());
            }
        }
        Ok(())
    }

    async fn disconnect(&self) -> PubSubResult<()> {
        let mut hub = self.hub.lock().unwrap();
        hub.producer_disconnects += 1;
        if hub.refuse_disconnects {
            return Err(PubSubError::Connection("disconnect refused".to_string()));
        }
        Ok(())
    }
}

struct MemoryConsumer {
    hub: Arc<Mutex<Hub>>,
    group: String,
    member: Uuid,
    registered: Mutex<Option<String>>,
}

#[async_trait]
impl ConsumerTransport for MemoryConsumer {
    async fn topic_names(&self) -> PubSubResult<Vec<String>> {
        Ok(self.hub.lock().unwrap().topics.keys().cloned().collect())
    }

    async fn run(&self, topic: &str, on_message: MessageCallback) -> PubSubResult<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut hub = self.hub.lock().unwrap();
            let Some(state) = hub.topics.get_mut(topic) else {
                return Err(PubSubError::Connection(format!(
                    "cannot subscribe to unknown topic '{topic}'"
                )));
            };
            state
                .groups
                .entry(self.group.clone())
                .or_default()
                .members
                .push((self.member, tx));
        }
        *self.registered.lock().unwrap() = Some(topic.to_string());

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                on_message(message);
            }
        });
        Ok(())
    }

    async fn disconnect(&self) -> PubSubResult<()> {
        {
            let mut hub = self.hub.lock().unwrap();
            hub.consumer_disconnects += 1;
            if hub.refuse_disconnects {
                return Err(PubSubError::Connection("disconnect refused".to_string()));
            }
        }
        if let Some(topic) = self.registered.lock().unwrap().take() {
            let mut hub = self.hub.lock().unwrap();
            if let Some(state) = hub.topics.get_mut(&topic) {
                if let Some(group) = state.groups.get_mut(&self.group) {
                    group.members.retain(|(member, _)| *member != self.member);
                }
            }
        }
        Ok(())
    }
}
