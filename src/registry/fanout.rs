use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::codec::Payload;
use crate::registry::subscription::{Listener, Subscription, SubscriptionId};
use crate::utils::{PubSubError, PubSubResult};

/// In-process fan-out bus mapping channel names to their listeners.
///
/// The registry owns every subscription: `subscribe` stores the listener
/// against its channel and indexes it by id, `unsubscribe` removes both
/// entries, and `dispatch` invokes the channel's listeners in registration
/// order. Dispatch runs on the consume-loop task while subscribe/unsubscribe
/// run on caller tasks, so all state sits behind a mutex.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    next_id: AtomicU64,
    inner: Mutex<Inner>,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct Inner {
    by_id: HashMap<SubscriptionId, String>,
    channels: HashMap<String, Vec<Subscription>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Registers `listener` on `channel` and returns its subscription id.
    pub fn subscribe(&self, channel: &str, listener: Listener) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.lock().unwrap();
        inner.by_id.insert(id, channel.to_string());
        inner
            .channels
            .entry(channel.to_string())
            .or_default()
            .push(Subscription {
                id,
                channel: channel.to_string(),
                listener,
            });
        id
    }

    /// Removes the subscription with the given id.
    ///
    /// An unknown id is a contract violation and is reported to the caller;
    /// other subscriptions are unaffected either way.
    pub fn unsubscribe(&self, id: SubscriptionId) -> PubSubResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let channel = inner
            .by_id
            .remove(&id)
            .ok_or(PubSubError::UnknownSubscription { id })?;
        if let Some(subscriptions) = inner.channels.get_mut(&channel) {
            subscriptions.retain(|s| s.id != id);
            if subscriptions.is_empty() {
                inner.channels.remove(&channel);
            }
        }
        Ok(())
    }

    /// Whether any listener is currently registered for `channel`.
    ///
    /// Lets the caller skip payload decoding when nobody would receive it.
    pub fn has_listeners(&self, channel: &str) -> bool {
        self.inner.lock().unwrap().channels.contains_key(channel)
    }

    /// Invokes every listener registered for `channel`, in registration
    /// order. Each listener is decoupled from the others: one panicking does
    /// not keep the rest from running.
    pub fn dispatch(&self, channel: &str, payload: Payload) {
        let listeners: Vec<(SubscriptionId, Listener)> = {
            let inner = self.inner.lock().unwrap();
            inner
                .channels
                .get(channel)
                .map(|subs| subs.iter().map(|s| (s.id, s.listener.clone())).collect())
                .unwrap_or_default()
        };

        for (id, listener) in listeners {
            let payload = payload.clone();
            if catch_unwind(AssertUnwindSafe(|| listener(payload))).is_err() {
                tracing::warn!(subscription = id, channel, "listener panicked during dispatch");
            }
        }
    }

    /// Number of live subscriptions across all channels.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
