use std::fmt;
use std::sync::Arc;

use crate::codec::Payload;

/// Identifier handed out by `subscribe` and consumed by `unsubscribe`.
///
/// Ids start at 1, only grow, and are never reused within a process lifetime.
pub type SubscriptionId = u64;

/// Callback invoked with the decoded payload of every message dispatched to
/// the subscribed channel.
pub type Listener = Arc<dyn Fn(Payload) + Send + Sync>;

/// One registered listener on one channel.
#[derive(Clone)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub channel: String,
    pub listener: Listener,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
