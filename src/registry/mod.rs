//! The `registry` module is the in-process fan-out bus.
//!
//! It maps each channel name to an ordered list of listeners and keeps an
//! id-indexed view of the same subscriptions for unsubscription. The engine
//! feeds decoded inbound messages into [`SubscriptionRegistry::dispatch`]
//! from the consume loop.

pub mod fanout;
pub mod subscription;

pub use fanout::SubscriptionRegistry;
pub use subscription::{Listener, Subscription, SubscriptionId};
