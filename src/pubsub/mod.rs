//! The `pubsub` module is the orchestrator tying the crate together.
//!
//! [`PubSub`] exposes the publish/subscribe/unsubscribe/close contract,
//! routing outbound calls through the codec into the connection manager and
//! inbound broker messages through the codec into the fan-out registry.

pub mod engine;

pub use engine::{KeyFun, PubSub};

#[cfg(test)]
mod tests;
