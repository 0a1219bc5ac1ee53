//! # muxsub
//!
//! `muxsub` multiplexes an arbitrary number of logical pub/sub channels onto
//! a single shared broker topic. Callers see a uniform
//! subscribe/publish/unsubscribe contract and never touch the broker
//! directly.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `codec`: encodes and decodes the logical channel onto physical broker messages
//!   in one of two wire modes (header-carried channel vs. JSON envelope).
//! - `broker`: the interface boundary to the external broker client, plus an
//!   in-process reference implementation.
//! - `connection`: lazy, once-per-instance producer and consumer connection lifecycle.
//! - `registry`: the in-process fan-out bus routing inbound messages to local listeners.
//! - `pubsub`: the engine composing the above into the public contract.
//! - `config`: handles loading and managing configuration.
//! - `utils`: contains shared utilities, such as error handling and logging setup.

pub mod broker;
pub mod codec;
pub mod config;
pub mod connection;
pub mod pubsub;
pub mod registry;
pub mod utils;

pub use broker::MemoryBroker;
pub use codec::{Payload, WireMessage};
pub use pubsub::PubSub;
pub use registry::{Listener, SubscriptionId};
pub use utils::{PubSubError, PubSubResult};
