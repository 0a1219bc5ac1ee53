//! The `broker` module is the boundary to the external message broker.
//!
//! The broker client itself is a collaborator, not part of this crate's
//! core: it is specified here as a set of async traits covering exactly what
//! the multiplexing layer needs (connect-until-ready, metadata listing,
//! produce-with-ack, a continuous consume loop, disconnect).
//!
//! [`MemoryBroker`] is an in-process implementation of those traits, used by
//! the demo binary and throughout the test suite.

pub mod client;
pub mod memory;

pub use client::{
    BrokerClient, ConnectionConfig, ConsumerTransport, MessageCallback, ProducerTransport,
};
pub use memory::MemoryBroker;
