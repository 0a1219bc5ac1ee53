//! The `connection` module manages the engine's two broker connections.
//!
//! Both directions are lazy: nothing connects until the first publish or
//! subscribe needs it, and each direction connects at most once per engine
//! instance regardless of caller concurrency. Readiness includes a metadata
//! check that the configured topic actually exists on the broker.

pub mod manager;

pub use manager::ConnectionManager;
