//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `muxsub` crate.
//!
//! This module centralizes the error taxonomy shared by every component and
//! the tracing/logging initialization used by the binary and tests.

pub mod error;
pub mod logging;

pub use error::{PubSubError, PubSubResult};
