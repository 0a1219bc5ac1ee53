use thiserror::Error;

use crate::registry::SubscriptionId;

/// Errors surfaced by the engine, the connection layer, and the codec.
///
/// The enum is `Clone` because a failed connection attempt is memoized: every
/// later caller of the same direction receives the same stored error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PubSubError {
    /// The broker was unreachable or the connect sequence failed.
    #[error("broker connection failed: {0}")]
    Connection(String),

    /// The configured topic is absent from the broker metadata.
    #[error("topic '{topic}' not found in broker metadata")]
    TopicNotFound { topic: String },

    /// The broker rejected or failed to acknowledge a send.
    #[error("publish failed: {0}")]
    Publish(String),

    /// A single inbound message could not be decoded. Always local to that
    /// message; the consume loop keeps running.
    #[error("could not decode inbound message: {0}")]
    Decode(String),

    /// `unsubscribe` was called with an id the registry does not know.
    #[error("no subscription with id {id}")]
    UnknownSubscription { id: SubscriptionId },

    /// One or both disconnects failed during `close()`. Both sides are
    /// always attempted; this collects whatever went wrong.
    #[error("close failed on {} connection(s)", .0.len())]
    Close(Vec<PubSubError>),

    /// The engine was used after `close()`. Connections are never reopened.
    #[error("engine is closed")]
    EngineClosed,
}

pub type PubSubResult<T> = std::result::Result<T, PubSubError>;
