use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The physical unit exchanged with the broker.
///
/// A wire message carries an optional partition key, the message body, an
/// optional header map, and the publish timestamp in milliseconds. The codec
/// produces one of two canonical shapes from a `(channel, payload)` pair
/// depending on the configured mode (see the module docs).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireMessage {
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub headers: Option<HashMap<String, Vec<u8>>>,
    pub timestamp: i64,
}

/// What a listener receives when a message is dispatched to its channel.
///
/// The shape depends on the wire mode, and the asymmetry is deliberate:
///
/// - Envelope mode delivers the parsed `payload` field as [`Payload::Json`].
/// - Header mode delivers the untouched message body as [`Payload::Raw`] —
///   the producer did not wrap the payload structurally, so the consumer does
///   not parse it either. Channel routing stays cheap and deserialization, if
///   wanted, is the listener's own business.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Raw(Vec<u8>),
}
