//! The `codec` module converts a `(channel, payload)` pair to and from a
//! physical [`WireMessage`] in one of two modes, chosen once per engine
//! instance and used symmetrically by the producing and consuming sides:
//!
//! - **Header mode**: the body is the serialized payload alone, and a single
//!   header entry under the literal key `"channel"` carries the UTF-8 channel
//!   name. The channel is readable without touching the body.
//! - **Envelope mode** (the default): the body is the JSON object
//!   `{"channel": .., "payload": ..}` and headers go unused.
//!
//! Decoding is split into [`decode_channel`] and [`decode_payload`] because
//! the channel can be cheap to extract on its own: the engine looks up
//! listeners first and skips payload work entirely when nobody is subscribed.
//!
//! A producer and consumer configured with different modes will not
//! understand each other; that misconfiguration is a user error this layer
//! does not detect.

mod wire;

use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;

use crate::utils::{PubSubError, PubSubResult};

pub use wire::{Payload, WireMessage};

/// Header key carrying the channel name in header mode.
pub const CHANNEL_HEADER: &str = "channel";

/// Encodes a channel and payload into a wire message using the given mode.
///
/// The partition key is left unset; the engine fills it in afterwards when a
/// key derivation function is configured.
pub fn encode(channel: &str, payload: &Value, use_headers: bool) -> PubSubResult<WireMessage> {
    let timestamp = Utc::now().timestamp_millis();

    if use_headers {
        let value =
            serde_json::to_vec(payload).map_err(|e| PubSubError::Publish(e.to_string()))?;
        let mut headers = HashMap::new();
        headers.insert(CHANNEL_HEADER.to_string(), channel.as_bytes().to_vec());
        Ok(WireMessage {
            key: None,
            value,
            headers: Some(headers),
            timestamp,
        })
    } else {
        let envelope = serde_json::json!({ "channel": channel, "payload": payload });
        let value =
            serde_json::to_vec(&envelope).map_err(|e| PubSubError::Publish(e.to_string()))?;
        Ok(WireMessage {
            key: None,
            value,
            headers: None,
            timestamp,
        })
    }
}

/// Extracts the channel a wire message is addressed to.
///
/// Header mode reads the `"channel"` header without deserializing the body; a
/// message without that header cannot be routed and is a decode failure.
/// Envelope mode parses the body; an envelope without a `"channel"` field is
/// treated as addressed to `fallback_topic` (the configured topic name), so
/// that messages from producers unaware of this abstraction still land
/// somewhere deterministic.
pub fn decode_channel(
    message: &WireMessage,
    use_headers: bool,
    fallback_topic: &str,
) -> PubSubResult<String> {
    if use_headers {
        let raw = message
            .headers
            .as_ref()
            .and_then(|h| h.get(CHANNEL_HEADER))
            .ok_or_else(|| PubSubError::Decode("missing 'channel' header".to_string()))?;
        String::from_utf8(raw.clone())
            .map_err(|e| PubSubError::Decode(format!("channel header is not UTF-8: {e}")))
    } else {
        let envelope: Value = serde_json::from_slice(&message.value)
            .map_err(|e| PubSubError::Decode(format!("malformed envelope: {e}")))?;
        match envelope.get(CHANNEL_HEADER).and_then(Value::as_str) {
            Some(channel) => Ok(channel.to_string()),
            None => Ok(fallback_topic.to_string()),
        }
    }
}

/// Extracts the payload to hand to listeners.
///
/// Header mode returns the raw body bytes untouched. Envelope mode parses the
/// body and returns the `"payload"` field; an envelope that carries no
/// `"channel"` field (a foreign producer) is delivered whole, and a proper
/// envelope without a `"payload"` field decodes to JSON null.
pub fn decode_payload(message: &WireMessage, use_headers: bool) -> PubSubResult<Payload> {
    if use_headers {
        return Ok(Payload::Raw(message.value.clone()));
    }

    let mut envelope: Value = serde_json::from_slice(&message.value)
        .map_err(|e| PubSubError::Decode(format!("malformed envelope: {e}")))?;
    if envelope.get(CHANNEL_HEADER).is_none() {
        return Ok(Payload::Json(envelope));
    }
    let payload = envelope
        .get_mut("payload")
        .map(Value::take)
        .unwrap_or(Value::Null);
    Ok(Payload::Json(payload))
}

#[cfg(test)]
mod tests;
