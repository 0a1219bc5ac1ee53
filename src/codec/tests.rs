use serde_json::json;

use super::{CHANNEL_HEADER, Payload, WireMessage, decode_channel, decode_payload, encode};

#[test]
fn test_envelope_round_trip() {
    let payload = json!({"id": 42, "status": "open"});
    let msg = encode("orders", &payload, false).unwrap();

    assert!(msg.headers.is_none());
    assert_eq!(decode_channel(&msg, false, "events").unwrap(), "orders");
    assert_eq!(
        decode_payload(&msg, false).unwrap(),
        Payload::Json(payload)
    );
}

#[test]
fn test_header_round_trip() {
    let payload = json!({"id": 42});
    let msg = encode("orders", &payload, true).unwrap();

    let headers = msg.headers.as_ref().unwrap();
    assert_eq!(headers.get(CHANNEL_HEADER).unwrap(), b"orders");
    assert_eq!(decode_channel(&msg, true, "events").unwrap(), "orders");

    // Header mode hands back the raw body, which is the payload alone.
    let Payload::Raw(raw) = decode_payload(&msg, true).unwrap() else {
        panic!("expected raw payload in header mode");
    };
    let parsed: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(parsed, payload);
}

#[test]
fn test_header_mode_body_is_not_wrapped() {
    let msg = encode("orders", &json!("plain"), true).unwrap();
    let body: serde_json::Value = serde_json::from_slice(&msg.value).unwrap();
    assert_eq!(body, json!("plain"));
}

#[test]
fn test_envelope_without_channel_falls_back_to_topic() {
    let foreign = json!({"id": 7});
    let msg = WireMessage {
        key: None,
        value: serde_json::to_vec(&foreign).unwrap(),
        headers: None,
        timestamp: 0,
    };

    assert_eq!(decode_channel(&msg, false, "events").unwrap(), "events");
    // A foreign message is delivered whole, not unwrapped.
    assert_eq!(decode_payload(&msg, false).unwrap(), Payload::Json(foreign));
}

#[test]
fn test_envelope_without_payload_field_decodes_to_null() {
    let msg = WireMessage {
        key: None,
        value: serde_json::to_vec(&json!({"channel": "orders"})).unwrap(),
        headers: None,
        timestamp: 0,
    };
    assert_eq!(
        decode_payload(&msg, false).unwrap(),
        Payload::Json(serde_json::Value::Null)
    );
}

#[test]
fn test_malformed_envelope_is_a_decode_error() {
    let msg = WireMessage {
        key: None,
        value: b"not json".to_vec(),
        headers: None,
        timestamp: 0,
    };
    assert!(decode_channel(&msg, false, "events").is_err());
    assert!(decode_payload(&msg, false).is_err());
}

#[test]
fn test_header_mode_without_channel_header_is_a_decode_error() {
    let msg = WireMessage {
        key: None,
        value: b"{}".to_vec(),
        headers: None,
        timestamp: 0,
    };
    assert!(decode_channel(&msg, true, "events").is_err());
}
