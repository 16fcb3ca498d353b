//! Base64-over-JSON transport encoding for contract payloads.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;
use serde_json::Value;

use super::sanitize::sanitize;

/// Errors produced while encoding or decoding a payload.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The payload could not be serialized to JSON.
    #[error("failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),
    /// The text is not a valid encoded payload.
    #[error("failed to decode payload: {0}")]
    Decode(#[from] DecodeError),
}

/// Reason a payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convert any serializable payload into its sanitized JSON tree.
pub fn to_sanitized_value<T: Serialize + ?Sized>(payload: &T) -> Result<Value, CodecError> {
    let value = serde_json::to_value(payload).map_err(CodecError::Encode)?;
    Ok(sanitize(&value))
}

/// Encode a payload: sanitize it, serialize it to JSON, then base64 the bytes.
pub fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<String, CodecError> {
    let value = to_sanitized_value(payload)?;
    encode_value(&value)
}

/// Encode an already sanitized tree without sanitizing it again.
pub(crate) fn encode_value(value: &Value) -> Result<String, CodecError> {
    let bytes = serde_json::to_vec(value).map_err(CodecError::Encode)?;
    Ok(STANDARD.encode(bytes))
}

/// Decode text produced by [`encode`] back into a JSON tree.
pub fn decode(text: &str) -> Result<Value, CodecError> {
    let bytes = STANDARD.decode(text.trim()).map_err(DecodeError::from)?;
    let value = serde_json::from_slice(&bytes).map_err(DecodeError::from)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serializer;
    use serde_json::json;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("circular reference"))
        }
    }

    #[derive(Serialize)]
    struct WithFloat {
        rate: f64,
        label: &'static str,
    }

    #[test]
    fn test_round_trip_equals_sanitized_input() {
        let raw = json!({
            "reward_token": "juno1reward",
            "lock_period": 0,
            "vesting": null,
            "whitelist": { "root": "", "enabled": false },
            "balances": [{ "address": "X", "amount": "100" }]
        });

        let encoded = encode(&raw).expect("encode");
        assert_eq!(decode(&encoded).expect("decode"), sanitize(&raw));
    }

    #[test]
    fn test_encode_known_value() {
        let encoded = encode(&json!({ "set_worker": { "worker": "w" } })).expect("encode");
        assert_eq!(encoded, STANDARD.encode(r#"{"set_worker":{"worker":"w"}}"#));
    }

    #[test]
    fn test_encode_failure_is_an_error() {
        let result = encode(&Unserializable);
        assert!(matches!(result, Err(CodecError::Encode(_))));
    }

    #[test]
    fn test_non_finite_numbers_are_dropped() {
        let encoded = encode(&WithFloat {
            rate: f64::NAN,
            label: "x",
        })
        .expect("encode");

        assert_eq!(decode(&encoded).expect("decode"), json!({ "label": "x" }));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let result = decode("not base64!!");
        assert!(matches!(
            result,
            Err(CodecError::Decode(DecodeError::Base64(_)))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_json() {
        let text = STANDARD.encode("{ not json");
        assert!(matches!(
            decode(&text),
            Err(CodecError::Decode(DecodeError::Json(_)))
        ));
    }
}
