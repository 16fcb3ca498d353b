//! Contract payload preparation.
//!
//! Every message sent to the ledger goes through the same pipeline: the raw
//! JSON tree is sanitized (empty fields removed, see [`sanitize`]) and then
//! encoded for transport (see [`encode`]). [`Message`] holds both forms so that
//! gateways can pick whichever representation their wire format needs.

mod codec;
mod sanitize;

pub use codec::{CodecError, DecodeError, decode, encode, to_sanitized_value};
pub use sanitize::{is_valid, sanitize};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A sanitized contract message ready to be sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    value: Value,
    encoded: String,
}

impl Message {
    /// Sanitize and encode a payload.
    pub fn new<T: Serialize + ?Sized>(payload: &T) -> Result<Self, CodecError> {
        let value = to_sanitized_value(payload)?;
        let encoded = codec::encode_value(&value)?;
        Ok(Self { value, encoded })
    }

    /// The sanitized JSON tree.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The base64 transport encoding of [`Self::value`].
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Whether sanitization left nothing to send.
    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Object(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }
}
