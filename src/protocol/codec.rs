//! Text-frame codec for envelopes.

use crate::error::Result;

use super::{InboundEnvelope, OutboundEnvelope};

/// Serializes an outbound envelope into a text frame.
///
/// # Errors
///
/// Returns [`crate::Error::Json`] if the body cannot be serialized.
#[inline]
pub fn encode(envelope: &OutboundEnvelope) -> Result<String> {
    Ok(serde_json::to_string(envelope)?)
}

/// Parses a text frame into an inbound envelope.
///
/// # Errors
///
/// Returns [`crate::Error::Json`] if the frame is not a JSON object with
/// the expected field types.
#[inline]
pub fn decode(text: &str) -> Result<InboundEnvelope> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::protocol::Route;

    #[test]
    fn test_encode_register() {
        let envelope =
            OutboundEnvelope::register("a.b", crate::identifiers::TrackId::from_raw("t-1"));
        let text = encode(&envelope).expect("encode");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(
            value,
            json!({"type": "register", "address": "a.b", "trackId": "t-1"})
        );
    }

    #[test]
    fn test_decode_done() {
        let envelope = decode(r#"{"type":"done"}"#).expect("decode");
        assert_eq!(envelope.route(), Route::Done);
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let envelope = decode(r#"{"trackId":"t-1","extra":[1,2,3]}"#).expect("decode");
        assert!(matches!(envelope.route(), Route::TrackAck { .. }));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not json").is_err());
        assert!(decode("[1, 2]").is_err());
        assert!(decode(r#"{"err": "yes"}"#).is_err());
    }
}
