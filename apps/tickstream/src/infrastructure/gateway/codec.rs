//! Gateway Stream Codec
//!
//! Decodes JSON text frames from the quote gateway into [`GatewayMessage`]s
//! and encodes outbound control frames.
//!
//! The gateway may send a single object or an array of objects per frame;
//! both forms are accepted. A frame that fails to decode is a
//! [`CodecError`]: the caller logs it and drops the frame. A malformed
//! message never takes the connection down.

use super::messages::{ControlMessage, ErrorMessage, GatewayMessage, TickMessage};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame has a `type` the codec does not know.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Frame is structurally not a gateway message.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the gateway stream.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a text frame into gateway messages.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON parsing fails, the `type` discriminator is
    /// missing or unknown, or the payload does not match the frame shape.
    pub fn decode(&self, text: &str) -> Result<Vec<GatewayMessage>, CodecError> {
        let trimmed = text.trim();

        if trimmed.starts_with('[') {
            let values: Vec<serde_json::Value> = serde_json::from_str(trimmed)?;
            values.into_iter().map(Self::decode_value).collect()
        } else if trimmed.starts_with('{') {
            let value: serde_json::Value = serde_json::from_str(trimmed)?;
            Ok(vec![Self::decode_value(value)?])
        } else {
            Err(CodecError::InvalidFormat(format!(
                "expected JSON object or array, got: {}",
                &trimmed[..trimmed.len().min(50)]
            )))
        }
    }

    /// Encode a value to a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode_value(value: serde_json::Value) -> Result<GatewayMessage, CodecError> {
        let msg_type = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CodecError::InvalidFormat("missing type field".to_string()))?;

        match msg_type {
            "tick" => {
                let m: TickMessage = serde_json::from_value(value)?;
                Ok(GatewayMessage::Tick(m))
            }
            "subscribe" | "unsubscribe" | "ping" | "pong" => {
                let m: ControlMessage = serde_json::from_value(value)?;
                Ok(GatewayMessage::Control(m))
            }
            "error" => {
                let m: ErrorMessage = serde_json::from_value(value)?;
                Ok(GatewayMessage::Error(m))
            }
            other => Err(CodecError::UnknownMessageType(other.to_string())),
        }
    }
}
