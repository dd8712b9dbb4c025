//! Envelope codec
//!
//! Turns inbound WebSocket text frames into typed envelopes and serializes
//! outbound history entries. Stateless; every function is pure.
//!
//! Inbound frames must be JSON objects. A required field that is missing or
//! not a string is reported as [`EnvelopeError::Malformed`], never replaced by
//! a default. The only exception is the optional `time` field of a chat frame,
//! which becomes an empty string when absent or `null`.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::ChatMessage;

use super::dto::websocket::{
    ChatEnvelope, GET_HISTORY_COMMAND, HistoryEntryDto, IdentityEnvelope,
};

/// Codec errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("failed to encode envelope: {0}")]
    Encode(String),
}

/// A classified inbound frame received while a session is active
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// The literal `GET_HISTORY` command
    GetHistory,
    /// A chat message
    Chat(ChatEnvelope),
}

#[derive(Deserialize)]
struct RawChatEnvelope {
    #[serde(default)]
    time: Option<String>,
    message: String,
}

fn parse_object(frame: &str) -> Result<Value, EnvelopeError> {
    let value: Value = serde_json::from_str(frame)
        .map_err(|e| EnvelopeError::Malformed(format!("invalid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(EnvelopeError::Malformed(
            "frame is not a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// Decode the identity frame `{"username": "<name>"}`.
pub fn decode_identity(frame: &str) -> Result<IdentityEnvelope, EnvelopeError> {
    let value = parse_object(frame)?;
    serde_json::from_value(value).map_err(|e| EnvelopeError::Malformed(e.to_string()))
}

/// Decode a chat message frame `{"time": "...", "message": "..."}`.
pub fn decode_chat(frame: &str) -> Result<ChatEnvelope, EnvelopeError> {
    let value = parse_object(frame)?;
    let raw: RawChatEnvelope =
        serde_json::from_value(value).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
    Ok(ChatEnvelope {
        time: raw.time.unwrap_or_default(),
        message: raw.message,
    })
}

/// Classify a frame received from an active session.
pub fn decode_inbound(frame: &str) -> Result<InboundFrame, EnvelopeError> {
    if frame.trim() == GET_HISTORY_COMMAND {
        return Ok(InboundFrame::GetHistory);
    }
    decode_chat(frame).map(InboundFrame::Chat)
}

/// Serialize one message as `{"timestamp","username","message"}`.
pub fn encode_history_entry(message: &ChatMessage) -> Result<String, EnvelopeError> {
    serde_json::to_string(&HistoryEntryDto::from(message))
        .map_err(|e| EnvelopeError::Encode(e.to_string()))
}
