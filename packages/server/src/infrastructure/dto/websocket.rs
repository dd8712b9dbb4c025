//! WebSocket envelope DTOs.

use serde::{Deserialize, Serialize};

/// Literal command that asks the server to resend the history snapshot.
pub const GET_HISTORY_COMMAND: &str = "GET_HISTORY";

/// First frame sent by a client: `{"username": "<name>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEnvelope {
    pub username: String,
}

/// Chat frame sent by a client: `{"time": "<rfc3339>", "message": "<text>"}`
///
/// `time` is optional on the wire and becomes an empty string when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEnvelope {
    pub time: String,
    pub message: String,
}

/// One history entry sent by the server: `{"timestamp", "username", "message"}`
///
/// Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntryDto {
    pub timestamp: String,
    pub username: String,
    pub message: String,
}
