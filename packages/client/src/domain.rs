//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use irori_server::{
    infrastructure::dto::websocket::{
        ChatEnvelope, GET_HISTORY_COMMAND, HistoryEntryDto, IdentityEnvelope,
    },
    ui::close_code,
};

use crate::error::ClientError;

/// A line typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// `/quit`: leave the chat
    Quit,
    /// `/history`: ask the server to resend the history
    History,
    /// Anything else is sent as a chat message
    Message(String),
}

/// Interpret one input line. Blank lines yield `None`.
pub fn parse_input(line: &str) -> Option<UserInput> {
    let line = line.trim();
    match line {
        "" => None,
        "/quit" | "/exit" => Some(UserInput::Quit),
        "/history" => Some(UserInput::History),
        _ => Some(UserInput::Message(line.to_string())),
    }
}

/// Text of the frame to send for a user input, `None` for `/quit`.
pub fn outgoing_frame(
    input: &UserInput,
    sent_at_rfc3339: &str,
) -> Result<Option<String>, ClientError> {
    match input {
        UserInput::Quit => Ok(None),
        UserInput::History => Ok(Some(GET_HISTORY_COMMAND.to_string())),
        UserInput::Message(message) => {
            let envelope = ChatEnvelope {
                time: sent_at_rfc3339.to_string(),
                message: message.clone(),
            };
            serde_json::to_string(&envelope)
                .map(Some)
                .map_err(|e| ClientError::Encode(e.to_string()))
        }
    }
}

/// The identity frame `{"username": "<name>"}`
pub fn identity_frame(username: &str) -> Result<String, ClientError> {
    serde_json::to_string(&IdentityEnvelope {
        username: username.to_string(),
    })
    .map_err(|e| ClientError::Encode(e.to_string()))
}

/// A text frame received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    /// One entry of the history snapshot
    History(HistoryEntryDto),
    /// A live message from another user (raw text)
    Chat(String),
}

/// Classify a text frame: history entries are JSON objects, live messages are raw text.
pub fn classify_frame(text: &str) -> ServerFrame {
    match serde_json::from_str::<HistoryEntryDto>(text) {
        Ok(entry) => ServerFrame::History(entry),
        Err(_) => ServerFrame::Chat(text.to_string()),
    }
}

/// Map a close frame from the server to an error.
pub fn close_to_error(code: u16, reason: &str, username: &str) -> ClientError {
    match code {
        close_code::DUPLICATE_USERNAME => ClientError::DuplicateUsername(username.to_string()),
        close_code::MALFORMED_IDENTITY => ClientError::InvalidUsername(username.to_string()),
        _ => ClientError::Closed {
            code,
            reason: reason.to_string(),
        },
    }
}

/// Check if the client should exit immediately based on the error type.
///
/// # Arguments
///
/// * `error` - The client error to check
///
/// # Returns
///
/// `true` if the error requires immediate exit (retrying with the same
/// username cannot succeed), `false` otherwise
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::DuplicateUsername(_)
            | ClientError::InvalidUsername(_)
            | ClientError::Encode(_)
    )
}

/// 接続失敗後の試行回数
///
/// identity フレームの送信まで進んだ接続が切れた場合は数え直す。
pub fn next_attempt_count(current_attempt: u32, established: bool) -> u32 {
    if established { 1 } else { current_attempt + 1 }
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
///
/// # Returns
///
/// `true` if reconnection should be attempted, `false` otherwise
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    // Don't reconnect if the error requires immediate exit
    if should_exit_immediately(error) {
        return false;
    }

    // Don't reconnect if we've exhausted all attempts
    current_attempt < max_attempts
}
