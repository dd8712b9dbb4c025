//! Message formatting utilities for client display.

use irori_server::infrastructure::dto::websocket::HistoryEntryDto;
use irori_shared::time::timestamp_to_jst_rfc3339;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the banner shown after connecting
    pub fn format_welcome(username: &str) -> String {
        format!(
            "\nYou are '{}'. Type messages and press Enter to send.\n\
             Commands: /history to reload the history, /quit to exit.\n\n",
            username
        )
    }

    /// Format one history entry
    ///
    /// # Arguments
    ///
    /// * `entry` - The history entry received from the server
    /// * `current_username` - The current user's name (to mark as "me")
    pub fn format_history_entry(entry: &HistoryEntryDto, current_username: &str) -> String {
        let me_suffix = if entry.username == current_username {
            " (me)"
        } else {
            ""
        };
        format!(
            "\n[{}] @{}{}: {}\n",
            entry.timestamp, entry.username, me_suffix, entry.message
        )
    }

    /// Format a live chat message
    ///
    /// The server relays the raw message text only, so the receive time is shown.
    ///
    /// # Arguments
    ///
    /// * `content` - The message content
    /// * `received_at` - Unix timestamp when the message was received (milliseconds)
    pub fn format_chat_message(content: &str, received_at: i64) -> String {
        let timestamp_str = timestamp_to_jst_rfc3339(received_at);
        format!(
            "\n\n------------------------------------------------------------\n\
             {}\n\
             received at {}\n\
             ------------------------------------------------------------\n",
            content, timestamp_str
        )
    }

    /// Format a confirmation message after sending
    ///
    /// # Arguments
    ///
    /// * `sent_at` - Unix timestamp when the message was sent (milliseconds)
    pub fn format_sent_confirmation(sent_at: i64) -> String {
        let timestamp_str = timestamp_to_jst_rfc3339(sent_at);
        format!("sent at {}\n", timestamp_str)
    }

    /// Format a binary message notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n← Received {} bytes of binary data\n", byte_count)
    }
}
