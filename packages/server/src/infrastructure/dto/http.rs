//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// Response body of `GET /api/sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionsDto {
    /// Number of registered sessions (including ones still awaiting a username)
    pub active: usize,
    /// Maximum number of concurrent sessions
    pub capacity: usize,
    /// Usernames of active sessions, sorted
    pub usernames: Vec<String>,
}
