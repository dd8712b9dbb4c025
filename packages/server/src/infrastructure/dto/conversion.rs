//! Conversion logic between DTOs and domain entities.

use crate::domain::ChatMessage;
use crate::infrastructure::dto::websocket as dto;

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&ChatMessage> for dto::HistoryEntryDto {
    fn from(model: &ChatMessage) -> Self {
        Self {
            timestamp: model.timestamp().to_rfc3339(),
            username: model.username().as_str().to_string(),
            message: model.content().as_str().to_string(),
        }
    }
}
