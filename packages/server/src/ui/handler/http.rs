//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    infrastructure::dto::{http::SessionsDto, websocket::HistoryEntryDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get connected sessions
pub async fn get_sessions(State(state): State<Arc<AppState>>) -> Json<SessionsDto> {
    let status = state.get_sessions_usecase.execute();

    // Domain Model から DTO への変換
    Json(SessionsDto {
        active: status.registered,
        capacity: status.capacity,
        usernames: status
            .usernames
            .into_iter()
            .map(|username| username.into_string())
            .collect(),
    })
}

/// Get the persisted chat history, oldest first
pub async fn get_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HistoryEntryDto>>, StatusCode> {
    match state.get_history_usecase.snapshot().await {
        Ok(history) => Ok(Json(history.iter().map(HistoryEntryDto::from).collect())),
        Err(e) => {
            tracing::error!("Failed to fetch history: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
