//! UseCase 層のエラー定義

use thiserror::Error;

use crate::{
    domain::{MessagePushError, RepositoryError, SessionStateError, ValueObjectError},
    infrastructure::codec::EnvelopeError,
};

/// 接続時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("session capacity exceeded (max {max})")]
    CapacityExceeded { max: usize },
}

/// username 確定時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifyError {
    #[error(transparent)]
    Malformed(#[from] EnvelopeError),

    #[error("invalid username: {0}")]
    InvalidUsername(#[from] ValueObjectError),

    #[error("username '{0}' is already in use")]
    DuplicateUsername(String),

    #[error("invalid session state: {0}")]
    InvalidState(#[from] SessionStateError),

    #[error("session is not registered")]
    SessionNotFound,
}

/// メッセージ送信時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("session is not active: {0}")]
    NotActive(#[from] SessionStateError),

    #[error("invalid message content: {0}")]
    InvalidContent(#[from] ValueObjectError),
}

/// 履歴取得時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("failed to fetch history: {0}")]
    Repository(#[from] RepositoryError),

    #[error("failed to push history: {0}")]
    Push(#[from] MessagePushError),
}
