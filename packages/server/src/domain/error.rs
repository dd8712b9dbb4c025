//! ドメイン層のエラー型

use thiserror::Error;

/// 値オブジェクトの検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("username must not be empty")]
    EmptyUsername,

    #[error("username is too long ({actual} characters, max {max})")]
    UsernameTooLong { max: usize, actual: usize },

    #[error("username must not contain control characters")]
    UsernameContainsControlCharacter,

    #[error("message is too long ({actual} characters, max {max})")]
    MessageTooLong { max: usize, actual: usize },
}

/// セッション状態遷移のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionStateError {
    #[error("username is already bound to this session")]
    AlreadyActive,

    #[error("session is closed")]
    Closed,

    #[error("session has not bound a username yet")]
    NotActive,
}

/// Session Registry のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// 接続数が上限に達している
    #[error("registry is full ({max} sessions)")]
    CapacityExceeded { max: usize },

    /// 同じユーザー名のアクティブなセッションが既に存在する
    #[error("username '{0}' is already in use")]
    DuplicateUsername(String),

    #[error("session '{0}' is not registered")]
    SessionNotFound(String),
}

/// Repository（永続化層）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("storage task failed: {0}")]
    Task(String),

    #[error("invalid stored row: {0}")]
    InvalidRow(String),
}

/// メッセージ送信（通知）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),

    /// 受信側の読み込みが追いつかず、送信キューが満杯
    #[error("outbound queue is full")]
    QueueFull,

    /// 前回の履歴スナップショットがまだ送信キューに残っている
    #[error("a history snapshot is already queued")]
    SnapshotPending,
}
