//! Session: 接続ごとの状態機械
//!
//! ```text
//! AwaitingUsername ──(username 受信)──> Active ──(切断/エラー)──> Closed
//!        │                                                      ▲
//!        └──────────(タイムアウト/不正な envelope/重複)──────────┘
//! ```
//!
//! Session は接続を処理するタスクが排他的に所有します。Registry は
//! 列挙と削除のための記録（`SessionRecord`）だけを保持します。

use std::net::SocketAddr;

use super::{
    error::SessionStateError,
    value_object::{SessionId, Timestamp, Username},
};

/// セッションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 接続直後。最初のフレームで username を待っている
    AwaitingUsername,
    /// username が確定し、チャットメッセージを送受信できる
    Active,
    /// 終了状態
    Closed,
}

/// セッションが Closed に遷移した理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// クライアントが接続を閉じた（end-of-stream / close フレーム）
    PeerClosed,
    /// 読み込み中の回復不能なトランスポートエラー
    TransportError,
    /// username の待ち時間が経過した
    IdentityTimeout,
    /// 最初のフレームが不正、または username を含まない
    MalformedIdentity,
    /// 同じ username のアクティブなセッションが存在した
    DuplicateUsername,
    /// サーバーの停止
    ServerShutdown,
    /// 送信タスクがソケットへの書き込みに失敗した
    WriterFailed,
    /// 送信キューが溢れた（クライアントの読み込みが追いついていない）
    SlowConsumer,
}

impl CloseReason {
    pub fn description(&self) -> &'static str {
        match self {
            Self::PeerClosed => "peer closed the connection",
            Self::TransportError => "transport error",
            Self::IdentityTimeout => "timed out waiting for username",
            Self::MalformedIdentity => "malformed identity envelope",
            Self::DuplicateUsername => "username is already in use",
            Self::ServerShutdown => "server is shutting down",
            Self::WriterFailed => "failed to write to peer",
            Self::SlowConsumer => "client is not reading fast enough",
        }
    }
}

/// 1 接続分のセッション
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    peer_addr: SocketAddr,
    connected_at: Timestamp,
    username: Option<Username>,
    state: SessionState,
    close_reason: Option<CloseReason>,
}

impl Session {
    /// AwaitingUsername 状態のセッションを作成
    pub fn new(id: SessionId, peer_addr: SocketAddr, connected_at: Timestamp) -> Self {
        Self {
            id,
            peer_addr,
            connected_at,
            username: None,
            state: SessionState::AwaitingUsername,
            close_reason: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn connected_at(&self) -> Timestamp {
        self.connected_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn username(&self) -> Option<&Username> {
        self.username.as_ref()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// username を確定し Active に遷移する
    ///
    /// username の確定は AwaitingUsername からの 1 回のみ。
    pub fn activate(&mut self, username: Username) -> Result<(), SessionStateError> {
        match self.state {
            SessionState::AwaitingUsername => {
                self.username = Some(username);
                self.state = SessionState::Active;
                Ok(())
            }
            SessionState::Active => Err(SessionStateError::AlreadyActive),
            SessionState::Closed => Err(SessionStateError::Closed),
        }
    }

    /// Closed に遷移する
    ///
    /// 既に Closed の場合は何もせず `false` を返す。最初の理由だけが記録される。
    pub fn close(&mut self, reason: CloseReason) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        self.state = SessionState::Closed;
        self.close_reason = Some(reason);
        true
    }

    /// Active であれば確定済みの username を返す
    pub fn active_username(&self) -> Result<&Username, SessionStateError> {
        match (self.state, self.username.as_ref()) {
            (SessionState::Active, Some(username)) => Ok(username),
            (SessionState::Closed, _) => Err(SessionStateError::Closed),
            _ => Err(SessionStateError::NotActive),
        }
    }
}
