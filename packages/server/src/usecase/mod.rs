//! UseCase 層
//!
//! セッションのライフサイクル（接続、username の確定、メッセージ送信、
//! 履歴の再送、切断）と、HTTP API 向けの状態取得を提供します。
//! UseCase はドメイン層の trait にのみ依存し、具体的な実装は `bin/server.rs` で注入されます。

pub mod connect_session;
pub mod disconnect_session;
pub mod error;
pub mod get_history;
pub mod get_sessions;
pub mod identify_session;
pub mod send_message;
pub mod sequencer;

pub use connect_session::ConnectSessionUseCase;
pub use disconnect_session::DisconnectSessionUseCase;
pub use error::{ConnectError, HistoryError, IdentifyError, SendMessageError};
pub use get_history::GetHistoryUseCase;
pub use get_sessions::{GetSessionsUseCase, SessionsStatus};
pub use identify_session::{IdentifiedSession, IdentifySessionUseCase};
pub use send_message::{SendMessageOutcome, SendMessageUseCase};
pub use sequencer::BroadcastSequencer;
