//! Server state and connection management.

use std::{sync::Arc, time::Duration};

use tokio::sync::{mpsc, watch};

use crate::usecase::{
    ConnectSessionUseCase, DisconnectSessionUseCase, GetHistoryUseCase, GetSessionsUseCase,
    IdentifySessionUseCase, SendMessageUseCase,
};

/// Shared application state
pub struct AppState {
    /// ConnectSessionUseCase（セッション接続のユースケース）
    pub connect_session_usecase: Arc<ConnectSessionUseCase>,
    /// IdentifySessionUseCase（username 確定のユースケース）
    pub identify_session_usecase: Arc<IdentifySessionUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// GetHistoryUseCase（履歴取得のユースケース）
    pub get_history_usecase: Arc<GetHistoryUseCase>,
    /// DisconnectSessionUseCase（セッション切断のユースケース）
    pub disconnect_session_usecase: Arc<DisconnectSessionUseCase>,
    /// GetSessionsUseCase（接続状況取得のユースケース）
    pub get_sessions_usecase: Arc<GetSessionsUseCase>,
    /// 接続後、username を受け取るまでの待ち時間
    pub identity_timeout: Duration,
    /// セッションごとの送信キューの長さ
    pub outbound_queue_capacity: usize,
    /// シャットダウン通知（`true` になったら全セッションを閉じる）
    pub shutdown: watch::Receiver<bool>,
    /// 全ての AppState が drop されると受信側が `None` を受け取る
    ///
    /// セッションのタスクは AppState を保持しているので、シャットダウン時に
    /// 全セッションの終了を待つために使う。
    pub shutdown_complete: mpsc::Sender<()>,
}
