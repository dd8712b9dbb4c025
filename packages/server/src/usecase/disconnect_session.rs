//! UseCase: セッション切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectSessionUseCase::execute() メソッド
//! - Session の Closed への遷移と Registry からの削除
//!
//! ### なぜこのテストが必要か
//! - 複数の終了契機が重なっても削除が 1 回だけ行われることを保証
//! - 最初の終了理由が保持されることを確認

use std::sync::Arc;

use crate::domain::{CloseReason, Session, SessionRegistry};

/// セッション切断のユースケース
pub struct DisconnectSessionUseCase {
    /// Session Registry（接続中セッションの管理）
    registry: Arc<dyn SessionRegistry>,
}

impl DisconnectSessionUseCase {
    /// 新しい DisconnectSessionUseCase を作成
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// セッション切断を実行（冪等）
    ///
    /// # Returns
    ///
    /// このセッションを今回の呼び出しで Closed にした場合は `true`
    pub fn execute(&self, session: &mut Session, reason: CloseReason) -> bool {
        let closed_now = session.close(reason);
        let removed = self.registry.unregister(&session.id());

        if closed_now {
            match session.username() {
                Some(username) => tracing::info!(
                    "Session '{}' ({}) disconnected: {}",
                    session.id(),
                    username,
                    reason.description()
                ),
                None => tracing::info!(
                    "Session '{}' from {} disconnected before identifying: {}",
                    session.id(),
                    session.peer_addr(),
                    reason.description()
                ),
            }
        }
        if removed {
            tracing::debug!(
                "Session '{}' removed from registry ({} remaining)",
                session.id(),
                self.registry.count()
            );
        }

        closed_now
    }
}
