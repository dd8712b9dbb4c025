//! UseCase: username の確定処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - IdentifySessionUseCase::execute() メソッド
//! - identity フレームの解釈、username の確定、参加時の履歴送信
//!
//! ### なぜこのテストが必要か
//! - アクティブなセッション間で username が重複しないことを保証
//! - 参加直後に履歴が最初のデータとして送られることを確認
//! - 履歴の取得に失敗しても参加は継続できることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：有効な username で参加
//! - 異常系：不正なフレーム、不正な username、username の重複
//! - エッジケース：永続化層の障害

use std::sync::Arc;

use irori_shared::time::Clock;

use crate::{
    domain::{
        MessagePusher, MessageRepository, RegistryError, Session, SessionRegistry,
        SessionState, SessionStateError, Timestamp, Username,
    },
    infrastructure::codec::decode_identity,
};

use super::{error::IdentifyError, get_history::queue_history, sequencer::BroadcastSequencer};

/// username 確定の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifiedSession {
    /// 確定した username
    pub username: Username,
    /// 参加時に送信した履歴の件数
    pub history_sent: usize,
}

/// username 確定のユースケース
pub struct IdentifySessionUseCase {
    /// Session Registry（接続中セッションの管理）
    registry: Arc<dyn SessionRegistry>,
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn MessageRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    /// ブロードキャストとの順序付け
    sequencer: Arc<BroadcastSequencer>,
    /// 時刻の取得
    clock: Arc<dyn Clock>,
}

impl IdentifySessionUseCase {
    /// 新しい IdentifySessionUseCase を作成
    pub fn new(
        registry: Arc<dyn SessionRegistry>,
        repository: Arc<dyn MessageRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        sequencer: Arc<BroadcastSequencer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            repository,
            message_pusher,
            sequencer,
            clock,
        }
    }

    /// identity フレームを処理して username を確定する
    ///
    /// 成功すると Session は Active になり、その時点の履歴が送信キューに積まれる。
    /// 履歴の取得とアクティブ化は BroadcastSequencer の区間内で行うため、
    /// この区間の前に保存されたメッセージは履歴に、後のメッセージはライブ配信に
    /// 必ずどちらか一方だけ現れる。
    ///
    /// # Arguments
    ///
    /// * `session` - AwaitingUsername 状態のセッション
    /// * `frame` - クライアントから受信した最初のフレーム
    pub async fn execute(
        &self,
        session: &mut Session,
        frame: &str,
    ) -> Result<IdentifiedSession, IdentifyError> {
        match session.state() {
            SessionState::AwaitingUsername => {}
            SessionState::Active => return Err(SessionStateError::AlreadyActive.into()),
            SessionState::Closed => return Err(SessionStateError::Closed.into()),
        }

        let envelope = decode_identity(frame)?;
        let username = Username::new(envelope.username)?;
        let session_id = session.id();

        let history_sent = {
            let _section = self.sequencer.enter().await;

            let history = match self.repository.fetch_history_ordered().await {
                Ok(history) => history,
                Err(e) => {
                    // 履歴なしで参加を続ける
                    tracing::error!(
                        "Failed to fetch history for session '{}': {}",
                        session_id,
                        e
                    );
                    Vec::new()
                }
            };

            self.registry
                .activate(&session_id, username.clone())
                .map_err(|e| match e {
                    RegistryError::DuplicateUsername(name) => {
                        IdentifyError::DuplicateUsername(name)
                    }
                    _ => IdentifyError::SessionNotFound,
                })?;
            session.activate(username.clone())?;

            match queue_history(self.message_pusher.as_ref(), &session_id, &history).await {
                Ok(sent) => sent,
                Err(e) => {
                    tracing::warn!(
                        "Failed to push history to session '{}': {}",
                        session_id,
                        e
                    );
                    0
                }
            }
        };

        // 記録は区間の外で行う（失敗してもセッションは継続）
        let seen_at = Timestamp::new(self.clock.now_jst_millis());
        if let Err(e) = self.repository.record_username(&username, seen_at).await {
            tracing::error!("Failed to record username '{}': {}", username, e);
        }

        tracing::info!(
            "Session '{}' identified as '{}' ({} history entries sent)",
            session_id,
            username,
            history_sent
        );

        Ok(IdentifiedSession {
            username,
            history_sent,
        })
    }
}
