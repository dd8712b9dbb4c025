//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - メッセージ送信処理（タイムスタンプの決定、永続化、ブロードキャスト対象選定）
//!
//! ### なぜこのテストが必要か
//! - ビジネスロジックの検証：送信者以外のアクティブなセッションにブロードキャストされる
//! - 永続化がブロードキャストより先に行われることを確認
//! - 永続化に失敗してもブロードキャストは行われることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：メッセージ送信とブロードキャスト
//! - 異常系：永続化の失敗、Active でないセッションからの送信
//! - エッジケース：送信者のみが接続している場合（ブロードキャスト対象なし）、
//!   username 未確定のセッションはブロードキャスト対象外

use std::sync::Arc;

use irori_shared::time::Clock;

use crate::{
    domain::{
        ChatMessage, MessageContent, MessagePusher, MessageRepository, Session, SessionId,
        SessionRecord, SessionRegistry, Timestamp,
    },
    infrastructure::dto::websocket::ChatEnvelope,
};

use super::{error::SendMessageError, sequencer::BroadcastSequencer};

/// メッセージ送信の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageOutcome {
    /// 保存したメッセージ
    pub message: ChatMessage,
    /// 永続化に成功したか
    pub persisted: bool,
    /// 送信キューに積めた受信者数
    pub delivered: usize,
    /// 送信キューに積めなかった受信者数
    pub failed: usize,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn MessageRepository>,
    /// Session Registry（ブロードキャスト対象の列挙）
    registry: Arc<dyn SessionRegistry>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    /// ブロードキャストの直列化
    sequencer: Arc<BroadcastSequencer>,
    /// 時刻の取得
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        registry: Arc<dyn SessionRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        sequencer: Arc<BroadcastSequencer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            registry,
            message_pusher,
            sequencer,
            clock,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `session` - 送信者のセッション（Active であること）
    /// * `envelope` - デコード済みのチャットフレーム
    ///
    /// # Returns
    ///
    /// * `Ok(SendMessageOutcome)` - 永続化とブロードキャストの結果
    /// * `Err(SendMessageError)` - セッションが Active でない、または本文が不正
    pub async fn execute(
        &self,
        session: &Session,
        envelope: ChatEnvelope,
    ) -> Result<SendMessageOutcome, SendMessageError> {
        let username = session.active_username()?.clone();
        let content = MessageContent::new(envelope.message)?;

        // 空または解釈できない時刻はサーバーの受信時刻で置き換える
        let timestamp = match Timestamp::parse_rfc3339(&envelope.time) {
            Some(timestamp) => timestamp,
            None => {
                let received_at = Timestamp::new(self.clock.now_jst_millis());
                tracing::debug!(
                    "Session '{}' sent time {:?}, using receive time {} instead",
                    session.id(),
                    envelope.time,
                    received_at.value()
                );
                received_at
            }
        };
        let message = ChatMessage::new(timestamp, username, content);

        let _section = self.sequencer.enter().await;

        // 1. 永続化（失敗してもブロードキャストは続ける）
        let persisted = match self.repository.insert_message(&message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    "Failed to persist message from '{}': {}",
                    message.username(),
                    e
                );
                false
            }
        };

        // 2. ブロードキャスト対象を取得（送信者以外のアクティブなセッション）
        let broadcast_targets = self.get_broadcast_targets(&session.id());

        // 3. MessagePusher を使ってブロードキャスト（本文をそのまま送る）
        let report = self
            .message_pusher
            .broadcast(&broadcast_targets, message.content().as_str())
            .await;
        tracing::info!(
            "Broadcasted message from '{}' to {} session(s) ({} failed)",
            message.username(),
            report.delivered,
            report.failed
        );

        Ok(SendMessageOutcome {
            message,
            persisted,
            delivered: report.delivered,
            failed: report.failed,
        })
    }

    /// ブロードキャスト対象のセッションを取得
    ///
    /// 送信者以外の、username が確定した全てのセッションを返す
    fn get_broadcast_targets(&self, exclude_session_id: &SessionId) -> Vec<SessionRecord> {
        self.registry
            .enumerate()
            .into_iter()
            .filter(|record| record.is_active() && record.id != *exclude_session_id)
            .collect()
    }
}
