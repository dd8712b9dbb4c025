//! 送信キューを使った MessagePusher 実装
//!
//! ## 責務
//!
//! - Registry に登録された送信キュー（`PusherChannel`）へのメッセージ投入
//!
//! ## 設計ノート
//!
//! WebSocket への書き込みは UI 層の送信タスク（`pusher_loop`）が行います。
//! この実装はキューに積むだけで、空きを待つことはありません。キューが満杯の
//! 受信者は送信失敗として数え、接続タスクがそのセッションを閉じます。

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    BroadcastReport, MessagePushError, MessagePusher, OutboundFrame, PusherChannel, SessionId,
    SessionRecord, SessionRegistry,
};

/// 送信キューを使った MessagePusher 実装
pub struct ChannelMessagePusher {
    /// 送信先の送信キューを引くための Registry
    registry: Arc<dyn SessionRegistry>,
}

impl ChannelMessagePusher {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    fn channel_for(&self, session_id: &SessionId) -> Result<PusherChannel, MessagePushError> {
        self.registry
            .channel(session_id)
            .ok_or_else(|| MessagePushError::SessionNotFound(session_id.to_string()))
    }
}

#[async_trait]
impl MessagePusher for ChannelMessagePusher {
    async fn push_to(
        &self,
        session_id: &SessionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        self.channel_for(session_id)?
            .try_push(OutboundFrame::Text(content.to_string()))?;
        tracing::debug!("Pushed message to session '{}'", session_id);
        Ok(())
    }

    async fn push_snapshot(
        &self,
        session_id: &SessionId,
        frames: Vec<String>,
    ) -> Result<(), MessagePushError> {
        let count = frames.len();
        self.channel_for(session_id)?.try_push_snapshot(frames)?;
        tracing::debug!(
            "Queued {} history entries for session '{}'",
            count,
            session_id
        );
        Ok(())
    }

    async fn broadcast(&self, targets: &[SessionRecord], content: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for target in targets {
            // ブロードキャストでは一部の送信失敗を許容
            match target
                .outbound
                .try_push(OutboundFrame::Text(content.to_string()))
            {
                Ok(()) => {
                    report.delivered += 1;
                    tracing::debug!("Broadcasted message to session '{}'", target.id);
                }
                Err(MessagePushError::QueueFull) => {
                    report.failed += 1;
                    tracing::warn!(
                        "Session '{}' is not reading fast enough, dropping it",
                        target.id
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("Failed to push message to session '{}': {}", target.id, e);
                }
            }
        }

        report
    }
}
