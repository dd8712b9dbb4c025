//! MessagePusher trait 定義
//!
//! セッションへのメッセージ送信（通知）の抽象化。送信はセッションごとの
//! 上限付きキュー（`PusherChannel`）に積まれ、専用の送信タスクがソケットへ書き出す。
//! 送信側はキューが空くのを待たない。キューが溢れたセッションは読み込みが
//! 追いついていないとみなされ、接続タスクによって閉じられる。

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc, mpsc::error::TrySendError};

use super::{MessagePushError, SessionId, SessionRecord};

/// 送信キューに積まれる 1 単位
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// テキストフレーム（JSON 1 件、またはメッセージ本文）
    Text(String),
    /// 履歴のスナップショット（1 件 1 テキストフレームとして順に書き出す）
    Batch(Vec<String>),
    /// close フレームを送り、送信タスクを終了する
    Close { code: u16, reason: String },
}

/// セッションの送信キュー（送信側）
#[derive(Debug, Clone)]
pub struct PusherChannel {
    sender: mpsc::Sender<OutboundFrame>,
    overflow: Arc<Notify>,
    snapshot_pending: Arc<AtomicBool>,
}

/// セッションの送信キュー（受信側）。送信タスクが所有する
#[derive(Debug)]
pub struct OutboundQueue {
    receiver: mpsc::Receiver<OutboundFrame>,
    snapshot_pending: Arc<AtomicBool>,
}

impl PusherChannel {
    /// 最大 `capacity` 件（1 以上）のフレームを保持する送信キューを作成
    pub fn bounded(capacity: usize) -> (Self, OutboundQueue) {
        let (sender, receiver) = mpsc::channel(capacity);
        let snapshot_pending = Arc::new(AtomicBool::new(false));
        let channel = Self {
            sender,
            overflow: Arc::new(Notify::new()),
            snapshot_pending: snapshot_pending.clone(),
        };
        let queue = OutboundQueue {
            receiver,
            snapshot_pending,
        };
        (channel, queue)
    }

    /// 待たずにフレームを積む
    ///
    /// キューが満杯の場合は `QueueFull` を返し、`overflowed` の待ち手に通知する。
    pub fn try_push(&self, frame: OutboundFrame) -> Result<(), MessagePushError> {
        match self.sender.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.overflow.notify_one();
                Err(MessagePushError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(MessagePushError::PushFailed(
                "outbound queue is closed".to_string(),
            )),
        }
    }

    /// 履歴のスナップショットを積む
    ///
    /// まだ送信タスクが取り出していないスナップショットがある場合は
    /// `SnapshotPending` を返す。キューに残るスナップショットは常に 1 つまで。
    pub fn try_push_snapshot(&self, frames: Vec<String>) -> Result<(), MessagePushError> {
        if self
            .snapshot_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MessagePushError::SnapshotPending);
        }

        let result = self.try_push(OutboundFrame::Batch(frames));
        if result.is_err() {
            self.snapshot_pending.store(false, Ordering::Release);
        }
        result
    }

    /// キューが溢れるまで待つ
    ///
    /// 待ち手がいない間に溢れた場合も、次の呼び出しがすぐに完了する。
    pub async fn overflowed(&self) {
        self.overflow.notified().await;
    }
}

impl OutboundQueue {
    /// 次のフレームを取り出す。全ての `PusherChannel` が drop されると `None`
    pub async fn recv(&mut self) -> Option<OutboundFrame> {
        let frame = self.receiver.recv().await;
        if matches!(frame, Some(OutboundFrame::Batch(_))) {
            self.snapshot_pending.store(false, Ordering::Release);
        }
        frame
    }

    /// 待たずに次のフレームを取り出す
    pub fn try_recv(&mut self) -> Option<OutboundFrame> {
        let frame = self.receiver.try_recv().ok();
        if matches!(frame, Some(OutboundFrame::Batch(_))) {
            self.snapshot_pending.store(false, Ordering::Release);
        }
        frame
    }
}

/// ブロードキャスト 1 回分の結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// キューへの投入に成功した受信者数
    pub delivered: usize,
    /// 投入に失敗した受信者数（切断処理中、またはキューが満杯のセッション）
    pub failed: usize,
}

/// MessagePusher trait
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 特定のセッションに送信
    async fn push_to(&self, session_id: &SessionId, content: &str)
    -> Result<(), MessagePushError>;

    /// 特定のセッションに履歴のスナップショットをまとめて送信
    async fn push_snapshot(
        &self,
        session_id: &SessionId,
        frames: Vec<String>,
    ) -> Result<(), MessagePushError>;

    /// 複数のセッションに送信
    ///
    /// 一部の受信者への失敗は許容し、残りの受信者への送信を続ける。
    async fn broadcast(&self, targets: &[SessionRecord], content: &str) -> BroadcastReport;
}
