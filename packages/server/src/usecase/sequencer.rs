//! ブロードキャストの直列化
//!
//! 次の 2 つの処理を 1 つの非同期 Mutex で直列化します。
//!
//! - メッセージの保存とブロードキャスト（SendMessageUseCase）
//! - 参加時の履歴取得、アクティブ化、履歴の送信（IdentifySessionUseCase）
//!
//! これにより、参加するクライアントは各メッセージを履歴かライブ配信の
//! どちらか一方でちょうど 1 回受け取ります。

use tokio::sync::{Mutex, MutexGuard};

/// ブロードキャストの順序を決める排他区間
#[derive(Debug, Default)]
pub struct BroadcastSequencer {
    lock: Mutex<()>,
}

impl BroadcastSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 排他区間に入る
    ///
    /// ガードを drop すると区間を抜ける。Registry のロックとは独立しており、
    /// この区間の中で永続化を行ってよい。
    pub async fn enter(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// 実行中の区間が終わるまで待つ
    ///
    /// シャットダウン時に、進行中のブロードキャストを完了させるために使う。
    pub async fn quiesce(&self) {
        let _guard = self.lock.lock().await;
        tracing::debug!("Broadcast sequencer quiesced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};

    #[tokio::test]
    async fn test_quiesce_waits_for_running_section() {
        // テスト項目: quiesce は実行中の区間が終わるまで戻らない
        // given (前提条件):
        let sequencer = Arc::new(BroadcastSequencer::new());
        let guard = sequencer.enter().await;

        // when (操作):
        let waiter = {
            let sequencer = sequencer.clone();
            tokio::spawn(async move { sequencer.quiesce().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // then (期待する結果):
        assert!(!waiter.is_finished());
        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("quiesce should finish after the section ends")
            .unwrap();
    }
}
