//! UseCase: 履歴の取得と再送
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - GetHistoryUseCase::execute()（GET_HISTORY への応答）
//! - GetHistoryUseCase::snapshot()（HTTP API 向け）
//!
//! ### なぜこのテストが必要か
//! - 履歴が古い順に 1 件 1 フレームで送られることを保証
//! - 永続化層の失敗が呼び出し側にエラーとして伝わることを確認
//! - 読み込まないクライアントが GET_HISTORY を繰り返しても送信キューが膨らまないこと
//! - 再送のたびに Registry 全体を列挙しないこと

use std::sync::Arc;

use crate::{
    domain::{ChatMessage, MessagePushError, MessagePusher, MessageRepository, SessionId},
    infrastructure::codec::encode_history_entry,
};

use super::error::HistoryError;

/// 履歴をセッションの送信キューにまとめて積む
///
/// エンコードできないメッセージはスキップし、積んだ件数を返す。送信キューは
/// 1 回だけ引き、全件を 1 つのスナップショットとして渡す。
pub(crate) async fn queue_history(
    pusher: &dyn MessagePusher,
    session_id: &SessionId,
    history: &[ChatMessage],
) -> Result<usize, MessagePushError> {
    let frames: Vec<String> = history
        .iter()
        .filter_map(|message| match encode_history_entry(message) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!("Skipping history entry that failed to encode: {}", e);
                None
            }
        })
        .collect();

    if frames.is_empty() {
        return Ok(0);
    }
    let pushed = frames.len();
    pusher.push_snapshot(session_id, frames).await?;
    Ok(pushed)
}

/// 履歴取得のユースケース
pub struct GetHistoryUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn MessageRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl GetHistoryUseCase {
    /// 新しい GetHistoryUseCase を作成
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 現在の履歴をセッションに再送する
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 送信した履歴の件数
    /// * `Err(HistoryError)` - 履歴の取得または送信に失敗
    ///
    /// 前回のスナップショットがまだ送信キューに残っている場合は、そのスナップショットで
    /// 応答済みとみなし `Ok(0)` を返す。
    pub async fn execute(&self, session_id: &SessionId) -> Result<usize, HistoryError> {
        let history = self.repository.fetch_history_ordered().await?;
        match queue_history(self.message_pusher.as_ref(), session_id, &history).await {
            Ok(pushed) => {
                tracing::info!("Resent {} history entries to session '{}'", pushed, session_id);
                Ok(pushed)
            }
            Err(MessagePushError::SnapshotPending) => {
                tracing::debug!(
                    "History for session '{}' is still queued, skipping resend",
                    session_id
                );
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 現在の履歴を取得する
    pub async fn snapshot(&self) -> Result<Vec<ChatMessage>, HistoryError> {
        Ok(self.repository.fetch_history_ordered().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            MessageContent, MockMessageRepository, OutboundFrame, OutboundQueue, PusherChannel,
            RegistryError, RepositoryError, SessionRecord, SessionRegistry, Timestamp, Username,
        },
        infrastructure::{
            message_pusher::ChannelMessagePusher, registry::InMemorySessionRegistry,
            repository::SqliteMessageRepository,
        },
    };
    use std::{
        net::SocketAddr,
        sync::atomic::{AtomicUsize, Ordering},
    };

    fn message(timestamp_ms: i64, username: &str, content: &str) -> ChatMessage {
        ChatMessage::new(
            Timestamp::new(timestamp_ms),
            Username::new(username.to_string()).unwrap(),
            MessageContent::new(content.to_string()).unwrap(),
        )
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    fn create_pusher_with_session() -> (Arc<ChannelMessagePusher>, SessionId, OutboundQueue) {
        let registry = Arc::new(InMemorySessionRegistry::new(10));
        let (tx, queue) = PusherChannel::bounded(16);
        let id = registry.register(peer(), tx).unwrap();
        let pusher = Arc::new(ChannelMessagePusher::new(registry));
        (pusher, id, queue)
    }

    /// enumerate の呼び出し回数を数える Registry
    struct CountingRegistry {
        inner: InMemorySessionRegistry,
        enumerate_calls: AtomicUsize,
    }

    impl SessionRegistry for CountingRegistry {
        fn register(
            &self,
            peer_addr: SocketAddr,
            outbound: PusherChannel,
        ) -> Result<SessionId, RegistryError> {
            self.inner.register(peer_addr, outbound)
        }

        fn activate(
            &self,
            session_id: &SessionId,
            username: Username,
        ) -> Result<(), RegistryError> {
            self.inner.activate(session_id, username)
        }

        fn unregister(&self, session_id: &SessionId) -> bool {
            self.inner.unregister(session_id)
        }

        fn channel(&self, session_id: &SessionId) -> Option<PusherChannel> {
            self.inner.channel(session_id)
        }

        fn enumerate(&self) -> Vec<SessionRecord> {
            self.enumerate_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.enumerate()
        }

        fn count(&self) -> usize {
            self.inner.count()
        }

        fn capacity(&self) -> usize {
            self.inner.capacity()
        }
    }

    fn large_history(entries: i64) -> Vec<ChatMessage> {
        (0..entries)
            .map(|n| message(1000 + n, "alice", &"x".repeat(1000)))
            .collect()
    }

    #[tokio::test]
    async fn test_get_history_pushes_entries_in_order() {
        // テスト項目: 履歴が古い順に 1 件 1 フレームのスナップショットとして積まれる
        // given (前提条件):
        let repository = Arc::new(SqliteMessageRepository::in_memory().unwrap());
        repository.ensure_schema().await.unwrap();
        repository
            .insert_message(&message(1672498802000, "bob", "second"))
            .await
            .unwrap();
        repository
            .insert_message(&message(1672498801000, "alice", "first"))
            .await
            .unwrap();
        let (pusher, id, mut rx) = create_pusher_with_session();
        let usecase = GetHistoryUseCase::new(repository, pusher);

        // when (操作):
        let pushed = usecase.execute(&id).await.unwrap();

        // then (期待する結果):
        assert_eq!(pushed, 2);
        assert_eq!(
            rx.recv().await,
            Some(OutboundFrame::Batch(vec![
                r#"{"timestamp":"2023-01-01T00:00:01+09:00","username":"alice","message":"first"}"#
                    .to_string(),
                r#"{"timestamp":"2023-01-01T00:00:02+09:00","username":"bob","message":"second"}"#
                    .to_string(),
            ]))
        );
    }

    #[tokio::test]
    async fn test_get_history_empty() {
        // テスト項目: 履歴が空の場合は何も送信しない
        // given (前提条件):
        let repository = Arc::new(SqliteMessageRepository::in_memory().unwrap());
        repository.ensure_schema().await.unwrap();
        let (pusher, id, mut rx) = create_pusher_with_session();
        let usecase = GetHistoryUseCase::new(repository, pusher);

        // when (操作):
        let pushed = usecase.execute(&id).await.unwrap();

        // then (期待する結果):
        assert_eq!(pushed, 0);
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_get_history_repeated_requests_do_not_pile_up() {
        // テスト項目: 読み込まないセッションが再送を繰り返しても、キューに残る履歴は 1 つだけ
        // given (前提条件):
        let mut repository = MockMessageRepository::new();
        repository
            .expect_fetch_history_ordered()
            .returning(|| Ok(large_history(200)));
        let (pusher, id, mut rx) = create_pusher_with_session();
        let usecase = GetHistoryUseCase::new(Arc::new(repository), pusher);

        // when (操作):
        let mut pushed = Vec::new();
        for _ in 0..50 {
            pushed.push(usecase.execute(&id).await.unwrap());
        }

        // then (期待する結果):
        assert_eq!(pushed[0], 200);
        assert!(pushed[1..].iter().all(|&count| count == 0));
        assert!(matches!(rx.try_recv(), Some(OutboundFrame::Batch(frames)) if frames.len() == 200));
        assert!(rx.try_recv().is_none());

        // 取り出された後の再送は新しいスナップショットになる
        assert_eq!(usecase.execute(&id).await.unwrap(), 200);
    }

    #[tokio::test]
    async fn test_get_history_does_not_enumerate_registry() {
        // テスト項目: 再送は送信キューを 1 回引くだけで、Registry を列挙しない
        // given (前提条件):
        let registry = Arc::new(CountingRegistry {
            inner: InMemorySessionRegistry::new(10),
            enumerate_calls: AtomicUsize::new(0),
        });
        let mut queues = Vec::new();
        let mut ids = Vec::new();
        for _ in 0..10 {
            let (tx, queue) = PusherChannel::bounded(16);
            ids.push(registry.register(peer(), tx).unwrap());
            queues.push(queue);
        }
        let mut repository = MockMessageRepository::new();
        repository
            .expect_fetch_history_ordered()
            .returning(|| Ok(large_history(200)));
        let pusher = Arc::new(ChannelMessagePusher::new(registry.clone()));
        let usecase = GetHistoryUseCase::new(Arc::new(repository), pusher);

        // when (操作):
        let pushed = usecase.execute(&ids[0]).await.unwrap();

        // then (期待する結果):
        assert_eq!(pushed, 200);
        assert_eq!(registry.enumerate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_history_repository_failure() {
        // テスト項目: 履歴の取得に失敗した場合は Repository エラーを返す
        // given (前提条件):
        let mut repository = MockMessageRepository::new();
        repository
            .expect_fetch_history_ordered()
            .returning(|| Err(RepositoryError::Storage("disk I/O error".to_string())));
        let (pusher, id, _rx) = create_pusher_with_session();
        let usecase = GetHistoryUseCase::new(Arc::new(repository), pusher);

        // when (操作):
        let result = usecase.execute(&id).await;

        // then (期待する結果):
        assert!(matches!(result, Err(HistoryError::Repository(_))));
    }

    #[tokio::test]
    async fn test_get_history_unknown_session() {
        // テスト項目: 登録されていないセッションへの再送は Push エラーになる
        // given (前提条件):
        let mut repository = MockMessageRepository::new();
        repository
            .expect_fetch_history_ordered()
            .returning(|| Ok(vec![message(1000, "alice", "hi")]));
        let (pusher, _id, _rx) = create_pusher_with_session();
        let usecase = GetHistoryUseCase::new(Arc::new(repository), pusher);

        // when (操作):
        let result = usecase.execute(&SessionId::generate()).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(HistoryError::Push(MessagePushError::SessionNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_returns_ordered_history() {
        // テスト項目: snapshot は履歴を古い順に返す
        // given (前提条件):
        let repository = Arc::new(SqliteMessageRepository::in_memory().unwrap());
        repository.ensure_schema().await.unwrap();
        repository
            .insert_message(&message(2000, "bob", "later"))
            .await
            .unwrap();
        repository
            .insert_message(&message(1000, "alice", "earlier"))
            .await
            .unwrap();
        let (pusher, _id, _rx) = create_pusher_with_session();
        let usecase = GetHistoryUseCase::new(repository, pusher);

        // when (操作):
        let history = usecase.snapshot().await.unwrap();

        // then (期待する結果):
        let contents: Vec<&str> = history.iter().map(|m| m.content().as_str()).collect();
        assert_eq!(contents, vec!["earlier", "later"]);
    }
}
