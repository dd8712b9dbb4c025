//! InMemory Session Registry 実装
//!
//! ドメイン層が定義する SessionRegistry trait の具体的な実装。
//! `parking_lot::Mutex` で保護した HashMap を使用します。
//!
//! ## ロックの範囲
//!
//! クリティカルセクションではメモリ上の操作だけを行います。`enumerate` は
//! 記録（送信キューの sender を含む）をコピーしてすぐにロックを解放するため、
//! 遅いクライアントへの送信が他のセッションの登録・削除を止めることはありません。

use std::{collections::HashMap, net::SocketAddr};

use parking_lot::Mutex;

use crate::domain::{
    PusherChannel, RegistryError, SessionId, SessionRecord, SessionRegistry, Username,
};

/// インメモリ Session Registry 実装
pub struct InMemorySessionRegistry {
    sessions: Mutex<HashMap<SessionId, SessionRecord>>,
    max_sessions: usize,
}

impl InMemorySessionRegistry {
    /// 上限 `max_sessions` の Registry を作成
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::with_capacity(max_sessions)),
            max_sessions,
        }
    }
}

impl SessionRegistry for InMemorySessionRegistry {
    fn register(
        &self,
        peer_addr: SocketAddr,
        outbound: PusherChannel,
    ) -> Result<SessionId, RegistryError> {
        let mut sessions = self.sessions.lock();
        if sessions.len() >= self.max_sessions {
            return Err(RegistryError::CapacityExceeded {
                max: self.max_sessions,
            });
        }

        let id = SessionId::generate();
        sessions.insert(
            id,
            SessionRecord {
                id,
                peer_addr,
                username: None,
                outbound,
            },
        );
        tracing::debug!(
            "Session '{}' registered ({}/{})",
            id,
            sessions.len(),
            self.max_sessions
        );
        Ok(id)
    }

    fn activate(&self, session_id: &SessionId, username: Username) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.lock();

        let taken = sessions
            .values()
            .any(|record| record.id != *session_id && record.username.as_ref() == Some(&username));
        if taken {
            return Err(RegistryError::DuplicateUsername(username.into_string()));
        }

        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| RegistryError::SessionNotFound(session_id.to_string()))?;
        record.username = Some(username);
        Ok(())
    }

    fn unregister(&self, session_id: &SessionId) -> bool {
        let removed = self.sessions.lock().remove(session_id).is_some();
        if removed {
            tracing::debug!("Session '{}' unregistered", session_id);
        }
        removed
    }

    fn channel(&self, session_id: &SessionId) -> Option<PusherChannel> {
        self.sessions
            .lock()
            .get(session_id)
            .map(|record| record.outbound.clone())
    }

    fn enumerate(&self) -> Vec<SessionRecord> {
        self.sessions.lock().values().cloned().collect()
    }

    fn count(&self) -> usize {
        self.sessions.lock().len()
    }

    fn capacity(&self) -> usize {
        self.max_sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::OutboundFrame;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - register / activate / unregister / enumerate の基本動作
    // - 上限（MAX_CLIENTS）を超えないこと
    // - username の重複がアクティブなセッション間で禁止されること
    // - unregister の冪等性
    //
    // 【なぜこのテストが必要か】
    // - Registry は複数のタスクから変更される唯一の共有データ
    // - 上限・一意性の不変条件が崩れるとサーバー全体に影響する
    // ========================================

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn channel() -> PusherChannel {
        let (tx, _queue) = PusherChannel::bounded(4);
        tx
    }

    fn username(name: &str) -> Username {
        Username::new(name.to_string()).unwrap()
    }

    #[test]
    fn test_register_success() {
        // テスト項目: セッションを登録すると enumerate に現れる
        // given (前提条件):
        let registry = InMemorySessionRegistry::new(2);

        // when (操作):
        let id = registry.register(peer(), channel()).unwrap();

        // then (期待する結果):
        assert_eq!(registry.count(), 1);
        let records = registry.enumerate();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert!(!records[0].is_active());
    }

    #[test]
    fn test_register_capacity_exceeded() {
        // テスト項目: 上限に達した状態での登録は CapacityExceeded になる
        // given (前提条件):
        let registry = InMemorySessionRegistry::new(2);
        registry.register(peer(), channel()).unwrap();
        registry.register(peer(), channel()).unwrap();

        // when (操作):
        let result = registry.register(peer(), channel());

        // then (期待する結果):
        assert_eq!(result, Err(RegistryError::CapacityExceeded { max: 2 }));
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_register_after_unregister_frees_slot() {
        // テスト項目: 削除すると空いた枠に再び登録できる
        // given (前提条件):
        let registry = InMemorySessionRegistry::new(1);
        let id = registry.register(peer(), channel()).unwrap();

        // when (操作):
        registry.unregister(&id);
        let result = registry.register(peer(), channel());

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_activate_binds_username() {
        // テスト項目: activate で username が確定する
        // given (前提条件):
        let registry = InMemorySessionRegistry::new(2);
        let id = registry.register(peer(), channel()).unwrap();

        // when (操作):
        let result = registry.activate(&id, username("alice"));

        // then (期待する結果):
        assert!(result.is_ok());
        let records = registry.enumerate();
        assert_eq!(records[0].username, Some(username("alice")));
        assert!(records[0].is_active());
    }

    #[test]
    fn test_activate_duplicate_username() {
        // テスト項目: アクティブなセッションと同じ username は確定できない
        // given (前提条件):
        let registry = InMemorySessionRegistry::new(3);
        let alice = registry.register(peer(), channel()).unwrap();
        registry.activate(&alice, username("alice")).unwrap();
        let impostor = registry.register(peer(), channel()).unwrap();

        // when (操作):
        let result = registry.activate(&impostor, username("alice"));

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RegistryError::DuplicateUsername("alice".to_string()))
        );
        let impostor_record = registry
            .enumerate()
            .into_iter()
            .find(|record| record.id == impostor)
            .unwrap();
        assert!(!impostor_record.is_active());
    }

    #[test]
    fn test_username_reusable_after_unregister() {
        // テスト項目: 切断されたセッションの username は再利用できる
        // given (前提条件):
        let registry = InMemorySessionRegistry::new(2);
        let first = registry.register(peer(), channel()).unwrap();
        registry.activate(&first, username("alice")).unwrap();
        registry.unregister(&first);

        // when (操作):
        let second = registry.register(peer(), channel()).unwrap();
        let result = registry.activate(&second, username("alice"));

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[test]
    fn test_activate_unknown_session() {
        // テスト項目: 存在しないセッションの activate は SessionNotFound になる
        // given (前提条件):
        let registry = InMemorySessionRegistry::new(1);
        let unknown = SessionId::generate();

        // when (操作):
        let result = registry.activate(&unknown, username("alice"));

        // then (期待する結果):
        assert!(matches!(result, Err(RegistryError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_channel_returns_session_queue() {
        // テスト項目: channel で登録済みセッションの送信キューを引ける
        // given (前提条件):
        let registry = InMemorySessionRegistry::new(2);
        let (tx, mut queue) = PusherChannel::bounded(4);
        let id = registry.register(peer(), tx).unwrap();
        registry.register(peer(), channel()).unwrap();

        // when (操作):
        let found = registry.channel(&id).expect("channel should exist");
        found
            .try_push(OutboundFrame::Text("hello".to_string()))
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            queue.recv().await,
            Some(OutboundFrame::Text("hello".to_string()))
        );
        registry.unregister(&id);
        assert!(registry.channel(&id).is_none());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        // テスト項目: 同じセッションを 2 回削除しても 2 回目は何もしない
        // given (前提条件):
        let registry = InMemorySessionRegistry::new(1);
        let id = registry.register(peer(), channel()).unwrap();

        // when (操作):
        let first = registry.unregister(&id);
        let second = registry.unregister(&id);

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_enumerate_is_a_snapshot() {
        // テスト項目: enumerate の結果は取得後の変更の影響を受けない
        // given (前提条件):
        let registry = InMemorySessionRegistry::new(2);
        let id = registry.register(peer(), channel()).unwrap();
        let snapshot = registry.enumerate();

        // when (操作):
        registry.unregister(&id);

        // then (期待する結果):
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.enumerate().len(), 0);
    }

    #[test]
    fn test_concurrent_register_never_exceeds_capacity() {
        // テスト項目: 並行して登録・削除を繰り返しても上限を超えない
        // given (前提条件):
        let capacity = 4;
        let registry = Arc::new(InMemorySessionRegistry::new(capacity));

        // when (操作):
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        if let Ok(id) = registry.register(peer(), channel()) {
                            assert!(registry.count() <= capacity);
                            registry.unregister(&id);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // then (期待する結果):
        assert_eq!(registry.count(), 0);
    }
}
