//! Session Registry trait 定義
//!
//! 接続中のセッションを保持する、上限付きの共有コレクション。
//! 変更（register / activate / unregister）は 1 つの排他機構で直列化され、
//! `enumerate` はロック中に参照をコピーするだけで I/O を行わない。

use std::{net::SocketAddr, sync::Arc};

use super::{PusherChannel, RegistryError, SessionId, Username};

/// Registry が保持するセッションの記録
///
/// Session 本体は接続タスクが所有する。ここにあるのは列挙と送信に必要な情報だけ。
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub peer_addr: SocketAddr,
    /// AwaitingUsername の間は `None`
    pub username: Option<Username>,
    pub outbound: PusherChannel,
}

impl SessionRecord {
    /// username が確定済み（Active）かどうか
    pub fn is_active(&self) -> bool {
        self.username.is_some()
    }
}

/// Session Registry trait
pub trait SessionRegistry: Send + Sync {
    /// セッションを登録し、ID を払い出す
    ///
    /// 登録数が上限に達している場合は `RegistryError::CapacityExceeded`。
    fn register(
        &self,
        peer_addr: SocketAddr,
        outbound: PusherChannel,
    ) -> Result<SessionId, RegistryError>;

    /// username を確定する
    ///
    /// 他のアクティブなセッションが同じ username を使っている場合は
    /// `RegistryError::DuplicateUsername`。重複チェックと確定は 1 つの
    /// クリティカルセクションで行われる。
    fn activate(&self, session_id: &SessionId, username: Username) -> Result<(), RegistryError>;

    /// セッションを削除（冪等）
    ///
    /// 実際に削除した場合のみ `true` を返す。
    fn unregister(&self, session_id: &SessionId) -> bool;

    /// セッションの送信キューを引く
    fn channel(&self, session_id: &SessionId) -> Option<PusherChannel>;

    /// 現在のセッションのスナップショット
    ///
    /// ブロードキャスト対象の選定と接続状況の集計に使う。1 セッションへの
    /// 送信には `channel` を使う。
    fn enumerate(&self) -> Vec<SessionRecord>;

    /// 登録中のセッション数
    fn count(&self) -> usize;

    /// 登録できるセッション数の上限
    fn capacity(&self) -> usize;
}

/// スコープを抜けるときにセッションを Registry から削除するガード
///
/// 接続タスクがどの経路で終了しても（パニックを含む）削除が 1 回だけ行われる。
pub struct RegistrationGuard {
    registry: Arc<dyn SessionRegistry>,
    session_id: SessionId,
}

impl RegistrationGuard {
    pub fn new(registry: Arc<dyn SessionRegistry>, session_id: SessionId) -> Self {
        Self {
            registry,
            session_id,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        if self.registry.unregister(&self.session_id) {
            tracing::debug!("Session '{}' released by guard", self.session_id);
        }
    }
}
