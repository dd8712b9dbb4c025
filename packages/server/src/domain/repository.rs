//! Repository trait 定義
//!
//! ドメイン層が必要とする永続化のインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{ChatMessage, RepositoryError, Timestamp, Username};

/// Message Repository trait
///
/// チャット履歴を保存するストアへの窓口。UseCase 層はこの trait に依存し、
/// ストレージエンジンの具体的な実装には依存しない。
///
/// ## 契約
///
/// - `insert_message` が成功を返したメッセージは、その後の
///   `fetch_history_ordered` に必ず含まれる
/// - `fetch_history_ordered` はタイムスタンプの昇順（同時刻は挿入順）で返す
/// - 呼び出し側は Registry のロックを保持したまま呼び出してはならない
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// テーブルを作成（冪等）
    async fn ensure_schema(&self) -> Result<(), RepositoryError>;

    /// メッセージを保存
    async fn insert_message(&self, message: &ChatMessage) -> Result<(), RepositoryError>;

    /// 全メッセージをタイムスタンプの昇順で取得
    async fn fetch_history_ordered(&self) -> Result<Vec<ChatMessage>, RepositoryError>;

    /// 使用されたユーザー名を記録（既に記録済みなら何もしない）
    async fn record_username(
        &self,
        username: &Username,
        seen_at: Timestamp,
    ) -> Result<(), RepositoryError>;
}
