//! SQLite を使った MessageRepository 実装
//!
//! ## 責務
//!
//! - チャット履歴（messages テーブル）の保存と取得
//! - 使用された username（usernames テーブル）の記録
//!
//! ## 設計ノート
//!
//! rusqlite の `Connection` は同期 API なので、`parking_lot::Mutex` で包んで共有し、
//! 実際のクエリは `tokio::task::spawn_blocking` 上で実行します。
//! 非同期ランタイムのワーカースレッドがディスク I/O でブロックされることはありません。

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, params};

use crate::domain::{
    ChatMessage, MessageContent, MessageRepository, RepositoryError, Timestamp, Username,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp_ms INTEGER NOT NULL,
    username     TEXT    NOT NULL,
    content      TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages (timestamp_ms, id);
CREATE TABLE IF NOT EXISTS usernames (
    username      TEXT    PRIMARY KEY,
    first_seen_ms INTEGER NOT NULL
);
";

/// 接続先の指定
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Memory,
    File(PathBuf),
}

impl Location {
    /// `:memory:` / `sqlite::memory:` / `sqlite://<path>` / `<path>` を受け付ける
    fn parse(url: &str) -> Self {
        let url = url.trim();
        match url {
            ":memory:" | "sqlite::memory:" | "sqlite://:memory:" => Self::Memory,
            _ => {
                let path = url
                    .strip_prefix("sqlite://")
                    .or_else(|| url.strip_prefix("sqlite:"))
                    .unwrap_or(url);
                Self::File(PathBuf::from(path))
            }
        }
    }
}

fn storage_error(e: rusqlite::Error) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

/// SQLite を使った MessageRepository 実装
#[derive(Clone)]
pub struct SqliteMessageRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMessageRepository {
    /// 接続文字列からリポジトリを作成
    ///
    /// スキーマは作成しない。起動時に `ensure_schema` を呼ぶこと。
    pub fn connect(url: &str) -> Result<Self, RepositoryError> {
        let conn = match Location::parse(url) {
            Location::Memory => Connection::open_in_memory(),
            Location::File(path) => Connection::open(path),
        }
        .map_err(storage_error)?;
        tracing::info!("Connected to message store: {}", url);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// テスト用のインメモリ DB
    pub fn in_memory() -> Result<Self, RepositoryError> {
        Self::connect(":memory:")
    }

    /// ブロッキングスレッドで接続を使った処理を実行
    async fn with_conn<T, F>(&self, f: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, RepositoryError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await
        .map_err(|e| RepositoryError::Task(e.to_string()))?
    }
}

fn row_to_message(
    timestamp_ms: i64,
    username: String,
    content: String,
) -> Result<ChatMessage, RepositoryError> {
    let username =
        Username::new(username).map_err(|e| RepositoryError::InvalidRow(e.to_string()))?;
    let content =
        MessageContent::new(content).map_err(|e| RepositoryError::InvalidRow(e.to_string()))?;
    Ok(ChatMessage::new(Timestamp::new(timestamp_ms), username, content))
}

#[async_trait]
impl MessageRepository for SqliteMessageRepository {
    async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        self.with_conn(|conn| conn.execute_batch(SCHEMA).map_err(storage_error))
            .await?;
        tracing::debug!("Message store schema is ready");
        Ok(())
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        let timestamp_ms = message.timestamp().value();
        let username = message.username().as_str().to_string();
        let content = message.content().as_str().to_string();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO messages (timestamp_ms, username, content) VALUES (?1, ?2, ?3)",
                params![timestamp_ms, username, content],
            )
            .map_err(storage_error)?;
            Ok(())
        })
        .await
    }

    async fn fetch_history_ordered(&self) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = self
            .with_conn(|conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT timestamp_ms, username, content FROM messages \
                         ORDER BY timestamp_ms ASC, id ASC",
                    )
                    .map_err(storage_error)?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    })
                    .map_err(storage_error)?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(storage_error)?;
                Ok(rows)
            })
            .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for (timestamp_ms, username, content) in rows {
            // 他のツールで書き込まれた不正な行は履歴から除外
            match row_to_message(timestamp_ms, username, content) {
                Ok(message) => messages.push(message),
                Err(e) => tracing::warn!("Skipping invalid history row: {}", e),
            }
        }
        Ok(messages)
    }

    async fn record_username(
        &self,
        username: &Username,
        seen_at: Timestamp,
    ) -> Result<(), RepositoryError> {
        let username = username.as_str().to_string();
        let seen_at = seen_at.value();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO usernames (username, first_seen_ms) VALUES (?1, ?2)",
                params![username, seen_at],
            )
            .map_err(storage_error)?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
impl SqliteMessageRepository {
    /// usernames テーブルに記録された (username, first_seen_ms) を取得
    pub(crate) async fn recorded_usernames(&self) -> Vec<(String, i64)> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT username, first_seen_ms FROM usernames ORDER BY username")
                .map_err(storage_error)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })
                .map_err(storage_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(storage_error)?;
            Ok(rows)
        })
        .await
        .unwrap()
    }

    /// 検証を経由せずに行を書き込む
    pub(crate) async fn insert_raw(&self, timestamp_ms: i64, username: &str, content: &str) {
        let username = username.to_string();
        let content = content.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO messages (timestamp_ms, username, content) VALUES (?1, ?2, ?3)",
                params![timestamp_ms, username, content],
            )
            .map_err(storage_error)?;
            Ok(())
        })
        .await
        .unwrap();
    }
}
