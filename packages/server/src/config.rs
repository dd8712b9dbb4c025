//! サーバー設定
//!
//! コマンドライン引数（または環境変数）から組み立てられ、起動前に検証されます。

use std::time::Duration;

use thiserror::Error;

/// デフォルトの待ち受けポート
pub const DEFAULT_PORT: u16 = 8080;
/// デフォルトの同時接続数の上限
pub const DEFAULT_MAX_CLIENTS: usize = 10;
/// デフォルトの username 待ちタイムアウト（秒）
pub const DEFAULT_IDENTITY_TIMEOUT_SECS: u64 = 10;
/// デフォルトのシャットダウン猶予（秒）
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;
/// デフォルトのセッションごとの送信キューの長さ
///
/// 履歴のスナップショットはまとめて 1 件として数える。
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;
/// デフォルトの履歴 DB
pub const DEFAULT_DATABASE_URL: &str = "sqlite://irori.db";

/// 設定エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max clients must be at least 1")]
    ZeroMaxClients,

    #[error("identity timeout must be greater than zero")]
    ZeroIdentityTimeout,

    #[error("outbound queue capacity must be at least 1")]
    ZeroOutboundQueueCapacity,

    #[error("database url must not be empty")]
    EmptyDatabaseUrl,

    #[error("host must not be empty")]
    EmptyHost,
}

/// サーバー設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// 待ち受けアドレス
    pub host: String,
    /// 待ち受けポート（0 の場合は OS が割り当てる）
    pub port: u16,
    /// 同時接続数の上限（username 未確定のセッションを含む）
    pub max_clients: usize,
    /// 接続後、username を受け取るまでの待ち時間
    pub identity_timeout: Duration,
    /// セッションごとの送信キューの長さ（溢れたセッションは閉じられる）
    pub outbound_queue_capacity: usize,
    /// 履歴 DB の接続文字列
    pub database_url: String,
    /// シャットダウン時にセッションの終了を待つ時間
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_clients: DEFAULT_MAX_CLIENTS,
            identity_timeout: Duration::from_secs(DEFAULT_IDENTITY_TIMEOUT_SECS),
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
        }
    }
}

impl ServerConfig {
    /// 設定値を検証する
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.max_clients == 0 {
            return Err(ConfigError::ZeroMaxClients);
        }
        if self.identity_timeout.is_zero() {
            return Err(ConfigError::ZeroIdentityTimeout);
        }
        if self.outbound_queue_capacity == 0 {
            return Err(ConfigError::ZeroOutboundQueueCapacity);
        }
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }
        Ok(())
    }

    /// `host:port` 形式の待ち受けアドレス
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
