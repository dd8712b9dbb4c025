//! 永続化の実装
//!
//! ## 実装
//!
//! - `sqlite`: SQLite（rusqlite）を使った実装。`:memory:` でテスト用のインメモリ DB も扱う

pub mod sqlite;

pub use sqlite::SqliteMessageRepository;
