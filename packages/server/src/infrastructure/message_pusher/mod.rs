//! メッセージ送信（通知）の実装
//!
//! ## 実装
//!
//! - `channel`: セッションごとの送信キュー（mpsc チャンネル）を使った実装

pub mod channel;

pub use channel::ChannelMessagePusher;
