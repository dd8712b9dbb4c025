//! エンティティ

use super::value_object::{MessageContent, Timestamp, Username};

/// チャットメッセージ
///
/// 生成後は変更されない。永続化された後にブロードキャストされ、
/// 送信タスクと受信側の全タスクで読み取り専用として共有される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    timestamp: Timestamp,
    username: Username,
    content: MessageContent,
}

impl ChatMessage {
    pub fn new(timestamp: Timestamp, username: Username, content: MessageContent) -> Self {
        Self {
            timestamp,
            username,
            content,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn content(&self) -> &MessageContent {
        &self.content
    }
}
