//! 値オブジェクト
//!
//! 生成時に検証を行い、不正な値がドメイン層に入り込まないようにします。

use std::fmt;

use irori_shared::time::{parse_rfc3339_millis, timestamp_to_jst_rfc3339};
use uuid::Uuid;

use super::error::ValueObjectError;

/// ユーザー名の最大文字数
pub const MAX_USERNAME_CHARS: usize = 64;

/// メッセージ本文の最大文字数
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// セッション ID
///
/// 接続ごとに払い出される識別子。Registry のキーとして使用します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// 新しいセッション ID を生成
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ユーザー名
///
/// 前後の空白は取り除かれ、1〜64 文字で制御文字を含まないことが保証されます。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Username(String);

impl Username {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::EmptyUsername);
        }
        let chars = trimmed.chars().count();
        if chars > MAX_USERNAME_CHARS {
            return Err(ValueObjectError::UsernameTooLong {
                max: MAX_USERNAME_CHARS,
                actual: chars,
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ValueObjectError::UsernameContainsControlCharacter);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for Username {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// メッセージ本文
///
/// 空文字列は許容します（クライアントが message を空で送ってきた場合もそのまま扱う）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let chars = value.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(ValueObjectError::MessageTooLong {
                max: MAX_MESSAGE_CHARS,
                actual: chars,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// タイムスタンプ（Unix 時間、ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    /// RFC 3339 文字列からタイムスタンプを生成
    ///
    /// 空文字列や解釈できない文字列の場合は `None` を返す。
    pub fn parse_rfc3339(text: &str) -> Option<Self> {
        parse_rfc3339_millis(text).map(Self)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// JST の RFC 3339 形式に変換
    pub fn to_rfc3339(&self) -> String {
        timestamp_to_jst_rfc3339(self.0)
    }
}
