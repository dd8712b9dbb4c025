//! Infrastructure 層
//!
//! ドメイン層が定義する trait の具体的な実装と、ワイヤフォーマット（DTO / codec）。

pub mod codec;
pub mod dto;
pub mod message_pusher;
pub mod registry;
pub mod repository;
