//! ドメイン層
//!
//! 値オブジェクト、エンティティ、セッションの状態機械、および
//! Infrastructure 層が実装する trait（Repository / Registry / MessagePusher）を定義します。

pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod registry;
pub mod repository;
pub mod session;
pub mod value_object;

pub use entity::ChatMessage;
pub use error::{
    MessagePushError, RegistryError, RepositoryError, SessionStateError, ValueObjectError,
};
pub use message_pusher::{
    BroadcastReport, MessagePusher, OutboundFrame, OutboundQueue, PusherChannel,
};
pub use registry::{RegistrationGuard, SessionRecord, SessionRegistry};
pub use repository::MessageRepository;
pub use session::{CloseReason, Session, SessionState};
pub use value_object::{MessageContent, SessionId, Timestamp, Username};

#[cfg(test)]
pub use repository::MockMessageRepository;
