//! 交友系统核心领域模型
//!
//! 包含用户、滑动、配对、聊天室、消息、配额等核心实体，
//! 以及推荐打分的业务规则。本层不做任何 I/O。

pub mod chat_room;
pub mod errors;
pub mod matching;
pub mod message;
pub mod quota;
pub mod scoring;
pub mod swipe;
pub mod user;
pub mod value_objects;

pub use chat_room::ChatRoom;
pub use errors::{DomainError, RepositoryError};
pub use matching::Match;
pub use message::Message;
pub use quota::MessageQuota;
pub use swipe::{Swipe, SwipeAction};
pub use user::{Gender, ProfileUpdate, User};
pub use value_objects::{
    GeoPoint, MessageContent, MessageId, PairKey, PasswordHash, RoomId, Timestamp, UserEmail,
    UserId, Username,
};
