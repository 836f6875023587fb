use async_trait::async_trait;
use domain::{Message, RoomId, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// 房间内广播的线上帧。
///
/// `message` 帧发给房间的所有订阅连接（包括发送者自己，用于客户端
/// 回显确认）；`error` 帧只发给出错的那一条连接，从不广播。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatFrame {
    Message {
        message: String,
        sender_id: Uuid,
        sender_name: String,
        message_id: Uuid,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: Timestamp,
    },
    Error {
        message: String,
    },
}

impl ChatFrame {
    pub fn message(message: &Message, sender_name: &str) -> Self {
        Self::Message {
            message: message.content.as_str().to_owned(),
            sender_id: Uuid::from(message.sender_id),
            sender_name: sender_name.to_owned(),
            message_id: Uuid::from(message.id),
            timestamp: message.created_at,
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            message: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast failed: {0}")]
    Failed(String),
}

impl BroadcastError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// 按房间扇出的广播端口。
///
/// 实现方维护房间键到订阅连接集合的映射；广播对慢订阅者不阻塞，
/// 掉线的订阅者由自身的接收端清理。
#[async_trait]
pub trait MessageBroadcaster: Send + Sync {
    async fn broadcast(&self, room_id: RoomId, frame: ChatFrame) -> Result<(), BroadcastError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{MessageContent, MessageId, UserId};
    use time::macros::datetime;

    #[test]
    fn message_frame_serializes_with_type_tag() {
        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            RoomId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            MessageContent::new("hi").unwrap(),
            datetime!(2024-06-01 12:00:00 UTC),
        );
        let frame = ChatFrame::message(&message, "alice");
        let json: serde_json::Value = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["type"], "message");
        assert_eq!(json["message"], "hi");
        assert_eq!(json["sender_name"], "alice");
        assert_eq!(json["timestamp"], "2024-06-01T12:00:00Z");
    }

    #[test]
    fn error_frame_serializes_with_type_tag() {
        let frame = ChatFrame::error("daily message limit reached");
        let json: serde_json::Value = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "daily message limit reached");
    }
}
