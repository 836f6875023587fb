use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageContent, MessageId, RoomId, Timestamp, UserId};

/// 聊天消息。追加写入，创建后除已读标记外不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: MessageContent,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(
        id: MessageId,
        room_id: RoomId,
        sender_id: UserId,
        content: MessageContent,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            room_id,
            sender_id,
            content,
            is_read: false,
            created_at,
        }
    }

    pub fn mark_read(&mut self) {
        self.is_read = true;
    }
}
