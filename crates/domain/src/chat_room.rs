use serde::{Deserialize, Serialize};

use crate::value_objects::{PairKey, RoomId, Timestamp, UserId};

/// 一对配对用户的聊天室。
///
/// 与 Match 同键、同事务创建，生命周期 1:1，没有配对就没有聊天室。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: RoomId,
    pub pair: PairKey,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ChatRoom {
    pub fn new(id: RoomId, pair: PairKey, now: Timestamp) -> Self {
        Self {
            id,
            pair,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.pair.contains(user_id)
    }

    /// 对端参与者；`user_id` 不在房间内时返回 None。
    pub fn peer_of(&self, user_id: UserId) -> Option<UserId> {
        self.pair.peer_of(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn membership_check_covers_both_participants_only() {
        let a = UserId::from(Uuid::new_v4());
        let b = UserId::from(Uuid::new_v4());
        let stranger = UserId::from(Uuid::new_v4());
        let pair = PairKey::new(a, b).unwrap();
        let room = ChatRoom::new(RoomId::from(Uuid::new_v4()), pair, OffsetDateTime::now_utc());

        assert!(room.has_participant(a));
        assert!(room.has_participant(b));
        assert!(!room.has_participant(stranger));
        assert_eq!(room.peer_of(a), Some(b));
        assert_eq!(room.peer_of(stranger), None);
    }
}
