use domain::{ChatRoom, Gender, Match, Message, Swipe, SwipeAction, Timestamp, User};
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub gender: Gender,
    pub bio: String,
    pub interests: Vec<String>,
    pub date_of_birth: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_premium: bool,
    pub is_verified: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_active_at: Option<Timestamp>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        let date_format = format_description!("[year]-[month]-[day]");
        Self {
            id: Uuid::from(user.id),
            username: user.username.as_str().to_owned(),
            email: user.email.as_str().to_owned(),
            gender: user.gender,
            bio: user.bio.clone(),
            interests: user.interests.clone(),
            date_of_birth: user
                .date_of_birth
                .and_then(|date| date.format(date_format).ok()),
            latitude: user.location.map(|point| point.latitude),
            longitude: user.location.map(|point| point.longitude),
            is_premium: user.is_premium,
            is_verified: user.is_verified,
            last_active_at: user.last_active_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeDto {
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub action: SwipeAction,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

impl From<&Swipe> for SwipeDto {
    fn from(swipe: &Swipe) -> Self {
        Self {
            from_user_id: Uuid::from(swipe.from_user_id),
            to_user_id: Uuid::from(swipe.to_user_id),
            action: swipe.action,
            created_at: swipe.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDto {
    pub user_low_id: Uuid,
    pub user_high_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

impl From<&Match> for MatchDto {
    fn from(record: &Match) -> Self {
        Self {
            user_low_id: Uuid::from(record.pair.low()),
            user_high_id: Uuid::from(record.pair.high()),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDto {
    pub id: Uuid,
    pub user_low_id: Uuid,
    pub user_high_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: Timestamp,
}

impl From<&ChatRoom> for RoomDto {
    fn from(room: &ChatRoom) -> Self {
        Self {
            id: Uuid::from(room.id),
            user_low_id: Uuid::from(room.pair.low()),
            user_high_id: Uuid::from(room.pair.high()),
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: Uuid::from(message.id),
            room_id: Uuid::from(message.room_id),
            sender_id: Uuid::from(message.sender_id),
            content: message.content.as_str().to_owned(),
            is_read: message.is_read,
            created_at: message.created_at,
        }
    }
}
