use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{Timestamp, UserId};

/// 滑动动作。
///
/// 客户端以字符串提交，通过 [`SwipeAction::parse`] 校验，
/// 非法取值映射为 `InvalidSwipeAction`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "swipe_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Like,
    Dislike,
    Superlike,
}

impl SwipeAction {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            "superlike" => Ok(Self::Superlike),
            other => Err(DomainError::InvalidSwipeAction {
                action: other.to_owned(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::Superlike => "superlike",
        }
    }

    /// like 和 superlike 参与互选检测，dislike 不参与。
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Like | Self::Superlike)
    }
}

/// 一次有方向的滑动。同一 (from, to) 有序对至多一条记录，
/// 重复滑动覆盖 `action` 而不新增行。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swipe {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub action: SwipeAction,
    pub created_at: Timestamp,
}

impl Swipe {
    pub fn new(
        from_user_id: UserId,
        to_user_id: UserId,
        action: SwipeAction,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if from_user_id == to_user_id {
            return Err(DomainError::SelfSwipe);
        }
        Ok(Self {
            from_user_id,
            to_user_id,
            action,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn parse_accepts_known_actions() {
        assert_eq!(SwipeAction::parse("like").unwrap(), SwipeAction::Like);
        assert_eq!(SwipeAction::parse("dislike").unwrap(), SwipeAction::Dislike);
        assert_eq!(
            SwipeAction::parse("superlike").unwrap(),
            SwipeAction::Superlike
        );
    }

    #[test]
    fn parse_rejects_unknown_action() {
        let err = SwipeAction::parse("poke").unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidSwipeAction {
                action: "poke".to_string()
            }
        );
    }

    #[test]
    fn only_like_and_superlike_are_positive() {
        assert!(SwipeAction::Like.is_positive());
        assert!(SwipeAction::Superlike.is_positive());
        assert!(!SwipeAction::Dislike.is_positive());
    }

    #[test]
    fn swipe_rejects_self_target() {
        let id = UserId::from(Uuid::new_v4());
        let result = Swipe::new(id, id, SwipeAction::Like, OffsetDateTime::now_utc());
        assert_eq!(result.unwrap_err(), DomainError::SelfSwipe);
    }
}
