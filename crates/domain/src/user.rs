use serde::{Deserialize, Serialize};
use time::Date;

use crate::value_objects::{GeoPoint, PasswordHash, Timestamp, UserEmail, UserId, Username};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: UserEmail,
    #[serde(skip_serializing)] // 密码字段不暴露给客户端
    pub password: PasswordHash,
    pub gender: Gender,
    pub bio: String,
    pub interests: Vec<String>,
    pub date_of_birth: Option<Date>,
    pub location: Option<GeoPoint>,
    pub location_updated_at: Option<Timestamp>,
    pub is_premium: bool,
    pub is_banned: bool,
    pub is_verified: bool,
    pub push_token: Option<String>,
    pub last_active_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// 档案更新的字段白名单。
///
/// 只有这里列出的字段可以被客户端修改，逐字段直接赋值，
/// 不做任何按名称反射式的动态更新。
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<Username>,
    pub bio: Option<String>,
    pub gender: Option<Gender>,
    pub interests: Option<Vec<String>>,
    pub date_of_birth: Option<Date>,
}

impl User {
    pub fn register(
        id: UserId,
        username: Username,
        email: UserEmail,
        password: PasswordHash,
        gender: Gender,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            username,
            email,
            password,
            gender,
            bio: String::new(),
            interests: Vec::new(),
            date_of_birth: None,
            location: None,
            location_updated_at: None,
            is_premium: false,
            is_banned: false,
            is_verified: false,
            push_token: None,
            last_active_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_profile_update(&mut self, update: ProfileUpdate, now: Timestamp) {
        if let Some(username) = update.username {
            self.username = username;
        }
        if let Some(bio) = update.bio {
            self.bio = bio;
        }
        if let Some(gender) = update.gender {
            self.gender = gender;
        }
        if let Some(interests) = update.interests {
            self.interests = interests;
        }
        if let Some(date_of_birth) = update.date_of_birth {
            self.date_of_birth = Some(date_of_birth);
        }
        self.updated_at = now;
    }

    pub fn update_location(&mut self, location: GeoPoint, now: Timestamp) {
        self.location = Some(location);
        self.location_updated_at = Some(now);
        self.updated_at = now;
    }

    pub fn set_push_token(&mut self, token: String, now: Timestamp) {
        self.push_token = Some(token);
        self.updated_at = now;
    }

    pub fn touch_active(&mut self, now: Timestamp) {
        self.last_active_at = Some(now);
    }

    pub fn set_premium(&mut self, is_premium: bool, now: Timestamp) {
        self.is_premium = is_premium;
        self.updated_at = now;
    }

    pub fn ban(&mut self, now: Timestamp) {
        self.is_banned = true;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{PasswordHash, UserEmail, UserId, Username};
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn sample_user() -> User {
        User::register(
            UserId::from(Uuid::new_v4()),
            Username::parse("alice").unwrap(),
            UserEmail::parse("alice@example.com").unwrap(),
            PasswordHash::new("$2b$12$hash").unwrap(),
            Gender::Female,
            OffsetDateTime::now_utc(),
        )
    }

    #[test]
    fn profile_update_only_touches_whitelisted_fields() {
        let mut user = sample_user();
        let email_before = user.email.clone();
        let premium_before = user.is_premium;

        user.apply_profile_update(
            ProfileUpdate {
                bio: Some("hello".to_string()),
                interests: Some(vec!["music".to_string(), "travel".to_string()]),
                ..ProfileUpdate::default()
            },
            OffsetDateTime::now_utc(),
        );

        assert_eq!(user.bio, "hello");
        assert_eq!(user.interests, vec!["music", "travel"]);
        // 白名单外的字段保持不变
        assert_eq!(user.email, email_before);
        assert_eq!(user.is_premium, premium_before);
    }

    #[test]
    fn update_location_stamps_timestamp() {
        let mut user = sample_user();
        assert!(user.location.is_none());

        let point = GeoPoint::new(52.52, 13.405).unwrap();
        user.update_location(point, OffsetDateTime::now_utc());

        assert_eq!(user.location, Some(point));
        assert!(user.location_updated_at.is_some());
    }
}
