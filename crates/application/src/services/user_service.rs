use std::sync::Arc;

use domain::{
    DomainError, Gender, GeoPoint, ProfileUpdate, User, UserEmail, UserId, Username,
};
use time::macros::format_description;
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::ApplicationError,
    password::PasswordHasher,
    repository::UserRepository,
};

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub gender: Gender,
}

#[derive(Debug, Clone)]
pub struct AuthenticateUserRequest {
    pub email: String,
    pub password: String,
}

/// 档案更新请求：字段白名单，缺省字段保持不变。
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub gender: Option<Gender>,
    pub interests: Option<Vec<String>>,
    /// "YYYY-MM-DD"
    pub date_of_birth: Option<String>,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        let username = Username::parse(request.username)?;
        let email = UserEmail::parse(request.email)?;

        if self
            .deps
            .user_repository
            .find_by_email(email.clone())
            .await?
            .is_some()
        {
            return Err(DomainError::UserAlreadyExists.into());
        }

        let password = self.deps.password_hasher.hash(&request.password).await?;
        let now = self.deps.clock.now();
        let user = User::register(
            UserId::from(Uuid::new_v4()),
            username,
            email,
            password,
            request.gender,
            now,
        );

        let stored = self.deps.user_repository.create(user).await?;
        Ok(stored)
    }

    /// 邮箱加密码登录。被封禁的账号直接拒绝。
    pub async fn authenticate(
        &self,
        request: AuthenticateUserRequest,
    ) -> Result<User, ApplicationError> {
        let email = UserEmail::parse(request.email)?;
        let mut user = self
            .deps
            .user_repository
            .find_by_email(email)
            .await?
            .ok_or(ApplicationError::Authentication)?;

        let verified = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password)
            .await?;
        if !verified {
            return Err(ApplicationError::Authentication);
        }

        if user.is_banned {
            return Err(DomainError::UserBanned.into());
        }

        user.touch_active(self.deps.clock.now());
        let stored = self.deps.user_repository.update(user).await?;
        Ok(stored)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(UserId::from(user_id))
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }

    /// 白名单字段逐一直接赋值，其余字段不可经此修改。
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<User, ApplicationError> {
        let mut user = self.get_user(user_id).await?;

        let date_format = format_description!("[year]-[month]-[day]");
        let date_of_birth = match request.date_of_birth {
            Some(raw) => Some(time::Date::parse(&raw, date_format).map_err(|_| {
                DomainError::invalid_argument("date_of_birth", "expected YYYY-MM-DD")
            })?),
            None => None,
        };

        let update = ProfileUpdate {
            username: request.username.map(Username::parse).transpose()?,
            bio: request.bio,
            gender: request.gender,
            interests: request.interests,
            date_of_birth,
        };

        user.apply_profile_update(update, self.deps.clock.now());
        let stored = self.deps.user_repository.update(user).await?;
        Ok(stored)
    }

    pub async fn update_location(
        &self,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<User, ApplicationError> {
        let mut user = self.get_user(user_id).await?;
        let location = GeoPoint::new(latitude, longitude)?;
        user.update_location(location, self.deps.clock.now());
        let stored = self.deps.user_repository.update(user).await?;
        Ok(stored)
    }

    pub async fn save_push_token(
        &self,
        user_id: Uuid,
        token: String,
    ) -> Result<(), ApplicationError> {
        if token.trim().is_empty() {
            return Err(DomainError::invalid_argument("push_token", "cannot be empty").into());
        }
        let mut user = self.get_user(user_id).await?;
        user.set_push_token(token, self.deps.clock.now());
        self.deps.user_repository.update(user).await?;
        Ok(())
    }
}
