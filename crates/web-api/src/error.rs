use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// 人类可读的错误说明（WebSocket 错误帧直接复用）。
    pub fn message(&self) -> &str {
        &self.body.message
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use application::ApplicationError as AppErr;
        use domain::DomainError;

        match error {
            AppErr::Domain(DomainError::InvalidArgument { field, reason }) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                format!("{}: {}", field, reason),
            ),
            AppErr::Domain(DomainError::InvalidSwipeAction { action }) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_ACTION",
                format!("invalid action: {}", action),
            ),
            AppErr::Domain(DomainError::SelfSwipe) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "SELF_SWIPE",
                "cannot swipe yourself",
            ),
            AppErr::Domain(DomainError::UserNotFound) => {
                ApiError::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "user not found")
            }
            AppErr::Domain(DomainError::UserAlreadyExists) => {
                ApiError::new(StatusCode::CONFLICT, "USER_EXISTS", "user already exists")
            }
            AppErr::Domain(DomainError::UserBanned) => {
                ApiError::new(StatusCode::FORBIDDEN, "ACCOUNT_BANNED", "account banned")
            }
            AppErr::Domain(DomainError::RoomNotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "ROOM_NOT_FOUND",
                "chat room not found",
            ),
            AppErr::Domain(DomainError::NotRoomParticipant) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_ROOM_PARTICIPANT",
                "not a room participant",
            ),
            AppErr::Domain(DomainError::QuotaExceeded) => ApiError::new(
                StatusCode::FORBIDDEN,
                "QUOTA_EXCEEDED",
                "Daily message limit reached. Upgrade to premium for unlimited messages.",
            ),
            AppErr::Repository(repo_err) => match repo_err {
                domain::RepositoryError::NotFound => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "requested resource not found",
                ),
                domain::RepositoryError::Conflict => {
                    ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
                }
                domain::RepositoryError::Storage { message, .. } => ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    format!("database error: {}", message),
                ),
            },
            AppErr::Password(err) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "PASSWORD_ERROR",
                format!("password error: {}", err),
            ),
            AppErr::Authentication => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_FAILED",
                "invalid credentials",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DomainError;

    #[test]
    fn quota_exceeded_maps_to_forbidden() {
        let error = ApiError::from(ApplicationError::Domain(DomainError::QuotaExceeded));
        assert_eq!(error.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn invalid_action_maps_to_bad_request() {
        let error = ApiError::from(ApplicationError::Domain(DomainError::InvalidSwipeAction {
            action: "poke".to_string(),
        }));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn non_participant_maps_to_forbidden() {
        let error = ApiError::from(ApplicationError::Domain(DomainError::NotRoomParticipant));
        assert_eq!(error.status(), StatusCode::FORBIDDEN);
    }
}
