use thiserror::Error;

/// 领域错误类型
///
/// 所有错误都是可恢复的局部错误，调用方收到后系统状态保持一致。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid argument: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("invalid swipe action: {action}")]
    InvalidSwipeAction { action: String },

    #[error("cannot swipe yourself")]
    SelfSwipe,

    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("account banned")]
    UserBanned,

    #[error("chat room not found")]
    RoomNotFound,

    #[error("not a room participant")]
    NotRoomParticipant,

    #[error("daily message limit reached")]
    QuotaExceeded,
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 存储层错误类型
///
/// 配对创建的唯一约束冲突不会以 `Conflict` 的形式离开存储层，
/// 仓储实现会将其归一化为已存在的行（见 MatchRepository）。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated")]
    Conflict,

    #[error("storage failure: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
