//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理输入校验、事务边界、
//! 以及对外部适配器（密码哈希、房间广播、推送通知）的抽象。

pub mod broadcaster;
pub mod clock;
pub mod dto;
pub mod error;
pub mod notifier;
pub mod password;
pub mod repository;
pub mod services;

pub use broadcaster::{BroadcastError, ChatFrame, MessageBroadcaster};
pub use clock::{Clock, SystemClock};
pub use dto::{MatchDto, MessageDto, RoomDto, SwipeDto, UserDto};
pub use error::ApplicationError;
pub use notifier::{
    notify_best_effort, NotificationDispatcher, NotificationKind, NotifyError, PushNotification,
};
pub use password::{PasswordHasher, PasswordHasherError};
pub use repository::{
    ChatRoomRepository, MatchRepository, MessageRepository, PairRecords, QuotaDecision,
    QuotaRepository, SwipeRepository, UserRepository,
};
pub use services::{
    ChatService, ChatServiceDependencies, QuotaService, QuotaServiceDependencies,
    RecordSwipeRequest, SendMessageRequest, SuggestionService, SuggestionServiceDependencies,
    SwipeOutcome, SwipeService, SwipeServiceDependencies, UserService, UserServiceDependencies,
};
