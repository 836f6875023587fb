mod chat_service;
mod quota_service;
mod suggestion_service;
mod swipe_service;
mod user_service;

pub use chat_service::{ChatService, ChatServiceDependencies, SendMessageRequest};
pub use quota_service::{QuotaService, QuotaServiceDependencies};
pub use suggestion_service::{
    SuggestionService, SuggestionServiceDependencies, DEFAULT_SUGGESTION_LIMIT,
};
pub use swipe_service::{RecordSwipeRequest, SwipeOutcome, SwipeService, SwipeServiceDependencies};
pub use user_service::{
    AuthenticateUserRequest, RegisterUserRequest, UpdateProfileRequest, UserService,
    UserServiceDependencies,
};
