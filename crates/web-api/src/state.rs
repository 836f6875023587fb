use std::sync::Arc;

use application::{ChatService, QuotaService, SuggestionService, SwipeService, UserService};
use infrastructure::RoomChannelRegistry;

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub swipe_service: Arc<SwipeService>,
    pub suggestion_service: Arc<SuggestionService>,
    pub chat_service: Arc<ChatService>,
    pub quota_service: Arc<QuotaService>,
    /// WebSocket 连接订阅用的具体注册表；服务内部只持有其 trait 视图
    pub broadcaster: Arc<RoomChannelRegistry>,
    pub jwt_service: Arc<JwtService>,
}
