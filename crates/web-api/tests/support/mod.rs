use std::sync::Arc;

use application::{
    ChatService, ChatServiceDependencies, QuotaService, QuotaServiceDependencies, SuggestionService,
    SuggestionServiceDependencies, SwipeService, SwipeServiceDependencies, SystemClock, UserService,
    UserServiceDependencies,
};
use config::JwtConfig;
use infrastructure::{
    BcryptPasswordHasher, InMemoryStore, RecordingNotificationDispatcher, RoomChannelRegistry,
};
use web_api::{router, AppState, JwtService};

pub struct TestApp {
    pub base_url: String,
    pub store: Arc<InMemoryStore>,
    pub dispatcher: Arc<RecordingNotificationDispatcher>,
}

impl TestApp {
    pub fn ws_url(&self, room_id: &str, token: &str) -> String {
        format!(
            "{}/ws/rooms/{}?token={}",
            self.base_url.replacen("http", "ws", 1),
            room_id,
            token
        )
    }
}

/// 启动一个完整的进程内服务：内存后端 + 随机端口。
pub async fn spawn_app(daily_limit: u32) -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let dispatcher = Arc::new(RecordingNotificationDispatcher::new());
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock);
    let broadcaster = Arc::new(RoomChannelRegistry::new(64));
    // 低成本 bcrypt，只为测试速度
    let password_hasher: Arc<dyn application::PasswordHasher> =
        Arc::new(BcryptPasswordHasher::new(4));

    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: store.clone(),
        password_hasher,
        clock: clock.clone(),
    }));

    let quota_service = Arc::new(QuotaService::new(QuotaServiceDependencies {
        quota_repository: store.clone(),
        clock: clock.clone(),
        daily_limit,
    }));

    let swipe_service = Arc::new(SwipeService::new(SwipeServiceDependencies {
        user_repository: store.clone(),
        swipe_repository: store.clone(),
        match_repository: store.clone(),
        notifier: dispatcher.clone(),
        clock: clock.clone(),
    }));

    let suggestion_service = Arc::new(SuggestionService::new(SuggestionServiceDependencies {
        user_repository: store.clone(),
        swipe_repository: store.clone(),
    }));

    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        room_repository: store.clone(),
        message_repository: store.clone(),
        user_repository: store.clone(),
        quota_service: quota_service.clone(),
        broadcaster: broadcaster.clone(),
        notifier: dispatcher.clone(),
        clock,
    }));

    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        secret: "test-secret-key-with-at-least-32-characters".to_string(),
        expiration_hours: 24,
    }));

    let state = AppState {
        user_service,
        swipe_service,
        suggestion_service,
        chat_service,
        quota_service,
        broadcaster,
        jwt_service,
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    TestApp {
        base_url: format!("http://{}", addr),
        store,
        dispatcher,
    }
}

/// 注册一个用户，返回 (user_id, token)。
pub async fn register_user(
    client: &reqwest::Client,
    base_url: &str,
    name: &str,
) -> (uuid::Uuid, String) {
    let response = client
        .post(format!("{}/api/v1/auth/register", base_url))
        .json(&serde_json::json!({
            "username": name,
            "email": format!("{}@example.com", name),
            "password": "secret-password",
            "gender": "other"
        }))
        .send()
        .await
        .expect("register request")
        .json::<serde_json::Value>()
        .await
        .expect("register json");

    let user_id = response["user"]["id"]
        .as_str()
        .expect("user id in register response")
        .parse()
        .expect("uuid");
    let token = response["token"]
        .as_str()
        .expect("token in register response")
        .to_owned();
    (user_id, token)
}
