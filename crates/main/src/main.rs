//! 主应用程序入口
//!
//! 加载配置、连接数据库并启动 Axum Web API 服务。

use std::sync::Arc;

use application::{
    ChatService, ChatServiceDependencies, QuotaService, QuotaServiceDependencies,
    SuggestionService, SuggestionServiceDependencies, SwipeService, SwipeServiceDependencies,
    SystemClock, UserService, UserServiceDependencies,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, BcryptPasswordHasher, FcmNotificationDispatcher, PgStorage, PushConfig,
    RoomChannelRegistry,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();
    config.validate().map_err(|err| anyhow::anyhow!(err))?;

    tracing::info!(
        database = config.database.url.split('@').next_back().unwrap_or("unknown"),
        "connecting to database"
    );

    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    let storage = PgStorage::new(pg_pool);

    let password_hasher: Arc<dyn application::PasswordHasher> = match config.server.bcrypt_cost {
        Some(cost) => Arc::new(BcryptPasswordHasher::new(cost)),
        None => Arc::new(BcryptPasswordHasher::default()),
    };
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock);
    let broadcaster = Arc::new(RoomChannelRegistry::new(config.broadcast.capacity));

    let notifier = Arc::new(FcmNotificationDispatcher::new(
        PushConfig {
            endpoint: config.push.endpoint.clone(),
            server_key: config.push.server_key.clone(),
        },
        storage.user_repository.clone(),
    ));

    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: storage.user_repository.clone(),
        password_hasher,
        clock: clock.clone(),
    }));

    let quota_service = Arc::new(QuotaService::new(QuotaServiceDependencies {
        quota_repository: storage.quota_repository.clone(),
        clock: clock.clone(),
        daily_limit: config.quota.free_messages_per_day,
    }));

    let swipe_service = Arc::new(SwipeService::new(SwipeServiceDependencies {
        user_repository: storage.user_repository.clone(),
        swipe_repository: storage.swipe_repository.clone(),
        match_repository: storage.match_repository.clone(),
        notifier: notifier.clone(),
        clock: clock.clone(),
    }));

    let suggestion_service = Arc::new(SuggestionService::new(SuggestionServiceDependencies {
        user_repository: storage.user_repository.clone(),
        swipe_repository: storage.swipe_repository.clone(),
    }));

    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        room_repository: storage.room_repository.clone(),
        message_repository: storage.message_repository.clone(),
        user_repository: storage.user_repository.clone(),
        quota_service: quota_service.clone(),
        broadcaster: broadcaster.clone(),
        notifier,
        clock,
    }));

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

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
    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!("datematch server listening on http://{}", address);
    axum::serve(listener, app).await?;

    Ok(())
}
