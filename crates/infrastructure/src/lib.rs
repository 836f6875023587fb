//! 基础设施层。
//!
//! PostgreSQL 仓储实现、按房间扇出的广播注册表、bcrypt 密码哈希、
//! 推送通知客户端，以及测试与本地开发用的内存后端。

pub mod broadcast;
pub mod memory;
pub mod password;
pub mod push;
pub mod repository;

pub use broadcast::RoomChannelRegistry;
pub use memory::{InMemoryStore, RecordingNotificationDispatcher};
pub use password::BcryptPasswordHasher;
pub use push::{FcmNotificationDispatcher, PushConfig};
pub use repository::{
    create_pg_pool, PgChatRoomRepository, PgMatchRepository, PgMessageRepository,
    PgQuotaRepository, PgStorage, PgSwipeRepository, PgUserRepository,
};
