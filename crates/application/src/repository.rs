use async_trait::async_trait;
use domain::{
    ChatRoom, Match, Message, PairKey, RepositoryError, RoomId, Swipe, Timestamp, User, UserEmail,
    UserId,
};
use time::Date;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError>;

    /// 推荐候选池：排除请求者本人与被封禁用户，按 id 升序返回。
    /// 没有地理位置的请求者直接按这个确定性顺序取前 N 个。
    async fn list_candidates(&self, requester: UserId) -> Result<Vec<User>, RepositoryError>;
}

#[async_trait]
pub trait SwipeRepository: Send + Sync {
    /// 同一 (from, to) 有序对冲突时只覆盖 action，保留首次 created_at。
    async fn upsert(&self, swipe: Swipe) -> Result<Swipe, RepositoryError>;
    async fn find(&self, from: UserId, to: UserId) -> Result<Option<Swipe>, RepositoryError>;
    async fn list_swiped_ids(&self, from: UserId) -> Result<Vec<UserId>, RepositoryError>;
}

/// 规范化用户对名下的配对与聊天室，同一事务创建。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairRecords {
    pub match_record: Match,
    pub room: ChatRoom,
    /// 本次调用是否真正新建了记录；输掉创建竞争的一方拿到 false，
    /// 但返回的行与赢家完全相同。
    pub created: bool,
}

#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// 原子 create-if-absent：Match 与 ChatRoom 以规范对为键一起创建。
    /// 唯一约束冲突不是错误，归一化为已存在的行返回。
    async fn get_or_create(
        &self,
        pair: PairKey,
        new_room_id: RoomId,
        now: Timestamp,
    ) -> Result<PairRecords, RepositoryError>;

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Match>, RepositoryError>;
}

#[async_trait]
pub trait ChatRoomRepository: Send + Sync {
    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError>;
    async fn list_for_user(&self, user: UserId) -> Result<Vec<ChatRoom>, RepositoryError>;
    async fn touch(&self, id: RoomId, now: Timestamp) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError>;

    /// 全量历史，按 (created_at, id) 升序。
    async fn list_for_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError>;
}

/// 原子 check-and-increment 的判定结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed { sent_today: u32 },
    Exhausted,
}

#[async_trait]
pub trait QuotaRepository: Send + Sync {
    /// 惰性建行 + 惰性翻转 + 限额判定 + 计数，整体按用户串行化
    /// （Postgres 行锁，内存实现单把锁）。两条访问路径共用。
    async fn consume(
        &self,
        user_id: UserId,
        today: Date,
        daily_limit: u32,
    ) -> Result<QuotaDecision, RepositoryError>;

    /// 外部调度器每日触发：清零所有过期计数，返回受影响行数。
    async fn reset_stale(&self, today: Date) -> Result<u64, RepositoryError>;
}
