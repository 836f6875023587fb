use std::sync::Arc;

use application::{
    ChatRoomRepository, MatchRepository, MessageRepository, PairRecords, QuotaDecision,
    QuotaRepository, SwipeRepository, UserRepository,
};
use async_trait::async_trait;
use domain::{
    ChatRoom, Gender, GeoPoint, Match, Message, MessageContent, MessageId, MessageQuota, PairKey,
    RepositoryError, RoomId, Swipe, SwipeAction, Timestamp, User, UserEmail, UserId,
};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    gender: Gender,
    bio: String,
    interests: Json<Vec<String>>,
    date_of_birth: Option<Date>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    location_updated_at: Option<OffsetDateTime>,
    is_premium: bool,
    is_banned: bool,
    is_verified: bool,
    push_token: Option<String>,
    last_active_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let username =
            domain::Username::parse(value.username).map_err(|err| invalid_data(err.to_string()))?;
        let email =
            domain::UserEmail::parse(value.email).map_err(|err| invalid_data(err.to_string()))?;
        let password = domain::PasswordHash::new(value.password_hash)
            .map_err(|err| invalid_data(err.to_string()))?;

        let location = match (value.latitude, value.longitude) {
            (Some(latitude), Some(longitude)) => Some(
                GeoPoint::new(latitude, longitude).map_err(|err| invalid_data(err.to_string()))?,
            ),
            _ => None,
        };

        Ok(User {
            id: UserId::from(value.id),
            username,
            email,
            password,
            gender: value.gender,
            bio: value.bio,
            interests: value.interests.0,
            date_of_birth: value.date_of_birth,
            location,
            location_updated_at: value.location_updated_at,
            is_premium: value.is_premium,
            is_banned: value.is_banned,
            is_verified: value.is_verified,
            push_token: value.push_token,
            last_active_at: value.last_active_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, gender, bio, interests, \
     date_of_birth, latitude, longitude, location_updated_at, is_premium, is_banned, \
     is_verified, push_token, last_active_at, created_at, updated_at";

#[derive(Debug, FromRow)]
struct SwipeRecord {
    from_user_id: Uuid,
    to_user_id: Uuid,
    action: SwipeAction,
    created_at: OffsetDateTime,
}

impl From<SwipeRecord> for Swipe {
    fn from(value: SwipeRecord) -> Self {
        Swipe {
            from_user_id: UserId::from(value.from_user_id),
            to_user_id: UserId::from(value.to_user_id),
            action: value.action,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PairRecord {
    user_low_id: Uuid,
    user_high_id: Uuid,
    match_created_at: OffsetDateTime,
    room_id: Uuid,
    room_created_at: OffsetDateTime,
    room_updated_at: OffsetDateTime,
}

impl TryFrom<PairRecord> for PairRecords {
    type Error = RepositoryError;

    fn try_from(value: PairRecord) -> Result<Self, Self::Error> {
        let pair = PairKey::new(
            UserId::from(value.user_low_id),
            UserId::from(value.user_high_id),
        )
        .map_err(|err| invalid_data(err.to_string()))?;

        Ok(PairRecords {
            match_record: Match {
                pair,
                created_at: value.match_created_at,
            },
            room: ChatRoom {
                id: RoomId::from(value.room_id),
                pair,
                created_at: value.room_created_at,
                updated_at: value.room_updated_at,
            },
            created: false,
        })
    }
}

#[derive(Debug, FromRow)]
struct RoomRecord {
    id: Uuid,
    user_low_id: Uuid,
    user_high_id: Uuid,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<RoomRecord> for ChatRoom {
    type Error = RepositoryError;

    fn try_from(value: RoomRecord) -> Result<Self, Self::Error> {
        let pair = PairKey::new(
            UserId::from(value.user_low_id),
            UserId::from(value.user_high_id),
        )
        .map_err(|err| invalid_data(err.to_string()))?;

        Ok(ChatRoom {
            id: RoomId::from(value.id),
            pair,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    room_id: Uuid,
    sender_id: Uuid,
    content: String,
    is_read: bool,
    created_at: OffsetDateTime,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let content =
            MessageContent::new(value.content).map_err(|err| invalid_data(err.to_string()))?;
        let mut message = Message::new(
            MessageId::from(value.id),
            RoomId::from(value.room_id),
            UserId::from(value.sender_id),
            content,
            value.created_at,
        );
        if value.is_read {
            message.mark_read();
        }
        Ok(message)
    }
}

#[derive(Debug, FromRow)]
struct QuotaRecord {
    user_id: Uuid,
    messages_sent_today: i32,
    last_reset_date: Date,
}

impl From<QuotaRecord> for MessageQuota {
    fn from(value: QuotaRecord) -> Self {
        MessageQuota {
            user_id: UserId::from(value.user_id),
            messages_sent_today: value.messages_sent_today.max(0) as u32,
            last_reset_date: value.last_reset_date,
        }
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, username, email, password_hash, gender, bio, interests,
                date_of_birth, latitude, longitude, location_updated_at, is_premium, is_banned,
                is_verified, push_token, last_active_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING id, username, email, password_hash, gender, bio, interests,
                date_of_birth, latitude, longitude, location_updated_at, is_premium, is_banned,
                is_verified, push_token, last_active_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(user.gender)
        .bind(&user.bio)
        .bind(Json(&user.interests))
        .bind(user.date_of_birth)
        .bind(user.location.map(|point| point.latitude))
        .bind(user.location.map(|point| point.longitude))
        .bind(user.location_updated_at)
        .bind(user.is_premium)
        .bind(user.is_banned)
        .bind(user.is_verified)
        .bind(&user.push_token)
        .bind(user.last_active_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, gender = $5, bio = $6,
                interests = $7, date_of_birth = $8, latitude = $9, longitude = $10,
                location_updated_at = $11, is_premium = $12, is_banned = $13, is_verified = $14,
                push_token = $15, last_active_at = $16, updated_at = $17
            WHERE id = $1
            RETURNING id, username, email, password_hash, gender, bio, interests,
                date_of_birth, latitude, longitude, location_updated_at, is_premium, is_banned,
                is_verified, push_token, last_active_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(user.gender)
        .bind(&user.bio)
        .bind(Json(&user.interests))
        .bind(user.date_of_birth)
        .bind(user.location.map(|point| point.latitude))
        .bind(user.location.map(|point| point.longitude))
        .bind(user.location_updated_at)
        .bind(user.is_premium)
        .bind(user.is_banned)
        .bind(user.is_verified)
        .bind(&user.push_token)
        .bind(user.last_active_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn list_candidates(&self, requester: UserId) -> Result<Vec<User>, RepositoryError> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id <> $1 AND is_banned = FALSE ORDER BY id ASC",
            USER_COLUMNS
        ))
        .bind(Uuid::from(requester))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(User::try_from).collect()
    }
}

#[derive(Clone)]
pub struct PgSwipeRepository {
    pool: PgPool,
}

impl PgSwipeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SwipeRepository for PgSwipeRepository {
    async fn upsert(&self, swipe: Swipe) -> Result<Swipe, RepositoryError> {
        // 冲突时只覆盖 action，created_at 保留首次滑动的时间
        let record = sqlx::query_as::<_, SwipeRecord>(
            r#"
            INSERT INTO swipes (from_user_id, to_user_id, action, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (from_user_id, to_user_id)
            DO UPDATE SET action = EXCLUDED.action
            RETURNING from_user_id, to_user_id, action, created_at
            "#,
        )
        .bind(Uuid::from(swipe.from_user_id))
        .bind(Uuid::from(swipe.to_user_id))
        .bind(swipe.action)
        .bind(swipe.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(Swipe::from(record))
    }

    async fn find(&self, from: UserId, to: UserId) -> Result<Option<Swipe>, RepositoryError> {
        let record = sqlx::query_as::<_, SwipeRecord>(
            r#"SELECT from_user_id, to_user_id, action, created_at
               FROM swipes WHERE from_user_id = $1 AND to_user_id = $2"#,
        )
        .bind(Uuid::from(from))
        .bind(Uuid::from(to))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Swipe::from))
    }

    async fn list_swiped_ids(&self, from: UserId) -> Result<Vec<UserId>, RepositoryError> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar(r#"SELECT to_user_id FROM swipes WHERE from_user_id = $1"#)
                .bind(Uuid::from(from))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        Ok(ids.into_iter().map(UserId::from).collect())
    }
}

#[derive(Clone)]
pub struct PgMatchRepository {
    pool: PgPool,
}

impl PgMatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MatchRepository for PgMatchRepository {
    async fn get_or_create(
        &self,
        pair: PairKey,
        new_room_id: RoomId,
        now: Timestamp,
    ) -> Result<PairRecords, RepositoryError> {
        // 配对与房间在同一事务内 create-if-absent。并发的双向互选
        // 都会走到这里：第二个事务的 ON CONFLICT DO NOTHING 等待第一个
        // 提交后空转，随后读到赢家写入的同一行。
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO matches (user_low_id, user_high_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_low_id, user_high_id) DO NOTHING
            "#,
        )
        .bind(Uuid::from(pair.low()))
        .bind(Uuid::from(pair.high()))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query(
            r#"
            INSERT INTO chat_rooms (id, user_low_id, user_high_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (user_low_id, user_high_id) DO NOTHING
            "#,
        )
        .bind(Uuid::from(new_room_id))
        .bind(Uuid::from(pair.low()))
        .bind(Uuid::from(pair.high()))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let record = sqlx::query_as::<_, PairRecord>(
            r#"
            SELECT m.user_low_id, m.user_high_id, m.created_at AS match_created_at,
                   r.id AS room_id, r.created_at AS room_created_at, r.updated_at AS room_updated_at
            FROM matches m
            JOIN chat_rooms r
              ON r.user_low_id = m.user_low_id AND r.user_high_id = m.user_high_id
            WHERE m.user_low_id = $1 AND m.user_high_id = $2
            "#,
        )
        .bind(Uuid::from(pair.low()))
        .bind(Uuid::from(pair.high()))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;

        let mut records = PairRecords::try_from(record)?;
        records.created = inserted.rows_affected() > 0;
        Ok(records)
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Match>, RepositoryError> {
        #[derive(FromRow)]
        struct MatchRecord {
            user_low_id: Uuid,
            user_high_id: Uuid,
            created_at: OffsetDateTime,
        }

        let records = sqlx::query_as::<_, MatchRecord>(
            r#"SELECT user_low_id, user_high_id, created_at
               FROM matches
               WHERE user_low_id = $1 OR user_high_id = $1
               ORDER BY created_at DESC"#,
        )
        .bind(Uuid::from(user))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records
            .into_iter()
            .map(|record| {
                let pair = PairKey::new(
                    UserId::from(record.user_low_id),
                    UserId::from(record.user_high_id),
                )
                .map_err(|err| invalid_data(err.to_string()))?;
                Ok(Match {
                    pair,
                    created_at: record.created_at,
                })
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct PgChatRoomRepository {
    pool: PgPool,
}

impl PgChatRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRoomRepository for PgChatRoomRepository {
    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(
            r#"SELECT id, user_low_id, user_high_id, created_at, updated_at
               FROM chat_rooms WHERE id = $1"#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(ChatRoom::try_from).transpose()
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<ChatRoom>, RepositoryError> {
        let records = sqlx::query_as::<_, RoomRecord>(
            r#"SELECT id, user_low_id, user_high_id, created_at, updated_at
               FROM chat_rooms
               WHERE user_low_id = $1 OR user_high_id = $1
               ORDER BY updated_at DESC"#,
        )
        .bind(Uuid::from(user))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(ChatRoom::try_from).collect()
    }

    async fn touch(&self, id: RoomId, now: Timestamp) -> Result<(), RepositoryError> {
        sqlx::query(r#"UPDATE chat_rooms SET updated_at = $2 WHERE id = $1"#)
            .bind(Uuid::from(id))
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (id, room_id, sender_id, content, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, room_id, sender_id, content, is_read, created_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.room_id))
        .bind(Uuid::from(message.sender_id))
        .bind(message.content.as_str())
        .bind(message.is_read)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn list_for_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"SELECT id, room_id, sender_id, content, is_read, created_at
               FROM messages
               WHERE room_id = $1
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(Uuid::from(room_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }
}

#[derive(Clone)]
pub struct PgQuotaRepository {
    pool: PgPool,
}

impl PgQuotaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaRepository for PgQuotaRepository {
    async fn consume(
        &self,
        user_id: UserId,
        today: Date,
        daily_limit: u32,
    ) -> Result<QuotaDecision, RepositoryError> {
        // check-and-increment 整体放进一个事务，行锁把同一用户的
        // 并发调用（同步路径 + 长连接路径）串行化
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        sqlx::query(
            r#"
            INSERT INTO message_quotas (user_id, messages_sent_today, last_reset_date)
            VALUES ($1, 0, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::from(user_id))
        .bind(today)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let record = sqlx::query_as::<_, QuotaRecord>(
            r#"SELECT user_id, messages_sent_today, last_reset_date
               FROM message_quotas WHERE user_id = $1 FOR UPDATE"#,
        )
        .bind(Uuid::from(user_id))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let mut quota = MessageQuota::from(record);
        quota.roll_over_if_stale(today);

        if quota.is_exhausted(daily_limit) {
            tx.rollback().await.map_err(map_sqlx_err)?;
            return Ok(QuotaDecision::Exhausted);
        }

        quota.messages_sent_today += 1;

        sqlx::query(
            r#"UPDATE message_quotas
               SET messages_sent_today = $2, last_reset_date = $3
               WHERE user_id = $1"#,
        )
        .bind(Uuid::from(user_id))
        .bind(quota.messages_sent_today as i32)
        .bind(quota.last_reset_date)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;

        Ok(QuotaDecision::Allowed {
            sent_today: quota.messages_sent_today,
        })
    }

    async fn reset_stale(&self, today: Date) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE message_quotas
               SET messages_sent_today = 0, last_reset_date = $1
               WHERE last_reset_date <> $1"#,
        )
        .bind(today)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
    pub user_repository: Arc<PgUserRepository>,
    pub swipe_repository: Arc<PgSwipeRepository>,
    pub match_repository: Arc<PgMatchRepository>,
    pub room_repository: Arc<PgChatRoomRepository>,
    pub message_repository: Arc<PgMessageRepository>,
    pub quota_repository: Arc<PgQuotaRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            user_repository: Arc::new(PgUserRepository::new(pool.clone())),
            swipe_repository: Arc::new(PgSwipeRepository::new(pool.clone())),
            match_repository: Arc::new(PgMatchRepository::new(pool.clone())),
            room_repository: Arc::new(PgChatRoomRepository::new(pool.clone())),
            message_repository: Arc::new(PgMessageRepository::new(pool.clone())),
            quota_repository: Arc::new(PgQuotaRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
