//! 内存后端。
//!
//! 与 PostgreSQL 实现同一套仓储端口，用于测试和无数据库的本地
//! 开发。所有表共享一把锁，create-if-absent 与配额扣减天然原子。

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use application::{
    ChatRoomRepository, MatchRepository, MessageRepository, NotificationDispatcher, NotifyError,
    PairRecords, PushNotification, QuotaDecision, QuotaRepository, SwipeRepository, UserRepository,
};
use async_trait::async_trait;
use domain::{
    ChatRoom, Match, Message, MessageQuota, PairKey, RepositoryError, RoomId, Swipe, Timestamp,
    User, UserEmail, UserId,
};
use time::Date;
use uuid::Uuid;

#[derive(Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    swipes: HashMap<(UserId, UserId), Swipe>,
    matches: HashMap<PairKey, Match>,
    rooms: HashMap<RoomId, ChatRoom>,
    rooms_by_pair: HashMap<PairKey, RoomId>,
    messages: Vec<Message>,
    quotas: HashMap<UserId, MessageQuota>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 测试辅助：当前配对总数。
    pub fn match_count(&self) -> usize {
        self.lock().matches.len()
    }

    /// 测试辅助：当前消息总数。
    pub fn message_count(&self) -> usize {
        self.lock().messages.len()
    }

    /// 测试辅助：某用户的配额行（可能尚未惰性创建）。
    pub fn quota_for(&self, user_id: UserId) -> Option<MessageQuota> {
        self.lock().quotas.get(&user_id).copied()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut state = self.lock();
        if state
            .users
            .values()
            .any(|existing| existing.email == user.email)
        {
            return Err(RepositoryError::Conflict);
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut state = self.lock();
        if !state.users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn list_candidates(&self, requester: UserId) -> Result<Vec<User>, RepositoryError> {
        let mut candidates: Vec<User> = self
            .lock()
            .users
            .values()
            .filter(|user| user.id != requester && !user.is_banned)
            .cloned()
            .collect();
        candidates.sort_by_key(|user| user.id);
        Ok(candidates)
    }
}

#[async_trait]
impl SwipeRepository for InMemoryStore {
    async fn upsert(&self, swipe: Swipe) -> Result<Swipe, RepositoryError> {
        let mut state = self.lock();
        let key = (swipe.from_user_id, swipe.to_user_id);
        let stored = match state.swipes.get(&key) {
            // 已有记录：覆盖 action，保留首次 created_at
            Some(existing) => Swipe {
                action: swipe.action,
                created_at: existing.created_at,
                ..swipe
            },
            None => swipe,
        };
        state.swipes.insert(key, stored.clone());
        Ok(stored)
    }

    async fn find(&self, from: UserId, to: UserId) -> Result<Option<Swipe>, RepositoryError> {
        Ok(self.lock().swipes.get(&(from, to)).cloned())
    }

    async fn list_swiped_ids(&self, from: UserId) -> Result<Vec<UserId>, RepositoryError> {
        Ok(self
            .lock()
            .swipes
            .values()
            .filter(|swipe| swipe.from_user_id == from)
            .map(|swipe| swipe.to_user_id)
            .collect())
    }
}

#[async_trait]
impl MatchRepository for InMemoryStore {
    async fn get_or_create(
        &self,
        pair: PairKey,
        new_room_id: RoomId,
        now: Timestamp,
    ) -> Result<PairRecords, RepositoryError> {
        // 整段在锁内完成，与 Postgres 的事务 + 唯一约束等价
        let mut state = self.lock();

        if let Some(existing) = state.matches.get(&pair).copied() {
            let room_id = state
                .rooms_by_pair
                .get(&pair)
                .copied()
                .ok_or(RepositoryError::NotFound)?;
            let room = state
                .rooms
                .get(&room_id)
                .copied()
                .ok_or(RepositoryError::NotFound)?;
            return Ok(PairRecords {
                match_record: existing,
                room,
                created: false,
            });
        }

        let match_record = Match::new(pair, now);
        let room = ChatRoom::new(new_room_id, pair, now);
        state.matches.insert(pair, match_record);
        state.rooms.insert(room.id, room);
        state.rooms_by_pair.insert(pair, room.id);

        Ok(PairRecords {
            match_record,
            room,
            created: true,
        })
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Match>, RepositoryError> {
        let mut matches: Vec<Match> = self
            .lock()
            .matches
            .values()
            .filter(|record| record.pair.contains(user))
            .copied()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }
}

#[async_trait]
impl ChatRoomRepository for InMemoryStore {
    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        Ok(self.lock().rooms.get(&id).copied())
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<ChatRoom>, RepositoryError> {
        let mut rooms: Vec<ChatRoom> = self
            .lock()
            .rooms
            .values()
            .filter(|room| room.has_participant(user))
            .copied()
            .collect();
        rooms.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rooms)
    }

    async fn touch(&self, id: RoomId, now: Timestamp) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let room = state.rooms.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        room.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        self.lock().messages.push(message.clone());
        Ok(message)
    }

    async fn list_for_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError> {
        let mut messages: Vec<Message> = self
            .lock()
            .messages
            .iter()
            .filter(|message| message.room_id == room_id)
            .cloned()
            .collect();
        messages.sort_by_key(|message| (message.created_at, Uuid::from(message.id)));
        Ok(messages)
    }
}

#[async_trait]
impl QuotaRepository for InMemoryStore {
    async fn consume(
        &self,
        user_id: UserId,
        today: Date,
        daily_limit: u32,
    ) -> Result<QuotaDecision, RepositoryError> {
        let mut state = self.lock();
        let quota = state
            .quotas
            .entry(user_id)
            .or_insert_with(|| MessageQuota::new(user_id, today));

        quota.roll_over_if_stale(today);
        if quota.is_exhausted(daily_limit) {
            return Ok(QuotaDecision::Exhausted);
        }

        quota.messages_sent_today += 1;
        Ok(QuotaDecision::Allowed {
            sent_today: quota.messages_sent_today,
        })
    }

    async fn reset_stale(&self, today: Date) -> Result<u64, RepositoryError> {
        let mut state = self.lock();
        let mut affected = 0;
        for quota in state.quotas.values_mut() {
            if quota.last_reset_date != today {
                quota.messages_sent_today = 0;
                quota.last_reset_date = today;
                affected += 1;
            }
        }
        Ok(affected)
    }
}

/// 测试用推送派发器：记录所有通知，可选地模拟失败。
#[derive(Default)]
pub struct RecordingNotificationDispatcher {
    sent: Mutex<Vec<PushNotification>>,
    fail: bool,
}

impl RecordingNotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<PushNotification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotificationDispatcher {
    async fn notify(&self, notification: PushNotification) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::dispatch("simulated outage"));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}
