use std::sync::Arc;

use domain::{ChatRoom, DomainError, Match, PairKey, RoomId, Swipe, SwipeAction, UserId};
use serde_json::json;
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::ApplicationError,
    notifier::{notify_best_effort, NotificationDispatcher, NotificationKind, PushNotification},
    repository::{MatchRepository, SwipeRepository, UserRepository},
};

#[derive(Debug, Clone)]
pub struct RecordSwipeRequest {
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    /// 原始动作字符串，由服务端解析校验。
    pub action: String,
}

#[derive(Debug, Clone)]
pub struct SwipeOutcome {
    pub swipe: Swipe,
    pub is_match: bool,
    pub room: Option<ChatRoom>,
}

pub struct SwipeServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub swipe_repository: Arc<dyn SwipeRepository>,
    pub match_repository: Arc<dyn MatchRepository>,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub clock: Arc<dyn Clock>,
}

pub struct SwipeService {
    deps: SwipeServiceDependencies,
}

impl SwipeService {
    pub fn new(deps: SwipeServiceDependencies) -> Self {
        Self { deps }
    }

    /// 记录一次滑动并检测互选。
    ///
    /// 互选时对规范化用户对执行原子 create-if-absent：双向并发滑动
    /// 各自都会走到这一步，输掉唯一约束竞争的一方拿到与赢家相同的
    /// 配对与房间，两边都观察到 `is_match = true`。
    pub async fn record_swipe(
        &self,
        request: RecordSwipeRequest,
    ) -> Result<SwipeOutcome, ApplicationError> {
        let action = SwipeAction::parse(&request.action)?;
        let from_user_id = UserId::from(request.from_user_id);
        let to_user_id = UserId::from(request.to_user_id);

        if from_user_id == to_user_id {
            return Err(DomainError::SelfSwipe.into());
        }

        let target = self
            .deps
            .user_repository
            .find_by_id(to_user_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        let now = self.deps.clock.now();
        let swipe = Swipe::new(from_user_id, to_user_id, action, now)?;
        let stored = self.deps.swipe_repository.upsert(swipe).await?;

        if !action.is_positive() {
            return Ok(SwipeOutcome {
                swipe: stored,
                is_match: false,
                room: None,
            });
        }

        let reverse = self
            .deps
            .swipe_repository
            .find(to_user_id, from_user_id)
            .await?;

        let Some(_reverse) = reverse.filter(|swipe| swipe.action.is_positive()) else {
            return Ok(SwipeOutcome {
                swipe: stored,
                is_match: false,
                room: None,
            });
        };

        let pair = PairKey::new(from_user_id, to_user_id)?;
        let records = self
            .deps
            .match_repository
            .get_or_create(pair, RoomId::from(Uuid::new_v4()), now)
            .await?;

        if records.created {
            let requester = self.deps.user_repository.find_by_id(from_user_id).await?;
            let requester_name = requester
                .map(|user| user.username.as_str().to_owned())
                .unwrap_or_default();
            self.notify_matched_pair(
                &records.room,
                (from_user_id, target.username.as_str()),
                (to_user_id, &requester_name),
            )
            .await;
        }

        Ok(SwipeOutcome {
            swipe: stored,
            is_match: true,
            room: Some(records.room),
        })
    }

    pub async fn list_matches(&self, user_id: Uuid) -> Result<Vec<Match>, ApplicationError> {
        let matches = self
            .deps
            .match_repository
            .list_for_user(UserId::from(user_id))
            .await?;
        Ok(matches)
    }

    /// 双方各收到一条，内容里带上对方的名字；失败只记日志。
    async fn notify_matched_pair(
        &self,
        room: &ChatRoom,
        first: (UserId, &str),
        second: (UserId, &str),
    ) {
        let payload = json!({ "room_id": Uuid::from(room.id) });

        for (recipient, peer_name) in [first, second] {
            notify_best_effort(
                self.deps.notifier.as_ref(),
                PushNotification {
                    user_id: recipient,
                    kind: NotificationKind::Match,
                    title: "New Match! 💕".to_owned(),
                    body: format!("You matched with {}!", peer_name),
                    payload: payload.clone(),
                },
            )
            .await;
        }
    }
}
