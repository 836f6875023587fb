use std::collections::HashSet;
use std::sync::Arc;

use domain::{scoring, DomainError, User, UserId};
use uuid::Uuid;

use crate::{
    error::ApplicationError,
    repository::{SwipeRepository, UserRepository},
};

pub const DEFAULT_SUGGESTION_LIMIT: usize = 20;

pub struct SuggestionServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub swipe_repository: Arc<dyn SwipeRepository>,
}

pub struct SuggestionService {
    deps: SuggestionServiceDependencies,
}

impl SuggestionService {
    pub fn new(deps: SuggestionServiceDependencies) -> Self {
        Self { deps }
    }

    /// 为请求者生成排序后的候选列表。
    ///
    /// 候选池排除本人、被封禁用户、以及请求者已滑过的任何人。
    /// 请求者没有地理位置时返回 id 升序的前 `limit` 个；有位置时
    /// 按综合分降序排序，分数相同按 id 升序，没有位置的候选人
    /// 完全不进入地理分支的结果。
    pub async fn rank(
        &self,
        requester_id: Uuid,
        limit: usize,
    ) -> Result<Vec<User>, ApplicationError> {
        let requester = self
            .deps
            .user_repository
            .find_by_id(UserId::from(requester_id))
            .await?
            .ok_or(DomainError::UserNotFound)?;

        let swiped: HashSet<UserId> = self
            .deps
            .swipe_repository
            .list_swiped_ids(requester.id)
            .await?
            .into_iter()
            .collect();

        // list_candidates 已排除本人与被封禁用户，并保证 id 升序
        let pool: Vec<User> = self
            .deps
            .user_repository
            .list_candidates(requester.id)
            .await?
            .into_iter()
            .filter(|candidate| !swiped.contains(&candidate.id))
            .collect();

        if requester.location.is_none() {
            return Ok(pool.into_iter().take(limit).collect());
        }

        let mut scored: Vec<(User, f64)> = pool
            .into_iter()
            .filter_map(|candidate| {
                scoring::match_score(&requester, &candidate).map(|score| (candidate, score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(candidate, _)| candidate)
            .collect())
    }
}
