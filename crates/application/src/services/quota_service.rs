use std::sync::Arc;

use domain::{DomainError, User};

use crate::{
    clock::Clock,
    error::ApplicationError,
    repository::{QuotaDecision, QuotaRepository},
};

pub struct QuotaServiceDependencies {
    pub quota_repository: Arc<dyn QuotaRepository>,
    pub clock: Arc<dyn Clock>,
    /// 非会员每日免费消息数。
    pub daily_limit: u32,
}

/// 每用户每日消息配额。
///
/// 同步请求路径和长连接路径都经由这里；check-and-increment 的
/// 按用户原子性由仓储实现保证（见 QuotaRepository）。
pub struct QuotaService {
    deps: QuotaServiceDependencies,
}

impl QuotaService {
    pub fn new(deps: QuotaServiceDependencies) -> Self {
        Self { deps }
    }

    pub fn daily_limit(&self) -> u32 {
        self.deps.daily_limit
    }

    /// 会员无条件放行且不触碰配额状态；其余用户原子扣减。
    pub async fn try_consume(&self, user: &User) -> Result<(), ApplicationError> {
        if user.is_premium {
            return Ok(());
        }

        let today = self.deps.clock.today();
        let decision = self
            .deps
            .quota_repository
            .consume(user.id, today, self.deps.daily_limit)
            .await?;

        match decision {
            QuotaDecision::Allowed { .. } => Ok(()),
            QuotaDecision::Exhausted => Err(DomainError::QuotaExceeded.into()),
        }
    }

    /// 外部调度器的每日安全网：清零所有过期计数。
    pub async fn reset_stale(&self) -> Result<u64, ApplicationError> {
        let today = self.deps.clock.today();
        let affected = self.deps.quota_repository.reset_stale(today).await?;
        tracing::info!(affected, "stale message quotas reset");
        Ok(affected)
    }
}
