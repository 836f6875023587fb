use serde::{Deserialize, Serialize};
use time::Date;

use crate::errors::DomainError;
use crate::value_objects::UserId;

/// 每用户每日消息配额，首次发送时惰性创建。
///
/// 两种状态：未用尽 / 已用尽，按 UTC 日期翻转。实际的
/// check-and-increment 原子性由存储层（行锁或单写者队列）保证，
/// 这里只承载状态与翻转规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageQuota {
    pub user_id: UserId,
    pub messages_sent_today: u32,
    pub last_reset_date: Date,
}

impl MessageQuota {
    pub fn new(user_id: UserId, today: Date) -> Self {
        Self {
            user_id,
            messages_sent_today: 0,
            last_reset_date: today,
        }
    }

    /// 惰性翻转：上次重置日期不是今天就清零计数。
    pub fn roll_over_if_stale(&mut self, today: Date) {
        if self.last_reset_date != today {
            self.messages_sent_today = 0;
            self.last_reset_date = today;
        }
    }

    pub fn is_exhausted(&self, daily_limit: u32) -> bool {
        self.messages_sent_today >= daily_limit
    }

    /// 翻转后检查限额并计数。超限时状态不变。
    pub fn try_consume(&mut self, daily_limit: u32, today: Date) -> Result<(), DomainError> {
        self.roll_over_if_stale(today);
        if self.is_exhausted(daily_limit) {
            return Err(DomainError::QuotaExceeded);
        }
        self.messages_sent_today += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use uuid::Uuid;

    #[test]
    fn consume_up_to_limit_then_reject() {
        let today = date!(2024 - 06 - 01);
        let mut quota = MessageQuota::new(UserId::from(Uuid::new_v4()), today);

        for _ in 0..5 {
            assert!(quota.try_consume(5, today).is_ok());
        }
        assert_eq!(quota.messages_sent_today, 5);

        let err = quota.try_consume(5, today).unwrap_err();
        assert_eq!(err, DomainError::QuotaExceeded);
        // 失败不改变状态
        assert_eq!(quota.messages_sent_today, 5);
    }

    #[test]
    fn rollover_resets_counter_on_new_day() {
        let yesterday = date!(2024 - 06 - 01);
        let today = date!(2024 - 06 - 02);
        let mut quota = MessageQuota::new(UserId::from(Uuid::new_v4()), yesterday);

        for _ in 0..5 {
            quota.try_consume(5, yesterday).unwrap();
        }
        assert!(quota.try_consume(5, yesterday).is_err());

        // 新的一天，第一次发送重新可用
        assert!(quota.try_consume(5, today).is_ok());
        assert_eq!(quota.messages_sent_today, 1);
        assert_eq!(quota.last_reset_date, today);
    }

    #[test]
    fn rollover_without_send_keeps_counter_zeroed() {
        let yesterday = date!(2024 - 06 - 01);
        let today = date!(2024 - 06 - 02);
        let mut quota = MessageQuota::new(UserId::from(Uuid::new_v4()), yesterday);
        quota.try_consume(5, yesterday).unwrap();

        quota.roll_over_if_stale(today);
        assert_eq!(quota.messages_sent_today, 0);
        assert_eq!(quota.last_reset_date, today);
    }
}
