use serde::{Deserialize, Serialize};

use crate::value_objects::{PairKey, Timestamp};

/// 互选配对的持久记录。
///
/// 每个无序用户对至多一条，创建后不再变更，也不会被本核心删除。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub pair: PairKey,
    pub created_at: Timestamp,
}

impl Match {
    pub fn new(pair: PairKey, now: Timestamp) -> Self {
        Self {
            pair,
            created_at: now,
        }
    }
}
