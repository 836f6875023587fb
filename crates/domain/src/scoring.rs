//! 候选推荐打分规则。
//!
//! 距离、共同兴趣、活跃度三个信号加权合成一个确定性的总分。
//! 兴趣分无上界、活跃分只有 0/50 两档是沿用的源系统口径，
//! 不做归一化或时间衰减。

use std::collections::HashSet;

use crate::user::User;
use crate::value_objects::{GeoPoint, Timestamp};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

const DISTANCE_WEIGHT: f64 = 0.4;
const INTEREST_WEIGHT: f64 = 0.3;
const ACTIVITY_WEIGHT: f64 = 0.3;

/// 大圆距离（haversine），单位公里。
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (dlon / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// 100 公里外饱和为 0，距离 0 时为 100。
pub fn distance_score(distance_km: f64) -> f64 {
    (100.0 - distance_km).max(0.0)
}

/// 每个共同兴趣 10 分，不设上限。
pub fn interest_score(requester: &[String], candidate: &[String]) -> f64 {
    let requester: HashSet<&str> = requester.iter().map(String::as_str).collect();
    let candidate: HashSet<&str> = candidate.iter().map(String::as_str).collect();
    requester.intersection(&candidate).count() as f64 * 10.0
}

/// 有过任何活跃记录 50 分，否则 0。
pub fn activity_score(last_active_at: Option<Timestamp>) -> f64 {
    if last_active_at.is_some() {
        50.0
    } else {
        0.0
    }
}

/// 综合匹配分。双方任一缺少地理位置时返回 None（调用方会把这类
/// 候选排除在地理分支之外）。
pub fn match_score(requester: &User, candidate: &User) -> Option<f64> {
    let requester_location = requester.location?;
    let candidate_location = candidate.location?;

    let distance = haversine_km(requester_location, candidate_location);
    let total = DISTANCE_WEIGHT * distance_score(distance)
        + INTEREST_WEIGHT * interest_score(&requester.interests, &candidate.interests)
        + ACTIVITY_WEIGHT * activity_score(candidate.last_active_at);

    Some(total)
}
