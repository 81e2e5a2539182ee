use serde::{Deserialize, Serialize};

/// 限流配额：滑动窗口长度与窗口内允许的请求数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitQuota {
    pub window_ms: i64,
    pub max_requests: i64,
}

impl RateLimitQuota {
    pub fn new(window_ms: i64, max_requests: i64) -> Self {
        RateLimitQuota {
            window_ms,
            max_requests,
        }
    }
}

/// 单次限流检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: i64,
    pub reset_at_ms: i64,
    pub total_hits: i64,
}

impl RateLimitDecision {
    /// 根据加入当前请求后的窗口计数得出结论
    pub fn from_hits(total_hits: i64, quota: &RateLimitQuota, now_ms: i64) -> Self {
        RateLimitDecision {
            allowed: total_hits <= quota.max_requests,
            remaining: (quota.max_requests - total_hits).max(0),
            reset_at_ms: now_ms + quota.window_ms,
            total_hits,
        }
    }

    /// 存储故障时放行，可用性优先于严格限流
    pub fn fail_open(quota: &RateLimitQuota, now_ms: i64) -> Self {
        RateLimitDecision {
            allowed: true,
            remaining: (quota.max_requests - 1).max(0),
            reset_at_ms: now_ms + quota.window_ms,
            total_hits: 1,
        }
    }
}

/// 只读窗口状态，不记入新请求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub total_hits: i64,
    pub remaining: i64,
    pub reset_at_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTA: RateLimitQuota = RateLimitQuota {
        window_ms: 1000,
        max_requests: 3,
    };

    #[test]
    fn hits_within_quota_are_allowed() {
        let first = RateLimitDecision::from_hits(1, &QUOTA, 10_000);
        assert!(first.allowed);
        assert_eq!(first.remaining, 2);
        assert_eq!(first.reset_at_ms, 11_000);

        let third = RateLimitDecision::from_hits(3, &QUOTA, 10_000);
        assert!(third.allowed);
        assert_eq!(third.remaining, 0);
    }

    #[test]
    fn hits_over_quota_are_denied_with_zero_remaining() {
        let fourth = RateLimitDecision::from_hits(4, &QUOTA, 10_000);
        assert!(!fourth.allowed);
        assert_eq!(fourth.remaining, 0);
        assert_eq!(fourth.total_hits, 4);
    }

    #[test]
    fn fail_open_always_allows() {
        let decision = RateLimitDecision::fail_open(&QUOTA, 10_000);
        assert!(decision.allowed);
        assert_eq!(decision.total_hits, 1);
        assert_eq!(decision.remaining, 2);
    }
}
