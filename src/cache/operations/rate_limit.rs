use std::sync::Arc;

use futures_util::future::join_all;
use uuid::Uuid;

use crate::cache::keys;
use crate::cache::models::{RateLimitDecision, RateLimitQuota, RateLimitStatus};
use crate::config::RedisConfig;
use crate::connection::RedisConnectionManager;
use crate::error::{InfraError, InfraResult};

/// 滑动窗口日志限流器
/// 每个请求在有序集合里留一条按毫秒时间戳打分的标记，
/// 窗口内标记数即为精确的请求计数
#[derive(Clone)]
pub struct RateLimiter {
    conn: Arc<RedisConnectionManager>,
    namespace: String,
    default_quota: RateLimitQuota,
}

impl RateLimiter {
    pub fn new(conn: Arc<RedisConnectionManager>, config: &RedisConfig) -> Self {
        RateLimiter {
            conn,
            namespace: config.key_prefix.clone(),
            default_quota: RateLimitQuota::new(
                config.rate_limit_window_ms,
                config.rate_limit_max_requests,
            ),
        }
    }

    pub fn default_quota(&self) -> RateLimitQuota {
        self.default_quota
    }

    fn window_key(&self, identifier: &str) -> String {
        keys::rate_limit_key(&self.namespace, identifier)
    }

    /// 检查并记入一次请求
    /// 清理过期标记、写入当前标记、计数、续期四步在一个事务中原子执行，
    /// 并发调用不会读到同一个计数
    /// 超限的请求同样留下标记：持续超限会让窗口保持饱和，而不是白白重试
    /// 存储故障时放行（fail-open），可用性优先
    pub async fn check(&self, identifier: &str, quota: &RateLimitQuota) -> RateLimitDecision {
        let key = self.window_key(identifier);
        let now_ms = chrono::Utc::now().timestamp_millis();
        let cutoff = now_ms - quota.window_ms;
        // 同一毫秒的并发请求靠随机后缀区分
        let member = format!("{}-{}", now_ms, Uuid::new_v4().simple());

        let mut conn = self.conn.command();
        let result: Result<(i64,), redis::RedisError> = redis::pipe()
            .atomic()
            .zrembyscore(&key, "-inf", format!("({}", cutoff))
            .ignore()
            .zadd(&key, &member, now_ms)
            .ignore()
            .zcard(&key)
            .pexpire(&key, quota.window_ms)
            .ignore()
            .query_async(&mut conn)
            .await;

        match result {
            Ok((total_hits,)) => RateLimitDecision::from_hits(total_hits, quota, now_ms),
            Err(e) => {
                tracing::warn!("rate limit check failed, failing open: {} ({})", key, e);
                RateLimitDecision::fail_open(quota, now_ms)
            }
        }
    }

    /// 只读窗口状态：清理过期标记后计数，不记入新请求
    pub async fn status(&self, identifier: &str, quota: &RateLimitQuota) -> RateLimitStatus {
        let key = self.window_key(identifier);
        let now_ms = chrono::Utc::now().timestamp_millis();
        let cutoff = now_ms - quota.window_ms;

        let mut conn = self.conn.command();
        let result: Result<(i64,), redis::RedisError> = redis::pipe()
            .atomic()
            .zrembyscore(&key, "-inf", format!("({}", cutoff))
            .ignore()
            .zcard(&key)
            .query_async(&mut conn)
            .await;

        let total_hits = match result {
            Ok((count,)) => count,
            Err(e) => {
                tracing::warn!("rate limit status failed: {} ({})", key, e);
                0
            }
        };

        RateLimitStatus {
            total_hits,
            remaining: (quota.max_requests - total_hits).max(0),
            reset_at_ms: now_ms + quota.window_ms,
        }
    }

    /// 清空某个标识的窗口
    pub async fn reset(&self, identifier: &str) -> InfraResult<()> {
        let key = self.window_key(identifier);
        let mut conn = self.conn.command();

        let _: i64 = redis::cmd("DEL")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(InfraError::Write)?;
        Ok(())
    }

    /// 并发检查多个标识，结果顺序与入参一致，单个失败各自放行
    pub async fn check_many(
        &self,
        identifiers: &[&str],
        quota: &RateLimitQuota,
    ) -> Vec<RateLimitDecision> {
        let checks = identifiers.iter().map(|id| self.check(id, quota));
        join_all(checks).await
    }
}
