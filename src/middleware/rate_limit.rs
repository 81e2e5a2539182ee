use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::cache::{RateLimitDecision, RateLimitQuota, RateLimiter};

/// 限流守卫：按客户端 IP 应用滑动窗口限流
/// 把检查结果翻译成标准响应头，超限时返回 429
#[derive(Clone)]
pub struct RateLimitGuard {
    limiter: RateLimiter,
    quota: RateLimitQuota,
}

#[derive(Serialize)]
struct RateLimitBody {
    code: i32,
    error_message: String,
}

impl RateLimitGuard {
    pub fn new(limiter: RateLimiter) -> Self {
        let quota = limiter.default_quota();
        RateLimitGuard { limiter, quota }
    }

    pub fn with_quota(limiter: RateLimiter, quota: RateLimitQuota) -> Self {
        RateLimitGuard { limiter, quota }
    }

    pub async fn check_rate_limit(
        self: Arc<Self>,
        req: Request<Body>,
        next: Next,
    ) -> Result<Response, StatusCode> {
        let ip = client_ip(&req);

        let decision = self.limiter.check(&ip, &self.quota).await;

        if !decision.allowed {
            let retry_after_secs = retry_after_secs(&decision);
            tracing::debug!("rate limit exceeded for {}: {} hits", ip, decision.total_hits);
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(RateLimitBody {
                    code: StatusCode::TOO_MANY_REQUESTS.as_u16() as i32,
                    error_message: format!("请求过于频繁，请在{}秒后重试", retry_after_secs),
                }),
            )
                .into_response();
            apply_headers(&mut response, &self.quota, &decision);
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
            return Ok(response);
        }

        let mut response = next.run(req).await;
        apply_headers(&mut response, &self.quota, &decision);
        Ok(response)
    }
}

/// 中间件入口，配合 axum from_fn_with_state 使用
pub async fn rate_limit(
    State(guard): State<Arc<RateLimitGuard>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    guard.check_rate_limit(req, next).await
}

/// 从请求头中获取客户端 IP，降级使用连接信息中的 IP
fn client_ip(req: &Request<Body>) -> String {
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    req.headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or_else(|| remote_ip.as_deref())
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

fn retry_after_secs(decision: &RateLimitDecision) -> i64 {
    let now_ms = chrono::Utc::now().timestamp_millis();
    ((decision.reset_at_ms - now_ms).max(0) + 999) / 1000
}

fn apply_headers(response: &mut Response, quota: &RateLimitQuota, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    let entries = [
        ("X-RateLimit-Limit", quota.max_requests.to_string()),
        ("X-RateLimit-Remaining", decision.remaining.to_string()),
        ("X-RateLimit-Reset", (decision.reset_at_ms / 1000).to_string()),
    ];
    for (name, value) in entries {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let decision = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at_ms: now_ms + 1500,
            total_hits: 4,
        };
        let secs = retry_after_secs(&decision);
        assert!(secs >= 1 && secs <= 2);
    }

    #[test]
    fn retry_after_never_negative() {
        let decision = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at_ms: 0,
            total_hits: 4,
        };
        assert_eq!(retry_after_secs(&decision), 0);
    }
}
