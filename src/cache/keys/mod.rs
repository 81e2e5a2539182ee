//! 缓存键生成
//! 键格式：{命名空间}{前缀:}{逻辑键}

/// 会话记录键前缀
const SESSION_PREFIX: &str = "session:";

/// 用户会话索引键前缀
const USER_SESSIONS_PREFIX: &str = "user_sessions:";

/// 限流窗口键前缀
const RATE_LIMIT_PREFIX: &str = "rate_limit:";

/// 生成通用缓存键，前缀可选
pub fn cache_key(namespace: &str, prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}{}:{}", namespace, prefix, key),
        None => format!("{}{}", namespace, key),
    }
}

/// 生成会话记录键
pub fn session_key(namespace: &str, session_id: &str) -> String {
    format!("{}{}{}", namespace, SESSION_PREFIX, session_id)
}

/// 生成用户会话索引键
pub fn user_sessions_key(namespace: &str, user_id: &str) -> String {
    format!("{}{}{}", namespace, USER_SESSIONS_PREFIX, user_id)
}

/// 生成用户会话索引扫描模式
pub fn user_sessions_pattern(namespace: &str) -> String {
    format!("{}{}*", namespace, USER_SESSIONS_PREFIX)
}

/// 生成限流窗口键
pub fn rate_limit_key(namespace: &str, identifier: &str) -> String {
    format!("{}{}{}", namespace, RATE_LIMIT_PREFIX, identifier)
}
