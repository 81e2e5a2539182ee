use std::env;
use std::time::Duration;

/// Redis 基础设施配置
/// 所有配置项都有安全默认值，可直接用于本地开发
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
    /// 全局键命名空间，默认 "bifrost:"
    pub key_prefix: String,
    pub connect_timeout_ms: u64,
    pub command_timeout_ms: u64,
    pub reconnect_retries: usize,
    pub max_reconnect_delay_ms: u64,
    pub default_ttl_secs: u64,
    pub session_ttl_secs: u64,
    pub rate_limit_window_ms: i64,
    pub rate_limit_max_requests: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            db: 0,
            key_prefix: "bifrost:".to_string(),
            connect_timeout_ms: 5000,
            command_timeout_ms: 3000,
            reconnect_retries: 6,
            max_reconnect_delay_ms: 30_000,
            default_ttl_secs: 3600,
            session_ttl_secs: 7 * 24 * 3600,
            rate_limit_window_ms: 60_000,
            rate_limit_max_requests: 100,
        }
    }
}

impl RedisConfig {
    /// 从环境变量加载配置，缺失项使用默认值
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = RedisConfig::default();

        RedisConfig {
            host: env::var("REDIS_HOST").unwrap_or(defaults.host),
            port: parse_var("REDIS_PORT", defaults.port),
            password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            db: parse_var("REDIS_DB", defaults.db),
            key_prefix: env::var("REDIS_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            connect_timeout_ms: parse_var("REDIS_CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms),
            command_timeout_ms: parse_var("REDIS_COMMAND_TIMEOUT_MS", defaults.command_timeout_ms),
            reconnect_retries: parse_var("REDIS_RECONNECT_RETRIES", defaults.reconnect_retries),
            max_reconnect_delay_ms: parse_var(
                "REDIS_MAX_RECONNECT_DELAY_MS",
                defaults.max_reconnect_delay_ms,
            ),
            default_ttl_secs: parse_var("CACHE_DEFAULT_TTL_SECS", defaults.default_ttl_secs),
            session_ttl_secs: parse_var("SESSION_TTL_SECS", defaults.session_ttl_secs),
            rate_limit_window_ms: parse_var("RATE_LIMIT_WINDOW_MS", defaults.rate_limit_window_ms),
            rate_limit_max_requests: parse_var(
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit_max_requests,
            ),
        }
    }

    /// 构造 redis 连接 URL
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_local_redis() {
        let config = RedisConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 6379);
        assert_eq!(config.db, 0);
        assert_eq!(config.key_prefix, "bifrost:");
        assert_eq!(config.default_ttl_secs, 3600);
        assert_eq!(config.session_ttl_secs, 604_800);
    }

    #[test]
    fn url_without_password() {
        let config = RedisConfig::default();
        assert_eq!(config.url(), "redis://localhost:6379/0");
    }

    #[test]
    fn url_with_password_and_db() {
        let config = RedisConfig {
            password: Some("secret".to_string()),
            db: 2,
            ..RedisConfig::default()
        };
        assert_eq!(config.url(), "redis://:secret@localhost:6379/2");
    }
}
