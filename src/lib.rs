use std::sync::Arc;

pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod middleware;
pub mod routes;

pub use cache::{CacheStore, Lookup, RateLimiter, SessionStore};
pub use config::RedisConfig;
pub use connection::RedisConnectionManager;
pub use error::{InfraError, InfraResult};

/// 基础设施层状态
/// 进程启动时构造一次，三条连接全程共享，各业务模块按需克隆
#[derive(Clone)]
pub struct InfraState {
    pub connection: Arc<RedisConnectionManager>,
    pub cache: CacheStore,
    pub sessions: SessionStore,
    pub rate_limiter: RateLimiter,
    pub config: RedisConfig,
}

impl InfraState {
    /// 建立连接并装配各个存储组件
    /// 连接失败向上传播，进程应当中止启动
    pub async fn init(config: RedisConfig) -> InfraResult<Self> {
        let connection = Arc::new(RedisConnectionManager::connect(&config).await?);

        Ok(InfraState {
            cache: CacheStore::new(connection.clone(), &config),
            sessions: SessionStore::new(connection.clone(), &config),
            rate_limiter: RateLimiter::new(connection.clone(), &config),
            connection,
            config,
        })
    }

    /// 优雅关闭全部连接
    pub async fn shutdown(&self) {
        self.connection.shutdown().await;
    }
}
