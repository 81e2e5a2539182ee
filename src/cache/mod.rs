// 缓存基础设施模块
// 包含键生成、数据模型和缓存操作逻辑

pub mod keys;
pub mod models;
pub mod operations;

// 重新导出常用类型和操作，方便其他模块使用
pub use models::{
    Lookup, NewSession, RateLimitDecision, RateLimitQuota, RateLimitStatus, SessionRecord,
    SessionUpdate,
};
pub use operations::{CacheStore, RateLimiter, SessionStore};
