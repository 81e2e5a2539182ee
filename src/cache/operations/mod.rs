/// 缓存操作
/// 提供通用缓存、会话存储与限流器的实现

pub mod rate_limit;
pub mod session;
pub mod store;

// 重新导出常用操作
pub use rate_limit::RateLimiter;
pub use session::SessionStore;
pub use store::CacheStore;
