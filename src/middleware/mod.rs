mod cache_aside;
mod rate_limit;

pub use cache_aside::{cached, endpoint_cache_key};
pub use rate_limit::{RateLimitGuard, rate_limit};
