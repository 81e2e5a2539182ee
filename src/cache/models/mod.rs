//! 缓存数据模型
//! 定义缓存数据的结构体与读取结果类型

pub mod rate_limit;
pub mod session;

// 重新导出常用类型
pub use rate_limit::{RateLimitDecision, RateLimitQuota, RateLimitStatus};
pub use session::{NewSession, SessionRecord, SessionUpdate};

/// 缓存读取结果
/// 区分"未命中"与"存储不可用"，调用方据此决定是否回源
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Hit(T),
    Miss,
    Unavailable,
}

impl<T> Lookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Lookup::Miss)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Lookup::Unavailable)
    }

    /// 命中取值，其余情况折叠为 None
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_into_option_folds_miss_and_unavailable() {
        assert_eq!(Lookup::Hit(1).into_option(), Some(1));
        assert_eq!(Lookup::<i32>::Miss.into_option(), None);
        assert_eq!(Lookup::<i32>::Unavailable.into_option(), None);
        assert!(Lookup::<i32>::Unavailable.is_unavailable());
        assert!(!Lookup::<i32>::Miss.is_hit());
    }
}
