use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::CacheStore;
use crate::error::InfraError;

/// 按 (组件, 方法, 参数) 派生缓存键，供读接口声明式使用
pub fn endpoint_cache_key(component: &str, method: &str, args: &[&str]) -> String {
    if args.is_empty() {
        format!("{}:{}", component, method)
    } else {
        format!("{}:{}:{}", component, method, args.join(":"))
    }
}

/// 读接口的旁路缓存包装：命中直接返回，未命中执行查询并写回
pub async fn cached<T, E, F, Fut>(
    store: &CacheStore,
    component: &str,
    method: &str,
    args: &[&str],
    ttl_secs: Option<u64>,
    query: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    E: From<InfraError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let key = endpoint_cache_key(component, method, args);
    store.get_or_set(&key, ttl_secs, None, query).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_derivation() {
        assert_eq!(endpoint_cache_key("expense", "list", &[]), "expense:list");
        assert_eq!(
            endpoint_cache_key("expense", "find", &["u1", "2024-01"]),
            "expense:find:u1:2024-01"
        );
    }
}
