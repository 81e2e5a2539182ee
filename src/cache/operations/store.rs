use std::future::Future;
use std::sync::Arc;

use redis::AsyncCommands;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::keys;
use crate::cache::models::Lookup;
use crate::config::RedisConfig;
use crate::connection::RedisConnectionManager;
use crate::error::{InfraError, InfraResult};

/// 通用缓存操作
/// 值统一以 JSON 字符串存储，每个条目都带过期时间
/// 读失败降级为未命中，写失败向上传播
#[derive(Clone)]
pub struct CacheStore {
    conn: Arc<RedisConnectionManager>,
    namespace: String,
    default_ttl_secs: u64,
}

impl CacheStore {
    pub fn new(conn: Arc<RedisConnectionManager>, config: &RedisConfig) -> Self {
        CacheStore {
            conn,
            namespace: config.key_prefix.clone(),
            default_ttl_secs: config.default_ttl_secs,
        }
    }

    fn full_key(&self, key: &str, prefix: Option<&str>) -> String {
        keys::cache_key(&self.namespace, prefix, key)
    }

    /// 写入缓存，未指定 TTL 时使用默认值
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: Option<u64>,
        prefix: Option<&str>,
    ) -> InfraResult<()> {
        let full_key = self.full_key(key, prefix);
        let json = serde_json::to_string(value)?;
        let ttl = ttl_secs.unwrap_or(self.default_ttl_secs);

        let mut conn = self.conn.command();
        let _: () = conn
            .set_ex(&full_key, json, ttl)
            .await
            .map_err(InfraError::Write)?;

        Ok(())
    }

    /// 读取缓存
    /// 未命中、读错误、反序列化失败都不抛错，调用方回源即可
    pub async fn get<T: DeserializeOwned>(&self, key: &str, prefix: Option<&str>) -> Lookup<T> {
        let full_key = self.full_key(key, prefix);
        let mut conn = self.conn.command();

        let result: Result<Option<String>, redis::RedisError> = conn.get(&full_key).await;
        match result {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(value) => Lookup::Hit(value),
                Err(e) => {
                    tracing::warn!("cache value corrupt, treating as miss: {} ({})", full_key, e);
                    Lookup::Miss
                }
            },
            Ok(None) => Lookup::Miss,
            Err(e) => {
                tracing::warn!("cache GET failed: {} ({})", full_key, e);
                Lookup::Unavailable
            }
        }
    }

    /// 删除缓存，尽力而为，失败只记日志
    pub async fn del(&self, key: &str, prefix: Option<&str>) -> bool {
        let full_key = self.full_key(key, prefix);
        let mut conn = self.conn.command();

        let removed: Result<i64, redis::RedisError> = conn.del(&full_key).await;
        match removed {
            Ok(count) => count > 0,
            Err(e) => {
                tracing::warn!("cache DEL failed: {} ({})", full_key, e);
                false
            }
        }
    }

    /// 键是否存在，读错误视为不存在
    pub async fn exists(&self, key: &str, prefix: Option<&str>) -> bool {
        let full_key = self.full_key(key, prefix);
        let mut conn = self.conn.command();

        let exists: Result<bool, redis::RedisError> = conn.exists(&full_key).await;
        match exists {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!("cache EXISTS failed: {} ({})", full_key, e);
                false
            }
        }
    }

    /// 剩余过期秒数，键不存在、无过期或读错误都返回 None
    pub async fn ttl(&self, key: &str, prefix: Option<&str>) -> Option<i64> {
        let full_key = self.full_key(key, prefix);
        let mut conn = self.conn.command();

        let ttl: Result<i64, redis::RedisError> = conn.ttl(&full_key).await;
        match ttl {
            Ok(secs) if secs >= 0 => Some(secs),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("cache TTL failed: {} ({})", full_key, e);
                None
            }
        }
    }

    /// 原子自增
    pub async fn incr(&self, key: &str, delta: i64, prefix: Option<&str>) -> InfraResult<i64> {
        let full_key = self.full_key(key, prefix);
        let mut conn = self.conn.command();

        let value: i64 = conn
            .incr(&full_key, delta)
            .await
            .map_err(InfraError::Write)?;
        Ok(value)
    }

    /// 自增并设置过期，两条命令在一个事务中执行
    pub async fn incr_with_expire(
        &self,
        key: &str,
        delta: i64,
        ttl_secs: u64,
        prefix: Option<&str>,
    ) -> InfraResult<i64> {
        let full_key = self.full_key(key, prefix);
        let mut conn = self.conn.command();

        let (value,): (i64,) = redis::pipe()
            .atomic()
            .incr(&full_key, delta)
            .expire(&full_key, ttl_secs as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(InfraError::Write)?;

        Ok(value)
    }

    /// 批量读取，一次 MGET
    /// 传输错误时全部槽位标记为不可用
    pub async fn mget<T: DeserializeOwned>(
        &self,
        keys: &[&str],
        prefix: Option<&str>,
    ) -> Vec<Lookup<T>> {
        if keys.is_empty() {
            return Vec::new();
        }

        let mut conn = self.conn.command();
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(self.full_key(key, prefix));
        }

        let values: Result<Vec<Option<String>>, redis::RedisError> =
            cmd.query_async(&mut conn).await;
        match values {
            Ok(values) => values
                .into_iter()
                .map(|slot| match slot {
                    Some(json) => match serde_json::from_str(&json) {
                        Ok(value) => Lookup::Hit(value),
                        Err(_) => Lookup::Miss,
                    },
                    None => Lookup::Miss,
                })
                .collect(),
            Err(e) => {
                tracing::warn!("cache MGET failed: {}", e);
                keys.iter().map(|_| Lookup::Unavailable).collect()
            }
        }
    }

    /// 批量写入，流水线减少往返，失败向上传播
    pub async fn mset<T: Serialize>(
        &self,
        entries: &[(&str, T)],
        ttl_secs: Option<u64>,
        prefix: Option<&str>,
    ) -> InfraResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let ttl = ttl_secs.unwrap_or(self.default_ttl_secs);
        let mut pipe = redis::pipe();
        for (key, value) in entries {
            let json = serde_json::to_string(value)?;
            pipe.set_ex(self.full_key(key, prefix), json, ttl).ignore();
        }

        let mut conn = self.conn.command();
        let _: () = pipe.query_async(&mut conn).await.map_err(InfraError::Write)?;

        Ok(())
    }

    /// 按通配模式删除，基于 SCAN 游标增量扫描，避免阻塞整个键空间
    pub async fn del_pattern(&self, pattern: &str, prefix: Option<&str>) -> InfraResult<u64> {
        let full_pattern = self.full_key(pattern, prefix);
        let mut conn = self.conn.command();

        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&full_pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(InfraError::Write)?;

            if !batch.is_empty() {
                let mut cmd = redis::cmd("DEL");
                for key in &batch {
                    cmd.arg(key);
                }
                let count: i64 = cmd.query_async(&mut conn).await.map_err(InfraError::Write)?;
                deleted += count as u64;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(deleted)
    }

    /// 旁路缓存：未命中时执行工厂函数，写回后返回
    /// 工厂失败不缓存任何值，错误原样传播
    /// 同键并发未命中会各自执行一次工厂函数，没有去重保证
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_secs: Option<u64>,
        prefix: Option<&str>,
        factory: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<InfraError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Lookup::Hit(value) = self.get(key, prefix).await {
            return Ok(value);
        }

        let value = factory().await?;
        self.set(key, &value, ttl_secs, prefix).await.map_err(E::from)?;
        Ok(value)
    }
}
