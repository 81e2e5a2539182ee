use std::sync::Arc;

use redis::AsyncCommands;

use crate::cache::keys;
use crate::cache::models::{Lookup, NewSession, SessionRecord, SessionUpdate};
use crate::config::RedisConfig;
use crate::connection::RedisConnectionManager;
use crate::error::{InfraError, InfraResult};

/// 会话存储
/// 每个会话一条记录，另有按用户的会话索引集合支持"全部登出"
/// 记录与索引写入在一个事务中执行；索引仍可能残留已过期会话的 id，
/// 读取方负责自愈清理
#[derive(Clone)]
pub struct SessionStore {
    conn: Arc<RedisConnectionManager>,
    namespace: String,
    default_ttl_secs: u64,
}

impl SessionStore {
    pub fn new(conn: Arc<RedisConnectionManager>, config: &RedisConfig) -> Self {
        SessionStore {
            conn,
            namespace: config.key_prefix.clone(),
            default_ttl_secs: config.session_ttl_secs,
        }
    }

    fn record_key(&self, session_id: &str) -> String {
        keys::session_key(&self.namespace, session_id)
    }

    fn index_key(&self, user_id: &str) -> String {
        keys::user_sessions_key(&self.namespace, user_id)
    }

    /// 创建会话：写入记录并把 id 加入用户索引，两者同一 TTL
    pub async fn create_session(
        &self,
        session_id: &str,
        data: NewSession,
        ttl_secs: Option<u64>,
    ) -> InfraResult<SessionRecord> {
        let ttl = ttl_secs.unwrap_or(self.default_ttl_secs);
        let now = chrono::Utc::now().timestamp();

        let record = SessionRecord {
            session_id: session_id.to_string(),
            user_id: data.user_id,
            email: data.email,
            full_name: data.full_name,
            email_verified: data.email_verified,
            login_at: now,
            last_activity: now,
            ip_address: data.ip_address,
        };

        let record_key = self.record_key(session_id);
        let index_key = self.index_key(&record.user_id);
        let json = serde_json::to_string(&record)?;

        let mut conn = self.conn.command();
        let _: () = redis::pipe()
            .atomic()
            .set_ex(&record_key, json, ttl)
            .ignore()
            .sadd(&index_key, session_id)
            .ignore()
            .expire(&index_key, ttl as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(InfraError::Write)?;

        Ok(record)
    }

    /// 读取会话，纯读操作，不产生副作用
    /// 记录损坏时删除并按未命中处理
    pub async fn get_session(&self, session_id: &str) -> Lookup<SessionRecord> {
        let record_key = self.record_key(session_id);
        let mut conn = self.conn.command();

        let result: Result<Option<String>, redis::RedisError> = conn.get(&record_key).await;
        match result {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(record) => Lookup::Hit(record),
                Err(e) => {
                    tracing::warn!("corrupt session record, deleting: {} ({})", record_key, e);
                    let _: Result<i64, _> = conn.del(&record_key).await;
                    Lookup::Miss
                }
            },
            Ok(None) => Lookup::Miss,
            Err(e) => {
                tracing::warn!("session GET failed: {} ({})", record_key, e);
                Lookup::Unavailable
            }
        }
    }

    /// 刷新活动时间：以剩余 TTL 重写记录
    /// 滑动过期但不延长绝对存活期，由调用方显式选择
    pub async fn touch_session(&self, session_id: &str) -> InfraResult<Option<SessionRecord>> {
        let record_key = self.record_key(session_id);
        let mut conn = self.conn.command();

        let (raw, remaining): (Option<String>, i64) = redis::pipe()
            .get(&record_key)
            .ttl(&record_key)
            .query_async(&mut conn)
            .await
            .map_err(InfraError::Read)?;

        let Some(json) = raw else {
            return Ok(None);
        };
        if remaining <= 0 {
            return Ok(None);
        }

        let mut record: SessionRecord = match serde_json::from_str(&json) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("corrupt session record, deleting: {} ({})", record_key, e);
                let _: Result<i64, _> = conn.del(&record_key).await;
                return Ok(None);
            }
        };

        record.last_activity = chrono::Utc::now().timestamp();
        let json = serde_json::to_string(&record)?;
        let _: () = conn
            .set_ex(&record_key, json, remaining as u64)
            .await
            .map_err(InfraError::Write)?;

        Ok(Some(record))
    }

    /// 部分更新会话，不存在则报错
    /// 未显式给出 TTL 时保留剩余过期时间
    pub async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
        ttl_secs: Option<u64>,
    ) -> InfraResult<SessionRecord> {
        let record_key = self.record_key(session_id);
        let mut conn = self.conn.command();

        let (raw, remaining): (Option<String>, i64) = redis::pipe()
            .get(&record_key)
            .ttl(&record_key)
            .query_async(&mut conn)
            .await
            .map_err(InfraError::Read)?;

        let Some(json) = raw else {
            return Err(InfraError::SessionNotFound(session_id.to_string()));
        };

        let mut record: SessionRecord = serde_json::from_str(&json).map_err(|e| {
            tracing::warn!("corrupt session record: {} ({})", record_key, e);
            InfraError::SessionNotFound(session_id.to_string())
        })?;

        record.apply(update, chrono::Utc::now().timestamp());

        let ttl = match ttl_secs {
            Some(ttl) => ttl,
            None if remaining > 0 => remaining as u64,
            None => return Err(InfraError::SessionNotFound(session_id.to_string())),
        };

        let json = serde_json::to_string(&record)?;
        let _: () = conn
            .set_ex(&record_key, json, ttl)
            .await
            .map_err(InfraError::Write)?;

        Ok(record)
    }

    /// 删除会话并从属主索引移除，会话不存在时静默成功
    pub async fn delete_session(&self, session_id: &str) -> InfraResult<()> {
        // 先读出属主才能定位索引
        let record = match self.get_session(session_id).await {
            Lookup::Hit(record) => Some(record),
            _ => None,
        };

        let record_key = self.record_key(session_id);
        let mut conn = self.conn.command();

        match record {
            Some(record) => {
                let index_key = self.index_key(&record.user_id);
                let _: () = redis::pipe()
                    .del(&record_key)
                    .ignore()
                    .srem(&index_key, session_id)
                    .ignore()
                    .query_async(&mut conn)
                    .await
                    .map_err(InfraError::Write)?;
            }
            None => {
                let _: i64 = conn.del(&record_key).await.map_err(InfraError::Write)?;
            }
        }

        Ok(())
    }

    /// 获取用户全部会话
    /// 索引中指向缺失或损坏记录的 id 被顺手清理（自愈）
    pub async fn get_user_sessions(&self, user_id: &str) -> InfraResult<Vec<SessionRecord>> {
        let index_key = self.index_key(user_id);
        let mut conn = self.conn.command();

        let ids: Vec<String> = conn
            .smembers(&index_key)
            .await
            .map_err(InfraError::Read)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("MGET");
        for id in &ids {
            cmd.arg(self.record_key(id));
        }
        let values: Vec<Option<String>> =
            cmd.query_async(&mut conn).await.map_err(InfraError::Read)?;

        let mut sessions = Vec::new();
        let mut stale: Vec<&String> = Vec::new();
        for (id, slot) in ids.iter().zip(values) {
            match slot.as_deref().map(serde_json::from_str::<SessionRecord>) {
                Some(Ok(record)) => sessions.push(record),
                Some(Err(e)) => {
                    tracing::warn!("corrupt session record in index: {} ({})", id, e);
                    stale.push(id);
                }
                None => stale.push(id),
            }
        }

        if !stale.is_empty() {
            let mut pipe = redis::pipe();
            for id in &stale {
                pipe.del(self.record_key(id)).ignore();
                pipe.srem(&index_key, id.as_str()).ignore();
            }
            let _: () = pipe.query_async(&mut conn).await.map_err(InfraError::Write)?;
            tracing::debug!("pruned {} stale session ids for user {}", stale.len(), user_id);
        }

        Ok(sessions)
    }

    /// 删除用户全部会话与索引本身，用于密码重置后强制全部登出
    pub async fn delete_user_sessions(&self, user_id: &str) -> InfraResult<u64> {
        let index_key = self.index_key(user_id);
        let mut conn = self.conn.command();

        let ids: Vec<String> = conn
            .smembers(&index_key)
            .await
            .map_err(InfraError::Read)?;

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.del(self.record_key(id)).ignore();
        }
        pipe.del(&index_key).ignore();
        let _: () = pipe.query_async(&mut conn).await.map_err(InfraError::Write)?;

        Ok(ids.len() as u64)
    }

    /// 重置记录与属主索引的过期时间，会话不存在返回 false
    pub async fn extend_session(&self, session_id: &str, ttl_secs: u64) -> InfraResult<bool> {
        let record = match self.get_session(session_id).await {
            Lookup::Hit(record) => record,
            _ => return Ok(false),
        };

        let record_key = self.record_key(session_id);
        let index_key = self.index_key(&record.user_id);
        let mut conn = self.conn.command();

        let _: () = redis::pipe()
            .expire(&record_key, ttl_secs as i64)
            .ignore()
            .expire(&index_key, ttl_secs as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(InfraError::Write)?;

        Ok(true)
    }

    /// 会话是否有效，只做存在性检查，无副作用
    pub async fn is_valid_session(&self, session_id: &str) -> bool {
        let record_key = self.record_key(session_id);
        let mut conn = self.conn.command();

        let exists: Result<bool, redis::RedisError> = conn.exists(&record_key).await;
        match exists {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!("session EXISTS failed: {} ({})", record_key, e);
                false
            }
        }
    }

    /// 巡检全部用户索引，剔除已无对应记录的会话 id
    /// 记录本身由 Redis 过期机制回收，这里清理的是索引残留
    pub async fn audit_session_indexes(&self) -> InfraResult<u64> {
        let pattern = keys::user_sessions_pattern(&self.namespace);
        let mut conn = self.conn.command();

        let mut cursor: u64 = 0;
        let mut pruned: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(InfraError::Read)?;

            for index_key in batch {
                let ids: Vec<String> = conn
                    .smembers(&index_key)
                    .await
                    .map_err(InfraError::Read)?;
                for id in ids {
                    let exists: bool = conn
                        .exists(self.record_key(&id))
                        .await
                        .map_err(InfraError::Read)?;
                    if !exists {
                        let removed: i64 = conn
                            .srem(&index_key, &id)
                            .await
                            .map_err(InfraError::Write)?;
                        pruned += removed as u64;
                    }
                }
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        if pruned > 0 {
            tracing::info!("session index audit pruned {} dangling ids", pruned);
        }
        Ok(pruned)
    }
}
