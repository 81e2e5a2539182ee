use redis::Client;
use redis::aio::{ConnectionManager, ConnectionManagerConfig, PubSub};
use tokio::sync::Mutex;

use crate::config::RedisConfig;
use crate::error::{InfraError, InfraResult};

/// 命令与发布连接带超时和指数退避重连，上限封顶
fn manager_config(config: &RedisConfig) -> ConnectionManagerConfig {
    ConnectionManagerConfig::new()
        .set_connection_timeout(config.connect_timeout())
        .set_response_timeout(config.command_timeout())
        .set_number_of_retries(config.reconnect_retries)
        .set_factor(500)
        .set_exponent_base(2)
        .set_max_delay(config.max_reconnect_delay_ms)
}

/// Redis 连接管理器
/// 持有三条逻辑连接：命令、发布、订阅
/// 进程启动时构造一次，注入到各个存储组件，进程退出时关闭
pub struct RedisConnectionManager {
    command: ConnectionManager,
    publish: ConnectionManager,
    subscribe: Mutex<Option<PubSub>>,
}

impl RedisConnectionManager {
    /// 建立全部连接
    /// 初始连接失败直接向上传播，没有 Redis 进程无法运行
    pub async fn connect(config: &RedisConfig) -> InfraResult<Self> {
        let client = Client::open(config.url()).map_err(InfraError::Connection)?;

        let command = ConnectionManager::new_with_config(client.clone(), manager_config(config))
            .await
            .map_err(InfraError::Connection)?;

        let publish = ConnectionManager::new_with_config(client.clone(), manager_config(config))
            .await
            .map_err(InfraError::Connection)?;

        // 订阅连接独占，不能复用多路复用连接
        let subscribe = client
            .get_async_pubsub()
            .await
            .map_err(InfraError::Connection)?;

        tracing::info!(
            "redis connected: {}:{}/{}",
            config.host,
            config.port,
            config.db
        );

        Ok(RedisConnectionManager {
            command,
            publish,
            subscribe: Mutex::new(Some(subscribe)),
        })
    }

    /// 获取命令连接（克隆共享同一条底层连接）
    pub fn command(&self) -> ConnectionManager {
        self.command.clone()
    }

    /// 获取发布连接
    pub fn publisher(&self) -> ConnectionManager {
        self.publish.clone()
    }

    /// 访问订阅连接，shutdown 之后为 None
    pub fn subscriber(&self) -> &Mutex<Option<PubSub>> {
        &self.subscribe
    }

    /// 在订阅连接上订阅频道
    pub async fn subscribe(&self, channel: &str) -> InfraResult<()> {
        let mut guard = self.subscribe.lock().await;
        let pubsub = guard.as_mut().ok_or(InfraError::NotConnected)?;
        pubsub
            .subscribe(channel)
            .await
            .map_err(InfraError::Connection)?;
        tracing::debug!("subscribed to channel: {}", channel);
        Ok(())
    }

    /// 通过发布连接广播消息，返回接收者数量
    pub async fn publish(&self, channel: &str, payload: &str) -> InfraResult<i64> {
        let mut conn = self.publish.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(InfraError::Write)?;
        Ok(receivers)
    }

    /// 存活探测，只返回布尔值，永不抛错
    pub async fn is_healthy(&self) -> bool {
        let mut conn = self.command.clone();
        let pong: Result<String, redis::RedisError> =
            redis::cmd("PING").query_async(&mut conn).await;
        match pong {
            Ok(reply) => reply == "PONG",
            Err(e) => {
                tracing::warn!("redis health check failed: {}", e);
                false
            }
        }
    }

    /// 关闭连接，逐个容错，只记录日志不传播
    pub async fn shutdown(&self) {
        let mut guard = self.subscribe.lock().await;
        if let Some(mut pubsub) = guard.take() {
            // 不带参数的 UNSUBSCRIBE 退订全部频道
            if let Err(e) = pubsub.unsubscribe(Vec::<String>::new()).await {
                tracing::warn!("failed to unsubscribe on shutdown: {}", e);
            }
        }
        // 命令和发布连接在最后一个克隆释放时关闭
        tracing::info!("redis connections shut down");
    }
}
