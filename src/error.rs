use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 基础设施层错误
/// 读操作失败不在此列：读失败降级为未命中并记录日志
#[derive(Debug, Error)]
pub enum InfraError {
    /// 初始连接建立失败，启动时致命
    #[error("Redis 连接失败: {0}")]
    Connection(#[source] redis::RedisError),

    /// 连接已关闭或尚未建立
    #[error("Redis 连接未就绪")]
    NotConnected,

    /// 写入失败必须让调用方感知
    #[error("缓存写入失败: {0}")]
    Write(#[source] redis::RedisError),

    /// 批量会话操作中无法降级的读失败
    #[error("缓存读取失败: {0}")]
    Read(#[source] redis::RedisError),

    #[error("序列化错误: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("会话不存在: {0}")]
    SessionNotFound(String),
}

pub type InfraResult<T> = Result<T, InfraError>;

#[derive(Serialize)]
struct ErrorResponse {
    code: i32,
    error_message: String,
}

impl IntoResponse for InfraError {
    fn into_response(self) -> Response {
        let status = match self {
            InfraError::SessionNotFound(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            code: status.as_u16() as i32,
            error_message: self.to_string(),
        });

        (status, body).into_response()
    }
}
