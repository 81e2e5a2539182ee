use serde::{Deserialize, Serialize};

/// 会话缓存数据模型
/// 每次成功登录对应一条记录
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionRecord {
    pub session_id: String,
    pub user_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub email_verified: bool,
    pub login_at: i64,       // Unix timestamp
    pub last_activity: i64,  // Unix timestamp
    pub ip_address: Option<String>,
}

/// 创建会话时的输入数据
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub email_verified: bool,
    pub ip_address: Option<String>,
}

/// 会话部分更新，None 字段保持原值
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub email_verified: Option<bool>,
    pub ip_address: Option<String>,
}

impl SessionRecord {
    /// 应用部分更新并刷新活动时间
    pub fn apply(&mut self, update: SessionUpdate, now: i64) {
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(full_name) = update.full_name {
            self.full_name = Some(full_name);
        }
        if let Some(email_verified) = update.email_verified {
            self.email_verified = email_verified;
        }
        if let Some(ip_address) = update.ip_address {
            self.ip_address = Some(ip_address);
        }
        self.last_activity = now;
    }
}
