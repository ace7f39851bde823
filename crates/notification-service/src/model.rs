//! 通知记录模型

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 通知记录的状态常量
///
/// 源系统对所有派生通知无条件写入 SENT，交付结果不回写记录。
pub const STATUS_SENT: &str = "SENT";

/// 已持久化的通知记录
///
/// `id` 为存储层分配的代理主键，`notification_id` 为业务键。
/// 记录一经创建不再更新或删除。
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub notification_id: String,
    pub order_id: String,
    pub customer_id: String,
    pub customer_email: String,
    pub message: String,
    pub status: String,
    pub sent_at: DateTime<Utc>,
}

/// 待插入的通知记录（尚无代理主键）
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub notification_id: String,
    pub order_id: String,
    pub customer_id: String,
    pub customer_email: String,
    pub message: String,
    pub status: String,
    pub sent_at: DateTime<Utc>,
}
