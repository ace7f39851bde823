//! 通知发送器
//!
//! 通过 `NotificationSender` trait 抽象外部交付行为。当前版本为模拟
//! 邮件发送（仅记录日志），便于在无外部依赖的情况下验证消费管道的
//! 完整性。未来替换为真实邮件网关 SDK 时只需实现同一 trait。

use async_trait::async_trait;
use orderflow_shared::error::{OrderflowError, Result};
use orderflow_shared::events::NotificationEvent;
use tracing::info;
use uuid::Uuid;

use crate::model::Notification;

/// 发送结果
///
/// 记录外部渠道的受理状态。交付是 fire-and-forget 的：
/// processor 只记录失败日志，不回写记录也不向上传播。
pub struct SendResult {
    pub success: bool,
    /// 外部渠道返回的消息标识，用于追踪投递状态
    pub message_id: Option<String>,
    pub error: Option<String>,
}

/// 通知发送器 trait
///
/// `event_type` 区分通知来源（订单创建 / 支付状态），
/// 渠道实现据此选择消息模板或投递优先级。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, event_type: &str, notification: &Notification) -> Result<SendResult>;
}

/// 模拟邮件发送器
///
/// 把通知记录包装为交付信封后"发送"——生产环境中替换为
/// SMTP 或邮件服务商（如 SendGrid）的 API 调用。
pub struct EmailSender;

#[async_trait]
impl NotificationSender for EmailSender {
    async fn send(&self, event_type: &str, notification: &Notification) -> Result<SendResult> {
        let envelope = NotificationEvent {
            event_type: event_type.to_string(),
            message: notification.message.clone(),
        };

        let payload = serde_json::to_string(&envelope)
            .map_err(|e| OrderflowError::Internal(format!("交付信封序列化失败: {e}")))?;

        let message_id = Uuid::now_v7().to_string();

        info!(
            channel = "EMAIL",
            notification_id = %notification.notification_id,
            customer_email = %notification.customer_email,
            message_id = %message_id,
            payload = %payload,
            "模拟发送邮件通知"
        );

        Ok(SendResult {
            success: true,
            message_id: Some(message_id),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::STATUS_SENT;
    use chrono::Utc;

    fn make_test_notification() -> Notification {
        Notification {
            id: 1,
            notification_id: "notif-test-001".to_string(),
            order_id: "O1".to_string(),
            customer_id: "C1".to_string(),
            customer_email: "zhangsan@example.com".to_string(),
            message: "Your order has been created with ID: O1".to_string(),
            status: STATUS_SENT.to_string(),
            sent_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_email_send() {
        let sender = EmailSender;
        let notification = make_test_notification();

        let result = sender.send("ORDER_CREATED", &notification).await;
        assert!(result.is_ok());

        let result = result.unwrap();
        assert!(result.success);
        assert!(result.message_id.is_some());
        assert!(result.error.is_none());
    }
}
