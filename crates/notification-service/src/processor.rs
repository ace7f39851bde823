//! 通知事件处理器
//!
//! 为每条入站事件派生并持久化一条通知记录，随后做 fire-and-forget
//! 的外部交付。订单事件与支付事件共用同一套"校验 -> 派生 -> 幂等落库
//! -> 交付"流程，仅派生规则不同。

use std::sync::Arc;

use chrono::Utc;
use orderflow_shared::config::NotificationConfig;
use orderflow_shared::error::Result;
use orderflow_shared::events::{
    OrderEvent, PaymentEvent, deterministic_event_id, validate_event,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::model::{NewNotification, Notification, STATUS_SENT};
use crate::repository::NotificationRepositoryTrait;
use crate::sender::NotificationSender;

/// notification_id 派生命名空间
///
/// 业务键按"来源前缀 + 入站事件业务键"派生，同一条入站事件在任意次
/// 重投递下派生出相同的 notification_id，配合唯一索引实现幂等落库。
const NOTIFICATION_ID_NAMESPACE: Uuid =
    Uuid::from_u128(0x2d9e_81b4_57c3_4a06_9f12_c8b4_d3aa_10e5);

/// 订单创建通知的交付类型
pub const EVENT_TYPE_ORDER_CREATED: &str = "ORDER_CREATED";
/// 支付状态通知的交付类型
pub const EVENT_TYPE_PAYMENT_STATUS: &str = "PAYMENT_STATUS";

/// 通知处理器
pub struct NotificationProcessor {
    repository: Arc<dyn NotificationRepositoryTrait>,
    sender: Arc<dyn NotificationSender>,
    config: NotificationConfig,
}

impl NotificationProcessor {
    pub fn new(
        repository: Arc<dyn NotificationRepositoryTrait>,
        sender: Arc<dyn NotificationSender>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            repository,
            sender,
            config,
        }
    }

    /// 订单事件派生的通知业务键
    pub fn order_notification_id(order_id: &str) -> String {
        deterministic_event_id(&NOTIFICATION_ID_NAMESPACE, &format!("order:{order_id}"))
    }

    /// 支付事件派生的通知业务键
    pub fn payment_notification_id(payment_id: &str) -> String {
        deterministic_event_id(&NOTIFICATION_ID_NAMESPACE, &format!("payment:{payment_id}"))
    }

    /// 处理订单事件：生成订单确认通知
    ///
    /// 派生规则：message 为固定模板并内嵌 orderId；
    /// status 无条件为 SENT；customerEmail 取自事件本身。
    pub async fn handle_order_event(&self, event: &OrderEvent) -> Result<Notification> {
        validate_event(event)?;

        let record = NewNotification {
            notification_id: Self::order_notification_id(&event.order_id),
            order_id: event.order_id.clone(),
            customer_id: event.customer_id.clone(),
            customer_email: event.customer_email.clone(),
            message: format!("Your order has been created with ID: {}", event.order_id),
            status: STATUS_SENT.to_string(),
            sent_at: Utc::now(),
        };

        self.persist_and_deliver(EVENT_TYPE_ORDER_CREATED, record)
            .await
    }

    /// 处理支付事件：生成支付状态通知
    ///
    /// 派生规则：message 为固定模板并内嵌 orderId 与支付状态；
    /// status 无条件为 SENT。PaymentEvent 上没有客户邮箱字段，
    /// 这里回退到配置中的占位邮箱——源系统的已知保真缺口，显式保留。
    pub async fn handle_payment_event(&self, event: &PaymentEvent) -> Result<Notification> {
        validate_event(event)?;

        let record = NewNotification {
            notification_id: Self::payment_notification_id(&event.payment_id),
            order_id: event.order_id.clone(),
            customer_id: event.customer_id.clone(),
            customer_email: self.config.fallback_customer_email.clone(),
            message: format!("Payment for order {} is {}", event.order_id, event.status),
            status: STATUS_SENT.to_string(),
            sent_at: Utc::now(),
        };

        self.persist_and_deliver(EVENT_TYPE_PAYMENT_STATUS, record)
            .await
    }

    /// 幂等落库后做 fire-and-forget 交付
    ///
    /// 交付失败只记录日志：外部渠道的可用性不影响通知记录的持久化，
    /// 也不触发消息重投递。
    async fn persist_and_deliver(
        &self,
        event_type: &str,
        record: NewNotification,
    ) -> Result<Notification> {
        let saved = self.repository.save(&record).await?;

        info!(
            notification_id = %saved.notification_id,
            order_id = %saved.order_id,
            status = %saved.status,
            "通知记录已持久化"
        );

        match self.sender.send(event_type, &saved).await {
            Ok(result) if !result.success => {
                warn!(
                    notification_id = %saved.notification_id,
                    error = ?result.error,
                    "通知交付未成功"
                );
            }
            Err(e) => {
                warn!(
                    notification_id = %saved.notification_id,
                    error = %e,
                    "通知交付异常"
                );
            }
            Ok(_) => {}
        }

        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockNotificationRepositoryTrait;
    use crate::sender::{MockNotificationSender, SendResult};
    use orderflow_shared::error::OrderflowError;
    use orderflow_shared::events::{OrderItem, PaymentStatus};

    fn make_order_event() -> OrderEvent {
        OrderEvent {
            order_id: "O1".to_string(),
            customer_id: "C1".to_string(),
            customer_name: "张三".to_string(),
            customer_email: "zhangsan@example.com".to_string(),
            shipping_address: "北京市朝阳区".to_string(),
            items: vec![OrderItem {
                product_id: "P1".to_string(),
                product_name: "机械键盘".to_string(),
                description: None,
                quantity: 1,
                price: 150.0,
            }],
            total_amount: 150.0,
            status: "CREATED".to_string(),
        }
    }

    fn make_payment_event(status: PaymentStatus) -> PaymentEvent {
        PaymentEvent {
            payment_id: "pay-001".to_string(),
            order_id: "O1".to_string(),
            customer_id: "C1".to_string(),
            amount: 150.0,
            status,
            payment_method: "CREDIT_CARD".to_string(),
        }
    }

    /// 把插入内容原样返回的 mock 仓储
    fn make_echo_repository() -> MockNotificationRepositoryTrait {
        let mut mock = MockNotificationRepositoryTrait::new();
        mock.expect_save().returning(|n| {
            Ok(Notification {
                id: 1,
                notification_id: n.notification_id.clone(),
                order_id: n.order_id.clone(),
                customer_id: n.customer_id.clone(),
                customer_email: n.customer_email.clone(),
                message: n.message.clone(),
                status: n.status.clone(),
                sent_at: n.sent_at,
            })
        });
        mock
    }

    fn make_ok_sender() -> MockNotificationSender {
        let mut mock = MockNotificationSender::new();
        mock.expect_send().returning(|_, _| {
            Ok(SendResult {
                success: true,
                message_id: Some("msg-001".to_string()),
                error: None,
            })
        });
        mock
    }

    fn make_processor(
        repository: MockNotificationRepositoryTrait,
        sender: MockNotificationSender,
        config: NotificationConfig,
    ) -> NotificationProcessor {
        NotificationProcessor::new(Arc::new(repository), Arc::new(sender), config)
    }

    /// 订单事件派生的通知：message 含 orderId，状态 SENT，邮箱取自事件
    #[tokio::test]
    async fn test_handle_order_event() {
        let processor = make_processor(
            make_echo_repository(),
            make_ok_sender(),
            NotificationConfig::default(),
        );

        let notification = processor
            .handle_order_event(&make_order_event())
            .await
            .unwrap();

        assert_eq!(notification.order_id, "O1");
        assert!(notification.message.contains("O1"));
        assert_eq!(notification.status, "SENT");
        assert_eq!(notification.customer_email, "zhangsan@example.com");
    }

    /// 支付事件派生的通知：message 含 orderId 与支付状态，邮箱回退到配置占位值
    #[tokio::test]
    async fn test_handle_payment_event() {
        let processor = make_processor(
            make_echo_repository(),
            make_ok_sender(),
            NotificationConfig::default(),
        );

        let notification = processor
            .handle_payment_event(&make_payment_event(PaymentStatus::Completed))
            .await
            .unwrap();

        assert!(notification.message.contains("O1"));
        assert!(notification.message.contains("COMPLETED"));
        assert_eq!(notification.status, "SENT");
        assert_eq!(notification.customer_email, "customer@example.com");
    }

    /// 占位邮箱可通过配置覆盖
    #[tokio::test]
    async fn test_fallback_email_from_config() {
        let config = NotificationConfig {
            fallback_customer_email: "ops@example.com".to_string(),
        };
        let processor = make_processor(make_echo_repository(), make_ok_sender(), config);

        let notification = processor
            .handle_payment_event(&make_payment_event(PaymentStatus::Failed))
            .await
            .unwrap();

        assert_eq!(notification.customer_email, "ops@example.com");
        assert!(notification.message.contains("FAILED"));
    }

    /// 同一入站事件任意次处理派生相同的业务键；订单与支付来源互不冲突
    #[test]
    fn test_notification_id_is_deterministic() {
        let a = NotificationProcessor::order_notification_id("O1");
        let b = NotificationProcessor::order_notification_id("O1");
        assert_eq!(a, b);

        let c = NotificationProcessor::payment_notification_id("O1");
        assert_ne!(a, c);
    }

    /// 交付失败不影响处理结果——fire-and-forget
    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let mut sender = MockNotificationSender::new();
        sender
            .expect_send()
            .returning(|_, _| Err(OrderflowError::Internal("邮件网关不可达".to_string())));

        let processor = make_processor(
            make_echo_repository(),
            sender,
            NotificationConfig::default(),
        );

        let result = processor.handle_order_event(&make_order_event()).await;
        assert!(result.is_ok());
    }

    /// 交付时携带正确的事件类型
    #[tokio::test]
    async fn test_delivery_event_type() {
        let mut sender = MockNotificationSender::new();
        sender
            .expect_send()
            .withf(|event_type, _| event_type == EVENT_TYPE_PAYMENT_STATUS)
            .returning(|_, _| {
                Ok(SendResult {
                    success: true,
                    message_id: None,
                    error: None,
                })
            });

        let processor = make_processor(
            make_echo_repository(),
            sender,
            NotificationConfig::default(),
        );

        let result = processor
            .handle_payment_event(&make_payment_event(PaymentStatus::Completed))
            .await;
        assert!(result.is_ok());
    }

    /// 结构无效的事件在任何状态变更前被拒绝
    #[tokio::test]
    async fn test_invalid_order_event_rejected_before_persist() {
        let mut repository = MockNotificationRepositoryTrait::new();
        repository.expect_save().times(0);

        let processor = make_processor(
            repository,
            MockNotificationSender::new(),
            NotificationConfig::default(),
        );

        let mut event = make_order_event();
        event.order_id = String::new();

        let result = processor.handle_order_event(&event).await;
        assert!(matches!(result, Err(OrderflowError::Validation(_))));
    }
}
