//! 事件模型
//!
//! 定义在 Kafka 上流转的所有业务事件的统一结构：订单事件（外部生产）、
//! 支付事件（支付服务派生）以及交付给外部渠道的通知信封。
//! 所有事件在传输中不可变，wire 格式为 camelCase JSON。
//!
//! 字段校验通过 validator 声明在结构体上，消费者在任何状态变更前调用
//! [`validate_event`]，结构不完整的事件被判定为不可重试的失败。

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::OrderflowError;

// ---------------------------------------------------------------------------
// OrderEvent — 订单事件（外部生产者发布到 orders topic）
// ---------------------------------------------------------------------------

/// 订单事件
///
/// 注意 totalAmount 不做正数校验：下游把 totalAmount <= 0 解释为
/// "不可支付"并派生 FAILED 支付记录，而不是在入口拒绝整条消息。
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    #[validate(length(min = 1, message = "orderId 不能为空"))]
    pub order_id: String,

    #[validate(length(min = 1, message = "customerId 不能为空"))]
    pub customer_id: String,

    #[validate(length(min = 1, message = "customerName 不能为空"))]
    pub customer_name: String,

    #[validate(
        length(min = 1, message = "customerEmail 不能为空"),
        email(message = "customerEmail 格式无效")
    )]
    pub customer_email: String,

    #[validate(length(min = 1, message = "shippingAddress 不能为空"))]
    pub shipping_address: String,

    #[validate(nested)]
    pub items: Vec<OrderItem>,

    pub total_amount: f64,

    #[validate(length(min = 1, message = "status 不能为空"))]
    pub status: String,
}

/// 订单行项目，无独立生命周期，仅内嵌在 OrderEvent 中
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[validate(length(min = 1, message = "productId 不能为空"))]
    pub product_id: String,

    #[validate(length(min = 1, message = "productName 不能为空"))]
    pub product_name: String,

    pub description: Option<String>,

    #[validate(range(min = 1, message = "quantity 必须为正整数"))]
    pub quantity: i32,

    #[validate(range(exclusive_min = 0.0, message = "price 必须大于 0"))]
    pub price: f64,
}

// ---------------------------------------------------------------------------
// PaymentEvent — 支付事件（支付服务发布到 payments topic）
// ---------------------------------------------------------------------------

/// 支付事件
///
/// 由支付服务在支付记录落库之后、从已提交的记录回读构造，
/// 保证事件内容反映的是持久化状态而非入站事件。
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    #[validate(length(min = 1, message = "paymentId 不能为空"))]
    pub payment_id: String,

    #[validate(length(min = 1, message = "orderId 不能为空"))]
    pub order_id: String,

    #[validate(length(min = 1, message = "customerId 不能为空"))]
    pub customer_id: String,

    pub amount: f64,

    pub status: PaymentStatus,

    #[validate(length(min = 1, message = "paymentMethod 不能为空"))]
    pub payment_method: String,
}

/// 支付状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Completed,
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 与 serde 的 SCREAMING_SNAKE_CASE 保持一致，
        // 存储层以 TEXT 落库时直接使用该表示
        let s = match self {
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = OrderflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(OrderflowError::Internal(format!("未知支付状态: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationEvent — 通知交付信封
// ---------------------------------------------------------------------------

/// 通知交付信封
///
/// 通知发送器把持久化的通知记录包装成该信封后交给外部渠道
/// （邮件网关等）。不跨服务流转，仅存在于交付边界上。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub event_type: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// 校验与确定性标识
// ---------------------------------------------------------------------------

/// 校验事件字段完整性，失败时转换为统一的验证错误
///
/// 验证错误不可重试——重放同一条坏消息只会得到相同结果，
/// 消费者应将其直接送入死信队列。
pub fn validate_event<T: Validate>(event: &T) -> Result<(), OrderflowError> {
    event
        .validate()
        .map_err(|e| OrderflowError::Validation(e.to_string()))
}

/// 从业务键派生确定性记录标识（UUID v5）
///
/// 同一业务键在任意次重投递下都会派生出相同的标识，
/// 配合存储层的幂等插入，保证每个业务键至多产生一条持久化记录。
pub fn deterministic_event_id(namespace: &Uuid, key: &str) -> String {
    Uuid::new_v5(namespace, key.as_bytes()).to_string()
}

// ---------------------------------------------------------------------------
// 单元测试
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

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
                description: Some("87 键".to_string()),
                quantity: 2,
                price: 75.0,
            }],
            total_amount: 150.0,
            status: "CREATED".to_string(),
        }
    }

    #[test]
    fn test_order_event_serialization_camel_case() {
        let event = make_order_event();
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("orderId"));
        assert!(json.contains("customerEmail"));
        assert!(json.contains("shippingAddress"));
        assert!(json.contains("totalAmount"));
        assert!(json.contains("productName"));

        let deserialized: OrderEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.order_id, "O1");
        assert_eq!(deserialized.items.len(), 1);
        assert_eq!(deserialized.items[0].quantity, 2);
        assert_eq!(deserialized.total_amount, 150.0);
    }

    #[test]
    fn test_order_event_validation_passes() {
        let event = make_order_event();
        assert!(validate_event(&event).is_ok());
    }

    #[test]
    fn test_order_event_validation_rejects_empty_order_id() {
        let mut event = make_order_event();
        event.order_id = String::new();

        let result = validate_event(&event);
        assert!(matches!(result, Err(OrderflowError::Validation(_))));
    }

    #[test]
    fn test_order_event_validation_rejects_invalid_email() {
        let mut event = make_order_event();
        event.customer_email = "not-an-email".to_string();

        assert!(validate_event(&event).is_err());
    }

    #[test]
    fn test_order_event_validation_rejects_bad_item() {
        let mut event = make_order_event();
        event.items[0].quantity = 0;
        assert!(validate_event(&event).is_err());

        let mut event = make_order_event();
        event.items[0].price = 0.0;
        assert!(validate_event(&event).is_err());
    }

    #[test]
    fn test_order_event_negative_total_amount_is_valid() {
        // totalAmount <= 0 必须通过结构校验——下游据此派生 FAILED 支付
        let mut event = make_order_event();
        event.total_amount = -5.0;
        assert!(validate_event(&event).is_ok());
    }

    #[test]
    fn test_payment_event_serialization() {
        let event = PaymentEvent {
            payment_id: "pay-001".to_string(),
            order_id: "O1".to_string(),
            customer_id: "C1".to_string(),
            amount: 150.0,
            status: PaymentStatus::Completed,
            payment_method: "CREDIT_CARD".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("paymentId"));
        assert!(json.contains("paymentMethod"));
        assert!(json.contains("\"COMPLETED\""));

        let deserialized: PaymentEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.status, PaymentStatus::Completed);
        assert_eq!(deserialized.amount, 150.0);
    }

    #[test]
    fn test_payment_status_display_and_parse() {
        assert_eq!(PaymentStatus::Completed.to_string(), "COMPLETED");
        assert_eq!(PaymentStatus::Failed.to_string(), "FAILED");

        assert_eq!(
            "COMPLETED".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Completed
        );
        assert_eq!(
            "FAILED".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Failed
        );
        assert!("PENDING".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_notification_event_serialization() {
        let event = NotificationEvent {
            event_type: "ORDER_CREATED".to_string(),
            message: "Your order has been created with ID: O1".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("eventType"));
        assert!(json.contains("O1"));
    }

    #[test]
    fn test_deterministic_event_id_is_stable() {
        let namespace = Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0);

        let a = deterministic_event_id(&namespace, "O1");
        let b = deterministic_event_id(&namespace, "O1");
        let c = deterministic_event_id(&namespace, "O2");

        // 同一业务键任意次派生结果相同，不同业务键互不冲突
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_deterministic_event_id_differs_by_namespace() {
        let ns1 = Uuid::from_u128(0x1111_1111_1111_1111_1111_1111_1111_1111);
        let ns2 = Uuid::from_u128(0x2222_2222_2222_2222_2222_2222_2222_2222);

        assert_ne!(
            deterministic_event_id(&ns1, "O1"),
            deterministic_event_id(&ns2, "O1")
        );
    }
}
