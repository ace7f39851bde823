//! 支付事件处理器
//!
//! 实现订单事件到支付记录的派生与持久化：
//! 校验入站事件 -> 派生确定性业务键与支付状态 -> 幂等落库 -> 返回已提交记录。
//! 出站事件的构造与发布由消费管道（consumer.rs）在拿到已提交记录后完成。

use std::sync::Arc;

use chrono::Utc;
use orderflow_shared::config::PaymentConfig;
use orderflow_shared::error::Result;
use orderflow_shared::events::{OrderEvent, PaymentStatus, deterministic_event_id, validate_event};
use tracing::info;
use uuid::Uuid;

use crate::model::{NewPayment, Payment};
use crate::repository::PaymentRepositoryTrait;

/// payment_id 派生命名空间
///
/// 固定的 UUID v5 命名空间：同一 orderId 在任意次重投递下派生出
/// 相同的 payment_id，配合存储层唯一索引实现"每订单至多一条支付记录"。
const PAYMENT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6ba7_c4d1_92e0_4f7a_b1d8_3e5a_9c02_77f1);

/// 支付处理器
///
/// 组合仓储与业务配置完成订单事件的处理。仓储以 trait object 注入，
/// 测试时替换为 mock 而无需数据库。
pub struct PaymentProcessor {
    repository: Arc<dyn PaymentRepositoryTrait>,
    config: PaymentConfig,
}

impl PaymentProcessor {
    pub fn new(repository: Arc<dyn PaymentRepositoryTrait>, config: PaymentConfig) -> Self {
        Self { repository, config }
    }

    /// 从订单号派生确定性 payment_id
    pub fn derive_payment_id(order_id: &str) -> String {
        deterministic_event_id(&PAYMENT_ID_NAMESPACE, order_id)
    }

    /// 处理单个订单事件，返回已提交的支付记录
    ///
    /// 派生规则：
    /// - amount 取订单 totalAmount
    /// - totalAmount > 0 视为可支付 -> COMPLETED，否则 FAILED
    /// - paymentMethod 取配置默认值
    pub async fn process(&self, event: &OrderEvent) -> Result<Payment> {
        validate_event(event)?;

        let status = if event.total_amount > 0.0 {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        };

        let record = NewPayment {
            payment_id: Self::derive_payment_id(&event.order_id),
            order_id: event.order_id.clone(),
            customer_id: event.customer_id.clone(),
            amount: event.total_amount,
            status: status.to_string(),
            payment_method: self.config.payment_method.clone(),
            payment_date: Utc::now(),
        };

        let saved = self.repository.save(&record).await?;

        info!(
            payment_id = %saved.payment_id,
            order_id = %saved.order_id,
            amount = saved.amount,
            status = %saved.status,
            "支付记录已持久化"
        );

        Ok(saved)
    }
}
