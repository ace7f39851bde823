//! 支付记录模型

use chrono::{DateTime, Utc};
use orderflow_shared::error::Result;
use orderflow_shared::events::{PaymentEvent, PaymentStatus};
use serde::Serialize;

/// 已持久化的支付记录
///
/// `id` 为存储层分配的代理主键，`payment_id` 为业务键。
/// 记录一经创建不再更新或删除（按消费调用 append-only）。
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub payment_id: String,
    pub order_id: String,
    pub customer_id: String,
    pub amount: f64,
    pub status: String,
    pub payment_method: String,
    pub payment_date: DateTime<Utc>,
}

impl Payment {
    /// 从已提交的支付记录构造出站支付事件
    ///
    /// 事件内容取自持久化状态而非入站订单事件，保证发布的内容
    /// 反映的是已落库的事实。
    pub fn to_event(&self) -> Result<PaymentEvent> {
        let status: PaymentStatus = self.status.parse()?;

        Ok(PaymentEvent {
            payment_id: self.payment_id.clone(),
            order_id: self.order_id.clone(),
            customer_id: self.customer_id.clone(),
            amount: self.amount,
            status,
            payment_method: self.payment_method.clone(),
        })
    }
}

/// 待插入的支付记录（尚无代理主键）
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payment_id: String,
    pub order_id: String,
    pub customer_id: String,
    pub amount: f64,
    pub status: String,
    pub payment_method: String,
    pub payment_date: DateTime<Utc>,
}
