//! 支付事件生产者
//!
//! 将已提交支付记录派生的支付事件发布到 payments topic。
//! 发布以 orderId 为消息 key，同一订单的事件落入同一分区，
//! 保证按订单维度的投递顺序。

use orderflow_shared::error::{OrderflowError, Result};
use orderflow_shared::events::PaymentEvent;
use orderflow_shared::kafka::{KafkaProducer, topics};
use tracing::info;

/// 支付事件生产者
#[derive(Clone)]
pub struct PaymentEventProducer {
    producer: KafkaProducer,
}

impl PaymentEventProducer {
    pub fn new(producer: KafkaProducer) -> Self {
        Self { producer }
    }

    /// 发布支付事件
    ///
    /// 持久化与发布不在同一事务内——两步之间进程崩溃时，
    /// 重投递的订单事件会幂等地回读同一条支付记录并重新发布，
    /// 由此补齐缺失的出站事件。
    pub async fn publish(&self, event: &PaymentEvent) -> Result<()> {
        self.producer
            .send_json(topics::PAYMENTS, &event.order_id, event)
            .await
            .map_err(|e| OrderflowError::Publish {
                topic: topics::PAYMENTS.to_string(),
                reason: e.to_string(),
            })?;

        info!(
            payment_id = %event.payment_id,
            order_id = %event.order_id,
            status = %event.status,
            "支付事件已发布"
        );

        Ok(())
    }
}
