//! 订单事件消费者
//!
//! 将 orders topic 上的消息解码为订单事件并驱动完整的中继流程：
//! 校验 -> 派生持久化 -> 从已提交记录构造并发布支付事件。
//! 瞬时故障在进程内按退避策略重试；重试耗尽或遇到不可重试错误时，
//! 消息连同已消耗的重试预算一起进入死信队列。

use orderflow_shared::config::AppConfig;
use orderflow_shared::dlq::DlqProducer;
use orderflow_shared::error::OrderflowError;
use orderflow_shared::events::OrderEvent;
use orderflow_shared::kafka::{ConsumerMessage, KafkaConsumer, topics};
use orderflow_shared::retry::{RetryPolicy, retry_with_policy};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::processor::PaymentProcessor;
use crate::producer::PaymentEventProducer;

/// 订单事件消费者
///
/// 组合 KafkaConsumer（消息拉取）、PaymentProcessor（派生与持久化）、
/// PaymentEventProducer（出站事件发布）和 DlqProducer（死信投递），
/// 形成完整的消费管道。
pub struct OrderConsumer {
    consumer: KafkaConsumer,
    processor: Arc<PaymentProcessor>,
    producer: PaymentEventProducer,
    dlq: DlqProducer,
    retry_policy: RetryPolicy,
}

impl OrderConsumer {
    pub fn new(
        config: &AppConfig,
        processor: Arc<PaymentProcessor>,
        producer: PaymentEventProducer,
        dlq: DlqProducer,
        retry_policy: RetryPolicy,
    ) -> Result<Self, OrderflowError> {
        let consumer = KafkaConsumer::new(&config.kafka, None)?;
        Ok(Self {
            consumer,
            processor,
            producer,
            dlq,
            retry_policy,
        })
    }

    /// 启动消费循环，直到收到 shutdown 信号
    ///
    /// 将各组件移入闭包，通过 KafkaConsumer::start 驱动消费循环。
    /// 单独抽取 handle_message 函数方便单元测试。
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), OrderflowError> {
        self.consumer.subscribe(&[topics::ORDERS])?;

        info!(topic = topics::ORDERS, "订单事件消费者已启动");

        let processor = self.processor;
        let producer = self.producer;
        let dlq = self.dlq;
        let retry_policy = self.retry_policy;

        self.consumer
            .start(shutdown, |msg| {
                let processor = &processor;
                let producer = &producer;
                let dlq = &dlq;
                let retry_policy = &retry_policy;
                async move {
                    if let Err(e) =
                        handle_message(processor, producer, dlq, retry_policy, &msg).await
                    {
                        error!(
                            error = %e,
                            topic = %msg.topic,
                            partition = msg.partition,
                            offset = msg.offset,
                            "处理订单事件失败"
                        );
                    }
                    Ok(())
                }
            })
            .await;

        info!("订单事件消费者已停止");
        Ok(())
    }
}

/// 处理单条 Kafka 消息的完整流程
///
/// 拆分为独立函数而非方法，便于在测试中直接调用而无需构造完整的 Consumer。
/// 流程：反序列化 -> 校验/派生/落库/发布（带进程内重试）-> 失败转死信
pub async fn handle_message(
    processor: &PaymentProcessor,
    producer: &PaymentEventProducer,
    dlq: &DlqProducer,
    retry_policy: &RetryPolicy,
    msg: &ConsumerMessage,
) -> Result<(), OrderflowError> {
    let attempt = msg.retry_count();

    // 1. 反序列化；损坏的负载无法通过重试修复，直接进入死信队列
    let event: OrderEvent = match msg.deserialize_payload() {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "订单事件反序列化失败，发送到死信队列");
            let message_id = msg.key.clone().unwrap_or_else(|| "unknown".to_string());
            send_to_dlq(dlq, &message_id, &msg.payload, &e.to_string(), attempt).await;
            return Err(e);
        }
    };

    info!(
        order_id = %event.order_id,
        customer_id = %event.customer_id,
        total_amount = event.total_amount,
        attempt,
        "收到订单事件"
    );

    // 2. 校验 -> 派生落库 -> 从已提交记录构造并发布支付事件。
    //    持久化是幂等的，重试整个闭包不会产生重复记录。
    let outcome = retry_with_policy(
        retry_policy,
        "payment.relay",
        |e| e.is_retryable(),
        || {
            let event = &event;
            async move {
                let payment = processor.process(event).await?;
                let out_event = payment.to_event()?;
                producer.publish(&out_event).await?;
                Ok(payment)
            }
        },
    )
    .await;

    match outcome {
        Ok(payment) => {
            info!(
                order_id = %payment.order_id,
                payment_id = %payment.payment_id,
                status = %payment.status,
                "订单事件处理完成"
            );
            Ok(())
        }
        Err(e) => {
            error!(
                order_id = %event.order_id,
                error = %e,
                attempt,
                "支付中继失败，发送到死信队列"
            );
            send_to_dlq(dlq, &event.order_id, &msg.payload, &e.to_string(), attempt).await;
            Err(e)
        }
    }
}

/// 将处理失败的消息发送到死信队列，携带已消耗的重试预算
async fn send_to_dlq(
    dlq: &DlqProducer,
    message_id: &str,
    payload: &[u8],
    error: &str,
    retry_count: u32,
) {
    let payload = String::from_utf8_lossy(payload);
    if let Err(e) = dlq
        .send_to_dlq(message_id, topics::ORDERS, &payload, error, retry_count)
        .await
    {
        error!(
            message_id,
            error = %e,
            "发送到死信队列失败，消息可能丢失"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_shared::events::OrderItem;
    use std::collections::HashMap;

    /// 构造测试用的 ConsumerMessage
    fn make_test_message(event: &OrderEvent) -> ConsumerMessage {
        let payload = serde_json::to_vec(event).expect("序列化测试事件失败");
        ConsumerMessage {
            topic: topics::ORDERS.to_string(),
            partition: 0,
            offset: 1,
            key: Some(event.order_id.clone()),
            payload,
            timestamp: Some(1_700_000_000_000),
            headers: HashMap::new(),
        }
    }

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

    /// 验证有效订单事件可以正确反序列化
    #[test]
    fn test_handle_valid_order_event_deserialize() {
        let event = make_order_event();
        let msg = make_test_message(&event);

        let deserialized: OrderEvent = msg.deserialize_payload().expect("反序列化失败");
        assert_eq!(deserialized.order_id, "O1");
        assert_eq!(deserialized.total_amount, 150.0);
        assert_eq!(deserialized.items.len(), 1);
    }

    /// 损坏的负载反序列化失败
    #[test]
    fn test_handle_corrupt_payload() {
        let msg = ConsumerMessage {
            topic: topics::ORDERS.to_string(),
            partition: 0,
            offset: 1,
            key: None,
            payload: b"not json".to_vec(),
            timestamp: None,
            headers: HashMap::new(),
        };

        let result: Result<OrderEvent, _> = msg.deserialize_payload();
        assert!(result.is_err());
    }

    /// 从 DLQ 重投递的消息携带重试预算头
    #[test]
    fn test_redelivered_message_carries_retry_budget() {
        let event = make_order_event();
        let mut msg = make_test_message(&event);
        msg.headers.insert(
            orderflow_shared::kafka::RETRY_COUNT_HEADER.to_string(),
            "2".to_string(),
        );

        assert_eq!(msg.retry_count(), 2);
    }
}
