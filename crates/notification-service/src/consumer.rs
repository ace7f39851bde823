//! 通知服务消费者
//!
//! 两条独立的消费管道：orders topic 上的订单事件与 payments topic 上的
//! 支付事件，各自持有独立的消费组（notification-service.orders /
//! notification-service.payments），互不影响消费进度。
//! 两条管道共享同一个 NotificationProcessor 与死信投递策略。

use orderflow_shared::config::AppConfig;
use orderflow_shared::dlq::DlqProducer;
use orderflow_shared::error::OrderflowError;
use orderflow_shared::events::{OrderEvent, PaymentEvent};
use orderflow_shared::kafka::{ConsumerMessage, KafkaConsumer, topics};
use orderflow_shared::retry::{RetryPolicy, retry_with_policy};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::processor::NotificationProcessor;

/// 订单事件消费者（订单确认通知）
pub struct OrderEventConsumer {
    consumer: KafkaConsumer,
    processor: Arc<NotificationProcessor>,
    dlq: DlqProducer,
    retry_policy: RetryPolicy,
}

impl OrderEventConsumer {
    pub fn new(
        config: &AppConfig,
        processor: Arc<NotificationProcessor>,
        dlq: DlqProducer,
        retry_policy: RetryPolicy,
    ) -> Result<Self, OrderflowError> {
        let consumer = KafkaConsumer::new(&config.kafka, Some("orders"))?;
        Ok(Self {
            consumer,
            processor,
            dlq,
            retry_policy,
        })
    }

    /// 启动消费循环，直到收到 shutdown 信号
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), OrderflowError> {
        self.consumer.subscribe(&[topics::ORDERS])?;

        info!(topic = topics::ORDERS, "订单事件消费者已启动");

        let processor = self.processor;
        let dlq = self.dlq;
        let retry_policy = self.retry_policy;

        self.consumer
            .start(shutdown, |msg| {
                let processor = &processor;
                let dlq = &dlq;
                let retry_policy = &retry_policy;
                async move {
                    if let Err(e) = handle_order_message(processor, dlq, retry_policy, &msg).await
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

/// 支付事件消费者（支付状态通知）
pub struct PaymentEventConsumer {
    consumer: KafkaConsumer,
    processor: Arc<NotificationProcessor>,
    dlq: DlqProducer,
    retry_policy: RetryPolicy,
}

impl PaymentEventConsumer {
    pub fn new(
        config: &AppConfig,
        processor: Arc<NotificationProcessor>,
        dlq: DlqProducer,
        retry_policy: RetryPolicy,
    ) -> Result<Self, OrderflowError> {
        let consumer = KafkaConsumer::new(&config.kafka, Some("payments"))?;
        Ok(Self {
            consumer,
            processor,
            dlq,
            retry_policy,
        })
    }

    /// 启动消费循环，直到收到 shutdown 信号
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), OrderflowError> {
        self.consumer.subscribe(&[topics::PAYMENTS])?;

        info!(topic = topics::PAYMENTS, "支付事件消费者已启动");

        let processor = self.processor;
        let dlq = self.dlq;
        let retry_policy = self.retry_policy;

        self.consumer
            .start(shutdown, |msg| {
                let processor = &processor;
                let dlq = &dlq;
                let retry_policy = &retry_policy;
                async move {
                    if let Err(e) =
                        handle_payment_message(processor, dlq, retry_policy, &msg).await
                    {
                        error!(
                            error = %e,
                            topic = %msg.topic,
                            partition = msg.partition,
                            offset = msg.offset,
                            "处理支付事件失败"
                        );
                    }
                    Ok(())
                }
            })
            .await;

        info!("支付事件消费者已停止");
        Ok(())
    }
}

/// 处理单条订单消息：校验/派生/落库/交付（带进程内重试），失败转死信
pub async fn handle_order_message(
    processor: &NotificationProcessor,
    dlq: &DlqProducer,
    retry_policy: &RetryPolicy,
    msg: &ConsumerMessage,
) -> Result<(), OrderflowError> {
    let attempt = msg.retry_count();

    let event: OrderEvent = match msg.deserialize_payload() {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "订单事件反序列化失败，发送到死信队列");
            let message_id = msg.key.clone().unwrap_or_else(|| "unknown".to_string());
            send_to_dlq(dlq, &message_id, topics::ORDERS, &msg.payload, &e, attempt).await;
            return Err(e);
        }
    };

    info!(order_id = %event.order_id, attempt, "收到订单事件");

    let outcome = retry_with_policy(
        retry_policy,
        "notification.order",
        |e| e.is_retryable(),
        || {
            let event = &event;
            async move { processor.handle_order_event(event).await }
        },
    )
    .await;

    match outcome {
        Ok(notification) => {
            info!(
                notification_id = %notification.notification_id,
                order_id = %notification.order_id,
                "订单通知处理完成"
            );
            Ok(())
        }
        Err(e) => {
            error!(order_id = %event.order_id, error = %e, attempt, "订单通知失败，发送到死信队列");
            send_to_dlq(dlq, &event.order_id, topics::ORDERS, &msg.payload, &e, attempt).await;
            Err(e)
        }
    }
}

/// 处理单条支付消息：流程与订单消息一致，仅派生规则不同
pub async fn handle_payment_message(
    processor: &NotificationProcessor,
    dlq: &DlqProducer,
    retry_policy: &RetryPolicy,
    msg: &ConsumerMessage,
) -> Result<(), OrderflowError> {
    let attempt = msg.retry_count();

    let event: PaymentEvent = match msg.deserialize_payload() {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "支付事件反序列化失败，发送到死信队列");
            let message_id = msg.key.clone().unwrap_or_else(|| "unknown".to_string());
            send_to_dlq(dlq, &message_id, topics::PAYMENTS, &msg.payload, &e, attempt).await;
            return Err(e);
        }
    };

    info!(
        payment_id = %event.payment_id,
        order_id = %event.order_id,
        status = %event.status,
        attempt,
        "收到支付事件"
    );

    let outcome = retry_with_policy(
        retry_policy,
        "notification.payment",
        |e| e.is_retryable(),
        || {
            let event = &event;
            async move { processor.handle_payment_event(event).await }
        },
    )
    .await;

    match outcome {
        Ok(notification) => {
            info!(
                notification_id = %notification.notification_id,
                order_id = %notification.order_id,
                "支付通知处理完成"
            );
            Ok(())
        }
        Err(e) => {
            error!(
                payment_id = %event.payment_id,
                error = %e,
                attempt,
                "支付通知失败，发送到死信队列"
            );
            send_to_dlq(
                dlq,
                &event.payment_id,
                topics::PAYMENTS,
                &msg.payload,
                &e,
                attempt,
            )
            .await;
            Err(e)
        }
    }
}

/// 将处理失败的消息发送到死信队列，携带已消耗的重试预算
async fn send_to_dlq(
    dlq: &DlqProducer,
    message_id: &str,
    source_topic: &str,
    payload: &[u8],
    error: &OrderflowError,
    retry_count: u32,
) {
    let payload = String::from_utf8_lossy(payload);
    if let Err(e) = dlq
        .send_to_dlq(
            message_id,
            source_topic,
            &payload,
            &error.to_string(),
            retry_count,
        )
        .await
    {
        error!(
            message_id,
            error = %e,
            "发送到死信队列失败，消息可能丢失"
        );
    }
}
