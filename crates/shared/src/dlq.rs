//! 死信队列处理
//!
//! 事件处理在进程内重试耗尽（或遇到不可重试错误）后，消息被包装为
//! `DeadLetterMessage` 发送到死信队列。DLQ 消费者在退避时间到达后把
//! 原始负载发回源 topic，并通过 x-retry-count 消息头携带已消耗的
//! 重试预算；预算耗尽的消息记录 ERROR 日志等待人工介入。
//! 这一机制取代了"抛异常触发 broker 无限重投"的控制流，
//! 毒消息的重试次数因此有了明确上限。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::OrderflowError;
use crate::kafka::{ConsumerMessage, KafkaConsumer, KafkaProducer, RETRY_COUNT_HEADER, topics};
use crate::retry::RetryPolicy;

// ---------------------------------------------------------------------------
// DeadLetterMessage — 死信消息信封
// ---------------------------------------------------------------------------

/// 死信消息信封
///
/// 包装原始消息，附加失败原因、重试次数等元数据，
/// 便于在死信队列消费时决定是重新投递还是永久归档。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterMessage {
    /// 原始消息的业务键（如 orderId）
    pub message_id: String,
    /// 原始 topic
    pub source_topic: String,
    /// 原始消息内容（JSON 字符串）
    pub payload: String,
    /// 失败原因
    pub error: String,
    /// 已消耗的重试次数（从 x-retry-count 头继承）
    pub retry_count: u32,
    /// 最大重试次数
    pub max_retries: u32,
    /// 本次失败时间
    pub failed_at: DateTime<Utc>,
    /// 下次重试时间（None 表示不再重试）
    pub next_retry_at: Option<DateTime<Utc>>,
    /// 来源服务
    pub source_service: String,
}

impl DeadLetterMessage {
    /// 创建死信消息
    ///
    /// `retry_count` 是该消息进入 DLQ 前已经消耗的重投递次数；
    /// 只要还有剩余预算，就按退避策略计算下一次投递时间。
    pub fn new(
        message_id: impl Into<String>,
        source_topic: impl Into<String>,
        payload: impl Into<String>,
        error: impl Into<String>,
        retry_count: u32,
        source_service: impl Into<String>,
        retry_policy: &RetryPolicy,
    ) -> Self {
        let now = Utc::now();
        let max_retries = retry_policy.max_retries;

        let next_retry_at = (retry_count < max_retries).then(|| {
            let delay = retry_policy.delay_for_attempt(retry_count);
            now + chrono::Duration::from_std(delay).unwrap_or_default()
        });

        Self {
            message_id: message_id.into(),
            source_topic: source_topic.into(),
            payload: payload.into(),
            error: error.into(),
            retry_count,
            max_retries,
            failed_at: now,
            next_retry_at,
            source_service: source_service.into(),
        }
    }

    /// 是否应继续重试
    pub fn should_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

// ---------------------------------------------------------------------------
// DlqProducer — 将失败消息发送到死信队列
// ---------------------------------------------------------------------------

/// DLQ 生产者
///
/// 各服务在事件处理失败后调用此组件将消息写入死信队列，
/// 而非直接丢弃。保证消息最终会被重试或人工处理。
pub struct DlqProducer {
    producer: KafkaProducer,
    source_service: String,
    retry_policy: RetryPolicy,
}

impl DlqProducer {
    pub fn new(producer: KafkaProducer, source_service: &str, retry_policy: RetryPolicy) -> Self {
        Self {
            producer,
            source_service: source_service.to_string(),
            retry_policy,
        }
    }

    /// 将失败消息发送到死信队列
    ///
    /// `retry_count` 来自入站消息的 x-retry-count 头，保证重试预算
    /// 在多次 DLQ 往返之间单调递增。
    pub async fn send_to_dlq(
        &self,
        message_id: &str,
        source_topic: &str,
        payload: &str,
        error: &str,
        retry_count: u32,
    ) -> Result<(), OrderflowError> {
        let dlq_msg = DeadLetterMessage::new(
            message_id,
            source_topic,
            payload,
            error,
            retry_count,
            &self.source_service,
            &self.retry_policy,
        );

        self.producer
            .send_json(topics::DEAD_LETTER_QUEUE, message_id, &dlq_msg)
            .await?;

        warn!(
            message_id,
            source_topic, retry_count, error, "消息已发送到死信队列"
        );

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DlqConsumer — 处理死信队列消息
// ---------------------------------------------------------------------------

/// DLQ 消费者
///
/// 持续消费死信队列，对本服务产生且尚有重试预算的消息，
/// 在退避时间到达后把原始负载发回源 topic 重新处理。
/// 超过重试上限的消息记录日志以便人工介入。
pub struct DlqConsumer {
    consumer: KafkaConsumer,
    /// 将待重试的消息发回原始 topic
    retry_producer: KafkaProducer,
    /// 只重投本服务写入的死信，避免多个服务的 DLQ 消费者重复投递
    source_service: String,
}

impl DlqConsumer {
    /// 创建 DLQ 消费者
    ///
    /// 使用 `.dlq` 后缀作为独立消费组，与业务消费者互不干扰
    pub fn new(config: &AppConfig, retry_producer: KafkaProducer) -> Result<Self, OrderflowError> {
        let consumer = KafkaConsumer::new(&config.kafka, Some("dlq"))?;
        consumer.subscribe(&[topics::DEAD_LETTER_QUEUE])?;

        info!(
            "DLQ 消费者已创建，订阅 topic: {}",
            topics::DEAD_LETTER_QUEUE
        );

        Ok(Self {
            consumer,
            retry_producer,
            source_service: config.service_name.clone(),
        })
    }

    /// 启动 DLQ 消费循环
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let retry_producer = self.retry_producer.clone();
        let source_service = self.source_service.clone();

        self.consumer
            .start(shutdown, move |msg| {
                let producer = retry_producer.clone();
                let service = source_service.clone();
                async move { handle_dlq_message(&msg, &producer, &service).await }
            })
            .await;

        info!("DLQ 消费循环已退出");
    }
}

/// 处理单条死信消息
///
/// 判断消息归属与剩余重试预算：
/// - 非本服务产生 → 跳过，由对应服务的 DLQ 消费者处理
/// - 仍可重试 → 等到退避时间后将原始负载发回 source_topic，
///   x-retry-count 头加一，由业务消费者重新处理
/// - 预算耗尽 → 记录 ERROR 日志，需要人工介入处理
async fn handle_dlq_message(
    msg: &ConsumerMessage,
    retry_producer: &KafkaProducer,
    source_service: &str,
) -> Result<(), OrderflowError> {
    let dlq_msg: DeadLetterMessage = msg.deserialize_payload()?;

    if dlq_msg.source_service != source_service {
        debug!(
            message_id = %dlq_msg.message_id,
            owner = %dlq_msg.source_service,
            "死信消息归属其他服务，跳过"
        );
        return Ok(());
    }

    if !dlq_msg.should_retry() {
        // 已耗尽重试次数，需人工介入
        error!(
            message_id = %dlq_msg.message_id,
            source_topic = %dlq_msg.source_topic,
            source_service = %dlq_msg.source_service,
            retry_count = dlq_msg.retry_count,
            max_retries = dlq_msg.max_retries,
            failed_at = %dlq_msg.failed_at,
            error = %dlq_msg.error,
            "死信消息已耗尽重试次数，需人工介入"
        );
        return Ok(());
    }

    // 等到退避时间再投递，避免立即重放仍处于故障中的下游
    if let Some(next_retry) = dlq_msg.next_retry_at {
        let now = Utc::now();
        if next_retry > now
            && let Ok(wait) = (next_retry - now).to_std()
        {
            tokio::time::sleep(wait).await;
        }
    }

    info!(
        message_id = %dlq_msg.message_id,
        source_topic = %dlq_msg.source_topic,
        retry_count = dlq_msg.retry_count,
        max_retries = dlq_msg.max_retries,
        "重试死信消息，发回原始 topic"
    );

    let headers = HashMap::from([(
        RETRY_COUNT_HEADER.to_string(),
        (dlq_msg.retry_count + 1).to_string(),
    )]);

    retry_producer
        .send_with_headers(
            &dlq_msg.source_topic,
            &dlq_msg.message_id,
            dlq_msg.payload.as_bytes(),
            &headers,
        )
        .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// 单元测试
// ---------------------------------------------------------------------------
