//! 支付服务入口
//!
//! 装配顺序遵循依赖方向（叶子在前）：存储客户端 -> Kafka 客户端 ->
//! 消费者 -> 生产者。所有客户端均为进程级句柄，在构造时显式注入，
//! 不使用全局可变状态。

use anyhow::Result;
use orderflow_shared::{
    config::AppConfig, database::Database, dlq::DlqConsumer, dlq::DlqProducer,
    kafka::KafkaProducer, observability, retry::RetryPolicy,
};
use payment_service::{
    consumer::OrderConsumer, processor::PaymentProcessor, producer::PaymentEventProducer,
    repository::PaymentRepository, routes, state::AppState,
};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载配置并初始化日志
    let config = AppConfig::load("payment-service").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        let mut config = AppConfig::default();
        config.service_name = "payment-service".to_string();
        config
    });
    observability::init(&config.observability)?;

    info!("Starting payment-service...");
    info!(environment = %config.environment, "Configuration loaded");

    // 2. 初始化数据库连接并执行迁移
    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;
    let pool = db.pool().clone();
    info!("Database connection established");

    // 3. 创建仓储与 Kafka 客户端
    let repository = Arc::new(PaymentRepository::new(pool));
    let kafka_producer = KafkaProducer::new(&config.kafka)?;
    let retry_policy = RetryPolicy::default();

    let producer = PaymentEventProducer::new(kafka_producer.clone());
    let dlq_producer = DlqProducer::new(
        kafka_producer.clone(),
        &config.service_name,
        retry_policy.clone(),
    );

    // 4. 创建处理器与消费者
    let processor = Arc::new(PaymentProcessor::new(
        repository.clone(),
        config.payment.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let order_consumer = OrderConsumer::new(
        &config,
        processor,
        producer,
        dlq_producer,
        retry_policy,
    )?;
    let consumer_task = tokio::spawn(order_consumer.run(shutdown_rx.clone()));

    let dlq_consumer = DlqConsumer::new(&config, kafka_producer)?;
    let dlq_task = tokio::spawn(dlq_consumer.run(shutdown_rx));

    info!("Consumers started");

    // 5. 启动只读 API
    let state = AppState::new(repository);
    let app = routes::payment_routes()
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.server_addr()).await?;
    info!(addr = %config.server_addr(), "Read API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 6. 通知消费循环退出并等待其自然结束
    let _ = shutdown_tx.send(true);
    let _ = consumer_task.await;
    let _ = dlq_task.await;

    db.close().await;
    info!("Service shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听 Ctrl+C 和 SIGTERM 信号，用于 Kubernetes 优雅关闭
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
