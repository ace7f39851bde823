//! 路由配置模块
//!
//! 定义支付查询 REST API 的路由映射

use axum::{Router, routing::get};

use crate::{handlers, state::AppState};

/// 构建支付查询相关的路由
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments", get(handlers::list_payments))
        .route("/api/payments/{id}", get(handlers::get_payment_by_id))
        .route(
            "/api/payments/payment/{payment_id}",
            get(handlers::get_payment_by_payment_id),
        )
        .route(
            "/api/payments/order/{order_id}",
            get(handlers::list_payments_by_order),
        )
}
