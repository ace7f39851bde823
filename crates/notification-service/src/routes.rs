//! 路由配置模块
//!
//! 定义通知查询 REST API 的路由映射

use axum::{Router, routing::get};

use crate::{handlers, state::AppState};

/// 构建通知查询相关的路由
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(handlers::list_notifications))
        .route(
            "/api/notifications/{id}",
            get(handlers::get_notification_by_id),
        )
        .route(
            "/api/notifications/notification/{notification_id}",
            get(handlers::get_notification_by_notification_id),
        )
        .route(
            "/api/notifications/order/{order_id}",
            get(handlers::list_notifications_by_order),
        )
}
