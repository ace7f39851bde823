//! 通知查询 API 处理器
//!
//! 只读接口，全部为存储层查询操作的直接透传。

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::error::{NotificationError, Result};
use crate::model::Notification;
use crate::state::AppState;

/// 统一 API 响应信封
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "OK".to_string(),
            message: String::new(),
            data: Some(data),
        }
    }

    /// 按业务键查询允许空结果：success 仍为 true，data 为 null
    pub fn maybe(data: Option<T>) -> Self {
        Self {
            success: true,
            code: "OK".to_string(),
            message: String::new(),
            data,
        }
    }
}

/// 按代理主键查询通知记录
///
/// GET /api/notifications/{id}
pub async fn get_notification_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Notification>>> {
    let notification = state
        .repository
        .get_by_id(id)
        .await?
        .ok_or(NotificationError::NotificationNotFound(id))?;

    Ok(Json(ApiResponse::success(notification)))
}

/// 按业务键查询通知记录
///
/// GET /api/notifications/notification/{notification_id}
pub async fn get_notification_by_notification_id(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
) -> Result<Json<ApiResponse<Notification>>> {
    let notification = state
        .repository
        .get_by_notification_id(&notification_id)
        .await?;
    Ok(Json(ApiResponse::maybe(notification)))
}

/// 按订单号列出通知记录
///
/// GET /api/notifications/order/{order_id}
pub async fn list_notifications_by_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Notification>>>> {
    let notifications = state.repository.list_by_order_id(&order_id).await?;
    Ok(Json(ApiResponse::success(notifications)))
}

/// 列出全部通知记录
///
/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Notification>>>> {
    let notifications = state.repository.list_all().await?;
    Ok(Json(ApiResponse::success(notifications)))
}
