//! 支付查询 API 处理器
//!
//! 只读接口，全部为存储层查询操作的直接透传。
//! 写路径只存在于消费管道中，API 不提供任何变更操作。

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::error::{PaymentError, Result};
use crate::model::Payment;
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

/// 按代理主键查询支付记录
///
/// GET /api/payments/{id}
pub async fn get_payment_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Payment>>> {
    let payment = state
        .repository
        .get_by_id(id)
        .await?
        .ok_or(PaymentError::PaymentNotFound(id))?;

    Ok(Json(ApiResponse::success(payment)))
}

/// 按业务键查询支付记录
///
/// GET /api/payments/payment/{payment_id}
pub async fn get_payment_by_payment_id(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<ApiResponse<Payment>>> {
    let payment = state.repository.get_by_payment_id(&payment_id).await?;
    Ok(Json(ApiResponse::maybe(payment)))
}

/// 按订单号列出支付记录
///
/// GET /api/payments/order/{order_id}
pub async fn list_payments_by_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Payment>>>> {
    let payments = state.repository.list_by_order_id(&order_id).await?;
    Ok(Json(ApiResponse::success(payments)))
}

/// 列出全部支付记录
///
/// GET /api/payments
pub async fn list_payments(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Payment>>>> {
    let payments = state.repository.list_all().await?;
    Ok(Json(ApiResponse::success(payments)))
}
