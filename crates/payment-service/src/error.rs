//! 支付服务错误类型
//!
//! 在共享库 OrderflowError 基础上定义本服务特有的错误变体，
//! 并为只读 API 提供错误到 HTTP 响应的映射。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orderflow_shared::error::OrderflowError;
use serde_json::json;

/// 支付服务错误
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// 只读 API 按代理主键查询无结果
    #[error("支付记录不存在: id={0}")]
    PaymentNotFound(i64),

    /// 透传共享库错误，避免在每个 match 分支手动转换
    #[error(transparent)]
    Shared(#[from] OrderflowError),
}

impl PaymentError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PaymentNotFound(_) => StatusCode::NOT_FOUND,
            Self::Shared(OrderflowError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Shared(OrderflowError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Shared(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::Shared(e) => e.code(),
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志，防止信息泄露
        let message = match &self {
            Self::Shared(e @ OrderflowError::Database(_))
            | Self::Shared(e @ OrderflowError::Kafka(_))
            | Self::Shared(e @ OrderflowError::Publish { .. })
            | Self::Shared(e @ OrderflowError::Internal(_)) => {
                tracing::error!(error = %e, "只读 API 内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, PaymentError>;
