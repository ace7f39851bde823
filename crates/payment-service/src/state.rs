//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use crate::repository::PaymentRepositoryTrait;

/// Axum 应用共享状态
///
/// 仓储以 trait object 注入，handler 测试可替换为 mock
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn PaymentRepositoryTrait>,
}

impl AppState {
    pub fn new(repository: Arc<dyn PaymentRepositoryTrait>) -> Self {
        Self { repository }
    }
}
