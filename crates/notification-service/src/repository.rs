//! 通知仓储
//!
//! 提供通知记录的数据访问。与支付仓储一致：幂等保存 + 只读查询，
//! trait 接口支持 mock 测试。

use async_trait::async_trait;
use orderflow_shared::error::Result;
use sqlx::PgPool;

use crate::model::{NewNotification, Notification};

/// 通知仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepositoryTrait: Send + Sync {
    /// 幂等保存：同一 notification_id 至多落库一条，返回已提交的记录
    async fn save(&self, notification: &NewNotification) -> Result<Notification>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Notification>>;
    async fn get_by_notification_id(&self, notification_id: &str) -> Result<Option<Notification>>;
    async fn list_by_order_id(&self, order_id: &str) -> Result<Vec<Notification>>;
    async fn list_all(&self) -> Result<Vec<Notification>>;
}

/// 基于 PostgreSQL 的通知仓储
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepositoryTrait for NotificationRepository {
    /// 在单个本地事务内完成幂等插入并回读已提交的记录
    ///
    /// notification_id 上有唯一索引，重复投递的入站事件派生出相同的
    /// 业务键，`ON CONFLICT DO NOTHING` 使其不会产生第二条记录。
    async fn save(&self, notification: &NewNotification) -> Result<Notification> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO notifications (notification_id, order_id, customer_id, customer_email, message, status, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (notification_id) DO NOTHING
            "#,
        )
        .bind(&notification.notification_id)
        .bind(&notification.order_id)
        .bind(&notification.customer_id)
        .bind(&notification.customer_email)
        .bind(&notification.message)
        .bind(&notification.status)
        .bind(notification.sent_at)
        .execute(&mut *tx)
        .await?;

        let saved = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, notification_id, order_id, customer_id, customer_email, message, status, sent_at
            FROM notifications
            WHERE notification_id = $1
            "#,
        )
        .bind(&notification.notification_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(saved)
    }

    /// 按代理主键查询
    async fn get_by_id(&self, id: i64) -> Result<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, notification_id, order_id, customer_id, customer_email, message, status, sent_at
            FROM notifications
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }

    /// 按业务键查询
    async fn get_by_notification_id(
        &self,
        notification_id: &str,
    ) -> Result<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, notification_id, order_id, customer_id, customer_email, message, status, sent_at
            FROM notifications
            WHERE notification_id = $1
            "#,
        )
        .bind(notification_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }

    /// 列出某订单关联的所有通知记录
    async fn list_by_order_id(&self, order_id: &str) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, notification_id, order_id, customer_id, customer_email, message, status, sent_at
            FROM notifications
            WHERE order_id = $1
            ORDER BY sent_at DESC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    /// 列出全部通知记录
    async fn list_all(&self) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, notification_id, order_id, customer_id, customer_email, message, status, sent_at
            FROM notifications
            ORDER BY sent_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }
}
