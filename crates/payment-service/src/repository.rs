//! 支付仓储
//!
//! 提供支付记录的数据访问。仓储只负责持久化，不包含派生逻辑；
//! 定义 trait 接口以支持 mock 测试。

use async_trait::async_trait;
use orderflow_shared::error::Result;
use sqlx::PgPool;

use crate::model::{NewPayment, Payment};

/// 支付仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentRepositoryTrait: Send + Sync {
    /// 幂等保存：同一 payment_id 至多落库一条，返回已提交的记录
    async fn save(&self, payment: &NewPayment) -> Result<Payment>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Payment>>;
    async fn get_by_payment_id(&self, payment_id: &str) -> Result<Option<Payment>>;
    async fn list_by_order_id(&self, order_id: &str) -> Result<Vec<Payment>>;
    async fn list_all(&self) -> Result<Vec<Payment>>;
}

/// 基于 PostgreSQL 的支付仓储
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepositoryTrait for PaymentRepository {
    /// 在单个本地事务内完成幂等插入并回读已提交的记录
    ///
    /// payment_id 上有唯一索引，`ON CONFLICT DO NOTHING` 使重复投递
    /// 的订单事件不会产生第二条支付记录；无论本次插入是否生效，
    /// 回读都返回该业务键下的权威记录。
    async fn save(&self, payment: &NewPayment) -> Result<Payment> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO payments (payment_id, order_id, customer_id, amount, status, payment_method, payment_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (payment_id) DO NOTHING
            "#,
        )
        .bind(&payment.payment_id)
        .bind(&payment.order_id)
        .bind(&payment.customer_id)
        .bind(payment.amount)
        .bind(&payment.status)
        .bind(&payment.payment_method)
        .bind(payment.payment_date)
        .execute(&mut *tx)
        .await?;

        let saved = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, payment_id, order_id, customer_id, amount, status, payment_method, payment_date
            FROM payments
            WHERE payment_id = $1
            "#,
        )
        .bind(&payment.payment_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(saved)
    }

    /// 按代理主键查询
    async fn get_by_id(&self, id: i64) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, payment_id, order_id, customer_id, amount, status, payment_method, payment_date
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// 按业务键查询
    async fn get_by_payment_id(&self, payment_id: &str) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, payment_id, order_id, customer_id, amount, status, payment_method, payment_date
            FROM payments
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// 列出某订单关联的所有支付记录
    async fn list_by_order_id(&self, order_id: &str) -> Result<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, payment_id, order_id, customer_id, amount, status, payment_method, payment_date
            FROM payments
            WHERE order_id = $1
            ORDER BY payment_date DESC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// 列出全部支付记录
    async fn list_all(&self) -> Result<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, payment_id, order_id, customer_id, amount, status, payment_method, payment_date
            FROM payments
            ORDER BY payment_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}
