//! 支付服务
//!
//! 消费 orders topic 上的订单事件，派生并持久化支付记录，
//! 再从已提交的记录构造支付事件发布到 payments topic。
//! 同时提供只读 REST API 供外部查询支付记录。

pub mod consumer;
pub mod error;
pub mod handlers;
pub mod model;
pub mod processor;
pub mod producer;
pub mod repository;
pub mod routes;
pub mod state;
