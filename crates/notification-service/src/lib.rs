//! 通知服务
//!
//! 独立消费 orders 与 payments 两个 topic 上的事件，为每条入站事件
//! 派生并持久化一条通知记录，再通过发送器抽象做 fire-and-forget 的
//! 外部交付。同时提供只读 REST API 供外部查询通知记录。

pub mod consumer;
pub mod error;
pub mod handlers;
pub mod model;
pub mod processor;
pub mod repository;
pub mod routes;
pub mod sender;
pub mod state;
