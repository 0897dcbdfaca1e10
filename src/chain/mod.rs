//! # 命令队列 / 链式调用层
//!
//! 本层是整个 crate 的核心：把对一个会话的所有操作组织成严格有序的命令队列，
//! 并以可链式调用的客户端对象暴露出来。
//!
//! ## 主要功能
//! - **链式组合**: 每个可链式方法同步入队并返回同一客户端，无需手动等待
//! - **严格顺序**: 每个操作在前一个操作结算后才开始，队列按入队顺序推进
//! - **尾部结算**: 等待客户端（`IntoFuture`）或调用 `settle()` 获取最近一次入队操作的结果
//! - **弹性管道**: 单个操作失败只结算自身槽位，后续已入队操作继续执行
//! - **截止时间**: 每个操作的结算都受会话级超时约束，到期即以超时错误结算
//!
//! ## 模块结构
//! - `op`: 排队操作的定义
//! - `worker`: 每会话单工作任务，串行执行队列
//! - `client`: 链式客户端实现

pub mod client;
pub mod op;
pub mod worker;

#[cfg(test)]
pub mod tests;

pub use client::Wraith;
pub use op::Operation;
