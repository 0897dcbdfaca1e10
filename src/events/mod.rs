//! # 事件中继层
//!
//! 在命令队列独立运行的同时，将代理进程的异步页面事件分发给订阅者。
//!
//! ## 主要功能
//! - **事件订阅**: 支持持久监听器和一次性监听器
//! - **精确移除**: 按回调身份精确移除单个注册，不影响同名事件的其他回调
//! - **有序分发**: 按注册顺序调用回调，单个回调崩溃不会中断其余分发
//! - **开放订阅面**: 可订阅任意事件名，但只有已知通知集合中的事件会触发
//!
//! ## 事件类型
//! - **load-started / load-finished**: 页面加载生命周期
//! - **url-changed / navigation-requested**: 导航事件
//! - **resource-requested / resource-received**: 网络资源事件
//! - **alert / script-error**: 页面脚本事件
//!
//! ## 模块结构
//! - `types`: 页面事件枚举及线名称映射
//! - `relay`: 事件中继实现

pub mod relay;
pub mod types;

#[cfg(test)]
mod tests;

pub use relay::{Callback, EventRelay};
pub use types::PageEvent;
