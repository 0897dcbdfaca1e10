//! # 会话注册层
//!
//! 以进程标识符为键跟踪所有存活会话，使多个独立会话可以复用查询且互不串扰。
//!
//! ## 主要功能
//! - **会话登记**: 客户端构造时将其进程句柄登记到显式创建的注册表
//! - **标识查询**: 按 pid 查询会话的传输句柄与逻辑会话 ID
//! - **条目清理**: 弱引用加定期清扫，异常终止的进程不会泄漏注册条目
//! - **测试隔离**: 注册表为显式可构造对象，多个注册表可并存
//!
//! ## 模块结构
//! - `registry`: 会话注册表实现

pub mod registry;

pub use registry::{RegistryEntry, SessionRegistry};
