//! # 进程传输层
//!
//! 管理外部代理进程的生命周期，并通过其标准输入/输出进行基于行的 JSON 协议通信。
//!
//! ## 主要功能
//! - **进程管理**: 启动代理进程并在就绪握手超时内确认其可用
//! - **请求配对**: 按请求 ID 将响应与挂起的请求一一配对
//! - **通知广播**: 将页面事件按到达顺序广播给所有订阅者
//! - **通道关闭处理**: 读取循环退出时排空挂起请求，避免调用方永久等待
//!
//! ## 模块结构
//! - `traits`: 传输层的核心 trait 定义
//! - `types`: 线协议相关的数据类型
//! - `handle`: 子进程传输实现
//! - `mock`: 用于测试的 Mock 实现
//!
//! ## 使用示例
//! ```rust,no_run
//! use wraith::proc::{ProcessHandle, Transport};
//! use wraith::Options;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = ProcessHandle::spawn(&Options::default()).await?;
//! let result = handle.request("open", serde_json::json!({ "url": "http://localhost:3000" })).await?;
//! println!("Navigation status: {}", result["status"]);
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod types;
pub mod handle;
pub mod mock;


pub use traits::Transport;
pub use types::{ErrorDetail, Notification, Request, RpcResponse};

// Re-export implementation structs
pub use handle::ProcessHandle;

// Re-export mock for development/testing
pub use mock::MockTransport;
