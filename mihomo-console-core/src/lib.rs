//! mihomo console core library
//!
//! 本地 mihomo 内核管理面板的客户端核心，包括：
//! - ANSI 日志解码（Ansi Decoder）
//! - 事件通道客户端（Event Channel）
//! - 内核操作协调（Core Service）
//! - 有界日志尾部缓冲（Log Tail）
//! - 代理延迟探测（Proxy Service）
//!
//! 业务逻辑几乎都在远端服务里；这一层是贴着 HTTP / WebSocket 契约
//! 的客户端状态机，平台无关，供 Web / TUI 等前端复用。

pub mod ansi;
pub mod error;
pub mod logbuf;
pub mod notify;
pub mod services;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use error::{CoreError, CoreResult};
pub use notify::Notifier;
pub use services::{ApiClient, CoreService, EventChannel, LogService, ProxyService};
