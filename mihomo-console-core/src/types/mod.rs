//! 类型定义模块

mod core;
mod events;
mod logs;
mod proxies;
mod response;

pub use self::core::{
    AuthLoginResponse, CoreInfo, CoreOperationState, CoreStatus, OperationKind, OperationStatus,
};
pub use events::{AppEvent, EventPayload};
pub use logs::LogResponse;
pub use proxies::{GroupDelay, GroupDelayEntry, NodeDelay, ProxiesView, ProxyGroup, ProxyNode};
pub use response::ApiResponse;
