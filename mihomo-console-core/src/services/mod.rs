//! 业务逻辑服务层

mod api;
mod core_service;
mod events;
mod log_service;
mod proxy_service;

pub use api::ApiClient;
pub use core_service::CoreService;
pub use events::EventChannel;
pub use log_service::LogService;
pub use proxy_service::{testing_key, ProxyService, MAX_PROBE_WORKERS};
