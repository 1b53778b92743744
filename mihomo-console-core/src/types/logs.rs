//! 日志接口类型定义

use serde::{Deserialize, Serialize};

/// 日志批量加载响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogResponse {
    pub lines: Vec<String>,
}
