//! 内核（mihomo core）相关类型定义

use serde::{Deserialize, Serialize};

/// 登录响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthLoginResponse {
    /// 会话令牌（不透明字符串，后续请求通过 `X-Auth-Token` 携带）
    pub token: String,
    /// 过期时间（unix 秒）
    pub expires_at: u64,
}

/// 内核静态信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreInfo {
    pub version: Option<String>,
    pub arch: Option<String>,
    pub last_download_time: Option<String>,
    pub binary_exists: bool,
    pub recommended_arch: String,
}

/// 内核运行状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreStatus {
    pub running: bool,
    #[serde(default)]
    pub pid: Option<u32>,
}

/// 长时操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Start,
    Stop,
    Download,
}

impl OperationKind {
    /// 操作的中文名称，用于通知文案
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Start => "启动",
            Self::Stop => "停止",
            Self::Download => "下载 / 更新",
        }
    }

    /// 是否为启停类操作（下载单独跟踪，UI 上门控不同按钮）
    #[must_use]
    pub fn is_core_action(self) -> bool {
        matches!(self, Self::Start | Self::Stop)
    }
}

/// 长时操作状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Running,
    Success,
    Error,
}

impl OperationStatus {
    /// 是否为终态
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// 服务端跟踪的一次内核长时操作（下载 / 启动 / 停止）。
///
/// 客户端只反映服务端宣告的状态迁移，永远不会在本地杜撰终态。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreOperationState {
    pub kind: OperationKind,
    pub status: OperationStatus,
    #[serde(default)]
    pub message: Option<String>,
    /// 进度（0..=1），仅下载操作会携带
    #[serde(default)]
    pub progress: Option<f64>,
    pub started_at: String,
    #[serde(default)]
    pub finished_at: Option<String>,
}
