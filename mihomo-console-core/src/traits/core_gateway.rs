//! 内核管理接口抽象

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{CoreInfo, CoreStatus};

/// 内核信息 / 生命周期控制的 HTTP 权威数据源
#[async_trait]
pub trait CoreGateway: Send + Sync {
    /// 内核静态信息；服务端未给消息的软失败返回 `None`
    async fn core_info(&self) -> CoreResult<Option<CoreInfo>>;

    /// 内核运行状态；软失败同上
    async fn core_status(&self) -> CoreResult<Option<CoreStatus>>;

    /// 下载 / 更新内核（同步完成，返回安装后的信息）
    async fn download_core(&self) -> CoreResult<CoreInfo>;

    /// 提交内核启动请求（实际进度经事件通道推送）
    async fn start_core(&self) -> CoreResult<()>;

    /// 提交内核停止请求
    async fn stop_core(&self) -> CoreResult<()>;

    /// 提交内核重启请求
    async fn restart_core(&self) -> CoreResult<()>;
}
