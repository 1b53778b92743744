//! 日志批量加载接口抽象

use async_trait::async_trait;

use crate::error::CoreResult;

/// 日志文件的批量读取来源
///
/// 两个方法都在日志尚不存在（`log_not_found`）时返回空行集而不是错误。
#[async_trait]
pub trait LogGateway: Send + Sync {
    /// 应用自身日志
    async fn app_log(&self) -> CoreResult<Vec<String>>;

    /// mihomo 内核日志（可能带 ANSI 控制码）
    async fn mihomo_log(&self) -> CoreResult<Vec<String>>;
}
