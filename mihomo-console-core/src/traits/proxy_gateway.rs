//! 代理组接口抽象

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{GroupDelay, NodeDelay, ProxiesView};

/// 代理组视图 / 节点控制的 HTTP 数据源
#[async_trait]
pub trait ProxyGateway: Send + Sync {
    /// 当前代理组视图；软失败返回 `None`
    async fn proxies(&self) -> CoreResult<Option<ProxiesView>>;

    /// 切换某个代理组的选中节点
    async fn select_node(&self, group: &str, node: &str) -> CoreResult<()>;

    /// 组级延迟测试（服务端一次性测完整组）
    async fn test_group(&self, group: &str) -> CoreResult<GroupDelay>;

    /// 单节点延迟测试
    async fn test_node(&self, group: &str, node: &str) -> CoreResult<NodeDelay>;
}
