//! 代理组视图相关类型定义

use serde::{Deserialize, Serialize};

/// 单个代理节点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// 最近一次测得的延迟（毫秒）；探测失败不会覆盖旧值
    #[serde(default)]
    pub delay: Option<u32>,
}

/// 代理组
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyGroup {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// 当前选中的节点名
    #[serde(default)]
    pub now: Option<String>,
    pub nodes: Vec<ProxyNode>,
}

/// 代理组整体视图
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxiesView {
    pub groups: Vec<ProxyGroup>,
}

impl ProxiesView {
    /// 按名称查找代理组
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&ProxyGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// 单节点延迟测试结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDelay {
    pub group: String,
    pub node: String,
    pub url: String,
    pub timeout_ms: u64,
    pub delay_ms: u32,
}

/// 组级延迟测试中单个节点的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDelayEntry {
    pub node: String,
    pub delay_ms: u32,
}

/// 组级延迟测试结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDelay {
    pub group: String,
    pub url: String,
    pub timeout_ms: u64,
    pub results: Vec<GroupDelayEntry>,
}
