//! 代理组服务与延迟探测
//!
//! 延迟测试按「共享游标 + 固定数量 worker」的有界并发队列执行：
//! 每个 worker 反复认领下一个未认领的节点下标，直到取尽。
//! 单节点失败不打断其余 worker——延迟探测是尽力而为、容忍部分失败的。

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{watch, Mutex};

use crate::notify::Notifier;
use crate::traits::ProxyGateway;
use crate::types::ProxiesView;

/// 延迟测试的最大并发 worker 数
pub const MAX_PROBE_WORKERS: usize = 5;

/// 「测试中」集合的键：`group::node`
///
/// 键里带组名，不同组的并发测试不会互相污染状态。
#[must_use]
pub fn testing_key(group: &str, node: &str) -> String {
    format!("{group}::{node}")
}

/// 代理组视图的客户端真相源与延迟探测入口
pub struct ProxyService {
    gateway: Arc<dyn ProxyGateway>,
    notifier: Arc<dyn Notifier>,
    view_tx: watch::Sender<Option<ProxiesView>>,
    testing_tx: watch::Sender<HashSet<String>>,
}

impl ProxyService {
    #[must_use]
    pub fn new(gateway: Arc<dyn ProxyGateway>, notifier: Arc<dyn Notifier>) -> Self {
        let (view_tx, _) = watch::channel(None);
        let (testing_tx, _) = watch::channel(HashSet::new());
        Self {
            gateway,
            notifier,
            view_tx,
            testing_tx,
        }
    }

    /// 订阅代理组视图
    #[must_use]
    pub fn subscribe_view(&self) -> watch::Receiver<Option<ProxiesView>> {
        self.view_tx.subscribe()
    }

    /// 订阅「测试中」节点集合
    #[must_use]
    pub fn subscribe_testing(&self) -> watch::Receiver<HashSet<String>> {
        self.testing_tx.subscribe()
    }

    /// 某个节点是否正在测试
    #[must_use]
    pub fn is_testing(&self, group: &str, node: &str) -> bool {
        self.testing_tx.borrow().contains(&testing_key(group, node))
    }

    /// 拉取代理组视图；失败时清空视图并通知
    pub async fn load(&self) {
        match self.gateway.proxies().await {
            Ok(view) => {
                self.view_tx.send_replace(view);
            }
            Err(e) => {
                log::warn!("failed to load proxies view: {e}");
                self.notifier.notify_error(&e.user_message());
                self.view_tx.send_replace(None);
            }
        }
    }

    /// 切换代理组选中节点，成功后重新拉取视图
    pub async fn select(&self, group: &str, node: &str) {
        if node.trim().is_empty() {
            self.notifier.notify_error("代理节点名称不能为空");
            return;
        }
        match self.gateway.select_node(group, node).await {
            Ok(()) => {
                self.notifier
                    .notify_success(&format!("已切换代理组 {group} 的节点为 {node}"));
                self.load().await;
            }
            Err(e) => self.notifier.notify_error(&e.user_message()),
        }
    }

    /// 对一个代理组的全部节点做延迟测试。
    ///
    /// 所有节点各被探测一次；任一时刻在途探测不超过
    /// `min(MAX_PROBE_WORKERS, 节点数)`；全部结果（成败）落定后才返回。
    /// 有失败时按完成顺序上报第一个错误，否则上报一次整组成功。
    pub async fn test_group(&self, group: &str) {
        if group.trim().is_empty() {
            return;
        }

        let nodes = {
            let view = self.view_tx.borrow();
            match view.as_ref() {
                None => Err("当前无代理组数据，无法测试延迟".to_string()),
                Some(v) => match v.group(group) {
                    None => Err(format!("未找到代理组 {group}")),
                    Some(g) if g.nodes.is_empty() => Err(format!("代理组 {group} 下暂无节点")),
                    Some(g) => Ok(g.nodes.iter().map(|n| n.name.clone()).collect::<Vec<_>>()),
                },
            }
        };
        let nodes = match nodes {
            Ok(nodes) => nodes,
            Err(message) => {
                self.notifier.notify_error(&message);
                return;
            }
        };

        let cursor = AtomicUsize::new(0);
        let first_error: Mutex<Option<String>> = Mutex::new(None);

        let worker_count = nodes.len().min(MAX_PROBE_WORKERS);
        let workers =
            (0..worker_count).map(|_| self.probe_worker(group, &nodes, &cursor, &first_error));
        join_all(workers).await;

        let first_error = first_error.lock().await.take();
        match first_error {
            Some(message) => self.notifier.notify_error(&message),
            None => self
                .notifier
                .notify_success(&format!("已完成代理组 {group} 的延迟测试")),
        }
    }

    /// 单个 worker：反复认领下一个节点下标直到取尽
    async fn probe_worker(
        &self,
        group: &str,
        nodes: &[String],
        cursor: &AtomicUsize,
        first_error: &Mutex<Option<String>>,
    ) {
        loop {
            let index = cursor.fetch_add(1, Ordering::SeqCst);
            let Some(node) = nodes.get(index) else {
                break;
            };

            let key = testing_key(group, node);
            self.testing_tx.send_modify(|set| {
                set.insert(key.clone());
            });

            match self.gateway.test_node(group, node).await {
                Ok(result) => self.apply_delay(group, node, result.delay_ms),
                Err(e) => {
                    log::error!("delay test for proxy '{node}' in group '{group}' failed: {e}");
                    let mut guard = first_error.lock().await;
                    if guard.is_none() {
                        *guard = Some(e.user_message());
                    }
                }
            }

            self.testing_tx.send_modify(|set| {
                set.remove(&key);
            });
        }
    }

    /// 把一次成功探测的延迟写回视图里对应的那一个节点。
    /// 探测失败不走这里，节点保留上一次已知的延迟。
    fn apply_delay(&self, group: &str, node: &str, delay_ms: u32) {
        self.view_tx.send_modify(|view| {
            let Some(view) = view.as_mut() else { return };
            let Some(g) = view.groups.iter_mut().find(|g| g.name == group) else {
                return;
            };
            if let Some(n) = g.nodes.iter_mut().find(|n| n.name == node) {
                n.delay = Some(delay_ms);
            }
        });
    }
}
