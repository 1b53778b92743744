//! 测试辅助模块
//!
//! 提供 mock 实现和便捷的测试工厂方法。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CoreError, CoreResult};
use crate::notify::Notifier;
use crate::services::testing_key;
use crate::traits::{CoreGateway, LogGateway, ProxyGateway};
use crate::types::{CoreInfo, CoreStatus, GroupDelay, NodeDelay, ProxiesView};

// ===== MockNotifier =====

/// 把通知收进内存，便于断言
#[derive(Default)]
pub struct MockNotifier {
    successes: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl MockNotifier {
    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Notifier for MockNotifier {
    fn notify_success(&self, message: &str) {
        self.successes.lock().unwrap().push(message.to_string());
    }

    fn notify_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

// ===== MockCoreGateway =====

pub fn sample_core_info() -> CoreInfo {
    CoreInfo {
        version: Some("v1.18.3".to_string()),
        arch: Some("linux-arm64".to_string()),
        last_download_time: Some("1754500000".to_string()),
        binary_exists: true,
        recommended_arch: "linux-arm64".to_string(),
    }
}

/// 记录调用次数、可注入单次失败的内核网关
#[derive(Default)]
pub struct MockCoreGateway {
    info_calls: AtomicUsize,
    status_calls: AtomicUsize,
    /// 如果 Some，下一次 `core_info` 返回此错误（取用后清除）
    info_error: Mutex<Option<CoreError>>,
}

impl MockCoreGateway {
    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn fail_info_with(&self, err: CoreError) {
        *self.info_error.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl CoreGateway for MockCoreGateway {
    async fn core_info(&self) -> CoreResult<Option<CoreInfo>> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.info_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(Some(sample_core_info()))
    }

    async fn core_status(&self) -> CoreResult<Option<CoreStatus>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(CoreStatus {
            running: true,
            pid: Some(1234),
        }))
    }

    async fn download_core(&self) -> CoreResult<CoreInfo> {
        Ok(sample_core_info())
    }

    async fn start_core(&self) -> CoreResult<()> {
        Ok(())
    }

    async fn stop_core(&self) -> CoreResult<()> {
        Ok(())
    }

    async fn restart_core(&self) -> CoreResult<()> {
        Ok(())
    }
}

// ===== MockLogGateway =====

/// 返回固定行集、可注入单次失败的日志网关
pub struct MockLogGateway {
    app: Vec<String>,
    mihomo: Vec<String>,
    error: Mutex<Option<CoreError>>,
}

impl MockLogGateway {
    pub fn new(app: Vec<String>, mihomo: Vec<String>) -> Self {
        Self {
            app,
            mihomo,
            error: Mutex::new(None),
        }
    }

    /// 下一次日志读取返回此错误（取用后清除，另一侧正常返回）
    pub fn fail_with(&self, err: CoreError) {
        *self.error.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl LogGateway for MockLogGateway {
    async fn app_log(&self) -> CoreResult<Vec<String>> {
        if let Some(err) = self.error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.app.clone())
    }

    async fn mihomo_log(&self) -> CoreResult<Vec<String>> {
        if let Some(err) = self.error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.mihomo.clone())
    }
}

// ===== MockProxyGateway =====

type ProbeOutcome = (Result<u32, String>, Duration);

/// 可配置每个节点探测结果与耗时的代理网关；
/// 同时跟踪在途探测数的峰值，用于断言有界并发。
pub struct MockProxyGateway {
    view: Mutex<Option<ProxiesView>>,
    outcomes: Mutex<HashMap<String, ProbeOutcome>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockProxyGateway {
    pub fn new(view: Option<ProxiesView>) -> Self {
        Self {
            view: Mutex::new(view),
            outcomes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// 配置某个节点的探测结果；`Err` 的字符串是面向用户的错误消息
    pub fn set_outcome(
        &self,
        group: &str,
        node: &str,
        result: Result<u32, String>,
        delay: Duration,
    ) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(testing_key(group, node), (result, delay));
    }

    /// 已发出的探测（`group::node` 键，按发起顺序）
    pub fn probe_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// 在途探测数的峰值
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProxyGateway for MockProxyGateway {
    async fn proxies(&self) -> CoreResult<Option<ProxiesView>> {
        Ok(self.view.lock().unwrap().clone())
    }

    async fn select_node(&self, _group: &str, _node: &str) -> CoreResult<()> {
        Ok(())
    }

    async fn test_group(&self, _group: &str) -> CoreResult<GroupDelay> {
        Err(CoreError::Network(
            "group-level test not mocked".to_string(),
        ))
    }

    async fn test_node(&self, group: &str, node: &str) -> CoreResult<NodeDelay> {
        let key = testing_key(group, node);
        self.calls.lock().unwrap().push(key.clone());

        let (result, delay) = self
            .outcomes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or((Ok(42), Duration::ZERO));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(delay_ms) => Ok(NodeDelay {
                group: group.to_string(),
                node: node.to_string(),
                url: "http://www.gstatic.com/generate_204".to_string(),
                timeout_ms: 5000,
                delay_ms,
            }),
            Err(message) => Err(CoreError::Api {
                code: "mihomo_delay_proxy_failed".to_string(),
                message,
            }),
        }
    }
}
