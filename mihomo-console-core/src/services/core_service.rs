//! 内核状态协调服务
//!
//! 消费事件通道推送的内核状态 / 操作事件，把它们落到可观察状态单元；
//! 操作进入终态时触发一次权威回读（HTTP），修正推送通道覆盖不到的
//! 状态（安装版本、PID 等）。

use std::sync::Arc;

use tokio::sync::watch;

use crate::notify::Notifier;
use crate::traits::CoreGateway;
use crate::types::{
    AppEvent, CoreInfo, CoreOperationState, CoreStatus, OperationKind, OperationStatus,
};

/// 状态单元与依赖；放在 `Arc` 里以便回读任务脱离调用方生命周期
struct CoreState {
    gateway: Arc<dyn CoreGateway>,
    notifier: Arc<dyn Notifier>,
    info_tx: watch::Sender<Option<CoreInfo>>,
    status_tx: watch::Sender<Option<CoreStatus>>,
    operation_tx: watch::Sender<Option<CoreOperationState>>,
}

impl CoreState {
    /// 从 HTTP 源重新拉取内核信息与运行状态
    async fn refresh(&self) {
        let (info, status) = tokio::join!(self.gateway.core_info(), self.gateway.core_status());

        let mut first_error = None;
        match info {
            Ok(Some(info)) => {
                self.info_tx.send_replace(Some(info));
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("failed to refresh core info: {e}");
                first_error.get_or_insert(e.user_message());
            }
        }
        match status {
            Ok(Some(status)) => {
                self.status_tx.send_replace(Some(status));
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("failed to refresh core status: {e}");
                first_error.get_or_insert(e.user_message());
            }
        }

        if let Some(message) = first_error {
            self.notifier.notify_error(&message);
        }
    }
}

/// 内核信息 / 运行状态 / 长时操作的客户端真相源
pub struct CoreService {
    state: Arc<CoreState>,
}

impl CoreService {
    #[must_use]
    pub fn new(gateway: Arc<dyn CoreGateway>, notifier: Arc<dyn Notifier>) -> Self {
        let (info_tx, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(None);
        let (operation_tx, _) = watch::channel(None);
        Self {
            state: Arc::new(CoreState {
                gateway,
                notifier,
                info_tx,
                status_tx,
                operation_tx,
            }),
        }
    }

    /// 订阅内核静态信息
    #[must_use]
    pub fn subscribe_info(&self) -> watch::Receiver<Option<CoreInfo>> {
        self.state.info_tx.subscribe()
    }

    /// 订阅内核运行状态
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<Option<CoreStatus>> {
        self.state.status_tx.subscribe()
    }

    /// 订阅当前长时操作状态
    #[must_use]
    pub fn subscribe_operation(&self) -> watch::Receiver<Option<CoreOperationState>> {
        self.state.operation_tx.subscribe()
    }

    /// 是否有启停类操作正在执行（门控启动/停止按钮）
    #[must_use]
    pub fn action_in_flight(&self) -> bool {
        self.state
            .operation_tx
            .borrow()
            .as_ref()
            .is_some_and(|op| op.kind.is_core_action() && op.status == OperationStatus::Running)
    }

    /// 是否有下载操作正在执行（门控下载按钮，与启停分开跟踪）
    #[must_use]
    pub fn download_in_flight(&self) -> bool {
        self.state
            .operation_tx
            .borrow()
            .as_ref()
            .is_some_and(|op| {
                op.kind == OperationKind::Download && op.status == OperationStatus::Running
            })
    }

    /// 处理一条通道事件。
    ///
    /// 终态触发的权威回读是 fire-and-forget 的，不会阻塞后续事件处理；
    /// 回读失败只产生通知，不回滚已应用的操作状态。
    pub fn handle_event(&self, event: &AppEvent) {
        match event {
            AppEvent::CoreStatusChanged { running, pid, .. } => {
                self.state.status_tx.send_replace(Some(CoreStatus {
                    running: *running,
                    pid: *pid,
                }));
            }
            AppEvent::CoreOperationUpdated { state } => {
                self.apply_operation(state.clone());
            }
            // 本服务不关心的事件
            AppEvent::ConfigApplied { .. } | AppEvent::MihomoLogChunk { .. } => {}
        }
    }

    fn apply_operation(&self, state: CoreOperationState) {
        let terminal = state.status.is_terminal();
        let op_name = state.kind.display_name();
        let message = state.message.clone();
        let status = state.status;

        self.state.operation_tx.send_replace(Some(state));

        if !terminal {
            return;
        }

        match status {
            OperationStatus::Success => {
                let text = message.unwrap_or_else(|| format!("内核{op_name}完成"));
                self.state.notifier.notify_success(&text);
            }
            OperationStatus::Error => {
                let text = message.unwrap_or_else(|| format!("内核{op_name}失败"));
                self.state.notifier.notify_error(&text);
            }
            OperationStatus::Pending | OperationStatus::Running => {}
        }

        // 无论成败都回读一次权威状态
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.refresh().await;
        });
    }

    /// 从 HTTP 源重新拉取内核信息与运行状态
    pub async fn refresh(&self) {
        self.state.refresh().await;
    }

    /// 下载 / 更新内核（同步接口，成功后直接落下安装信息）
    pub async fn download(&self) {
        match self.state.gateway.download_core().await {
            Ok(info) => {
                self.state.info_tx.send_replace(Some(info));
                self.state.notifier.notify_success("内核已下载并安装");
            }
            Err(e) => self.state.notifier.notify_error(&e.user_message()),
        }
    }

    /// 提交内核启动请求；实际结果经事件通道推送
    pub async fn start(&self) {
        match self.state.gateway.start_core().await {
            Ok(()) => self.state.notifier.notify_success("已提交内核启动请求"),
            Err(e) => self.state.notifier.notify_error(&e.user_message()),
        }
    }

    /// 提交内核停止请求
    pub async fn stop(&self) {
        match self.state.gateway.stop_core().await {
            Ok(()) => self.state.notifier.notify_success("已提交内核停止请求"),
            Err(e) => self.state.notifier.notify_error(&e.user_message()),
        }
    }

    /// 提交内核重启请求
    pub async fn restart(&self) {
        match self.state.gateway.restart_core().await {
            Ok(()) => self.state.notifier.notify_success("已提交内核重启请求"),
            Err(e) => self.state.notifier.notify_error(&e.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::CoreError;
    use crate::test_utils::{MockCoreGateway, MockNotifier};

    fn operation(kind: OperationKind, status: OperationStatus, message: Option<&str>) -> AppEvent {
        AppEvent::CoreOperationUpdated {
            state: CoreOperationState {
                kind,
                status,
                message: message.map(str::to_string),
                progress: None,
                started_at: "1754500000".to_string(),
                finished_at: status.is_terminal().then(|| "1754500100".to_string()),
            },
        }
    }

    fn service() -> (CoreService, Arc<MockCoreGateway>, Arc<MockNotifier>) {
        let gateway = Arc::new(MockCoreGateway::default());
        let notifier = Arc::new(MockNotifier::default());
        let service = CoreService::new(gateway.clone(), notifier.clone());
        (service, gateway, notifier)
    }

    /// 等待 fire-and-forget 的回读任务落地
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn status_event_updates_cell() {
        let (service, _, _) = service();
        let mut rx = service.subscribe_status();

        service.handle_event(&AppEvent::CoreStatusChanged {
            running: true,
            pid: Some(99),
            timestamp: "1".to_string(),
        });

        rx.changed().await.unwrap();
        let status = rx.borrow().clone().unwrap();
        assert!(status.running);
        assert_eq!(status.pid, Some(99));
    }

    #[tokio::test]
    async fn running_start_sets_action_in_flight_but_not_download() {
        let (service, _, _) = service();

        service.handle_event(&operation(OperationKind::Start, OperationStatus::Running, None));
        assert!(service.action_in_flight());
        assert!(!service.download_in_flight());

        service.handle_event(&operation(
            OperationKind::Download,
            OperationStatus::Running,
            None,
        ));
        assert!(!service.action_in_flight());
        assert!(service.download_in_flight());
    }

    #[tokio::test]
    async fn terminal_transition_triggers_exactly_one_refetch() {
        let (service, gateway, _) = service();

        // 多个中间 running 更新不触发回读
        service.handle_event(&operation(OperationKind::Start, OperationStatus::Pending, None));
        service.handle_event(&operation(OperationKind::Start, OperationStatus::Running, None));
        service.handle_event(&operation(OperationKind::Start, OperationStatus::Running, None));
        settle().await;
        assert_eq!(gateway.info_calls(), 0);
        assert_eq!(gateway.status_calls(), 0);

        service.handle_event(&operation(
            OperationKind::Start,
            OperationStatus::Success,
            None,
        ));
        settle().await;
        assert_eq!(gateway.info_calls(), 1);
        assert_eq!(gateway.status_calls(), 1);
    }

    #[tokio::test]
    async fn error_without_message_falls_back_to_kind_default() {
        let (service, _, notifier) = service();

        service.handle_event(&operation(OperationKind::Start, OperationStatus::Error, None));
        settle().await;
        assert_eq!(notifier.errors(), vec!["内核启动失败"]);

        service.handle_event(&operation(
            OperationKind::Download,
            OperationStatus::Error,
            Some("镜像不可达"),
        ));
        settle().await;
        assert!(notifier.errors().contains(&"镜像不可达".to_string()));
    }

    #[tokio::test]
    async fn success_notifies_with_kind_default() {
        let (service, _, notifier) = service();

        service.handle_event(&operation(OperationKind::Stop, OperationStatus::Success, None));
        settle().await;
        assert_eq!(notifier.successes(), vec!["内核停止完成"]);
    }

    #[tokio::test]
    async fn failed_refetch_notifies_but_keeps_operation_state() {
        let (service, gateway, notifier) = service();
        gateway.fail_info_with(CoreError::Network("connection refused".to_string()));

        service.handle_event(&operation(
            OperationKind::Stop,
            OperationStatus::Success,
            None,
        ));
        settle().await;

        // 回读失败被上报
        assert!(notifier
            .errors()
            .iter()
            .any(|m| m.contains("connection refused")));
        // 已应用的操作状态不回滚
        let op = service.subscribe_operation().borrow().clone().unwrap();
        assert_eq!(op.status, OperationStatus::Success);
    }

    #[tokio::test]
    async fn unrelated_events_are_ignored() {
        let (service, gateway, notifier) = service();

        service.handle_event(&AppEvent::ConfigApplied {
            reason: "subscription_updated".to_string(),
            timestamp: "1".to_string(),
        });
        settle().await;

        assert_eq!(gateway.info_calls(), 0);
        assert!(notifier.successes().is_empty());
        assert!(notifier.errors().is_empty());
        assert!(service.subscribe_status().borrow().is_none());
    }

    #[tokio::test]
    async fn refresh_updates_cells_from_gateway() {
        let (service, gateway, _) = service();

        service.refresh().await;

        assert_eq!(gateway.info_calls(), 1);
        assert!(service.subscribe_info().borrow().is_some());
        let status = service.subscribe_status().borrow().clone().unwrap();
        assert!(status.running);
    }

    #[tokio::test]
    async fn start_action_notifies_submission() {
        let (service, _, notifier) = service();
        service.start().await;
        assert_eq!(notifier.successes(), vec!["已提交内核启动请求"]);
    }
}
