//! Platform-agnostic application bootstrap for mihomo console.
//!
//! Provides `AppState` (service container), `AppStateBuilder` (gateway
//! injection), and the event-channel lifecycle: the channel opens once the
//! auth signal is ready, fans envelopes out to the services in arrival
//! order, and is re-opened on the next readiness edge after it dies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use mihomo_console_core::services::{
    ApiClient, CoreService, EventChannel, LogService, ProxyService,
};
use mihomo_console_core::traits::{CoreGateway, LogGateway, ProxyGateway};
use mihomo_console_core::types::AppEvent;
use mihomo_console_core::{CoreResult, Notifier};

/// 鉴权 / 就绪信号
///
/// `ready` 表示初始配置加载已完成，可以建立事件通道；
/// `token` 为 `None` 时按匿名部署处理（连接不带令牌）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub ready: bool,
    pub token: Option<String>,
}

/// Platform-agnostic application state.
///
/// Holds the API client, all services and the auth signal. Every frontend
/// constructs this once at startup via [`AppStateBuilder`]. Dropping the
/// `AppState` tears the event loop down and closes the channel.
pub struct AppState {
    api: Arc<ApiClient>,
    /// 内核状态协调服务
    pub core_service: Arc<CoreService>,
    /// 日志服务
    pub log_service: Arc<LogService>,
    /// 代理组服务
    pub proxy_service: Arc<ProxyService>,
    auth_tx: watch::Sender<AuthState>,
    event_loop_started: AtomicBool,
}

/// 服务装配器；测试可以注入 mock 网关替换 HTTP 实现
pub struct AppStateBuilder {
    api: Arc<ApiClient>,
    notifier: Arc<dyn Notifier>,
    core_gateway: Option<Arc<dyn CoreGateway>>,
    log_gateway: Option<Arc<dyn LogGateway>>,
    proxy_gateway: Option<Arc<dyn ProxyGateway>>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            core_gateway: None,
            log_gateway: None,
            proxy_gateway: None,
        }
    }

    #[must_use]
    pub fn with_core_gateway(mut self, gateway: Arc<dyn CoreGateway>) -> Self {
        self.core_gateway = Some(gateway);
        self
    }

    #[must_use]
    pub fn with_log_gateway(mut self, gateway: Arc<dyn LogGateway>) -> Self {
        self.log_gateway = Some(gateway);
        self
    }

    #[must_use]
    pub fn with_proxy_gateway(mut self, gateway: Arc<dyn ProxyGateway>) -> Self {
        self.proxy_gateway = Some(gateway);
        self
    }

    /// 装配 `AppState`；未注入的网关一律落到真实的 `ApiClient`
    #[must_use]
    pub fn build(self) -> Arc<AppState> {
        let core_gateway = self
            .core_gateway
            .unwrap_or_else(|| self.api.clone() as Arc<dyn CoreGateway>);
        let log_gateway = self
            .log_gateway
            .unwrap_or_else(|| self.api.clone() as Arc<dyn LogGateway>);
        let proxy_gateway = self
            .proxy_gateway
            .unwrap_or_else(|| self.api.clone() as Arc<dyn ProxyGateway>);

        let (auth_tx, _) = watch::channel(AuthState::default());

        Arc::new(AppState {
            core_service: Arc::new(CoreService::new(core_gateway, self.notifier.clone())),
            log_service: Arc::new(LogService::new(log_gateway, self.notifier.clone())),
            proxy_service: Arc::new(ProxyService::new(proxy_gateway, self.notifier)),
            api: self.api,
            auth_tx,
            event_loop_started: AtomicBool::new(false),
        })
    }
}

impl AppState {
    /// 底层 HTTP 客户端
    #[must_use]
    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    /// 订阅鉴权信号
    #[must_use]
    pub fn subscribe_auth(&self) -> watch::Receiver<AuthState> {
        self.auth_tx.subscribe()
    }

    /// 更新鉴权信号；令牌同时落到 HTTP 客户端。
    ///
    /// 令牌身份变化（登录 / 登出）会促使事件循环关掉现有连接重建。
    pub async fn set_auth(&self, ready: bool, token: Option<String>) {
        self.api.set_token(token.clone()).await;
        self.auth_tx.send_replace(AuthState { ready, token });
    }

    /// 密码登录；成功后把令牌接入鉴权信号
    pub async fn login(&self, password: &str) -> CoreResult<()> {
        let resp = self.api.login(password).await?;
        self.set_auth(true, Some(resp.token)).await;
        Ok(())
    }

    /// 登出：丢弃令牌但保持就绪（匿名连接是否可用由服务端决定）
    pub async fn logout(&self) {
        self.set_auth(true, None).await;
    }

    /// 启动时的整批状态拉取：内核信息 / 日志 / 代理组视图
    pub async fn run_startup(&self) {
        tokio::join!(
            self.core_service.refresh(),
            self.log_service.load(),
            self.proxy_service.load(),
        );
    }

    /// 把一条通道事件按到达顺序分发给各服务
    pub fn dispatch_event(&self, event: &AppEvent) {
        self.core_service.handle_event(event);
        self.log_service.handle_event(event);
    }

    /// 启动事件循环后台任务。
    ///
    /// 每个 `AppState` 同一时刻至多一条活跃连接：重复调用返回 `None`。
    /// `AppState` 被丢弃或 `JoinHandle` 被 `abort()` 时通道关闭。
    pub fn spawn_event_loop(&self) -> Option<JoinHandle<()>> {
        if self.event_loop_started.swap(true, Ordering::SeqCst) {
            log::warn!("event loop already running, ignoring spawn request");
            return None;
        }
        let api = Arc::clone(&self.api);
        let core_service = Arc::clone(&self.core_service);
        let log_service = Arc::clone(&self.log_service);
        let auth_rx = self.auth_tx.subscribe();
        Some(tokio::spawn(event_loop(
            api,
            core_service,
            log_service,
            auth_rx,
        )))
    }
}

/// 事件循环：等就绪 → 建连 → 按序分发 → 连接失效后等下一次就绪窗口。
///
/// `auth_rx` 对端（`AppState`）被丢弃时循环退出。
async fn event_loop(
    api: Arc<ApiClient>,
    core_service: Arc<CoreService>,
    log_service: Arc<LogService>,
    mut auth_rx: watch::Receiver<AuthState>,
) {
    loop {
        // 等待就绪窗口
        while !auth_rx.borrow_and_update().ready {
            if auth_rx.changed().await.is_err() {
                return;
            }
        }
        let token = auth_rx.borrow().token.clone();

        let url = match api.events_url() {
            Ok(url) => url,
            Err(e) => {
                log::error!("cannot derive event channel url: {e}");
                return;
            }
        };

        let mut channel = match EventChannel::connect(&url, token.as_deref()).await {
            Ok(channel) => channel,
            Err(e) => {
                log::warn!("event channel connect failed: {e}");
                // 连接失败同样等下一次鉴权变化再试
                if auth_rx.changed().await.is_err() {
                    return;
                }
                continue;
            }
        };
        log::info!("event channel established");

        // 通道断开后是否立即按当前鉴权状态重开
        let mut reopen_now = false;

        loop {
            tokio::select! {
                event = channel.next_event() => {
                    match event {
                        Ok(Some(event)) => {
                            core_service.handle_event(&event);
                            log_service.handle_event(&event);
                        }
                        Ok(None) => {
                            log::info!("event channel closed by server");
                            break;
                        }
                        Err(e) => {
                            log::warn!("event channel failed: {e}");
                            break;
                        }
                    }
                }
                changed = auth_rx.changed() => {
                    if changed.is_err() {
                        channel.close().await;
                        return;
                    }
                    let auth = auth_rx.borrow().clone();
                    if !auth.ready || auth.token != token {
                        log::info!("auth changed, closing event channel");
                        channel.close().await;
                        reopen_now = auth.ready;
                        break;
                    }
                }
            }
        }

        // 连接已失效；除非鉴权刚刚变化且仍就绪，否则等下一次就绪窗口
        if !reopen_now && auth_rx.changed().await.is_err() {
            return;
        }
    }
}
