//! HTTP API 客户端
//!
//! 所有接口都返回 `{code, message, data?}` 信封；本模块负责把信封
//! 映射为 `CoreResult`，错误消息为空时回退到每个操作自己的默认文案。

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;

use crate::error::{CoreError, CoreResult};
use crate::traits::{CoreGateway, LogGateway, ProxyGateway};
use crate::types::{
    ApiResponse, AuthLoginResponse, CoreInfo, CoreStatus, GroupDelay, LogResponse, NodeDelay,
    ProxiesView,
};

/// 请求默认超时（秒）
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// 内核下载是同步接口，可能持续数分钟
const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// 会话令牌请求头
const AUTH_HEADER: &str = "X-Auth-Token";

/// 事件通道路径
const EVENTS_PATH: &str = "/api/events/ws";

/// 管理后端 HTTP 客户端
///
/// 持有共享的 `reqwest::Client` 与当前会话令牌；
/// 令牌存在时自动附加 `X-Auth-Token` 请求头。
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    /// 创建客户端；`base_url` 形如 `http://127.0.0.1:3000`（不带末尾斜杠）
    pub fn new(base_url: impl Into<String>) -> CoreResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP client initialization failed: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            token: RwLock::new(None),
        })
    }

    /// 替换会话令牌（登录 / 登出时调用）
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    /// 当前会话令牌的拷贝
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// 由 HTTP base URL 推导事件通道的 WebSocket URL
    /// （`http` → `ws`，`https` → `wss`；令牌在建立连接时另行附加）
    pub fn events_url(&self) -> CoreResult<String> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| CoreError::InvalidUrl(e.to_string()))?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(CoreError::InvalidUrl(format!(
                    "unsupported scheme for event channel: {other}"
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|()| CoreError::InvalidUrl(format!("cannot switch {} to {scheme}", self.base_url)))?;
        url.set_path(EVENTS_PATH);
        url.set_query(None);
        Ok(url.into())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> CoreResult<ApiResponse<T>> {
        let mut req = self.http.get(self.endpoint(path));
        if let Some(token) = self.token.read().await.as_deref() {
            req = req.header(AUTH_HEADER, token);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("HTTP request failed: {e}")))?;
        resp.json()
            .await
            .map_err(|e| CoreError::Serialization(format!("failed to parse response body: {e}")))
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: Option<&B>,
        timeout: Option<Duration>,
    ) -> CoreResult<ApiResponse<T>> {
        let mut req = self.http.post(self.endpoint(path));
        if let Some(token) = self.token.read().await.as_deref() {
            req = req.header(AUTH_HEADER, token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("HTTP request failed: {e}")))?;
        resp.json()
            .await
            .map_err(|e| CoreError::Serialization(format!("failed to parse response body: {e}")))
    }

    /// 密码登录，换取会话令牌（令牌不会自动存入客户端）
    pub async fn login(&self, password: &str) -> CoreResult<AuthLoginResponse> {
        let body = serde_json::json!({ "password": password });
        self.post_json("/api/auth/login", Some(&body), None)
            .await?
            .into_data("登录失败")
    }
}

/// `code != "ok"` 且服务端没给消息时按「显式空结果」处理，返回 `None`
fn soft_data<T>(resp: ApiResponse<T>) -> CoreResult<Option<T>> {
    if resp.is_ok() {
        if let Some(data) = resp.data {
            return Ok(Some(data));
        }
    }
    if resp.message.is_empty() {
        Ok(None)
    } else {
        Err(CoreError::Api {
            code: resp.code,
            message: resp.message,
        })
    }
}

/// 日志接口专用：`log_not_found` 表示日志尚不存在，折叠为空行集
fn log_lines(resp: ApiResponse<LogResponse>) -> CoreResult<Vec<String>> {
    if resp.is_ok() {
        if let Some(data) = resp.data {
            return Ok(data.lines);
        }
    }
    if resp.code != "log_not_found" && !resp.message.is_empty() {
        return Err(CoreError::Api {
            code: resp.code,
            message: resp.message,
        });
    }
    Ok(Vec::new())
}

#[async_trait::async_trait]
impl CoreGateway for ApiClient {
    async fn core_info(&self) -> CoreResult<Option<CoreInfo>> {
        soft_data(self.get_json("/api/core").await?)
    }

    async fn core_status(&self) -> CoreResult<Option<CoreStatus>> {
        soft_data(self.get_json("/api/core/status").await?)
    }

    async fn download_core(&self) -> CoreResult<CoreInfo> {
        let body = serde_json::json!({});
        self.post_json(
            "/api/core/download",
            Some(&body),
            Some(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS)),
        )
        .await?
        .into_data("内核下载失败")
    }

    async fn start_core(&self) -> CoreResult<()> {
        self.post_json::<serde_json::Value, serde_json::Value>("/api/core/start", None, None)
            .await?
            .ensure_ok("启动内核失败")
    }

    async fn stop_core(&self) -> CoreResult<()> {
        self.post_json::<serde_json::Value, serde_json::Value>("/api/core/stop", None, None)
            .await?
            .ensure_ok("停止内核失败")
    }

    async fn restart_core(&self) -> CoreResult<()> {
        self.post_json::<serde_json::Value, serde_json::Value>("/api/core/restart", None, None)
            .await?
            .ensure_ok("重启内核失败")
    }
}

#[async_trait::async_trait]
impl LogGateway for ApiClient {
    async fn app_log(&self) -> CoreResult<Vec<String>> {
        log_lines(self.get_json("/api/logs/app").await?)
    }

    async fn mihomo_log(&self) -> CoreResult<Vec<String>> {
        log_lines(self.get_json("/api/logs/mihomo").await?)
    }
}

#[async_trait::async_trait]
impl ProxyGateway for ApiClient {
    async fn proxies(&self) -> CoreResult<Option<ProxiesView>> {
        soft_data(self.get_json("/api/mihomo/proxies").await?)
    }

    async fn select_node(&self, group: &str, node: &str) -> CoreResult<()> {
        let path = format!(
            "/api/mihomo/proxies/{}/select",
            urlencoding::encode(group)
        );
        let body = serde_json::json!({ "name": node });
        self.post_json::<serde_json::Value, _>(&path, Some(&body), None)
            .await?
            .ensure_ok("切换节点失败")
    }

    async fn test_group(&self, group: &str) -> CoreResult<GroupDelay> {
        let path = format!("/api/mihomo/proxies/{}/test", urlencoding::encode(group));
        let body = serde_json::json!({});
        self.post_json(&path, Some(&body), None)
            .await?
            .into_data("测试节点延迟失败")
    }

    async fn test_node(&self, group: &str, node: &str) -> CoreResult<NodeDelay> {
        let path = format!(
            "/api/mihomo/proxies/{}/nodes/{}/test",
            urlencoding::encode(group),
            urlencoding::encode(node)
        );
        let body = serde_json::json!({});
        self.post_json(&path, Some(&body), None)
            .await?
            .into_data("测试节点延迟失败")
    }
}
