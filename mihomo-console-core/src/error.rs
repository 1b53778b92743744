//! Unified error type definition

use thiserror::Error;

/// Core layer error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// 网络传输失败（连接失败、请求被拒绝等）
    #[error("Network error: {0}")]
    Network(String),

    /// 服务端返回了非 "ok" 的业务错误码
    #[error("API error: {code} - {message}")]
    Api { code: String, message: String },

    /// URL 解析失败
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Whether it is expected behavior (soft business codes, empty results, etc.),
    /// used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Api { code, .. } => {
                matches!(
                    code.as_str(),
                    "log_not_found" | "merged_config_not_found" | "mihomo_proxies_failed"
                )
            }
            _ => false,
        }
    }

    /// 面向用户的消息：业务错误用服务端给的消息，其余用错误描述。
    /// 通知槽上报时统一走这里。
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
