//! API 响应相关类型定义

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// API 响应包装类型
///
/// 服务端所有 HTTP 接口都返回 `{code, message, data?}` 信封，
/// `code == "ok"` 表示成功，其余值为业务错误码或显式的空结果码
/// （例如 `log_not_found`）。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    /// 业务状态码
    pub code: String,
    /// 人类可读消息（错误时用于提示）
    #[serde(default)]
    pub message: String,
    /// 响应数据
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 响应是否成功
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == "ok"
    }

    /// 解出 `data`，失败时用服务端消息，消息为空则回退到 `fallback`。
    pub fn into_data(self, fallback: &str) -> CoreResult<T> {
        if self.is_ok() {
            if let Some(data) = self.data {
                return Ok(data);
            }
        }
        Err(self.into_error(fallback))
    }

    /// 仅确认成功（忽略 `data`）。
    pub fn ensure_ok(self, fallback: &str) -> CoreResult<()> {
        if self.is_ok() {
            return Ok(());
        }
        Err(self.into_error(fallback))
    }

    fn into_error(self, fallback: &str) -> CoreError {
        let message = if self.message.is_empty() {
            fallback.to_string()
        } else {
            self.message
        };
        CoreError::Api {
            code: self.code,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(code: &str, message: &str, data: Option<u32>) -> ApiResponse<u32> {
        ApiResponse {
            code: code.to_string(),
            message: message.to_string(),
            data,
        }
    }

    #[test]
    fn into_data_ok() {
        assert_eq!(resp("ok", "", Some(7)).into_data("回退").unwrap(), 7);
    }

    #[test]
    fn into_data_uses_server_message() {
        let err = resp("core_not_found", "内核不存在", None)
            .into_data("回退")
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Api { ref message, .. } if message == "内核不存在"
        ));
    }

    #[test]
    fn into_data_falls_back_when_message_empty() {
        let err = resp("boom", "", None).into_data("默认消息").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Api { ref message, .. } if message == "默认消息"
        ));
    }

    #[test]
    fn ok_without_data_is_error() {
        assert!(resp("ok", "", None).into_data("回退").is_err());
    }
}
