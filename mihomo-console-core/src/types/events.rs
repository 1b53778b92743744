//! 事件通道消息类型定义

use serde::Deserialize;

use crate::error::{CoreError, CoreResult};
use crate::types::CoreOperationState;

/// 事件通道下行消息，按 `type` 字段区分
///
/// 服务端单条 WebSocket 文本帧对应一个事件。
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// 配置已重新生成并应用
    ConfigApplied { reason: String, timestamp: String },
    /// 内核运行状态变更（连接建立时服务端也会先推送一次快照）
    CoreStatusChanged {
        running: bool,
        #[serde(default)]
        pid: Option<u32>,
        timestamp: String,
    },
    /// 内核长时操作状态更新
    CoreOperationUpdated { state: CoreOperationState },
    /// mihomo 日志增量
    MihomoLogChunk {
        stream: String,
        chunk: String,
        timestamp: String,
    },
}

/// 已知的事件 `type` 值
const KNOWN_KINDS: &[&str] = &[
    "config_applied",
    "core_status_changed",
    "core_operation_updated",
    "mihomo_log_chunk",
];

/// 一条事件消息的解析结果
///
/// 未识别的 `type` 不是错误：通道必须丢弃它并继续存活，
/// 所以这里显式建模为 `Unknown` 而不是解析失败。
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// 已识别的事件
    Event(AppEvent),
    /// 未识别的事件类型（记录后丢弃）
    Unknown { kind: String },
}

impl EventPayload {
    /// 解析一条事件通道文本消息。
    ///
    /// 返回 `Err` 仅表示消息不符合信封形状（非 JSON、缺少 `type`、
    /// 已知类型但字段残缺）；调用方记录日志并丢弃，不得因此关闭通道。
    pub fn parse(text: &str) -> CoreResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| CoreError::Serialization(format!("invalid event payload: {e}")))?;

        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                CoreError::Serialization("event payload missing `type` field".to_string())
            })?
            .to_string();

        if !KNOWN_KINDS.contains(&kind.as_str()) {
            return Ok(Self::Unknown {
                kind: kind.to_string(),
            });
        }

        let event = serde_json::from_value(value)
            .map_err(|e| CoreError::Serialization(format!("malformed `{kind}` event: {e}")))?;
        Ok(Self::Event(event))
    }
}
