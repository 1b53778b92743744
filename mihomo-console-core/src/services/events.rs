//! 事件通道客户端
//!
//! 持有唯一一条到 `/api/events/ws` 的长连接。令牌通过查询参数携带——
//! 连接建立先于任何请求/响应交换，无法附加自定义请求头。
//!
//! 连接断开后不做自动重连：通道只是标记失效，由拥有它的生命周期
//! 在下一次就绪窗口（鉴权重新就绪）重新建立。

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{CoreError, CoreResult};
use crate::types::{AppEvent, EventPayload};

/// 一条已建立的事件通道连接
pub struct EventChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl EventChannel {
    /// 建立连接。`events_url` 为 `ws(s)://.../api/events/ws`；
    /// 令牌存在时以 `?token=` 查询参数附加（匿名部署可以没有令牌）。
    pub async fn connect(events_url: &str, token: Option<&str>) -> CoreResult<Self> {
        let mut url = Url::parse(events_url).map_err(|e| CoreError::InvalidUrl(e.to_string()))?;
        if let Some(token) = token {
            url.set_query(Some(&format!("token={}", urlencoding::encode(token))));
        }

        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| CoreError::Network(format!("event channel connect failed: {e}")))?;
        log::debug!("event channel connected");
        Ok(Self { stream })
    }

    /// 取下一条事件，保持服务端发送顺序。
    ///
    /// 返回 `Ok(None)` 表示对端正常关闭。畸形消息与未识别的事件类型
    /// 记录日志后跳过，绝不因此终止连接；Ping/Pong/二进制帧直接忽略。
    pub async fn next_event(&mut self) -> CoreResult<Option<AppEvent>> {
        loop {
            let Some(message) = self.stream.next().await else {
                return Ok(None);
            };
            let message = match message {
                Ok(m) => m,
                Err(e) => {
                    return Err(CoreError::Network(format!(
                        "event channel transport error: {e}"
                    )));
                }
            };
            match message {
                Message::Text(text) => match EventPayload::parse(&text) {
                    Ok(EventPayload::Event(event)) => return Ok(Some(event)),
                    Ok(EventPayload::Unknown { kind }) => {
                        log::debug!("ignoring unknown event kind: {kind}");
                    }
                    Err(e) => {
                        log::warn!("discarding malformed event payload: {e}");
                    }
                },
                Message::Close(_) => return Ok(None),
                // keep-alive 与非文本帧
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {}
            }
        }
    }

    /// 主动关闭连接（幂等；关闭失败只记日志）
    pub async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            log::debug!("event channel close: {e}");
        }
    }
}
