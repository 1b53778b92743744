//! 日志服务
//!
//! 应用日志与 mihomo 日志各自一个有界尾部缓冲。整批加载（HTTP）和
//! 增量推送（事件通道）写同一个缓冲，整批加载后写覆盖先写。
//! 存原始行，渲染时再经 [`crate::ansi::decode`] 解码。

use std::sync::Arc;

use tokio::sync::watch;

use crate::logbuf::LogTailBuffer;
use crate::notify::Notifier;
use crate::traits::LogGateway;
use crate::types::AppEvent;

/// 日志尾部状态的客户端真相源
pub struct LogService {
    gateway: Arc<dyn LogGateway>,
    notifier: Arc<dyn Notifier>,
    app_tx: watch::Sender<LogTailBuffer>,
    mihomo_tx: watch::Sender<LogTailBuffer>,
}

impl LogService {
    #[must_use]
    pub fn new(gateway: Arc<dyn LogGateway>, notifier: Arc<dyn Notifier>) -> Self {
        let (app_tx, _) = watch::channel(LogTailBuffer::default());
        let (mihomo_tx, _) = watch::channel(LogTailBuffer::default());
        Self {
            gateway,
            notifier,
            app_tx,
            mihomo_tx,
        }
    }

    /// 订阅应用日志尾部
    #[must_use]
    pub fn subscribe_app(&self) -> watch::Receiver<LogTailBuffer> {
        self.app_tx.subscribe()
    }

    /// 订阅 mihomo 日志尾部
    #[must_use]
    pub fn subscribe_mihomo(&self) -> watch::Receiver<LogTailBuffer> {
        self.mihomo_tx.subscribe()
    }

    /// 整批加载两份日志并替换缓冲内容
    pub async fn load(&self) {
        let (app, mihomo) = tokio::join!(self.gateway.app_log(), self.gateway.mihomo_log());

        match (app, mihomo) {
            (Ok(app), Ok(mihomo)) => {
                self.app_tx.send_modify(|buf| buf.reset(app));
                self.mihomo_tx.send_modify(|buf| buf.reset(mihomo));
            }
            (Err(e), _) | (_, Err(e)) => {
                log::warn!("failed to load logs: {e}");
                self.notifier.notify_error(&e.user_message());
            }
        }
    }

    /// 处理一条通道事件：只关心 mihomo 日志增量
    pub fn handle_event(&self, event: &AppEvent) {
        if let AppEvent::MihomoLogChunk { chunk, .. } = event {
            let line = chunk.clone();
            self.mihomo_tx.send_modify(|buf| buf.append(line));
        }
    }
}
