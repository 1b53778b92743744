//! 通知接收槽
//!
//! 各服务把本地失败折叠成一条用户可见通知，通过这个 trait 送出，
//! 异常从不跨层传播。前端注入自己的实现（状态条、toast 等）。

/// 共享通知接收槽
pub trait Notifier: Send + Sync {
    /// 成功类提示
    fn notify_success(&self, message: &str);
    /// 失败类提示
    fn notify_error(&self, message: &str);
}

/// 仅写日志的默认实现（无 UI 的场景，例如冒烟脚本）
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_success(&self, message: &str) {
        log::info!("{message}");
    }

    fn notify_error(&self, message: &str) {
        log::warn!("{message}");
    }
}
