//! 有界日志尾部缓冲
//!
//! 批量加载（HTTP）与增量推送（事件通道）写入同一个结构，
//! 容量与顺序不随来源变化。存的是原始行（可能带 ANSI 控制码），
//! 解码推迟到渲染时由 [`crate::ansi::decode`] 完成。

use std::collections::VecDeque;

/// 默认保留的最大行数
pub const MAX_LOG_LINES: usize = 1000;

/// 容量固定的先进先出日志缓冲
#[derive(Debug, Clone)]
pub struct LogTailBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for LogTailBuffer {
    fn default() -> Self {
        Self::with_capacity(MAX_LOG_LINES)
    }
}

impl LogTailBuffer {
    /// 创建指定容量的缓冲；容量 0 视为 1
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// 整体替换缓冲内容（整批加载时使用，后写者覆盖先写者）。
    ///
    /// 输入超过容量时只保留最新的行。
    pub fn reset<I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.lines.clear();
        for line in lines {
            self.append(line);
        }
    }

    /// 追加一行；超出容量时从队首淘汰最旧的行
    pub fn append(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 从最旧到最新迭代
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// 拷贝为 `Vec`（渲染层快照用）
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}
