//! ANSI SGR 解码模块
//!
//! 把带 ANSI 颜色控制码的日志文本解码为有序的带样式片段，
//! 供渲染层直接使用。只处理 SGR（`ESC[...m`）序列，其余控制码原样忽略。

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// SGR 序列匹配模式
const SGR_PATTERN: &str = r"\x1b\[[0-9;]*m";

fn sgr_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SGR_PATTERN).ok()).as_ref()
}

/// 16 色 ANSI 颜色（8 基础色 + 8 亮色）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl AnsiColor {
    /// 颜色名（与前端 CSS class 词表一致）
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::White => "white",
            Self::BrightBlack => "bright-black",
            Self::BrightRed => "bright-red",
            Self::BrightGreen => "bright-green",
            Self::BrightYellow => "bright-yellow",
            Self::BrightBlue => "bright-blue",
            Self::BrightMagenta => "bright-magenta",
            Self::BrightCyan => "bright-cyan",
            Self::BrightWhite => "bright-white",
        }
    }

    /// 从 0..=7 的色序号取基础色或亮色
    fn from_index(index: u16, bright: bool) -> Option<Self> {
        let color = match (index, bright) {
            (0, false) => Self::Black,
            (1, false) => Self::Red,
            (2, false) => Self::Green,
            (3, false) => Self::Yellow,
            (4, false) => Self::Blue,
            (5, false) => Self::Magenta,
            (6, false) => Self::Cyan,
            (7, false) => Self::White,
            (0, true) => Self::BrightBlack,
            (1, true) => Self::BrightRed,
            (2, true) => Self::BrightGreen,
            (3, true) => Self::BrightYellow,
            (4, true) => Self::BrightBlue,
            (5, true) => Self::BrightMagenta,
            (6, true) => Self::BrightCyan,
            (7, true) => Self::BrightWhite,
            _ => return None,
        };
        Some(color)
    }
}

/// 一个片段的样式属性
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnsiStyle {
    pub bold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<AnsiColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<AnsiColor>,
}

impl AnsiStyle {
    /// 是否不携带任何样式属性
    ///
    /// 解码结果若只有一个素色片段，调用方可以跳过样式包装直接渲染。
    #[must_use]
    pub fn is_plain(self) -> bool {
        self == Self::default()
    }
}

/// 共享同一样式的最大文本连续段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyledSegment {
    pub text: String,
    pub style: AnsiStyle,
}

/// 把一段文本解码为带样式片段序列。
///
/// 纯函数：每次调用都从空样式开始，样式不跨行延续——
/// 一行里打开的颜色在下一行不会继续生效（与前端行为一致，
/// 多行彩色日志中跨行的颜色因此不会按预期渲染；这是既有行为，不做修正）。
///
/// 所有片段的 `text` 按序拼接等于去掉全部 SGR 序列后的原文本。
#[must_use]
pub fn decode(text: &str) -> Vec<StyledSegment> {
    let Some(re) = sgr_regex() else {
        // 正则编译失败时退化为单个素色片段
        return vec![StyledSegment {
            text: text.to_string(),
            style: AnsiStyle::default(),
        }];
    };

    let mut segments = Vec::new();
    let mut style = AnsiStyle::default();
    let mut buffer = String::new();
    let mut last_index = 0;

    for m in re.find_iter(text) {
        let chunk = &text[last_index..m.start()];
        if !chunk.is_empty() {
            buffer.push_str(chunk);
        }
        // 序列之间没有文本时不输出空片段
        if !buffer.is_empty() {
            segments.push(StyledSegment {
                text: std::mem::take(&mut buffer),
                style,
            });
        }

        // 去掉 `ESC[` 前缀和 `m` 结尾，剩下分号分隔的参数表
        let params = &text[m.start() + 2..m.end() - 1];
        style = apply_sgr(&parse_params(params), style);
        last_index = m.end();
    }

    let rest = &text[last_index..];
    if !rest.is_empty() {
        buffer.push_str(rest);
    }
    if !buffer.is_empty() {
        segments.push(StyledSegment {
            text: buffer,
            style,
        });
    }

    segments
}

/// 解析参数表；非数字项直接跳过
fn parse_params(params: &str) -> Vec<u16> {
    params
        .split(';')
        .filter_map(|p| p.parse::<u16>().ok())
        .collect()
}

/// 按序应用一条 SGR 序列的参数，后出现的码覆盖先出现的码
fn apply_sgr(codes: &[u16], mut style: AnsiStyle) -> AnsiStyle {
    // `ESC[m` 及参数全部无效的序列等价于重置
    if codes.is_empty() {
        return AnsiStyle::default();
    }

    for &code in codes {
        match code {
            0 => style = AnsiStyle::default(),
            1 => style.bold = true,
            22 => style.bold = false,
            30..=37 => {
                if let Some(color) = AnsiColor::from_index(code - 30, false) {
                    style.foreground = Some(color);
                }
            }
            90..=97 => {
                if let Some(color) = AnsiColor::from_index(code - 90, true) {
                    style.foreground = Some(color);
                }
            }
            39 => style.foreground = None,
            40..=47 => {
                if let Some(color) = AnsiColor::from_index(code - 40, false) {
                    style.background = Some(color);
                }
            }
            100..=107 => {
                if let Some(color) = AnsiColor::from_index(code - 100, true) {
                    style.background = Some(color);
                }
            }
            49 => style.background = None,
            // 其他 SGR 码（下划线、斜体等）暂不处理
            _ => {}
        }
    }

    style
}
