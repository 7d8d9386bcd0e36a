//! 页面驱动抽象 - 基础设施层
//!
//! 核心流程只通过 `PageDriver` 操作浏览器，不直接接触 chromiumoxide。
//! 元素通过 `Locator` 描述，由具体驱动负责解析。

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// 浏览表面：列表页，或由某一行打开的详情标签页
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    /// 列表页（主标签页）
    Listing,
    /// 详情标签页
    Detail(u32),
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Listing => write!(f, "列表页"),
            Surface::Detail(id) => write!(f, "详情页#{}", id),
        }
    }
}

/// 元素定位描述
///
/// 每个变体都解析为"元素列表"，取第一个即为目标元素。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS 选择器
    Css(String),
    /// 匹配 CSS 且文本包含给定内容的最内层元素
    Text { css: String, text: String },
    /// 第 n 个匹配（从 0 开始）
    Nth(Box<Locator>, usize),
    /// 最后一个匹配
    Last(Box<Locator>),
    /// 在每个匹配元素内部继续按 CSS 查找
    Within(Box<Locator>, String),
    /// 只保留文本包含给定内容的匹配
    HasText(Box<Locator>, String),
    /// 匹配元素的父元素
    Parent(Box<Locator>),
    /// 按顺序尝试多个定位，结果合并
    AnyOf(Vec<Locator>),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Locator::Text {
            css: css.into(),
            text: text.into(),
        }
    }

    pub fn nth(self, index: usize) -> Self {
        Locator::Nth(Box::new(self), index)
    }

    pub fn last(self) -> Self {
        Locator::Last(Box::new(self))
    }

    pub fn within(self, css: impl Into<String>) -> Self {
        Locator::Within(Box::new(self), css.into())
    }

    pub fn has_text(self, text: impl Into<String>) -> Self {
        Locator::HasText(Box::new(self), text.into())
    }

    pub fn parent(self) -> Self {
        Locator::Parent(Box::new(self))
    }

    pub fn any_of(locators: Vec<Locator>) -> Self {
        Locator::AnyOf(locators)
    }

    /// 生成一个求值为 `Element[]` 的 JS 表达式
    pub fn to_js(&self) -> String {
        match self {
            Locator::Css(css) => {
                format!("Array.from(document.querySelectorAll({}))", js_str(css))
            }
            Locator::Text { css, text } => format!(
                "Array.from(document.querySelectorAll({css})).filter(e => \
                 !{skip}.includes(e.tagName) && \
                 (e.textContent || '').includes({text}) && \
                 !Array.from(e.children).some(c => \
                 !{skip}.includes(c.tagName) && (c.textContent || '').includes({text})))",
                css = js_str(css),
                text = js_str(text),
                skip = NON_VISIBLE_TAGS
            ),
            Locator::Nth(base, index) => {
                format!("({}).slice({}, {})", base.to_js(), index, index + 1)
            }
            Locator::Last(base) => format!("({}).slice(-1)", base.to_js()),
            Locator::Within(base, css) => format!(
                "({}).flatMap(e => Array.from(e.querySelectorAll({})))",
                base.to_js(),
                js_str(css)
            ),
            Locator::HasText(base, text) => format!(
                "({}).filter(e => (e.textContent || '').includes({}))",
                base.to_js(),
                js_str(text)
            ),
            Locator::Parent(base) => format!(
                "({}).map(e => e.parentElement).filter(e => e)",
                base.to_js()
            ),
            Locator::AnyOf(locators) => {
                let parts: Vec<String> = locators.iter().map(|l| l.to_js()).collect();
                format!("[].concat({})", parts.join(", "))
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(css) => write!(f, "{}", css),
            Locator::Text { css, text } => write!(f, "{}:has-text(\"{}\")", css, text),
            Locator::Nth(base, index) => write!(f, "{} >> nth={}", base, index),
            Locator::Last(base) => write!(f, "{} >> last", base),
            Locator::Within(base, css) => write!(f, "{} {}", base, css),
            Locator::HasText(base, text) => write!(f, "{}:has-text(\"{}\")", base, text),
            Locator::Parent(base) => write!(f, "{} >> ..", base),
            Locator::AnyOf(locators) => {
                let parts: Vec<String> = locators.iter().map(|l| l.to_string()).collect();
                write!(f, "{}", parts.join(" | "))
            }
        }
    }
}

/// 文本匹配时跳过的标签（不渲染为可见文本）
const NON_VISIBLE_TAGS: &str = "['SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE', 'TITLE']";

/// JSON 字符串字面量即合法的 JS 字符串字面量
pub(crate) fn js_str(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// 页面驱动错误
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("元素不存在: {locator} ({surface})")]
    ElementNotFound { surface: Surface, locator: String },

    #[error("等待元素超时 ({waited:?}): {locator} ({surface})")]
    Timeout {
        surface: Surface,
        locator: String,
        waited: Duration,
    },

    #[error("下拉框中没有选项: {label}")]
    OptionNotFound { label: String },

    #[error("浏览表面不存在: {0}")]
    SurfaceNotFound(Surface),

    #[error("执行脚本失败: {0}")]
    Script(String),

    #[error("会话已失效: {0}")]
    SessionLost(String),

    #[error("浏览器错误: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("脚本结果解析失败: {0}")]
    Json(#[from] serde_json::Error),
}

impl DriverError {
    pub fn is_session_lost(&self) -> bool {
        matches!(self, DriverError::SessionLost(_))
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// 页面驱动能力
///
/// 职责：
/// - 只暴露"找元素 / 读 / 点 / 填 / 选 / 开关标签页 / 执行脚本"的能力
/// - 不认识校区、学期、行
///
/// `timeout` 为 `None` 表示无限等待，调用方负责用取消信号包裹。
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 主标签页导航
    async fn navigate(&self, url: &str) -> DriverResult<()>;

    /// 等待元素出现
    async fn wait_for(
        &self,
        surface: Surface,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> DriverResult<()>;

    /// 当前匹配的元素数量
    async fn count(&self, surface: Surface, locator: &Locator) -> DriverResult<usize>;

    /// 读取元素文本（textContent）
    async fn read_text(&self, surface: Surface, locator: &Locator) -> DriverResult<String>;

    async fn click(&self, surface: Surface, locator: &Locator) -> DriverResult<()>;

    async fn fill(&self, surface: Surface, locator: &Locator, value: &str) -> DriverResult<()>;

    /// 按选项文本选择下拉框
    async fn select_option(
        &self,
        surface: Surface,
        locator: &Locator,
        label: &str,
    ) -> DriverResult<()>;

    /// 点击列表页上的触发元素，阻塞直到新标签页出现
    async fn open_secondary(&self, trigger: &Locator) -> DriverResult<Surface>;

    async fn run_script(&self, surface: Surface, script: &str) -> DriverResult<JsonValue>;

    async fn close_surface(&self, surface: Surface) -> DriverResult<()>;

    /// 登录会话是否仍然有效
    async fn session_alive(&self) -> bool;
}
