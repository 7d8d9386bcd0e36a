use crate::services::selectors::COMPLETE_TEXT;

/// 列表中的一行
///
/// 每次读页都重新生成，不跨页缓存。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 当前页内的位置（0-9）
    pub index: usize,
    /// 最后一列的完成度文本（已去除首尾空白，可能为空）
    pub completion_text: String,
}

impl Row {
    pub fn new(index: usize, completion_text: impl AsRef<str>) -> Self {
        Self {
            index,
            completion_text: completion_text.as_ref().trim().to_string(),
        }
    }

    /// 只有 "100.00%" 算完成；空文本表示还没有监控数据，需要处理
    pub fn is_complete(&self) -> bool {
        self.completion_text == COMPLETE_TEXT
    }

    /// 用于日志展示的完成度
    pub fn display_completion(&self) -> &str {
        if self.completion_text.is_empty() {
            "<空>"
        } else {
            &self.completion_text
        }
    }
}
