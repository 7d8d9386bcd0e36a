//! 行处理上下文
//!
//! 封装"我正在处理哪个校区第几页的第几行"这一信息

use std::fmt::Display;

/// 行处理上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCtx {
    /// 校区名称
    pub campus: String,

    /// 页码（从1开始）
    pub page: usize,

    /// 行在当前页中的索引（从0开始）
    pub index: usize,
}

impl RowCtx {
    pub fn new(campus: impl Into<String>, page: usize, index: usize) -> Self {
        Self {
            campus: campus.into(),
            page,
            index,
        }
    }
}

impl Display for RowCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} 第{}页 行#{}]",
            self.campus,
            self.page,
            self.index + 1
        )
    }
}
