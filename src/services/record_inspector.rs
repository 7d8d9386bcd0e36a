//! 行检查服务 - 业务能力层
//!
//! 只负责"读出当前页每一行的完成度"，不做任何修改

use tracing::debug;

use crate::infrastructure::{DriverResult, PageDriver, Surface};
use crate::models::Row;
use crate::services::selectors::{self, MAX_ROWS_PER_PAGE};

/// 行检查服务
///
/// 职责：
/// - 读取当前列表页最多 10 行的最后一列
/// - 每行只读一次
/// - 不打开详情、不翻页
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordInspector;

impl RecordInspector {
    pub fn new() -> Self {
        Self
    }

    /// 读取当前列表页的行快照
    pub async fn inspect<D: PageDriver + ?Sized>(&self, driver: &D) -> DriverResult<Vec<Row>> {
        let count = driver
            .count(Surface::Listing, &selectors::listing_rows())
            .await?
            .min(MAX_ROWS_PER_PAGE);

        let mut rows = Vec::with_capacity(count);
        for index in 0..count {
            let text = driver
                .read_text(Surface::Listing, &selectors::completion_cell(index))
                .await?;
            rows.push(Row::new(index, text));
        }

        debug!(
            "读取到 {} 行，其中 {} 行需要处理",
            rows.len(),
            rows.iter().filter(|r| !r.is_complete()).count()
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::FakeDriver;

    #[tokio::test]
    async fn test_inspect_classifies_rows() {
        let driver = FakeDriver::with_listing(vec![vec!["100.00%", "42.50%", "", " 100.00% "]]);
        let rows = RecordInspector::new().inspect(&driver).await.unwrap();

        let flagged: Vec<usize> = rows
            .iter()
            .filter(|r| !r.is_complete())
            .map(|r| r.index)
            .collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(flagged, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_inspect_reads_each_row_once() {
        let driver = FakeDriver::with_listing(vec![vec!["100.00%"; 10]]);
        RecordInspector::new().inspect(&driver).await.unwrap();

        let reads = driver
            .calls()
            .iter()
            .filter(|c| c.starts_with("read_text"))
            .count();
        assert_eq!(reads, 10);
    }

    #[tokio::test]
    async fn test_inspect_caps_at_page_size() {
        let driver = FakeDriver::with_listing(vec![vec!["1.00%"; 12]]);
        let rows = RecordInspector::new().inspect(&driver).await.unwrap();
        assert_eq!(rows.len(), MAX_ROWS_PER_PAGE);
    }
}
