//! 翻页服务 - 业务能力层
//!
//! 列表没有可靠的"是否还有下一页"标志，只能按行数和完成度推断。

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{CancelSignal, DriverError, PageDriver, Surface};
use crate::models::Row;
use crate::services::selectors::{self, MAX_ROWS_PER_PAGE};

/// 翻页服务
#[derive(Debug, Clone)]
pub struct Paginator {
    page_load_timeout: Duration,
    poll_interval: Duration,
}

impl Paginator {
    pub fn new(config: &Config) -> Self {
        Self::with_timing(config.page_load_timeout(), config.poll_interval())
    }

    pub fn with_timing(page_load_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            page_load_timeout,
            poll_interval,
        }
    }

    /// 根据读页时的快照判断是否还有下一页
    ///
    /// - 不足 10 行：最后一页
    /// - 10 行全部 100%：视为最后一页（或已全部处理过）
    /// - 其余情况：可能还有内容
    ///
    /// 已知局限：最后一页恰好 10 行且含未完成行时会多翻一次，由 `advance` 的内容校验兜底。
    pub fn has_next_page(&self, snapshot: &[Row]) -> bool {
        if snapshot.len() < MAX_ROWS_PER_PAGE {
            info!("只有 {} 行 - 最后一页", snapshot.len());
            return false;
        }
        if snapshot.iter().all(Row::is_complete) {
            info!("本页 {} 行全部已完成 - 视为最后一页", snapshot.len());
            return false;
        }
        true
    }

    /// 点击下一页并等待新内容渲染
    ///
    /// 列表内容在超时前没有变化即视为翻页失败。
    pub async fn advance<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        next_page: usize,
        cancel: &CancelSignal,
    ) -> AppResult<()> {
        let transition = |source: DriverError| {
            AppError::from_driver(source, |source| AppError::PageTransition {
                page: next_page,
                source,
            })
        };
        let body = selectors::listing_body();
        let rows = selectors::listing_rows();

        let before = cancel
            .driver(driver.read_text(Surface::Listing, &body), transition)
            .await?;

        info!("正在前往第 {} 页...", next_page);
        cancel
            .driver(
                driver.click(Surface::Listing, &selectors::next_page_link()),
                transition,
            )
            .await?;

        let start = Instant::now();
        loop {
            let count = cancel
                .driver(driver.count(Surface::Listing, &rows), transition)
                .await?;
            if count > 0 {
                let now = cancel
                    .driver(driver.read_text(Surface::Listing, &body), transition)
                    .await?;
                if now != before {
                    debug!("第 {} 页已渲染 {} 行", next_page, count);
                    return Ok(());
                }
            }

            if start.elapsed() >= self.page_load_timeout {
                return Err(transition(DriverError::Timeout {
                    surface: Surface::Listing,
                    locator: rows.to_string(),
                    waited: self.page_load_timeout,
                }));
            }
            cancel.sleep(self.poll_interval).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::FakeDriver;

    fn paginator() -> Paginator {
        Paginator::with_timing(Duration::from_millis(500), Duration::from_millis(50))
    }

    fn rows(texts: &[&str]) -> Vec<Row> {
        texts.iter().enumerate().map(|(i, t)| Row::new(i, t)).collect()
    }

    #[test]
    fn test_short_page_is_last() {
        let p = paginator();
        assert!(!p.has_next_page(&[]));
        assert!(!p.has_next_page(&rows(&["42.50%"; 9])));
    }

    #[test]
    fn test_full_complete_page_is_last() {
        assert!(!paginator().has_next_page(&rows(&["100.00%"; 10])));
    }

    #[test]
    fn test_full_page_with_incomplete_row_continues() {
        let mut texts = vec!["100.00%"; 10];
        texts[7] = "";
        assert!(paginator().has_next_page(&rows(&texts)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_moves_to_next_page() {
        let driver = FakeDriver::with_listing(vec![vec!["1.00%"; 10], vec!["100.00%"; 3]]);
        paginator()
            .advance(&driver, 2, &CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(driver.current_page(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_fails_when_listing_does_not_change() {
        let driver = FakeDriver::with_listing(vec![vec!["1.00%"; 10]]);
        let err = paginator()
            .advance(&driver, 2, &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PageTransition { page: 2, .. }));
        assert_eq!(driver.current_page(), 1);
    }
}
