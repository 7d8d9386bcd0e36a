//! 单个校区处理器 - 编排层
//!
//! ## 状态
//!
//! ```text
//! Filtering → PageLoaded → RowsProcessed → NextPage → PageLoaded ...
//!                                        ↘ Done
//! ```
//!
//! - 单行失败只记录，不改变状态
//! - 翻页失败提前结束本校区，保留已累计的结果
//! - 筛选失败、会话失效、取消向上传播

use std::fmt::Display;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{CancelSignal, DriverError, PageDriver, Surface};
use crate::models::{CampusResult, PageResult, RemediationOutcome, Row};
use crate::services::{selectors, Paginator, RecordInspector};
use crate::workflow::{RemediationExecutor, RowCtx};

/// 校区遍历状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    Filtering,
    PageLoaded,
    RowsProcessed { has_next: bool },
    NextPage,
    Done,
}

/// 校区上下文
#[derive(Debug, Clone)]
pub struct CampusCtx {
    pub campus: String,
    pub term: String,
    /// 在本次运行中的序号（从1开始，仅用于日志）
    pub position: usize,
    pub total: usize,
}

impl CampusCtx {
    pub fn new(
        campus: impl Into<String>,
        term: impl Into<String>,
        position: usize,
        total: usize,
    ) -> Self {
        Self {
            campus: campus.into(),
            term: term.into(),
            position,
            total,
        }
    }
}

impl Display for CampusCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[校区 {}/{} {}]", self.position, self.total, self.campus)
    }
}

/// 校区处理中止：筛选失败、会话失效或取消
#[derive(Debug)]
pub struct CampusAbort {
    /// 中止前已经累计的结果
    pub partial: CampusResult,
    pub error: AppError,
}

impl Display for CampusAbort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// 校区处理器
pub struct CampusProcessor {
    inspector: RecordInspector,
    executor: RemediationExecutor,
    paginator: Paginator,
    settle_delay: Duration,
}

impl CampusProcessor {
    pub fn new(config: &Config) -> Self {
        Self::from_parts(
            RemediationExecutor::new(config),
            Paginator::new(config),
            config.settle_delay(),
        )
    }

    pub fn from_parts(
        executor: RemediationExecutor,
        paginator: Paginator,
        settle_delay: Duration,
    ) -> Self {
        Self {
            inspector: RecordInspector::new(),
            executor,
            paginator,
            settle_delay,
        }
    }

    /// 处理一个校区的全部页面
    ///
    /// 出错时 `CampusAbort` 里带着已经累计的结果。
    pub async fn process<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        ctx: &CampusCtx,
        cancel: &CancelSignal,
    ) -> Result<CampusResult, CampusAbort> {
        log_campus_start(ctx);

        let mut result = CampusResult::new(&ctx.campus, &ctx.term);
        match self.traverse(driver, ctx, cancel, &mut result).await {
            Ok(()) => {
                log_campus_complete(ctx, &result);
                Ok(result)
            }
            Err(error) => {
                result.ended_early = Some(error.to_string());
                log_campus_complete(ctx, &result);
                Err(CampusAbort {
                    partial: result,
                    error,
                })
            }
        }
    }

    async fn traverse<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        ctx: &CampusCtx,
        cancel: &CancelSignal,
        result: &mut CampusResult,
    ) -> AppResult<()> {
        let mut page = 1;
        let mut state = TraversalState::Filtering;

        loop {
            debug!("{} 第 {} 页 状态: {:?}", ctx, page, state);
            state = match state {
                TraversalState::Filtering => {
                    self.apply_filters(driver, ctx, cancel).await?;
                    TraversalState::PageLoaded
                }
                TraversalState::PageLoaded => {
                    info!("\n{} 📄 第 {} 页\n{}", ctx, page, "-".repeat(50));
                    let rows = match cancel.guard(self.inspector.inspect(driver)).await? {
                        Ok(rows) => rows,
                        Err(source) => {
                            let err = AppError::from_driver(source, |source| {
                                AppError::PageTransition { page, source }
                            });
                            if err.is_fatal() {
                                return Err(err);
                            }
                            warn!("{} ⚠ 无法读取列表，提前结束: {}", ctx, err);
                            result.ended_early = Some(err.to_string());
                            state = TraversalState::Done;
                            continue;
                        }
                    };

                    // 中途出错时本页已处理的行也要计入
                    let mut page_result = PageResult::new(rows.len());
                    let processed = self
                        .process_rows(driver, ctx, page, &rows, &mut page_result, cancel)
                        .await;
                    info!(
                        "{} 本页处理 {} 行，跳过 {} 行，失败 {} 行",
                        ctx,
                        page_result.rows_remediated,
                        page_result.rows_skipped,
                        page_result.errors.len()
                    );
                    result.absorb(page_result);
                    processed?;

                    // 以读页时的快照为准，不受本页补录结果影响
                    TraversalState::RowsProcessed {
                        has_next: self.paginator.has_next_page(&rows),
                    }
                }
                TraversalState::RowsProcessed { has_next: true } => TraversalState::NextPage,
                TraversalState::RowsProcessed { has_next: false } => {
                    info!("{} ✓ 没有更多页面", ctx);
                    TraversalState::Done
                }
                TraversalState::NextPage => {
                    match self.paginator.advance(driver, page + 1, cancel).await {
                        Ok(()) => {
                            page += 1;
                            TraversalState::PageLoaded
                        }
                        Err(err) if err.is_fatal() => return Err(err),
                        Err(err) => {
                            warn!("{} ⚠ {}，提前结束本校区", ctx, err);
                            result.ended_early = Some(err.to_string());
                            TraversalState::Done
                        }
                    }
                }
                TraversalState::Done => return Ok(()),
            };
        }
    }

    /// 选择学期和校区并搜索，直到列表出现
    async fn apply_filters<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        ctx: &CampusCtx,
        cancel: &CancelSignal,
    ) -> AppResult<()> {
        let filter_error = |source: DriverError| {
            AppError::from_driver(source, |source| AppError::FilterApplication {
                campus: ctx.campus.clone(),
                source,
            })
        };

        info!("{} 设置筛选条件 - 学期: {}, 校区: {}", ctx, ctx.term, ctx.campus);
        cancel
            .driver(
                driver.wait_for(Surface::Listing, &selectors::any_select(), None),
                filter_error,
            )
            .await?;

        let term_select = selectors::term_select();
        cancel
            .driver(driver.wait_for(Surface::Listing, &term_select, None), filter_error)
            .await?;
        cancel
            .driver(
                driver.select_option(Surface::Listing, &term_select, &ctx.term),
                filter_error,
            )
            .await?;

        let campus_select = selectors::campus_select();
        cancel
            .driver(driver.wait_for(Surface::Listing, &campus_select, None), filter_error)
            .await?;
        cancel
            .driver(
                driver.select_option(Surface::Listing, &campus_select, &ctx.campus),
                filter_error,
            )
            .await?;

        debug!("{} 等待 {:?} 后搜索...", ctx, self.settle_delay);
        cancel.sleep(self.settle_delay).await?;

        info!("{} 🔍 搜索中...", ctx);
        cancel
            .driver(
                driver.click(Surface::Listing, &selectors::search_button()),
                filter_error,
            )
            .await?;

        // 搜索耗时取决于后端，不设超时
        cancel
            .driver(
                driver.wait_for(Surface::Listing, &selectors::listing_rows(), None),
                filter_error,
            )
            .await?;
        info!("{} ✓ 结果已加载", ctx);
        Ok(())
    }

    /// 逐行串行处理，单行失败不中断
    async fn process_rows<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        ctx: &CampusCtx,
        page: usize,
        rows: &[Row],
        page_result: &mut PageResult,
        cancel: &CancelSignal,
    ) -> AppResult<()> {
        for row in rows {
            let row_ctx = RowCtx::new(&ctx.campus, page, row.index);
            let outcome = if row.is_complete() {
                info!("{} 已是 {}，跳过", row_ctx, row.completion_text);
                RemediationOutcome::Skipped("已完成".to_string())
            } else {
                self.executor.remediate(driver, row, &row_ctx, cancel).await?
            };
            debug!("{} 结果: {}", row_ctx, outcome);
            page_result.record(page, row.index, &outcome);
        }

        Ok(())
    }
}

fn log_campus_start(ctx: &CampusCtx) {
    info!("\n{}", "=".repeat(60));
    info!("{} 开始处理 (学期: {})", ctx, ctx.term);
    info!("{}", "=".repeat(60));
}

fn log_campus_complete(ctx: &CampusCtx, result: &CampusResult) {
    info!(
        "\n{} ✅ 完成: 共 {} 页，补录 {} 个班级，失败 {} 行",
        ctx,
        result.pages_visited,
        result.total_remediated,
        result.failures.len()
    );
    if let Some(reason) = &result.ended_early {
        warn!("{} 提前结束原因: {}", ctx, reason);
    }
}
