//! 单行补录流程 - 流程层
//!
//! 核心职责：定义"一行"的完整处理流程
//!
//! 流程顺序：
//! 1. 点击 Monitoring Log → 等待详情标签页
//! 2. 执行补录脚本（勾选 + 填写 + 保存）
//! 3. 等待保存成功提示 → 点击确认
//! 4. 关闭详情标签页
//! 5. 冷却

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{CancelSignal, DriverError, PageDriver, Surface};
use crate::models::{RemediationOutcome, Row};
use crate::services::selectors;
use crate::workflow::row_ctx::RowCtx;

/// 备注字段统一填写的内容
pub const PLACEHOLDER: &str = "ok";

/// 补录脚本的返回值
#[derive(Debug, Deserialize)]
struct SaveReport {
    saved: bool,
    #[serde(default)]
    toggles: usize,
    #[serde(default)]
    fields: usize,
}

/// 单行补录流程
///
/// - 每行只尝试一次，不重试
/// - 失败时尽量关闭详情页，保证列表页可以继续处理下一行
/// - 会话失效和取消会向上传播，其余失败收敛为 `RemediationOutcome::Failed`
pub struct RemediationExecutor {
    cooldown: Duration,
    placeholder: String,
}

impl RemediationExecutor {
    pub fn new(config: &Config) -> Self {
        Self::with_cooldown(config.cooldown())
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            cooldown,
            placeholder: PLACEHOLDER.to_string(),
        }
    }

    pub async fn remediate<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        row: &Row,
        ctx: &RowCtx,
        cancel: &CancelSignal,
    ) -> AppResult<RemediationOutcome> {
        if row.is_complete() {
            return Ok(RemediationOutcome::Skipped("已完成".to_string()));
        }

        info!("{} 完成度 {}，开始处理...", ctx, row.display_completion());

        let mut surface = None;
        let outcome = match self.apply(driver, ctx, cancel, &mut surface).await {
            Ok(()) => {
                info!("{} ✓ 已保存", ctx);
                RemediationOutcome::Success
            }
            Err(err) => {
                if let Some(surface) = surface {
                    close_quietly(driver, surface, ctx).await;
                }
                match err {
                    AppError::RowRemediation { source, .. } if source.is_session_lost() => {
                        return Err(AppError::Session(source.to_string()));
                    }
                    AppError::RowRemediation { .. } => {
                        if !driver.session_alive().await {
                            return Err(AppError::Session(format!(
                                "{} 处理失败后会话已失效: {}",
                                ctx, err
                            )));
                        }
                        warn!("{} ⚠ {}", ctx, err);
                        RemediationOutcome::Failed(err.to_string())
                    }
                    other => return Err(other),
                }
            }
        };

        // 每处理一行都要冷却，避免压垮后端
        debug!("{} 冷却 {:?}", ctx, self.cooldown);
        cancel.sleep(self.cooldown).await?;
        Ok(outcome)
    }

    /// 步骤 1-4；`surface` 记录已打开的详情页，供失败时清理
    async fn apply<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        ctx: &RowCtx,
        cancel: &CancelSignal,
        surface: &mut Option<Surface>,
    ) -> AppResult<()> {
        let row_error = |source: DriverError| AppError::RowRemediation {
            row: ctx.index,
            source,
        };

        // 1. 打开详情页（加载时间不可预估，不设超时）
        let detail = cancel
            .driver(
                driver.open_secondary(&selectors::monitoring_log_link(ctx.index)),
                row_error,
            )
            .await?;
        *surface = Some(detail);

        debug!("{} 等待监控表单...", ctx);
        cancel
            .driver(
                driver.wait_for(detail, &selectors::save_button(), None),
                row_error,
            )
            .await?;

        // 2. 一次性勾选、填写并保存
        let value = cancel
            .driver(
                driver.run_script(detail, &selectors::remediation_script(&self.placeholder)),
                row_error,
            )
            .await?;
        let report: SaveReport =
            serde_json::from_value(value).map_err(|e| row_error(DriverError::Json(e)))?;
        if !report.saved {
            return Err(row_error(DriverError::Script("保存按钮不存在".to_string())));
        }
        debug!(
            "{} 已勾选 {} 项、填写 {} 处，等待保存结果...",
            ctx, report.toggles, report.fields
        );

        // 3. 等待保存成功并确认
        cancel
            .driver(
                driver.wait_for(detail, &selectors::saved_message(), None),
                row_error,
            )
            .await?;
        cancel
            .driver(driver.click(detail, &selectors::confirm_button()), row_error)
            .await?;

        // 4. 关闭详情页
        cancel
            .driver(driver.close_surface(detail), row_error)
            .await?;
        *surface = None;
        Ok(())
    }
}

/// 失败路径上的清理，不影响结果
async fn close_quietly<D: PageDriver + ?Sized>(driver: &D, surface: Surface, ctx: &RowCtx) {
    if let Err(e) = driver.close_surface(surface).await {
        warn!("{} 关闭{}失败: {}", ctx, surface, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{cancel_pair, FakeDriver};

    fn ctx(index: usize) -> RowCtx {
        RowCtx::new(FakeDriver::default_campus(), 1, index)
    }

    #[tokio::test]
    async fn test_complete_row_is_skipped_without_driver_calls() {
        let driver = FakeDriver::with_listing(vec![vec!["100.00%"]]);
        let executor = RemediationExecutor::with_cooldown(Duration::ZERO);
        let outcome = executor
            .remediate(&driver, &Row::new(0, "100.00%"), &ctx(0), &CancelSignal::never())
            .await
            .unwrap();

        assert!(matches!(outcome, RemediationOutcome::Skipped(_)));
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_successful_remediation_closes_detail() {
        let driver = FakeDriver::with_listing(vec![vec!["42.50%"]]);
        let executor = RemediationExecutor::with_cooldown(Duration::ZERO);
        let outcome = executor
            .remediate(&driver, &Row::new(0, "42.50%"), &ctx(0), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(outcome, RemediationOutcome::Success);
        assert_eq!(driver.open_surfaces(), 0);
        assert_eq!(driver.closed_surfaces(), 1);
        assert_eq!(
            driver.completion_of(FakeDriver::default_campus(), 1, 0).as_deref(),
            Some("100.00%")
        );
    }

    #[tokio::test]
    async fn test_unconfirmed_save_fails_and_cleans_up() {
        let driver = FakeDriver::with_listing(vec![vec![""]]).fail_row(
            FakeDriver::default_campus(),
            1,
            0,
        );
        let executor = RemediationExecutor::with_cooldown(Duration::ZERO);
        let outcome = executor
            .remediate(&driver, &Row::new(0, ""), &ctx(0), &CancelSignal::never())
            .await
            .unwrap();

        assert!(matches!(outcome, RemediationOutcome::Failed(_)));
        assert_eq!(driver.open_surfaces(), 0);
    }

    #[tokio::test]
    async fn test_session_loss_is_fatal() {
        let driver = FakeDriver::with_listing(vec![vec![""]]).lose_session_at(
            FakeDriver::default_campus(),
            1,
            0,
        );
        let executor = RemediationExecutor::with_cooldown(Duration::ZERO);
        let err = executor
            .remediate(&driver, &Row::new(0, ""), &ctx(0), &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Session(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_follows_success() {
        let driver = FakeDriver::with_listing(vec![vec!["10.00%"]]);
        let executor = RemediationExecutor::with_cooldown(Duration::from_secs(1));
        let start = tokio::time::Instant::now();
        executor
            .remediate(&driver, &Row::new(0, "10.00%"), &ctx(0), &CancelSignal::never())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_crashed_detail_fails_row_only() {
        let driver = FakeDriver::with_listing(vec![vec!["3.00%"]]).crash_detail_on(
            FakeDriver::default_campus(),
            1,
            0,
        );
        let executor = RemediationExecutor::with_cooldown(Duration::ZERO);
        let outcome = executor
            .remediate(&driver, &Row::new(0, "3.00%"), &ctx(0), &CancelSignal::never())
            .await
            .unwrap();

        match outcome {
            RemediationOutcome::Failed(cause) => assert!(cause.contains("浏览表面不存在")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(driver.open_surfaces(), 0);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_save_closes_detail() {
        let driver = FakeDriver::with_listing(vec![vec!["10.00%"]]).hang_save_on(
            FakeDriver::default_campus(),
            1,
            0,
        );
        let executor = RemediationExecutor::with_cooldown(Duration::ZERO);
        let (handle, signal) = cancel_pair();
        let row = Row::new(0, "10.00%");
        let context = ctx(0);

        let (result, _) = tokio::join!(
            executor.remediate(&driver, &row, &context, &signal),
            async {
                tokio::task::yield_now().await;
                handle.cancel();
            }
        );

        assert!(matches!(result, Err(AppError::Cancelled)));
        assert_eq!(driver.opened_rows().len(), 1);
        assert_eq!(driver.open_surfaces(), 0);
        assert_eq!(driver.closed_surfaces(), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_cooldown() {
        let driver = FakeDriver::with_listing(vec![vec!["10.00%"]]);
        let executor = RemediationExecutor::with_cooldown(Duration::from_secs(3600));
        let (handle, signal) = cancel_pair();
        let row = Row::new(0, "10.00%");
        let context = ctx(0);

        let (result, _) = tokio::join!(
            executor.remediate(&driver, &row, &context, &signal),
            async {
                tokio::task::yield_now().await;
                handle.cancel();
            }
        );
        assert!(matches!(result, Err(AppError::Cancelled)));
    }
}
