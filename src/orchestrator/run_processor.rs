//! 运行处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责会话资源和校区遍历。
//!
//! 1. **应用初始化**：日志文件、连接/启动浏览器、创建 ChromeDriver
//! 2. **建立会话**：SSO 登录并进入讲课监控页
//! 3. **校区遍历**：按配置顺序逐个委托 campus_processor
//! 4. **错误策略**：筛选失败时按 continue_on_error 决定跳过还是终止
//! 5. **全局统计**：汇总并写入日志文件
//!
//! 浏览器会话只在这里创建和销毁，下层组件只拿到引用。

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::{CancelSignal, ChromeDriver, PageDriver};
use crate::models::RunSummary;
use crate::orchestrator::campus_processor::{CampusAbort, CampusCtx, CampusProcessor};
use crate::services::SsoSession;
use crate::utils::logging;

/// 一次运行的范围
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub term: String,
    /// 顺序决定汇总顺序
    pub campuses: Vec<String>,
    pub continue_on_error: bool,
}

impl RunPlan {
    pub fn from_config(config: &Config) -> Self {
        Self {
            term: config.term.clone(),
            campuses: config.campuses.clone(),
            continue_on_error: config.continue_on_error,
        }
    }
}

/// 一次运行的结果
///
/// 运行被终止时 `summary` 仍包含终止前的全部结果。
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub aborted: Option<AppError>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

/// 按顺序处理所有校区
///
/// 会话失效和取消总是终止整个运行；筛选失败在 `continue_on_error` 时跳过该校区。
pub async fn run_campuses<D: PageDriver + ?Sized>(
    driver: &D,
    processor: &CampusProcessor,
    plan: &RunPlan,
    cancel: &CancelSignal,
) -> RunReport {
    let mut summary = RunSummary::new(&plan.term);
    let total = plan.campuses.len();

    for (idx, campus) in plan.campuses.iter().enumerate() {
        let ctx = CampusCtx::new(campus, &plan.term, idx + 1, total);

        match processor.process(driver, &ctx, cancel).await {
            Ok(result) => summary.add_campus(result),
            Err(CampusAbort { partial, error })
                if error.is_fatal() || !plan.continue_on_error =>
            {
                error!("{} ❌ 运行终止: {}", ctx, error);
                summary.abort(partial, error.to_string());
                return RunReport {
                    summary,
                    aborted: Some(error),
                };
            }
            Err(abort) => {
                warn!("{} ⚠ 跳过该校区: {}", ctx, abort);
                summary.add_failure(campus, abort.to_string());
            }
        }
    }

    RunReport {
        summary,
        aborted: None,
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    _browser_task: tokio::task::JoinHandle<()>,
    driver: ChromeDriver,
}

impl App {
    /// 初始化应用：写日志头、打开浏览器
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file, &config.term)?;
        logging::log_startup(&config);

        let (browser, page, browser_task) = browser::open_browser(&config).await?;
        let driver = ChromeDriver::new(browser, page, config.poll_interval(), config.app_host());

        Ok(Self {
            config,
            _browser_task: browser_task,
            driver,
        })
    }

    /// 登录并处理全部校区
    pub async fn run(&self, cancel: &CancelSignal) -> Result<RunSummary> {
        self.config
            .validate_credentials()
            .context("无法登录")?;

        SsoSession::new(&self.config)
            .establish(&self.driver, cancel)
            .await
            .context("建立会话失败")?;

        info!("\n📊 开始按校区处理讲课监控...");
        let processor = CampusProcessor::new(&self.config);
        let plan = RunPlan::from_config(&self.config);
        let report = run_campuses(&self.driver, &processor, &plan, cancel).await;

        // 终止时也要先把已有结果写入日志
        logging::print_final_stats(&report.summary, &self.config.output_log_file);
        logging::append_summary(&self.config.output_log_file, &report.summary)?;

        match report.aborted {
            Some(err) => Err(err.into()),
            None => Ok(report.summary),
        }
    }
}
