//! # Lecture Monitor
//!
//! 自动补录讲课监控记录的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器会话），只暴露能力
//! - `PageDriver` - 页面操作抽象，`ChromeDriver` 是唯一的真实实现
//! - `CancelSignal` - 协作式取消
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `SsoSession` - 登录并进入讲课监控页
//! - `RecordInspector` - 读取当前页的行
//! - `Paginator` - 判断并执行翻页
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一行"的完整补录流程
//! - `RowCtx` - 上下文封装（campus + page + index）
//! - `RemediationExecutor` - 打开详情 → 勾选填写 → 保存 → 关闭
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/run_processor` - 按顺序处理校区，管理资源
//! - `orchestrator/campus_processor` - 单个校区的筛选和分页遍历
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::open_browser;
pub use config::Config;
pub use error::{AppError, AppResult, ConfigError};
pub use infrastructure::{cancel_pair, CancelSignal, ChromeDriver, PageDriver};
pub use models::{CampusResult, RemediationOutcome, Row, RunSummary};
pub use orchestrator::{run_campuses, App, CampusProcessor, RunPlan, RunReport};
pub use workflow::{RemediationExecutor, RowCtx};
