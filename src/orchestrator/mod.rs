//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责校区遍历和分页调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `run_processor` - 运行处理器
//! - 管理应用生命周期（初始化、登录、运行）
//! - 按配置顺序遍历校区（Vec<String>）
//! - 决定筛选失败时跳过还是终止
//! - 管理浏览器资源（Browser、ChromeDriver）
//! - 输出全局统计信息
//!
//! ### `campus_processor` - 单个校区处理器
//! - 应用筛选条件（学期、校区）
//! - 按状态机遍历分页（TraversalState）
//! - 逐行委托 RemediationExecutor
//! - 输出单个校区的统计信息
//!
//! ## 层次关系
//!
//! ```text
//! run_processor (处理 Vec<Campus>)
//!     ↓
//! campus_processor (处理 Vec<Page>)
//!     ↓
//! workflow::RemediationExecutor (处理单个 Row)
//!     ↓
//! services (能力层：inspector / paginator / sso)
//!     ↓
//! infrastructure (基础设施：PageDriver)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：run_processor 管校区列表，campus_processor 管单个校区
//! 2. **资源隔离**：只有编排层持有 Browser 和 ChromeDriver
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure

pub mod campus_processor;
pub mod run_processor;

// 重新导出主要类型
pub use campus_processor::{CampusAbort, CampusCtx, CampusProcessor, TraversalState};
pub use run_processor::{run_campuses, App, RunPlan, RunReport};
