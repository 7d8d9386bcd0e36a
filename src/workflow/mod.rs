pub mod remediation_flow;
pub mod row_ctx;

pub use remediation_flow::{RemediationExecutor, PLACEHOLDER};
pub use row_ctx::RowCtx;
