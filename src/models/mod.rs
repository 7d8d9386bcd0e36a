pub mod results;
pub mod row;

pub use results::{
    CampusFailure, CampusResult, PageResult, RemediationOutcome, RowFailure, RunSummary,
};
pub use row::Row;
