use std::fmt;

use serde::{Deserialize, Serialize};

/// 单行处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemediationOutcome {
    /// 已保存
    Success,
    /// 未处理（已完成）
    Skipped(String),
    /// 处理失败，本次运行不再重试
    Failed(String),
}

impl fmt::Display for RemediationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediationOutcome::Success => write!(f, "成功"),
            RemediationOutcome::Skipped(reason) => write!(f, "跳过 ({})", reason),
            RemediationOutcome::Failed(cause) => write!(f, "失败 ({})", cause),
        }
    }
}

/// 单行失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    pub page: usize,
    pub index: usize,
    pub cause: String,
}

/// 一页的处理结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub rows_seen: usize,
    pub rows_remediated: usize,
    pub rows_skipped: usize,
    /// 按行顺序记录
    pub errors: Vec<RowFailure>,
}

impl PageResult {
    pub fn new(rows_seen: usize) -> Self {
        Self {
            rows_seen,
            ..Default::default()
        }
    }

    pub fn record(&mut self, page: usize, index: usize, outcome: &RemediationOutcome) {
        match outcome {
            RemediationOutcome::Success => self.rows_remediated += 1,
            RemediationOutcome::Skipped(_) => self.rows_skipped += 1,
            RemediationOutcome::Failed(cause) => self.errors.push(RowFailure {
                page,
                index,
                cause: cause.clone(),
            }),
        }
    }
}

/// 一个校区的处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampusResult {
    pub campus: String,
    pub term: String,
    pub pages_visited: usize,
    pub total_remediated: usize,
    pub total_skipped: usize,
    pub failures: Vec<RowFailure>,
    /// 翻页失败导致提前结束时的原因
    pub ended_early: Option<String>,
}

impl CampusResult {
    pub fn new(campus: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            campus: campus.into(),
            term: term.into(),
            pages_visited: 0,
            total_remediated: 0,
            total_skipped: 0,
            failures: Vec::new(),
            ended_early: None,
        }
    }

    /// 合并一页的结果
    pub fn absorb(&mut self, page: PageResult) {
        self.pages_visited += 1;
        self.total_remediated += page.rows_remediated;
        self.total_skipped += page.rows_skipped;
        self.failures.extend(page.errors);
    }
}

/// 筛选失败而跳过的校区（continue_on_error 时）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampusFailure {
    pub campus: String,
    pub cause: String,
}

/// 整个运行的汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_classes: usize,
    pub campuses_processed: usize,
    pub term: String,
    pub campuses: Vec<CampusResult>,
    pub failed_campuses: Vec<CampusFailure>,
    /// 运行被提前终止时的原因
    pub aborted: Option<String>,
}

impl RunSummary {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            total_classes: 0,
            campuses_processed: 0,
            term: term.into(),
            campuses: Vec::new(),
            failed_campuses: Vec::new(),
            aborted: None,
        }
    }

    pub fn add_campus(&mut self, result: CampusResult) {
        self.total_classes += result.total_remediated;
        self.campuses_processed += 1;
        self.campuses.push(result);
    }

    pub fn add_failure(&mut self, campus: impl Into<String>, cause: impl Into<String>) {
        self.failed_campuses.push(CampusFailure {
            campus: campus.into(),
            cause: cause.into(),
        });
    }

    /// 记录终止原因；中止的校区若已处理过页面，其部分结果照常计入
    pub fn abort(&mut self, partial: CampusResult, cause: impl Into<String>) {
        let cause = cause.into();
        if partial.pages_visited > 0 {
            self.add_campus(partial);
        } else {
            self.add_failure(partial.campus, cause.clone());
        }
        self.aborted = Some(cause);
    }

    /// 所有校区中失败的行数
    pub fn failed_rows(&self) -> usize {
        self.campuses.iter().map(|c| c.failures.len()).sum()
    }
}
