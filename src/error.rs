use thiserror::Error;

use crate::infrastructure::DriverError;

/// 应用程序错误类型
///
/// 单行失败不会以 `RowRemediation` 的形式向上传播，而是记录在
/// `RemediationOutcome::Failed` 里；这里的变体只用于日志和汇总。
#[derive(Debug, Error)]
pub enum AppError {
    /// 单行处理失败（本地恢复）
    #[error("第 {row} 行处理失败: {source}")]
    RowRemediation {
        row: usize,
        #[source]
        source: DriverError,
    },

    /// 翻页失败，提前结束当前校区
    #[error("翻页到第 {page} 页失败: {source}")]
    PageTransition {
        page: usize,
        #[source]
        source: DriverError,
    },

    /// 筛选/搜索没有产生列表
    #[error("校区 {campus} 筛选失败: {source}")]
    FilterApplication {
        campus: String,
        #[source]
        source: DriverError,
    },

    /// 登录会话失效，整个运行终止
    #[error("会话错误: {0}")]
    Session(String),

    /// 操作员中止
    #[error("运行已被取消")]
    Cancelled,

    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

impl AppError {
    /// 无论策略如何都必须终止整个运行的错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Session(_) | AppError::Cancelled | AppError::Config(_)
        )
    }

    /// 会话失效的驱动错误统一升级为 `Session`，其余交给 `wrap`
    pub fn from_driver(source: DriverError, wrap: impl FnOnce(DriverError) -> AppError) -> Self {
        if source.is_session_lost() {
            AppError::Session(source.to_string())
        } else {
            wrap(source)
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("缺少登录凭据，请设置 {username_var} 和 {password_var}")]
    MissingCredentials {
        username_var: &'static str,
        password_var: &'static str,
    },

    #[error("读取运行配置文件失败 ({path}): {source}")]
    RunFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("解析运行配置文件失败 ({path}): {source}")]
    RunFileParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("校区列表为空")]
    NoCampuses,
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
