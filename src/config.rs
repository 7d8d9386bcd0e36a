use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

pub const USERNAME_VAR: &str = "BINUS_USERNAME";
pub const PASSWORD_VAR: &str = "BINUS_PASSWORD";

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 浏览器调试端口（连接已打开的浏览器时使用）
    pub browser_debug_port: u16,
    /// 为 true 时自行启动浏览器，而不是连接调试端口
    pub launch_browser: bool,
    /// 启动浏览器时使用的可执行文件
    pub chrome_executable: Option<String>,
    /// 启动浏览器时是否无界面
    pub headless: bool,
    /// 站点首页
    pub base_url: String,
    /// 讲课监控页
    pub monitoring_url: String,
    // --- 登录凭据 ---
    pub username: String,
    pub password: String,
    // --- 运行范围 ---
    pub term: String,
    /// 按顺序处理
    pub campuses: Vec<String>,
    /// 某个校区筛选失败时是否继续下一个校区
    pub continue_on_error: bool,
    // --- 节奏控制 ---
    /// 每处理一行后的冷却时间，避免压垮后端
    pub cooldown_ms: u64,
    /// 选择筛选条件 / 切换角色后的等待时间
    pub settle_ms: u64,
    /// 翻页和登录步骤的超时
    pub page_load_timeout_ms: u64,
    /// 轮询元素的间隔
    pub poll_interval_ms: u64,
    /// 输出日志文件
    pub output_log_file: String,
    /// 运行配置文件（可选）
    pub run_config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            launch_browser: false,
            chrome_executable: None,
            headless: false,
            base_url: "https://acadservices.apps.binus.ac.id/".to_string(),
            monitoring_url:
                "https://acadservices.apps.binus.ac.id/newStaff/#/Monitoring/LectureMonitoring"
                    .to_string(),
            username: String::new(),
            password: String::new(),
            term: "2025, Even Semester".to_string(),
            campuses: vec![
                "Binus Kemanggisan".to_string(),
                "Binus Alam Sutera".to_string(),
            ],
            continue_on_error: false,
            cooldown_ms: 1000,
            settle_ms: 4000,
            page_load_timeout_ms: 30_000,
            poll_interval_ms: 250,
            output_log_file: "monitoring_log.txt".to_string(),
            run_config_file: "monitoring.toml".to_string(),
        }
    }
}

/// 运行配置文件内容，所有字段可选
#[derive(Debug, Default, Deserialize)]
pub struct RunFile {
    pub term: Option<String>,
    pub campuses: Option<Vec<String>>,
    pub continue_on_error: Option<bool>,
}

impl RunFile {
    pub fn parse(content: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::RunFileParse {
            path: path.to_string(),
            source,
        })
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            launch_browser: std::env::var("LAUNCH_BROWSER").ok().and_then(|v| v.parse().ok()).unwrap_or(default.launch_browser),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.chrome_executable),
            headless: std::env::var("HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            base_url: std::env::var("BASE_URL").unwrap_or(default.base_url),
            monitoring_url: std::env::var("MONITORING_URL").unwrap_or(default.monitoring_url),
            username: std::env::var(USERNAME_VAR).unwrap_or(default.username),
            password: std::env::var(PASSWORD_VAR).unwrap_or(default.password),
            term: std::env::var("TERM_NAME").unwrap_or(default.term),
            campuses: std::env::var("CAMPUSES").ok().map(|v| parse_campus_list(&v)).unwrap_or(default.campuses),
            continue_on_error: std::env::var("CONTINUE_ON_ERROR").ok().and_then(|v| v.parse().ok()).unwrap_or(default.continue_on_error),
            cooldown_ms: std::env::var("COOLDOWN_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.cooldown_ms),
            settle_ms: std::env::var("SETTLE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.settle_ms),
            page_load_timeout_ms: std::env::var("PAGE_LOAD_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.page_load_timeout_ms),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_interval_ms),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            run_config_file: std::env::var("RUN_CONFIG_FILE").unwrap_or(default.run_config_file),
        }
    }

    /// 读取环境变量，再用运行配置文件（存在时）覆盖学期和校区
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_env();
        let path = config.run_config_file.clone();
        if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| {
                ConfigError::RunFileRead {
                    path: path.clone(),
                    source,
                }
            })?;
            config.apply_run_file(RunFile::parse(&content, &path)?);
        }
        if config.campuses.is_empty() {
            return Err(ConfigError::NoCampuses);
        }
        Ok(config)
    }

    pub fn apply_run_file(&mut self, file: RunFile) {
        if let Some(term) = file.term {
            self.term = term;
        }
        if let Some(campuses) = file.campuses {
            self.campuses = campuses;
        }
        if let Some(continue_on_error) = file.continue_on_error {
            self.continue_on_error = continue_on_error;
        }
    }

    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(ConfigError::MissingCredentials {
                username_var: USERNAME_VAR,
                password_var: PASSWORD_VAR,
            });
        }
        Ok(())
    }

    /// 站点主机名，用于判断会话是否被重定向走
    pub fn app_host(&self) -> String {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_millis(self.page_load_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// 逗号分隔的校区列表
fn parse_campus_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_campus_list_trims_and_drops_empty() {
        let campuses = parse_campus_list(" Binus Kemanggisan, ,Binus Alam Sutera ");
        assert_eq!(campuses, vec!["Binus Kemanggisan", "Binus Alam Sutera"]);
    }

    #[test]
    fn test_run_file_overrides_term_and_campuses() {
        let mut config = Config::default();
        let file = RunFile::parse(
            r#"
            term = "2026, Odd Semester"
            campuses = ["Binus Bekasi"]
            continue_on_error = true
            "#,
            "monitoring.toml",
        )
        .unwrap();
        config.apply_run_file(file);

        assert_eq!(config.term, "2026, Odd Semester");
        assert_eq!(config.campuses, vec!["Binus Bekasi"]);
        assert!(config.continue_on_error);
        assert_eq!(config.cooldown_ms, 1000);
    }

    #[test]
    fn test_partial_run_file_keeps_defaults() {
        let mut config = Config::default();
        config.apply_run_file(RunFile::parse("term = \"2026, Odd Semester\"", "x.toml").unwrap());
        assert_eq!(config.campuses.len(), 2);
        assert!(!config.continue_on_error);
    }

    #[test]
    fn test_invalid_run_file_reports_path() {
        let err = RunFile::parse("campuses = 3", "bad.toml").unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_missing_credentials() {
        let config = Config::default();
        assert!(matches!(
            config.validate_credentials(),
            Err(ConfigError::MissingCredentials { .. })
        ));
    }

    #[test]
    fn test_app_host() {
        assert_eq!(Config::default().app_host(), "acadservices.apps.binus.ac.id");
    }

    #[test]
    fn test_app_host_ignores_port_and_credentials() {
        let config = Config {
            base_url: "https://user@acadservices.apps.binus.ac.id:8443/newStaff/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.app_host(), "acadservices.apps.binus.ac.id");
    }
}
