//! 登录会话服务 - 业务能力层
//!
//! 通过 Microsoft SSO 登录、切换到 Staff 角色，并打开讲课监控页。
//! 完成后列表页停留在筛选界面，后续流程直接复用同一个会话。

use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{CancelSignal, DriverError, Locator, PageDriver, Surface};
use crate::services::selectors;

const STAFF_ROLE: &str = "Staff";

/// SSO 登录会话
pub struct SsoSession {
    base_url: String,
    monitoring_url: String,
    username: String,
    password: String,
    step_timeout: Duration,
    settle_delay: Duration,
}

impl SsoSession {
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            monitoring_url: config.monitoring_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            step_timeout: config.page_load_timeout(),
            settle_delay: config.settle_delay(),
        }
    }

    /// 登录并进入讲课监控筛选页
    pub async fn establish<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        cancel: &CancelSignal,
    ) -> AppResult<()> {
        info!("📍 正在打开 {}", self.base_url);
        self.step(cancel, "打开首页", driver.navigate(&self.base_url))
            .await?;

        info!("🔐 通过 Microsoft SSO 登录...");
        self.login(driver, cancel).await?;

        info!("👤 切换到 {} 角色...", STAFF_ROLE);
        self.switch_role(driver, cancel).await?;

        info!("🧭 打开讲课监控页...");
        self.step(cancel, "打开讲课监控页", driver.navigate(&self.monitoring_url))
            .await?;
        // 筛选页加载时间不可预估
        self.step(
            cancel,
            "等待筛选页",
            driver.wait_for(Surface::Listing, &selectors::filter_label(), None),
        )
        .await?;

        info!("✓ 会话已就绪");
        Ok(())
    }

    async fn login<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        cancel: &CancelSignal,
    ) -> AppResult<()> {
        self.wait_and_click(driver, cancel, "点击 LOGIN", &selectors::login_button())
            .await?;

        info!("  输入账号...");
        self.wait_and_fill(
            driver,
            cancel,
            "输入账号",
            &selectors::email_input(),
            &self.username,
        )
        .await?;
        self.step(
            cancel,
            "提交账号",
            driver.click(Surface::Listing, &selectors::next_button()),
        )
        .await?;

        info!("  输入密码...");
        self.wait_and_fill(
            driver,
            cancel,
            "输入密码",
            &selectors::password_input(),
            &self.password,
        )
        .await?;
        self.step(
            cancel,
            "提交密码",
            driver.click(Surface::Listing, &selectors::sign_in_button()),
        )
        .await?;

        info!("  确认保持登录...");
        self.wait_and_click(
            driver,
            cancel,
            "保持登录",
            &selectors::stay_signed_in_button(),
        )
        .await?;

        self.step(
            cancel,
            "等待主页",
            driver.wait_for(
                Surface::Listing,
                &selectors::role_label(),
                Some(self.step_timeout),
            ),
        )
        .await
    }

    async fn switch_role<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        cancel: &CancelSignal,
    ) -> AppResult<()> {
        self.step(
            cancel,
            "选择角色",
            driver.select_option(Surface::Listing, &selectors::role_select(), STAFF_ROLE),
        )
        .await?;
        // 切换角色会重新加载页面
        cancel.sleep(self.settle_delay).await?;
        info!("  已切换到 {} 角色", STAFF_ROLE);
        Ok(())
    }

    async fn wait_and_click<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        cancel: &CancelSignal,
        what: &'static str,
        locator: &Locator,
    ) -> AppResult<()> {
        self.step(
            cancel,
            what,
            driver.wait_for(Surface::Listing, locator, Some(self.step_timeout)),
        )
        .await?;
        self.step(cancel, what, driver.click(Surface::Listing, locator))
            .await
    }

    async fn wait_and_fill<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        cancel: &CancelSignal,
        what: &'static str,
        locator: &Locator,
        value: &str,
    ) -> AppResult<()> {
        self.step(
            cancel,
            what,
            driver.wait_for(Surface::Listing, locator, Some(self.step_timeout)),
        )
        .await?;
        self.step(cancel, what, driver.fill(Surface::Listing, locator, value))
            .await
    }

    /// 登录阶段的任何失败都视为会话错误
    async fn step<T>(
        &self,
        cancel: &CancelSignal,
        what: &'static str,
        fut: impl std::future::Future<Output = Result<T, DriverError>>,
    ) -> AppResult<T> {
        cancel
            .driver(fut, |e| AppError::Session(format!("{}失败: {}", what, e)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::FakeDriver;

    fn session() -> SsoSession {
        let config = Config {
            username: "staff@binus.ac.id".to_string(),
            password: "secret".to_string(),
            settle_ms: 0,
            ..Config::default()
        };
        SsoSession::new(&config)
    }

    #[tokio::test]
    async fn test_establish_logs_in_and_opens_monitoring() {
        let driver = FakeDriver::new();
        session()
            .establish(&driver, &CancelSignal::never())
            .await
            .unwrap();

        let config = Config::default();
        assert_eq!(
            driver.navigations(),
            vec![config.base_url.clone(), config.monitoring_url.clone()]
        );
        let filled: Vec<String> = driver.filled().into_iter().map(|(_, v)| v).collect();
        assert_eq!(filled, vec!["staff@binus.ac.id", "secret"]);
        assert_eq!(driver.selected()[0].1, STAFF_ROLE);
    }

    #[tokio::test]
    async fn test_cancelled_before_login() {
        let (handle, signal) = crate::infrastructure::cancel_pair();
        handle.cancel();
        let err = session()
            .establish(&FakeDriver::new(), &signal)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }
}
