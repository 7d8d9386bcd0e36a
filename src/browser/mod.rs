pub mod connection;
pub mod launch;

use anyhow::Result;
use chromiumoxide::{Browser, Page};
use tokio::task::JoinHandle;

use crate::config::Config;

pub use connection::connect_to_browser;
pub use launch::launch_browser;

/// 按配置连接已有浏览器或启动新浏览器
pub async fn open_browser(config: &Config) -> Result<(Browser, Page, JoinHandle<()>)> {
    if config.launch_browser {
        launch_browser(config.chrome_executable.as_deref(), config.headless).await
    } else {
        connect_to_browser(config.browser_debug_port, &config.app_host()).await
    }
}
