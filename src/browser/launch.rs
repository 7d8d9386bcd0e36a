use std::path::Path;

use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 启动一个新的浏览器窗口
///
/// SSO 可能需要人工处理多因素认证，所以默认带界面启动。
pub async fn launch_browser(
    executable: Option<&str>,
    headless: bool,
) -> Result<(Browser, Page, JoinHandle<()>)> {
    info!("🚀 启动浏览器...");

    let mut builder = BrowserConfig::builder().args(vec![
        "--no-sandbox",            // 禁用沙盒，防止权限问题导致的崩溃
        "--disable-dev-shm-usage", // 防止共享内存不足
    ]);
    if headless {
        builder = builder.new_headless_mode();
    } else {
        builder = builder.with_head();
    }
    if let Some(path) = executable {
        debug!("浏览器路径: {}", path);
        builder = builder.chrome_executable(Path::new(path));
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        anyhow::anyhow!("配置浏览器失败: {}", e)
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow::anyhow!("启动浏览器失败: {}", e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        anyhow::anyhow!("创建页面失败: {}", e)
    })?;

    Ok((browser, page, task))
}
