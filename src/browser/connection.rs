use anyhow::{Context, Result};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::infrastructure::is_on_host;

/// 连接到已开启远程调试的浏览器
///
/// 优先复用已经停留在应用站点上的标签页（通常已登录），否则新开一个空白页。
pub async fn connect_to_browser(
    port: u16,
    app_host: &str,
) -> Result<(Browser, Page, JoinHandle<()>)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    let task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await.context("获取标签页列表失败")?;
    debug!("获取到 {} 个页面", pages.len());

    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            if is_on_host(&url, app_host) {
                info!("✓ 复用已打开的页面: {}", url);
                return Ok((browser, p.clone(), task));
            }
        }
    }

    debug!("未找到应用页面，创建空白页面");
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建空白页面失败: {}", e);
        e
    })?;

    Ok((browser, page, task))
}
