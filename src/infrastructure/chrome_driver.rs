//! chromiumoxide 页面驱动 - 基础设施层
//!
//! 持有浏览器和列表页，以及由行打开的详情标签页。
//! 所有元素操作都转成一段 JS 在对应标签页上执行。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use url::Url;

use super::page_driver::{js_str, DriverError, DriverResult, Locator, PageDriver, Surface};

/// chromiumoxide 实现的 `PageDriver`
///
/// 职责：
/// - 唯一持有 Browser 和列表页 Page
/// - 管理详情标签页的生命周期
/// - 不认识校区 / 行 / 学期
pub struct ChromeDriver {
    browser: Mutex<Browser>,
    listing: Page,
    surfaces: Mutex<HashMap<u32, Page>>,
    next_surface: AtomicU32,
    poll_interval: Duration,
    /// 应用所在主机，列表页跳离该主机即视为会话失效
    app_host: String,
}

impl ChromeDriver {
    pub fn new(
        browser: Browser,
        listing: Page,
        poll_interval: Duration,
        app_host: String,
    ) -> Self {
        Self {
            browser: Mutex::new(browser),
            listing,
            surfaces: Mutex::new(HashMap::new()),
            next_surface: AtomicU32::new(1),
            poll_interval,
            app_host,
        }
    }

    async fn page_for(&self, surface: Surface) -> DriverResult<Page> {
        match surface {
            Surface::Listing => Ok(self.listing.clone()),
            Surface::Detail(id) => self
                .surfaces
                .lock()
                .await
                .get(&id)
                .cloned()
                .ok_or(DriverError::SurfaceNotFound(surface)),
        }
    }

    /// 在指定标签页上执行 JS 并反序列化结果
    async fn eval_as<T: DeserializeOwned>(
        &self,
        surface: Surface,
        script: String,
    ) -> DriverResult<T> {
        let page = self.page_for(surface).await?;
        let result = page.evaluate(script).await?;
        // null 结果在 CDP 中没有 value 字段
        let value = result.value().cloned().unwrap_or(JsonValue::Null);
        Ok(serde_json::from_value(value)?)
    }

    /// 对定位到的第一个元素执行 `body`；元素不存在时脚本返回 null
    async fn with_element<T: DeserializeOwned>(
        &self,
        surface: Surface,
        locator: &Locator,
        body: &str,
    ) -> DriverResult<T> {
        let script = format!(
            "(() => {{ const el = ({})[0]; if (!el) return null; {} }})()",
            locator.to_js(),
            body
        );
        let result: Option<T> = self.eval_as(surface, script).await?;
        result.ok_or_else(|| DriverError::ElementNotFound {
            surface,
            locator: locator.to_string(),
        })
    }

    async fn open_pages(&self) -> DriverResult<Vec<Page>> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.fetch_targets().await {
            debug!("刷新标签页列表失败: {}", e);
        }
        Ok(browser.pages().await?)
    }

    /// 该表面对应的标签页是否还存在；列表页的存活由 `session_alive` 判断
    async fn surface_alive(&self, surface: Surface) -> bool {
        let Surface::Detail(_) = surface else {
            return true;
        };
        let Ok(page) = self.page_for(surface).await else {
            return false;
        };
        match self.open_pages().await {
            Ok(pages) => pages.iter().any(|p| p.target_id() == page.target_id()),
            Err(e) => {
                warn!("无法获取标签页列表: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        debug!("导航到: {}", url);
        self.listing.goto(url).await?;
        Ok(())
    }

    async fn wait_for(
        &self,
        surface: Surface,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> DriverResult<()> {
        let start = Instant::now();
        loop {
            match self.count(surface, locator).await {
                Ok(n) if n > 0 => return Ok(()),
                Ok(_) => {}
                Err(err @ DriverError::Browser(_)) => {
                    let alive = self.surface_alive(surface).await;
                    if let Some(err) = poll_error(surface, err, alive) {
                        return Err(err);
                    }
                }
                Err(e) => return Err(e),
            }

            if let Some(limit) = timeout {
                if start.elapsed() >= limit {
                    return Err(DriverError::Timeout {
                        surface,
                        locator: locator.to_string(),
                        waited: limit,
                    });
                }
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn count(&self, surface: Surface, locator: &Locator) -> DriverResult<usize> {
        self.eval_as(surface, format!("({}).length", locator.to_js()))
            .await
    }

    async fn read_text(&self, surface: Surface, locator: &Locator) -> DriverResult<String> {
        self.with_element(surface, locator, "return el.textContent || '';")
            .await
    }

    async fn click(&self, surface: Surface, locator: &Locator) -> DriverResult<()> {
        let _: bool = self
            .with_element(surface, locator, "el.click(); return true;")
            .await?;
        Ok(())
    }

    async fn fill(&self, surface: Surface, locator: &Locator, value: &str) -> DriverResult<()> {
        let body = format!(
            "el.focus(); el.value = {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true;",
            js_str(value)
        );
        let _: bool = self.with_element(surface, locator, &body).await?;
        Ok(())
    }

    async fn select_option(
        &self,
        surface: Surface,
        locator: &Locator,
        label: &str,
    ) -> DriverResult<()> {
        let body = format!(
            "const opt = Array.from(el.options || []).find(o => o.text.trim() === {}); \
             if (!opt) return false; \
             el.value = opt.value; \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true;",
            js_str(label)
        );
        let selected: bool = self.with_element(surface, locator, &body).await?;
        if !selected {
            return Err(DriverError::OptionNotFound {
                label: label.to_string(),
            });
        }
        Ok(())
    }

    async fn open_secondary(&self, trigger: &Locator) -> DriverResult<Surface> {
        let before: HashSet<_> = self
            .open_pages()
            .await?
            .iter()
            .map(|p| p.target_id().clone())
            .collect();

        self.click(Surface::Listing, trigger).await?;

        // 新标签页的出现时间不可预估，这里不设超时
        loop {
            let pages = self.open_pages().await?;
            if let Some(page) = pages
                .into_iter()
                .find(|p| !before.contains(p.target_id()))
            {
                let id = self.next_surface.fetch_add(1, Ordering::SeqCst);
                self.surfaces.lock().await.insert(id, page);
                debug!("新标签页已打开: 详情页#{}", id);
                return Ok(Surface::Detail(id));
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn run_script(&self, surface: Surface, script: &str) -> DriverResult<JsonValue> {
        let page = self.page_for(surface).await?;
        let result = page.evaluate(script.to_string()).await?;
        Ok(result.value().cloned().unwrap_or(JsonValue::Null))
    }

    async fn close_surface(&self, surface: Surface) -> DriverResult<()> {
        let Surface::Detail(id) = surface else {
            warn!("忽略关闭列表页的请求");
            return Ok(());
        };
        let page = self
            .surfaces
            .lock()
            .await
            .remove(&id)
            .ok_or(DriverError::SurfaceNotFound(surface))?;
        page.close().await?;
        Ok(())
    }

    async fn session_alive(&self) -> bool {
        match self.listing.url().await {
            Ok(Some(url)) => is_on_host(&url, &self.app_host),
            Ok(None) => false,
            Err(e) => {
                warn!("无法读取列表页地址: {}", e);
                false
            }
        }
    }
}

/// 轮询时遇到的错误是否应该结束等待
///
/// 标签页还在时，CDP 错误多半是页面重新渲染导致执行上下文暂时不可用，继续等待；
/// 标签页已经崩溃或被关闭时返回 `SurfaceNotFound`。
fn poll_error(surface: Surface, err: DriverError, target_alive: bool) -> Option<DriverError> {
    match err {
        DriverError::Browser(e) if target_alive => {
            debug!("{} 执行上下文暂不可用: {}", surface, e);
            None
        }
        DriverError::Browser(e) => {
            warn!("{} 已不存在: {}", surface, e);
            Some(DriverError::SurfaceNotFound(surface))
        }
        other => Some(other),
    }
}

/// 地址的主机名是否恰好是 `host`
///
/// 登录页的回调参数里也会带着应用地址，所以不能按子串判断。
pub(crate) fn is_on_host(url: &str, host: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(host)))
        .unwrap_or(false)
}
