//! 内存中的页面驱动（仅用于测试）
//!
//! 模拟按校区分页的监控列表、详情标签页、失败的行/筛选以及会话失效，
//! 并记录每一次调用供断言使用。

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use super::page_driver::{DriverError, DriverResult, Locator, PageDriver, Surface};
use crate::services::selectors::{self, COMPLETE_TEXT, MAX_ROWS_PER_PAGE};

/// 行坐标：(校区, 页码（从 1 开始）, 行号)
pub type RowKey = (String, usize, usize);

const DEFAULT_CAMPUS: &str = "默认校区";

#[derive(Debug, Default)]
struct FakeState {
    campuses: HashMap<String, Vec<Vec<String>>>,
    campus_options: Vec<String>,
    failing_filters: HashSet<String>,
    failing_rows: HashSet<RowKey>,
    session_loss_row: Option<RowKey>,
    crashing_rows: HashSet<RowKey>,
    hanging_rows: HashSet<RowKey>,
    stuck_pages: HashSet<(String, usize)>,

    campus: Option<String>,
    term: Option<String>,
    page: usize,
    searched: bool,
    session_lost: bool,

    surfaces: HashMap<u32, RowKey>,
    saved: HashSet<u32>,
    crashed: HashSet<u32>,
    next_surface: u32,

    calls: Vec<String>,
    opened: Vec<RowKey>,
    closed: Vec<u32>,
    filled: Vec<(String, String)>,
    selected: Vec<(String, String)>,
    navigations: Vec<String>,
}

impl FakeState {
    fn rows(&self) -> &[String] {
        if !self.searched {
            return &[];
        }
        self.campus
            .as_ref()
            .and_then(|c| self.campuses.get(c))
            .and_then(|pages| pages.get(self.page))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn row_key(&self, index: usize) -> RowKey {
        (
            self.campus.clone().unwrap_or_default(),
            self.page + 1,
            index,
        )
    }

    fn page_count(&self) -> usize {
        self.campus
            .as_ref()
            .and_then(|c| self.campuses.get(c))
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn ensure_session(&self) -> DriverResult<()> {
        if self.session_lost {
            return Err(DriverError::SessionLost("已跳转到登录页".to_string()));
        }
        Ok(())
    }

    fn ensure_surface(&self, surface: Surface) -> DriverResult<()> {
        match surface {
            Surface::Listing => Ok(()),
            Surface::Detail(id) if self.crashed.contains(&id) => {
                Err(DriverError::SurfaceNotFound(surface))
            }
            Surface::Detail(id) if self.surfaces.contains_key(&id) => Ok(()),
            Surface::Detail(_) => Err(DriverError::SurfaceNotFound(surface)),
        }
    }
}

fn not_found(surface: Surface, locator: &Locator) -> DriverError {
    DriverError::ElementNotFound {
        surface,
        locator: locator.to_string(),
    }
}

/// 测试用页面驱动
#[derive(Debug, Default)]
pub struct FakeDriver {
    state: Mutex<FakeState>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已经筛选好的单个列表，省去筛选步骤
    pub fn with_listing(pages: Vec<Vec<&str>>) -> Self {
        let driver = Self::new().with_campus(DEFAULT_CAMPUS, pages);
        {
            let mut state = driver.lock();
            state.campus = Some(DEFAULT_CAMPUS.to_string());
            state.searched = true;
        }
        driver
    }

    /// 注册一个校区及其各页的完成度
    pub fn with_campus(self, campus: &str, pages: Vec<Vec<&str>>) -> Self {
        {
            let mut state = self.lock();
            let pages = pages
                .into_iter()
                .map(|rows| rows.into_iter().map(str::to_string).collect())
                .collect();
            state.campuses.insert(campus.to_string(), pages);
            state.campus_options.push(campus.to_string());
        }
        self
    }

    /// 该校区搜索后永远不出现结果
    pub fn fail_filter(self, campus: &str) -> Self {
        self.lock().failing_filters.insert(campus.to_string());
        self
    }

    /// 该行保存后永远等不到成功提示
    pub fn fail_row(self, campus: &str, page: usize, index: usize) -> Self {
        self.lock()
            .failing_rows
            .insert((campus.to_string(), page, index));
        self
    }

    /// 打开该行详情时会话失效
    pub fn lose_session_at(self, campus: &str, page: usize, index: usize) -> Self {
        self.lock().session_loss_row = Some((campus.to_string(), page, index));
        self
    }

    /// 该行的详情页打开后立即崩溃
    pub fn crash_detail_on(self, campus: &str, page: usize, index: usize) -> Self {
        self.lock()
            .crashing_rows
            .insert((campus.to_string(), page, index));
        self
    }

    /// 该行保存后一直等不到结果（既不成功也不报错）
    pub fn hang_save_on(self, campus: &str, page: usize, index: usize) -> Self {
        self.lock()
            .hanging_rows
            .insert((campus.to_string(), page, index));
        self
    }

    /// 在该页点击"下一页"没有任何反应
    pub fn stuck_next_on(self, campus: &str, page: usize) -> Self {
        self.lock().stuck_pages.insert((campus.to_string(), page));
        self
    }

    /// `with_listing` 使用的校区名
    pub fn default_campus() -> &'static str {
        DEFAULT_CAMPUS
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// 按顺序记录的被打开详情的行
    pub fn opened_rows(&self) -> Vec<RowKey> {
        self.lock().opened.clone()
    }

    pub fn open_surfaces(&self) -> usize {
        self.lock().surfaces.len()
    }

    pub fn closed_surfaces(&self) -> usize {
        self.lock().closed.len()
    }

    pub fn current_page(&self) -> usize {
        self.lock().page + 1
    }

    pub fn filled(&self) -> Vec<(String, String)> {
        self.lock().filled.clone()
    }

    pub fn selected(&self) -> Vec<(String, String)> {
        self.lock().selected.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    pub fn completion_of(&self, campus: &str, page: usize, index: usize) -> Option<String> {
        self.lock()
            .campuses
            .get(campus)
            .and_then(|pages| pages.get(page - 1))
            .and_then(|rows| rows.get(index))
            .cloned()
    }

    /// `wait_for` 的同步部分；返回 true 表示这次等待永远不会结束
    fn check_wait(
        &self,
        surface: Surface,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> DriverResult<bool> {
        let state = self.log(format!("wait_for {} {}", surface, locator));
        state.ensure_session()?;
        state.ensure_surface(surface)?;

        match surface {
            Surface::Listing if *locator == selectors::listing_rows() => {
                let failing = state
                    .campus
                    .as_ref()
                    .map(|c| state.failing_filters.contains(c))
                    .unwrap_or(false);
                if failing || state.rows().is_empty() {
                    return Err(DriverError::Timeout {
                        surface,
                        locator: locator.to_string(),
                        waited: timeout.unwrap_or(Duration::ZERO),
                    });
                }
                Ok(false)
            }
            Surface::Detail(id) if *locator == selectors::saved_message() => {
                if state.hanging_rows.contains(&state.surfaces[&id]) {
                    Ok(true)
                } else if state.saved.contains(&id) {
                    Ok(false)
                } else {
                    Err(not_found(surface, locator))
                }
            }
            _ => Ok(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn log(&self, entry: String) -> MutexGuard<'_, FakeState> {
        let mut state = self.lock();
        state.calls.push(entry);
        state
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        let mut state = self.log(format!("navigate {}", url));
        state.ensure_session()?;
        state.navigations.push(url.to_string());
        Ok(())
    }

    async fn wait_for(
        &self,
        surface: Surface,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> DriverResult<()> {
        if self.check_wait(surface, locator, timeout)? {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn count(&self, surface: Surface, locator: &Locator) -> DriverResult<usize> {
        let state = self.log(format!("count {} {}", surface, locator));
        state.ensure_session()?;
        state.ensure_surface(surface)?;
        if surface == Surface::Listing && *locator == selectors::listing_rows() {
            return Ok(state.rows().len());
        }
        Ok(1)
    }

    async fn read_text(&self, surface: Surface, locator: &Locator) -> DriverResult<String> {
        let state = self.log(format!("read_text {} {}", surface, locator));
        state.ensure_session()?;
        state.ensure_surface(surface)?;

        if *locator == selectors::listing_body() {
            return Ok(format!(
                "{}#{}",
                state.campus.clone().unwrap_or_default(),
                state.page + 1
            ));
        }
        (0..MAX_ROWS_PER_PAGE)
            .find(|i| *locator == selectors::completion_cell(*i))
            .and_then(|i| state.rows().get(i).cloned())
            .ok_or_else(|| not_found(surface, locator))
    }

    async fn click(&self, surface: Surface, locator: &Locator) -> DriverResult<()> {
        let mut state = self.log(format!("click {} {}", surface, locator));
        state.ensure_session()?;
        state.ensure_surface(surface)?;

        if surface == Surface::Listing && *locator == selectors::search_button() {
            state.searched = true;
            state.page = 0;
        } else if surface == Surface::Listing && *locator == selectors::next_page_link() {
            let key = (state.campus.clone().unwrap_or_default(), state.page + 1);
            if !state.stuck_pages.contains(&key) && state.page + 1 < state.page_count() {
                state.page += 1;
            }
        } else if let Surface::Detail(id) = surface {
            if *locator == selectors::confirm_button() && !state.saved.contains(&id) {
                return Err(not_found(surface, locator));
            }
        }
        Ok(())
    }

    async fn fill(&self, surface: Surface, locator: &Locator, value: &str) -> DriverResult<()> {
        let mut state = self.log(format!("fill {} {}", surface, locator));
        state.ensure_session()?;
        state.ensure_surface(surface)?;
        state.filled.push((locator.to_string(), value.to_string()));
        Ok(())
    }

    async fn select_option(
        &self,
        surface: Surface,
        locator: &Locator,
        label: &str,
    ) -> DriverResult<()> {
        let mut state = self.log(format!("select_option {} {} {}", surface, locator, label));
        state.ensure_session()?;
        state.ensure_surface(surface)?;

        if *locator == selectors::campus_select() {
            if !state.campus_options.iter().any(|c| c == label) {
                return Err(DriverError::OptionNotFound {
                    label: label.to_string(),
                });
            }
            state.campus = Some(label.to_string());
            state.searched = false;
            state.page = 0;
        } else if *locator == selectors::term_select() {
            state.term = Some(label.to_string());
        }
        state.selected.push((locator.to_string(), label.to_string()));
        Ok(())
    }

    async fn open_secondary(&self, trigger: &Locator) -> DriverResult<Surface> {
        let mut state = self.log(format!("open_secondary {}", trigger));
        state.ensure_session()?;

        let index = (0..MAX_ROWS_PER_PAGE)
            .find(|i| *trigger == selectors::monitoring_log_link(*i))
            .filter(|i| *i < state.rows().len())
            .ok_or_else(|| not_found(Surface::Listing, trigger))?;
        let key = state.row_key(index);

        if state.session_loss_row.as_ref() == Some(&key) {
            state.session_lost = true;
            return Err(DriverError::SessionLost("打开详情时被重定向到登录页".to_string()));
        }

        state.next_surface += 1;
        let id = state.next_surface;
        if state.crashing_rows.contains(&key) {
            state.crashed.insert(id);
        }
        state.surfaces.insert(id, key.clone());
        state.opened.push(key);
        Ok(Surface::Detail(id))
    }

    async fn run_script(&self, surface: Surface, _script: &str) -> DriverResult<JsonValue> {
        let mut state = self.log(format!("run_script {}", surface));
        state.ensure_session()?;
        state.ensure_surface(surface)?;

        let Surface::Detail(id) = surface else {
            return Ok(JsonValue::Null);
        };
        let key = state.surfaces[&id].clone();
        if !state.failing_rows.contains(&key) {
            state.saved.insert(id);
            let (campus, page, index) = key;
            if let Some(cell) = state
                .campuses
                .get_mut(&campus)
                .and_then(|pages| pages.get_mut(page - 1))
                .and_then(|rows| rows.get_mut(index))
            {
                *cell = COMPLETE_TEXT.to_string();
            }
        }
        Ok(json!({ "saved": true, "toggles": 3, "fields": 4 }))
    }

    async fn close_surface(&self, surface: Surface) -> DriverResult<()> {
        let mut state = self.log(format!("close_surface {}", surface));
        if let Surface::Detail(id) = surface {
            state
                .surfaces
                .remove(&id)
                .ok_or(DriverError::SurfaceNotFound(surface))?;
            state.saved.remove(&id);
            state.crashed.remove(&id);
            state.closed.push(id);
        }
        Ok(())
    }

    async fn session_alive(&self) -> bool {
        !self.lock().session_lost
    }
}
