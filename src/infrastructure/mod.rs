//! 基础设施层
//!
//! 持有稀缺资源（浏览器会话），只向上暴露能力。

pub mod cancel;
pub mod chrome_driver;
pub mod fake_driver;
pub mod page_driver;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use chrome_driver::ChromeDriver;
pub(crate) use chrome_driver::is_on_host;
pub use fake_driver::FakeDriver;
pub(crate) use page_driver::js_str;
pub use page_driver::{DriverError, DriverResult, Locator, PageDriver, Surface};
