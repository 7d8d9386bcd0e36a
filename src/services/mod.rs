pub mod paginator;
pub mod record_inspector;
pub mod selectors;
pub mod sso_session;

pub use paginator::Paginator;
pub use record_inspector::RecordInspector;
pub use sso_session::SsoSession;
