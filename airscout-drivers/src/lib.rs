//! Browser automation layer used by the download orchestrator.
//!
//! - [`session::BrowserSession`]: bounded waits and clicks against one page
//! - [`session::SessionProvider`]: acquires a fresh session per download run
//! - [`browser::driver::WebDriverLauncher`]: fantoccini/WebDriver provider
//! - [`browser::profile::BrowserProfile`]: Chrome/Firefox download capabilities
//! - [`browser::behavioral::Pacing`]: human‑like delays and typing
pub mod browser;
pub mod session;

pub use browser::driver::WebDriverLauncher;
pub use browser::profile::BrowserProfile;
pub use session::{BrowserSession, DriverError, Selector, SessionProvider};
