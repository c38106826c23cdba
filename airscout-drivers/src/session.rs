use async_trait::async_trait;
use fantoccini::Locator;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// How to locate a DOM element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    Id(String),
    XPath(String),
}

impl Selector {
    pub fn css(s: impl Into<String>) -> Self {
        Selector::Css(s.into())
    }

    pub fn id(s: impl Into<String>) -> Self {
        Selector::Id(s.into())
    }

    pub fn xpath(s: impl Into<String>) -> Self {
        Selector::XPath(s.into())
    }

    pub(crate) fn locator(&self) -> Locator<'_> {
        match self {
            Selector::Css(s) => Locator::Css(s),
            Selector::Id(s) => Locator::Id(s),
            Selector::XPath(s) => Locator::XPath(s),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css:{s}"),
            Selector::Id(s) => write!(f, "#{s}"),
            Selector::XPath(s) => write!(f, "xpath:{s}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    #[error("element {0} not found or not clickable")]
    ElementNotFound(Selector),

    #[error("could not start browser session: {0}")]
    Launch(String),

    #[error("browser command failed: {0}")]
    Command(String),
}

/// One interactive browser context, owned by a single download run.
///
/// Every wait takes an explicit upper bound; implementations must return
/// [`DriverError::Timeout`] rather than block past it.
#[async_trait]
pub trait BrowserSession: Send {
    async fn goto(&mut self, url: &str) -> Result<(), DriverError>;

    async fn refresh(&mut self) -> Result<(), DriverError>;

    /// Wait until no element matches `selector` (e.g. a loading overlay is gone).
    async fn wait_until_gone(
        &mut self,
        selector: &Selector,
        within: Duration,
    ) -> Result<(), DriverError>;

    /// Wait until at least one element matches `selector`.
    async fn wait_until_present(
        &mut self,
        selector: &Selector,
        within: Duration,
    ) -> Result<(), DriverError>;

    /// Wait until the first match is displayed and enabled.
    async fn wait_until_clickable(
        &mut self,
        selector: &Selector,
        within: Duration,
    ) -> Result<(), DriverError>;

    /// Native click on the first match.
    async fn click(&mut self, selector: &Selector) -> Result<(), DriverError>;

    /// `element.click()` dispatched from JavaScript, for controls that are
    /// covered by overlays and reject native clicks.
    async fn script_click(&mut self, selector: &Selector) -> Result<(), DriverError>;

    async fn type_text(&mut self, selector: &Selector, text: &str) -> Result<(), DriverError>;

    /// Release the underlying browser. Must be called on every exit path.
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Acquires fresh sessions whose downloads land in `download_dir`.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn open(&self, download_dir: &Path) -> Result<Box<dyn BrowserSession>, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_render_readably() {
        assert_eq!(Selector::id("progressModal").to_string(), "#progressModal");
        assert_eq!(
            Selector::css("div.histui.ui.basic.primary.button").to_string(),
            "css:div.histui.ui.basic.primary.button"
        );
        assert!(matches!(
            Selector::xpath("//*[@title = 'Download CSV']").locator(),
            Locator::XPath(_)
        ));
    }
}
