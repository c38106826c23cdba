use crate::browser::behavioral::Pacing;
use crate::browser::page::WebPage;
use crate::browser::profile::BrowserProfile;
use crate::session::{BrowserSession, DriverError, SessionProvider};
use async_trait::async_trait;
use fantoccini::ClientBuilder;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Opens sessions against a running WebDriver service
/// (chromedriver on `:9515`, geckodriver on `:4444`).
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    pub webdriver_url: String,
    pub profile: BrowserProfile,
    pub pacing: Pacing,
    pub poll: Duration,
}

impl WebDriverLauncher {
    pub fn new(webdriver_url: impl Into<String>, profile: BrowserProfile) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            profile,
            pacing: Pacing::default(),
            poll: Duration::from_millis(250),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }
}

#[async_trait]
impl SessionProvider for WebDriverLauncher {
    async fn open(&self, download_dir: &Path) -> Result<Box<dyn BrowserSession>, DriverError> {
        let caps = self.profile.capabilities(download_dir);
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        info!(
            target: "browser.session",
            webdriver = %self.webdriver_url,
            kind = ?self.profile.kind,
            headless = self.profile.headless,
            download_dir = %download_dir.display(),
            "session.opened"
        );
        Ok(Box::new(WebPage::new(client, self.pacing.clone(), self.poll)))
    }
}
