use super::parse_base;
use crate::adapter::{SiteAdapter, Timeouts, csv_pattern};
use crate::error::FetchError;
use crate::target::{DownloadTarget, Site, TargetSource};
use airscout_drivers::{BrowserSession, DriverError, Selector};
use async_trait::async_trait;
use regex::Regex;
use url::Url;

const HISTORY_BUTTON: &str = "div.histui.ui.basic.primary.button";
const CSV_BUTTON: &str = "div.histui.ui.large.primary.button";

/// Historical city data from the air quality index archive.
///
/// ```
/// use airscout_fetch::{ArchiveSite, DownloadTarget, SiteAdapter};
///
/// let site = ArchiveSite::new(ArchiveSite::DEFAULT_BASE).unwrap();
/// let url = site.locate(&DownloadTarget::archive("Beijing", "/tmp")).unwrap();
/// assert_eq!(url, "https://aqicn.org/historical/#!city:beijing");
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveSite {
    base: Url,
    pattern: Regex,
}

impl ArchiveSite {
    pub const DEFAULT_BASE: &'static str = "https://aqicn.org/historical/";

    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            base: parse_base(base_url)?,
            pattern: csv_pattern()?,
        })
    }
}

#[async_trait]
impl SiteAdapter for ArchiveSite {
    fn site(&self) -> Site {
        Site::Archive
    }

    fn download_pattern(&self) -> &Regex {
        &self.pattern
    }

    fn locate(&self, target: &DownloadTarget) -> Result<String, FetchError> {
        match &target.source {
            TargetSource::Archive { city } => {
                let mut url = self.base.clone();
                url.set_fragment(None);
                Ok(format!("{url}#!city:{}", city.trim().to_lowercase()))
            }
            TargetSource::Portal(_) => Err(FetchError::InvalidInput(
                "archive site cannot serve a portal query".into(),
            )),
        }
    }

    async fn navigate(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        _timeouts: &Timeouts,
    ) -> Result<(), DriverError> {
        session.goto(url).await
    }

    async fn wait_interactive(
        &self,
        session: &mut dyn BrowserSession,
        timeouts: &Timeouts,
    ) -> Result<(), DriverError> {
        session
            .wait_until_clickable(&Selector::css(HISTORY_BUTTON), timeouts.interactive)
            .await
    }

    async fn trigger_download(
        &self,
        session: &mut dyn BrowserSession,
        _timeouts: &Timeouts,
    ) -> Result<(), DriverError> {
        // The history panel sits under a sticky header that swallows native clicks.
        session.script_click(&Selector::css(HISTORY_BUTTON)).await
    }

    async fn select_format(
        &self,
        session: &mut dyn BrowserSession,
        timeouts: &Timeouts,
    ) -> Result<(), DriverError> {
        let csv = Selector::css(CSV_BUTTON);
        session.wait_until_clickable(&csv, timeouts.select_format).await?;
        session.script_click(&csv).await
    }
}
