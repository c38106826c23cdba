use super::parse_base;
use crate::adapter::{SiteAdapter, Timeouts, csv_pattern};
use crate::error::FetchError;
use crate::target::{DownloadTarget, Site, TargetSource};
use airscout_common::Credentials;
use airscout_drivers::{BrowserSession, DriverError, Selector};
use async_trait::async_trait;
use regex::Regex;
use url::Url;

const PROGRESS_MODAL: &str = "progressModal";
const LOGIN_BUTTON: &str = "loginButton";
const USERNAME_FIELD: &str = "username";
const PASSWORD_FIELD: &str = "password";
const SUBMIT_LOGIN: &str = "input[value='Log in']";
const PLOT_BUTTON: &str = "sessionDataSelToolbarplotBTN-button";
const DOWNLOAD_TOGGLE: &str = "button[id*='downloadToggleButton']";
const DOWNLOAD_CSV: &str = "[title='Download CSV']";

/// Area-averaged time series from the NASA Giovanni portal.
///
/// Every session logs in first; the portal keeps no state between runs.
pub struct PortalSite {
    base: Url,
    credentials: Credentials,
    pattern: Regex,
}

impl PortalSite {
    pub const DEFAULT_BASE: &'static str = "https://giovanni.gsfc.nasa.gov/giovanni/";

    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, FetchError> {
        if credentials.username.trim().is_empty() || credentials.password().is_empty() {
            return Err(FetchError::InvalidInput(
                "portal credentials are incomplete".into(),
            ));
        }
        Ok(Self {
            base: parse_base(base_url)?,
            credentials,
            pattern: csv_pattern()?,
        })
    }

    fn base_str(&self) -> String {
        let mut base = self.base.clone();
        base.set_fragment(None);
        base.to_string()
    }

    async fn log_in(
        &self,
        session: &mut dyn BrowserSession,
        timeouts: &Timeouts,
    ) -> Result<(), DriverError> {
        let modal = Selector::id(PROGRESS_MODAL);
        session.goto(&self.base_str()).await?;
        session.wait_until_gone(&modal, timeouts.navigate).await?;

        let login = Selector::id(LOGIN_BUTTON);
        session.wait_until_clickable(&login, timeouts.interactive).await?;
        session.click(&login).await?;

        let username = Selector::id(USERNAME_FIELD);
        session.wait_until_present(&username, timeouts.interactive).await?;
        session.type_text(&username, &self.credentials.username).await?;
        session
            .type_text(&Selector::id(PASSWORD_FIELD), self.credentials.password())
            .await?;
        session.click(&Selector::css(SUBMIT_LOGIN)).await?;

        session.wait_until_gone(&modal, timeouts.navigate).await?;
        tracing::debug!(target: "fetch.portal", "portal.login.ok");
        Ok(())
    }
}

impl std::fmt::Debug for PortalSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalSite")
            .field("base", &self.base.as_str())
            .field("credentials", &self.credentials)
            .finish()
    }
}

#[async_trait]
impl SiteAdapter for PortalSite {
    fn site(&self) -> Site {
        Site::Portal
    }

    fn download_pattern(&self) -> &Regex {
        &self.pattern
    }

    fn locate(&self, target: &DownloadTarget) -> Result<String, FetchError> {
        match &target.source {
            TargetSource::Portal(query) => Ok(format!("{}{}", self.base_str(), query.fragment())),
            TargetSource::Archive { .. } => Err(FetchError::InvalidInput(
                "portal site cannot serve an archive city".into(),
            )),
        }
    }

    async fn navigate(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        timeouts: &Timeouts,
    ) -> Result<(), DriverError> {
        self.log_in(session, timeouts).await?;
        // Fragment-only navigation does not rerun the portal's router.
        session.goto(url).await?;
        session.refresh().await
    }

    async fn wait_interactive(
        &self,
        session: &mut dyn BrowserSession,
        timeouts: &Timeouts,
    ) -> Result<(), DriverError> {
        let modal = Selector::id(PROGRESS_MODAL);
        session.wait_until_gone(&modal, timeouts.interactive).await?;
        session
            .wait_until_clickable(&Selector::id(PLOT_BUTTON), timeouts.interactive)
            .await?;
        session.wait_until_gone(&modal, timeouts.interactive).await
    }

    async fn trigger_download(
        &self,
        session: &mut dyn BrowserSession,
        timeouts: &Timeouts,
    ) -> Result<(), DriverError> {
        session.click(&Selector::id(PLOT_BUTTON)).await?;
        // Plot rendering for multi-year ranges can take many minutes.
        let toggle = Selector::css(DOWNLOAD_TOGGLE);
        session.wait_until_clickable(&toggle, timeouts.trigger).await?;
        session.click(&toggle).await
    }

    async fn select_format(
        &self,
        session: &mut dyn BrowserSession,
        timeouts: &Timeouts,
    ) -> Result<(), DriverError> {
        let csv = Selector::css(DOWNLOAD_CSV);
        session.wait_until_clickable(&csv, timeouts.select_format).await?;
        session.click(&csv).await
    }
}
