use crate::error::{FetchError, FetchStep};
use crate::target::{DownloadTarget, Site};
use airscout_drivers::{BrowserSession, DriverError};
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;

/// Upper bounds for each step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    pub navigate: Duration,
    pub interactive: Duration,
    /// Covers page work after the first trigger, such as the portal
    /// rendering a plot for a multi-year range.
    pub trigger: Duration,
    pub select_format: Duration,
    pub download: Duration,
    pub poll: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigate: Duration::from_secs(120),
            interactive: Duration::from_secs(60),
            trigger: Duration::from_secs(1800),
            select_format: Duration::from_secs(30),
            download: Duration::from_secs(300),
            poll: Duration::from_millis(500),
        }
    }
}

impl Timeouts {
    /// The overall bound enforced around `step`.
    pub fn for_step(&self, step: FetchStep) -> Duration {
        match step {
            FetchStep::OpenSession | FetchStep::Navigate => self.navigate,
            FetchStep::AwaitInteractive => self.interactive,
            FetchStep::TriggerDownload => self.trigger,
            FetchStep::SelectFormat => self.select_format,
            FetchStep::AwaitFile | FetchStep::Rename => self.download,
        }
    }
}

/// Site-specific navigation plugged into the orchestrator's state machine.
///
/// Adapters only drive the page. Session lifetime, overall step bounds,
/// cancellation and file detection belong to the orchestrator.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn site(&self) -> Site;

    /// File names that count as a finished download.
    fn download_pattern(&self) -> &Regex;

    /// Build the page address for `target`. Runs before a session is opened,
    /// so anything returned as an error costs no browser.
    fn locate(&self, target: &DownloadTarget) -> Result<String, FetchError>;

    /// `SessionReady -> Navigated`.
    async fn navigate(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        timeouts: &Timeouts,
    ) -> Result<(), DriverError>;

    /// `Navigated -> TriggerPending`: loading indicators gone, action control usable.
    async fn wait_interactive(
        &self,
        session: &mut dyn BrowserSession,
        timeouts: &Timeouts,
    ) -> Result<(), DriverError>;

    /// First trigger (open the download menu or history panel).
    async fn trigger_download(
        &self,
        session: &mut dyn BrowserSession,
        timeouts: &Timeouts,
    ) -> Result<(), DriverError>;

    /// Second trigger (pick the file format) that starts the transfer.
    async fn select_format(
        &self,
        session: &mut dyn BrowserSession,
        timeouts: &Timeouts,
    ) -> Result<(), DriverError>;
}

pub(crate) fn csv_pattern() -> Result<Regex, FetchError> {
    Regex::new(r"(?i)\.csv$")
        .map_err(|e| FetchError::InvalidInput(format!("download pattern: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds() {
        let t = Timeouts::default();
        assert_eq!(t.for_step(FetchStep::AwaitInteractive), Duration::from_secs(60));
        assert_eq!(t.for_step(FetchStep::TriggerDownload), Duration::from_secs(1800));
        assert_eq!(t.for_step(FetchStep::OpenSession), t.navigate);
    }

    #[test]
    fn csv_pattern_ignores_partials() {
        let re = csv_pattern().unwrap();
        assert!(re.is_match("beijing-air-quality.csv"));
        assert!(re.is_match("g4.areaAvgTimeSeries.CSV"));
        assert!(!re.is_match("beijing-air-quality.csv.crdownload"));
        assert!(!re.is_match("beijing-air-quality.csv.part"));
    }
}
