use airscout_config::{AirscoutConfig, TimeoutSettings};
use airscout_drivers::{BrowserProfile, SessionProvider, WebDriverLauncher};
use airscout_fetch::{ArchiveSite, Orchestrator, PortalSite, Timeouts};
use airscout_geo::Geocoder;
use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub fn timeouts(settings: &TimeoutSettings) -> Timeouts {
    Timeouts {
        navigate: Duration::from_secs(settings.navigate_secs),
        interactive: Duration::from_secs(settings.interactive_secs),
        trigger: Duration::from_secs(settings.trigger_secs),
        select_format: Duration::from_secs(settings.select_format_secs),
        download: Duration::from_secs(settings.download_secs),
        poll: Duration::from_millis(settings.poll_millis.max(1)),
    }
}

fn session_provider(cfg: &AirscoutConfig) -> Arc<dyn SessionProvider> {
    let profile = BrowserProfile::new(cfg.browser.kind, cfg.browser.headless);
    let launcher = WebDriverLauncher::new(cfg.browser.webdriver_url.clone(), profile)
        .with_poll_interval(Duration::from_millis(cfg.timeouts.poll_millis.max(1)));
    Arc::new(launcher)
}

pub fn archive_orchestrator(cfg: &AirscoutConfig) -> Result<Orchestrator> {
    let site = ArchiveSite::new(&cfg.archive.base_url).context("archive.base_url")?;
    Ok(Orchestrator::new(session_provider(cfg), timeouts(&cfg.timeouts)).with_adapter(Arc::new(site)))
}

pub fn portal_orchestrator(cfg: &AirscoutConfig) -> Result<Orchestrator> {
    let Some(credentials) = cfg.portal.credentials.clone() else {
        bail!(
            "portal.credentials are not configured \
             (set AIRSCOUT__PORTAL__CREDENTIALS__USERNAME and ..._PASSWORD)"
        );
    };
    let site = PortalSite::new(&cfg.portal.base_url, credentials).context("portal settings")?;
    Ok(Orchestrator::new(session_provider(cfg), timeouts(&cfg.timeouts)).with_adapter(Arc::new(site)))
}

pub fn geocoder(cfg: &AirscoutConfig) -> Result<Geocoder> {
    let Some(api_key) = cfg.geocoder.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        bail!("geocoder.api_key is not configured (set AIRSCOUT__GEOCODER__API_KEY)");
    };
    let geocoder = Geocoder::with_endpoint(
        &cfg.geocoder.endpoint,
        api_key,
        Duration::from_secs(cfg.geocoder.timeout_secs),
    )
    .context("geocoder settings")?;
    Ok(geocoder)
}

/// Names given on the command line, else the configured list.
pub fn places_or_default(given: Vec<String>, cfg: &AirscoutConfig) -> Result<Vec<String>> {
    let places = if given.is_empty() {
        cfg.places.clone()
    } else {
        given
    };
    if places.is_empty() {
        bail!("no places given and none configured under `places`");
    }
    Ok(places)
}

pub fn destination(given: Option<PathBuf>, cfg: &AirscoutConfig) -> PathBuf {
    given.unwrap_or_else(|| cfg.downloads.resolved_directory())
}
