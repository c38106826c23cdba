use crate::commands::geocode::{ensure_resolved, resolve_registry, unresolved};
use crate::commands::outcome::{self, Outcome};
use crate::wiring;
use airscout_config::AirscoutConfig;
use airscout_fetch::{BatchDriver, BatchReport, DownloadTarget, PortalWindow, portal_targets};
use airscout_geo::Registry;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

pub struct PortalRequest {
    pub start: String,
    pub end: String,
    pub pollutant: String,
    pub places: Vec<String>,
    pub region: Option<String>,
    pub registry: Option<PathBuf>,
    pub dest: Option<PathBuf>,
}

pub async fn archive(
    cfg: &AirscoutConfig,
    cities: Vec<String>,
    dest: Option<PathBuf>,
    name_after_city: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let cities = wiring::places_or_default(cities, cfg)?;
    let dest = wiring::destination(dest, cfg);
    let orchestrator = wiring::archive_orchestrator(cfg)?;

    let targets = cities
        .into_iter()
        .map(|city| {
            let target = DownloadTarget::archive(city.clone(), &dest);
            if name_after_city { target.named(city) } else { target }
        })
        .collect();

    let report = BatchDriver::new(&orchestrator)
        .run_batch_cancellable(targets, cancel)
        .await;
    finish(report)
}

pub async fn portal(cfg: &AirscoutConfig, req: PortalRequest, cancel: &CancellationToken) -> Result<()> {
    // Reject bad dates or pollutants before spending any geocoding quota.
    let window = PortalWindow::parse(&req.start, &req.end, &req.pollutant)?;
    let orchestrator = wiring::portal_orchestrator(cfg)?;
    let dest = wiring::destination(req.dest, cfg);

    let (registry, unresolved_places) = match req.registry {
        Some(path) => (load_registry(&path)?, Vec::new()),
        None => {
            let build = resolve_registry(cfg, req.places, req.region).await?;
            outcome::print_stdout(&unresolved(&build))?;
            (build.registry, build.failures)
        }
    };
    let targets = plan_portal(&registry, window, &dest)?;

    let report = BatchDriver::new(&orchestrator)
        .run_batch_cancellable(targets, cancel)
        .await;
    finish(report)?;
    ensure_resolved(&unresolved_places)
}

/// One portal target per registry entry; an empty registry is an error.
fn plan_portal(registry: &Registry, window: PortalWindow, dest: &Path) -> Result<Vec<DownloadTarget>> {
    if registry.is_empty() {
        bail!("no place has a bounding box; nothing to download");
    }
    Ok(portal_targets(registry.iter(), window, dest))
}

fn load_registry(path: &Path) -> Result<Registry> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening registry {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parsing registry {}", path.display()))
}

fn outcomes(report: &BatchReport) -> Vec<Outcome<'_>> {
    report
        .entries
        .iter()
        .map(|entry| match &entry.result {
            Ok(file) => Outcome::ok(entry.target.label(), &file.path),
            Err(err) => Outcome::failed(entry.target.label(), err.kind(), err),
        })
        .collect()
}

/// Print one line of JSON per target, then fail if any target failed.
fn finish(report: BatchReport) -> Result<()> {
    outcome::print_stdout(&outcomes(&report))?;
    report.into_result()?;
    Ok(())
}
