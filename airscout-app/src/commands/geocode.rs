use crate::commands::outcome::{self, Outcome};
use crate::wiring;
use airscout_config::AirscoutConfig;
use airscout_geo::{GeocodeError, PlaceResolver, RegistryBuild, build_registry};
use anyhow::{Context, Result, bail};
use std::path::PathBuf;

/// Geocode `places` with the configured geocoder.
pub(crate) async fn resolve_registry(
    cfg: &AirscoutConfig,
    places: Vec<String>,
    region: Option<String>,
) -> Result<RegistryBuild> {
    let places = wiring::places_or_default(places, cfg)?;
    let region = region.unwrap_or_else(|| cfg.geocoder.region.clone());
    let geocoder = wiring::geocoder(cfg)?;
    Ok(resolve_places(&geocoder, &places, &region).await)
}

pub(crate) async fn resolve_places(
    resolver: &dyn PlaceResolver,
    places: &[String],
    region: &str,
) -> RegistryBuild {
    let build = build_registry(resolver, places, region).await;
    for (place, err) in &build.failures {
        tracing::warn!(
            target: "app",
            place = %place,
            kind = err.kind(),
            error = %err,
            "geocode.unresolved"
        );
    }
    build
}

/// Outcome lines for the names that did not resolve.
pub(crate) fn unresolved(build: &RegistryBuild) -> Vec<Outcome<'static>> {
    build
        .failures
        .iter()
        .map(|(place, err)| Outcome::failed(format!("geocode:{place}"), err.kind(), err))
        .collect()
}

/// Fails when any name could not be geocoded.
pub(crate) fn ensure_resolved(failures: &[(String, GeocodeError)]) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    let names: Vec<&str> = failures.iter().map(|(name, _)| name.as_str()).collect();
    bail!("{} place(s) could not be geocoded: {}", names.len(), names.join(", "))
}

pub async fn run(
    cfg: &AirscoutConfig,
    places: Vec<String>,
    region: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    let build = resolve_registry(cfg, places, region).await?;
    let json = serde_json::to_string_pretty(&build.registry)?;
    match out {
        Some(path) => {
            std::fs::write(&path, json + "\n")
                .with_context(|| format!("writing registry to {}", path.display()))?;
            tracing::info!(target: "app", path = %path.display(), entries = build.registry.len(), "registry.saved");
        }
        None => println!("{json}"),
    }
    outcome::print_stderr(&unresolved(&build))?;
    ensure_resolved(&build.failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use airscout_common::{BoundingBox, PlaceQuery};
    use airscout_geo::ResolvedPlace;
    use async_trait::async_trait;

    /// Knows Beijing and Shanghai; every other name has no results.
    struct TwoCities;

    #[async_trait]
    impl PlaceResolver for TwoCities {
        async fn resolve(&self, place: &PlaceQuery) -> Result<ResolvedPlace, GeocodeError> {
            let bbox = match place.name() {
                "Beijing" => BoundingBox::new(115.42, 39.44, 117.51, 41.06),
                "Shanghai" => BoundingBox::new(120.85, 30.67, 122.12, 31.87),
                other => return Err(GeocodeError::EmptyResult(other.to_string())),
            }
            .unwrap();
            Ok(ResolvedPlace {
                short_name: place.name().to_string(),
                bbox,
            })
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn partial_geocode_is_reported_and_fails_the_run() {
        let build = resolve_places(&TwoCities, &names(&["Beijing", "Atlantis", "Shanghai"]), "cn").await;
        assert_eq!(build.registry.len(), 2);

        let lines = unresolved(&build);
        assert_eq!(lines.len(), 1);
        let json = serde_json::to_value(&lines[0]).unwrap();
        assert_eq!(json["target"], "geocode:Atlantis");
        assert_eq!(json["status"], "empty_result");

        let err = ensure_resolved(&build.failures).unwrap_err();
        assert!(err.to_string().contains("Atlantis"));
    }

    #[tokio::test]
    async fn clean_geocode_passes() {
        let build = resolve_places(&TwoCities, &names(&["Shanghai"]), "cn").await;
        assert!(unresolved(&build).is_empty());
        assert!(ensure_resolved(&build.failures).is_ok());
    }
}
