use crate::error::GeocodeError;
use crate::geocoder::PlaceResolver;
use airscout_common::{BoundingBox, PartialBatchFailure, PlaceQuery};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Place name → bounding box, append-only.
///
/// Serialises as a JSON object of `name: [west, south, east, north]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    entries: BTreeMap<String, BoundingBox>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Returns `false` and leaves the registry untouched when
    /// `name` is already present.
    pub fn insert(&mut self, name: impl Into<String>, bbox: BoundingBox) -> bool {
        match self.entries.entry(name.into()) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(bbox);
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&BoundingBox> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundingBox)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Result of resolving a list of names: what resolved, and what did not.
#[derive(Debug, Default)]
pub struct RegistryBuild {
    pub registry: Registry,
    pub failures: Vec<(String, GeocodeError)>,
}

impl RegistryBuild {
    pub fn failed_names(&self) -> Vec<&str> {
        self.failures.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Collapse into a single `Result`, failing when any name failed.
    #[allow(clippy::type_complexity)]
    pub fn into_result(
        self,
    ) -> Result<Registry, PartialBatchFailure<(String, BoundingBox), (String, GeocodeError)>> {
        if self.failures.is_empty() {
            return Ok(self.registry);
        }
        Err(PartialBatchFailure {
            succeeded: self
                .registry
                .entries
                .into_iter()
                .collect(),
            failed: self.failures,
        })
    }
}

/// Resolve every name in order, one request each.
///
/// A failure for one name is recorded and the build moves on; the returned
/// registry holds only resolved entries.
pub async fn build_registry<S: AsRef<str>>(
    resolver: &dyn PlaceResolver,
    place_names: &[S],
    region_code: &str,
) -> RegistryBuild {
    let mut build = RegistryBuild::default();

    for name in place_names {
        let name = name.as_ref();
        let query = PlaceQuery::new(name, region_code);
        match resolver.resolve(&query).await {
            Ok(place) => {
                if !build.registry.insert(name, place.bbox) {
                    tracing::warn!(
                        target: "geo.registry",
                        place = name,
                        "registry.duplicate_skipped"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(
                    target: "geo.registry",
                    place = name,
                    error = %err,
                    "registry.resolve_failed"
                );
                build.failures.push((name.to_string(), err));
            }
        }
    }

    tracing::info!(
        target: "geo.registry",
        resolved = build.registry.len(),
        failed = build.failures.len(),
        "registry.built"
    );
    build
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_append_only() {
        let mut reg = Registry::new();
        let first = BoundingBox::new(1.0, 1.0, 2.0, 2.0).unwrap();
        let second = BoundingBox::new(3.0, 3.0, 4.0, 4.0).unwrap();
        assert!(reg.insert("Wuhan", first));
        assert!(!reg.insert("Wuhan", second));
        assert_eq!(reg.get("Wuhan"), Some(&first));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn registry_json_shape() {
        let mut reg = Registry::new();
        reg.insert("Kunming", BoundingBox::new(102.2, 24.4, 103.7, 26.5).unwrap());
        let json = serde_json::to_value(&reg).unwrap();
        assert_eq!(json, serde_json::json!({ "Kunming": [102.2, 24.4, 103.7, 26.5] }));
        let back: Registry = serde_json::from_value(json).unwrap();
        assert_eq!(back, reg);
    }
}
