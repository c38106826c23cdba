//! Common types and utilities shared across airscout crates.
//!
//! This crate defines the geographic value types, credential handling,
//! observability helpers, and the aggregate batch error used throughout the
//! workspace. It stays dependency‑light so every crate can depend on it.
//!
//! # Overview
//!
//! - [`BoundingBox`]: `(west, south, east, north)` extent in degrees
//! - [`PlaceQuery`]: place name plus two‑letter region code
//! - [`Credentials`]: opaque username/password pair that never prints its secret
//! - [`PartialBatchFailure`]: successes and failures of a batch, reported together
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use airscout_common::BoundingBox;
//!
//! let beijing = BoundingBox::new(115.42, 39.44, 117.51, 41.06).unwrap();
//! assert!(!beijing.crosses_antimeridian());
//! assert_eq!(beijing.to_string(), "115.42,39.44,117.51,41.06");
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod observability;

/// Reasons a set of coordinates cannot form a [`BoundingBox`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),

    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    #[error("south latitude {south} is north of north latitude {north}")]
    Inverted { south: f64, north: f64 },
}

/// Rectangular geographic extent in degrees, stored in the order
/// `(west_lng, south_lat, east_lng, north_lat)`.
///
/// A box whose west edge lies east of its east edge spans the antimeridian;
/// such boxes are accepted and reported by [`BoundingBox::crosses_antimeridian`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", try_from = "[f64; 4]")]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Validate and construct a box.
    ///
    /// ```
    /// use airscout_common::{BoundingBox, BoundsError};
    ///
    /// // Fiji straddles the antimeridian: west > east is allowed.
    /// let fiji = BoundingBox::new(177.0, -19.2, -178.2, -16.0).unwrap();
    /// assert!(fiji.crosses_antimeridian());
    ///
    /// let err = BoundingBox::new(0.0, 10.0, 1.0, 5.0).unwrap_err();
    /// assert!(matches!(err, BoundsError::Inverted { .. }));
    /// ```
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, BoundsError> {
        for lng in [west, east] {
            if !(-180.0..=180.0).contains(&lng) {
                return Err(BoundsError::Longitude(lng));
            }
        }
        for lat in [south, north] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(BoundsError::Latitude(lat));
            }
        }
        if south > north {
            return Err(BoundsError::Inverted { south, north });
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    /// True when the box wraps around the ±180° meridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Coordinates in `(west, south, east, north)` order.
    pub fn as_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        b.as_array()
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = BoundsError;

    fn try_from(v: [f64; 4]) -> Result<Self, Self::Error> {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

/// Comma separated `west,south,east,north`, the form portal URLs expect.
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

/// A place name and the two‑letter region code used to bias geocoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaceQuery {
    name: String,
    region: String,
}

impl PlaceQuery {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Name must be non-empty and region must be exactly two ASCII letters.
    pub fn is_well_formed(&self) -> bool {
        !self.name.trim().is_empty()
            && self.region.len() == 2
            && self.region.chars().all(|c| c.is_ascii_alphabetic())
    }
}

/// Username/password pair handed to a login step.
///
/// `Debug` redacts the password so credentials can sit inside logged structs.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The secret itself; only session login steps should call this.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Browser family driven through WebDriver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

/// Preferred output format for reports and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// Outcome of a batch in which some items failed.
///
/// Batches never stop at the first failure; callers that want a single
/// `Result` convert the per-item report into this error when anything failed.
#[derive(Debug)]
pub struct PartialBatchFailure<S, F> {
    pub succeeded: Vec<S>,
    pub failed: Vec<F>,
}

impl<S, F> fmt::Display for PartialBatchFailure<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} items failed",
            self.failed.len(),
            self.failed.len() + self.succeeded.len()
        )
    }
}

impl<S: fmt::Debug, F: fmt::Debug> std::error::Error for PartialBatchFailure<S, F> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert_eq!(
            BoundingBox::new(-181.0, 0.0, 0.0, 1.0),
            Err(BoundsError::Longitude(-181.0))
        );
        assert_eq!(
            BoundingBox::new(0.0, -91.0, 1.0, 1.0),
            Err(BoundsError::Latitude(-91.0))
        );
    }

    #[test]
    fn serializes_as_ordered_array() {
        let b = BoundingBox::new(121.0, 30.6, 122.1, 31.9).unwrap();
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "[121.0,30.6,122.1,31.9]");

        let bad: Result<BoundingBox, _> = serde_json::from_str("[0.0,5.0,1.0,1.0]");
        assert!(bad.is_err());
    }

    #[test]
    fn place_query_shape() {
        assert!(PlaceQuery::new("Beijing", "cn").is_well_formed());
        assert!(!PlaceQuery::new("  ", "cn").is_well_formed());
        assert!(!PlaceQuery::new("Beijing", "chn").is_well_formed());
        assert!(!PlaceQuery::new("Beijing", "c1").is_well_formed());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("someone@example.org", "hunter2");
        let shown = format!("{creds:?}");
        assert!(shown.contains("someone@example.org"));
        assert!(!shown.contains("hunter2"));
        assert_eq!(creds.password(), "hunter2");
    }

    #[test]
    fn partial_failure_summary() {
        let failure: PartialBatchFailure<&str, &str> = PartialBatchFailure {
            succeeded: vec!["Beijing", "Shanghai"],
            failed: vec!["Atlantis"],
        };
        assert_eq!(failure.to_string(), "1 of 3 items failed");
    }
}
