//! Place-name geocoding and bounding-box registries.
//!
//! - [`geocoder::Geocoder`]: resolves a [`PlaceQuery`](airscout_common::PlaceQuery)
//!   to a bounding box through the Google geocoding API
//! - [`registry::build_registry`]: resolves a list of names, keeping going
//!   past individual failures
pub mod error;
pub mod geocoder;
pub mod registry;

pub use error::GeocodeError;
pub use geocoder::{Geocoder, PlaceResolver, ResolvedPlace};
pub use registry::{Registry, RegistryBuild, build_registry};
