use crate::error::GeocodeError;
use airscout_common::{BoundingBox, PlaceQuery};
use airscout_http::{Auth, HttpClient, HttpError, RequestOpts};
use async_trait::async_trait;
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Duration;

const GEOCODE_API_BASE: &str = "https://maps.googleapis.com/maps/api/geocode/";

/// A successfully geocoded place.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlace {
    /// Short display name of the first address component, e.g. `"Beijing"`.
    pub short_name: String,
    pub bbox: BoundingBox,
}

/// Anything that can turn a place query into a bounding box.
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    async fn resolve(&self, place: &PlaceQuery) -> Result<ResolvedPlace, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    short_name: String,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(default)]
    bounds: Option<Bounds>,
}

#[derive(Debug, Deserialize)]
struct Bounds {
    southwest: LatLng,
    northeast: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Google geocoding API client.
///
/// Exactly one request per [`resolve`](PlaceResolver::resolve) call; retries
/// are left to callers.
pub struct Geocoder {
    client: HttpClient,
    api_key: String,
}

impl Geocoder {
    /// Client for the public Google endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GeocodeError> {
        Self::with_endpoint(GEOCODE_API_BASE, api_key, Duration::from_secs(15))
    }

    /// Client for an alternative endpoint (a proxy, or a mock server in tests).
    /// `endpoint` is the directory containing the `json` resource.
    pub fn with_endpoint(
        endpoint: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let client = HttpClient::new(endpoint)
            .map_err(|e| GeocodeError::InvalidInput(format!("bad geocoder endpoint: {e}")))?
            .with_timeout(timeout)
            .with_retries(0);
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl PlaceResolver for Geocoder {
    async fn resolve(&self, place: &PlaceQuery) -> Result<ResolvedPlace, GeocodeError> {
        if !place.is_well_formed() {
            return Err(GeocodeError::InvalidInput(format!(
                "place name must be non-empty and region a two-letter code, got ({:?}, {:?})",
                place.name(),
                place.region()
            )));
        }

        tracing::debug!(
            target: "geo.geocoder",
            place = place.name(),
            region = place.region(),
            "geocode.resolve.start"
        );

        let opts = RequestOpts {
            query: vec![
                ("address", Cow::Borrowed(place.name())),
                ("region", Cow::Borrowed(place.region())),
            ],
            auth: Some(Auth::Query {
                name: "key",
                value: Cow::Borrowed(self.api_key.as_str()),
            }),
            ..Default::default()
        };

        let resp: GeocodeResponse = self
            .client
            .get_json("json", opts)
            .await
            .map_err(http_to_geocode)?;

        let resolved = interpret(place.name(), resp)?;
        tracing::info!(
            target: "geo.geocoder",
            place = place.name(),
            short_name = %resolved.short_name,
            bbox = %resolved.bbox,
            "geocode.resolve.ok"
        );
        Ok(resolved)
    }
}

fn interpret(place: &str, resp: GeocodeResponse) -> Result<ResolvedPlace, GeocodeError> {
    match resp.status.as_deref() {
        None | Some("OK") | Some("ZERO_RESULTS") => {}
        Some(other) => {
            return Err(GeocodeError::ServiceRejected {
                status: other.to_string(),
                message: resp.error_message.unwrap_or_default(),
            });
        }
    }

    let first = resp
        .results
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::EmptyResult(place.to_string()))?;

    let bounds = first
        .geometry
        .and_then(|g| g.bounds)
        .ok_or_else(|| GeocodeError::MissingGeometry(place.to_string()))?;

    let bbox = BoundingBox::new(
        bounds.southwest.lng,
        bounds.southwest.lat,
        bounds.northeast.lng,
        bounds.northeast.lat,
    )
    .map_err(|source| GeocodeError::InvalidGeometry {
        place: place.to_string(),
        source,
    })?;

    let short_name = first
        .address_components
        .into_iter()
        .next()
        .map(|c| c.short_name)
        .unwrap_or_else(|| place.to_string());

    Ok(ResolvedPlace { short_name, bbox })
}

fn http_to_geocode(e: HttpError) -> GeocodeError {
    match e {
        HttpError::Decode(msg, _) => GeocodeError::MalformedResponse(msg),
        other => GeocodeError::Network(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> GeocodeResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn antimeridian_bounds_are_kept() {
        let resp = parse(json!({
            "status": "OK",
            "results": [{
                "address_components": [{ "short_name": "Fiji", "long_name": "Republic of Fiji" }],
                "geometry": { "bounds": {
                    "southwest": { "lat": -21.0, "lng": 176.8 },
                    "northeast": { "lat": -12.4, "lng": -178.2 }
                }}
            }]
        }));
        let place = interpret("Fiji", resp).unwrap();
        assert!(place.bbox.crosses_antimeridian());
        assert_eq!(place.bbox.as_array(), [176.8, -21.0, -178.2, -12.4]);
    }

    #[test]
    fn inverted_latitudes_are_rejected() {
        let resp = parse(json!({
            "results": [{
                "address_components": [],
                "geometry": { "bounds": {
                    "southwest": { "lat": 10.0, "lng": 0.0 },
                    "northeast": { "lat": 5.0, "lng": 1.0 }
                }}
            }]
        }));
        let err = interpret("Null Island", resp).unwrap_err();
        assert!(matches!(err, GeocodeError::InvalidGeometry { .. }));
    }

    #[test]
    fn missing_short_name_falls_back_to_query() {
        let resp = parse(json!({
            "results": [{
                "geometry": { "bounds": {
                    "southwest": { "lat": 1.0, "lng": 1.0 },
                    "northeast": { "lat": 2.0, "lng": 2.0 }
                }}
            }]
        }));
        assert_eq!(interpret("Somewhere", resp).unwrap().short_name, "Somewhere");
    }

    #[test]
    fn denied_status_is_not_an_empty_result() {
        let resp = parse(json!({
            "results": [],
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }));
        match interpret("Beijing", resp).unwrap_err() {
            GeocodeError::ServiceRejected { status, message } => {
                assert_eq!(status, "REQUEST_DENIED");
                assert_eq!(message, "The provided API key is invalid.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
