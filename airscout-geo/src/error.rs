use airscout_common::BoundsError;
use thiserror::Error;

/// Why a single place could not be resolved.
///
/// Each variant is distinguishable so a batch can skip and log them
/// independently.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("invalid place query: {0}")]
    InvalidInput(String),

    #[error("geocoding request failed: {0}")]
    Network(String),

    #[error("geocoding service returned no results for '{0}'")]
    EmptyResult(String),

    #[error("'{0}' resolved to a place without bounds")]
    MissingGeometry(String),

    #[error("'{place}' resolved to unusable bounds: {source}")]
    InvalidGeometry {
        place: String,
        #[source]
        source: BoundsError,
    },

    #[error("geocoding service rejected the request ({status}): {message}")]
    ServiceRejected { status: String, message: String },

    #[error("could not decode geocoding response: {0}")]
    MalformedResponse(String),
}

impl GeocodeError {
    /// Stable snake_case tag for machine-readable reports.
    pub fn kind(&self) -> &'static str {
        match self {
            GeocodeError::InvalidInput(_) => "invalid_input",
            GeocodeError::Network(_) => "network",
            GeocodeError::EmptyResult(_) => "empty_result",
            GeocodeError::MissingGeometry(_) => "missing_geometry",
            GeocodeError::InvalidGeometry { .. } => "invalid_geometry",
            GeocodeError::ServiceRejected { .. } => "service_rejected",
            GeocodeError::MalformedResponse(_) => "malformed_response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_tell_failures_apart() {
        assert_eq!(GeocodeError::EmptyResult("Atlantis".into()).kind(), "empty_result");
        assert_eq!(GeocodeError::MissingGeometry("Null Island".into()).kind(), "missing_geometry");
        assert_eq!(GeocodeError::Network("reset".into()).kind(), "network");
    }
}
