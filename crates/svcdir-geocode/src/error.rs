use thiserror::Error;

/// Errors returned by the geocoding client.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A hit carried coordinates that do not parse or are out of range.
    #[error("invalid coordinates in geocoder response: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: String, lon: String },

    #[error("invalid geocoder base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl GeocodeError {
    /// Returns `true` for errors that are worth retrying after a back-off delay.
    ///
    /// Retriable: timeouts, connection failures, HTTP 429 and 500/502/503/504.
    /// Malformed payloads and other statuses are returned immediately.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            GeocodeError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| is_transient_status(s.as_u16()))
            }
            GeocodeError::UnexpectedStatus { status, .. } => is_transient_status(*status),
            GeocodeError::Deserialize { .. }
            | GeocodeError::InvalidCoordinates { .. }
            | GeocodeError::InvalidBaseUrl { .. } => false,
        }
    }
}

fn is_transient_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}
