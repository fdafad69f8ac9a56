//! Geographic anchors and the location inputs they are resolved from.

use serde::{Deserialize, Serialize};
use svcdir_core::{Coordinates, SearchRadii, StateEntry, Vocabulary};

pub const CONFIDENCE_GEOLOCATION: f64 = 0.95;
pub const CONFIDENCE_QUERY: f64 = 0.9;
pub const CONFIDENCE_ZIP: f64 = 0.8;
pub const CONFIDENCE_DEFAULT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    /// A state named in the query text.
    Query,
    /// Device coordinates supplied by the client.
    Geolocation,
    /// A postal code supplied by the client.
    Zip,
    /// The configured region default.
    Default,
}

/// The geographic context a search is centred on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoAnchor {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub city: Option<String>,
    /// Two-letter abbreviation when known.
    pub state: Option<String>,
    pub zip: Option<String>,
    pub radius_miles: f64,
    pub source: LocationSource,
    pub is_near_me: bool,
    pub confidence: f64,
}

impl GeoAnchor {
    #[must_use]
    pub fn point(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }

    /// The point distances are measured from.
    ///
    /// Only anchors derived from the user's own position or postal code rank by
    /// distance; state and region defaults are too coarse to be meaningful.
    #[must_use]
    pub fn ranking_point(&self) -> Option<Coordinates> {
        match self.source {
            LocationSource::Geolocation | LocationSource::Zip => self.point(),
            LocationSource::Query | LocationSource::Default => None,
        }
    }

    /// True when the anchor came from the user rather than a default.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        matches!(self.source, LocationSource::Geolocation | LocationSource::Zip)
    }

    /// The static region default.
    #[must_use]
    pub fn region_default(vocabulary: &Vocabulary) -> Self {
        let default = &vocabulary.default_location;
        Self {
            lat: Some(default.latitude),
            lng: Some(default.longitude),
            city: Some(default.city.clone()),
            state: Some(default.state.clone()),
            zip: Some(default.zip.clone()),
            radius_miles: vocabulary.radii.default_miles,
            source: LocationSource::Default,
            is_near_me: false,
            confidence: CONFIDENCE_DEFAULT,
        }
    }

    /// Anchor for a state named in the query text.
    ///
    /// Carries the state's default city and zip but no coordinates: a state
    /// search filters on the `state` column and never ranks by distance.
    #[must_use]
    pub fn for_state(entry: &StateEntry, radii: &SearchRadii) -> Self {
        Self {
            lat: None,
            lng: None,
            city: Some(entry.default_city.clone()),
            state: Some(entry.abbreviation.clone()),
            zip: Some(entry.default_zip.clone()),
            radius_miles: radii.default_miles,
            source: LocationSource::Query,
            is_near_me: false,
            confidence: CONFIDENCE_QUERY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    GeocodingFailure,
}

impl std::fmt::Display for LocationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PermissionDenied => "permission_denied",
            Self::PositionUnavailable => "position_unavailable",
            Self::Timeout => "timeout",
            Self::GeocodingFailure => "geocoding_failure",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationError {
    pub kind: LocationErrorKind,
    pub message: String,
}

impl LocationError {
    pub fn new(kind: LocationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Outcome of resolving the client's location inputs. Always carries a usable
/// anchor; failures are reported alongside it rather than instead of it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationResolution {
    pub anchor: GeoAnchor,
    /// Set when a default was substituted after a lookup failed.
    pub needs_review: bool,
    pub error: Option<LocationError>,
}

impl LocationResolution {
    #[must_use]
    pub fn resolved(anchor: GeoAnchor) -> Self {
        Self {
            anchor,
            needs_review: false,
            error: None,
        }
    }
}

/// Location context supplied by the client alongside the query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    /// Set by the client when device positioning failed on its side.
    pub error: Option<LocationErrorKind>,
}

impl UserLocation {
    #[must_use]
    pub fn point(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }
}
