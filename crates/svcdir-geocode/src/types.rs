//! Wire types for the geocoding service and the hits handed to callers.

use serde::Deserialize;
use svcdir_core::Coordinates;

use crate::error::GeocodeError;

/// One entry of a `/search` response array.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchPlace {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Body of a `/reverse` response. A miss is reported as `{"error": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ReversePlace {
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub lon: Option<String>,
    #[serde(default)]
    pub address: Option<AddressDetails>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AddressDetails {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub hamlet: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
}

impl AddressDetails {
    /// Most specific populated-place name available.
    pub fn locality(&self) -> Option<String> {
        self.city
            .as_ref()
            .or(self.town.as_ref())
            .or(self.village.as_ref())
            .or(self.hamlet.as_ref())
            .cloned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub point: Coordinates,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReverseHit {
    pub point: Coordinates,
    pub city: Option<String>,
    /// State as reported by the service, usually the full name ("Indiana").
    pub state: Option<String>,
    pub zip: Option<String>,
}

pub(crate) fn parse_point(lat: &str, lon: &str) -> Result<Coordinates, GeocodeError> {
    let invalid = || GeocodeError::InvalidCoordinates {
        lat: lat.to_owned(),
        lon: lon.to_owned(),
    };
    let latitude = lat.trim().parse::<f64>().map_err(|_| invalid())?;
    let longitude = lon.trim().parse::<f64>().map_err(|_| invalid())?;
    let point = Coordinates::new(latitude, longitude);
    if point.is_valid() {
        Ok(point)
    } else {
        Err(invalid())
    }
}
