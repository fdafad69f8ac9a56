//! Location resolution: query text, device coordinates, postal codes and the
//! address geocoding cascade used when back-filling provider coordinates.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use svcdir_core::{Coordinates, StateEntry, Vocabulary};
use svcdir_geocode::Geocoder;

use crate::location::{
    GeoAnchor, LocationError, LocationErrorKind, LocationResolution, LocationSource, UserLocation,
    CONFIDENCE_GEOLOCATION, CONFIDENCE_ZIP,
};
use crate::text::{find_phrase, phrase_words, Token};

static ZIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{5}$").expect("valid regex"));

#[must_use]
pub fn is_valid_zip(value: &str) -> bool {
    ZIP_RE.is_match(value)
}

/// States mentioned in the query, ordered by position, with the token span
/// each one occupies.
///
/// Full names match case-insensitively. Two-letter abbreviations only match
/// when written in capitals so that words like "in", "oh" and "me" are not
/// mistaken for states.
pub(crate) fn detect_states<'v>(
    vocabulary: &'v Vocabulary,
    tokens: &[Token],
    consumed: &[bool],
) -> Vec<(usize, usize, &'v StateEntry)> {
    let mut found = Vec::new();
    for entry in &vocabulary.states {
        let name = phrase_words(&entry.name);
        if let Some(start) = find_phrase(tokens, &name, consumed, false) {
            found.push((start, name.len(), entry));
            continue;
        }
        if let Some(start) = tokens
            .iter()
            .enumerate()
            .position(|(i, t)| !consumed[i] && t.raw == entry.abbreviation)
        {
            found.push((start, 1, entry));
        }
    }
    found.sort_by_key(|(start, _, _)| *start);
    found
}

/// Which form of an address produced a geocode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressVariant {
    Full,
    CityStateZip,
    StreetCityState,
    CityState,
}

impl std::fmt::Display for AddressVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Full => "full address",
            Self::CityStateZip => "city, state and zip",
            Self::StreetCityState => "street, city and state",
            Self::CityState => "city and state",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocodePrecision {
    Address(AddressVariant),
    StateCentroid,
    RegionDefault,
}

impl std::fmt::Display for GeocodePrecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address(variant) => write!(f, "{variant}"),
            Self::StateCentroid => f.write_str("state centroid"),
            Self::RegionDefault => f.write_str("region default"),
        }
    }
}

/// Address fields of a provider awaiting coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocodedAddress {
    pub point: Coordinates,
    /// True whenever anything less specific than the full address was used.
    pub needs_review: bool,
    pub precision: GeocodePrecision,
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl AddressParts {
    /// Query strings from most to least specific. Variants missing a
    /// component are skipped.
    #[must_use]
    pub fn variants(&self) -> Vec<(AddressVariant, String)> {
        let street = present(self.address.as_ref());
        let city = present(self.city.as_ref());
        let state = present(self.state.as_ref());
        let zip = present(self.zip.as_ref());

        let mut out = Vec::with_capacity(4);
        if let (Some(street), Some(city), Some(state), Some(zip)) = (street, city, state, zip) {
            out.push((AddressVariant::Full, format!("{street}, {city}, {state} {zip}")));
        }
        if let (Some(city), Some(state), Some(zip)) = (city, state, zip) {
            out.push((AddressVariant::CityStateZip, format!("{city}, {state} {zip}")));
        }
        if let (Some(street), Some(city), Some(state)) = (street, city, state) {
            out.push((AddressVariant::StreetCityState, format!("{street}, {city}, {state}")));
        }
        if let (Some(city), Some(state)) = (city, state) {
            out.push((AddressVariant::CityState, format!("{city}, {state}")));
        }
        out
    }
}

pub struct GeoResolver {
    vocabulary: Arc<Vocabulary>,
    geocoder: Arc<dyn Geocoder>,
    geolocation_timeout: Duration,
}

impl GeoResolver {
    #[must_use]
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        geocoder: Arc<dyn Geocoder>,
        geolocation_timeout: Duration,
    ) -> Self {
        Self {
            vocabulary,
            geocoder,
            geolocation_timeout,
        }
    }

    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[must_use]
    pub fn default_anchor(&self) -> GeoAnchor {
        GeoAnchor::region_default(&self.vocabulary)
    }

    fn fallback(&self, error: LocationError, needs_review: bool) -> LocationResolution {
        tracing::warn!(
            stage = "resolve_location",
            error = %error.kind,
            reason = %error.message,
            "location lookup failed, using region default"
        );
        LocationResolution {
            anchor: self.default_anchor(),
            needs_review,
            error: Some(error),
        }
    }

    /// The first state named in `text`, as an anchor.
    #[must_use]
    pub fn resolve_from_query(&self, text: &str) -> Option<GeoAnchor> {
        let tokens = crate::text::tokenize(text);
        let consumed = vec![false; tokens.len()];
        detect_states(&self.vocabulary, &tokens, &consumed)
            .first()
            .map(|(_, _, entry)| GeoAnchor::for_state(entry, &self.vocabulary.radii))
    }

    /// Reverse-geocode device coordinates into a near-me anchor.
    ///
    /// The device point itself is kept as the anchor; the reverse lookup only
    /// contributes city, state and zip.
    pub async fn resolve_from_device(&self, point: Coordinates) -> LocationResolution {
        if !point.is_valid() {
            return self.fallback(
                LocationError::new(
                    LocationErrorKind::PositionUnavailable,
                    format!("coordinates out of range: {}, {}", point.latitude, point.longitude),
                ),
                false,
            );
        }

        match tokio::time::timeout(self.geolocation_timeout, self.geocoder.reverse(point)).await {
            Err(_) => self.fallback(
                LocationError::new(
                    LocationErrorKind::Timeout,
                    format!(
                        "reverse geocoding exceeded {} ms",
                        self.geolocation_timeout.as_millis()
                    ),
                ),
                true,
            ),
            Ok(Err(e)) => self.fallback(
                LocationError::new(LocationErrorKind::GeocodingFailure, e.to_string()),
                true,
            ),
            Ok(Ok(None)) => self.fallback(
                LocationError::new(
                    LocationErrorKind::GeocodingFailure,
                    "no address found for device coordinates",
                ),
                true,
            ),
            Ok(Ok(Some(hit))) => LocationResolution::resolved(self.device_anchor(
                point,
                hit.city,
                hit.state.as_deref(),
                hit.zip,
            )),
        }
    }

    fn device_anchor(
        &self,
        point: Coordinates,
        city: Option<String>,
        state: Option<&str>,
        zip: Option<String>,
    ) -> GeoAnchor {
        let state = state.map(|s| {
            self.vocabulary
                .find_state(s)
                .map_or_else(|| s.trim().to_string(), |entry| entry.abbreviation.clone())
        });
        GeoAnchor {
            lat: Some(point.latitude),
            lng: Some(point.longitude),
            city,
            state,
            zip,
            radius_miles: self.vocabulary.radii.near_me_miles,
            source: LocationSource::Geolocation,
            is_near_me: true,
            confidence: CONFIDENCE_GEOLOCATION,
        }
    }

    /// Forward-geocode a five-digit postal code.
    pub async fn resolve_from_zip(&self, zip: &str) -> LocationResolution {
        let zip = zip.trim();
        if !is_valid_zip(zip) {
            return self.fallback(
                LocationError::new(
                    LocationErrorKind::GeocodingFailure,
                    format!("'{zip}' is not a five-digit zip code"),
                ),
                true,
            );
        }

        match self.geocoder.forward(zip).await {
            Ok(Some(hit)) => LocationResolution::resolved(GeoAnchor {
                lat: Some(hit.point.latitude),
                lng: Some(hit.point.longitude),
                city: None,
                state: None,
                zip: Some(zip.to_string()),
                radius_miles: self.vocabulary.radii.zip_miles,
                source: LocationSource::Zip,
                is_near_me: false,
                confidence: CONFIDENCE_ZIP,
            }),
            Ok(None) => self.fallback(
                LocationError::new(
                    LocationErrorKind::GeocodingFailure,
                    format!("no match for zip code {zip}"),
                ),
                true,
            ),
            Err(e) => self.fallback(
                LocationError::new(LocationErrorKind::GeocodingFailure, e.to_string()),
                true,
            ),
        }
    }

    /// Resolve whatever location context the client sent.
    ///
    /// Device coordinates win over a zip code. Coordinates that arrive with a
    /// city and state are trusted as-is and skip the reverse lookup.
    pub async fn resolve_user_location(&self, user: Option<&UserLocation>) -> LocationResolution {
        let Some(user) = user else {
            return LocationResolution::resolved(self.default_anchor());
        };

        if let Some(kind) = user.error {
            return self.fallback(
                LocationError::new(kind, "client reported a positioning failure"),
                false,
            );
        }

        if let Some(point) = user.point() {
            let city = present(user.city.as_ref());
            let state = present(user.state.as_ref());
            if let (Some(city), Some(state), true) = (city, state, point.is_valid()) {
                let zip = present(user.zip.as_ref()).map(str::to_string);
                return LocationResolution::resolved(self.device_anchor(
                    point,
                    Some(city.to_string()),
                    Some(state),
                    zip,
                ));
            }
            return self.resolve_from_device(point).await;
        }

        if let Some(zip) = present(user.zip.as_ref()) {
            return self.resolve_from_zip(zip).await;
        }

        LocationResolution::resolved(self.default_anchor())
    }

    /// Geocode a provider address, degrading through less specific variants
    /// and finally to the state centroid or the region default.
    pub async fn geocode_address(&self, parts: &AddressParts) -> GeocodedAddress {
        for (variant, query) in parts.variants() {
            match self.geocoder.forward(&query).await {
                Ok(Some(hit)) => {
                    return GeocodedAddress {
                        point: hit.point,
                        needs_review: variant != AddressVariant::Full,
                        precision: GeocodePrecision::Address(variant),
                    };
                }
                Ok(None) => {
                    tracing::debug!(%variant, query = %query, "no geocode match for address variant");
                }
                Err(e) => {
                    tracing::warn!(%variant, query = %query, error = %e, "address variant geocode failed");
                }
            }
        }

        if let Some(entry) = present(parts.state.as_ref()).and_then(|s| self.vocabulary.find_state(s)) {
            return GeocodedAddress {
                point: entry.centroid(),
                needs_review: true,
                precision: GeocodePrecision::StateCentroid,
            };
        }

        GeocodedAddress {
            point: self.vocabulary.default_location.coordinates(),
            needs_review: true,
            precision: GeocodePrecision::RegionDefault,
        }
    }
}

#[cfg(test)]
#[path = "geo_resolver_test.rs"]
mod tests;
