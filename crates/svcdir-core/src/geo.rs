//! Great-circle distance and bounding-box helpers for radius searches.
//!
//! Radius filters are pushed to the store as a lat/lng box (cheap, index
//! friendly) and refined afterwards with the exact haversine distance.

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_MILES: f64 = 3_958.8;
const MILES_PER_LAT_DEGREE: f64 = 69.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components finite and inside the valid WGS84 ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Haversine distance between two points in statute miles.
#[must_use]
pub fn haversine_miles(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lng = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Axis-aligned lat/lng box enclosing a search circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Smallest box containing every point within `radius_miles` of `center`.
    ///
    /// Longitude span widens with latitude; near the poles it is clamped to the
    /// full [-180, 180] range.
    #[must_use]
    pub fn around(center: Coordinates, radius_miles: f64) -> Self {
        let lat_delta = radius_miles / MILES_PER_LAT_DEGREE;
        let cos_lat = center.latitude.to_radians().cos();
        let lng_delta = if cos_lat.abs() < 1e-6 {
            180.0
        } else {
            (radius_miles / (MILES_PER_LAT_DEGREE * cos_lat.abs())).min(180.0)
        };

        Self {
            min_lat: (center.latitude - lat_delta).max(-90.0),
            max_lat: (center.latitude + lat_delta).min(90.0),
            min_lng: (center.longitude - lng_delta).max(-180.0),
            max_lng: (center.longitude + lng_delta).min(180.0),
        }
    }

    #[must_use]
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lng..=self.max_lng).contains(&point.longitude)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.min_lat, self.max_lat, self.min_lng, self.max_lng]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lat <= self.max_lat
            && self.min_lng <= self.max_lng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDIANAPOLIS: Coordinates = Coordinates {
        latitude: 39.768_4,
        longitude: -86.158_1,
    };
    const CHICAGO: Coordinates = Coordinates {
        latitude: 41.878_1,
        longitude: -87.629_8,
    };

    #[test]
    fn haversine_zero_for_same_point() {
        assert!(haversine_miles(INDIANAPOLIS, INDIANAPOLIS).abs() < 1e-9);
    }

    #[test]
    fn haversine_indianapolis_to_chicago() {
        let d = haversine_miles(INDIANAPOLIS, CHICAGO);
        assert!((160.0..170.0).contains(&d), "unexpected distance {d}");
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = haversine_miles(INDIANAPOLIS, CHICAGO);
        let b = haversine_miles(CHICAGO, INDIANAPOLIS);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn bounding_box_contains_points_within_radius() {
        let bbox = BoundingBox::around(INDIANAPOLIS, 10.0);
        assert!(bbox.is_valid());
        assert!(bbox.contains(INDIANAPOLIS));
        // ~7 miles north-east
        assert!(bbox.contains(Coordinates::new(39.85, -86.05)));
        assert!(!bbox.contains(CHICAGO));
    }

    #[test]
    fn bounding_box_clamps_near_pole() {
        let bbox = BoundingBox::around(Coordinates::new(89.99, 0.0), 50.0);
        assert!(bbox.max_lat <= 90.0);
        assert!(bbox.min_lng >= -180.0 && bbox.max_lng <= 180.0);
    }

    #[test]
    fn coordinates_validity() {
        assert!(INDIANAPOLIS.is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }
}
