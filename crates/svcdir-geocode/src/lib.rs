//! Client for the external forward/reverse geocoding service.
//!
//! The service speaks the Nominatim JSON dialect. [`GeocodeClient`] paces
//! requests to respect the provider's usage policy and retries transient
//! failures; [`Geocoder`] is the seam the search pipeline depends on.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;
use svcdir_core::Coordinates;

pub use client::{GeocodeClient, GeocodeClientConfig};
pub use error::GeocodeError;
pub use types::{GeocodeHit, ReverseHit};

/// Forward and reverse geocoding.
///
/// `Ok(None)` means the service answered but found nothing; callers treat it
/// like any other miss and fall back.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn forward(&self, query: &str) -> Result<Option<GeocodeHit>, GeocodeError>;

    async fn reverse(&self, point: Coordinates) -> Result<Option<ReverseHit>, GeocodeError>;
}
