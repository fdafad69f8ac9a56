//! HTTP client for a Nominatim-compatible geocoding service.
//!
//! Every request carries an identifying `User-Agent`, waits for the pacing
//! interval since the previous request, and is retried on transient failures
//! (timeouts, connection errors, 429 and 5xx).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use svcdir_core::{retry, Coordinates, RetryPolicy};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::GeocodeError;
use crate::types::{parse_point, GeocodeHit, ReverseHit, ReversePlace, SearchPlace};
use crate::Geocoder;

#[derive(Debug, Clone)]
pub struct GeocodeClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Minimum spacing between consecutive requests.
    pub min_interval: Duration,
    pub retry: RetryPolicy,
}

impl GeocodeClientConfig {
    #[must_use]
    pub fn from_app_config(config: &svcdir_core::AppConfig) -> Self {
        Self {
            base_url: config.geocoder_base_url.clone(),
            user_agent: config.geocoder_user_agent.clone(),
            timeout_secs: config.geocoder_timeout_secs,
            min_interval: Duration::from_millis(config.geocoder_min_interval_ms),
            retry: RetryPolicy::new(
                config.retry_max_attempts,
                Duration::from_millis(config.retry_delay_ms),
                config.retry_backoff_multiplier,
            ),
        }
    }
}

/// Client for the geocoding REST API.
///
/// Use [`GeocodeClient::new`] with a config pointing at the production
/// service, or at a wiremock server in tests.
pub struct GeocodeClient {
    client: Client,
    base_url: Url,
    min_interval: Duration,
    retry: RetryPolicy,
    last_request: Mutex<Option<Instant>>,
}

impl GeocodeClient {
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeocodeError::InvalidBaseUrl`] if the base
    /// URL does not parse.
    pub fn new(config: &GeocodeClientConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .user_agent(config.user_agent.clone())
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| GeocodeError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            min_interval: config.min_interval,
            retry: config.retry,
            last_request: Mutex::new(None),
        })
    }

    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url, GeocodeError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| GeocodeError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("format", "jsonv2");
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Sleeps until `min_interval` has passed since the previous request.
    ///
    /// The lock is held across the sleep so concurrent callers queue up.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn request_once<T: DeserializeOwned>(&self, url: &Url) -> Result<T, GeocodeError> {
        self.pace().await;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(GeocodeError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.path().to_owned(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
            context: url.path().to_owned(),
            source: e,
        })
    }

    async fn request_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, GeocodeError> {
        retry(&self.retry, GeocodeError::is_transient, || {
            self.request_once::<T>(url)
        })
        .await
        .map_err(|failure| {
            tracing::warn!(
                attempts = failure.attempts,
                error = %failure.error,
                endpoint = url.path(),
                "geocoding request failed"
            );
            failure.error
        })
    }
}

#[async_trait]
impl Geocoder for GeocodeClient {
    async fn forward(&self, query: &str) -> Result<Option<GeocodeHit>, GeocodeError> {
        let url = self.build_url(
            "search",
            &[("q", query), ("limit", "1"), ("countrycodes", "us")],
        )?;
        let places: Vec<SearchPlace> = self.request_json(&url).await?;

        let Some(place) = places.into_iter().next() else {
            tracing::debug!(query, "geocoder returned no results");
            return Ok(None);
        };

        Ok(Some(GeocodeHit {
            point: parse_point(&place.lat, &place.lon)?,
            display_name: place.display_name,
        }))
    }

    async fn reverse(&self, point: Coordinates) -> Result<Option<ReverseHit>, GeocodeError> {
        let lat = point.latitude.to_string();
        let lon = point.longitude.to_string();
        let url = self.build_url(
            "reverse",
            &[("lat", &lat), ("lon", &lon), ("addressdetails", "1")],
        )?;
        let place: ReversePlace = self.request_json(&url).await?;

        if let Some(message) = place.error {
            tracing::debug!(%message, "reverse geocoding found no address");
            return Ok(None);
        }

        let resolved = match (place.lat.as_deref(), place.lon.as_deref()) {
            (Some(lat), Some(lon)) => parse_point(lat, lon)?,
            _ => point,
        };
        let address = place.address.unwrap_or_default();

        Ok(Some(ReverseHit {
            point: resolved,
            city: address.locality(),
            state: address.state,
            zip: address.postcode,
        }))
    }
}
