//! In-memory doubles for the store and geocoder seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use svcdir_core::{Coordinates, SearchSpec};
use svcdir_db::{DbError, ServicePage, ServiceRow, ServiceSuggestionRow};
use svcdir_geocode::{GeocodeError, GeocodeHit, Geocoder, ReverseHit};

use crate::store::ServiceStore;

/// Convenience constructor for provider rows.
#[must_use]
pub fn service_row(
    id: i64,
    name: &str,
    service_type: &str,
    city: &str,
    state: &str,
    zip: &str,
    point: Option<(f64, f64)>,
) -> ServiceRow {
    ServiceRow {
        id,
        name: name.to_string(),
        service_type: service_type.to_string(),
        description: None,
        address: None,
        city: Some(city.to_string()),
        state: Some(state.to_string()),
        zip_code: Some(zip.to_string()),
        latitude: point.map(|p| p.0),
        longitude: point.map(|p| p.1),
        is_verified: false,
    }
}

fn unavailable() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

/// A provider table held in memory, applying the same filter, ordering and
/// paging rules as the Postgres store.
#[derive(Default)]
pub struct MemoryServiceStore {
    rows: Vec<ServiceRow>,
    fail_search: AtomicBool,
    fail_fallback: AtomicBool,
    search_calls: AtomicUsize,
    fallback_calls: AtomicUsize,
}

impl MemoryServiceStore {
    #[must_use]
    pub fn new(rows: Vec<ServiceRow>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Make every structured search fail with a transient pool error.
    #[must_use]
    pub fn failing_search(self) -> Self {
        self.fail_search.store(true, Ordering::SeqCst);
        self
    }

    #[must_use]
    pub fn failing_fallback(self) -> Self {
        self.fail_fallback.store(true, Ordering::SeqCst);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn fallback_calls(&self) -> usize {
        self.fallback_calls.load(Ordering::SeqCst)
    }

    fn matches(spec: &SearchSpec, row: &ServiceRow) -> bool {
        if !spec.service_types.is_empty() && !spec.service_types.contains(&row.service_type) {
            return false;
        }
        if spec.state.is_some() && row.state != spec.state {
            return false;
        }
        if spec.zip_code.is_some() && row.zip_code != spec.zip_code {
            return false;
        }
        if spec.verified_only && !row.is_verified {
            return false;
        }
        if let Some(bounds) = &spec.bounds {
            match (row.latitude, row.longitude) {
                (Some(lat), Some(lng)) => bounds.contains(Coordinates::new(lat, lng)),
                _ => false,
            }
        } else {
            true
        }
    }

    fn sorted(mut rows: Vec<ServiceRow>) -> Vec<ServiceRow> {
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        rows
    }
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value.max(0)).unwrap_or(usize::MAX)
}

#[async_trait]
impl ServiceStore for MemoryServiceStore {
    async fn search(&self, spec: &SearchSpec, max_rows: i64) -> Result<ServicePage, DbError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        spec.validate().map_err(DbError::InvalidSpec)?;

        let matched = Self::sorted(
            self.rows
                .iter()
                .filter(|row| Self::matches(spec, row))
                .cloned()
                .collect(),
        );
        let total_count = i64::try_from(matched.len()).unwrap_or(i64::MAX);
        let (offset, limit) = match spec.page {
            Some(page) => (page.offset, page.limit.min(max_rows)),
            None => (0, max_rows),
        };
        let rows = matched
            .into_iter()
            .skip(to_usize(offset))
            .take(to_usize(limit))
            .collect();
        Ok(ServicePage { rows, total_count })
    }

    async fn list_by_name(&self, limit: i64) -> Result<ServicePage, DbError> {
        self.fallback_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fallback.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let total_count = i64::try_from(self.rows.len()).unwrap_or(i64::MAX);
        let rows = Self::sorted(self.rows.clone())
            .into_iter()
            .take(to_usize(limit))
            .collect();
        Ok(ServicePage { rows, total_count })
    }

    async fn suggest(&self, term: &str, limit: i64) -> Result<Vec<ServiceSuggestionRow>, DbError> {
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let term = term.trim().to_lowercase();
        let mut hits: Vec<(bool, &ServiceRow)> = self
            .rows
            .iter()
            .filter(|row| {
                row.name.to_lowercase().contains(&term)
                    || row.service_type.to_lowercase().contains(&term)
                    || row
                        .city
                        .as_deref()
                        .is_some_and(|c| c.to_lowercase().contains(&term))
            })
            .map(|row| (row.name.to_lowercase().starts_with(&term), row))
            .collect();
        hits.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then(a.1.name.cmp(&b.1.name))
                .then(a.1.id.cmp(&b.1.id))
        });
        Ok(hits
            .into_iter()
            .take(to_usize(limit))
            .map(|(_, row)| ServiceSuggestionRow {
                id: row.id,
                name: row.name.clone(),
                service_type: row.service_type.clone(),
                city: row.city.clone(),
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), DbError> {
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

/// Geocoder answering from fixed tables. Unknown forward queries miss.
#[derive(Default)]
pub struct StubGeocoder {
    forward_hits: HashMap<String, Coordinates>,
    reverse_hit: Option<ReverseHit>,
    reverse_delay: Option<Duration>,
    failing: bool,
    forward_queries: Mutex<Vec<String>>,
    reverse_calls: AtomicUsize,
}

impl StubGeocoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_forward(mut self, query: &str, point: Coordinates) -> Self {
        self.forward_hits.insert(query.to_string(), point);
        self
    }

    #[must_use]
    pub fn with_reverse(mut self, city: &str, state: &str, zip: &str) -> Self {
        self.reverse_hit = Some(ReverseHit {
            point: Coordinates::new(0.0, 0.0),
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            zip: Some(zip.to_string()),
        });
        self
    }

    #[must_use]
    pub fn with_reverse_delay(mut self, delay: Duration) -> Self {
        self.reverse_delay = Some(delay);
        self
    }

    /// Every call fails with an HTTP 503.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn forward_queries(&self) -> Vec<String> {
        self.forward_queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }

    pub fn reverse_calls(&self) -> usize {
        self.reverse_calls.load(Ordering::SeqCst)
    }

    fn outage() -> GeocodeError {
        GeocodeError::UnexpectedStatus {
            status: 503,
            url: "http://geocoder.test".to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn forward(&self, query: &str) -> Result<Option<GeocodeHit>, GeocodeError> {
        if let Ok(mut queries) = self.forward_queries.lock() {
            queries.push(query.to_string());
        }
        if self.failing {
            return Err(Self::outage());
        }
        Ok(self.forward_hits.get(query).map(|point| GeocodeHit {
            point: *point,
            display_name: Some(query.to_string()),
        }))
    }

    async fn reverse(&self, point: Coordinates) -> Result<Option<ReverseHit>, GeocodeError> {
        self.reverse_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.reverse_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(Self::outage());
        }
        Ok(self.reverse_hit.clone().map(|hit| ReverseHit { point, ..hit }))
    }
}
