//! End-to-end search: validate, resolve location, parse, build, execute,
//! format. Any failure after validation lands on the fallback listing
//! instead of an error, unless the store itself is unreachable.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use svcdir_core::{Page, SpecMode, Vocabulary};
use svcdir_geocode::Geocoder;

use crate::error::SearchError;
use crate::executor::{ExecutionKind, ExecutorSettings, SearchExecutor};
use crate::formatter::{format_search_results, FormatOptions, FormattedResults, RankedResult};
use crate::geo_resolver::GeoResolver;
use crate::location::{GeoAnchor, LocationError, LocationResolution, UserLocation};
use crate::query_builder::build_paginated_search_query;
use crate::query_processor::{ParsedQuery, QueryFilters, QueryProcessor, SearchType};
use crate::store::ServiceStore;

pub const MAX_QUERY_CHARS: usize = 500;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const SUGGESTION_LIMIT: i64 = 10;
pub const MIN_SUGGESTION_CHARS: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Required; optional here so a missing field is a validation error
    /// rather than a body rejection.
    pub query: Option<String>,
    pub user_location: Option<UserLocation>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: UserLocation) -> Self {
        self.user_location = Some(location);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Service,
    Product,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetadata {
    pub original_query: String,
    pub parsed_query: ParsedQuery,
    pub result_count: usize,
    pub total_count: i64,
    pub search_radius: f64,
    pub search_type: ResultKind,
    pub filters: QueryFilters,
    pub location: GeoAnchor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_error: Option<LocationError>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub needs_review: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<RankedResult>,
    pub metadata: SearchMetadata,
}

/// Which branch of the pipeline produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePath {
    Structured,
    Fallback,
}

impl std::fmt::Display for PipelinePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Structured => "structured",
            Self::Fallback => "fallback",
        })
    }
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub response: SearchResponse,
    pub path: PipelinePath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: i64,
    pub name: String,
    pub service_type: String,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub executor: ExecutorSettings,
    pub geolocation_timeout: Duration,
    /// Page size when the request gives no limit.
    pub page_size: i64,
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &svcdir_core::AppConfig) -> Self {
        Self {
            executor: ExecutorSettings::from_app_config(config),
            geolocation_timeout: Duration::from_secs(config.geolocation_timeout_secs),
            page_size: config.search_page_size,
        }
    }
}

pub struct SearchPipeline {
    resolver: GeoResolver,
    processor: QueryProcessor,
    executor: SearchExecutor,
    page_size: i64,
}

impl SearchPipeline {
    #[must_use]
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        geocoder: Arc<dyn Geocoder>,
        store: Arc<dyn ServiceStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            resolver: GeoResolver::new(vocabulary.clone(), geocoder, settings.geolocation_timeout),
            processor: QueryProcessor::new(vocabulary),
            executor: SearchExecutor::new(store, settings.executor),
            page_size: settings.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &GeoResolver {
        &self.resolver
    }

    /// Checks the request shape and returns the query text and page.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Validation`] for a missing or oversized query,
    /// an out-of-range page, or malformed coordinates.
    pub fn validate<'r>(&self, request: &'r SearchRequest) -> Result<(&'r str, Page), SearchError> {
        let invalid = |msg: &str| Err(SearchError::Validation(msg.to_string()));

        let Some(query) = request.query.as_deref() else {
            return invalid("query is required");
        };
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(SearchError::Validation(format!(
                "query must be at most {MAX_QUERY_CHARS} characters"
            )));
        }

        let limit = request.limit.unwrap_or(self.page_size);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(SearchError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let offset = request.offset.unwrap_or(0);
        if offset < 0 {
            return invalid("offset must not be negative");
        }

        if let Some(location) = &request.user_location {
            match (location.lat, location.lng) {
                (Some(_), None) | (None, Some(_)) => {
                    return invalid("userLocation.lat and userLocation.lng must be sent together");
                }
                (Some(lat), Some(lng)) => {
                    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                        return invalid("userLocation.lat must be between -90 and 90");
                    }
                    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
                        return invalid("userLocation.lng must be between -180 and 180");
                    }
                }
                (None, None) => {}
            }
        }

        Ok((query, Page::new(limit, offset)))
    }

    /// Run a search.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Validation`] for malformed requests and
    /// [`SearchError::Store`] when neither the structured query nor the
    /// fallback listing could be served.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome, SearchError> {
        let (query, page) = self.validate(request)?;

        let resolution = self
            .resolver
            .resolve_user_location(request.user_location.as_ref())
            .await;

        let parsed = self.processor.process(query, &resolution.anchor);
        tracing::debug!(
            stage = "process_query",
            query = %query,
            anchor_source = ?parsed.location.source,
            services = ?parsed.entities.services,
            intent = %parsed.intent,
            "query processed"
        );

        let outcome = match build_paginated_search_query(&parsed, page) {
            Ok((spec, post_page)) => {
                let executed = self.executor.perform_database_search(&spec).await?;
                let degraded = spec.mode == SpecMode::Filtered && executed.kind == ExecutionKind::Fallback;
                // The fallback listing is never paged by the store.
                let options = if degraded {
                    FormatOptions {
                        max_distance: None,
                        page: Some(page),
                    }
                } else {
                    FormatOptions {
                        max_distance: spec.bounds.map(|_| parsed.location.radius_miles),
                        page: post_page,
                    }
                };
                let formatted = format_search_results(
                    executed.page.rows,
                    executed.page.total_count,
                    &parsed,
                    options,
                );
                let path = if degraded {
                    PipelinePath::Fallback
                } else {
                    PipelinePath::Structured
                };
                let kind = match executed.kind {
                    ExecutionKind::Fallback => ResultKind::Fallback,
                    ExecutionKind::Structured => match parsed.search_type {
                        SearchType::Service => ResultKind::Service,
                        SearchType::Product => ResultKind::Product,
                    },
                };
                build_outcome(parsed, &resolution, formatted, kind, path)
            }
            Err(error) => {
                tracing::warn!(
                    stage = "build_query",
                    query = %query,
                    error = %error,
                    "structured search abandoned, serving fallback listing"
                );
                self.fallback(query, &resolution, page).await?
            }
        };

        tracing::info!(
            stage = "respond",
            query = %query,
            path = %outcome.path,
            result_count = outcome.response.metadata.result_count,
            total_count = outcome.response.metadata.total_count,
            "search complete"
        );
        Ok(outcome)
    }

    async fn fallback(
        &self,
        query: &str,
        resolution: &LocationResolution,
        page: Page,
    ) -> Result<SearchOutcome, SearchError> {
        let parsed = ParsedQuery::best_effort(query, resolution.anchor.clone());
        let executed = self.executor.run_fallback().await?;
        let formatted = format_search_results(
            executed.page.rows,
            executed.page.total_count,
            &parsed,
            FormatOptions {
                max_distance: None,
                page: Some(page),
            },
        );
        Ok(build_outcome(
            parsed,
            resolution,
            formatted,
            ResultKind::Fallback,
            PipelinePath::Fallback,
        ))
    }

    /// Autocomplete suggestions; terms shorter than two characters yield none.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Validation`] for oversized terms and
    /// [`SearchError::Store`] if the lookup fails.
    pub async fn suggest(&self, term: &str) -> Result<Vec<Suggestion>, SearchError> {
        let term = term.trim();
        let chars = term.chars().count();
        if chars < MIN_SUGGESTION_CHARS {
            return Ok(Vec::new());
        }
        if chars > MAX_QUERY_CHARS {
            return Err(SearchError::Validation(format!(
                "q must be at most {MAX_QUERY_CHARS} characters"
            )));
        }

        let rows = self.executor.suggest(term, SUGGESTION_LIMIT).await?;
        Ok(rows
            .into_iter()
            .map(|row| Suggestion {
                id: row.id,
                name: row.name,
                service_type: row.service_type,
                city: row.city,
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns [`SearchError::Store`] if the store is unreachable.
    pub async fn health(&self) -> Result<(), SearchError> {
        self.executor.ping().await
    }
}

fn build_outcome(
    parsed: ParsedQuery,
    resolution: &LocationResolution,
    formatted: FormattedResults,
    search_type: ResultKind,
    path: PipelinePath,
) -> SearchOutcome {
    let metadata = SearchMetadata {
        original_query: parsed.original_query.clone(),
        result_count: formatted.results.len(),
        total_count: formatted.total_count,
        search_radius: parsed.location.radius_miles,
        search_type,
        filters: parsed.filters,
        location: parsed.location.clone(),
        location_error: resolution.error.clone(),
        needs_review: resolution.needs_review,
        timestamp: Utc::now(),
        parsed_query: parsed,
    };
    SearchOutcome {
        response: SearchResponse {
            success: true,
            results: formatted.results,
            metadata,
        },
        path,
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
