//! Natural-language search over the services directory.
//!
//! A request flows through [`SearchPipeline`]: the client's location is
//! resolved to a [`GeoAnchor`], the text is parsed into a [`ParsedQuery`],
//! turned into a [`svcdir_core::SearchSpec`], run against a [`ServiceStore`]
//! and ranked into [`RankedResult`]s.

pub mod error;
pub mod executor;
pub mod formatter;
pub mod geo_resolver;
pub mod location;
pub mod pipeline;
pub mod query_builder;
pub mod query_processor;
pub mod rate_limit;
pub mod store;
mod text;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::SearchError;
pub use executor::{ExecutionKind, ExecutionOutcome, ExecutorSettings, SearchExecutor};
pub use formatter::{format_search_results, FormatOptions, FormattedResults, RankedResult};
pub use geo_resolver::{AddressParts, GeoResolver, GeocodePrecision, GeocodedAddress};
pub use location::{GeoAnchor, LocationError, LocationErrorKind, LocationResolution, LocationSource, UserLocation};
pub use pipeline::{
    PipelinePath, PipelineSettings, ResultKind, SearchMetadata, SearchOutcome, SearchPipeline, SearchRequest,
    SearchResponse, Suggestion,
};
pub use query_builder::{build_paginated_search_query, build_search_query};
pub use query_processor::{ParsedQuery, QueryFilters, QueryProcessor, SearchType};
pub use rate_limit::{InMemoryRateLimiter, RateLimitDecision, RateLimiter};
pub use store::{PgServiceStore, ServiceStore};
