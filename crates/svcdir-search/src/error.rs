use thiserror::Error;

/// Failures surfaced by the search pipeline.
///
/// Location and geocoding problems never appear here: they degrade to a
/// default anchor and are reported in the response metadata instead.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request itself is malformed; maps to HTTP 400.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The query could not be turned into a valid structured search.
    #[error("query processing failed: {0}")]
    QueryProcessing(String),

    /// Both the structured query and the fallback listing failed.
    #[error("service store unavailable: {0}")]
    Store(String),
}

impl SearchError {
    /// True for errors the caller caused, as opposed to server-side failures.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, SearchError::Validation(_))
    }
}
