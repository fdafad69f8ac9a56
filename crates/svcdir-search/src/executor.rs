//! Runs search specs against a [`ServiceStore`] with retry, per-attempt
//! timeouts and an unfiltered fallback listing.

use std::sync::Arc;
use std::time::Duration;

use svcdir_core::{is_transient_message, retry, RetryPolicy, SearchSpec, SpecMode};
use svcdir_db::{DbError, ServicePage, ServiceSuggestionRow};
use thiserror::Error;

use crate::error::SearchError;
use crate::store::ServiceStore;

#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("store call timed out after {0:?}")]
    TimedOut(Duration),
}

impl AttemptError {
    fn is_transient(&self) -> bool {
        match self {
            AttemptError::Db(e) => e.is_transient() || is_transient_message(&e.to_string()),
            AttemptError::TimedOut(_) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionKind {
    /// The structured spec ran against indexed filters.
    Structured,
    /// The unfiltered listing was returned, either because the spec had no
    /// filters or because the structured query failed.
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub page: ServicePage,
    pub kind: ExecutionKind,
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutorSettings {
    pub retry: RetryPolicy,
    pub store_timeout: Duration,
    /// Cap on rows fetched for distance ranking.
    pub max_results: i64,
    pub fallback_limit: i64,
}

impl ExecutorSettings {
    #[must_use]
    pub fn from_app_config(config: &svcdir_core::AppConfig) -> Self {
        Self {
            retry: RetryPolicy::new(
                config.retry_max_attempts,
                Duration::from_millis(config.retry_delay_ms),
                config.retry_backoff_multiplier,
            ),
            store_timeout: Duration::from_secs(config.store_timeout_secs),
            max_results: config.search_max_results,
            fallback_limit: config.search_fallback_limit,
        }
    }
}

pub struct SearchExecutor {
    store: Arc<dyn ServiceStore>,
    settings: ExecutorSettings,
}

impl SearchExecutor {
    #[must_use]
    pub fn new(store: Arc<dyn ServiceStore>, settings: ExecutorSettings) -> Self {
        Self { store, settings }
    }

    async fn guarded<T, F, Fut>(&self, operation: F) -> Result<T, String>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, DbError>>,
    {
        let timeout = self.settings.store_timeout;
        retry(&self.settings.retry, AttemptError::is_transient, || {
            let call = operation();
            async move {
                match tokio::time::timeout(timeout, call).await {
                    Ok(result) => result.map_err(AttemptError::from),
                    Err(_) => Err(AttemptError::TimedOut(timeout)),
                }
            }
        })
        .await
        .map_err(|failure| failure.to_string())
    }

    /// Execute `spec`, falling back to the unfiltered listing if the
    /// structured query fails after retries.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`] only when the fallback fails as well.
    pub async fn perform_database_search(&self, spec: &SearchSpec) -> Result<ExecutionOutcome, SearchError> {
        let max_rows = self.settings.max_results;
        match self.guarded(|| self.store.search(spec, max_rows)).await {
            Ok(page) => {
                let kind = match spec.mode {
                    SpecMode::Filtered => ExecutionKind::Structured,
                    SpecMode::Unfiltered => ExecutionKind::Fallback,
                };
                tracing::debug!(
                    stage = "execute",
                    rows = page.rows.len(),
                    total_count = page.total_count,
                    "structured search complete"
                );
                Ok(ExecutionOutcome { page, kind })
            }
            Err(error) => {
                tracing::warn!(
                    stage = "execute",
                    error = %error,
                    "structured search failed, running fallback listing"
                );
                self.run_fallback().await
            }
        }
    }

    /// The unfiltered "top N by name" listing.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`] if the listing fails after retries.
    pub async fn run_fallback(&self) -> Result<ExecutionOutcome, SearchError> {
        let limit = self.settings.fallback_limit;
        match self.guarded(|| self.store.list_by_name(limit)).await {
            Ok(page) => Ok(ExecutionOutcome {
                page,
                kind: ExecutionKind::Fallback,
            }),
            Err(error) => {
                tracing::error!(stage = "fallback", error = %error, "fallback listing failed");
                Err(SearchError::Store(error))
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`SearchError::Store`] if the lookup fails after retries.
    pub async fn suggest(&self, term: &str, limit: i64) -> Result<Vec<ServiceSuggestionRow>, SearchError> {
        self.guarded(|| self.store.suggest(term, limit))
            .await
            .map_err(SearchError::Store)
    }

    /// # Errors
    ///
    /// Returns [`SearchError::Store`] if the store cannot be reached.
    pub async fn ping(&self) -> Result<(), SearchError> {
        let timeout = self.settings.store_timeout;
        match tokio::time::timeout(timeout, self.store.ping()).await {
            Ok(result) => result.map_err(|e| SearchError::Store(e.to_string())),
            Err(_) => Err(SearchError::Store(format!("ping timed out after {timeout:?}"))),
        }
    }
}
