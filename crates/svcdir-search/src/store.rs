//! Data-access seam between the pipeline and the provider table.

use async_trait::async_trait;
use sqlx::PgPool;
use svcdir_core::SearchSpec;
use svcdir_db::{DbError, ServicePage, ServiceSuggestionRow};

/// Read operations the search pipeline needs from a provider store.
#[async_trait]
pub trait ServiceStore: Send + Sync {
    /// Rows matching `spec`. Unpaged specs return at most `max_rows` rows.
    async fn search(&self, spec: &SearchSpec, max_rows: i64) -> Result<ServicePage, DbError>;

    /// Unfiltered listing ordered by name, used by the fallback path.
    async fn list_by_name(&self, limit: i64) -> Result<ServicePage, DbError>;

    async fn suggest(&self, term: &str, limit: i64) -> Result<Vec<ServiceSuggestionRow>, DbError>;

    async fn ping(&self) -> Result<(), DbError>;
}

#[derive(Clone)]
pub struct PgServiceStore {
    pool: PgPool,
}

impl PgServiceStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ServiceStore for PgServiceStore {
    async fn search(&self, spec: &SearchSpec, max_rows: i64) -> Result<ServicePage, DbError> {
        svcdir_db::search_services(&self.pool, spec, max_rows).await
    }

    async fn list_by_name(&self, limit: i64) -> Result<ServicePage, DbError> {
        svcdir_db::list_services_by_name(&self.pool, limit).await
    }

    async fn suggest(&self, term: &str, limit: i64) -> Result<Vec<ServiceSuggestionRow>, DbError> {
        svcdir_db::suggest_services(&self.pool, term, limit).await
    }

    async fn ping(&self) -> Result<(), DbError> {
        svcdir_db::health_check(&self.pool).await
    }
}
