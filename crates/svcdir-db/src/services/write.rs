//! Write operations for the `services` table.
//!
//! Only the geocoding write-back lives here; the search pipeline itself never
//! writes.

use sqlx::PgPool;

use super::types::ServiceAddressRow;
use crate::DbError;

/// List services lacking coordinates, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_services_missing_coordinates(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ServiceAddressRow>, DbError> {
    let rows = sqlx::query_as::<_, ServiceAddressRow>(
        "SELECT id, name, address, city, state, zip_code \
         FROM services \
         WHERE latitude IS NULL OR longitude IS NULL \
         ORDER BY id ASC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Persist geocoded coordinates and the review flag for a single service.
///
/// A single-row `UPDATE` is atomic, so concurrent writers for the same record
/// serialize on its row lock.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no service has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_service_geocode(
    pool: &PgPool,
    id: i64,
    latitude: f64,
    longitude: f64,
    needs_review: bool,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE services \
         SET latitude = $2, longitude = $3, needs_geocoding_review = $4, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(latitude)
    .bind(longitude)
    .bind(needs_review)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
