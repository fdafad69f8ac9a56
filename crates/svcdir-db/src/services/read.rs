//! Read operations for the `services` table.

use sqlx::{PgPool, Postgres, QueryBuilder};
use svcdir_core::{SearchSpec, SortOrder};

use super::types::{ServicePage, ServiceRow, ServiceSuggestionRow};
use crate::DbError;

const SERVICE_COLUMNS: &str = "SELECT id, name, service_type, description, address, city, \
     state, zip_code, latitude, longitude, is_verified FROM services";

/// Appends the spec's predicates. Every predicate targets an indexed column
/// except `is_verified`, which only ever narrows an indexed match.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, spec: &SearchSpec) {
    qb.push(" WHERE TRUE");

    if !spec.service_types.is_empty() {
        qb.push(" AND service_type = ANY(")
            .push_bind(spec.service_types.clone())
            .push(")");
    }
    if let Some(state) = &spec.state {
        qb.push(" AND state = ").push_bind(state.clone());
    }
    if let Some(zip) = &spec.zip_code {
        qb.push(" AND zip_code = ").push_bind(zip.clone());
    }
    if let Some(bounds) = &spec.bounds {
        qb.push(" AND latitude BETWEEN ")
            .push_bind(bounds.min_lat)
            .push(" AND ")
            .push_bind(bounds.max_lat)
            .push(" AND longitude BETWEEN ")
            .push_bind(bounds.min_lng)
            .push(" AND ")
            .push_bind(bounds.max_lng);
    }
    if spec.verified_only {
        qb.push(" AND is_verified = TRUE");
    }
}

/// Count rows matching the spec's filters, ignoring pagination.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_services(pool: &PgPool, spec: &SearchSpec) -> Result<i64, DbError> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM services");
    push_filters(&mut qb, spec);
    let count = qb.build_query_scalar::<i64>().fetch_one(pool).await?;
    Ok(count)
}

/// Execute a structured search.
///
/// Rows are ordered `name ASC, id ASC`; for [`SortOrder::Deferred`] specs the
/// caller re-sorts by distance. With a page the store applies `LIMIT/OFFSET`;
/// without one at most `max_rows` rows are returned. `total_count` is always
/// the full filtered count.
///
/// # Errors
///
/// Returns [`DbError::InvalidSpec`] if the spec fails validation, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn search_services(
    pool: &PgPool,
    spec: &SearchSpec,
    max_rows: i64,
) -> Result<ServicePage, DbError> {
    spec.validate().map_err(DbError::InvalidSpec)?;

    let total_count = count_services(pool, spec).await?;

    let mut qb = QueryBuilder::<Postgres>::new(SERVICE_COLUMNS);
    push_filters(&mut qb, spec);
    qb.push(" ORDER BY name ASC, id ASC");
    match spec.page {
        Some(page) => {
            qb.push(" LIMIT ")
                .push_bind(page.limit.min(max_rows))
                .push(" OFFSET ")
                .push_bind(page.offset);
        }
        None => {
            qb.push(" LIMIT ").push_bind(max_rows);
        }
    }

    let rows = qb.build_query_as::<ServiceRow>().fetch_all(pool).await?;

    if spec.order == SortOrder::Deferred && total_count > max_rows {
        tracing::warn!(
            total_count,
            max_rows,
            "distance-ranked search truncated by the safety cap"
        );
    }

    Ok(ServicePage { rows, total_count })
}

/// Unfiltered "top N by name" listing used when structured search fails.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn list_services_by_name(pool: &PgPool, limit: i64) -> Result<ServicePage, DbError> {
    let total_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM services")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, service_type, description, address, city, \
                state, zip_code, latitude, longitude, is_verified \
         FROM services \
         ORDER BY name ASC, id ASC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(ServicePage { rows, total_count })
}

/// Autocomplete over name, service type and city.
///
/// Prefix matches on `name` sort before substring matches, then by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn suggest_services(
    pool: &PgPool,
    term: &str,
    limit: i64,
) -> Result<Vec<ServiceSuggestionRow>, DbError> {
    let escaped = escape_like(term.trim());
    let contains = format!("%{escaped}%");
    let prefix = format!("{escaped}%");

    let rows = sqlx::query_as::<_, ServiceSuggestionRow>(
        "SELECT id, name, service_type, city \
         FROM services \
         WHERE name ILIKE $1 OR service_type ILIKE $1 OR city ILIKE $1 \
         ORDER BY (name ILIKE $2) DESC, name ASC, id ASC \
         LIMIT $3",
    )
    .bind(contains)
    .bind(prefix)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcdir_core::{BoundingBox, Coordinates, Page, SpecMode};

    fn spec() -> SearchSpec {
        SearchSpec {
            service_types: vec!["groomer".to_string(), "trainer".to_string()],
            state: Some("IN".to_string()),
            zip_code: Some("46037".to_string()),
            bounds: Some(BoundingBox::around(Coordinates::new(39.9, -86.0), 10.0)),
            verified_only: true,
            order: SortOrder::Name,
            mode: SpecMode::Filtered,
            page: Some(Page::new(20, 0)),
        }
    }

    #[test]
    fn filters_render_every_predicate() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM services");
        push_filters(&mut qb, &spec());
        let sql = qb.sql();
        assert!(sql.contains("service_type = ANY($1)"), "{sql}");
        assert!(sql.contains("state = $2"), "{sql}");
        assert!(sql.contains("zip_code = $3"), "{sql}");
        assert!(sql.contains("latitude BETWEEN $4 AND $5"), "{sql}");
        assert!(sql.contains("longitude BETWEEN $6 AND $7"), "{sql}");
        assert!(sql.contains("is_verified = TRUE"), "{sql}");
    }

    #[test]
    fn unfiltered_spec_renders_no_predicates() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM services");
        push_filters(&mut qb, &SearchSpec::unfiltered(10));
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM services WHERE TRUE");
    }

    #[test]
    fn escape_like_escapes_metacharacters() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("groom"), "groom");
    }
}
