//! Distance annotation, exact-match flagging and ranking of store rows.

use std::cmp::Ordering;

use serde::Serialize;
use svcdir_core::{haversine_miles, Coordinates, Page};
use svcdir_db::ServiceRow;

use crate::location::GeoAnchor;
use crate::query_processor::ParsedQuery;
use crate::text::normalize_query;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResult {
    pub id: i64,
    pub name: String,
    pub service_type: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_verified: bool,
    /// Miles from the anchor; absent when either side has no coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    pub is_exact_match: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FormatOptions {
    /// Drop rows farther than this many miles from the anchor.
    pub max_distance: Option<f64>,
    /// Page applied after ranking.
    pub page: Option<Page>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormattedResults {
    pub results: Vec<RankedResult>,
    /// Size of the matching set before paging.
    pub total_count: i64,
}

fn is_exact_match(row: &ServiceRow, anchor: &GeoAnchor, query: &str) -> bool {
    if !query.is_empty() && normalize_query(&row.name) == query {
        return true;
    }
    if !anchor.is_concrete() {
        return false;
    }
    let zip_match = matches!((&row.zip_code, &anchor.zip), (Some(a), Some(b)) if a.trim() == b.trim());
    let city_match = matches!(
        (&row.city, &anchor.city),
        (Some(a), Some(b)) if normalize_query(a) == normalize_query(b)
    );
    zip_match || city_match
}

fn by_name(a: &RankedResult, b: &RankedResult) -> Ordering {
    a.name.cmp(&b.name).then(a.id.cmp(&b.id))
}

fn by_distance(a: &RankedResult, b: &RankedResult) -> Ordering {
    match (a.distance, b.distance) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Exact matches first (by name), then everything else by distance with
/// rows lacking a distance last, ties broken by name and id.
fn rank(a: &RankedResult, b: &RankedResult) -> Ordering {
    b.is_exact_match
        .cmp(&a.is_exact_match)
        .then_with(|| {
            if a.is_exact_match {
                Ordering::Equal
            } else {
                by_distance(a, b)
            }
        })
        .then_with(|| by_name(a, b))
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value.max(0)).unwrap_or(usize::MAX)
}

/// Annotate, filter, rank and page `rows` for the response.
///
/// `total_count` is the store's count for the full filtered set; rows removed
/// by the distance refinement are subtracted from it.
#[must_use]
pub fn format_search_results(
    rows: Vec<ServiceRow>,
    total_count: i64,
    parsed: &ParsedQuery,
    options: FormatOptions,
) -> FormattedResults {
    let anchor = &parsed.location;
    let origin = anchor.ranking_point();
    let fetched = rows.len();

    let mut results: Vec<RankedResult> = rows
        .into_iter()
        .map(|row| {
            let distance = match (origin, row.latitude, row.longitude) {
                (Some(origin), Some(lat), Some(lng)) => {
                    Some(haversine_miles(origin, Coordinates::new(lat, lng)))
                }
                _ => None,
            };
            let is_exact_match = is_exact_match(&row, anchor, &parsed.normalized_query);
            RankedResult {
                id: row.id,
                name: row.name,
                service_type: row.service_type,
                description: row.description,
                address: row.address,
                city: row.city,
                state: row.state,
                zip_code: row.zip_code,
                latitude: row.latitude,
                longitude: row.longitude,
                is_verified: row.is_verified,
                distance,
                is_exact_match,
            }
        })
        .filter(|r| match (options.max_distance, r.distance) {
            (Some(max), Some(d)) => d <= max,
            _ => true,
        })
        .collect();

    let dropped = i64::try_from(fetched - results.len()).unwrap_or(0);
    let total_count = (total_count - dropped).max(i64::try_from(results.len()).unwrap_or(i64::MAX));

    results.sort_by(rank);

    if let Some(page) = options.page {
        results = results
            .into_iter()
            .skip(to_usize(page.offset))
            .take(to_usize(page.limit))
            .collect();
    }

    FormattedResults {
        results,
        total_count,
    }
}

#[cfg(test)]
#[path = "formatter_test.rs"]
mod tests;
