use std::sync::Arc;

use svcdir_core::Vocabulary;

use super::*;
use crate::location::LocationSource;
use crate::query_processor::QueryProcessor;
use crate::testing::service_row;

const FISHERS: (f64, f64) = (39.956, -86.013);

fn device_anchor() -> GeoAnchor {
    GeoAnchor {
        lat: Some(FISHERS.0),
        lng: Some(FISHERS.1),
        city: Some("Fishers".to_string()),
        state: Some("IN".to_string()),
        zip: Some("46037".to_string()),
        radius_miles: 10.0,
        source: LocationSource::Geolocation,
        is_near_me: true,
        confidence: 0.95,
    }
}

fn parse(text: &str, anchor: &GeoAnchor) -> ParsedQuery {
    QueryProcessor::new(Arc::new(Vocabulary::default())).process(text, anchor)
}

fn ids(formatted: &FormattedResults) -> Vec<i64> {
    formatted.results.iter().map(|r| r.id).collect()
}

fn park_rows() -> Vec<ServiceRow> {
    vec![
        // ~7 miles south
        service_row(1, "Central Bark", "dog_park", "Indianapolis", "IN", "46220", Some((39.86, -86.01))),
        // ~1 mile
        service_row(2, "Fishers Dog Park", "dog_park", "Fishers", "IN", "46038", Some((39.97, -86.00))),
        // ~3 miles
        service_row(3, "Paw Commons", "dog_park", "Noblesville", "IN", "46060", Some((39.99, -85.98))),
        // no coordinates yet
        service_row(4, "Ungeocoded Park", "dog_park", "Carmel", "IN", "46032", None),
    ]
}

#[test]
fn ranks_by_distance_with_exact_city_matches_first() {
    let parsed = parse("dog park near me", &device_anchor());
    let formatted = format_search_results(park_rows(), 4, &parsed, FormatOptions::default());

    assert_eq!(ids(&formatted), vec![2, 3, 1, 4]);
    assert!(formatted.results[0].is_exact_match);
    assert!(!formatted.results[1].is_exact_match);

    let distances: Vec<f64> = formatted.results[1..3]
        .iter()
        .map(|r| r.distance.expect("distance"))
        .collect();
    assert!(distances[0] <= distances[1]);
    assert!(formatted.results[3].distance.is_none());
}

#[test]
fn radius_refinement_drops_far_rows_and_adjusts_total() {
    let parsed = parse("dog park near me", &device_anchor());
    let formatted = format_search_results(
        park_rows(),
        4,
        &parsed,
        FormatOptions {
            max_distance: Some(5.0),
            page: None,
        },
    );

    assert_eq!(ids(&formatted), vec![2, 3, 4]);
    assert_eq!(formatted.total_count, 3);
}

#[test]
fn exact_name_match_ranks_first() {
    let anchor = GeoAnchor::region_default(&Vocabulary::default());
    let parsed = parse("  paw   COMMONS ", &anchor);
    let formatted = format_search_results(park_rows(), 4, &parsed, FormatOptions::default());

    assert_eq!(formatted.results[0].id, 3);
    assert!(formatted.results[0].is_exact_match);
    assert!(formatted.results.iter().all(|r| r.distance.is_none()));
    assert_eq!(ids(&formatted)[1..], [1, 2, 4]);
}

#[test]
fn default_anchor_never_marks_city_matches() {
    let anchor = GeoAnchor::region_default(&Vocabulary::default());
    let parsed = parse("dog park", &anchor);
    let formatted = format_search_results(park_rows(), 4, &parsed, FormatOptions::default());
    assert!(formatted.results.iter().all(|r| !r.is_exact_match));
}

#[test]
fn pages_after_ranking() {
    let parsed = parse("dog park near me", &device_anchor());
    let formatted = format_search_results(
        park_rows(),
        4,
        &parsed,
        FormatOptions {
            max_distance: None,
            page: Some(Page::new(2, 1)),
        },
    );
    assert_eq!(ids(&formatted), vec![3, 1]);
    assert_eq!(formatted.total_count, 4);
}

#[test]
fn ordering_is_total_and_stable_across_input_order() {
    let parsed = parse("dog park near me", &device_anchor());
    let mut rows = park_rows();
    rows.push(service_row(5, "Central Bark", "dog_park", "Indianapolis", "IN", "46220", Some((39.86, -86.01))));

    let forward = format_search_results(rows.clone(), 5, &parsed, FormatOptions::default());
    rows.reverse();
    let backward = format_search_results(rows, 5, &parsed, FormatOptions::default());

    assert_eq!(ids(&forward), ids(&backward));
    assert_eq!(ids(&forward), vec![2, 3, 1, 5, 4]);
}

#[test]
fn serializes_camel_case_and_omits_missing_distance() {
    let anchor = GeoAnchor::region_default(&Vocabulary::default());
    let parsed = parse("dog park", &anchor);
    let formatted = format_search_results(park_rows(), 4, &parsed, FormatOptions::default());
    let json = serde_json::to_value(&formatted.results[0]).expect("serialize");

    assert!(json.get("distance").is_none());
    assert_eq!(json["serviceType"], "dog_park");
    assert_eq!(json["isExactMatch"], false);
    assert!(json.get("zipCode").is_some());
}

#[test]
fn exact_name_match_uses_query_normalization() {
    let anchor = GeoAnchor::region_default(&Vocabulary::default());
    let parsed = parse("  HAPPY   paws ", &anchor);
    let rows = vec![
        service_row(1, "Alpha Vet", "veterinarian", "Carmel", "IN", "46032", None),
        service_row(2, "Happy  Paws", "groomer", "Carmel", "IN", "46032", None),
    ];

    let formatted = format_search_results(rows, 2, &parsed, FormatOptions::default());

    assert_eq!(ids(&formatted), vec![2, 1]);
    assert!(formatted.results[0].is_exact_match);
}
