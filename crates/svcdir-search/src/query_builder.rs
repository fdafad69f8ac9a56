//! Translation of a [`ParsedQuery`] into a store-agnostic [`SearchSpec`].

use svcdir_core::{BoundingBox, Page, SearchSpec, SortOrder, SpecMode};

use crate::error::SearchError;
use crate::query_processor::{ParsedQuery, SearchType};

fn service_types(parsed: &ParsedQuery) -> Vec<String> {
    let mut types = parsed.entities.services.clone();
    if parsed.search_type == SearchType::Product {
        for product in &parsed.entities.products {
            for service_type in &product.service_types {
                if !types.contains(service_type) {
                    types.push(service_type.clone());
                }
            }
        }
    }
    types
}

/// Build the structured spec for `parsed`.
///
/// A radius box is added only when the anchor has a point to rank from and the
/// text named no state or zip. Distance-ranked specs leave ordering to the
/// formatter; everything else is ordered by name in the store. A query with no
/// indexed predicate at all becomes an explicit unfiltered spec.
///
/// # Errors
///
/// Returns [`SearchError::QueryProcessing`] if the resulting spec is invalid.
pub fn build_search_query(parsed: &ParsedQuery) -> Result<SearchSpec, SearchError> {
    let state = parsed.first_state().map(str::to_string);
    let zip_code = parsed.first_zip().map(str::to_string);
    let anchor = &parsed.location;
    let ranking_point = anchor.ranking_point();

    let bounds = match ranking_point {
        Some(point) if state.is_none() && zip_code.is_none() && anchor.radius_miles > 0.0 => {
            Some(BoundingBox::around(point, anchor.radius_miles))
        }
        _ => None,
    };

    let mut spec = SearchSpec {
        service_types: service_types(parsed),
        state,
        zip_code,
        bounds,
        verified_only: parsed.filters.verified_only,
        order: if ranking_point.is_some() {
            SortOrder::Deferred
        } else {
            SortOrder::Name
        },
        mode: SpecMode::Filtered,
        page: None,
    };
    if !spec.has_indexed_filter() {
        spec.mode = SpecMode::Unfiltered;
    }

    spec.validate().map_err(SearchError::QueryProcessing)?;
    Ok(spec)
}

/// Like [`build_search_query`], deciding where `page` is applied.
///
/// The store pages only name-ordered specs with no query text: any text can
/// equal a provider name, and exact matches must lead the first page. Every
/// other spec fetches the whole filtered set and the returned page is applied
/// after ranking.
///
/// # Errors
///
/// Returns [`SearchError::QueryProcessing`] if the resulting spec is invalid.
pub fn build_paginated_search_query(
    parsed: &ParsedQuery,
    page: Page,
) -> Result<(SearchSpec, Option<Page>), SearchError> {
    let spec = build_search_query(parsed)?;
    match spec.order {
        SortOrder::Name if parsed.normalized_query.is_empty() => Ok((spec.with_page(page), None)),
        SortOrder::Name | SortOrder::Deferred => Ok((spec, Some(page))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use svcdir_core::Vocabulary;

    use super::*;
    use crate::location::{GeoAnchor, LocationSource};
    use crate::query_processor::QueryProcessor;

    fn parse(text: &str, anchor: &GeoAnchor) -> ParsedQuery {
        QueryProcessor::new(Arc::new(Vocabulary::default())).process(text, anchor)
    }

    fn default_anchor() -> GeoAnchor {
        GeoAnchor::region_default(&Vocabulary::default())
    }

    fn device_anchor() -> GeoAnchor {
        GeoAnchor {
            lat: Some(39.9),
            lng: Some(-86.0),
            city: Some("Fishers".to_string()),
            state: Some("IN".to_string()),
            zip: None,
            radius_miles: 10.0,
            source: LocationSource::Geolocation,
            is_near_me: true,
            confidence: 0.95,
        }
    }

    #[test]
    fn state_search_filters_by_state_and_type() {
        let spec = build_search_query(&parse("dog groomers in Ohio", &default_anchor())).expect("spec");
        assert_eq!(spec.service_types, vec!["groomer".to_string()]);
        assert_eq!(spec.state.as_deref(), Some("OH"));
        assert!(spec.bounds.is_none());
        assert_eq!(spec.order, SortOrder::Name);
        assert_eq!(spec.mode, SpecMode::Filtered);
    }

    #[test]
    fn near_me_search_uses_radius_box() {
        let spec = build_search_query(&parse("dog park near me", &device_anchor())).expect("spec");
        let bounds = spec.bounds.expect("bounds");
        assert!(bounds.min_lat < 39.9 && bounds.max_lat > 39.9);
        assert!(bounds.min_lng < -86.0 && bounds.max_lng > -86.0);
        assert!(spec.state.is_none());
        assert_eq!(spec.order, SortOrder::Deferred);
    }

    #[test]
    fn default_anchor_never_adds_a_box() {
        let spec = build_search_query(&parse("vet near me", &default_anchor())).expect("spec");
        assert!(spec.bounds.is_none());
        assert_eq!(spec.order, SortOrder::Name);
    }

    #[test]
    fn zip_entity_replaces_box_but_keeps_distance_order() {
        let spec = build_search_query(&parse("groomer 46037", &device_anchor())).expect("spec");
        assert_eq!(spec.zip_code.as_deref(), Some("46037"));
        assert!(spec.bounds.is_none());
        assert_eq!(spec.order, SortOrder::Deferred);
    }

    #[test]
    fn verified_is_secondary_predicate() {
        let spec = build_search_query(&parse("verified vet in Indiana", &default_anchor())).expect("spec");
        assert!(spec.verified_only);
        assert_eq!(spec.state.as_deref(), Some("IN"));
    }

    #[test]
    fn product_search_maps_to_service_types() {
        let spec = build_search_query(&parse("supplements", &default_anchor())).expect("spec");
        assert_eq!(
            spec.service_types,
            vec!["pet_store".to_string(), "veterinarian".to_string()]
        );
        assert_eq!(spec.mode, SpecMode::Filtered);
    }

    #[test]
    fn nothing_recognised_is_unfiltered() {
        let spec = build_search_query(&parse("@@@", &default_anchor())).expect("spec");
        assert_eq!(spec.mode, SpecMode::Unfiltered);
        assert!(!spec.has_indexed_filter());
    }

    #[test]
    fn blank_query_pushes_page_to_store() {
        let (spec, post) =
            build_paginated_search_query(&parse("   ", &default_anchor()), Page::new(20, 40)).expect("spec");
        assert_eq!(spec.order, SortOrder::Name);
        assert_eq!(spec.page, Some(Page::new(20, 40)));
        assert!(post.is_none());
    }

    #[test]
    fn query_text_pages_after_ranking_even_when_name_ordered() {
        let (spec, post) =
            build_paginated_search_query(&parse("vet in Ohio", &default_anchor()), Page::new(20, 40))
                .expect("spec");
        assert_eq!(spec.order, SortOrder::Name);
        assert!(spec.page.is_none());
        assert_eq!(post, Some(Page::new(20, 40)));
    }

    #[test]
    fn distance_order_pages_after_ranking() {
        let (spec, post) =
            build_paginated_search_query(&parse("vet near me", &device_anchor()), Page::new(20, 0))
                .expect("spec");
        assert!(spec.page.is_none());
        assert_eq!(post, Some(Page::new(20, 0)));
    }
}
