//! Turns free-form query text into a structured [`ParsedQuery`].
//!
//! Processing is synchronous and depends only on the text, the fallback
//! anchor and the vocabulary, so the same inputs always parse the same way.

use std::sync::Arc;

use serde::Serialize;
use svcdir_core::{ModifierKind, Vocabulary};

use crate::geo_resolver::{detect_states, is_valid_zip};
use crate::location::{GeoAnchor, LocationSource};
use crate::text::{consume, find_phrase, normalize_query, phrase_words, tokenize, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Service,
    Product,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEntity {
    pub term: String,
    pub service_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationEntity {
    State { name: String, abbreviation: String },
    Zip { code: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryEntities {
    /// Canonical service types, in the order they appear in the text.
    pub services: Vec<String>,
    pub products: Vec<ProductEntity>,
    pub locations: Vec<LocationEntity>,
    pub modifiers: Vec<ModifierKind>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilters {
    pub near_me: bool,
    pub verified_only: bool,
    /// Recorded for display; providers carry no opening hours to filter on.
    pub open_now: bool,
    pub emergency: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    pub original_query: String,
    pub normalized_query: String,
    pub search_type: SearchType,
    pub entities: QueryEntities,
    pub location: GeoAnchor,
    pub filters: QueryFilters,
    pub intent: String,
    pub confidence: f64,
}

impl ParsedQuery {
    /// A parse with no entities, used when the structured path is abandoned.
    #[must_use]
    pub fn best_effort(text: &str, anchor: GeoAnchor) -> Self {
        Self {
            original_query: text.to_string(),
            normalized_query: normalize_query(text),
            search_type: SearchType::Service,
            entities: QueryEntities::default(),
            location: anchor,
            filters: QueryFilters::default(),
            intent: "fallback search".to_string(),
            confidence: 0.0,
        }
    }

    #[must_use]
    pub fn first_state(&self) -> Option<&str> {
        self.entities.locations.iter().find_map(|l| match l {
            LocationEntity::State { abbreviation, .. } => Some(abbreviation.as_str()),
            LocationEntity::Zip { .. } => None,
        })
    }

    #[must_use]
    pub fn first_zip(&self) -> Option<&str> {
        self.entities.locations.iter().find_map(|l| match l {
            LocationEntity::Zip { code } => Some(code.as_str()),
            LocationEntity::State { .. } => None,
        })
    }
}

/// Longest phrases first so "dog walker" claims its tokens before "walker".
fn by_length_desc<T>(mut phrases: Vec<(Vec<String>, T)>) -> Vec<(Vec<String>, T)> {
    phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    phrases
}

pub struct QueryProcessor {
    vocabulary: Arc<Vocabulary>,
}

impl QueryProcessor {
    #[must_use]
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }

    /// Parse `text`, using `fallback` when the text names no location.
    #[must_use]
    pub fn process(&self, text: &str, fallback: &GeoAnchor) -> ParsedQuery {
        let tokens = tokenize(text);
        let mut consumed = vec![false; tokens.len()];

        let modifiers = self.extract_modifiers(&tokens, &mut consumed);
        let locations = self.extract_locations(&tokens, &mut consumed);
        let services = self.extract_services(&tokens, &mut consumed);
        let products = self.extract_products(&tokens, &mut consumed);

        let filters = QueryFilters {
            near_me: modifiers.contains(&ModifierKind::NearMe),
            verified_only: modifiers.contains(&ModifierKind::Verified),
            open_now: modifiers.contains(&ModifierKind::OpenNow),
            emergency: modifiers.contains(&ModifierKind::Emergency),
        };
        let search_type = if services.is_empty() && !products.is_empty() {
            SearchType::Product
        } else {
            SearchType::Service
        };

        let entities = QueryEntities {
            services,
            products,
            locations,
            modifiers,
        };
        let location = self.anchor_for(&entities, fallback, filters.near_me);
        let intent = describe_intent(&entities, &location, search_type);
        let confidence = location.confidence;

        ParsedQuery {
            original_query: text.to_string(),
            normalized_query: normalize_query(text),
            search_type,
            entities,
            location,
            filters,
            intent,
            confidence,
        }
    }

    fn anchor_for(&self, entities: &QueryEntities, fallback: &GeoAnchor, near_me: bool) -> GeoAnchor {
        let named_state = entities.locations.iter().find_map(|l| match l {
            LocationEntity::State { abbreviation, .. } => self.vocabulary.state_by_abbreviation(abbreviation),
            LocationEntity::Zip { .. } => None,
        });
        if let Some(entry) = named_state {
            return GeoAnchor::for_state(entry, &self.vocabulary.radii);
        }

        let mut anchor = fallback.clone();
        if anchor.source == LocationSource::Default {
            anchor.is_near_me = false;
        } else if near_me && anchor.ranking_point().is_some() {
            anchor.is_near_me = true;
            anchor.radius_miles = anchor.radius_miles.min(self.vocabulary.radii.near_me_miles);
        }
        anchor
    }

    fn extract_modifiers(&self, tokens: &[Token], consumed: &mut [bool]) -> Vec<ModifierKind> {
        let phrases = by_length_desc(
            self.vocabulary
                .modifiers
                .iter()
                .flat_map(|m| m.phrases.iter().map(move |p| (phrase_words(p), m.kind)))
                .collect(),
        );
        let mut hits = Vec::new();
        for (words, kind) in phrases {
            if let Some(start) = find_phrase(tokens, &words, consumed, false) {
                consume(consumed, start, words.len());
                hits.push((start, kind));
            }
        }
        ordered_unique(hits)
    }

    fn extract_locations(&self, tokens: &[Token], consumed: &mut [bool]) -> Vec<LocationEntity> {
        let mut hits = Vec::new();
        for (start, len, entry) in detect_states(&self.vocabulary, tokens, consumed) {
            consume(consumed, start, len);
            hits.push((
                start,
                LocationEntity::State {
                    name: entry.name.clone(),
                    abbreviation: entry.abbreviation.clone(),
                },
            ));
        }
        for (idx, token) in tokens.iter().enumerate() {
            if !consumed[idx] && is_valid_zip(&token.raw) {
                consumed[idx] = true;
                hits.push((
                    idx,
                    LocationEntity::Zip {
                        code: token.raw.clone(),
                    },
                ));
            }
        }
        ordered_unique(hits)
    }

    fn extract_services(&self, tokens: &[Token], consumed: &mut [bool]) -> Vec<String> {
        let phrases = by_length_desc(
            self.vocabulary
                .services
                .iter()
                .flat_map(|group| {
                    std::iter::once(group.canonical.replace('_', " "))
                        .chain(group.synonyms.iter().cloned())
                        .map(move |p| (phrase_words(&p), group.canonical.clone()))
                })
                .collect(),
        );
        let mut hits = Vec::new();
        for (words, canonical) in phrases {
            if let Some(start) = find_phrase(tokens, &words, consumed, true) {
                consume(consumed, start, words.len());
                hits.push((start, canonical));
            }
        }
        ordered_unique(hits)
    }

    fn extract_products(&self, tokens: &[Token], consumed: &mut [bool]) -> Vec<ProductEntity> {
        let phrases = by_length_desc(
            self.vocabulary
                .products
                .iter()
                .flat_map(|product| {
                    std::iter::once(product.term.clone())
                        .chain(product.synonyms.iter().cloned())
                        .map(move |p| (phrase_words(&p), product))
                })
                .collect(),
        );
        let mut hits = Vec::new();
        for (words, product) in phrases {
            if let Some(start) = find_phrase(tokens, &words, consumed, true) {
                consume(consumed, start, words.len());
                hits.push((
                    start,
                    ProductEntity {
                        term: product.term.clone(),
                        service_types: product.service_types.clone(),
                    },
                ));
            }
        }
        ordered_unique(hits)
    }
}

/// Sort by text position and drop repeats, keeping the first occurrence.
fn ordered_unique<T: PartialEq>(mut hits: Vec<(usize, T)>) -> Vec<T> {
    hits.sort_by_key(|(start, _)| *start);
    let mut out: Vec<T> = Vec::with_capacity(hits.len());
    for (_, value) in hits {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn describe_intent(entities: &QueryEntities, anchor: &GeoAnchor, search_type: SearchType) -> String {
    let mut intent = match search_type {
        SearchType::Product => {
            let terms: Vec<&str> = entities.products.iter().map(|p| p.term.as_str()).collect();
            format!("find stores carrying {}", terms.join(", "))
        }
        SearchType::Service if entities.services.is_empty() => "browse services".to_string(),
        SearchType::Service => {
            let names: Vec<String> = entities.services.iter().map(|s| s.replace('_', " ")).collect();
            format!("find {}", names.join(", "))
        }
    };

    match anchor.source {
        LocationSource::Query => {
            if let Some(state) = &anchor.state {
                intent.push_str(&format!(" in {state}"));
            }
        }
        // "near" is reserved for anchors flagged near-me.
        LocationSource::Geolocation | LocationSource::Zip if anchor.is_near_me => intent.push_str(" near you"),
        LocationSource::Geolocation => {
            if let Some(city) = &anchor.city {
                intent.push_str(&format!(" around {city}"));
            }
        }
        LocationSource::Zip => {
            if let Some(zip) = &anchor.zip {
                intent.push_str(&format!(" around {zip}"));
            }
        }
        LocationSource::Default => {}
    }

    let zip = entities.locations.iter().find_map(|l| match l {
        LocationEntity::Zip { code } => Some(code),
        LocationEntity::State { .. } => None,
    });
    if let Some(zip) = zip {
        intent.push_str(&format!(" in zip {zip}"));
    }

    let extras: Vec<&str> = entities
        .modifiers
        .iter()
        .filter_map(|m| match m {
            ModifierKind::Verified => Some("verified"),
            ModifierKind::OpenNow => Some("open now"),
            ModifierKind::Emergency => Some("emergency"),
            ModifierKind::NearMe => None,
        })
        .collect();
    if !extras.is_empty() {
        intent.push_str(&format!(" ({})", extras.join(", ")));
    }
    intent
}

#[cfg(test)]
#[path = "query_processor_test.rs"]
mod tests;
