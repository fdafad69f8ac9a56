//! Store-agnostic description of a structured service search.
//!
//! A [`SearchSpec`] only ever filters on indexed columns (`service_type`,
//! `state`, `zip_code`, the lat/lng box) plus the `is_verified` flag as a
//! secondary predicate. A spec with none of the indexed filters is only legal
//! in [`SpecMode::Unfiltered`], the explicit fallback mode.

use serde::Serialize;

use crate::geo::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// `name ASC, id ASC`, applied by the store.
    Name,
    /// Store order is irrelevant; the formatter sorts by distance after fetch.
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecMode {
    Filtered,
    Unfiltered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    #[must_use]
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.max(1),
            offset: offset.max(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchSpec {
    /// `service_type IN (...)`; empty means no service filter.
    pub service_types: Vec<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub bounds: Option<BoundingBox>,
    pub verified_only: bool,
    pub order: SortOrder,
    pub mode: SpecMode,
    /// `None` fetches the whole filtered set, bounded by the caller's cap.
    pub page: Option<Page>,
}

impl SearchSpec {
    /// The unfiltered "top N by name" spec used by every fallback path.
    #[must_use]
    pub fn unfiltered(limit: i64) -> Self {
        Self {
            service_types: Vec::new(),
            state: None,
            zip_code: None,
            bounds: None,
            verified_only: false,
            order: SortOrder::Name,
            mode: SpecMode::Unfiltered,
            page: Some(Page::new(limit, 0)),
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    /// True when at least one indexed predicate is present.
    #[must_use]
    pub fn has_indexed_filter(&self) -> bool {
        !self.service_types.is_empty()
            || self.state.is_some()
            || self.zip_code.is_some()
            || self.bounds.is_some()
    }

    /// Checks the structural invariants before the spec reaches a store.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the spec would require a full scan
    /// outside fallback mode, carries an invalid bounding box or a
    /// non-positive page size.
    pub fn validate(&self) -> Result<(), String> {
        if self.mode == SpecMode::Filtered && !self.has_indexed_filter() {
            return Err("filtered spec has no indexed predicate".to_string());
        }
        if let Some(bounds) = &self.bounds {
            if !bounds.is_valid() {
                return Err(format!("invalid bounding box: {bounds:?}"));
            }
        }
        if let Some(page) = &self.page {
            if page.limit <= 0 || page.offset < 0 {
                return Err(format!(
                    "invalid page: limit={}, offset={}",
                    page.limit, page.offset
                ));
            }
        }
        if self.service_types.iter().any(|s| s.trim().is_empty()) {
            return Err("empty service_type filter value".to_string());
        }
        Ok(())
    }
}
