//! Row types for the `services` table.

/// A service provider as read by the search pipeline.
///
/// Coordinates are nullable: rows awaiting geocoding must still be searchable.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ServiceRow {
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
}

/// One page of search rows plus the size of the full filtered set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServicePage {
    pub rows: Vec<ServiceRow>,
    pub total_count: i64,
}

/// Lightweight projection for autocomplete.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ServiceSuggestionRow {
    pub id: i64,
    pub name: String,
    pub service_type: String,
    pub city: Option<String>,
}

/// Address fields of a service that still lacks coordinates.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ServiceAddressRow {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}
