//! Database operations for the `services` table.

mod read;
mod types;
mod write;

pub use read::{count_services, list_services_by_name, search_services, suggest_services};
pub use types::{ServiceAddressRow, ServicePage, ServiceRow, ServiceSuggestionRow};
pub use write::{list_services_missing_coordinates, update_service_geocode};
