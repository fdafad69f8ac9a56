//! Offline tests for svcdir-db configuration and row types.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use svcdir_core::{AppConfig, Environment};
use svcdir_db::{PoolConfig, ServicePage, ServiceRow};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        vocabulary_path: None,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        geocoder_base_url: "http://localhost:8080".to_string(),
        geocoder_user_agent: "ua".to_string(),
        geocoder_timeout_secs: 10,
        geocoder_min_interval_ms: 1000,
        geolocation_timeout_secs: 10,
        retry_max_attempts: 3,
        retry_delay_ms: 1000,
        retry_backoff_multiplier: 2,
        rate_limit_max_requests: 10,
        rate_limit_window_secs: 60,
        trust_proxy_headers: false,
        search_max_results: 1000,
        search_fallback_limit: 50,
        search_page_size: 20,
        store_timeout_secs: 10,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: nullable coordinates are representable.
#[test]
fn service_row_allows_missing_coordinates() {
    let row = ServiceRow {
        id: 1,
        name: "Paws & Claws Grooming".to_string(),
        service_type: "groomer".to_string(),
        description: None,
        address: Some("12 Main St".to_string()),
        city: Some("Fishers".to_string()),
        state: Some("IN".to_string()),
        zip_code: Some("46037".to_string()),
        latitude: None,
        longitude: None,
        is_verified: false,
    };

    let page = ServicePage {
        rows: vec![row],
        total_count: 1,
    };
    assert_eq!(page.total_count, 1);
    assert!(page.rows[0].latitude.is_none());
}
