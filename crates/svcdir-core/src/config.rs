use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_with_default = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        if raw.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "value is empty".to_string(),
            });
        }
        Ok(raw)
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("SVCDIR_ENV", "development"))?;

    let bind_addr: SocketAddr = parse_value(
        "SVCDIR_BIND_ADDR",
        &parse_with_default("SVCDIR_BIND_ADDR", "0.0.0.0:3000")?,
    )?;
    let log_level = or_default("SVCDIR_LOG_LEVEL", "info");
    let vocabulary_path = lookup("SVCDIR_VOCABULARY_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    let db_max_connections = parse_value(
        "SVCDIR_DB_MAX_CONNECTIONS",
        &or_default("SVCDIR_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections = parse_value(
        "SVCDIR_DB_MIN_CONNECTIONS",
        &or_default("SVCDIR_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs = parse_value(
        "SVCDIR_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("SVCDIR_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let geocoder_base_url = parse_with_default(
        "SVCDIR_GEOCODER_BASE_URL",
        "https://nominatim.openstreetmap.org",
    )?;
    let geocoder_user_agent = parse_with_default(
        "SVCDIR_GEOCODER_USER_AGENT",
        "svcdir/0.1 (services-directory)",
    )?;
    let geocoder_timeout_secs = parse_value(
        "SVCDIR_GEOCODER_TIMEOUT_SECS",
        &or_default("SVCDIR_GEOCODER_TIMEOUT_SECS", "10"),
    )?;
    let geocoder_min_interval_ms = parse_value(
        "SVCDIR_GEOCODER_MIN_INTERVAL_MS",
        &or_default("SVCDIR_GEOCODER_MIN_INTERVAL_MS", "1000"),
    )?;
    let geolocation_timeout_secs = parse_value(
        "SVCDIR_GEOLOCATION_TIMEOUT_SECS",
        &or_default("SVCDIR_GEOLOCATION_TIMEOUT_SECS", "10"),
    )?;

    let retry_max_attempts: u32 = parse_value(
        "SVCDIR_RETRY_MAX_ATTEMPTS",
        &or_default("SVCDIR_RETRY_MAX_ATTEMPTS", "3"),
    )?;
    if retry_max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SVCDIR_RETRY_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let retry_delay_ms = parse_value(
        "SVCDIR_RETRY_DELAY_MS",
        &or_default("SVCDIR_RETRY_DELAY_MS", "1000"),
    )?;
    let retry_backoff_multiplier = parse_value(
        "SVCDIR_RETRY_BACKOFF_MULTIPLIER",
        &or_default("SVCDIR_RETRY_BACKOFF_MULTIPLIER", "2"),
    )?;

    let rate_limit_max_requests = parse_value(
        "SVCDIR_RATE_LIMIT_MAX_REQUESTS",
        &or_default("SVCDIR_RATE_LIMIT_MAX_REQUESTS", "10"),
    )?;
    let rate_limit_window_secs = parse_value(
        "SVCDIR_RATE_LIMIT_WINDOW_SECS",
        &or_default("SVCDIR_RATE_LIMIT_WINDOW_SECS", "60"),
    )?;
    let trust_proxy_headers = parse_value(
        "SVCDIR_TRUST_PROXY_HEADERS",
        &or_default("SVCDIR_TRUST_PROXY_HEADERS", "false"),
    )?;

    let search_max_results = parse_positive_i64(
        "SVCDIR_SEARCH_MAX_RESULTS",
        &or_default("SVCDIR_SEARCH_MAX_RESULTS", "1000"),
    )?;
    let search_fallback_limit = parse_positive_i64(
        "SVCDIR_SEARCH_FALLBACK_LIMIT",
        &or_default("SVCDIR_SEARCH_FALLBACK_LIMIT", "50"),
    )?;
    let search_page_size = parse_positive_i64(
        "SVCDIR_SEARCH_PAGE_SIZE",
        &or_default("SVCDIR_SEARCH_PAGE_SIZE", "20"),
    )?;
    let store_timeout_secs = parse_value(
        "SVCDIR_STORE_TIMEOUT_SECS",
        &or_default("SVCDIR_STORE_TIMEOUT_SECS", "10"),
    )?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        vocabulary_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        geocoder_base_url,
        geocoder_user_agent,
        geocoder_timeout_secs,
        geocoder_min_interval_ms,
        geolocation_timeout_secs,
        retry_max_attempts,
        retry_delay_ms,
        retry_backoff_multiplier,
        rate_limit_max_requests,
        rate_limit_window_secs,
        trust_proxy_headers,
        search_max_results,
        search_fallback_limit,
        search_page_size,
        store_timeout_secs,
    })
}

fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn parse_positive_i64(var: &str, raw: &str) -> Result<i64, ConfigError> {
    let value: i64 = parse_value(var, raw)?;
    if value <= 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("must be positive, got {value}"),
        });
    }
    Ok(value)
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SVCDIR_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
