use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Optional YAML file replacing the built-in vocabulary tables.
    pub vocabulary_path: Option<PathBuf>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub geocoder_base_url: String,
    pub geocoder_user_agent: String,
    pub geocoder_timeout_secs: u64,
    /// Minimum spacing between two geocoder requests (usage-policy pacing).
    pub geocoder_min_interval_ms: u64,
    pub geolocation_timeout_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_delay_ms: u64,
    pub retry_backoff_multiplier: u32,
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_secs: u64,
    /// Key rate limits on `x-forwarded-for` / `x-real-ip`. Only safe behind a
    /// proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
    /// Hard cap on rows fetched by an unpaginated search.
    pub search_max_results: i64,
    pub search_fallback_limit: i64,
    pub search_page_size: i64,
    pub store_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("vocabulary_path", &self.vocabulary_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("geocoder_base_url", &self.geocoder_base_url)
            .field("geocoder_user_agent", &self.geocoder_user_agent)
            .field("geocoder_timeout_secs", &self.geocoder_timeout_secs)
            .field("geocoder_min_interval_ms", &self.geocoder_min_interval_ms)
            .field("geolocation_timeout_secs", &self.geolocation_timeout_secs)
            .field("retry_max_attempts", &self.retry_max_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("retry_backoff_multiplier", &self.retry_backoff_multiplier)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .field("search_max_results", &self.search_max_results)
            .field("search_fallback_limit", &self.search_fallback_limit)
            .field("search_page_size", &self.search_page_size)
            .field("store_timeout_secs", &self.store_timeout_secs)
            .finish()
    }
}
