mod api;
mod middleware;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use svcdir_geocode::{GeocodeClient, GeocodeClientConfig};
use svcdir_search::{InMemoryRateLimiter, PgServiceStore, PipelineSettings, SearchPipeline};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};
use crate::middleware::RateLimitState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = svcdir_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let vocabulary = match &config.vocabulary_path {
        Some(path) => svcdir_core::load_vocabulary(path)
            .with_context(|| format!("loading vocabulary from {}", path.display()))?,
        None => svcdir_core::Vocabulary::default(),
    };

    let pool_config = svcdir_db::PoolConfig::from_app_config(&config);
    let pool = svcdir_db::connect_pool(&config.database_url, pool_config).await?;
    svcdir_db::run_migrations(&pool).await?;

    let geocoder = GeocodeClient::new(&GeocodeClientConfig::from_app_config(&config))?;
    let pipeline = SearchPipeline::new(
        Arc::new(vocabulary),
        Arc::new(geocoder),
        Arc::new(PgServiceStore::new(pool)),
        PipelineSettings::from_app_config(&config),
    );
    let rate_limit = RateLimitState::new(
        Arc::new(InMemoryRateLimiter::from_app_config(&config)),
        config.trust_proxy_headers,
    );

    let app = build_app(
        AppState {
            pipeline: Arc::new(pipeline),
        },
        rate_limit,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "svcdir-server listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
