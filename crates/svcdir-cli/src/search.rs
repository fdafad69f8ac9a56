use std::sync::Arc;

use svcdir_core::{AppConfig, Vocabulary};
use svcdir_geocode::Geocoder;
use svcdir_search::{PgServiceStore, PipelineSettings, SearchPipeline, SearchRequest, UserLocation};

/// Assemble a request from command-line flags. Coordinates win over a zip.
pub(crate) fn build_request(
    query: String,
    lat: Option<f64>,
    lng: Option<f64>,
    zip: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> SearchRequest {
    let user_location = if lat.is_some() || lng.is_some() || zip.is_some() {
        Some(UserLocation {
            lat,
            lng,
            zip,
            ..UserLocation::default()
        })
    } else {
        None
    };

    SearchRequest {
        query: Some(query),
        user_location,
        limit,
        offset,
    }
}

/// Run one search against the database and print the response as JSON.
///
/// # Errors
///
/// Returns an error if the request is invalid, both the structured and the
/// fallback searches fail, or the response cannot be serialized.
pub(crate) async fn run_search(
    config: &AppConfig,
    pool: sqlx::PgPool,
    vocabulary: Arc<Vocabulary>,
    geocoder: Arc<dyn Geocoder>,
    request: &SearchRequest,
) -> anyhow::Result<()> {
    let pipeline = SearchPipeline::new(
        vocabulary,
        geocoder,
        Arc::new(PgServiceStore::new(pool)),
        PipelineSettings::from_app_config(config),
    );

    let outcome = pipeline.search(request).await?;
    tracing::info!(path = %outcome.path, results = outcome.response.results.len(), "search complete");
    println!("{}", serde_json::to_string_pretty(&outcome.response)?);
    Ok(())
}
