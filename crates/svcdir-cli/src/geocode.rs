use std::sync::Arc;
use std::time::Duration;

use svcdir_core::{AppConfig, Vocabulary};
use svcdir_db::ServiceAddressRow;
use svcdir_geocode::Geocoder;
use svcdir_search::{AddressParts, GeoResolver};

fn resolver(config: &AppConfig, vocabulary: Arc<Vocabulary>, geocoder: Arc<dyn Geocoder>) -> GeoResolver {
    GeoResolver::new(
        vocabulary,
        geocoder,
        Duration::from_secs(config.geolocation_timeout_secs),
    )
}

pub(crate) fn address_parts(row: &ServiceAddressRow) -> AddressParts {
    AddressParts {
        address: row.address.clone(),
        city: row.city.clone(),
        state: row.state.clone(),
        zip: row.zip_code.clone(),
    }
}

/// Geocode one address and print the result. Never fails: the cascade always
/// ends at a state centroid or the region default.
pub(crate) async fn run_geocode(
    config: &AppConfig,
    vocabulary: Arc<Vocabulary>,
    geocoder: Arc<dyn Geocoder>,
    parts: &AddressParts,
) {
    let geocoded = resolver(config, vocabulary, geocoder).geocode_address(parts).await;
    println!(
        "{:.6},{:.6} precision={} needs_review={}",
        geocoded.point.latitude, geocoded.point.longitude, geocoded.precision, geocoded.needs_review
    );
}

/// Geocode services lacking coordinates and write the results back one
/// record at a time.
///
/// When `dry_run` is `true` the resolved coordinates are printed and nothing
/// is written.
///
/// # Errors
///
/// Returns an error if listing the pending services fails. A failed write for
/// one record is logged and skipped.
pub(crate) async fn run_backfill(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    vocabulary: Arc<Vocabulary>,
    geocoder: Arc<dyn Geocoder>,
    limit: i64,
    dry_run: bool,
) -> anyhow::Result<()> {
    let pending = svcdir_db::list_services_missing_coordinates(pool, limit).await?;
    if pending.is_empty() {
        println!("no services are missing coordinates");
        return Ok(());
    }

    let resolver = resolver(config, vocabulary, geocoder);
    let mut written = 0usize;
    let mut flagged = 0usize;

    for row in &pending {
        let geocoded = resolver.geocode_address(&address_parts(row)).await;
        if geocoded.needs_review {
            flagged += 1;
        }

        if dry_run {
            println!(
                "dry-run: {} ({}) -> {:.6},{:.6} [{}]",
                row.name, row.id, geocoded.point.latitude, geocoded.point.longitude, geocoded.precision
            );
            continue;
        }

        match svcdir_db::update_service_geocode(
            pool,
            row.id,
            geocoded.point.latitude,
            geocoded.point.longitude,
            geocoded.needs_review,
        )
        .await
        {
            Ok(()) => written += 1,
            Err(e) => {
                tracing::warn!(service_id = row.id, error = %e, "skipping service; geocode write failed");
            }
        }
    }

    if dry_run {
        println!("dry-run: {} services resolved, {flagged} would need review", pending.len());
    } else {
        println!("updated {written} of {} services, {flagged} flagged for review", pending.len());
    }
    Ok(())
}
