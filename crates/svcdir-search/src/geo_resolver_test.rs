use super::*;
use crate::testing::StubGeocoder;

fn resolver(geocoder: StubGeocoder) -> GeoResolver {
    GeoResolver::new(
        Arc::new(Vocabulary::default()),
        Arc::new(geocoder),
        Duration::from_secs(2),
    )
}

fn parts(address: &str, city: &str, state: &str, zip: &str) -> AddressParts {
    let some = |v: &str| (!v.is_empty()).then(|| v.to_string());
    AddressParts {
        address: some(address),
        city: some(city),
        state: some(state),
        zip: some(zip),
    }
}

#[test]
fn zip_format_check() {
    assert!(is_valid_zip("46037"));
    assert!(!is_valid_zip("4603"));
    assert!(!is_valid_zip("46037-1234"));
    assert!(!is_valid_zip("abcde"));
}

#[test]
fn query_state_by_full_name_any_case() {
    let r = resolver(StubGeocoder::new());
    let anchor = r.resolve_from_query("dog groomers in ohio").expect("ohio detected");
    assert_eq!(anchor.state.as_deref(), Some("OH"));
    assert_eq!(anchor.source, LocationSource::Query);
    assert!(!anchor.is_near_me);

    let anchor = r.resolve_from_query("OHIO vets").expect("ohio detected");
    assert_eq!(anchor.state.as_deref(), Some("OH"));
}

#[test]
fn query_abbreviation_requires_capitals() {
    let r = resolver(StubGeocoder::new());
    assert!(r.resolve_from_query("groomers in fishers").is_none());
    let anchor = r.resolve_from_query("groomers IN fishers").expect("IN detected");
    assert_eq!(anchor.state.as_deref(), Some("IN"));
}

#[test]
fn first_state_in_text_wins() {
    let r = resolver(StubGeocoder::new());
    let anchor = r
        .resolve_from_query("kentucky or illinois boarding")
        .expect("state detected");
    assert_eq!(anchor.state.as_deref(), Some("KY"));
}

#[tokio::test]
async fn device_location_reverse_geocodes() {
    let r = resolver(StubGeocoder::new().with_reverse("Fishers", "Indiana", "46037"));
    let resolution = r.resolve_from_device(Coordinates::new(39.9, -86.0)).await;

    assert!(resolution.error.is_none());
    assert!(!resolution.needs_review);
    let anchor = resolution.anchor;
    assert_eq!(anchor.source, LocationSource::Geolocation);
    assert!(anchor.is_near_me);
    assert_eq!(anchor.city.as_deref(), Some("Fishers"));
    assert_eq!(anchor.state.as_deref(), Some("IN"));
    assert_eq!(anchor.zip.as_deref(), Some("46037"));
    assert_eq!(anchor.lat, Some(39.9));
    assert!((anchor.radius_miles - 10.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn device_location_geocoder_outage_uses_default() {
    let r = resolver(StubGeocoder::failing());
    let resolution = r.resolve_from_device(Coordinates::new(39.9, -86.0)).await;

    assert!(resolution.needs_review);
    assert_eq!(resolution.anchor.source, LocationSource::Default);
    assert_eq!(
        resolution.error.map(|e| e.kind),
        Some(LocationErrorKind::GeocodingFailure)
    );
}

#[tokio::test(start_paused = true)]
async fn device_location_times_out() {
    let r = resolver(
        StubGeocoder::new()
            .with_reverse("Fishers", "Indiana", "46037")
            .with_reverse_delay(Duration::from_secs(30)),
    );
    let resolution = r.resolve_from_device(Coordinates::new(39.9, -86.0)).await;

    assert_eq!(resolution.anchor.source, LocationSource::Default);
    assert_eq!(resolution.error.map(|e| e.kind), Some(LocationErrorKind::Timeout));
}

#[tokio::test]
async fn invalid_device_point_is_position_unavailable() {
    let geocoder = Arc::new(StubGeocoder::new());
    let r = GeoResolver::new(
        Arc::new(Vocabulary::default()),
        geocoder.clone(),
        Duration::from_secs(2),
    );
    let resolution = r.resolve_from_device(Coordinates::new(123.0, -86.0)).await;

    assert_eq!(
        resolution.error.map(|e| e.kind),
        Some(LocationErrorKind::PositionUnavailable)
    );
    assert_eq!(geocoder.reverse_calls(), 0);
}

#[tokio::test]
async fn zip_resolution_success() {
    let r = resolver(StubGeocoder::new().with_forward("46037", Coordinates::new(39.95, -85.96)));
    let resolution = r.resolve_from_zip(" 46037 ").await;

    assert!(resolution.error.is_none());
    let anchor = resolution.anchor;
    assert_eq!(anchor.source, LocationSource::Zip);
    assert_eq!(anchor.zip.as_deref(), Some("46037"));
    assert!((anchor.radius_miles - 5.0).abs() < f64::EPSILON);
    assert!((anchor.confidence - CONFIDENCE_ZIP).abs() < f64::EPSILON);
}

#[tokio::test]
async fn zip_resolution_rejects_bad_format_without_calling_geocoder() {
    let geocoder = Arc::new(StubGeocoder::new());
    let r = GeoResolver::new(
        Arc::new(Vocabulary::default()),
        geocoder.clone(),
        Duration::from_secs(2),
    );
    let resolution = r.resolve_from_zip("4603x").await;

    assert!(resolution.needs_review);
    assert_eq!(resolution.anchor.source, LocationSource::Default);
    assert!(geocoder.forward_queries().is_empty());
}

#[tokio::test]
async fn zip_resolution_outage_falls_back() {
    let r = resolver(StubGeocoder::failing());
    let resolution = r.resolve_from_zip("46037").await;

    assert!(resolution.needs_review);
    assert_eq!(resolution.anchor.source, LocationSource::Default);
    assert_eq!(resolution.anchor.city.as_deref(), Some("Indianapolis"));
    assert_eq!(
        resolution.error.map(|e| e.kind),
        Some(LocationErrorKind::GeocodingFailure)
    );
}

#[tokio::test]
async fn user_location_with_city_and_state_skips_reverse_lookup() {
    let geocoder = Arc::new(StubGeocoder::new());
    let r = GeoResolver::new(
        Arc::new(Vocabulary::default()),
        geocoder.clone(),
        Duration::from_secs(2),
    );
    let user = UserLocation {
        lat: Some(39.9),
        lng: Some(-86.0),
        city: Some("Fishers".to_string()),
        state: Some("IN".to_string()),
        ..UserLocation::default()
    };
    let resolution = r.resolve_user_location(Some(&user)).await;

    assert_eq!(resolution.anchor.source, LocationSource::Geolocation);
    assert_eq!(resolution.anchor.city.as_deref(), Some("Fishers"));
    assert_eq!(geocoder.reverse_calls(), 0);
}

#[tokio::test]
async fn user_reported_error_is_not_flagged_for_review() {
    let r = resolver(StubGeocoder::new());
    let user = UserLocation {
        error: Some(LocationErrorKind::PermissionDenied),
        ..UserLocation::default()
    };
    let resolution = r.resolve_user_location(Some(&user)).await;

    assert!(!resolution.needs_review);
    assert_eq!(resolution.anchor.source, LocationSource::Default);
    assert_eq!(
        resolution.error.map(|e| e.kind),
        Some(LocationErrorKind::PermissionDenied)
    );
}

#[tokio::test]
async fn no_user_location_is_default_without_error() {
    let r = resolver(StubGeocoder::new());
    let resolution = r.resolve_user_location(None).await;
    assert_eq!(resolution, LocationResolution::resolved(r.default_anchor()));
}

#[test]
fn address_variants_skip_missing_parts() {
    let full = parts("1 Main St", "Fishers", "IN", "46037");
    let kinds: Vec<AddressVariant> = full.variants().into_iter().map(|(v, _)| v).collect();
    assert_eq!(
        kinds,
        vec![
            AddressVariant::Full,
            AddressVariant::CityStateZip,
            AddressVariant::StreetCityState,
            AddressVariant::CityState,
        ]
    );

    let no_street = parts("", "Fishers", "IN", "46037");
    let kinds: Vec<AddressVariant> = no_street.variants().into_iter().map(|(v, _)| v).collect();
    assert_eq!(kinds, vec![AddressVariant::CityStateZip, AddressVariant::CityState]);
}

#[tokio::test]
async fn geocode_address_exact_match_needs_no_review() {
    let r = resolver(
        StubGeocoder::new().with_forward("1 Main St, Fishers, IN 46037", Coordinates::new(39.95, -86.01)),
    );
    let result = r.geocode_address(&parts("1 Main St", "Fishers", "IN", "46037")).await;

    assert!(!result.needs_review);
    assert_eq!(result.precision, GeocodePrecision::Address(AddressVariant::Full));
}

#[tokio::test]
async fn geocode_address_degrades_through_variants() {
    let r = resolver(StubGeocoder::new().with_forward("Fishers, IN", Coordinates::new(39.95, -86.01)));
    let result = r.geocode_address(&parts("1 Main St", "Fishers", "IN", "46037")).await;

    assert!(result.needs_review);
    assert_eq!(result.precision, GeocodePrecision::Address(AddressVariant::CityState));
    assert_eq!(result.point, Coordinates::new(39.95, -86.01));
}

#[tokio::test]
async fn geocode_address_falls_back_to_state_centroid_then_region() {
    let r = resolver(StubGeocoder::failing());

    let ohio = r.geocode_address(&parts("1 High St", "Columbus", "Ohio", "")).await;
    assert!(ohio.needs_review);
    assert_eq!(ohio.precision, GeocodePrecision::StateCentroid);
    assert_eq!(ohio.point, Coordinates::new(40.286_2, -82.793_7));

    let unknown = r.geocode_address(&parts("", "", "", "")).await;
    assert_eq!(unknown.precision, GeocodePrecision::RegionDefault);
    assert_eq!(unknown.point, Coordinates::new(39.768_4, -86.158_1));
}

mod http {
    use super::*;
    use svcdir_core::RetryPolicy;
    use svcdir_geocode::{GeocodeClient, GeocodeClientConfig};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn http_resolver(base_url: &str) -> GeoResolver {
        let client = GeocodeClient::new(&GeocodeClientConfig {
            base_url: base_url.to_owned(),
            user_agent: "svcdir-test/0.1".to_owned(),
            timeout_secs: 5,
            min_interval: Duration::ZERO,
            retry: RetryPolicy::immediate(2),
        })
        .expect("client construction should not fail");
        GeoResolver::new(
            Arc::new(Vocabulary::default()),
            Arc::new(client),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn zip_lookup_against_failing_service_uses_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let resolution = http_resolver(&server.uri()).resolve_from_zip("46037").await;

        assert!(resolution.needs_review);
        assert_eq!(resolution.anchor.source, LocationSource::Default);
        assert_eq!(resolution.anchor.zip.as_deref(), Some("46204"));
        assert_eq!(
            resolution.error.map(|e| e.kind),
            Some(LocationErrorKind::GeocodingFailure)
        );
    }

    #[tokio::test]
    async fn device_lookup_maps_state_name_to_abbreviation() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "lat": "39.9",
            "lon": "-86.0",
            "address": { "town": "Fishers", "state": "Indiana", "postcode": "46037" }
        });
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("lat", "39.9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let resolution = http_resolver(&server.uri())
            .resolve_from_device(Coordinates::new(39.9, -86.0))
            .await;

        assert!(resolution.error.is_none());
        assert_eq!(resolution.anchor.city.as_deref(), Some("Fishers"));
        assert_eq!(resolution.anchor.state.as_deref(), Some("IN"));
        assert_eq!(resolution.anchor.zip.as_deref(), Some("46037"));
    }
}
