//! Gateway behavior against unavailable, failing and live providers.

use std::time::{Duration, Instant};

use chrono::NaiveDate;

use wayfarer_core::gateway::{FALLBACK_ADVISORIES, Gateway, forecast_advisories};
use wayfarer_test_utils::{
    StubProvider, StubReply, stub_gateway_config, unreachable_gateway_config,
};

const TIMEOUT: Duration = Duration::from_millis(300);

/// One sample at 2024-06-15T09:00Z.
const FORECAST_BODY: &str = r#"{"list":[{"dt":1718442000,"main":{"temp":21.5,"humidity":70},"weather":[{"description":"light rain"}],"wind":{"speed":4.1}}]}"#;

/// Serves both the geocode and the nearby-search endpoint.
const PLACES_BODY: &str = r#"{"results":[{"geometry":{"location":{"lat":48.86,"lng":2.34}},"name":"Louvre Museum","rating":4.7,"price_level":2,"types":["museum"],"vicinity":"Rue de Rivoli","place_id":"louvre"}]}"#;

async fn stub(status: u16, body: &str) -> StubProvider {
    StubProvider::start(StubReply::Respond {
        status,
        body: body.to_owned(),
    })
    .await
    .expect("stub provider")
}

fn june_15() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date")
}

// ===========================================================================
// Unreachable providers
// ===========================================================================

#[tokio::test]
async fn unreachable_forecast_provider_yields_synthetic_days() {
    let gateway = Gateway::open(unreachable_gateway_config());

    let forecast = gateway.forecast("Paris, France", june_15()).await;

    assert!(forecast.fallback_used());
    let dates: Vec<&str> = forecast.records().iter().map(|r| r.date.as_str()).collect();
    assert_eq!(dates, ["2024-06-15", "2024-06-16"]);
    assert_eq!(forecast_advisories(&forecast), FALLBACK_ADVISORIES);
}

#[tokio::test]
async fn unreachable_places_provider_yields_one_synthetic_place() {
    let gateway = Gateway::open(unreachable_gateway_config());

    let places = gateway.points_of_interest("Paris, France", "restaurant").await;

    assert!(places.fallback_used());
    let records = places.into_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "City Center");
    assert_eq!(records[0].types, ["restaurant", "point_of_interest"]);
}

// ===========================================================================
// Failing providers
// ===========================================================================

#[tokio::test]
async fn server_error_falls_back_and_is_retried_next_call() {
    let provider = stub(500, r#"{"message":"boom"}"#).await;
    let gateway = Gateway::open(stub_gateway_config(&provider.base_url(), TIMEOUT));

    for _ in 0..2 {
        let forecast = gateway.forecast("Paris, France", june_15()).await;
        assert!(forecast.fallback_used());
        assert_eq!(forecast.records().len(), 2);
    }
    assert_eq!(provider.hits(), 2);
}

#[tokio::test]
async fn hung_provider_falls_back_after_the_timeout() {
    let provider = StubProvider::start(StubReply::Hang)
        .await
        .expect("stub provider");
    let gateway = Gateway::open(stub_gateway_config(&provider.base_url(), TIMEOUT));

    let started = Instant::now();
    let forecast = gateway.forecast("Paris, France", june_15()).await;

    assert!(forecast.fallback_used());
    assert!(started.elapsed() >= TIMEOUT);
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "took {:?}",
        started.elapsed()
    );
    assert_eq!(provider.hits(), 1);
}

#[tokio::test]
async fn undecodable_body_falls_back() {
    let provider = stub(200, "not json").await;
    let gateway = Gateway::open(stub_gateway_config(&provider.base_url(), TIMEOUT));

    let places = gateway.points_of_interest("Paris, France", "museum").await;

    assert!(places.fallback_used());
    assert_eq!(places.records()[0].name, "City Center");
}

// ===========================================================================
// Live providers
// ===========================================================================

#[tokio::test]
async fn fetched_forecast_is_memoized() {
    let provider = stub(200, FORECAST_BODY).await;
    let gateway = Gateway::open(stub_gateway_config(&provider.base_url(), TIMEOUT));

    let first = gateway.forecast("Paris, France", june_15()).await;
    assert!(!first.fallback_used());
    assert_eq!(first.records().len(), 1);
    assert_eq!(first.records()[0].description, "light rain");
    assert_eq!(first.records()[0].time, "09:00");

    let second = gateway.forecast("  paris, FRANCE ", june_15()).await;
    assert!(!second.fallback_used());
    assert_eq!(second, first);
    assert_eq!(provider.hits(), 1);
}

#[tokio::test]
async fn fetched_places_geocode_once_and_are_memoized() {
    let provider = stub(200, PLACES_BODY).await;
    let gateway = Gateway::open(stub_gateway_config(&provider.base_url(), TIMEOUT));

    let places = gateway.points_of_interest("Paris, France", "museum").await;
    assert!(!places.fallback_used());
    assert_eq!(places.records()[0].name, "Louvre Museum");
    // Geocode, then nearby search.
    assert_eq!(provider.hits(), 2);

    let again = gateway.points_of_interest("Paris, France", "museum").await;
    assert!(!again.fallback_used());
    assert_eq!(provider.hits(), 2);

    // A different kind is a separate lookup.
    gateway.points_of_interest("Paris, France", "restaurant").await;
    assert_eq!(provider.hits(), 4);
}
