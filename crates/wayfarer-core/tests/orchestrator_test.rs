//! End-to-end tests for the itinerary pipeline.
//!
//! Every test runs offline: the gateway has no credentials (or points at a
//! closed port) and content comes from the scripted generator, so the
//! expected itineraries are fully determined by the canned Paris data.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use wayfarer_core::fingerprint::Fingerprint;
use wayfarer_core::models::{BudgetTier, Itinerary};
use wayfarer_core::orchestrator::PlanError;
use wayfarer_core::producer::{
    BudgetProducer, ExplorerProducer, FoodProducer, ProducerKind, ProducerPool,
};
use wayfarer_test_utils::{
    CountingProducer, FailingProducer, PanickingProducer, ScriptedGenerator,
    offline_orchestrator, sample_request, scripted_pool, unreachable_gateway_config,
};

const EPS: f64 = 1e-6;

fn names<'a>(list: impl IntoIterator<Item = &'a wayfarer_core::models::Attraction>) -> Vec<&'a str> {
    list.into_iter().map(|a| a.name.as_str()).collect()
}

fn assert_budget_invariant(itinerary: &Itinerary) {
    let b = &itinerary.budget_breakdown;
    assert!(b.miscellaneous >= 0.0, "negative reserve: {b:?}");
    assert!(
        (b.allocated() - (b.total_budget - b.remaining_budget)).abs() < EPS,
        "bucket sum mismatch: {b:?}"
    );
}

// ===========================================================================
// Paris scenario
// ===========================================================================

#[tokio::test]
async fn paris_plan_with_all_producers_succeeding() {
    let generator = Arc::new(ScriptedGenerator::new());
    let orchestrator = offline_orchestrator(scripted_pool(Arc::clone(&generator)));

    let itinerary = orchestrator
        .create_itinerary(&sample_request())
        .await
        .expect("plan");

    assert_eq!(
        itinerary.fingerprint,
        "itinerary:paris, france:500.00:standard:2024-06-15:2"
    );
    assert_eq!(itinerary.day_plans.len(), 2);
    assert!(itinerary.producer_reports.iter().all(|r| r.ok));
    assert_eq!(
        itinerary
            .producer_reports
            .iter()
            .map(|r| r.producer.as_str())
            .collect::<Vec<_>>(),
        ["explorer", "budget", "food"]
    );
    assert_eq!(generator.calls(), 2);

    // Ranked: Louvre, Notre-Dame, Eiffel | Marche, Montmartre, Jardin.
    let day_1 = &itinerary.day_plans[0];
    assert_eq!(names(&day_1.morning_activities), ["Louvre Museum", "Notre-Dame Cathedral"]);
    assert_eq!(names(&day_1.afternoon_activities), ["Notre-Dame Cathedral", "Eiffel Tower"]);
    assert_eq!(names(&day_1.evening_activities), ["Eiffel Tower"]);
    assert_eq!(day_1.lunch.as_ref().map(|r| r.name.as_str()), Some("L'As du Fallafel"));
    assert_eq!(
        day_1.dinner.as_ref().map(|r| r.name.as_str()),
        Some("Restaurant Bouillon Chartier")
    );
    assert!((day_1.total_estimated_cost - 64.0).abs() < EPS);

    let day_2 = &itinerary.day_plans[1];
    assert_eq!(day_2.date.to_string(), "2024-06-16");
    assert_eq!(
        names(&day_2.morning_activities),
        ["Marche des Enfants Rouges", "Montmartre"]
    );
    assert!(!names(day_2.activities()).contains(&"Mystery Spot"));
    assert!((day_2.total_estimated_cost - 34.0).abs() < EPS);

    let b = &itinerary.budget_breakdown;
    assert!((b.activities - 100.0).abs() < EPS);
    assert!(b.allocated() <= 500.0 + EPS);
    assert_budget_invariant(&itinerary);

    assert!((itinerary.total_estimated_cost - 348.0).abs() < EPS);
    assert!((itinerary.budget_utilization_percentage - 69.6).abs() < EPS);
    assert!((0.0..=100.0).contains(&itinerary.budget_utilization_percentage));

    assert!(itinerary.forecast_fallback_used);
    assert_eq!(itinerary.weather_forecast.len(), 2);
    assert_eq!(itinerary.emergency_contacts.len(), 4);

    // Budget 4 + food 4 + forecast fallback 2. No explorer advice applies.
    assert_eq!(itinerary.recommendations.len(), 10);
    assert!(
        itinerary
            .recommendations
            .iter()
            .any(|r| r.contains("local traditional restaurants"))
    );
    assert_eq!(
        itinerary.recommendations.last().map(String::as_str),
        Some("Pack light layers for temperature variations")
    );
}

#[tokio::test]
async fn slot_assignment_is_deterministic() {
    let orchestrator = offline_orchestrator(scripted_pool(Arc::new(ScriptedGenerator::new())));
    let request = sample_request();

    let first = orchestrator.run_pipeline(&request).await.expect("first");
    let second = orchestrator.run_pipeline(&request).await.expect("second");

    assert_eq!(first.day_plans, second.day_plans);
    assert_eq!(first.recommendations, second.recommendations);
}

#[tokio::test]
async fn budget_invariant_holds_across_tiers_and_amounts() {
    let orchestrator = offline_orchestrator(scripted_pool(Arc::new(ScriptedGenerator::new())));

    for tier in [BudgetTier::Economy, BudgetTier::Standard, BudgetTier::Premium] {
        for budget in [1.0, 60.0, 500.0, 10_000.0] {
            let mut request = sample_request();
            request.tier = tier;
            request.budget = budget;
            let itinerary = orchestrator.run_pipeline(&request).await.expect("plan");
            assert_budget_invariant(&itinerary);
        }
    }
}

#[tokio::test]
async fn overrun_beyond_reserve_leaves_negative_remaining() {
    let orchestrator = offline_orchestrator(scripted_pool(Arc::new(ScriptedGenerator::new())));
    let mut request = sample_request();
    request.budget = 60.0;

    let itinerary = orchestrator.run_pipeline(&request).await.expect("plan");
    let b = &itinerary.budget_breakdown;
    assert!((b.activities - 98.0).abs() < EPS);
    assert_eq!(b.miscellaneous, 0.0);
    assert!(b.remaining_budget < 0.0);
    assert!(itinerary.budget_utilization_percentage > 100.0);
}

// ===========================================================================
// Failure isolation
// ===========================================================================

#[tokio::test]
async fn food_failure_leaves_days_without_meals() {
    let generator = Arc::new(ScriptedGenerator::new());
    let pool = ProducerPool::new()
        .with(ExplorerProducer::new(generator))
        .with(BudgetProducer::new())
        .with(FailingProducer(ProducerKind::Food));
    let orchestrator = offline_orchestrator(pool);

    let itinerary = orchestrator
        .create_itinerary(&sample_request())
        .await
        .expect("plan");

    assert_eq!(itinerary.day_plans.len(), 2);
    for day in &itinerary.day_plans {
        assert!(day.lunch.is_none());
        assert!(day.dinner.is_none());
        assert!(day.activities().count() > 0);
    }
    let food = &itinerary.producer_reports[2];
    assert_eq!(food.producer, "food");
    assert!(!food.ok);
    assert_eq!(food.error.as_deref(), Some("scripted failure"));
}

#[tokio::test]
async fn budget_failure_falls_back_to_tier_table() {
    let generator = Arc::new(ScriptedGenerator::new());
    let pool = ProducerPool::new()
        .with(ExplorerProducer::new(Arc::clone(&generator) as _))
        .with(FailingProducer(ProducerKind::Budget))
        .with(FoodProducer::new(generator));
    let orchestrator = offline_orchestrator(pool);

    let itinerary = orchestrator.run_pipeline(&sample_request()).await.expect("plan");
    let b = &itinerary.budget_breakdown;
    assert!((b.accommodation - 200.0).abs() < EPS);
    assert!((b.transportation - 50.0).abs() < EPS);
    assert_budget_invariant(&itinerary);
    assert!(
        !itinerary
            .recommendations
            .iter()
            .any(|r| r.contains("mid-range hotels"))
    );
}

#[tokio::test]
async fn panicking_producer_is_reported_not_propagated() {
    let generator = Arc::new(ScriptedGenerator::new());
    let pool = ProducerPool::new()
        .with(PanickingProducer(ProducerKind::Explorer))
        .with(BudgetProducer::new())
        .with(FoodProducer::new(generator));
    let orchestrator = offline_orchestrator(pool);

    let itinerary = orchestrator.run_pipeline(&sample_request()).await.expect("plan");
    let explorer = &itinerary.producer_reports[0];
    assert!(!explorer.ok);
    assert!(
        explorer
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("producer panicked"))
    );
    assert!(itinerary.day_plans.iter().all(|d| d.activities().count() == 0));
    assert!(itinerary.day_plans[0].lunch.is_some());
}

#[tokio::test]
async fn unreachable_providers_degrade_to_fallback_data() {
    let generator = Arc::new(ScriptedGenerator::new());
    let orchestrator = wayfarer_core::orchestrator::Orchestrator::new(
        Arc::new(wayfarer_core::cache::Cache::in_memory(std::time::Duration::from_secs(60))),
        scripted_pool(generator),
        wayfarer_core::orchestrator::OrchestratorConfig::new(unreachable_gateway_config()),
    );

    let itinerary = orchestrator.run_pipeline(&sample_request()).await.expect("plan");
    assert!(itinerary.forecast_fallback_used);
    assert!(itinerary.places_fallback_used.any());
    assert_eq!(itinerary.weather_forecast.len(), 2);
    assert!(itinerary.producer_reports.iter().all(|r| r.ok));
}

#[tokio::test]
async fn invalid_request_is_rejected_before_any_work() {
    let generator = Arc::new(ScriptedGenerator::new());
    let orchestrator = offline_orchestrator(scripted_pool(Arc::clone(&generator)));

    let mut request = sample_request();
    request.party_size = 11;
    let err = orchestrator.create_itinerary(&request).await.unwrap_err();
    assert!(matches!(err, PlanError::InvalidRequest(_)));

    request.party_size = 2;
    request.destination = "   ".to_owned();
    assert!(orchestrator.create_itinerary(&request).await.is_err());
    assert_eq!(generator.calls(), 0);
}

// ===========================================================================
// Caching
// ===========================================================================

#[tokio::test]
async fn second_identical_request_is_served_from_cache() {
    let generator = Arc::new(ScriptedGenerator::new());
    let (explorer, explorer_calls) = CountingProducer::new(ExplorerProducer::new(Arc::clone(&generator) as _));
    let pool = ProducerPool::new()
        .with(explorer)
        .with(BudgetProducer::new())
        .with(FoodProducer::new(generator));
    let orchestrator = offline_orchestrator(pool);
    let request = sample_request();

    let first = orchestrator.create_itinerary(&request).await.expect("first");
    let second = orchestrator.create_itinerary(&request).await.expect("second");

    assert_eq!(first, second);
    assert_eq!(explorer_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn equivalent_destinations_share_a_fingerprint() {
    let generator = Arc::new(ScriptedGenerator::new());
    let orchestrator = offline_orchestrator(scripted_pool(Arc::clone(&generator)));

    let first = orchestrator.create_itinerary(&sample_request()).await.expect("first");
    let mut shouty = sample_request();
    shouty.destination = "  PARIS,   France ".to_owned();
    let second = orchestrator.create_itinerary(&shouty).await.expect("second");

    assert_eq!(Fingerprint::of(&shouty).as_str(), first.fingerprint);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn refresh_bypasses_and_overwrites_the_cache() {
    let generator = Arc::new(ScriptedGenerator::new());
    let orchestrator = offline_orchestrator(scripted_pool(Arc::clone(&generator)));
    let request = sample_request();

    let first = orchestrator.create_itinerary(&request).await.expect("first");
    let refreshed = orchestrator.refresh_itinerary(&request).await.expect("refresh");
    let cached = orchestrator.create_itinerary(&request).await.expect("cached");

    assert_eq!(generator.calls(), 4);
    assert!(refreshed.created_at >= first.created_at);
    assert_eq!(cached, refreshed);
}

#[tokio::test]
async fn run_pipeline_never_touches_the_cache() {
    let generator = Arc::new(ScriptedGenerator::new());
    let orchestrator = offline_orchestrator(scripted_pool(Arc::clone(&generator)));
    let request = sample_request();

    orchestrator.run_pipeline(&request).await.expect("plan");
    let key = Fingerprint::of(&request);
    assert!(orchestrator.cache().get(key.as_str()).await.is_none());
}

#[tokio::test]
async fn concurrent_requests_each_get_their_own_entry() -> anyhow::Result<()> {
    let generator = Arc::new(ScriptedGenerator::new());
    let orchestrator = offline_orchestrator(scripted_pool(Arc::clone(&generator)));
    let requests: Vec<_> = ["Paris, France", "Rome, Italy", "Lisbon, Portugal"]
        .into_iter()
        .map(|destination| {
            let mut request = sample_request();
            request.destination = destination.to_owned();
            request
        })
        .collect();

    let results =
        futures::future::join_all(requests.iter().map(|r| orchestrator.create_itinerary(r))).await;

    for (request, result) in requests.iter().zip(results) {
        let itinerary = result?;
        assert_eq!(itinerary.destination(), request.destination);
        let key = Fingerprint::of(request);
        assert!(orchestrator.cache().get(key.as_str()).await.is_some());
    }
    assert_eq!(generator.calls(), 6);
    Ok(())
}

#[tokio::test]
async fn invalidation_forces_a_fresh_plan() {
    let generator = Arc::new(ScriptedGenerator::new());
    let orchestrator = offline_orchestrator(scripted_pool(Arc::clone(&generator)));
    let request = sample_request();

    orchestrator.create_itinerary(&request).await.expect("first");
    assert!(orchestrator.cache().invalidate("paris").await);
    orchestrator.create_itinerary(&request).await.expect("second");

    assert_eq!(generator.calls(), 4);
}
