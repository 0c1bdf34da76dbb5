//! Phased itinerary pipeline with fingerprint caching.
//!
//! ```text
//! validate → fingerprint → cache lookup ─hit──────────────────────────────→ return
//!                                       └miss→ 1 gather → 2 produce → 3 day plans
//!                                              → 4 reconcile → 5 assemble → 6 cache → return
//! ```
//!
//! Phases run strictly in order. Phases 1 and 2 fan out internally and join
//! before the next phase starts; nothing spawned by a run outlives it.
//! Gateway fallbacks, producer failures and cache errors all degrade the
//! result instead of failing the call. The only error is
//! [`PlanError::InvalidRequest`].

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::budget::{default_allocation, reconcile};
use crate::cache::Cache;
use crate::dayplan::build_day_plans;
use crate::fingerprint::Fingerprint;
use crate::gateway::{Gateway, GatewayConfig, GatewayResult, forecast_advisories};
use crate::models::{
    Attraction, EMERGENCY_CONTACTS, ForecastRecord, Itinerary, PlaceRecord, PlacesFallback,
    TripRequest, ValidationError,
};
use crate::producer::{
    DiningPlan, ProducerKind, ProducerPayload, ProducerPool, ProducerResult, SharedContext,
};

/// Place kinds looked up during the gather phase.
const ATTRACTION_KIND: &str = "tourist_attraction";
const RESTAURANT_KIND: &str = "restaurant";

/// The only failure a caller can see.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("invalid trip request: {0}")]
    InvalidRequest(#[from] ValidationError),
}

/// Configuration for the orchestrator.
///
/// Cached itineraries live for the cache's own default TTL.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Gateway settings used for each run's gather phase.
    pub gateway: GatewayConfig,
}

impl OrchestratorConfig {
    pub fn new(gateway: GatewayConfig) -> Self {
        Self { gateway }
    }

    pub fn from_env() -> Self {
        Self::new(GatewayConfig::from_env())
    }
}

/// Gateway output of phase 1.
#[derive(Debug)]
struct Gathered {
    forecast: GatewayResult<ForecastRecord>,
    attractions: GatewayResult<PlaceRecord>,
    restaurants: GatewayResult<PlaceRecord>,
}

/// Runs the planning pipeline and fronts it with the itinerary cache.
#[derive(Debug)]
pub struct Orchestrator {
    cache: Arc<Cache>,
    pool: ProducerPool,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(cache: Arc<Cache>, pool: ProducerPool, config: OrchestratorConfig) -> Self {
        Self {
            cache,
            pool,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Return the cached itinerary for `request`, or plan and cache a new one.
    pub async fn create_itinerary(&self, request: &TripRequest) -> Result<Itinerary, PlanError> {
        request.validate()?;
        let fingerprint = Fingerprint::of(request);

        if let Some(cached) = self.cache.get_json::<Itinerary>(fingerprint.as_str()).await {
            tracing::info!(
                destination = %request.destination,
                fingerprint = %fingerprint,
                "itinerary served from cache"
            );
            return Ok(cached);
        }

        self.plan_and_store(request, &fingerprint).await
    }

    /// Plan afresh, ignoring any cached itinerary, and overwrite the entry.
    pub async fn refresh_itinerary(&self, request: &TripRequest) -> Result<Itinerary, PlanError> {
        request.validate()?;
        let fingerprint = Fingerprint::of(request);
        self.plan_and_store(request, &fingerprint).await
    }

    /// Phases 1-5 without touching the cache.
    pub async fn run_pipeline(&self, request: &TripRequest) -> Result<Itinerary, PlanError> {
        request.validate()?;
        let fingerprint = Fingerprint::of(request);
        Ok(self.pipeline(request, &fingerprint).await)
    }

    async fn plan_and_store(
        &self,
        request: &TripRequest,
        fingerprint: &Fingerprint,
    ) -> Result<Itinerary, PlanError> {
        let itinerary = self.pipeline(request, fingerprint).await;

        // 6. Cache. A failed write only costs a future hit.
        let stored = self
            .cache
            .set_json(fingerprint.as_str(), &itinerary)
            .await;
        tracing::info!(
            fingerprint = %fingerprint,
            phase = "cache",
            stored,
            ttl_secs = self.cache.default_ttl().as_secs(),
            "itinerary cached"
        );
        Ok(itinerary)
    }

    async fn pipeline(&self, request: &TripRequest, fingerprint: &Fingerprint) -> Itinerary {
        let started = Instant::now();
        tracing::info!(
            destination = %request.destination,
            fingerprint = %fingerprint,
            "planning itinerary"
        );

        // 1. Gather.
        let phase = Instant::now();
        let gathered = self.gather(request).await;
        tracing::info!(
            fingerprint = %fingerprint,
            phase = "gather",
            forecast_records = gathered.forecast.records().len(),
            forecast_fallback = gathered.forecast.fallback_used(),
            attraction_places = gathered.attractions.records().len(),
            attraction_fallback = gathered.attractions.fallback_used(),
            restaurant_places = gathered.restaurants.records().len(),
            restaurant_fallback = gathered.restaurants.fallback_used(),
            elapsed_ms = phase.elapsed().as_millis() as u64,
            "reference data gathered"
        );

        // 2. Produce.
        let phase = Instant::now();
        let context = Arc::new(SharedContext {
            forecast: gathered.forecast.records().to_vec(),
            attraction_places: gathered.attractions.records().to_vec(),
            restaurant_places: gathered.restaurants.records().to_vec(),
        });
        let results = self
            .pool
            .run_all(Arc::new(request.clone()), context)
            .await;
        tracing::info!(
            fingerprint = %fingerprint,
            phase = "produce",
            producers = results.len(),
            succeeded = results.iter().filter(|r| r.is_ok()).count(),
            elapsed_ms = phase.elapsed().as_millis() as u64,
            "producers settled"
        );

        // 3. Day plans.
        let attractions: &[Attraction] = match payload(&results, ProducerKind::Explorer) {
            Some(ProducerPayload::Exploration(plan)) => plan.attractions.as_slice(),
            _ => &[],
        };
        let dining: Option<&DiningPlan> = match payload(&results, ProducerKind::Food) {
            Some(ProducerPayload::Dining(plan)) => Some(plan),
            _ => None,
        };
        let day_plans = build_day_plans(request, attractions, dining);
        let activity_cost: f64 = day_plans.iter().map(|d| d.total_estimated_cost).sum();
        tracing::info!(
            fingerprint = %fingerprint,
            phase = "day_plans",
            days = day_plans.len(),
            attractions = attractions.len(),
            dining = dining.is_some(),
            activity_cost,
            "day plans assembled"
        );

        // 4. Reconcile.
        let planned = match payload(&results, ProducerKind::Budget) {
            Some(ProducerPayload::Budget(plan)) => plan.allocation.clone(),
            _ => default_allocation(request.budget, request.tier),
        };
        let budget_breakdown = reconcile(&planned, activity_cost);
        tracing::info!(
            fingerprint = %fingerprint,
            phase = "reconcile",
            activities = budget_breakdown.activities,
            miscellaneous = budget_breakdown.miscellaneous,
            remaining = budget_breakdown.remaining_budget,
            "budget reconciled"
        );

        // 5. Assemble.
        let mut recommendations = Vec::new();
        for kind in [ProducerKind::Explorer, ProducerKind::Budget, ProducerKind::Food] {
            if let Some(p) = payload(&results, kind) {
                recommendations.extend(p.recommendations().iter().cloned());
            }
        }
        recommendations.extend(forecast_advisories(&gathered.forecast));

        let total_estimated_cost =
            activity_cost + budget_breakdown.accommodation + budget_breakdown.transportation;
        let budget_utilization_percentage = if request.budget > 0.0 {
            total_estimated_cost / request.budget * 100.0
        } else {
            0.0
        };

        let itinerary = Itinerary {
            fingerprint: fingerprint.to_string(),
            request: request.clone(),
            budget_breakdown,
            day_plans,
            total_estimated_cost,
            budget_utilization_percentage,
            recommendations,
            emergency_contacts: EMERGENCY_CONTACTS.iter().map(|s| (*s).to_owned()).collect(),
            forecast_fallback_used: gathered.forecast.fallback_used(),
            places_fallback_used: PlacesFallback {
                attractions: gathered.attractions.fallback_used(),
                restaurants: gathered.restaurants.fallback_used(),
            },
            weather_forecast: gathered.forecast.into_records(),
            producer_reports: results.iter().map(ProducerResult::report).collect(),
            created_at: Utc::now(),
        };
        tracing::info!(
            fingerprint = %fingerprint,
            phase = "assemble",
            total_estimated_cost,
            utilization = budget_utilization_percentage,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "itinerary assembled"
        );
        itinerary
    }

    /// Phase 1: concurrent lookups on a gateway scoped to this call.
    async fn gather(&self, request: &TripRequest) -> Gathered {
        let gateway = Gateway::open(self.config.gateway.clone());
        let (forecast, attractions, restaurants) = tokio::join!(
            gateway.forecast(&request.destination, request.start_date),
            gateway.points_of_interest(&request.destination, ATTRACTION_KIND),
            gateway.points_of_interest(&request.destination, RESTAURANT_KIND),
        );
        Gathered {
            forecast,
            attractions,
            restaurants,
        }
    }
}

/// The successful payload of the producer of `kind`, if any.
fn payload(results: &[ProducerResult], kind: ProducerKind) -> Option<&ProducerPayload> {
    results
        .iter()
        .find(|r| r.kind == kind)
        .and_then(ProducerResult::payload)
}
