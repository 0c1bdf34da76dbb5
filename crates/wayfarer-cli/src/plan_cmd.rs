//! Handler for `wayfarer plan`.
//!
//! Builds a [`TripRequest`] from flags or a TOML file, runs it through the
//! orchestrator, and prints the itinerary as JSON on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};

use wayfarer_core::cache::Cache;
use wayfarer_core::generator::generator_from_config;
use wayfarer_core::models::{Itinerary, TripRequest};
use wayfarer_core::orchestrator::{Orchestrator, OrchestratorConfig};
use wayfarer_core::producer::ProducerPool;

use crate::PlanArgs;
use crate::config::WayfarerConfig;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Plan (or fetch from cache) and print the itinerary.
pub async fn run_plan(args: &PlanArgs, config: &WayfarerConfig) -> Result<()> {
    let itinerary = plan_itinerary(args, config).await?;

    let json = if args.compact {
        serde_json::to_string(&itinerary)
    } else {
        serde_json::to_string_pretty(&itinerary)
    }
    .context("failed to serialize itinerary")?;
    println!("{json}");
    Ok(())
}

/// Resolve the request and run it against a freshly wired orchestrator.
pub async fn plan_itinerary(args: &PlanArgs, config: &WayfarerConfig) -> Result<Itinerary> {
    let request = build_request(args)?;

    let cache = Arc::new(Cache::connect(&config.cache).await);
    let pool = ProducerPool::standard(generator_from_config(&config.generator));
    let orchestrator = Orchestrator::new(
        cache,
        pool,
        OrchestratorConfig::new(config.gateway.clone()),
    );

    let itinerary = if args.refresh {
        orchestrator.refresh_itinerary(&request).await
    } else {
        orchestrator.create_itinerary(&request).await
    }
    .with_context(|| format!("failed to plan trip to {}", request.destination))?;

    let failed: Vec<&str> = itinerary
        .producer_reports
        .iter()
        .filter(|r| !r.ok)
        .map(|r| r.producer.as_str())
        .collect();
    tracing::info!(
        destination = %itinerary.destination(),
        fingerprint = %itinerary.fingerprint,
        total_estimated_cost = itinerary.total_estimated_cost,
        utilization = itinerary.budget_utilization_percentage,
        forecast_fallback = itinerary.forecast_fallback_used,
        places_fallback = itinerary.places_fallback_used.any(),
        ?failed,
        "itinerary ready"
    );
    Ok(itinerary)
}

// -----------------------------------------------------------------------
// Request construction
// -----------------------------------------------------------------------

/// The request described by `--file`, or by the individual flags.
pub fn build_request(args: &PlanArgs) -> Result<TripRequest> {
    if let Some(path) = &args.file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request file: {}", path.display()))?;
        return toml::from_str(&content)
            .with_context(|| format!("failed to parse request file: {}", path.display()));
    }

    Ok(TripRequest {
        destination: args
            .destination
            .clone()
            .context("--destination is required without --file")?,
        budget: args.budget.context("--budget is required without --file")?,
        tier: args.tier.context("--tier is required without --file")?,
        preferences: args.prefs.iter().copied().collect(),
        start_date: args
            .start_date
            .context("--start-date is required without --file")?,
        party_size: args.party_size,
        special_requirements: args.requirements.clone(),
    })
}
