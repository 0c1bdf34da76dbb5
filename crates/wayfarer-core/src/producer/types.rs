//! Shared types for producers: kinds, payloads, results and the context they
//! read from.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::generator::GenerationError;
use crate::models::{
    Attraction, BudgetAllocation, ForecastRecord, MealGrouping, PlaceRecord, ProducerReport,
    Restaurant,
};

/// Which subtask a producer performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerKind {
    Explorer,
    Budget,
    Food,
}

impl ProducerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explorer => "explorer",
            Self::Budget => "budget",
            Self::Food => "food",
        }
    }
}

impl fmt::Display for ProducerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal producer failure. Becomes `ProducerOutcome::Failure` via
/// [`finish`].
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("content generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("malformed generated content: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Gateway data gathered before the fan-out, read by every producer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedContext {
    pub forecast: Vec<ForecastRecord>,
    pub attraction_places: Vec<PlaceRecord>,
    pub restaurant_places: Vec<PlaceRecord>,
}

impl SharedContext {
    /// Names of the attraction places, for use as prompt hints.
    pub fn attraction_hints(&self) -> Vec<&str> {
        self.attraction_places.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn restaurant_hints(&self) -> Vec<&str> {
        self.restaurant_places.iter().map(|p| p.name.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Ranked attractions from the explorer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplorationPlan {
    pub attractions: Vec<Attraction>,
    pub recommendations: Vec<String>,
}

/// Share of the total budget per bucket, in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketPercentages {
    pub accommodation: f64,
    pub food: f64,
    pub activities: f64,
    pub transportation: f64,
    pub miscellaneous: f64,
}

/// Planned spending split from the budget producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetPlan {
    pub allocation: BudgetAllocation,
    pub recommendations: Vec<String>,
    pub percentages: BucketPercentages,
}

/// Dining candidates and per-day meal groupings from the food producer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiningPlan {
    pub restaurants: Vec<Restaurant>,
    /// Keyed `day_1`, `day_2`, ...
    pub meals: BTreeMap<String, MealGrouping>,
    pub recommendations: Vec<String>,
}

impl DiningPlan {
    pub fn day_key(day: u32) -> String {
        format!("day_{day}")
    }

    pub fn meals_for_day(&self, day: u32) -> Option<&MealGrouping> {
        self.meals.get(&Self::day_key(day))
    }
}

/// What a successful producer hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum ProducerPayload {
    Exploration(ExplorationPlan),
    Budget(BudgetPlan),
    Dining(DiningPlan),
}

impl ProducerPayload {
    /// The producer kind this payload belongs to.
    pub fn kind(&self) -> ProducerKind {
        match self {
            Self::Exploration(_) => ProducerKind::Explorer,
            Self::Budget(_) => ProducerKind::Budget,
            Self::Dining(_) => ProducerKind::Food,
        }
    }

    pub fn recommendations(&self) -> &[String] {
        match self {
            Self::Exploration(p) => &p.recommendations,
            Self::Budget(p) => &p.recommendations,
            Self::Dining(p) => &p.recommendations,
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ProducerOutcome {
    Success {
        payload: ProducerPayload,
        elapsed: Duration,
    },
    Failure {
        reason: String,
        elapsed: Duration,
    },
}

/// The settled outcome of one producer run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerResult {
    pub kind: ProducerKind,
    pub outcome: ProducerOutcome,
}

impl ProducerResult {
    pub fn success(payload: ProducerPayload, elapsed: Duration) -> Self {
        Self {
            kind: payload.kind(),
            outcome: ProducerOutcome::Success { payload, elapsed },
        }
    }

    pub fn failure(kind: ProducerKind, reason: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            kind,
            outcome: ProducerOutcome::Failure {
                reason: reason.into(),
                elapsed,
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, ProducerOutcome::Success { .. })
    }

    pub fn payload(&self) -> Option<&ProducerPayload> {
        match &self.outcome {
            ProducerOutcome::Success { payload, .. } => Some(payload),
            ProducerOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ProducerOutcome::Success { .. } => None,
            ProducerOutcome::Failure { reason, .. } => Some(reason),
        }
    }

    pub fn elapsed(&self) -> Duration {
        match &self.outcome {
            ProducerOutcome::Success { elapsed, .. } | ProducerOutcome::Failure { elapsed, .. } => {
                *elapsed
            }
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    pub fn report(&self) -> ProducerReport {
        ProducerReport {
            producer: self.kind.to_string(),
            ok: self.is_ok(),
            elapsed_secs: self.elapsed_secs(),
            error: self.error().map(str::to_owned),
        }
    }
}

/// Normalize a producer's internal result into a [`ProducerResult`],
/// measuring elapsed time from `started`.
///
/// A payload of the wrong variant for `kind` is reported as a failure.
pub fn finish(
    kind: ProducerKind,
    started: Instant,
    result: Result<ProducerPayload, ProducerError>,
) -> ProducerResult {
    let elapsed = started.elapsed();
    match result {
        Ok(payload) if payload.kind() == kind => ProducerResult::success(payload, elapsed),
        Ok(payload) => ProducerResult::failure(
            kind,
            format!("{kind} producer returned a {} payload", payload.kind()),
            elapsed,
        ),
        Err(e) => ProducerResult::failure(kind, e.to_string(), elapsed),
    }
}
