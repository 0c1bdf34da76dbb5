//! Budget producer: tier-based spending split. Pure arithmetic.

use std::time::Instant;

use async_trait::async_trait;

use super::trait_def::Producer;
use super::types::{
    BucketPercentages, BudgetPlan, ProducerKind, ProducerPayload, ProducerResult, SharedContext,
    finish,
};
use crate::budget::default_allocation;
use crate::models::{BudgetAllocation, BudgetTier, TripRequest};

/// Splits the request's budget by tier and adds spending advice.
#[derive(Debug, Default, Clone, Copy)]
pub struct BudgetProducer;

impl BudgetProducer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Producer for BudgetProducer {
    fn kind(&self) -> ProducerKind {
        ProducerKind::Budget
    }

    async fn transform(&self, request: &TripRequest, _context: &SharedContext) -> ProducerResult {
        let started = Instant::now();
        let plan = plan_budget(request);
        tracing::debug!(
            destination = %request.destination,
            tier = %request.tier,
            accommodation = plan.allocation.accommodation,
            activities = plan.allocation.activities,
            "budget planned"
        );
        finish(self.kind(), started, Ok(ProducerPayload::Budget(plan)))
    }
}

pub fn plan_budget(request: &TripRequest) -> BudgetPlan {
    let allocation = default_allocation(request.budget, request.tier);
    BudgetPlan {
        recommendations: recommendations(&allocation, request.tier),
        percentages: percentages(&allocation),
        allocation,
    }
}

fn recommendations(allocation: &BudgetAllocation, tier: BudgetTier) -> Vec<String> {
    let tier_advice: [&str; 4] = match tier {
        BudgetTier::Economy => [
            "Consider staying in hostels or budget hotels to maximize your accommodation budget",
            "Look for free walking tours and free museum days",
            "Eat at local markets and street food for authentic and affordable meals",
            "Use public transportation or walk between attractions",
        ],
        BudgetTier::Standard => [
            "Mix of mid-range hotels and unique accommodations",
            "Balance between restaurants and local food experiences",
            "Consider combo tickets for multiple attractions",
            "Use a mix of public transport and occasional taxis",
        ],
        BudgetTier::Premium => [
            "Stay at premium hotels or unique boutique accommodations",
            "Dine at top-rated restaurants and try local specialties",
            "Book private tours and premium experiences",
            "Use private transportation or premium car services",
        ],
    };

    let mut advice: Vec<String> = tier_advice.iter().map(|s| (*s).to_owned()).collect();
    if allocation.activities > allocation.total_budget * 0.3 {
        advice.push("Consider reducing activity costs to balance your budget".to_owned());
    }
    if allocation.food < allocation.total_budget * 0.2 {
        advice.push("You might want to allocate more budget for food experiences".to_owned());
    }
    advice
}

fn percentages(allocation: &BudgetAllocation) -> BucketPercentages {
    let total = allocation.total_budget;
    let pct = |amount: f64| if total > 0.0 { amount / total * 100.0 } else { 0.0 };
    BucketPercentages {
        accommodation: pct(allocation.accommodation),
        food: pct(allocation.food),
        activities: pct(allocation.activities),
        transportation: pct(allocation.transportation),
        miscellaneous: pct(allocation.miscellaneous),
    }
}
