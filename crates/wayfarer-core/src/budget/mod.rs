//! Budget allocation and reconciliation.
//!
//! A planned [`BudgetAllocation`] splits the total across five buckets by
//! tier. Once day plans are priced, [`reconcile`] grows the activities
//! bucket to cover the actual cost, drawing only on the miscellaneous
//! reserve, and recomputes `remaining_budget`. An overrun larger than the
//! reserve shows up as a negative remaining budget.

use crate::models::{BudgetAllocation, BudgetTier};

/// Fraction of the total assigned to each priced bucket. Whatever is left
/// becomes the miscellaneous reserve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierSplit {
    pub accommodation: f64,
    pub food: f64,
    pub activities: f64,
    pub transportation: f64,
}

pub fn tier_split(tier: BudgetTier) -> TierSplit {
    match tier {
        BudgetTier::Economy => TierSplit {
            accommodation: 0.3,
            food: 0.4,
            activities: 0.2,
            transportation: 0.1,
        },
        BudgetTier::Standard => TierSplit {
            accommodation: 0.4,
            food: 0.3,
            activities: 0.2,
            transportation: 0.1,
        },
        BudgetTier::Premium => TierSplit {
            accommodation: 0.5,
            food: 0.25,
            activities: 0.15,
            transportation: 0.1,
        },
    }
}

/// Split `total` by the tier table. Nothing is spent yet, so
/// `remaining_budget` equals `total`.
pub fn default_allocation(total: f64, tier: BudgetTier) -> BudgetAllocation {
    let split = tier_split(tier);
    let accommodation = total * split.accommodation;
    let food = total * split.food;
    let activities = total * split.activities;
    let transportation = total * split.transportation;
    let allocated = accommodation + food + activities + transportation;

    BudgetAllocation {
        total_budget: total,
        accommodation,
        transportation,
        food,
        activities,
        miscellaneous: (total - allocated).max(0.0),
        remaining_budget: total,
    }
}

/// Adjust `planned` against the summed actual cost of the day plans.
///
/// Postconditions: `miscellaneous >= 0` and
/// `allocated() == total_budget - remaining_budget`.
pub fn reconcile(planned: &BudgetAllocation, actual_cost: f64) -> BudgetAllocation {
    let mut adjusted = planned.clone();
    adjusted.miscellaneous = adjusted.miscellaneous.max(0.0);

    if actual_cost > adjusted.activities {
        let excess = actual_cost - adjusted.activities;
        adjusted.activities = actual_cost;
        adjusted.miscellaneous = (adjusted.miscellaneous - excess).max(0.0);
        tracing::debug!(excess, reserve = adjusted.miscellaneous, "activity overrun absorbed");
    }

    adjusted.remaining_budget = adjusted.total_budget - adjusted.allocated();
    adjusted
}
