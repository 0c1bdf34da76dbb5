//! Day-plan builder.
//!
//! Distributes ranked attractions and dining candidates across the trip's
//! days and time slots. Fully deterministic: the same inputs always produce
//! the same slot assignments.
//!
//! Attractions are split into halves by index (first half to day 1). Within
//! a day of `len` attractions:
//!
//! | slot      | primary  | fallback                         |
//! |-----------|----------|----------------------------------|
//! | morning   | `[0..2]` | `[0..1]`                         |
//! | afternoon | `[2..4]` | `[1..3]` if `len > 1`, else none |
//! | evening   | `[4..6]` | `[2..4]` if `len > 2`, else none |
//!
//! The fallbacks overlap, so a short day can list an attraction in two
//! slots.

use crate::models::{Attraction, DayPlan, Restaurant, TRIP_DAYS, TripRequest};
use crate::producer::DiningPlan;

/// Attractions needed before the afternoon slot uses its primary window.
const AFTERNOON_THRESHOLD: usize = 4;
/// Attractions needed before the evening slot uses its primary window.
const EVENING_THRESHOLD: usize = 6;
/// Attractions per slot.
const SLOT_WIDTH: usize = 2;

/// `items[start..start + len]`, clamped to the slice bounds.
fn clamped(items: &[Attraction], start: usize, len: usize) -> Vec<Attraction> {
    let start = start.min(items.len());
    let end = start.saturating_add(len).min(items.len());
    items[start..end].to_vec()
}

fn morning(day: &[Attraction]) -> Vec<Attraction> {
    if day.len() >= SLOT_WIDTH {
        clamped(day, 0, SLOT_WIDTH)
    } else {
        clamped(day, 0, 1)
    }
}

fn afternoon(day: &[Attraction]) -> Vec<Attraction> {
    if day.len() >= AFTERNOON_THRESHOLD {
        clamped(day, SLOT_WIDTH, SLOT_WIDTH)
    } else if day.len() > 1 {
        clamped(day, 1, SLOT_WIDTH)
    } else {
        Vec::new()
    }
}

fn evening(day: &[Attraction]) -> Vec<Attraction> {
    if day.len() >= EVENING_THRESHOLD {
        clamped(day, 2 * SLOT_WIDTH, SLOT_WIDTH)
    } else if day.len() > 2 {
        clamped(day, SLOT_WIDTH, SLOT_WIDTH)
    } else {
        Vec::new()
    }
}

/// Per-day attraction lists: the first half of `attractions` for day 1, the
/// rest for day 2.
fn split_days(attractions: &[Attraction]) -> [&[Attraction]; TRIP_DAYS as usize] {
    let (first, second) = attractions.split_at(attractions.len() / 2);
    [first, second]
}

/// Priced cost of one day, scaled by party size.
pub fn day_cost(
    activities: &[&Attraction],
    lunch: Option<&Restaurant>,
    dinner: Option<&Restaurant>,
    party_size: u32,
) -> f64 {
    let party = f64::from(party_size);
    let fees: f64 = activities.iter().filter_map(|a| a.entry_fee).sum();
    let meals: f64 = [lunch, dinner]
        .into_iter()
        .flatten()
        .map(|r| r.estimated_cost_per_person)
        .sum();
    fees * party + meals * party
}

/// Build the day plans for `request`.
///
/// `dining` is `None` when the food producer failed; days then carry no
/// lunch or dinner.
pub fn build_day_plans(
    request: &TripRequest,
    attractions: &[Attraction],
    dining: Option<&DiningPlan>,
) -> Vec<DayPlan> {
    split_days(attractions)
        .into_iter()
        .zip(1..=TRIP_DAYS)
        .map(|(day_attractions, day)| {
            let meals = dining.and_then(|d| d.meals_for_day(day));
            let lunch = meals.and_then(|m| m.lunch.first()).cloned();
            let dinner = meals.and_then(|m| m.dinner.first()).cloned();

            let mut plan = DayPlan {
                day,
                date: request.day_date(day),
                morning_activities: morning(day_attractions),
                lunch,
                afternoon_activities: afternoon(day_attractions),
                dinner,
                evening_activities: evening(day_attractions),
                total_estimated_cost: 0.0,
            };
            let cost = {
                let activities: Vec<&Attraction> = plan.activities().collect();
                day_cost(
                    &activities,
                    plan.lunch.as_ref(),
                    plan.dinner.as_ref(),
                    request.party_size,
                )
            };
            plan.total_estimated_cost = cost;
            plan
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::models::{BudgetTier, MealGrouping};

    fn request() -> TripRequest {
        TripRequest {
            destination: "Paris, France".to_owned(),
            budget: 500.0,
            tier: BudgetTier::Standard,
            preferences: Default::default(),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            party_size: 2,
            special_requirements: None,
        }
    }

    fn attraction(name: &str, fee: Option<f64>) -> Attraction {
        Attraction {
            name: name.to_owned(),
            description: String::new(),
            location: String::new(),
            opening_hours: None,
            entry_fee: fee,
            estimated_duration: 60,
            popularity_score: 5.0,
            uniqueness_score: 5.0,
            category: "landmark".to_owned(),
        }
    }

    fn attractions(n: usize) -> Vec<Attraction> {
        (0..n).map(|i| attraction(&format!("A{i}"), Some(10.0))).collect()
    }

    fn restaurant(name: &str, cost: f64) -> Restaurant {
        Restaurant {
            name: name.to_owned(),
            cuisine_type: "French".to_owned(),
            price_range: "$$".to_owned(),
            rating: 4.0,
            location: String::new(),
            specialties: vec![],
            opening_hours: None,
            estimated_cost_per_person: cost,
            must_try_dishes: vec![],
            fun_tips: vec![],
        }
    }

    fn names(list: &[Attraction]) -> Vec<&str> {
        list.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn twelve_attractions_fill_every_slot() {
        let plans = build_day_plans(&request(), &attractions(12), None);
        assert_eq!(plans.len(), 2);
        assert_eq!(names(&plans[0].morning_activities), ["A0", "A1"]);
        assert_eq!(names(&plans[0].afternoon_activities), ["A2", "A3"]);
        assert_eq!(names(&plans[0].evening_activities), ["A4", "A5"]);
        assert_eq!(names(&plans[1].morning_activities), ["A6", "A7"]);
        assert_eq!(names(&plans[1].evening_activities), ["A10", "A11"]);
    }

    #[test]
    fn short_days_use_overlapping_fallbacks() {
        // 6 attractions: 3 per day.
        let plans = build_day_plans(&request(), &attractions(6), None);
        assert_eq!(names(&plans[0].morning_activities), ["A0", "A1"]);
        assert_eq!(names(&plans[0].afternoon_activities), ["A1", "A2"]);
        assert_eq!(names(&plans[0].evening_activities), ["A2"]);
    }

    #[test]
    fn odd_count_gives_day_two_the_extra() {
        let plans = build_day_plans(&request(), &attractions(3), None);
        assert_eq!(names(&plans[0].morning_activities), ["A0"]);
        assert!(plans[0].afternoon_activities.is_empty());
        assert!(plans[0].evening_activities.is_empty());
        assert_eq!(names(&plans[1].morning_activities), ["A1", "A2"]);
        assert_eq!(names(&plans[1].afternoon_activities), ["A2"]);
    }

    #[test]
    fn no_attractions_still_yields_two_days() {
        let plans = build_day_plans(&request(), &[], None);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[1].date, NaiveDate::from_ymd_opt(2024, 6, 16).unwrap());
        assert!(plans.iter().all(|p| p.activities().count() == 0));
        assert!(plans.iter().all(|p| p.total_estimated_cost == 0.0));
    }

    #[test]
    fn meals_come_from_the_matching_day() {
        let dining = DiningPlan {
            restaurants: vec![],
            meals: BTreeMap::from([
                (
                    "day_1".to_owned(),
                    MealGrouping {
                        breakfast: vec![],
                        lunch: vec![restaurant("L1", 15.0), restaurant("L1b", 99.0)],
                        dinner: vec![restaurant("D1", 40.0)],
                    },
                ),
                (
                    "day_2".to_owned(),
                    MealGrouping {
                        breakfast: vec![],
                        lunch: vec![],
                        dinner: vec![restaurant("D2", 30.0)],
                    },
                ),
            ]),
            recommendations: vec![],
        };
        let plans = build_day_plans(&request(), &attractions(4), Some(&dining));

        assert_eq!(plans[0].lunch.as_ref().unwrap().name, "L1");
        assert_eq!(plans[0].dinner.as_ref().unwrap().name, "D1");
        assert!(plans[1].lunch.is_none());
        assert_eq!(plans[1].dinner.as_ref().unwrap().name, "D2");
    }

    #[test]
    fn cost_counts_every_slot_entry_and_scales_by_party() {
        // Day of 3: morning [A0, A1], afternoon [A1, A2], evening [A2]
        // → 5 slot entries × 10 fee.
        let dining = DiningPlan {
            restaurants: vec![],
            meals: BTreeMap::from([(
                "day_1".to_owned(),
                MealGrouping {
                    breakfast: vec![],
                    lunch: vec![restaurant("L", 15.0)],
                    dinner: vec![restaurant("D", 35.0)],
                },
            )]),
            recommendations: vec![],
        };
        let plans = build_day_plans(&request(), &attractions(6), Some(&dining));
        assert_eq!(plans[0].total_estimated_cost, (5.0 * 10.0) * 2.0 + (15.0 + 35.0) * 2.0);
    }

    #[test]
    fn free_attractions_cost_nothing() {
        let free = vec![attraction("Park", None), attraction("Square", Some(0.0))];
        let plans = build_day_plans(&request(), &free, None);
        assert_eq!(plans[0].total_estimated_cost, 0.0);
        assert_eq!(plans[1].total_estimated_cost, 0.0);
    }

    #[test]
    fn building_twice_is_identical() {
        let input = attractions(9);
        assert_eq!(
            build_day_plans(&request(), &input, None),
            build_day_plans(&request(), &input, None)
        );
    }
}
