//! Food producer: dining candidates, meal groupings and dining advice.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::extract::{extract_json, item_list, parse_items};
use super::trait_def::Producer;
use super::types::{
    DiningPlan, ProducerError, ProducerKind, ProducerPayload, ProducerResult, SharedContext,
    finish,
};
use crate::generator::{ContentGenerator, Prompt};
use crate::models::{BudgetTier, MealGrouping, Restaurant, TRIP_DAYS, TripRequest};

const SYSTEM_PROMPT: &str = "You are an expert food and dining guide with deep local knowledge. \
You answer with a JSON array of restaurants and nothing else.";

/// Proposes restaurants via the content generator and groups them by meal.
pub struct FoodProducer {
    generator: Arc<dyn ContentGenerator>,
}

impl FoodProducer {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }

    async fn dine(
        &self,
        request: &TripRequest,
        context: &SharedContext,
    ) -> Result<ProducerPayload, ProducerError> {
        let text = self.generator.complete(&prompt(request, context)).await?;
        let items = item_list(extract_json(&text)?, "restaurants")?;
        let restaurants: Vec<Restaurant> = parse_items(items, "restaurant", Restaurant::validate);

        Ok(ProducerPayload::Dining(DiningPlan {
            meals: meal_groupings(&restaurants),
            recommendations: recommendations(&restaurants, request.tier),
            restaurants,
        }))
    }
}

#[async_trait]
impl Producer for FoodProducer {
    fn kind(&self) -> ProducerKind {
        ProducerKind::Food
    }

    async fn transform(&self, request: &TripRequest, context: &SharedContext) -> ProducerResult {
        let started = Instant::now();
        let result = self.dine(request, context).await;
        finish(self.kind(), started, result)
    }
}

impl std::fmt::Debug for FoodProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoodProducer")
            .field("generator", &self.generator.name())
            .finish()
    }
}

fn prompt(request: &TripRequest, context: &SharedContext) -> Prompt {
    let hints = context.restaurant_hints();
    let hints = if hints.is_empty() {
        "none".to_owned()
    } else {
        hints.join(", ")
    };
    let user = format!(
        "Create a culinary guide for a {TRIP_DAYS}-day trip to {destination}.\n\
         Travel preferences: {preferences}\n\
         Budget tier: {tier}\n\
         Party size: {party}\n\
         Special requirements: {requirements}\n\
         Known nearby restaurants: {hints}\n\n\
         Return a JSON array of 12 to 15 places mixing traditional restaurants, street food, \
         breakfast spots, cafes and splurges. Each object has: name, cuisine_type, price_range \
         ($ to $$$$), rating (0-5), location, specialties, opening_hours, \
         estimated_cost_per_person (USD), must_try_dishes, fun_tips.",
        destination = request.destination,
        preferences = request.preferences_text(),
        tier = request.tier,
        party = request.party_size,
        requirements = request.special_requirements.as_deref().unwrap_or("none"),
    );
    Prompt::new(SYSTEM_PROMPT, user)
}

// ---------------------------------------------------------------------------
// Meal groupings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

/// Classify by name keywords, falling back to price: `$`/`$$` is lunch,
/// anything pricier is dinner.
pub fn classify_meal(restaurant: &Restaurant) -> Meal {
    let name = restaurant.name.to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|w| name.contains(w));

    if has_any(&["cafe", "coffee", "breakfast", "brunch"]) {
        Meal::Breakfast
    } else if has_any(&["lunch", "bistro", "deli"]) {
        Meal::Lunch
    } else if has_any(&["dinner", "restaurant", "fine"]) {
        Meal::Dinner
    } else if restaurant.is_inexpensive() {
        Meal::Lunch
    } else {
        Meal::Dinner
    }
}

/// `items[start..end]`, clamped to the slice bounds.
fn window(items: &[Restaurant], start: usize, end: usize) -> Vec<Restaurant> {
    let end = end.min(items.len());
    let start = start.min(end);
    items[start..end].to_vec()
}

/// Day 1: the first two of the bucket, or `span` entries of the full list
/// from `fallback_start`, or the first overall.
fn first_day(bucket: &[Restaurant], all: &[Restaurant], fallback_start: usize, span: usize) -> Vec<Restaurant> {
    if !bucket.is_empty() {
        window(bucket, 0, 2)
    } else if all.len() > fallback_start {
        window(all, fallback_start, fallback_start + span)
    } else {
        window(all, 0, 1)
    }
}

/// Day 2: the bucket's third and fourth, or its first, or `span` entries of
/// the full list from `fallback_start`, or the first overall.
fn second_day(bucket: &[Restaurant], all: &[Restaurant], fallback_start: usize, span: usize) -> Vec<Restaurant> {
    if bucket.len() > 2 {
        window(bucket, 2, 4)
    } else if !bucket.is_empty() {
        window(bucket, 0, 1)
    } else if all.len() > fallback_start {
        window(all, fallback_start, fallback_start + span)
    } else {
        window(all, 0, 1)
    }
}

/// Per-day meal groupings keyed `day_1` and `day_2`.
pub fn meal_groupings(restaurants: &[Restaurant]) -> BTreeMap<String, MealGrouping> {
    let mut breakfast = Vec::new();
    let mut lunch = Vec::new();
    let mut dinner = Vec::new();
    for r in restaurants {
        match classify_meal(r) {
            Meal::Breakfast => breakfast.push(r.clone()),
            Meal::Lunch => lunch.push(r.clone()),
            Meal::Dinner => dinner.push(r.clone()),
        }
    }

    let day_1 = MealGrouping {
        breakfast: first_day(&breakfast, restaurants, 0, 1),
        lunch: first_day(&lunch, restaurants, 1, 2),
        dinner: first_day(&dinner, restaurants, 2, 2),
    };
    let day_2 = MealGrouping {
        breakfast: second_day(&breakfast, restaurants, 4, 1),
        lunch: second_day(&lunch, restaurants, 5, 2),
        dinner: second_day(&dinner, restaurants, 7, 2),
    };

    BTreeMap::from([
        (DiningPlan::day_key(1), day_1),
        (DiningPlan::day_key(2), day_2),
    ])
}

// ---------------------------------------------------------------------------
// Advice
// ---------------------------------------------------------------------------

fn recommendations(restaurants: &[Restaurant], tier: BudgetTier) -> Vec<String> {
    let mut advice = Vec::new();

    match tier {
        BudgetTier::Economy => {
            let cheap = restaurants.iter().filter(|r| r.is_inexpensive()).count();
            if cheap > 0 {
                advice.push(format!(
                    "Focus on {cheap} budget-friendly restaurants to maximize your food budget"
                ));
            }
            advice.extend(
                [
                    "Try local street food and markets for authentic flavors at great prices",
                    "Look for lunch specials and early bird dinner deals",
                    "Consider sharing dishes to try more variety",
                ]
                .map(str::to_owned),
            );
        }
        BudgetTier::Premium => {
            let upscale = restaurants
                .iter()
                .filter(|r| matches!(r.price_range.as_str(), "$$$" | "$$$$"))
                .count();
            if upscale > 0 {
                advice.push(format!("Indulge in {upscale} premium dining experiences"));
            }
            advice.extend(
                [
                    "Make reservations at top-rated restaurants in advance",
                    "Try local specialties at fine dining establishments",
                    "Consider wine pairings and tasting menus",
                ]
                .map(str::to_owned),
            );
        }
        BudgetTier::Standard => {
            advice.extend(
                [
                    "Mix of casual and upscale dining experiences",
                    "Try local specialties at mid-range restaurants",
                    "Balance between restaurants and local food markets",
                ]
                .map(str::to_owned),
            );
        }
    }

    let mut cuisines: Vec<&str> = Vec::new();
    for r in restaurants {
        if !cuisines.contains(&r.cuisine_type.as_str()) {
            cuisines.push(&r.cuisine_type);
        }
    }
    if cuisines.len() > 3 {
        advice.push(format!(
            "Experience diverse cuisines: {}",
            cuisines[..3].join(", ")
        ));
    }

    let has_local = restaurants.iter().any(|r| {
        let cuisine = r.cuisine_type.to_lowercase();
        cuisine.contains("local") || cuisine.contains("traditional")
    });
    if has_local {
        advice.push("Don't miss the local traditional restaurants for authentic experiences".to_owned());
    }
    advice
}
