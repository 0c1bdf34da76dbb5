//! Explorer producer: generates, scores and ranks attractions.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::extract::{extract_json, item_list, parse_items};
use super::trait_def::Producer;
use super::types::{
    ExplorationPlan, ProducerError, ProducerKind, ProducerPayload, ProducerResult, SharedContext,
    finish,
};
use crate::generator::{ContentGenerator, Prompt};
use crate::models::{Attraction, BudgetTier, TRIP_DAYS, TripRequest};

/// Most attractions kept after ranking.
pub const MAX_ATTRACTIONS: usize = 12;

/// Total minutes above which the plan is considered packed.
const PACKED_MINUTES: u32 = 960;

const SYSTEM_PROMPT: &str = "You are an expert travel explorer. You answer with a JSON array \
of attractions and nothing else.";

/// Proposes attractions via the content generator and ranks them against
/// the request.
pub struct ExplorerProducer {
    generator: Arc<dyn ContentGenerator>,
}

impl ExplorerProducer {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }

    async fn explore(
        &self,
        request: &TripRequest,
        context: &SharedContext,
    ) -> Result<ProducerPayload, ProducerError> {
        let text = self.generator.complete(&prompt(request, context)).await?;
        let items = item_list(extract_json(&text)?, "attractions")?;
        let candidates: Vec<Attraction> = parse_items(items, "attraction", Attraction::validate);

        let attractions = rank(candidates, request);
        let recommendations = recommendations(&attractions, request.tier);
        Ok(ProducerPayload::Exploration(ExplorationPlan {
            attractions,
            recommendations,
        }))
    }
}

#[async_trait]
impl Producer for ExplorerProducer {
    fn kind(&self) -> ProducerKind {
        ProducerKind::Explorer
    }

    async fn transform(&self, request: &TripRequest, context: &SharedContext) -> ProducerResult {
        let started = Instant::now();
        let result = self.explore(request, context).await;
        finish(self.kind(), started, result)
    }
}

impl std::fmt::Debug for ExplorerProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorerProducer")
            .field("generator", &self.generator.name())
            .finish()
    }
}

fn prompt(request: &TripRequest, context: &SharedContext) -> Prompt {
    let hints = context.attraction_hints();
    let hints = if hints.is_empty() {
        "none".to_owned()
    } else {
        hints.join(", ")
    };
    let user = format!(
        "Find the top attractions and activities for a {TRIP_DAYS}-day trip to {destination}.\n\
         Travel preferences: {preferences}\n\
         Budget tier: {tier}\n\
         Party size: {party}\n\
         Known nearby places: {hints}\n\n\
         Return a JSON array of 8 to 12 attractions. Each object has: name, description, \
         location, opening_hours, entry_fee (USD per person), estimated_duration (minutes), \
         popularity_score (0-10), uniqueness_score (0-10), category (museum, park, landmark, \
         activity, ...).",
        destination = request.destination,
        preferences = request.preferences_text(),
        tier = request.tier,
        party = request.party_size,
    );
    Prompt::new(SYSTEM_PROMPT, user)
}

/// Relevance of one attraction to the request.
pub fn score(attraction: &Attraction, request: &TripRequest) -> f64 {
    let mut score = (attraction.popularity_score + attraction.uniqueness_score) / 2.0;

    let category = attraction.category.to_lowercase();
    if request.preferences.iter().any(|p| category.contains(p.as_str())) {
        score += 1.0;
    }

    match (request.tier, attraction.entry_fee) {
        (BudgetTier::Economy, Some(fee)) if fee > 50.0 => score -= 1.0,
        (BudgetTier::Premium, Some(fee)) if fee > 0.0 && fee < 20.0 => score -= 0.5,
        _ => {}
    }
    score
}

/// Stable sort by descending score, keeping at most [`MAX_ATTRACTIONS`].
pub fn rank(candidates: Vec<Attraction>, request: &TripRequest) -> Vec<Attraction> {
    let mut scored: Vec<(Attraction, f64)> = candidates
        .into_iter()
        .map(|a| {
            let s = score(&a, request);
            (a, s)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
        .into_iter()
        .take(MAX_ATTRACTIONS)
        .map(|(a, _)| a)
        .collect()
}

fn recommendations(attractions: &[Attraction], tier: BudgetTier) -> Vec<String> {
    let mut advice = Vec::new();

    // Categories in order of first appearance.
    let mut categories: Vec<(&str, usize)> = Vec::new();
    for attraction in attractions {
        match categories.iter().position(|(c, _)| *c == attraction.category) {
            Some(i) => categories[i].1 += 1,
            None => categories.push((attraction.category.as_str(), 1)),
        }
    }
    for (category, count) in categories {
        if count > 1 {
            advice.push(format!(
                "Visit multiple {category}s to get a comprehensive experience"
            ));
        }
    }

    if tier == BudgetTier::Economy {
        let free = attractions
            .iter()
            .filter(|a| a.entry_fee.is_none_or(|fee| fee == 0.0))
            .count();
        if free > 0 {
            advice.push(format!(
                "Consider visiting {free} free attractions to save money"
            ));
        }
    }

    let total_minutes: u32 = attractions.iter().map(|a| a.estimated_duration).sum();
    if total_minutes > PACKED_MINUTES {
        advice.push("Your itinerary is packed - consider prioritizing must-see attractions".to_owned());
    }
    advice
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::generator::{GenerationError, UnconfiguredGenerator};
    use crate::models::TravelPreference;

    struct CannedGenerator(String);

    #[async_trait]
    impl ContentGenerator for CannedGenerator {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _prompt: &Prompt) -> Result<String, GenerationError> {
            Ok(self.0.clone())
        }
    }

    fn request(tier: BudgetTier) -> TripRequest {
        TripRequest {
            destination: "Paris, France".to_owned(),
            budget: 500.0,
            tier,
            preferences: [TravelPreference::Culture].into_iter().collect(),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            party_size: 2,
            special_requirements: None,
        }
    }

    fn attraction(name: &str, category: &str, pop: f64, uniq: f64, fee: Option<f64>) -> Attraction {
        Attraction {
            name: name.to_owned(),
            description: String::new(),
            location: String::new(),
            opening_hours: None,
            entry_fee: fee,
            estimated_duration: 120,
            popularity_score: pop,
            uniqueness_score: uniq,
            category: category.to_owned(),
        }
    }

    #[test]
    fn preference_in_category_boosts_score() {
        let req = request(BudgetTier::Standard);
        let plain = attraction("Park", "park", 8.0, 6.0, None);
        let cultural = attraction("Louvre", "Culture & Art", 8.0, 6.0, None);
        assert_eq!(score(&plain, &req), 7.0);
        assert_eq!(score(&cultural, &req), 8.0);
    }

    #[test]
    fn tier_fee_penalties() {
        let pricey = attraction("Tower", "landmark", 8.0, 8.0, Some(60.0));
        assert_eq!(score(&pricey, &request(BudgetTier::Economy)), 7.0);
        assert_eq!(score(&pricey, &request(BudgetTier::Standard)), 8.0);

        let cheap = attraction("Garden", "park", 8.0, 8.0, Some(10.0));
        assert_eq!(score(&cheap, &request(BudgetTier::Premium)), 7.5);
        let free = attraction("Square", "park", 8.0, 8.0, Some(0.0));
        assert_eq!(score(&free, &request(BudgetTier::Premium)), 8.0);
    }

    #[test]
    fn rank_is_stable_and_truncated() {
        let req = request(BudgetTier::Standard);
        let mut candidates: Vec<_> = (0..15)
            .map(|i| attraction(&format!("A{i}"), "park", 5.0, 5.0, None))
            .collect();
        candidates.push(attraction("Top", "landmark", 10.0, 10.0, None));

        let ranked = rank(candidates, &req);
        assert_eq!(ranked.len(), MAX_ATTRACTIONS);
        assert_eq!(ranked[0].name, "Top");
        // Ties keep input order.
        assert_eq!(ranked[1].name, "A0");
        assert_eq!(ranked[11].name, "A10");
    }

    #[test]
    fn recommendations_cover_categories_free_entries_and_duration() {
        let mut attractions = vec![
            attraction("A", "museum", 5.0, 5.0, Some(0.0)),
            attraction("B", "museum", 5.0, 5.0, None),
            attraction("C", "park", 5.0, 5.0, Some(12.0)),
        ];
        for a in &mut attractions {
            a.estimated_duration = 400;
        }
        let advice = recommendations(&attractions, BudgetTier::Economy);
        assert_eq!(
            advice,
            vec![
                "Visit multiple museums to get a comprehensive experience".to_owned(),
                "Consider visiting 2 free attractions to save money".to_owned(),
                "Your itinerary is packed - consider prioritizing must-see attractions".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn transform_parses_scores_and_skips_invalid() {
        let canned = serde_json::json!([
            { "name": "Louvre", "description": "Art", "location": "1er", "entry_fee": 17.0,
              "estimated_duration": 180, "popularity_score": 9.5, "uniqueness_score": 9.0,
              "category": "culture" },
            { "name": "Broken", "description": "", "location": "", "estimated_duration": 60,
              "popularity_score": 42.0, "uniqueness_score": 1.0, "category": "park" },
            { "name": "Jardin", "description": "Park", "location": "6e",
              "estimated_duration": 90, "popularity_score": 7.0, "uniqueness_score": 6.0,
              "category": "park" }
        ]);
        let producer =
            ExplorerProducer::new(Arc::new(CannedGenerator(format!("Sure!\n{canned}\n"))));
        let result = producer
            .transform(&request(BudgetTier::Standard), &SharedContext::default())
            .await;

        let Some(ProducerPayload::Exploration(plan)) = result.payload() else {
            panic!("expected exploration payload, got {result:?}");
        };
        let names: Vec<_> = plan.attractions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Louvre", "Jardin"]);
    }

    #[tokio::test]
    async fn generator_refusal_is_a_failure() {
        let producer = ExplorerProducer::new(Arc::new(UnconfiguredGenerator));
        let result = producer
            .transform(&request(BudgetTier::Standard), &SharedContext::default())
            .await;
        assert!(!result.is_ok());
        assert!(result.error().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn prose_without_json_is_a_failure() {
        let producer =
            ExplorerProducer::new(Arc::new(CannedGenerator("I cannot help.".to_owned())));
        let result = producer
            .transform(&request(BudgetTier::Standard), &SharedContext::default())
            .await;
        assert!(result.error().unwrap().contains("malformed"));
    }
}
