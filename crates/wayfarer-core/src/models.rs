use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Number of days every itinerary covers.
pub const TRIP_DAYS: u32 = 2;

/// Largest party a single request may plan for.
pub const MAX_PARTY_SIZE: u32 = 10;

/// Fixed boilerplate attached to every itinerary.
pub const EMERGENCY_CONTACTS: [&str; 4] = [
    "Local Emergency: 911 (or local emergency number)",
    "Tourist Information Center",
    "Your accommodation front desk",
    "Local embassy/consulate (if international travel)",
];

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Spending tier of a trip. Drives the default budget split and producer
/// scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    #[serde(alias = "budget")]
    Economy,
    #[serde(alias = "moderate")]
    Standard,
    #[serde(alias = "luxury")]
    Premium,
}

impl fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Economy => "economy",
            Self::Standard => "standard",
            Self::Premium => "premium",
        };
        f.write_str(s)
    }
}

impl FromStr for BudgetTier {
    type Err = BudgetTierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "economy" | "budget" => Ok(Self::Economy),
            "standard" | "moderate" => Ok(Self::Standard),
            "premium" | "luxury" => Ok(Self::Premium),
            other => Err(BudgetTierParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`BudgetTier`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid budget tier: {0:?}")]
pub struct BudgetTierParseError(pub String);

// ---------------------------------------------------------------------------

/// Preference tag attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelPreference {
    Adventure,
    Culture,
    Relaxation,
    Food,
    Nightlife,
    Family,
}

impl TravelPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adventure => "adventure",
            Self::Culture => "culture",
            Self::Relaxation => "relaxation",
            Self::Food => "food",
            Self::Nightlife => "nightlife",
            Self::Family => "family",
        }
    }
}

impl fmt::Display for TravelPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelPreference {
    type Err = TravelPreferenceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adventure" => Ok(Self::Adventure),
            "culture" => Ok(Self::Culture),
            "relaxation" => Ok(Self::Relaxation),
            "food" => Ok(Self::Food),
            "nightlife" => Ok(Self::Nightlife),
            "family" => Ok(Self::Family),
            other => Err(TravelPreferenceParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TravelPreference`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid travel preference: {0:?}")]
pub struct TravelPreferenceParseError(pub String);

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Why a [`TripRequest`] was rejected before planning started.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("destination must not be empty")]
    EmptyDestination,

    #[error("budget must be a positive finite number, got {0}")]
    InvalidBudget(f64),

    #[error("party size must be between 1 and 10, got {0}")]
    PartySize(u32),
}

/// A structured trip request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    pub destination: String,
    /// Total budget for the whole party.
    pub budget: f64,
    #[serde(alias = "budget_category")]
    pub tier: BudgetTier,
    #[serde(default, alias = "travel_preferences")]
    pub preferences: BTreeSet<TravelPreference>,
    pub start_date: NaiveDate,
    #[serde(default = "default_party_size", alias = "group_size")]
    pub party_size: u32,
    #[serde(default)]
    pub special_requirements: Option<String>,
}

fn default_party_size() -> u32 {
    1
}

impl TripRequest {
    /// Check the well-formedness rules the pipeline relies on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.destination.trim().is_empty() {
            return Err(ValidationError::EmptyDestination);
        }
        if !self.budget.is_finite() || self.budget <= 0.0 {
            return Err(ValidationError::InvalidBudget(self.budget));
        }
        if !(1..=MAX_PARTY_SIZE).contains(&self.party_size) {
            return Err(ValidationError::PartySize(self.party_size));
        }
        Ok(())
    }

    /// Calendar date of the 1-based `day` of the trip.
    pub fn day_date(&self, day: u32) -> NaiveDate {
        self.start_date
            .checked_add_days(Days::new(u64::from(day.saturating_sub(1))))
            .unwrap_or(self.start_date)
    }

    /// Comma-separated preference tags, in stable order.
    pub fn preferences_text(&self) -> String {
        self.preferences
            .iter()
            .map(TravelPreference::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ---------------------------------------------------------------------------
// Producer records
// ---------------------------------------------------------------------------

/// A point of interest proposed by the exploration producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attraction {
    pub name: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub opening_hours: Option<String>,
    /// Per-person entry fee.
    #[serde(default)]
    pub entry_fee: Option<f64>,
    /// Minutes.
    pub estimated_duration: u32,
    /// 0-10.
    pub popularity_score: f64,
    /// 0-10.
    pub uniqueness_score: f64,
    pub category: String,
}

impl Attraction {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=10.0).contains(&self.popularity_score) {
            return Err(format!("popularity_score {} outside 0-10", self.popularity_score));
        }
        if !(0.0..=10.0).contains(&self.uniqueness_score) {
            return Err(format!("uniqueness_score {} outside 0-10", self.uniqueness_score));
        }
        Ok(())
    }
}

/// A dining candidate proposed by the food producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub name: String,
    pub cuisine_type: String,
    /// `$` to `$$$$`.
    pub price_range: String,
    /// 0-5.
    pub rating: f64,
    pub location: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub opening_hours: Option<String>,
    pub estimated_cost_per_person: f64,
    #[serde(default)]
    pub must_try_dishes: Vec<String>,
    #[serde(default)]
    pub fun_tips: Vec<String>,
}

impl Restaurant {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(format!("rating {} outside 0-5", self.rating));
        }
        if !self.estimated_cost_per_person.is_finite() || self.estimated_cost_per_person < 0.0 {
            return Err(format!(
                "estimated_cost_per_person {} is not a valid cost",
                self.estimated_cost_per_person
            ));
        }
        Ok(())
    }

    /// Whether the price range is `$` or `$$`.
    pub fn is_inexpensive(&self) -> bool {
        matches!(self.price_range.as_str(), "$" | "$$")
    }
}

/// Dining candidates for one day, grouped by meal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealGrouping {
    #[serde(default)]
    pub breakfast: Vec<Restaurant>,
    #[serde(default)]
    pub lunch: Vec<Restaurant>,
    #[serde(default)]
    pub dinner: Vec<Restaurant>,
}

// ---------------------------------------------------------------------------
// Gateway records
// ---------------------------------------------------------------------------

/// One forecast sample for the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    /// `YYYY-MM-DD`.
    pub date: String,
    /// `HH:MM`.
    pub time: String,
    /// Degrees Celsius.
    pub temperature: f64,
    pub description: String,
    pub humidity: f64,
    pub wind_speed: f64,
}

/// A nearby place returned by the places provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub name: String,
    pub rating: f64,
    pub price_level: u8,
    pub types: Vec<String>,
    pub vicinity: String,
    pub place_id: String,
}

// ---------------------------------------------------------------------------
// Plan output
// ---------------------------------------------------------------------------

/// How the total budget is split across spending buckets.
///
/// `miscellaneous` is the reserve that absorbs activity overruns during
/// reconciliation. `remaining_budget` is `total_budget` minus the bucket sum
/// and goes negative when the plan is over budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub total_budget: f64,
    #[serde(default)]
    pub accommodation: f64,
    #[serde(default)]
    pub transportation: f64,
    #[serde(default)]
    pub food: f64,
    #[serde(default)]
    pub activities: f64,
    #[serde(default)]
    pub miscellaneous: f64,
    #[serde(default)]
    pub remaining_budget: f64,
}

impl BudgetAllocation {
    /// Sum of the five spending buckets.
    pub fn allocated(&self) -> f64 {
        self.accommodation + self.transportation + self.food + self.activities + self.miscellaneous
    }
}

/// The plan for a single day of the trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    /// 1-based.
    pub day: u32,
    pub date: NaiveDate,
    pub morning_activities: Vec<Attraction>,
    pub lunch: Option<Restaurant>,
    pub afternoon_activities: Vec<Attraction>,
    pub dinner: Option<Restaurant>,
    pub evening_activities: Vec<Attraction>,
    /// Priced components scaled by party size.
    pub total_estimated_cost: f64,
}

impl DayPlan {
    /// All scheduled activities in slot order.
    pub fn activities(&self) -> impl Iterator<Item = &Attraction> {
        self.morning_activities
            .iter()
            .chain(&self.afternoon_activities)
            .chain(&self.evening_activities)
    }
}

/// Per-producer outcome summary carried on the itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerReport {
    pub producer: String,
    pub ok: bool,
    pub elapsed_secs: f64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Which place lookups were answered with synthetic fallback data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacesFallback {
    pub attractions: bool,
    pub restaurants: bool,
}

impl PlacesFallback {
    pub fn any(&self) -> bool {
        self.attractions || self.restaurants
    }
}

/// The final artifact: what the cache stores and the caller receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub fingerprint: String,
    pub request: TripRequest,
    pub budget_breakdown: BudgetAllocation,
    pub day_plans: Vec<DayPlan>,
    pub total_estimated_cost: f64,
    pub budget_utilization_percentage: f64,
    pub recommendations: Vec<String>,
    pub emergency_contacts: Vec<String>,
    pub weather_forecast: Vec<ForecastRecord>,
    /// `true` when the forecast came from synthetic fallback data.
    pub forecast_fallback_used: bool,
    #[serde(default)]
    pub places_fallback_used: PlacesFallback,
    pub producer_reports: Vec<ProducerReport>,
    pub created_at: DateTime<Utc>,
}

impl Itinerary {
    pub fn destination(&self) -> &str {
        &self.request.destination
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TripRequest {
        TripRequest {
            destination: "Lisbon, Portugal".to_owned(),
            budget: 800.0,
            tier: BudgetTier::Standard,
            preferences: [TravelPreference::Food, TravelPreference::Culture]
                .into_iter()
                .collect(),
            start_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            party_size: 2,
            special_requirements: None,
        }
    }

    #[test]
    fn tier_parses_aliases() {
        assert_eq!("budget".parse::<BudgetTier>().unwrap(), BudgetTier::Economy);
        assert_eq!("moderate".parse::<BudgetTier>().unwrap(), BudgetTier::Standard);
        assert_eq!("luxury".parse::<BudgetTier>().unwrap(), BudgetTier::Premium);
        assert!("cheap".parse::<BudgetTier>().is_err());
    }

    #[test]
    fn tier_display_roundtrips() {
        for tier in [BudgetTier::Economy, BudgetTier::Standard, BudgetTier::Premium] {
            assert_eq!(tier.to_string().parse::<BudgetTier>().unwrap(), tier);
        }
    }

    #[test]
    fn request_deserializes_legacy_field_names() {
        let req: TripRequest = serde_json::from_value(serde_json::json!({
            "destination": "Rome, Italy",
            "budget": 300.0,
            "budget_category": "luxury",
            "travel_preferences": ["culture"],
            "start_date": "2024-08-01",
            "group_size": 3
        }))
        .unwrap();
        assert_eq!(req.tier, BudgetTier::Premium);
        assert_eq!(req.party_size, 3);
        assert!(req.preferences.contains(&TravelPreference::Culture));
    }

    #[test]
    fn validate_accepts_well_formed_request() {
        assert_eq!(request().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let mut req = request();
        req.destination = "   ".to_owned();
        assert_eq!(req.validate(), Err(ValidationError::EmptyDestination));

        let mut req = request();
        req.budget = 0.0;
        assert_eq!(req.validate(), Err(ValidationError::InvalidBudget(0.0)));

        let mut req = request();
        req.party_size = 11;
        assert_eq!(req.validate(), Err(ValidationError::PartySize(11)));
    }

    #[test]
    fn day_date_crosses_year_boundary() {
        let req = request();
        assert_eq!(req.day_date(1), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(req.day_date(2), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn preferences_text_is_sorted() {
        assert_eq!(request().preferences_text(), "culture, food");
    }

    #[test]
    fn restaurant_validation_checks_rating() {
        let mut r = Restaurant {
            name: "Tasca".to_owned(),
            cuisine_type: "Portuguese".to_owned(),
            price_range: "$$".to_owned(),
            rating: 4.2,
            location: "Alfama".to_owned(),
            specialties: vec![],
            opening_hours: None,
            estimated_cost_per_person: 20.0,
            must_try_dishes: vec![],
            fun_tips: vec![],
        };
        assert!(r.validate().is_ok());
        assert!(r.is_inexpensive());
        r.rating = 7.0;
        assert!(r.validate().is_err());
    }
}
