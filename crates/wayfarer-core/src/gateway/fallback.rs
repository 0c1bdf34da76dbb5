//! Synthetic substitutes served when a provider is unavailable.

use chrono::{Days, NaiveDate};

use crate::models::{ForecastRecord, PlaceRecord};

/// Advisories attached to a synthetic forecast.
pub const FALLBACK_ADVISORIES: [&str; 2] = [
    "Pleasant weather expected - perfect for outdoor activities",
    "Pack light layers for temperature variations",
];

/// Two mild samples: the requested date and the day after, both at 09:00.
pub fn synthetic_forecast(date: NaiveDate) -> Vec<ForecastRecord> {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
    vec![
        ForecastRecord {
            date: date.format("%Y-%m-%d").to_string(),
            time: "09:00".to_owned(),
            temperature: 22.0,
            description: "partly cloudy".to_owned(),
            humidity: 65.0,
            wind_speed: 3.2,
        },
        ForecastRecord {
            date: next.format("%Y-%m-%d").to_string(),
            time: "09:00".to_owned(),
            temperature: 24.0,
            description: "sunny".to_owned(),
            humidity: 60.0,
            wind_speed: 2.8,
        },
    ]
}

/// A single downtown place tagged with the requested kind.
pub fn synthetic_places(kind: &str) -> Vec<PlaceRecord> {
    vec![PlaceRecord {
        name: "City Center".to_owned(),
        rating: 4.5,
        price_level: 2,
        types: vec![kind.to_owned(), "point_of_interest".to_owned()],
        vicinity: "Downtown".to_owned(),
        place_id: "synthetic_place_1".to_owned(),
    }]
}
