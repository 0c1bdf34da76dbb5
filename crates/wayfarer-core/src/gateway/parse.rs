//! Provider response decoding.
//!
//! Pure functions over response bodies so they can be tested without a
//! network.

use chrono::{DateTime, Days, NaiveDate};
use serde::Deserialize;

use super::GatewayError;
use crate::models::{ForecastRecord, PlaceRecord};

/// Places results kept per lookup.
pub const MAX_PLACES: usize = 10;

/// Forecast window length after the start date.
const FORECAST_WINDOW_DAYS: u64 = 2;

#[derive(Debug, Deserialize)]
struct ForecastBody {
    #[serde(default)]
    list: Vec<ForecastItem>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt: i64,
    main: ForecastMain,
    #[serde(default)]
    weather: Vec<ForecastWeather>,
    wind: ForecastWind,
}

#[derive(Debug, Deserialize)]
struct ForecastMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ForecastWind {
    speed: f64,
}

/// Decode an OpenWeather 5-day forecast, keeping samples whose UTC
/// timestamp falls within `[start, start + 2 days]`.
pub fn parse_forecast(body: &str, start: NaiveDate) -> Result<Vec<ForecastRecord>, GatewayError> {
    let parsed: ForecastBody =
        serde_json::from_str(body).map_err(|e| GatewayError::Parse(e.to_string()))?;

    let window_start = start.and_time(chrono::NaiveTime::MIN);
    let window_end = start
        .checked_add_days(Days::new(FORECAST_WINDOW_DAYS))
        .ok_or_else(|| GatewayError::Parse(format!("date {start} out of range")))?
        .and_time(chrono::NaiveTime::MIN);

    let records = parsed
        .list
        .into_iter()
        .filter_map(|item| {
            let at = DateTime::from_timestamp(item.dt, 0)?.naive_utc();
            if at < window_start || at > window_end {
                return None;
            }
            Some(ForecastRecord {
                date: at.format("%Y-%m-%d").to_string(),
                time: at.format("%H:%M").to_string(),
                temperature: item.main.temp,
                description: item
                    .weather
                    .into_iter()
                    .next()
                    .map(|w| w.description)
                    .unwrap_or_default(),
                humidity: item.main.humidity,
                wind_speed: item.wind.speed,
            })
        })
        .collect();
    Ok(records)
}

// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GeocodeBody {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Decode a geocoding response into the first result's `(lat, lng)`.
pub fn parse_geocode(body: &str, address: &str) -> Result<(f64, f64), GatewayError> {
    let parsed: GeocodeBody =
        serde_json::from_str(body).map_err(|e| GatewayError::Parse(e.to_string()))?;
    parsed
        .results
        .into_iter()
        .next()
        .map(|r| (r.geometry.location.lat, r.geometry.location.lng))
        .ok_or_else(|| GatewayError::NotFound(address.to_owned()))
}

// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PlacesBody {
    #[serde(default)]
    results: Vec<PlaceItem>,
}

#[derive(Debug, Deserialize)]
struct PlaceItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    rating: f64,
    #[serde(default)]
    price_level: u8,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    vicinity: String,
    #[serde(default)]
    place_id: String,
}

/// Decode a nearby-search response, keeping the first [`MAX_PLACES`].
pub fn parse_places(body: &str) -> Result<Vec<PlaceRecord>, GatewayError> {
    let parsed: PlacesBody =
        serde_json::from_str(body).map_err(|e| GatewayError::Parse(e.to_string()))?;
    Ok(parsed
        .results
        .into_iter()
        .take(MAX_PLACES)
        .map(|p| PlaceRecord {
            name: p.name,
            rating: p.rating,
            price_level: p.price_level,
            types: p.types,
            vicinity: p.vicinity,
            place_id: p.place_id,
        })
        .collect())
}
