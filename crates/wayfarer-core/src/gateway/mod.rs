//! External reference data: weather forecast and points of interest.
//!
//! Every lookup returns a [`GatewayResult`]. Live data comes back as
//! `Fetched`; a missing credential, non-success status, timeout, transport
//! or decode failure yields `Fallback` with synthetic records instead. The
//! gateway never returns an error to its caller.
//!
//! A [`Gateway`] owns its HTTP session and memoizes fetched results for its
//! own lifetime, so open one per pipeline run and let it drop.

pub mod fallback;
pub mod parse;

use std::collections::HashMap;
use std::env;
use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;

use crate::fingerprint::normalize_destination;
use crate::models::{ForecastRecord, PlaceRecord};

pub use fallback::FALLBACK_ADVISORIES;

/// Nearby-search radius in meters.
pub const PLACES_RADIUS_METERS: u32 = 5000;

/// Internal fetch failures. Converted to `Fallback` at the gateway boundary.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("missing credential {0}")]
    MissingCredential(&'static str),

    #[error("http session unavailable")]
    NoSession,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("malformed provider response: {0}")]
    Parse(String),

    #[error("no geocoding result for {0:?}")]
    NotFound(String),
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Records from a live provider, or a flagged synthetic substitute.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResult<T> {
    Fetched { records: Vec<T> },
    Fallback { records: Vec<T> },
}

impl<T> GatewayResult<T> {
    pub fn records(&self) -> &[T] {
        match self {
            Self::Fetched { records } | Self::Fallback { records } => records,
        }
    }

    pub fn into_records(self) -> Vec<T> {
        match self {
            Self::Fetched { records } | Self::Fallback { records } => records,
        }
    }

    pub fn fallback_used(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Credentials, timeout and provider endpoints.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub openweather_api_key: Option<String>,
    pub google_places_api_key: Option<String>,
    pub google_maps_api_key: Option<String>,
    /// Applied to each HTTP request.
    pub timeout: Duration,
    pub openweather_base_url: String,
    pub google_maps_base_url: String,
}

impl GatewayConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
    pub const DEFAULT_OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";
    pub const DEFAULT_GOOGLE_MAPS_BASE_URL: &str = "https://maps.googleapis.com";

    /// Read credentials from `OPENWEATHER_API_KEY`, `GOOGLE_PLACES_API_KEY`
    /// and `GOOGLE_MAPS_API_KEY`; timeout from
    /// `WAYFARER_GATEWAY_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let timeout_secs = env::var("WAYFARER_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::DEFAULT_TIMEOUT_SECS);
        Self {
            openweather_api_key: non_empty_env("OPENWEATHER_API_KEY"),
            google_places_api_key: non_empty_env("GOOGLE_PLACES_API_KEY"),
            google_maps_api_key: non_empty_env("GOOGLE_MAPS_API_KEY"),
            timeout: Duration::from_secs(timeout_secs),
            openweather_base_url: non_empty_env("WAYFARER_OPENWEATHER_URL")
                .unwrap_or_else(|| Self::DEFAULT_OPENWEATHER_BASE_URL.to_owned()),
            google_maps_base_url: non_empty_env("WAYFARER_GOOGLE_MAPS_URL")
                .unwrap_or_else(|| Self::DEFAULT_GOOGLE_MAPS_BASE_URL.to_owned()),
        }
    }

    /// No credentials: every lookup falls back without touching the network.
    pub fn offline() -> Self {
        Self {
            openweather_api_key: None,
            google_places_api_key: None,
            google_maps_api_key: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            openweather_base_url: Self::DEFAULT_OPENWEATHER_BASE_URL.to_owned(),
            google_maps_base_url: Self::DEFAULT_GOOGLE_MAPS_BASE_URL.to_owned(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn credential<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, GatewayError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::MissingCredential(name))
}

/// Split `"City, Country, ..."` on the first comma.
fn split_destination(destination: &str) -> (&str, &str) {
    match destination.split_once(',') {
        Some((city, rest)) => {
            let country = rest.split(',').next().unwrap_or_default();
            (city.trim(), country.trim())
        }
        None => (destination.trim(), ""),
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

type MemoKey = (String, String);

/// A scoped handle onto the external providers.
pub struct Gateway {
    /// `None` only if the TLS backend failed to initialize; every lookup then
    /// falls back.
    client: Option<reqwest::Client>,
    config: GatewayConfig,
    forecasts: Mutex<HashMap<MemoKey, Vec<ForecastRecord>>>,
    places: Mutex<HashMap<MemoKey, Vec<PlaceRecord>>>,
}

impl Gateway {
    pub fn open(config: GatewayConfig) -> Self {
        let client = match reqwest::Client::builder().timeout(config.timeout).build() {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "http client unavailable, gateway will serve fallback data");
                None
            }
        };
        Self {
            client,
            config,
            forecasts: Mutex::new(HashMap::new()),
            places: Mutex::new(HashMap::new()),
        }
    }

    /// Forecast samples for `location` covering `date` and the next two days.
    pub async fn forecast(&self, location: &str, date: NaiveDate) -> GatewayResult<ForecastRecord> {
        let key = (normalize_destination(location), date.to_string());
        if let Some(records) = memo_get(&self.forecasts, &key) {
            return GatewayResult::Fetched { records };
        }

        match self.fetch_forecast(location, date).await {
            Ok(records) => {
                tracing::debug!(location, %date, count = records.len(), "forecast fetched");
                memo_put(&self.forecasts, key, &records);
                GatewayResult::Fetched { records }
            }
            Err(e) => {
                tracing::warn!(location, %date, error = %e, "forecast unavailable, using fallback");
                GatewayResult::Fallback {
                    records: fallback::synthetic_forecast(date),
                }
            }
        }
    }

    /// Up to ten places of type `kind` near `location`.
    pub async fn points_of_interest(&self, location: &str, kind: &str) -> GatewayResult<PlaceRecord> {
        let key = (normalize_destination(location), kind.to_owned());
        if let Some(records) = memo_get(&self.places, &key) {
            return GatewayResult::Fetched { records };
        }

        match self.fetch_places(location, kind).await {
            Ok(records) => {
                tracing::debug!(location, kind, count = records.len(), "places fetched");
                memo_put(&self.places, key, &records);
                GatewayResult::Fetched { records }
            }
            Err(e) => {
                tracing::warn!(location, kind, error = %e, "places unavailable, using fallback");
                GatewayResult::Fallback {
                    records: fallback::synthetic_places(kind),
                }
            }
        }
    }

    fn client(&self) -> Result<&reqwest::Client, GatewayError> {
        self.client.as_ref().ok_or(GatewayError::NoSession)
    }

    async fn get_body(&self, url: &str, query: &[(&str, &str)]) -> Result<String, GatewayError> {
        let response = self.client()?.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    async fn fetch_forecast(
        &self,
        location: &str,
        date: NaiveDate,
    ) -> Result<Vec<ForecastRecord>, GatewayError> {
        let api_key = credential(&self.config.openweather_api_key, "OPENWEATHER_API_KEY")?;
        let (city, country) = split_destination(location);
        let q = if country.is_empty() {
            city.to_owned()
        } else {
            format!("{city},{country}")
        };
        let url = format!(
            "{}/data/2.5/forecast",
            self.config.openweather_base_url.trim_end_matches('/')
        );
        let body = self
            .get_body(&url, &[("q", q.as_str()), ("appid", api_key), ("units", "metric")])
            .await?;
        parse::parse_forecast(&body, date)
    }

    async fn fetch_places(&self, location: &str, kind: &str) -> Result<Vec<PlaceRecord>, GatewayError> {
        let places_key = credential(&self.config.google_places_api_key, "GOOGLE_PLACES_API_KEY")?;
        let (lat, lng) = self.geocode(location).await?;

        let url = format!(
            "{}/maps/api/place/nearbysearch/json",
            self.config.google_maps_base_url.trim_end_matches('/')
        );
        let coords = format!("{lat},{lng}");
        let radius = PLACES_RADIUS_METERS.to_string();
        let body = self
            .get_body(
                &url,
                &[
                    ("location", coords.as_str()),
                    ("radius", radius.as_str()),
                    ("type", kind),
                    ("key", places_key),
                ],
            )
            .await?;
        parse::parse_places(&body)
    }

    async fn geocode(&self, address: &str) -> Result<(f64, f64), GatewayError> {
        let maps_key = credential(&self.config.google_maps_api_key, "GOOGLE_MAPS_API_KEY")?;
        let url = format!(
            "{}/maps/api/geocode/json",
            self.config.google_maps_base_url.trim_end_matches('/')
        );
        let body = self
            .get_body(&url, &[("address", address), ("key", maps_key)])
            .await?;
        parse::parse_geocode(&body, address)
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("session", &self.client.is_some())
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

fn memo_get<T: Clone>(memo: &Mutex<HashMap<MemoKey, Vec<T>>>, key: &MemoKey) -> Option<Vec<T>> {
    memo.lock().ok()?.get(key).cloned()
}

fn memo_put<T: Clone>(memo: &Mutex<HashMap<MemoKey, Vec<T>>>, key: MemoKey, records: &[T]) {
    if let Ok(mut memo) = memo.lock() {
        memo.insert(key, records.to_vec());
    }
}

// ---------------------------------------------------------------------------
// Advisories
// ---------------------------------------------------------------------------

/// Average temperature below which a cold advisory is issued.
const COLD_BELOW_CELSIUS: f64 = 10.0;
/// Average temperature above which a warm advisory is issued.
const WARM_ABOVE_CELSIUS: f64 = 25.0;

/// Packing and scheduling advice derived from a forecast.
pub fn forecast_advisories(forecast: &GatewayResult<ForecastRecord>) -> Vec<String> {
    let records = match forecast {
        GatewayResult::Fallback { .. } => {
            return FALLBACK_ADVISORIES.iter().map(|s| (*s).to_owned()).collect();
        }
        GatewayResult::Fetched { records } => records,
    };

    if records.is_empty() {
        return vec!["Check local weather before your trip".to_owned()];
    }

    let mut advisories = Vec::new();
    let average = records.iter().map(|r| r.temperature).sum::<f64>() / records.len() as f64;
    if average < COLD_BELOW_CELSIUS {
        advisories.push("Cold weather expected - pack warm clothing and layers".to_owned());
    } else if average > WARM_ABOVE_CELSIUS {
        advisories.push("Warm weather expected - pack light clothing and sunscreen".to_owned());
    }

    let mentions = |word: &str| records.iter().any(|r| r.description.to_lowercase().contains(word));
    if mentions("rain") {
        advisories.push("Rain expected - pack rain gear and consider indoor activities".to_owned());
    }
    if mentions("snow") {
        advisories.push("Snow expected - pack winter gear and check road conditions".to_owned());
    }
    advisories
}
