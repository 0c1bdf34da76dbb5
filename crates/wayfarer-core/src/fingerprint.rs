//! Canonical cache keys for trip requests.
//!
//! Two requests with the same fingerprint are cache-equivalent. Only the
//! fields that shape the plan's skeleton take part: destination, budget,
//! tier, start date and party size. Preferences and free-text requirements
//! are excluded.
//!
//! Format: `itinerary:<destination>:<budget>:<tier>:<date>:<party>`

use std::fmt;

use crate::models::TripRequest;

/// Key prefix shared by every itinerary fingerprint.
pub const FINGERPRINT_PREFIX: &str = "itinerary:";

/// Deterministic cache key derived from a [`TripRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(request: &TripRequest) -> Self {
        Self(format!(
            "{FINGERPRINT_PREFIX}{}:{:.2}:{}:{}:{}",
            normalize_destination(&request.destination),
            request.budget,
            request.tier,
            request.start_date.format("%Y-%m-%d"),
            request.party_size,
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lowercase, trim, and collapse inner whitespace. `:` is replaced so the
/// destination cannot forge extra key segments.
pub fn normalize_destination(destination: &str) -> String {
    destination
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace(':', "_")
}
