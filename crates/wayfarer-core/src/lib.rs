//! Trip-plan orchestration core.
//!
//! The [`orchestrator::Orchestrator`] turns a [`models::TripRequest`] into a
//! two-day [`models::Itinerary`] by gathering reference data through the
//! [`gateway`], fanning out to the [`producer`] pool, merging the partial
//! results ([`dayplan`], [`budget`]) and memoizing the artifact in the
//! [`cache`] under the request [`fingerprint`].

pub mod budget;
pub mod cache;
pub mod dayplan;
pub mod fingerprint;
pub mod gateway;
pub mod generator;
pub mod models;
pub mod orchestrator;
pub mod producer;
