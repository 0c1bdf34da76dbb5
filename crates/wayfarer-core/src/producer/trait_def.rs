//! The `Producer` trait: one independent subtask of itinerary planning.

use async_trait::async_trait;

use super::types::{ProducerKind, ProducerResult, SharedContext};
use crate::models::TripRequest;

/// A planning subtask run concurrently with its siblings.
///
/// Implementations must not fail past their own boundary: every internal
/// error is reported as `ProducerOutcome::Failure` (usually via
/// [`super::finish`]). Producers never see each other's output.
///
/// # Object Safety
///
/// This trait is object-safe so producers can be held as
/// `Arc<dyn Producer>` in a [`super::ProducerPool`].
#[async_trait]
pub trait Producer: Send + Sync {
    fn kind(&self) -> ProducerKind;

    /// Transform the request (plus gathered gateway data) into a typed
    /// partial result.
    async fn transform(&self, request: &TripRequest, context: &SharedContext) -> ProducerResult;
}

// Compile-time assertion: Producer must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Producer) {}
};
