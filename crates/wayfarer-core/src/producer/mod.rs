//! Producers: the independent subtasks of itinerary planning.
//!
//! Each producer turns a [`TripRequest`](crate::models::TripRequest) plus
//! the gathered [`SharedContext`] into a typed [`ProducerResult`]. They run
//! concurrently in a [`ProducerPool`] and never see each other's output.

pub mod budget;
pub mod explorer;
pub mod extract;
pub mod food;
pub mod pool;
pub mod trait_def;
pub mod types;

pub use budget::BudgetProducer;
pub use explorer::ExplorerProducer;
pub use extract::extract_json;
pub use food::FoodProducer;
pub use pool::ProducerPool;
pub use trait_def::Producer;
pub use types::{
    BucketPercentages, BudgetPlan, DiningPlan, ExplorationPlan, ProducerError, ProducerKind,
    ProducerOutcome, ProducerPayload, ProducerResult, SharedContext, finish,
};
