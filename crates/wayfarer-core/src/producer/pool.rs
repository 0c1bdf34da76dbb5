//! Producer pool: a fixed set of producers run concurrently per request.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;

use super::budget::BudgetProducer;
use super::explorer::ExplorerProducer;
use super::food::FoodProducer;
use super::trait_def::Producer;
use super::types::{ProducerKind, ProducerResult, SharedContext};
use crate::generator::ContentGenerator;
use crate::models::TripRequest;

/// An ordered collection of producers.
///
/// [`ProducerPool::run_all`] returns one result per producer in
/// registration order, whatever order they finish in.
#[derive(Default, Clone)]
pub struct ProducerPool {
    producers: Vec<Arc<dyn Producer>>,
}

impl ProducerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explorer, budget and food, in that order.
    pub fn standard(generator: Arc<dyn ContentGenerator>) -> Self {
        Self::new()
            .with(ExplorerProducer::new(Arc::clone(&generator)))
            .with(BudgetProducer::new())
            .with(FoodProducer::new(generator))
    }

    /// Append a producer.
    pub fn register(&mut self, producer: impl Producer + 'static) {
        self.producers.push(Arc::new(producer));
    }

    /// Builder form of [`ProducerPool::register`].
    pub fn with(mut self, producer: impl Producer + 'static) -> Self {
        self.register(producer);
        self
    }

    pub fn kinds(&self) -> Vec<ProducerKind> {
        self.producers.iter().map(|p| p.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    /// Run every producer concurrently and wait for all of them to settle.
    ///
    /// A producer that panics is reported as a failure for that producer
    /// only. Dropping the returned future aborts any producer still running.
    pub async fn run_all(
        &self,
        request: Arc<TripRequest>,
        context: Arc<SharedContext>,
    ) -> Vec<ProducerResult> {
        let started = Instant::now();
        let mut tasks = JoinSet::new();
        let mut slots = HashMap::with_capacity(self.producers.len());

        for (index, producer) in self.producers.iter().enumerate() {
            let producer = Arc::clone(producer);
            let request = Arc::clone(&request);
            let context = Arc::clone(&context);
            let kind = producer.kind();
            let handle = tasks.spawn(async move { producer.transform(&request, &context).await });
            slots.insert(handle.id(), (index, kind));
        }

        let mut results: Vec<Option<ProducerResult>> = vec![None; self.producers.len()];
        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(e) => {
                    let id = e.id();
                    let Some(&(_, kind)) = slots.get(&id) else {
                        continue;
                    };
                    let reason = if e.is_panic() {
                        format!("producer panicked: {}", panic_message(e.into_panic()))
                    } else {
                        "producer task was cancelled".to_owned()
                    };
                    (id, ProducerResult::failure(kind, reason, started.elapsed()))
                }
            };

            if let Some(&(index, kind)) = slots.get(&id) {
                let result = attribute(kind, result);
                match result.error() {
                    None => tracing::info!(
                        producer = %result.kind,
                        elapsed_secs = result.elapsed_secs(),
                        "producer succeeded"
                    ),
                    Some(error) => tracing::warn!(
                        producer = %result.kind,
                        elapsed_secs = result.elapsed_secs(),
                        error,
                        "producer failed"
                    ),
                }
                results[index] = Some(result);
            }
        }

        results.into_iter().flatten().collect()
    }
}

/// Pin a result to the kind its producer was registered under.
fn attribute(kind: ProducerKind, result: ProducerResult) -> ProducerResult {
    if result.kind == kind {
        return result;
    }
    ProducerResult::failure(
        kind,
        format!("{kind} producer returned a {} result", result.kind),
        result.elapsed(),
    )
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

impl std::fmt::Debug for ProducerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerPool")
            .field("producers", &self.kinds())
            .finish()
    }
}
