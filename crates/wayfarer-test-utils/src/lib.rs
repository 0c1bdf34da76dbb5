//! Shared fixtures for wayfarer integration tests.
//!
//! Provides a canonical trip request, a scripted content generator with
//! canned Paris answers, producer wrappers for counting and failure
//! injection, gateway configurations that never reach a real provider, and
//! a local stub HTTP provider.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use wayfarer_core::cache::Cache;
use wayfarer_core::gateway::GatewayConfig;
use wayfarer_core::generator::{ContentGenerator, GenerationError, Prompt};
use wayfarer_core::models::{BudgetTier, TravelPreference, TripRequest};
use wayfarer_core::orchestrator::{Orchestrator, OrchestratorConfig};
use wayfarer_core::producer::{
    Producer, ProducerKind, ProducerPool, ProducerResult, SharedContext,
};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Two people, two days in Paris on a standard budget of 500.
pub fn sample_request() -> TripRequest {
    TripRequest {
        destination: "Paris, France".to_owned(),
        budget: 500.0,
        tier: BudgetTier::Standard,
        preferences: [TravelPreference::Culture, TravelPreference::Food]
            .into_iter()
            .collect(),
        start_date: NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date"),
        party_size: 2,
        special_requirements: None,
    }
}

// ---------------------------------------------------------------------------
// Content generation
// ---------------------------------------------------------------------------

/// Six valid attractions plus one with an out-of-range score.
///
/// Ranked for culture and food preferences, day 1 gets the Louvre,
/// Notre-Dame and the Eiffel Tower; only the Louvre charges entry.
pub const PARIS_ATTRACTIONS: &str = r#"Here are my picks:
```json
[
  {"name": "Eiffel Tower", "description": "Iron lattice tower on the Champ de Mars", "location": "Champ de Mars", "entry_fee": null, "estimated_duration": 120, "popularity_score": 9.8, "uniqueness_score": 8.5, "category": "landmark"},
  {"name": "Louvre Museum", "description": "The world's most visited art museum", "location": "Rue de Rivoli", "opening_hours": "09:00-18:00", "entry_fee": 15.0, "estimated_duration": 180, "popularity_score": 9.5, "uniqueness_score": 9.0, "category": "culture"},
  {"name": "Notre-Dame Cathedral", "description": "Gothic cathedral on the Ile de la Cite", "location": "Ile de la Cite", "entry_fee": null, "estimated_duration": 60, "popularity_score": 9.0, "uniqueness_score": 8.5, "category": "culture landmark"},
  {"name": "Montmartre", "description": "Hilltop artists' quarter", "location": "18th arrondissement", "entry_fee": null, "estimated_duration": 120, "popularity_score": 8.0, "uniqueness_score": 8.5, "category": "neighborhood"},
  {"name": "Marche des Enfants Rouges", "description": "The oldest covered market in Paris", "location": "Le Marais", "entry_fee": null, "estimated_duration": 60, "popularity_score": 7.0, "uniqueness_score": 8.0, "category": "food market"},
  {"name": "Jardin du Luxembourg", "description": "Formal gardens by the Senate", "location": "6th arrondissement", "entry_fee": null, "estimated_duration": 90, "popularity_score": 7.5, "uniqueness_score": 6.5, "category": "park"},
  {"name": "Mystery Spot", "description": "Scores out of range", "location": "Nowhere", "estimated_duration": 30, "popularity_score": 15.0, "uniqueness_score": 2.0, "category": "oddity"}
]
```
Enjoy!"#;

/// One breakfast, one lunch and one dinner candidate, all cheap.
pub const PARIS_RESTAURANTS: &str = r#"{"restaurants": [
  {"name": "Cafe de Flore", "cuisine_type": "French cafe", "price_range": "$$", "rating": 4.3, "location": "Saint-Germain", "specialties": ["hot chocolate"], "estimated_cost_per_person": 14.0, "must_try_dishes": ["croque monsieur"], "fun_tips": ["Sit on the terrace"]},
  {"name": "L'As du Fallafel", "cuisine_type": "Middle Eastern street food", "price_range": "$", "rating": 4.5, "location": "Le Marais", "estimated_cost_per_person": 7.0, "must_try_dishes": ["falafel special"]},
  {"name": "Restaurant Bouillon Chartier", "cuisine_type": "Traditional French", "price_range": "$", "rating": 4.2, "location": "Grands Boulevards", "estimated_cost_per_person": 10.0, "must_try_dishes": ["oeufs mayonnaise"]}
]}"#;

/// Answers restaurant prompts with [`PARIS_RESTAURANTS`] and everything
/// else with [`PARIS_ATTRACTIONS`], counting calls.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.system.contains("restaurants") {
            Ok(PARIS_RESTAURANTS.to_owned())
        } else {
            Ok(PARIS_ATTRACTIONS.to_owned())
        }
    }
}

// ---------------------------------------------------------------------------
// Producers
// ---------------------------------------------------------------------------

/// Wraps a producer and counts how often it runs.
pub struct CountingProducer<P> {
    inner: P,
    calls: Arc<AtomicUsize>,
}

impl<P: Producer> CountingProducer<P> {
    /// The wrapper plus a handle to its call counter.
    pub fn new(inner: P) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait]
impl<P: Producer> Producer for CountingProducer<P> {
    fn kind(&self) -> ProducerKind {
        self.inner.kind()
    }

    async fn transform(&self, request: &TripRequest, context: &SharedContext) -> ProducerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.transform(request, context).await
    }
}

/// Always reports a failure for its kind.
#[derive(Debug, Clone, Copy)]
pub struct FailingProducer(pub ProducerKind);

#[async_trait]
impl Producer for FailingProducer {
    fn kind(&self) -> ProducerKind {
        self.0
    }

    async fn transform(&self, _request: &TripRequest, _context: &SharedContext) -> ProducerResult {
        ProducerResult::failure(self.0, "scripted failure", Duration::ZERO)
    }
}

/// Panics inside `transform`.
#[derive(Debug, Clone, Copy)]
pub struct PanickingProducer(pub ProducerKind);

#[async_trait]
impl Producer for PanickingProducer {
    fn kind(&self) -> ProducerKind {
        self.0
    }

    async fn transform(&self, _request: &TripRequest, _context: &SharedContext) -> ProducerResult {
        panic!("{} producer exploded", self.0);
    }
}

// ---------------------------------------------------------------------------
// Gateway and orchestrator
// ---------------------------------------------------------------------------

/// No credentials, so every lookup falls back immediately.
pub fn offline_gateway_config() -> GatewayConfig {
    GatewayConfig::offline()
}

/// Credentials present, but every provider points at a closed local port.
pub fn unreachable_gateway_config() -> GatewayConfig {
    GatewayConfig {
        openweather_api_key: Some("test-weather-key".to_owned()),
        google_places_api_key: Some("test-places-key".to_owned()),
        google_maps_api_key: Some("test-maps-key".to_owned()),
        timeout: Duration::from_millis(500),
        openweather_base_url: "http://127.0.0.1:9".to_owned(),
        google_maps_base_url: "http://127.0.0.1:9".to_owned(),
    }
}

/// Provider settings pointing every endpoint at `base_url`.
pub fn stub_gateway_config(base_url: &str, timeout: Duration) -> GatewayConfig {
    GatewayConfig {
        openweather_api_key: Some("test-weather-key".to_owned()),
        google_places_api_key: Some("test-places-key".to_owned()),
        google_maps_api_key: Some("test-maps-key".to_owned()),
        timeout,
        openweather_base_url: base_url.to_owned(),
        google_maps_base_url: base_url.to_owned(),
    }
}

/// How a [`StubProvider`] answers each request.
#[derive(Debug, Clone)]
pub enum StubReply {
    /// Reply with `status` and a JSON `body`, then close.
    Respond { status: u16, body: String },
    /// Read the request and never answer.
    Hang,
}

/// A local HTTP endpoint that answers every path the same way and counts
/// the requests it receives. Stops when dropped.
pub struct StubProvider {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl StubProvider {
    pub async fn start(reply: StubReply) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let counter = Arc::clone(&counter);
                let reply = reply.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, reply, counter).await;
                });
            }
        });

        Ok(Self { addr, hits, task })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for StubProvider {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut stream: TcpStream, reply: StubReply, hits: Arc<AtomicUsize>) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }
    hits.fetch_add(1, Ordering::SeqCst);

    match reply {
        StubReply::Respond { status, body } => {
            let response = format!(
                "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await?;
            stream.shutdown().await
        }
        StubReply::Hang => {
            std::future::pending::<()>().await;
            Ok(())
        }
    }
}

/// The standard producer pool backed by `generator`.
pub fn scripted_pool(generator: Arc<ScriptedGenerator>) -> ProducerPool {
    ProducerPool::standard(generator)
}

/// An orchestrator over an in-memory cache and the offline gateway.
pub fn offline_orchestrator(pool: ProducerPool) -> Orchestrator {
    Orchestrator::new(
        Arc::new(Cache::in_memory(Duration::from_secs(3600))),
        pool,
        OrchestratorConfig::new(offline_gateway_config()),
    )
}
