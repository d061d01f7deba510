//! Health server for Kubernetes probes and Prometheus metrics
//!
//! Provides HTTP endpoints for:
//! - `/healthz` - Liveness probe (is the process alive?)
//! - `/readyz` - Readiness probe (is the webhook ready to serve?)
//! - `/metrics` - Prometheus metrics

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use crate::rules::{DISABLED_LIST, READONLY_LIST, RuleSet};
use crate::webhooks::Verdict;

/// Default health server port
pub const HEALTH_PORT: u16 = 9090;

/// Reason label recorded for allowed requests
const ALLOWED_REASON: &str = "Allowed";

/// Labels for admission decision metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct DecisionLabels {
    pub allowed: bool,
    pub reason: String,
}

impl prometheus_client::encoding::EncodeLabelSet for DecisionLabels {
    fn encode(
        &self,
        mut encoder: prometheus_client::encoding::LabelSetEncoder<'_>,
    ) -> Result<(), std::fmt::Error> {
        use prometheus_client::encoding::EncodeLabel;
        let allowed = if self.allowed { "true" } else { "false" };
        ("allowed", allowed).encode(encoder.encode_label())?;
        ("reason", self.reason.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Labels for loaded rule counts
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct RuleListLabels {
    pub list: String,
}

impl prometheus_client::encoding::EncodeLabelSet for RuleListLabels {
    fn encode(
        &self,
        mut encoder: prometheus_client::encoding::LabelSetEncoder<'_>,
    ) -> Result<(), std::fmt::Error> {
        use prometheus_client::encoding::EncodeLabel;
        ("list", self.list.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Shared metrics state
pub struct Metrics {
    /// Admission requests by decision
    pub admission_requests_total: Family<DecisionLabels, Counter>,
    /// Time spent deciding a request
    pub admission_duration_seconds: Histogram,
    /// Number of loaded patterns per rule list
    pub rules: Family<RuleListLabels, Gauge>,

    /// Prometheus registry
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let admission_requests_total = Family::<DecisionLabels, Counter>::default();
        registry.register(
            "hostpath_webhook_admission_requests",
            "Total number of admission requests by decision",
            admission_requests_total.clone(),
        );

        let admission_duration_seconds = Histogram::new(exponential_buckets(0.00001, 2.0, 15));
        registry.register(
            "hostpath_webhook_admission_duration_seconds",
            "Duration of admission request evaluation in seconds",
            admission_duration_seconds.clone(),
        );

        let rules = Family::<RuleListLabels, Gauge>::default();
        registry.register(
            "hostpath_webhook_rules",
            "Number of loaded hostPath patterns by rule list",
            rules.clone(),
        );

        Self {
            admission_requests_total,
            admission_duration_seconds,
            rules,
            registry,
        }
    }

    /// Record the outcome of one admission request
    pub fn record_verdict(&self, verdict: &Verdict, duration_secs: f64) {
        let labels = DecisionLabels {
            allowed: verdict.allowed,
            reason: verdict
                .reason
                .clone()
                .unwrap_or_else(|| ALLOWED_REASON.to_string()),
        };
        self.admission_requests_total.get_or_create(&labels).inc();
        self.admission_duration_seconds.observe(duration_secs);
    }

    /// Publish the size of each rule list
    pub fn set_rules(&self, rules: &RuleSet) {
        for (list, count) in [
            (DISABLED_LIST, rules.disabled_count()),
            (READONLY_LIST, rules.readonly_count()),
        ] {
            let labels = RuleListLabels {
                list: list.to_string(),
            };
            self.rules.get_or_create(&labels).set(count as i64);
        }
    }

    /// Encode metrics to Prometheus text format
    ///
    /// Returns an empty string if encoding fails (should never happen with valid metrics).
    fn encode(&self) -> String {
        let mut buffer = String::new();
        if let Err(e) = encode(&mut buffer, &self.registry) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        buffer
    }
}

/// Shared state for the health server
pub struct HealthState {
    /// Whether the webhook server is accepting requests
    pub ready: RwLock<bool>,
    /// Metrics registry
    pub metrics: Metrics,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            ready: RwLock::new(false),
            metrics: Metrics::new(),
        }
    }

    /// Mark the webhook as ready
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Check if the webhook is ready
    pub async fn is_ready(&self) -> bool {
        *self.ready.read().await
    }
}

/// Liveness probe handler
///
/// Returns 200 OK if the process is alive.
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe handler
///
/// Returns 503 Service Unavailable until the webhook is serving.
async fn readyz(State(state): State<Arc<HealthState>>) -> Response {
    if state.is_ready().await {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

/// Metrics handler
///
/// Returns Prometheus-formatted metrics.
async fn metrics(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let body = state.metrics.encode();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Create the health server router
pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Run the health server
///
/// Binds to `0.0.0.0:<port>` and serves health/metrics endpoints.
pub async fn run_health_server(state: Arc<HealthState>, port: u16) -> Result<(), std::io::Error> {
    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Health server listening on {}", addr);

    axum::serve(listener, app).await
}
