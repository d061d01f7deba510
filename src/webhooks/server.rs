//! Webhook HTTP server handlers
//!
//! Serves the ValidatingAdmissionWebhook endpoint plus two probe routes:
//! - `GET /` - greeting
//! - `GET /ping` - health check
//! - `POST /validate` - AdmissionReview in, AdmissionReview out

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use super::review::{AdmissionReviewResponse, review_admission};
use crate::health::HealthState;
use crate::rules::RuleSet;

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/ssl/server.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/ssl/server.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 8080;

/// Body of the greeting and ping routes
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

/// Shared state for webhook handlers
pub struct WebhookState {
    pub rules: Arc<RuleSet>,
    pub health: Option<Arc<HealthState>>,
}

impl WebhookState {
    pub fn new(rules: Arc<RuleSet>, health: Option<Arc<HealthState>>) -> Self {
        Self { rules, health }
    }
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/ping", get(ping))
        .route("/validate", post(validate))
        .with_state(state)
}

async fn hello() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Hello validation controller".to_string(),
    })
}

async fn ping() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "pong".to_string(),
    })
}

/// Validate hostPath volumes of a workload admission request
///
/// The body is read raw so that unparseable reviews still get a denial
/// instead of an extractor rejection.
async fn validate(
    State(state): State<Arc<WebhookState>>,
    body: Bytes,
) -> (StatusCode, Json<AdmissionReviewResponse>) {
    let started = Instant::now();
    let verdict = review_admission(&state.rules, &body);

    if let Some(health) = &state.health {
        health
            .metrics
            .record_verdict(&verdict, started.elapsed().as_secs_f64());
    }

    (StatusCode::OK, Json(verdict.into_review()))
}

/// PEM certificate and key for the webhook listener
#[derive(Debug, Clone)]
pub struct TlsFiles {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TlsFiles {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// Both files are present on disk
    pub fn exist(&self) -> bool {
        Path::new(&self.cert_path).exists() && Path::new(&self.key_path).exists()
    }
}

/// Run the webhook server
///
/// Binds to `0.0.0.0:<port>`. With `tls`, certificates are loaded from the
/// given PEM files and the server speaks HTTPS; without it, plain HTTP.
/// The shared health state is marked ready once the listener is bound.
pub async fn run_webhook_server(
    state: Arc<WebhookState>,
    port: u16,
    tls: Option<TlsFiles>,
) -> Result<(), WebhookError> {
    use axum_server::tls_rustls::RustlsConfig;

    let health = state.health.clone();
    let app = create_webhook_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    match tls {
        Some(files) => {
            let config = RustlsConfig::from_pem_file(files.cert_path, files.key_path)
                .await
                .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

            let handle = axum_server::Handle::new();
            let server = axum_server::bind_rustls(addr, config)
                .handle(handle.clone())
                .serve(app.into_make_service());
            let listening = async {
                if let Some(bound) = handle.listening().await {
                    info!("Webhook server listening on {} with TLS", bound);
                    mark_ready(health.as_deref()).await;
                }
            };

            let (result, ()) = tokio::join!(server, listening);
            result.map_err(|e| WebhookError::Server(e.to_string()))?;
        }
        None => {
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|e| WebhookError::Server(e.to_string()))?;

            info!("Webhook server listening on {} without TLS", addr);
            mark_ready(health.as_deref()).await;

            axum::serve(listener, app)
                .await
                .map_err(|e| WebhookError::Server(e.to_string()))?;
        }
    }

    Ok(())
}

async fn mark_ready(health: Option<&HealthState>) {
    if let Some(health) = health {
        health.set_ready(true).await;
    }
}

/// Errors that can occur when running the webhook server
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("Webhook server error: {0}")]
    Server(String),
}
