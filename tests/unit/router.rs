//! Unit tests for the webhook HTTP router
//!
//! Requests are driven through the axum router in-process; no socket is bound.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use tower::ServiceExt;

use crate::common::*;
use hostpath_webhook::HealthState;
use hostpath_webhook::webhooks::{
    AdmissionReviewResponse, MessageResponse, NO_UID, WebhookState, create_webhook_router,
};

fn router_with_health(health: Option<Arc<HealthState>>) -> Router {
    let state = WebhookState::new(Arc::new(scenario_rules()), health);
    create_webhook_router(Arc::new(state))
}

fn router() -> Router {
    router_with_health(None)
}

async fn send(router: Router, method: Method, uri: &str, body: Body) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn validate(router: Router, body: Vec<u8>) -> AdmissionReviewResponse {
    let (status, bytes) = send(router, Method::POST, "/validate", Body::from(body)).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_greeting() {
    let (status, body) = send(router(), Method::GET, "/", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let body: MessageResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(body.message, "Hello validation controller");
}

#[tokio::test]
async fn test_ping() {
    let (status, body) = send(router(), Method::GET, "/ping", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let body: MessageResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(body.message, "pong");
}

#[tokio::test]
async fn test_unknown_route_not_found() {
    let (status, _) = send(router(), Method::GET, "/mutate", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validate_rejects_get() {
    let (status, _) = send(router(), Method::GET, "/validate", Body::empty()).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_validate_allowed_review() {
    let body = AdmissionReviewBuilder::new("705ab4f5-6393-11e8-b7cc-42010a800002")
        .with_host_path_volume("v1", "/data/cache")
        .with_container("app", &[("v1", Some(true))])
        .body();

    let review = validate(router(), body).await;
    assert_eq!(review.api_version, "admission.k8s.io/v1");
    assert_eq!(review.kind, "AdmissionReview");
    assert_eq!(review.response.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
    assert!(review.response.allowed);
    assert_eq!(review.response.status.message, "Request has required labels");
    assert_eq!(review.response.status.code, None);
}

#[tokio::test]
async fn test_validate_denied_review() {
    let body = AdmissionReviewBuilder::new("uid-1")
        .with_host_path_volume("v1", "/etc/secrets")
        .body();

    let review = validate(router(), body).await;
    assert!(!review.response.allowed);
    assert_eq!(review.response.uid, "uid-1");
    assert_eq!(
        review.response.status.message,
        "hostPath /etc/secrets is not allowed"
    );
    assert_eq!(review.response.status.code, Some(403));
    assert_eq!(
        review.response.status.reason.as_deref(),
        Some("HostPathNotAllowed")
    );
}

#[tokio::test]
async fn test_validate_garbage_body_is_denied_not_rejected() {
    let review = validate(router(), b"not json at all".to_vec()).await;
    assert!(!review.response.allowed);
    assert_eq!(review.response.uid, NO_UID);
}

#[tokio::test]
async fn test_validate_missing_request_is_denied() {
    let review = validate(router(), br#"{"kind": "AdmissionReview"}"#.to_vec()).await;
    assert!(!review.response.allowed);
    assert_eq!(review.response.uid, NO_UID);
    assert_eq!(
        review.response.status.message,
        "Invalid request, no payload.request found"
    );
}

#[tokio::test]
async fn test_validate_records_metrics() {
    let health = Arc::new(HealthState::new());
    let router = router_with_health(Some(health.clone()));

    let body = AdmissionReviewBuilder::new("uid-1")
        .with_host_path_volume("v1", "/data")
        .with_container("app", &[("v1", None)])
        .body();
    let review = validate(router, body).await;
    assert!(!review.response.allowed);

    let health_router = hostpath_webhook::health::create_router(health);
    let (status, metrics) = send(health_router, Method::GET, "/metrics", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let metrics = String::from_utf8(metrics).unwrap();
    assert!(metrics.contains("reason=\"HostPathMustBeReadOnly\""));
}

#[tokio::test]
async fn test_readiness_follows_health_state() {
    let health = Arc::new(HealthState::new());

    let (status, _) = send(
        hostpath_webhook::health::create_router(health.clone()),
        Method::GET,
        "/readyz",
        Body::empty(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    health.set_ready(true).await;
    let (status, _) = send(
        hostpath_webhook::health::create_router(health),
        Method::GET,
        "/readyz",
        Body::empty(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
