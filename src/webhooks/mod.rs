//! Admission webhook for hostPath volume validation
//!
//! This module implements a ValidatingAdmissionWebhook that inspects the
//! hostPath volumes of workload objects before they are persisted to etcd.
//!
//! Rules are evaluated per volume, in order:
//! - `disabled` rules deny the path outright
//! - `readonly` rules deny the path unless every mount is read-only

pub mod error;
pub mod policies;
pub mod review;
mod server;
pub mod workload;

pub use error::{NO_UID, ReviewError};
pub use policies::{ValidationContext, ValidationResult};
pub use review::{
    ALLOWED_MESSAGE, AdmissionReview, AdmissionReviewResponse, Verdict, review_admission,
};
pub use server::{
    MessageResponse, TlsFiles, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError,
    WebhookState, create_webhook_router, run_webhook_server,
};
pub use workload::WorkloadSpec;
