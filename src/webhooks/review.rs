//! AdmissionReview envelope and verdicts
//!
//! Only `request.uid`, `request.operation` and `request.object` are read from
//! the incoming review. The outgoing review always carries `status.message`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::ReviewError;
use super::policies::{ValidationContext, validate_all};
use super::workload::WorkloadSpec;
use crate::rules::RuleSet;

pub const API_VERSION: &str = "admission.k8s.io/v1";
pub const KIND: &str = "AdmissionReview";

/// Message sent with every allowed request
pub const ALLOWED_MESSAGE: &str = "Request has required labels";

/// HTTP-style status code reported on denials
const DENIED_CODE: i32 = 403;

/// Kubernetes AdmissionReview request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    pub api_version: Option<String>,
    pub kind: Option<String>,
    pub request: Option<AdmissionRequest>,
}

/// The fields of an AdmissionRequest the webhook reads
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    pub uid: Option<String>,
    pub operation: Option<String>,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub object: Option<serde_json::Value>,
}

/// AdmissionReview response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReviewResponse {
    pub api_version: String,
    pub kind: String,
    pub response: AdmissionResponse,
}

/// AdmissionResponse contains the result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    pub status: AdmissionStatus,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionStatus {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The decision for one admission request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub uid: String,
    pub message: String,
    pub reason: Option<String>,
}

impl Verdict {
    pub fn allow(uid: impl Into<String>) -> Self {
        Self {
            allowed: true,
            uid: uid.into(),
            message: ALLOWED_MESSAGE.to_string(),
            reason: None,
        }
    }

    pub fn deny(uid: impl Into<String>, message: impl Into<String>, reason: &str) -> Self {
        Self {
            allowed: false,
            uid: uid.into(),
            message: message.into(),
            reason: Some(reason.to_string()),
        }
    }

    /// Wrap the verdict in an `admission.k8s.io/v1` AdmissionReview
    pub fn into_review(self) -> AdmissionReviewResponse {
        let code = if self.allowed { None } else { Some(DENIED_CODE) };
        AdmissionReviewResponse {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            response: AdmissionResponse {
                uid: self.uid,
                allowed: self.allowed,
                status: AdmissionStatus {
                    message: self.message,
                    code,
                    reason: self.reason,
                },
            },
        }
    }
}

impl From<ReviewError> for Verdict {
    fn from(err: ReviewError) -> Self {
        Verdict::deny(err.uid(), err.to_string(), err.reason())
    }
}

/// Decide a raw `/validate` request body.
///
/// Always produces a verdict; every [`ReviewError`] becomes a denial.
pub fn review_admission(rules: &RuleSet, body: &[u8]) -> Verdict {
    let verdict = match evaluate_review(rules, body) {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!(uid = %e.uid(), error = %e, "Rejecting malformed admission request");
            Verdict::from(e)
        }
    };

    if verdict.allowed {
        info!(uid = %verdict.uid, "Admission request allowed");
    } else {
        warn!(
            uid = %verdict.uid,
            reason = verdict.reason.as_deref().unwrap_or_default(),
            message = %verdict.message,
            "Admission request denied"
        );
    }
    verdict
}

fn evaluate_review(rules: &RuleSet, body: &[u8]) -> Result<Verdict, ReviewError> {
    let review: AdmissionReview = serde_json::from_slice(body).map_err(ReviewError::InvalidBody)?;
    let request = review.request.ok_or(ReviewError::MissingRequest)?;
    let uid = request
        .uid
        .filter(|uid| !uid.is_empty())
        .ok_or(ReviewError::MissingUid)?;

    debug!(
        uid = %uid,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = ?request.name,
        "Processing admission request"
    );

    let object = match request.object {
        Some(object) => object,
        // DELETE requests carry only oldObject; there is nothing to inspect
        None if request.operation.as_deref() == Some("DELETE") => return Ok(Verdict::allow(uid)),
        None => return Err(ReviewError::MissingObject { uid }),
    };

    let workload = match WorkloadSpec::from_object(object) {
        Ok(workload) => workload,
        Err(source) => return Err(ReviewError::MalformedObject { uid, source }),
    };

    let result = validate_all(&ValidationContext::new(rules, &workload));
    if result.allowed {
        return Ok(Verdict::allow(uid));
    }

    let reason = result
        .reason
        .unwrap_or_else(|| "ValidationFailed".to_string());
    let message = result
        .message
        .unwrap_or_else(|| "Validation failed".to_string());
    Ok(Verdict::deny(uid, message, &reason))
}
