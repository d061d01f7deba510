//! Per-request failures
//!
//! None of these reach the transport: each is answered with a denial.

use thiserror::Error;

/// Placeholder uid for responses to requests that carry none
pub const NO_UID: &str = "<no uid>";

/// Reason for requests missing a required envelope field
pub const REASON_INVALID_REQUEST: &str = "InvalidRequest";
/// Reason for objects that cannot be read as a workload
pub const REASON_MALFORMED_OBJECT: &str = "MalformedObject";

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Webhook exception: invalid AdmissionReview: {0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("Invalid request, no payload.request found")]
    MissingRequest,

    #[error("Invalid request, no payload.request.uid found")]
    MissingUid,

    #[error("Invalid request, no payload.request.object found")]
    MissingObject { uid: String },

    #[error("Webhook exception: malformed workload object: {source}")]
    MalformedObject {
        uid: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ReviewError {
    /// The uid to echo back, or the placeholder when none was recovered
    pub fn uid(&self) -> &str {
        match self {
            ReviewError::MissingObject { uid } | ReviewError::MalformedObject { uid, .. } => uid,
            ReviewError::InvalidBody(_)
            | ReviewError::MissingRequest
            | ReviewError::MissingUid => NO_UID,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ReviewError::InvalidBody(_) | ReviewError::MalformedObject { .. } => {
                REASON_MALFORMED_OBJECT
            }
            ReviewError::MissingRequest
            | ReviewError::MissingUid
            | ReviewError::MissingObject { .. } => REASON_INVALID_REQUEST,
        }
    }
}
