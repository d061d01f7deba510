//! Admission webhook policies
//!
//! Each policy module exports a `validate` function that checks specific rules.

pub mod hostpath;

pub use hostpath::validate_hostpaths;

use crate::rules::RuleSet;
use crate::webhooks::workload::WorkloadSpec;

/// Reason attached to a hostPath matching a `disabled` rule
pub const REASON_NOT_ALLOWED: &str = "HostPathNotAllowed";
/// Reason attached to a writable mount of a `readonly` hostPath
pub const REASON_MUST_BE_READONLY: &str = "HostPathMustBeReadOnly";

/// Result of a policy validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub allowed: bool,
    pub reason: Option<String>,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            message: None,
        }
    }

    pub fn denied(reason: &str, message: &str) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
        }
    }
}

/// Context for validation: the process-wide rules and the request's workload
pub struct ValidationContext<'a> {
    pub rules: &'a RuleSet,
    pub workload: &'a WorkloadSpec,
}

impl<'a> ValidationContext<'a> {
    pub fn new(rules: &'a RuleSet, workload: &'a WorkloadSpec) -> Self {
        Self { rules, workload }
    }
}

/// Run all validation policies and return the first failure
pub fn validate_all(ctx: &ValidationContext) -> ValidationResult {
    let policies: Vec<fn(&ValidationContext) -> ValidationResult> = vec![validate_hostpaths];

    for policy in policies {
        let result = policy(ctx);
        if !result.allowed {
            return result;
        }
    }

    ValidationResult::allowed()
}
