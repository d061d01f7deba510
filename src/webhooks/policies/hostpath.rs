//! hostPath volume policy
//!
//! Volumes are checked in order and the first violation wins:
//! - a path matching a `disabled` rule is denied outright, whatever the mounts
//! - a path matching a `readonly` rule is denied unless every mount of the
//!   volume, in containers and init containers, sets `readOnly: true`
//!
//! A `readonly` volume that no container mounts passes.

use tracing::debug;

use super::{REASON_MUST_BE_READONLY, REASON_NOT_ALLOWED, ValidationContext, ValidationResult};

/// Validate every hostPath volume of the workload against the rules
pub fn validate_hostpaths(ctx: &ValidationContext) -> ValidationResult {
    for (volume, path) in ctx.workload.host_path_volumes() {
        if let Some(rule) = ctx.rules.first_disabled(path) {
            debug!(volume = %volume.name, path, rule = rule.as_str(), "hostPath matches disabled rule");
            return ValidationResult::denied(
                REASON_NOT_ALLOWED,
                &format!("hostPath {} is not allowed", path),
            );
        }

        // Only the first matching readonly rule is consulted per volume
        let Some(rule) = ctx.rules.first_readonly(path) else {
            continue;
        };

        if let Some((kind, container, _)) = ctx
            .workload
            .mounts_of(&volume.name)
            .find(|(_, _, mount)| !mount.is_read_only())
        {
            debug!(
                volume = %volume.name,
                path,
                rule = rule.as_str(),
                container = %container.name,
                kind = %kind,
                "hostPath matches readonly rule but is mounted writable"
            );
            return ValidationResult::denied(
                REASON_MUST_BE_READONLY,
                &format!("hostPath {} must be readOnly", path),
            );
        }
    }

    ValidationResult::allowed()
}
