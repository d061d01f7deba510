// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for hostPath rule evaluation
//!
//! These tests use proptest to generate random paths, rules and workloads and
//! verify that:
//! 1. Rules match by regex search, honouring explicit anchors
//! 2. Evaluation is deterministic (same input = same output)
//! 3. `disabled` always wins over `readonly`
//! 4. A `readonly` path is allowed exactly when every mount is read-only
//! 5. Arbitrary request bodies never escape as anything but a verdict

use proptest::prelude::*;
use regex::Regex;

use hostpath_webhook::rules::{RuleSet, matches};
use hostpath_webhook::webhooks::policies::{ValidationContext, validate_all};
use hostpath_webhook::webhooks::workload::{
    Container, HostPath, Volume, VolumeMount, WorkloadSpec,
};
use hostpath_webhook::webhooks::{NO_UID, review_admission};

// =============================================================================
// Strategy generators
// =============================================================================

/// A single path segment (shrinks toward short lowercase names)
fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9_.-]{1,8}"
}

/// An absolute node path with 1-5 segments
fn host_path() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..5).prop_map(|segments| format!("/{}", segments.join("/")))
}

/// A `readOnly` flag as it appears on a mount: absent, false or true
fn read_only_flag() -> impl Strategy<Value = Option<bool>> {
    prop_oneof![Just(None), Just(Some(false)), Just(Some(true))]
}

/// Mount flags for the volume under test, spread over containers and init containers
fn mount_flags() -> impl Strategy<Value = (Vec<Option<bool>>, Vec<Option<bool>>)> {
    (
        prop::collection::vec(read_only_flag(), 0..4),
        prop::collection::vec(read_only_flag(), 0..3),
    )
}

fn host_volume(name: &str, path: &str) -> Volume {
    Volume {
        name: name.to_string(),
        host_path: Some(HostPath {
            path: Some(path.to_string()),
        }),
    }
}

fn containers(prefix: &str, volume: &str, flags: &[Option<bool>]) -> Vec<Container> {
    flags
        .iter()
        .enumerate()
        .map(|(i, read_only)| Container {
            name: format!("{}-{}", prefix, i),
            volume_mounts: Some(vec![VolumeMount {
                name: volume.to_string(),
                read_only: *read_only,
            }]),
        })
        .collect()
}

fn workload(path: &str, flags: &(Vec<Option<bool>>, Vec<Option<bool>>)) -> WorkloadSpec {
    WorkloadSpec {
        volumes: vec![host_volume("target", path)],
        containers: containers("app", "target", &flags.0),
        init_containers: containers("init", "target", &flags.1),
    }
}

fn message(rules: &RuleSet, workload: &WorkloadSpec) -> Option<String> {
    validate_all(&ValidationContext::new(rules, workload)).message
}

// =============================================================================
// Matching semantics
// =============================================================================

proptest! {
    #[test]
    fn unanchored_literal_matches_anywhere(prefix in host_path(), needle in segment(), suffix in host_path()) {
        let pattern = Regex::new(&regex::escape(&needle)).unwrap();
        let path = format!("{}/{}{}", prefix, needle, suffix);
        prop_assert!(matches(&pattern, &path));
    }

    #[test]
    fn anchored_literal_matches_only_exact_path(path in host_path(), extra in segment()) {
        let pattern = Regex::new(&format!("^{}$", regex::escape(&path))).unwrap();
        prop_assert!(matches(&pattern, &path));

        let longer = format!("{}/{}", path, extra);
        prop_assert!(!matches(&pattern, &longer));
    }

    #[test]
    fn matching_agrees_with_regex_search(pattern in "[a-z/.]{1,4}", path in host_path()) {
        let re = Regex::new(&pattern).unwrap();
        prop_assert_eq!(matches(&re, &path), re.find(&path).is_some());
    }

    #[test]
    fn ssh_rule_accepts_only_the_directory(user in "[a-z]{1,10}", child in "[0-9]{1,6}") {
        let rule = Regex::new(r"^/home/(.*?)/.ssh\/?$").unwrap();
        let dir = format!("/home/{}/.ssh", user);
        let slash = format!("{}/", dir);
        let nested = format!("{}/{}", dir, child);
        prop_assert!(matches(&rule, &dir));
        prop_assert!(matches(&rule, &slash));
        prop_assert!(!matches(&rule, &nested));
    }
}

// =============================================================================
// Evaluation properties
// =============================================================================

proptest! {
    #[test]
    fn evaluation_is_deterministic(path in host_path(), flags in mount_flags()) {
        let rules = RuleSet::new(&["^/[a-c]"], &["^/[d-m]"]).unwrap();
        let workload = workload(&path, &flags);

        let first = validate_all(&ValidationContext::new(&rules, &workload));
        let second = validate_all(&ValidationContext::new(&rules, &workload));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn disabled_wins_over_readonly(path in host_path(), flags in mount_flags()) {
        let pattern = format!("^{}", regex::escape(&path));
        let rules = RuleSet::new(&[pattern.as_str()], &[pattern.as_str()]).unwrap();

        prop_assert_eq!(
            message(&rules, &workload(&path, &flags)),
            Some(format!("hostPath {} is not allowed", path))
        );
    }

    #[test]
    fn readonly_allowed_iff_every_mount_read_only(path in host_path(), flags in mount_flags()) {
        let rules = RuleSet::new(&[] as &[&str], &[r"^/"]).unwrap();
        let all_read_only = flags.0.iter().chain(flags.1.iter()).all(|f| *f == Some(true));

        let result = validate_all(&ValidationContext::new(&rules, &workload(&path, &flags)));
        prop_assert_eq!(result.allowed, all_read_only);
        if !all_read_only {
            prop_assert_eq!(result.message, Some(format!("hostPath {} must be readOnly", path)));
        }
    }

    #[test]
    fn unmatched_paths_are_always_allowed(path in host_path(), flags in mount_flags()) {
        let rules = RuleSet::new(&["^/nonexistent-root"], &["^/another-missing-root"]).unwrap();
        prop_assert!(validate_all(&ValidationContext::new(&rules, &workload(&path, &flags))).allowed);
    }

    #[test]
    fn arbitrary_bodies_produce_a_verdict(body in prop::collection::vec(any::<u8>(), 0..256)) {
        let rules = RuleSet::new(&["^/etc"], &["^/data"]).unwrap();
        let verdict = review_admission(&rules, &body);
        prop_assert!(!verdict.allowed);
        prop_assert_eq!(verdict.uid, NO_UID);
    }
}
