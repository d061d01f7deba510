//! hostPath rules
//!
//! A rule file is YAML with two optional lists of regular expressions:
//!
//! ```yaml
//! disabled:
//!   - '^/root/.ssh\/?$'
//! readonly:
//!   - "^/var/log"
//! ```
//!
//! `disabled` paths are never admitted. `readonly` paths are admitted only when
//! every mount of the volume is read-only. Patterns are searched, not anchored:
//! `^/etc` matches `/etc/secrets`, `etc` matches `/opt/etc/app`.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Name of the list holding paths that are never allowed
pub const DISABLED_LIST: &str = "disabled";
/// Name of the list holding paths that must be mounted read-only
pub const READONLY_LIST: &str = "readonly";

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("failed to read rule file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rules: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid pattern {pattern:?} in {list} rules: {source}")]
    InvalidPattern {
        list: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// On-disk shape of the rule file. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct RulesFile {
    #[serde(default)]
    disabled: Option<Vec<String>>,
    #[serde(default)]
    readonly: Option<Vec<String>>,
}

/// Ordered, compiled hostPath rules.
///
/// Built once at startup and shared read-only between requests.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    disabled: Vec<Regex>,
    readonly: Vec<Regex>,
}

impl RuleSet {
    /// Compile both pattern lists, preserving their order
    pub fn new<S: AsRef<str>>(disabled: &[S], readonly: &[S]) -> Result<Self, RuleError> {
        Ok(Self {
            disabled: compile(DISABLED_LIST, disabled)?,
            readonly: compile(READONLY_LIST, readonly)?,
        })
    }

    /// Parse a YAML rule document
    pub fn from_yaml(yaml: &str) -> Result<Self, RuleError> {
        let file: RulesFile = serde_yaml::from_str(yaml)?;
        Self::new(
            &file.disabled.unwrap_or_default(),
            &file.readonly.unwrap_or_default(),
        )
    }

    /// Load rules from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| RuleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// First `disabled` pattern found in `path`, if any
    pub fn first_disabled(&self, path: &str) -> Option<&Regex> {
        first_match(&self.disabled, path)
    }

    /// First `readonly` pattern found in `path`, if any
    pub fn first_readonly(&self, path: &str) -> Option<&Regex> {
        first_match(&self.readonly, path)
    }

    pub fn disabled(&self) -> impl Iterator<Item = &str> {
        self.disabled.iter().map(Regex::as_str)
    }

    pub fn readonly(&self) -> impl Iterator<Item = &str> {
        self.readonly.iter().map(Regex::as_str)
    }

    pub fn disabled_count(&self) -> usize {
        self.disabled.len()
    }

    pub fn readonly_count(&self) -> usize {
        self.readonly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disabled.is_empty() && self.readonly.is_empty()
    }
}

/// Regex search of `pattern` within `path`
pub fn matches(pattern: &Regex, path: &str) -> bool {
    pattern.is_match(path)
}

fn first_match<'a>(patterns: &'a [Regex], path: &str) -> Option<&'a Regex> {
    patterns.iter().find(|p| matches(p, path))
}

fn compile<S: AsRef<str>>(list: &'static str, patterns: &[S]) -> Result<Vec<Regex>, RuleError> {
    patterns
        .iter()
        .map(|p| {
            let pattern = p.as_ref();
            Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
                list,
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}
