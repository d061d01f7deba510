pub mod config;
pub mod health;
pub mod rules;
pub mod webhooks;

pub use config::{Config, ConfigError};
pub use health::{HEALTH_PORT, HealthState, Metrics, run_health_server};
pub use rules::{RuleError, RuleSet};
pub use webhooks::{
    TlsFiles, Verdict, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError,
    WebhookState, review_admission, run_webhook_server,
};
