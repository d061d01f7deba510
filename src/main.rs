use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{debug, error, info, warn};

use hostpath_webhook::{
    Config, HealthState, RuleSet, WebhookState, run_health_server, run_webhook_server,
};

/// Grace period for in-flight admission requests to complete during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install the TLS crypto provider before any TLS operations
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
        && rustls::crypto::CryptoProvider::get_default().is_none()
    {
        return Err(
            "Failed to install rustls crypto provider and no provider is available".into(),
        );
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hostpath_webhook=info".parse()?),
        )
        .init();

    info!("Starting hostpath-webhook");

    let config = Config::from_env()?;

    // Rules are required: without them the webhook must not serve traffic
    let rules = match RuleSet::load(&config.rules_path) {
        Ok(rules) => Arc::new(rules),
        Err(e) => {
            error!(path = %config.rules_path.display(), error = %e, "Failed to load rules");
            return Err(e.into());
        }
    };
    info!(
        path = %config.rules_path.display(),
        disabled = rules.disabled_count(),
        readonly = rules.readonly_count(),
        "Loaded hostPath rules"
    );
    for pattern in rules.disabled() {
        debug!(pattern, "disabled rule");
    }
    for pattern in rules.readonly() {
        debug!(pattern, "readonly rule");
    }

    let health_state = Arc::new(HealthState::new());
    health_state.metrics.set_rules(&rules);

    // Start health server immediately so liveness probes work during startup
    let health_handle = tokio::spawn(run_health_server(health_state.clone(), config.health_port));

    let tls = if config.tls.exist() {
        info!("TLS certificates found, serving webhook over HTTPS");
        Some(config.tls.clone())
    } else {
        warn!(
            "TLS certificates not found at {} and {}, serving webhook over plain HTTP",
            config.tls.cert_path.display(),
            config.tls.key_path.display()
        );
        None
    };

    // Readiness flips once the webhook listener is bound
    let state = Arc::new(WebhookState::new(rules, Some(health_state.clone())));
    let webhook_handle = tokio::spawn(run_webhook_server(state, config.webhook_port, tls));

    // Wait for any task to complete (or fail), or shutdown signal
    tokio::select! {
        result = webhook_handle => {
            health_state.set_ready(false).await;
            match result {
                Ok(Ok(())) => warn!("Webhook server stopped unexpectedly"),
                Ok(Err(e)) => {
                    error!("Webhook server error: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    error!("Webhook server task panicked: {}", e);
                    return Err(e.into());
                }
            }
        }
        result = health_handle => {
            match result {
                Ok(Ok(())) => warn!("Health server stopped unexpectedly"),
                Ok(Err(e)) => {
                    error!("Health server error: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    error!("Health server task panicked: {}", e);
                    return Err(e.into());
                }
            }
        }
        // Handle graceful shutdown on SIGTERM or SIGINT
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            // Mark as not ready so the Service stops routing admission requests here
            health_state.set_ready(false).await;
            info!("Marked webhook as not ready");

            info!(
                "Waiting {}s for in-flight admission requests to complete...",
                SHUTDOWN_GRACE_PERIOD_SECS
            );
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;

            info!("Grace period complete, shutting down");
        }
    }

    info!("Webhook stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
