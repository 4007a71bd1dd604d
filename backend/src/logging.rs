//! Tracing subscriber setup

use crate::config::ObservabilityConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter: `RUST_LOG` wins, otherwise the configured level for
/// this crate and `warn` for everything else.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{}={},warn", env!("CARGO_CRATE_NAME"), config.log_level()))
    })
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed, which happens when
/// tests or an embedding application set one up first.
pub fn init_tracing(config: &ObservabilityConfig) -> bool {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let installed = if config.logging.format == "json" {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
            .is_ok()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init().is_ok()
    };

    if installed {
        tracing::debug!(
            service = %config.service_name,
            environment = %config.environment,
            format = %config.logging.format,
            "Tracing initialized"
        );
    }

    installed
}
