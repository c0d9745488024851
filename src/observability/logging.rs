//! # Structured Logging
//!
//! Logging setup and span helpers built on the tracing ecosystem.
//!
//! Generation components never reach for a global logger name. Each one is
//! handed a [`tracing::Span`] when it is constructed and emits its events with
//! that span as the parent, so the caller decides which listener, host or
//! connection context every record carries.

use crate::config::ObservabilityConfig;
use crate::errors::{MeshplaneError, Result};
use tracing_subscriber::EnvFilter;

/// Create the span handed to a generation component.
///
/// ```rust,ignore
/// let span = generation_span!("gateway-routes", listener_port = 8080);
/// let generator = GatewayRouteGenerator::new(span);
/// ```
#[macro_export]
macro_rules! generation_span {
    ($component:expr) => {
        tracing::info_span!("xds_generation", component = %$component)
    };
    ($component:expr, $($field:tt)*) => {
        tracing::info_span!("xds_generation", component = %$component, $($field)*)
    };
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this more than once is a
/// no-op, which keeps test binaries and embedding applications happy.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            MeshplaneError::config_with_source(
                format!("Invalid log level '{}'", config.log_level),
                Box::new(e),
            )
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = if config.json_logging {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if installed.is_err() {
        tracing::debug!("Global tracing subscriber already installed");
    }

    Ok(())
}
