//! # Meshplane
//!
//! The configuration generation core of a service mesh control plane. It turns
//! declarative mesh policy into the Envoy resources a proxy receives over xDS.
//!
//! ## Architecture
//!
//! ```text
//! GatewayRoute policies → Route Table Builder → VirtualHost
//! Mesh mTLS policy      → TLS Context Builder → Downstream/Upstream TLS contexts
//! Node metadata Struct  → Metadata Decoder    → DataplaneMetadata
//! ```
//!
//! Every component is synchronous and keeps no state between calls, so one
//! instance can serve any number of listeners or connections concurrently.
//! Components receive a `tracing::Span` at construction and log within it.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use meshplane::xds::{GatewayRouteGenerator, ListenerHost, TlsContextBuilder};
//! use meshplane::domain::{MeshIdentityPolicy, MtlsMode};
//! use meshplane::{MeshplaneConfig, Result};
//!
//! fn main() -> Result<()> {
//!     let config = MeshplaneConfig::from_env()?;
//!     meshplane::observability::init_logging(&config.observability)?;
//!
//!     let routes = GatewayRouteGenerator::default();
//!     let vhost = routes.generate_virtual_host(&ListenerHost::new("*", vec![]))?;
//!     assert!(vhost.is_none());
//!
//!     let tls = TlsContextBuilder::new(
//!         config.identity.clone(),
//!         meshplane::generation_span!("mesh-tls", listener_port = 10001),
//!     );
//!     let policy = MeshIdentityPolicy::enabled("default", MtlsMode::Strict);
//!     let downstream = tls.downstream(&policy)?;
//!     assert!(downstream.is_some());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod xds;

// Re-export commonly used types and traits
pub use config::{IdentityConfig, MeshplaneConfig, ObservabilityConfig};
pub use errors::{Error, Result};
pub use observability::init_logging;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "meshplane");
    }
}
