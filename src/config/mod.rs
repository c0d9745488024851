//! # Configuration Management
//!
//! Configuration for the meshplane generation core, read from `MESHPLANE_*`
//! environment variables (and a `.env` file when present).

pub mod settings;

pub use settings::{IdentityConfig, MeshplaneConfig, ObservabilityConfig};

use crate::Result;

impl MeshplaneConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // A missing .env file is the normal case outside local development.
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let identity = IdentityConfig {
            spiffe_scheme: env("MESHPLANE_SPIFFE_SCHEME")
                .unwrap_or(defaults.identity.spiffe_scheme),
            alpn_protocols: env("MESHPLANE_ALPN_PROTOCOLS")
                .map(|raw| raw.split(',').map(|p| p.trim().to_string()).collect())
                .unwrap_or(defaults.identity.alpn_protocols),
            mesh_ca_secret: env("MESHPLANE_MESH_CA_SECRET")
                .unwrap_or(defaults.identity.mesh_ca_secret),
            identity_cert_secret: env("MESHPLANE_IDENTITY_CERT_SECRET")
                .unwrap_or(defaults.identity.identity_cert_secret),
        };

        let json_logging = match env("MESHPLANE_LOG_JSON") {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                crate::Error::config(format!("Invalid MESHPLANE_LOG_JSON value: {}", value))
            })?,
            None => defaults.observability.json_logging,
        };

        let observability = ObservabilityConfig {
            log_level: env("MESHPLANE_LOG_LEVEL").unwrap_or(defaults.observability.log_level),
            json_logging,
        };

        let config = Self {
            identity,
            observability,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
