//! # Configuration Settings
//!
//! Defines the configuration structure for the meshplane generation core.

use crate::errors::{MeshplaneError, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct MeshplaneConfig {
    /// Mesh identity naming and TLS settings
    #[validate(nested)]
    pub identity: IdentityConfig,

    /// Logging configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl MeshplaneConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(MeshplaneError::from)?;

        self.validate_custom()?;

        Ok(())
    }

    fn validate_custom(&self) -> Result<()> {
        let scheme = &self.identity.spiffe_scheme;
        let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-';
        if !scheme.chars().all(allowed) {
            return Err(MeshplaneError::validation_field(
                format!("Identity scheme '{scheme}' must be lowercase alphanumeric"),
                "identity.spiffe_scheme",
            ));
        }

        let protocols = &self.identity.alpn_protocols;
        if protocols.iter().any(|p| p.trim().is_empty()) {
            return Err(MeshplaneError::validation_field(
                "ALPN protocol names cannot be empty",
                "identity.alpn_protocols",
            ));
        }

        if self.identity.mesh_ca_secret == self.identity.identity_cert_secret {
            return Err(MeshplaneError::validation(
                "Mesh CA and identity certificate secrets must have different names",
            ));
        }

        Ok(())
    }
}

/// Identity naming scheme and the SDS secret names used for mesh mTLS.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IdentityConfig {
    /// URI scheme of workload identities, `spiffe` unless the PKI says otherwise
    #[validate(length(min = 1, message = "Identity scheme cannot be empty"))]
    pub spiffe_scheme: String,

    /// Application protocols negotiated on every mesh upstream connection
    #[validate(length(min = 1, message = "At least one ALPN protocol is required"))]
    pub alpn_protocols: Vec<String>,

    /// Default SDS secret name of the mesh trust anchor
    #[validate(length(min = 1, message = "Mesh CA secret name cannot be empty"))]
    pub mesh_ca_secret: String,

    /// Default SDS secret name of the proxy identity certificate
    #[validate(length(min = 1, message = "Identity certificate secret name cannot be empty"))]
    pub identity_cert_secret: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            spiffe_scheme: "spiffe".to_string(),
            alpn_protocols: vec!["meshplane".to_string()],
            mesh_ca_secret: "mesh_ca".to_string(),
            identity_cert_secret: "identity_cert".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}
