//! Integration tests for configuration management
//!
//! These tests validate that the configuration system properly reads
//! `MESHPLANE_*` environment variables and installs logging.

use meshplane::{init_logging, MeshplaneConfig, ObservabilityConfig, Result};
use std::env;
use std::sync::Mutex;

// Use a mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VARS: [&str; 6] = [
    "MESHPLANE_SPIFFE_SCHEME",
    "MESHPLANE_ALPN_PROTOCOLS",
    "MESHPLANE_MESH_CA_SECRET",
    "MESHPLANE_IDENTITY_CERT_SECRET",
    "MESHPLANE_LOG_LEVEL",
    "MESHPLANE_LOG_JSON",
];

fn clear_vars() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
fn test_config_environment_integration() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_vars();

    env::set_var("MESHPLANE_SPIFFE_SCHEME", "mesh");
    env::set_var("MESHPLANE_ALPN_PROTOCOLS", "mesh-a, mesh-b");
    env::set_var("MESHPLANE_MESH_CA_SECRET", "edge_ca");
    env::set_var("MESHPLANE_LOG_JSON", "true");

    let config = MeshplaneConfig::from_env()?;
    assert_eq!(config.identity.spiffe_scheme, "mesh");
    assert_eq!(config.identity.alpn_protocols, vec!["mesh-a", "mesh-b"]);
    assert_eq!(config.identity.mesh_ca_secret, "edge_ca");
    assert_eq!(config.identity.identity_cert_secret, "identity_cert");
    assert!(config.observability.json_logging);

    // Secrets that collide are rejected
    env::set_var("MESHPLANE_IDENTITY_CERT_SECRET", "edge_ca");
    assert!(MeshplaneConfig::from_env().is_err());

    clear_vars();
    Ok(())
}

#[test]
fn test_invalid_scheme_is_rejected() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_vars();

    env::set_var("MESHPLANE_SPIFFE_SCHEME", "Not A Scheme");
    let result = MeshplaneConfig::from_env();
    clear_vars();

    assert!(result.is_err());
}

#[test]
fn test_init_logging_is_idempotent() -> Result<()> {
    let config = ObservabilityConfig::default();
    init_logging(&config)?;
    init_logging(&config)?;

    tracing::info!("logging initialized twice");
    Ok(())
}
