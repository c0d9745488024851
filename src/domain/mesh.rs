//! Mesh identity policy
//!
//! The part of a mesh definition that drives mTLS generation: whether mutual
//! TLS is on, how strict it is, and which SDS secrets hold the trust anchor and
//! the proxy identity certificate.

use serde::{Deserialize, Serialize};

/// mTLS enforcement mode. Only decides whether plaintext is still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MtlsMode {
    #[default]
    Strict,
    Permissive,
}

/// Per-mesh mTLS state consumed by the TLS context builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshIdentityPolicy {
    pub mesh: String,
    pub enabled: bool,
    #[serde(default)]
    pub mode: MtlsMode,
    /// SDS secret holding the mesh CA. `None` uses the configured default.
    #[serde(default)]
    pub ca_secret: Option<String>,
    /// SDS secret holding the identity certificate. `None` uses the configured default.
    #[serde(default)]
    pub identity_secret: Option<String>,
}

impl MeshIdentityPolicy {
    pub fn disabled(mesh: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            enabled: false,
            mode: MtlsMode::Strict,
            ca_secret: None,
            identity_secret: None,
        }
    }

    pub fn enabled(mesh: impl Into<String>, mode: MtlsMode) -> Self {
        Self {
            enabled: true,
            mode,
            ..Self::disabled(mesh)
        }
    }

    pub fn mtls_enabled(&self) -> bool {
        self.enabled
    }
}

/// `Mesh` resource as it appears in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshResource {
    pub name: String,
    #[serde(default)]
    pub mtls: Option<MeshMtls>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshMtls {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: MtlsMode,
    #[serde(default)]
    pub ca_secret: Option<String>,
    #[serde(default)]
    pub identity_secret: Option<String>,
}

impl MeshResource {
    /// The identity policy this mesh imposes. No `mtls` section means disabled.
    pub fn identity_policy(&self) -> MeshIdentityPolicy {
        match &self.mtls {
            Some(mtls) => MeshIdentityPolicy {
                mesh: self.name.clone(),
                enabled: mtls.enabled,
                mode: mtls.mode,
                ca_secret: mtls.ca_secret.clone(),
                identity_secret: mtls.identity_secret.clone(),
            },
            None => MeshIdentityPolicy::disabled(self.name.clone()),
        }
    }
}
