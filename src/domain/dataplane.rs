//! Dataplane-side resources
//!
//! The resource kinds a proxy may embed in its node metadata to describe what
//! it is, plus the proxy type and version information it reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Proxy type reported when the metadata does not say otherwise.
pub const DATAPLANE_PROXY_TYPE: &str = "dataplane";
pub const INGRESS_PROXY_TYPE: &str = "ingress";

/// A mesh workload proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataplaneResource {
    pub mesh: String,
    pub name: String,
    pub networking: DataplaneNetworking,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataplaneNetworking {
    pub address: String,
    #[serde(default)]
    pub inbound: Vec<Inbound>,
    #[serde(default)]
    pub outbound: Vec<Outbound>,
    /// Present when the proxy runs as a mesh gateway.
    #[serde(default)]
    pub gateway: Option<GatewayNetworking>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inbound {
    pub port: u32,
    #[serde(default)]
    pub service_port: Option<u32>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outbound {
    pub port: u32,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GatewayNetworking {
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl DataplaneResource {
    pub fn is_gateway(&self) -> bool {
        self.networking.gateway.is_some()
    }
}

/// Cross-zone ingress proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneIngressResource {
    pub name: String,
    pub networking: ZoneIngressNetworking,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneIngressNetworking {
    pub address: String,
    pub port: u32,
    #[serde(default)]
    pub advertised_address: Option<String>,
    #[serde(default)]
    pub advertised_port: Option<u32>,
}

/// Kind of proxy on the other end of an xDS stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProxyType {
    #[default]
    Dataplane,
    Ingress,
    Other(String),
}

impl ProxyType {
    /// Interpret the raw metadata value. Empty means a regular dataplane.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "" | DATAPLANE_PROXY_TYPE => ProxyType::Dataplane,
            INGRESS_PROXY_TYPE => ProxyType::Ingress,
            other => ProxyType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProxyType::Dataplane => DATAPLANE_PROXY_TYPE,
            ProxyType::Ingress => INGRESS_PROXY_TYPE,
            ProxyType::Other(raw) => raw,
        }
    }
}

/// Versions reported by the proxy: its agent, Envoy, and bundled dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    #[serde(default)]
    pub agent: AgentVersion,
    #[serde(default)]
    pub envoy: EnvoyVersion,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentVersion {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub git_tag: String,
    #[serde(default)]
    pub git_commit: String,
    #[serde(default)]
    pub build_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvoyVersion {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub build: String,
    /// Whether the agent considers this Envoy build compatible with itself.
    #[serde(default)]
    pub agent_compatible: bool,
}
