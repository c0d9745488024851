//! Serialized core resources
//!
//! Resources travel as JSON objects carrying a `type` discriminator next to
//! their own fields, e.g. `{"type": "Dataplane", "mesh": "default", ...}`.

use serde::{Deserialize, Serialize};

use super::dataplane::{DataplaneResource, ZoneIngressResource};
use super::gateway_route::GatewayRoute;
use super::mesh::MeshResource;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CoreResource {
    Dataplane(DataplaneResource),
    ZoneIngress(ZoneIngressResource),
    Mesh(MeshResource),
    GatewayRoute(GatewayRoute),
}

impl CoreResource {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| crate::Error::from(e).add_context("Invalid core resource"))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CoreResource::Dataplane(_) => "Dataplane",
            CoreResource::ZoneIngress(_) => "ZoneIngress",
            CoreResource::Mesh(_) => "Mesh",
            CoreResource::GatewayRoute(_) => "GatewayRoute",
        }
    }
}
