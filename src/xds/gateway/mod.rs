//! Mesh gateway HTTP routing
//!
//! Turns the `GatewayRoute` policy objects attached to a gateway listener
//! into route tables, and route tables into Envoy virtual hosts.

pub mod matching;
pub mod route_entry;
pub mod route_generator;
pub mod virtual_host;

use crate::domain::GatewayRoute;

pub use route_entry::{PathKind, RouteEntry};
pub use route_generator::{GatewayRouteGenerator, HostRoutes};
pub use virtual_host::build_virtual_host;

/// Listener hostname that accepts every request.
pub const WILDCARD_HOSTNAME: &str = "*";

/// A hostname served by a gateway listener and the policy objects that may
/// apply to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerHost {
    pub hostname: String,
    pub routes: Vec<GatewayRoute>,
}

impl ListenerHost {
    pub fn new(hostname: impl Into<String>, routes: Vec<GatewayRoute>) -> Self {
        Self {
            hostname: hostname.into(),
            routes,
        }
    }
}

/// Ordered entries of one route table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteTable {
    pub entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
