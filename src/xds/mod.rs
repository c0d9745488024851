//! Envoy xDS resource generation
//!
//! Builds the Envoy configuration a mesh control plane hands to its proxies:
//! - gateway route tables and virtual hosts (`gateway`)
//! - mesh mTLS contexts and transport sockets (`tls`, `identity`)
//! - decoding of the node metadata proxies send on connect (`metadata`)

pub mod gateway;
pub mod identity;
pub mod metadata;
pub mod tls;

pub use gateway::{
    build_virtual_host, GatewayRouteGenerator, HostRoutes, ListenerHost, PathKind, RouteEntry,
    RouteTable, WILDCARD_HOSTNAME,
};
pub use metadata::{DataplaneMetadata, MetadataAccessors, MetadataDecoder, OwningResource};
pub use tls::{KeyPair, TlsContextBuilder, WILDCARD_SERVICE};
