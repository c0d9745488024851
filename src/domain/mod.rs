//! Domain types
//!
//! Policy objects and resources the generators consume. These are plain,
//! serde-deserializable data with no knowledge of Envoy protobufs.

pub mod dataplane;
pub mod gateway_route;
pub mod mesh;
pub mod resource;

pub use dataplane::{
    AgentVersion, DataplaneResource, EnvoyVersion, ProxyType, Version, ZoneIngressResource,
};
pub use gateway_route::{
    Backend, GatewayRoute, HttpFilter, HttpMatch, HttpMethod, HttpRule, ListenerProtocol,
    MethodMatch, PathMatch, PathMatchKind, ValueMatch, ValueMatchKind,
};
pub use mesh::{MeshIdentityPolicy, MeshResource, MtlsMode};
pub use resource::CoreResource;
