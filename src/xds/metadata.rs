//! Dataplane node metadata
//!
//! On first contact a proxy sends its environment-specific configuration in
//! the node metadata `Struct` of the discovery request. The decoder here is
//! best-effort: every field is read independently and a malformed field is
//! logged and left at its zero value. Decoding never fails the connection.

use std::collections::BTreeMap;

use envoy_types::pb::google::protobuf::{value::Kind, Struct, Value};
use serde_json::Value as JsonValue;
use tracing::{debug, warn, Span};

use crate::domain::{
    CoreResource, DataplaneResource, ProxyType, Version, ZoneIngressResource,
};

pub const FIELD_DATAPLANE_TOKEN: &str = "dataplane.token";
pub const FIELD_ADMIN_PORT: &str = "dataplane.admin.port";
pub const FIELD_DNS_PORT: &str = "dataplane.dns.port";
pub const FIELD_EMPTY_DNS_PORT: &str = "dataplane.dns.empty.port";
pub const FIELD_DATAPLANE_RESOURCE: &str = "dataplane.resource";
pub const FIELD_DYNAMIC_METADATA: &str = "dynamicMetadata";
pub const FIELD_PROXY_TYPE: &str = "dataplane.proxyType";
pub const FIELD_VERSION: &str = "version";

/// The resource a proxy claims to run for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwningResource {
    Dataplane(DataplaneResource),
    ZoneIngress(ZoneIngressResource),
}

impl OwningResource {
    pub fn dataplane(&self) -> Option<&DataplaneResource> {
        match self {
            OwningResource::Dataplane(dataplane) => Some(dataplane),
            OwningResource::ZoneIngress(_) => None,
        }
    }

    pub fn zone_ingress(&self) -> Option<&ZoneIngressResource> {
        match self {
            OwningResource::ZoneIngress(ingress) => Some(ingress),
            OwningResource::Dataplane(_) => None,
        }
    }
}

/// Environment-specific part of a proxy's configuration.
///
/// Captured once per xDS connection and replaced wholesale on reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataplaneMetadata {
    pub dataplane_token: String,
    pub resource: Option<OwningResource>,
    pub admin_port: u32,
    pub dns_port: u32,
    pub empty_dns_port: u32,
    pub dynamic_metadata: BTreeMap<String, String>,
    /// Raw proxy type, empty when the proxy did not report one.
    pub proxy_type: String,
    pub version: Option<Version>,
}

impl DataplaneMetadata {
    pub fn dataplane_resource(&self) -> Option<&DataplaneResource> {
        self.resource.as_ref().and_then(OwningResource::dataplane)
    }

    pub fn zone_ingress_resource(&self) -> Option<&ZoneIngressResource> {
        self.resource
            .as_ref()
            .and_then(OwningResource::zone_ingress)
    }

    pub fn proxy_type(&self) -> ProxyType {
        ProxyType::from_raw(&self.proxy_type)
    }

    /// Value of a dynamic metadata tag, `""` when absent.
    pub fn dynamic_metadata(&self, key: &str) -> &str {
        self.dynamic_metadata
            .get(key)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Accessors for metadata that may never have been received.
///
/// Every accessor returns the field's zero value when the metadata is absent:
/// `""` for strings, `0` for ports, `None` for the resource and version, and
/// [`ProxyType::Dataplane`] for the proxy type.
pub trait MetadataAccessors<'a> {
    fn dataplane_token(self) -> &'a str;
    fn dataplane_resource(self) -> Option<&'a DataplaneResource>;
    fn zone_ingress_resource(self) -> Option<&'a ZoneIngressResource>;
    fn proxy_type(self) -> ProxyType;
    fn admin_port(self) -> u32;
    fn dns_port(self) -> u32;
    fn empty_dns_port(self) -> u32;
    fn dynamic_metadata(self, key: &str) -> &'a str;
    fn version(self) -> Option<&'a Version>;
}

impl<'a> MetadataAccessors<'a> for Option<&'a DataplaneMetadata> {
    fn dataplane_token(self) -> &'a str {
        self.map_or("", |m| m.dataplane_token.as_str())
    }

    fn dataplane_resource(self) -> Option<&'a DataplaneResource> {
        self.and_then(DataplaneMetadata::dataplane_resource)
    }

    fn zone_ingress_resource(self) -> Option<&'a ZoneIngressResource> {
        self.and_then(DataplaneMetadata::zone_ingress_resource)
    }

    fn proxy_type(self) -> ProxyType {
        self.map_or(ProxyType::Dataplane, DataplaneMetadata::proxy_type)
    }

    fn admin_port(self) -> u32 {
        self.map_or(0, |m| m.admin_port)
    }

    fn dns_port(self) -> u32 {
        self.map_or(0, |m| m.dns_port)
    }

    fn empty_dns_port(self) -> u32 {
        self.map_or(0, |m| m.empty_dns_port)
    }

    fn dynamic_metadata(self, key: &str) -> &'a str {
        self.map_or("", |m| m.dynamic_metadata(key))
    }

    fn version(self) -> Option<&'a Version> {
        self.and_then(|m| m.version.as_ref())
    }
}

/// Decodes node metadata into [`DataplaneMetadata`].
#[derive(Debug, Clone)]
pub struct MetadataDecoder {
    span: Span,
}

impl Default for MetadataDecoder {
    fn default() -> Self {
        Self::new(crate::generation_span!("dataplane-metadata"))
    }
}

impl MetadataDecoder {
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    pub fn decode(&self, metadata: Option<&Struct>) -> DataplaneMetadata {
        let mut decoded = DataplaneMetadata::default();
        let Some(metadata) = metadata else {
            return decoded;
        };

        if let Some(value) = metadata.fields.get(FIELD_DATAPLANE_TOKEN) {
            decoded.dataplane_token = string_value(value).to_string();
        }
        if let Some(value) = metadata.fields.get(FIELD_PROXY_TYPE) {
            decoded.proxy_type = string_value(value).to_string();
        }

        decoded.admin_port = self.port(metadata, FIELD_ADMIN_PORT);
        decoded.dns_port = self.port(metadata, FIELD_DNS_PORT);
        decoded.empty_dns_port = self.port(metadata, FIELD_EMPTY_DNS_PORT);

        if let Some(value) = metadata.fields.get(FIELD_DATAPLANE_RESOURCE) {
            decoded.resource = self.resource(value);
        }

        if let Some(value) = metadata.fields.get(FIELD_DYNAMIC_METADATA) {
            decoded.dynamic_metadata = match &value.kind {
                Some(Kind::StructValue(tags)) => tags
                    .fields
                    .iter()
                    .map(|(key, tag)| (key.clone(), string_value(tag).to_string()))
                    .collect(),
                _ => BTreeMap::new(),
            };
        }

        if let Some(value) = metadata.fields.get(FIELD_VERSION) {
            decoded.version = self.version(value);
        }

        let proxy_type = decoded.proxy_type();
        debug!(
            parent: &self.span,
            proxy_type = proxy_type.as_str(),
            has_resource = decoded.resource.is_some(),
            has_version = decoded.version.is_some(),
            "Decoded dataplane metadata"
        );

        decoded
    }

    fn port(&self, metadata: &Struct, field: &str) -> u32 {
        let Some(value) = metadata.fields.get(field) else {
            return 0;
        };

        match string_value(value).parse::<u32>() {
            Ok(port) => port,
            Err(e) => {
                warn!(
                    parent: &self.span,
                    field,
                    value = %value_to_json(value),
                    error = %e,
                    "Invalid value in dataplane metadata"
                );
                0
            }
        }
    }

    fn resource(&self, value: &Value) -> Option<OwningResource> {
        match CoreResource::from_json(string_value(value)) {
            Ok(CoreResource::Dataplane(dataplane)) => Some(OwningResource::Dataplane(dataplane)),
            Ok(CoreResource::ZoneIngress(ingress)) => Some(OwningResource::ZoneIngress(ingress)),
            Ok(other) => {
                warn!(
                    parent: &self.span,
                    field = FIELD_DATAPLANE_RESOURCE,
                    resource_type = other.type_name(),
                    "Unsupported dataplane resource type"
                );
                None
            }
            Err(e) => {
                warn!(
                    parent: &self.span,
                    field = FIELD_DATAPLANE_RESOURCE,
                    value = %value_to_json(value),
                    error = %e,
                    "Invalid value in dataplane metadata"
                );
                None
            }
        }
    }

    fn version(&self, value: &Value) -> Option<Version> {
        let decoded = match &value.kind {
            Some(Kind::StructValue(version)) => serde_json::from_value::<Version>(
                struct_to_json(version),
            )
            .map_err(|e| e.to_string()),
            _ => Err("expected a struct value".to_string()),
        };

        match decoded {
            Ok(version) => Some(version),
            Err(error) => {
                warn!(
                    parent: &self.span,
                    field = FIELD_VERSION,
                    value = %value_to_json(value),
                    error = %error,
                    "Invalid value in dataplane metadata"
                );
                None
            }
        }
    }
}

/// String content of `value`, `""` for any other kind.
fn string_value(value: &Value) -> &str {
    match &value.kind {
        Some(Kind::StringValue(s)) => s,
        _ => "",
    }
}

fn struct_to_json(s: &Struct) -> JsonValue {
    JsonValue::Object(
        s.fields.iter().map(|(key, value)| (key.clone(), value_to_json(value))).collect(),
    )
}

fn value_to_json(value: &Value) -> JsonValue {
    match &value.kind {
        Some(Kind::NullValue(_)) | None => JsonValue::Null,
        Some(Kind::BoolValue(b)) => JsonValue::Bool(*b),
        Some(Kind::NumberValue(n)) => {
            serde_json::Number::from_f64(*n).map_or(JsonValue::Null, JsonValue::Number)
        }
        Some(Kind::StringValue(s)) => JsonValue::String(s.clone()),
        Some(Kind::ListValue(list)) => {
            JsonValue::Array(list.values.iter().map(value_to_json).collect())
        }
        Some(Kind::StructValue(s)) => struct_to_json(s),
    }
}
