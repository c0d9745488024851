//! Workload identity naming
//!
//! Mesh identities are URIs of the form `<scheme>://<mesh>/<service>`. The
//! certificate issuer and the validation contexts built here must derive
//! exactly the same strings, otherwise upstream verification fails closed.

use envoy_types::pb::envoy::r#type::matcher::v3::{string_matcher::MatchPattern, StringMatcher};

/// Scheme of tag identity URIs, `meshplane://<tag>/<value>`.
pub const TAG_ID_SCHEME: &str = "meshplane";

/// Identity URI prefix shared by every member of `mesh`.
pub fn mesh_spiffe_id_prefix(scheme: &str, mesh: &str) -> String {
    format!("{}://{}/", scheme, mesh)
}

/// Identity URI of `service` inside `mesh`.
pub fn service_spiffe_id(scheme: &str, mesh: &str, service: &str) -> String {
    format!("{}{}", mesh_spiffe_id_prefix(scheme, mesh), service)
}

/// SAN matcher accepting any identity issued for `mesh`.
pub fn mesh_spiffe_id_prefix_matcher(scheme: &str, mesh: &str) -> StringMatcher {
    StringMatcher {
        match_pattern: Some(MatchPattern::Prefix(mesh_spiffe_id_prefix(scheme, mesh))),
        ..Default::default()
    }
}

/// SAN matcher accepting only the identity of `service` in `mesh`.
pub fn service_spiffe_id_matcher(scheme: &str, mesh: &str, service: &str) -> StringMatcher {
    StringMatcher {
        match_pattern: Some(MatchPattern::Exact(service_spiffe_id(scheme, mesh, service))),
        ..Default::default()
    }
}

/// Identity URI naming a single tag value, such as a zone or a service.
pub fn tag_id(tag_name: &str, tag_value: &str) -> String {
    format!("{}://{}/{}", TAG_ID_SCHEME, tag_name, tag_value)
}

/// SAN matcher accepting only the identity derived from one tag value.
pub fn tag_id_matcher(tag_name: &str, tag_value: &str) -> StringMatcher {
    StringMatcher {
        match_pattern: Some(MatchPattern::Exact(tag_id(tag_name, tag_value))),
        ..Default::default()
    }
}
