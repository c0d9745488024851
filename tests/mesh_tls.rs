//! Integration tests for mesh mTLS context generation
//!
//! Covers the contract between the identity naming used by the certificate
//! issuer and the SAN matchers emitted into Envoy TLS contexts.

use envoy_types::pb::envoy::config::core::v3::transport_socket::ConfigType;
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::{
    common_tls_context::ValidationContextType, CommonTlsContext, DownstreamTlsContext,
    UpstreamTlsContext,
};
use envoy_types::pb::envoy::r#type::matcher::v3::string_matcher::MatchPattern;
use meshplane::domain::{MeshIdentityPolicy, MeshResource, MtlsMode};
use meshplane::xds::identity::service_spiffe_id;
use meshplane::xds::tls::{downstream_transport_socket, upstream_transport_socket};
use meshplane::xds::{TlsContextBuilder, WILDCARD_SERVICE};
use meshplane::{Error, IdentityConfig};
use prost::Message;

#[allow(deprecated)]
fn san_patterns(common: &CommonTlsContext) -> Vec<MatchPattern> {
    match common.validation_context_type.as_ref() {
        Some(ValidationContextType::CombinedValidationContext(combined)) => combined
            .default_validation_context
            .iter()
            .flat_map(|ctx| &ctx.match_subject_alt_names)
            .filter_map(|m| m.match_pattern.clone())
            .collect(),
        other => panic!("expected combined validation context, got {:?}", other),
    }
}

fn mesh_policy(raw: &str) -> MeshIdentityPolicy {
    let mesh: MeshResource = serde_json::from_str(raw).expect("valid mesh resource");
    mesh.identity_policy()
}

#[test]
fn test_disabled_mesh_emits_plaintext() {
    let builder = TlsContextBuilder::default();
    let policy = mesh_policy(r#"{"name": "default"}"#);

    assert!(!policy.mtls_enabled());
    assert!(builder.downstream(&policy).unwrap().is_none());
    assert!(builder.upstream(&policy, "web", "web").unwrap().is_none());
    let wildcard = builder.upstream(&policy, WILDCARD_SERVICE, "").unwrap();
    assert!(wildcard.is_none());
}

#[test]
fn test_upstream_identity_matches_issued_identity() {
    let identity = IdentityConfig::default();
    let builder = TlsContextBuilder::new(identity.clone(), tracing::Span::none());
    let policy = MeshIdentityPolicy::enabled("payments", MtlsMode::Strict);

    for service in ["ledger", "ledger-v2", "fraud.checks"] {
        let ctx = builder.upstream(&policy, service, service).unwrap();
        let common = ctx.and_then(|ctx| ctx.common_tls_context).unwrap();
        let issued = service_spiffe_id(&identity.spiffe_scheme, "payments", service);
        assert_eq!(san_patterns(&common), vec![MatchPattern::Exact(issued)]);
    }
}

#[test]
fn test_wildcard_and_service_matchers_differ() {
    let builder = TlsContextBuilder::default();
    let policy = MeshIdentityPolicy::enabled("default", MtlsMode::Permissive);

    let any = builder
        .upstream(&policy, WILDCARD_SERVICE, "")
        .unwrap()
        .unwrap();
    let web = builder.upstream(&policy, "web", "web").unwrap().unwrap();
    let api = builder.upstream(&policy, "api", "api").unwrap().unwrap();

    let any = san_patterns(any.common_tls_context.as_ref().unwrap());
    let web = san_patterns(web.common_tls_context.as_ref().unwrap());
    let api = san_patterns(api.common_tls_context.as_ref().unwrap());

    assert_eq!(any, vec![MatchPattern::Prefix("spiffe://default/".into())]);
    assert_ne!(any, web);
    assert_ne!(web, api);
}

#[test]
fn test_mesh_resource_secret_handles() {
    let policy = mesh_policy(
        r#"{"name": "edge", "mtls": {"enabled": true, "mode": "PERMISSIVE",
            "caSecret": "edge_ca", "identitySecret": "edge_identity"}}"#,
    );
    assert_eq!(policy.mode, MtlsMode::Permissive);

    let builder = TlsContextBuilder::default();
    let ctx = builder.downstream(&policy).unwrap().unwrap();
    let common = ctx.common_tls_context.unwrap();
    let identity = &common.tls_certificate_sds_secret_configs[0];
    assert_eq!(identity.name, "edge_identity");
}

#[test]
fn test_contexts_round_trip_through_transport_sockets() {
    let builder = TlsContextBuilder::default();
    let policy = MeshIdentityPolicy::enabled("default", MtlsMode::Strict);

    let downstream = builder.downstream(&policy).unwrap().unwrap();
    let socket = downstream_transport_socket(&downstream).unwrap();
    let Some(ConfigType::TypedConfig(any)) = socket.config_type else {
        panic!("expected typed config");
    };
    let decoded = DownstreamTlsContext::decode(any.value.as_slice()).unwrap();
    assert_eq!(decoded, downstream);

    let upstream = builder.upstream(&policy, "web", "web").unwrap().unwrap();
    let socket = upstream_transport_socket(&upstream).unwrap();
    let Some(ConfigType::TypedConfig(any)) = socket.config_type else {
        panic!("expected typed config");
    };
    let decoded = UpstreamTlsContext::decode(any.value.as_slice()).unwrap();
    assert_eq!(decoded, upstream);
}

#[test]
fn test_enabled_policy_without_mesh_is_rejected() {
    let policy = MeshIdentityPolicy::enabled("  ", MtlsMode::Strict);
    let err = TlsContextBuilder::default().downstream(&policy).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}
