//! TLS context generation for mesh and non-mesh traffic
//!
//! Mesh contexts never inline key material. They reference the mesh CA and the
//! proxy identity certificate as SDS secrets delivered over ADS, and pin the
//! peer identity through a SAN matcher derived from the mesh and service names.
//!
//! A mesh with mTLS disabled produces `Ok(None)`: the caller then emits a
//! plaintext listener or cluster. Errors are reserved for configuration that
//! cannot be built correctly, so a half-secured listener is never emitted.

use envoy_types::pb::envoy::config::core::v3::{
    config_source::ConfigSourceSpecifier, data_source::Specifier,
    transport_socket::ConfigType as TransportSocketConfigType, AggregatedConfigSource, ApiVersion,
    ConfigSource, DataSource, TransportSocket,
};
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::common_tls_context::{
    CombinedCertificateValidationContext, ValidationContextType,
};
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::{
    CertificateValidationContext, CommonTlsContext, DownstreamTlsContext, SdsSecretConfig,
    TlsCertificate, UpstreamTlsContext,
};
use envoy_types::pb::envoy::r#type::matcher::v3::{string_matcher::MatchPattern, StringMatcher};
use envoy_types::pb::google::protobuf::{Any, BoolValue};
use prost::Message;
use tracing::{debug, Span};

use crate::config::IdentityConfig;
use crate::domain::MeshIdentityPolicy;
use crate::xds::identity::{mesh_spiffe_id_prefix_matcher, service_spiffe_id_matcher};
use crate::{Error, Result};

/// Upstream service value meaning "any member of the mesh".
pub const WILDCARD_SERVICE: &str = "*";

pub const TLS_TRANSPORT_SOCKET_NAME: &str = "envoy.transport_sockets.tls";

pub const DOWNSTREAM_TLS_CONTEXT_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.DownstreamTlsContext";

pub const UPSTREAM_TLS_CONTEXT_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.UpstreamTlsContext";

/// PEM encoded certificate and private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

/// Builds mesh TLS contexts from a mesh identity policy.
#[derive(Debug, Clone)]
pub struct TlsContextBuilder {
    identity: IdentityConfig,
    span: Span,
}

impl Default for TlsContextBuilder {
    fn default() -> Self {
        Self::new(
            IdentityConfig::default(),
            crate::generation_span!("mesh-tls"),
        )
    }
}

impl TlsContextBuilder {
    pub fn new(identity: IdentityConfig, span: Span) -> Self {
        Self { identity, span }
    }

    /// Context for inbound connections from other mesh members.
    ///
    /// Requires a client certificate whose URI SAN starts with
    /// `spiffe://<mesh>/` and serves the proxy identity certificate.
    pub fn downstream(&self, policy: &MeshIdentityPolicy) -> Result<Option<DownstreamTlsContext>> {
        if !policy.mtls_enabled() {
            return Ok(None);
        }
        validate_mesh_name(policy)?;

        let matcher = mesh_spiffe_id_prefix_matcher(&self.identity.spiffe_scheme, &policy.mesh);
        let common_tls_context = self.common_tls_context(policy, matcher);

        debug!(
            parent: &self.span,
            mesh = %policy.mesh,
            mode = ?policy.mode,
            "Built downstream mesh TLS context"
        );

        Ok(Some(DownstreamTlsContext {
            common_tls_context: Some(common_tls_context),
            require_client_certificate: Some(BoolValue { value: true }),
            ..Default::default()
        }))
    }

    /// Context for outbound connections to `service`.
    ///
    /// With [`WILDCARD_SERVICE`] any mesh member is accepted; otherwise the
    /// upstream must present exactly `spiffe://<mesh>/<service>`. The client
    /// certificate carries every inbound identity of this proxy, since a
    /// request cannot be tied back to the inbound that triggered it.
    pub fn upstream(
        &self,
        policy: &MeshIdentityPolicy,
        service: &str,
        sni: &str,
    ) -> Result<Option<UpstreamTlsContext>> {
        if !policy.mtls_enabled() {
            return Ok(None);
        }
        validate_mesh_name(policy)?;
        if service.is_empty() {
            return Err(Error::validation_field(
                "Upstream service name cannot be empty",
                "service",
            ));
        }

        let scheme = &self.identity.spiffe_scheme;
        let matcher = if service == WILDCARD_SERVICE {
            mesh_spiffe_id_prefix_matcher(scheme, &policy.mesh)
        } else {
            service_spiffe_id_matcher(scheme, &policy.mesh, service)
        };

        let mut common_tls_context = self.common_tls_context(policy, matcher);
        common_tls_context.alpn_protocols = self.identity.alpn_protocols.clone();

        debug!(
            parent: &self.span,
            mesh = %policy.mesh,
            service,
            sni,
            "Built upstream mesh TLS context"
        );

        Ok(Some(UpstreamTlsContext {
            common_tls_context: Some(common_tls_context),
            sni: sni.to_string(),
            ..Default::default()
        }))
    }

    fn common_tls_context(
        &self,
        policy: &MeshIdentityPolicy,
        san_matcher: StringMatcher,
    ) -> CommonTlsContext {
        let ca_secret = policy
            .ca_secret
            .as_deref()
            .unwrap_or(&self.identity.mesh_ca_secret);
        let identity_secret = policy
            .identity_secret
            .as_deref()
            .unwrap_or(&self.identity.identity_cert_secret);

        #[allow(deprecated)]
        let default_validation_context = CertificateValidationContext {
            match_subject_alt_names: vec![san_matcher],
            ..Default::default()
        };

        let combined = CombinedCertificateValidationContext {
            default_validation_context: Some(default_validation_context),
            validation_context_sds_secret_config: Some(sds_secret_config(ca_secret)),
            ..Default::default()
        };

        CommonTlsContext {
            validation_context_type: Some(ValidationContextType::CombinedValidationContext(
                combined,
            )),
            tls_certificate_sds_secret_configs: vec![sds_secret_config(identity_secret)],
            ..Default::default()
        }
    }
}

fn validate_mesh_name(policy: &MeshIdentityPolicy) -> Result<()> {
    if policy.mesh.trim().is_empty() {
        return Err(Error::validation_field(
            "Mesh name is required when mTLS is enabled",
            "mesh",
        ));
    }
    Ok(())
}

/// SDS secret reference resolved over the aggregated xDS stream.
fn sds_secret_config(name: &str) -> SdsSecretConfig {
    SdsSecretConfig {
        name: name.to_string(),
        sds_config: Some(ConfigSource {
            resource_api_version: ApiVersion::V3 as i32,
            config_source_specifier: Some(ConfigSourceSpecifier::Ads(
                AggregatedConfigSource::default(),
            )),
            ..Default::default()
        }),
    }
}

fn data_source_from_bytes(bytes: &[u8]) -> DataSource {
    DataSource {
        specifier: Some(Specifier::InlineBytes(bytes.to_vec())),
        ..Default::default()
    }
}

/// Context for an upstream outside the mesh (external services).
///
/// Material is inlined. The client certificate is only set when both the
/// certificate and the key are given; peer verification is only set when a
/// CA is given, and then pins the exact `hostname` as SAN.
pub fn upstream_tls_context_outside_mesh(
    ca: Option<&[u8]>,
    cert: Option<&[u8]>,
    key: Option<&[u8]>,
    allow_renegotiation: bool,
    hostname: &str,
    sni: &str,
) -> UpstreamTlsContext {
    let tls_certificates = match (cert, key) {
        (Some(cert), Some(key)) => vec![TlsCertificate {
            certificate_chain: Some(data_source_from_bytes(cert)),
            private_key: Some(data_source_from_bytes(key)),
            ..Default::default()
        }],
        _ => Vec::new(),
    };

    #[allow(deprecated)]
    let validation_context_type = ca.map(|ca| {
        ValidationContextType::ValidationContext(CertificateValidationContext {
            trusted_ca: Some(data_source_from_bytes(ca)),
            match_subject_alt_names: vec![StringMatcher {
                match_pattern: Some(MatchPattern::Exact(hostname.to_string())),
                ..Default::default()
            }],
            ..Default::default()
        })
    });

    UpstreamTlsContext {
        allow_renegotiation,
        sni: sni.to_string(),
        common_tls_context: Some(CommonTlsContext {
            tls_certificates,
            validation_context_type,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Context serving a fixed certificate without verifying peers. Used for
/// listeners outside the mesh trust domain.
pub fn static_downstream_tls_context(key_pair: &KeyPair) -> DownstreamTlsContext {
    DownstreamTlsContext {
        common_tls_context: Some(CommonTlsContext {
            tls_certificates: vec![TlsCertificate {
                certificate_chain: Some(data_source_from_bytes(&key_pair.cert_pem)),
                private_key: Some(data_source_from_bytes(&key_pair.key_pem)),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Wrap a downstream context into the TLS transport socket of a filter chain.
pub fn downstream_transport_socket(context: &DownstreamTlsContext) -> Result<TransportSocket> {
    tls_transport_socket(DOWNSTREAM_TLS_CONTEXT_TYPE_URL, context)
}

/// Wrap an upstream context into the TLS transport socket of a cluster.
pub fn upstream_transport_socket(context: &UpstreamTlsContext) -> Result<TransportSocket> {
    tls_transport_socket(UPSTREAM_TLS_CONTEXT_TYPE_URL, context)
}

fn tls_transport_socket<M: Message>(type_url: &str, context: &M) -> Result<TransportSocket> {
    let mut value = Vec::with_capacity(context.encoded_len());
    context
        .encode(&mut value)
        .map_err(|e| Error::from(e).add_context(type_url))?;

    Ok(TransportSocket {
        name: TLS_TRANSPORT_SOCKET_NAME.to_string(),
        config_type: Some(TransportSocketConfigType::TypedConfig(Any {
            type_url: type_url.to_string(),
            value,
        })),
    })
}
