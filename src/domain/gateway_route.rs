//! Gateway route policy objects
//!
//! A `GatewayRoute` is the user-authored routing policy that attaches to the
//! HTTP listeners of a mesh gateway. Several of them may target the same
//! listener host; the route generator merges them into one table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Tag carrying the service name in backend destinations.
pub const SERVICE_TAG: &str = "meshplane.io/service";

/// Protocol a gateway listener accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListenerProtocol {
    Tcp,
    Tls,
    Udp,
    Http,
    Https,
}

/// One gateway route policy object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRoute {
    pub mesh: String,
    pub name: String,
    /// Hostnames this policy applies to. Empty means every host.
    #[serde(default)]
    pub hostnames: Vec<String>,
    #[serde(default)]
    pub rules: Vec<HttpRule>,
}

/// A routing rule: any of `matches` selects the shared action.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRule {
    #[serde(default)]
    pub matches: Vec<HttpMatch>,
    #[serde(default)]
    pub filters: Vec<HttpFilter>,
    #[serde(default)]
    pub backends: Vec<Backend>,
}

/// One match alternative of a rule. All declared criteria must hold.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpMatch {
    #[serde(default)]
    pub path: Option<PathMatch>,
    #[serde(default)]
    pub method: MethodMatch,
    #[serde(default)]
    pub headers: Vec<ValueMatch>,
    #[serde(default)]
    pub query_parameters: Vec<ValueMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMatch {
    #[serde(rename = "match")]
    pub kind: PathMatchKind,
    pub value: String,
}

impl PathMatch {
    pub fn exact(value: impl Into<String>) -> Self {
        Self {
            kind: PathMatchKind::Exact,
            value: value.into(),
        }
    }

    pub fn prefix(value: impl Into<String>) -> Self {
        Self {
            kind: PathMatchKind::Prefix,
            value: value.into(),
        }
    }

    pub fn regex(value: impl Into<String>) -> Self {
        Self {
            kind: PathMatchKind::Regex,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PathMatchKind {
    Exact,
    Prefix,
    Regex,
}

/// Header or query parameter predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMatch {
    #[serde(rename = "match", default)]
    pub kind: ValueMatchKind,
    pub name: String,
    pub value: String,
}

impl ValueMatch {
    pub fn exact(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: ValueMatchKind::Exact,
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn regex(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: ValueMatchKind::Regex,
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValueMatchKind {
    #[default]
    Exact,
    Regex,
}

/// The fixed set of HTTP verbs a rule can be constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Connect,
    Trace,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 9] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Connect,
        HttpMethod::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unsupported HTTP method '{}'", s))
    }
}

/// Method criterion of a match. `Any` is the explicit unconstrained value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<HttpMethod>", into = "Option<HttpMethod>")]
pub enum MethodMatch {
    #[default]
    Any,
    Only(HttpMethod),
}

impl From<Option<HttpMethod>> for MethodMatch {
    fn from(method: Option<HttpMethod>) -> Self {
        method.map_or(MethodMatch::Any, MethodMatch::Only)
    }
}

impl From<MethodMatch> for Option<HttpMethod> {
    fn from(method: MethodMatch) -> Self {
        match method {
            MethodMatch::Any => None,
            MethodMatch::Only(m) => Some(m),
        }
    }
}

/// A weighted forwarding target selected by destination tags.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    #[serde(default = "default_weight")]
    pub weight: u32,
    pub destination: BTreeMap<String, String>,
}

fn default_weight() -> u32 {
    1
}

impl Backend {
    /// Backend that targets a service by name.
    pub fn service(name: impl Into<String>, weight: u32) -> Self {
        Self {
            weight,
            destination: BTreeMap::from([(SERVICE_TAG.to_string(), name.into())]),
        }
    }
}

/// Request processing steps attached to a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HttpFilter {
    RequestHeader(RequestHeaderFilter),
    Mirror(MirrorFilter),
    Redirect(RedirectFilter),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeaderValue {
    pub name: String,
    pub value: String,
}

impl HeaderValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestHeaderFilter {
    #[serde(default)]
    pub set: Vec<HeaderValue>,
    #[serde(default)]
    pub add: Vec<HeaderValue>,
    #[serde(default)]
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorFilter {
    pub backend: Backend,
    /// Share of requests to mirror, 0-100. Absent means all of them.
    #[serde(default)]
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectFilter {
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub port: u32,
    #[serde(default)]
    pub status_code: u32,
}
