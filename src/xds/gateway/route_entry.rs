//! Route table entries
//!
//! A [`RouteEntry`] is one line of a gateway route table: a single match
//! alternative paired with the action of the rule it came from. Entries are
//! still mesh-level data; `virtual_host` turns them into Envoy routes.

use std::collections::BTreeMap;

use crate::domain::gateway_route::{
    HeaderValue, HttpFilter, HttpMatch, HttpRule, MethodMatch, PathMatchKind, ValueMatchKind,
};

/// `(name, value)` pair used for header and query predicates and mutations.
pub type Pair = (String, String);

pub fn pair(name: impl Into<String>, value: impl Into<String>) -> Pair {
    (name.into(), value.into())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpec {
    Exact(String),
    Prefix(String),
    Regex(String),
}

/// Classification used to dedup and order entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Exact,
    Prefix,
    /// Regex paths and entries that only match on method, headers or query.
    Other,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteMatch {
    pub path: Option<PathSpec>,
    pub method: MethodMatch,
    pub exact_header: Vec<Pair>,
    pub regex_header: Vec<Pair>,
    pub exact_query: Vec<Pair>,
    pub regex_query: Vec<Pair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Destination {
    pub destination: BTreeMap<String, String>,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Redirection {
    pub status: u32,
    pub scheme: String,
    pub host: String,
    pub port: u32,
    pub strip_query: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteAction {
    pub forward: Vec<Destination>,
    pub redirect: Option<Redirection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mirror {
    /// Share of requests copied to `forward`, 0-100.
    pub percentage: f64,
    pub forward: Destination,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Headers {
    pub replace: Vec<Pair>,
    pub append: Vec<Pair>,
    pub delete: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteEntry {
    /// Name of the policy object the entry was generated from.
    pub policy: String,
    pub r#match: RouteMatch,
    pub action: RouteAction,
    pub mirror: Option<Mirror>,
    pub request_headers: Option<Headers>,
}

impl RouteEntry {
    pub fn path_kind(&self) -> PathKind {
        match self.r#match.path {
            Some(PathSpec::Exact(_)) => PathKind::Exact,
            Some(PathSpec::Prefix(_)) => PathKind::Prefix,
            Some(PathSpec::Regex(_)) | None => PathKind::Other,
        }
    }
}

/// Build the payload shared by every match alternative of `rule`. The match
/// itself is left empty.
pub fn make_route_entry(policy: &str, rule: &HttpRule) -> RouteEntry {
    let mut entry = RouteEntry {
        policy: policy.to_string(),
        ..Default::default()
    };

    entry.action.forward = rule
        .backends
        .iter()
        .map(|b| Destination {
            destination: b.destination.clone(),
            weight: b.weight,
        })
        .collect();

    for filter in &rule.filters {
        match filter {
            HttpFilter::Redirect(r) => {
                entry.action.redirect = Some(Redirection {
                    status: r.status_code,
                    scheme: r.scheme.clone(),
                    host: r.hostname.clone(),
                    port: r.port,
                    strip_query: true,
                });
            }
            HttpFilter::Mirror(m) => {
                entry.mirror = Some(Mirror {
                    percentage: m.percentage.unwrap_or(100.0),
                    forward: Destination {
                        destination: m.backend.destination.clone(),
                        weight: 0,
                    },
                });
            }
            HttpFilter::RequestHeader(h) => {
                let headers = entry.request_headers.get_or_insert_with(Headers::default);
                headers.replace.extend(h.set.iter().map(header_pair));
                headers.append.extend(h.add.iter().map(header_pair));
                headers.delete.extend(h.remove.iter().cloned());
            }
        }
    }

    entry
}

fn header_pair(header: &HeaderValue) -> Pair {
    pair(&header.name, &header.value)
}

/// Split a match alternative into the entry's predicates. A path with an
/// empty value constrains nothing and is dropped.
pub fn make_route_match(rule_match: &HttpMatch) -> RouteMatch {
    let path = rule_match
        .path
        .as_ref()
        .filter(|p| !p.value.is_empty())
        .map(|p| match p.kind {
            PathMatchKind::Exact => PathSpec::Exact(p.value.clone()),
            PathMatchKind::Prefix => PathSpec::Prefix(p.value.clone()),
            PathMatchKind::Regex => PathSpec::Regex(p.value.clone()),
        });

    let mut m = RouteMatch {
        path,
        method: rule_match.method,
        ..Default::default()
    };

    for h in &rule_match.headers {
        match h.kind {
            ValueMatchKind::Exact => m.exact_header.push(pair(&h.name, &h.value)),
            ValueMatchKind::Regex => m.regex_header.push(pair(&h.name, &h.value)),
        }
    }

    for q in &rule_match.query_parameters {
        match q.kind {
            ValueMatchKind::Exact => m.exact_query.push(pair(&q.name, &q.value)),
            ValueMatchKind::Regex => m.regex_query.push(pair(&q.name, &q.value)),
        }
    }

    m
}
