//! Route table to Envoy virtual host conversion
//!
//! Each [`RouteEntry`] becomes one Envoy `Route`. Envoy picks the first route
//! that matches, so routes are emitted most specific first: exact paths,
//! then prefixes from longest to shortest, then regex paths, then entries
//! without a path. Entries of the same rank keep their table order.
//!
//! Backends are addressed by cluster name: the value of the service tag,
//! followed by the remaining destination tags in `{k=v,...}` form when there
//! are any.

use envoy_types::pb::envoy::config::core::v3::{
    header_value_option::HeaderAppendAction, HeaderValue, HeaderValueOption,
    RuntimeFractionalPercent,
};
use envoy_types::pb::envoy::config::route::v3::{
    header_matcher::HeaderMatchSpecifier,
    query_parameter_matcher::QueryParameterMatchSpecifier,
    redirect_action::{RedirectResponseCode, SchemeRewriteSpecifier},
    route::Action,
    route_action::{ClusterSpecifier, RequestMirrorPolicy},
    route_match::PathSpecifier,
    weighted_cluster::ClusterWeight,
    HeaderMatcher,
    QueryParameterMatcher,
    RedirectAction,
    Route,
    RouteAction as EnvoyRouteAction,
    RouteMatch as EnvoyRouteMatch,
    VirtualHost,
    WeightedCluster,
};
use envoy_types::pb::envoy::r#type::matcher::v3::{
    string_matcher::MatchPattern, RegexMatcher, StringMatcher,
};
use envoy_types::pb::envoy::r#type::v3::{fractional_percent::DenominatorType, FractionalPercent};
use envoy_types::pb::google::protobuf::UInt32Value;
use regex::Regex;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::debug;

use super::route_entry::{
    Destination, Headers, Mirror, Pair, PathSpec, Redirection, RouteEntry, RouteMatch,
};
use super::route_generator::{GatewayRouteGenerator, HostRoutes};
use super::{ListenerHost, RouteTable};
use crate::domain::gateway_route::{MethodMatch, SERVICE_TAG};
use crate::{Error, Result};

/// Build the virtual host serving `hostname` from its route table entries.
///
/// Returns `Ok(None)` for an empty table, so the host is left out of the
/// route configuration. Fails when an entry has no action or carries a
/// regular expression that does not compile.
pub fn build_virtual_host(hostname: &str, entries: &[RouteEntry]) -> Result<Option<VirtualHost>> {
    if entries.is_empty() {
        return Ok(None);
    }

    let mut ordered: Vec<&RouteEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| specificity(entry));

    let routes = ordered
        .into_iter()
        .map(to_envoy_route)
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(VirtualHost {
        name: hostname.to_string(),
        domains: vec![hostname.to_string()],
        routes,
        ..Default::default()
    }))
}

impl GatewayRouteGenerator {
    /// Generate the route table of `host` and convert it into a virtual host.
    pub fn generate_virtual_host(&self, host: &ListenerHost) -> Result<Option<VirtualHost>> {
        let mut table = RouteTable::default();
        match self.generate_host(host, &mut table) {
            HostRoutes::NothingApplicable => Ok(None),
            HostRoutes::Appended(count) => {
                debug!(
                    parent: &self.span,
                    hostname = %host.hostname,
                    route_count = count,
                    "Building virtual host"
                );
                build_virtual_host(&host.hostname, &table.entries)
            }
        }
    }
}

/// Emission rank of an entry; lower sorts first.
fn specificity(entry: &RouteEntry) -> (u8, Reverse<usize>) {
    match &entry.r#match.path {
        Some(PathSpec::Exact(_)) => (0, Reverse(0)),
        Some(PathSpec::Prefix(prefix)) => (1, Reverse(prefix.len())),
        Some(PathSpec::Regex(_)) => (2, Reverse(0)),
        None => (3, Reverse(0)),
    }
}

fn to_envoy_route(entry: &RouteEntry) -> Result<Route> {
    let action = match &entry.action.redirect {
        Some(redirect) => Action::Redirect(to_redirect_action(redirect)),
        None => Action::Route(to_route_action(entry)?),
    };

    let mut route = Route {
        name: entry.policy.clone(),
        r#match: Some(to_envoy_route_match(&entry.r#match)?),
        action: Some(action),
        ..Default::default()
    };

    if let Some(headers) = &entry.request_headers {
        apply_request_headers(&mut route, headers);
    }

    Ok(route)
}

fn to_envoy_route_match(m: &RouteMatch) -> Result<EnvoyRouteMatch> {
    let path_specifier = match &m.path {
        Some(PathSpec::Exact(path)) => PathSpecifier::Path(path.clone()),
        Some(PathSpec::Prefix(prefix)) => PathSpecifier::Prefix(prefix.clone()),
        Some(PathSpec::Regex(regex)) => PathSpecifier::SafeRegex(regex_matcher(regex)?),
        None => PathSpecifier::Prefix("/".to_string()),
    };

    let mut headers = Vec::new();
    if let MethodMatch::Only(method) = m.method {
        headers.push(header_matcher(":method", exact(method.as_str())));
    }
    for (name, value) in &m.exact_header {
        headers.push(header_matcher(name, exact(value)));
    }
    for (name, value) in &m.regex_header {
        headers.push(header_matcher(name, safe_regex(value)?));
    }

    let mut query_parameters = Vec::new();
    for (name, value) in &m.exact_query {
        query_parameters.push(query_matcher(name, exact(value)));
    }
    for (name, value) in &m.regex_query {
        query_parameters.push(query_matcher(name, safe_regex(value)?));
    }

    Ok(EnvoyRouteMatch {
        path_specifier: Some(path_specifier),
        headers,
        query_parameters,
        ..Default::default()
    })
}

fn to_route_action(entry: &RouteEntry) -> Result<EnvoyRouteAction> {
    let cluster_specifier = match entry.action.forward.as_slice() {
        [] => {
            return Err(Error::validation(format!(
                "Route entry from '{}' has neither backends nor a redirect",
                entry.policy
            )))
        }
        [single] => ClusterSpecifier::Cluster(cluster_name(&single.destination)?),
        many => ClusterSpecifier::WeightedClusters(WeightedCluster {
            clusters: many.iter().map(cluster_weight).collect::<Result<Vec<_>>>()?,
            ..Default::default()
        }),
    };

    let request_mirror_policies = match &entry.mirror {
        Some(mirror) => vec![to_mirror_policy(mirror)?],
        None => Vec::new(),
    };

    #[allow(deprecated)]
    let route_action = EnvoyRouteAction {
        cluster_specifier: Some(cluster_specifier),
        request_mirror_policies,
        ..Default::default()
    };

    Ok(route_action)
}

fn cluster_weight(destination: &Destination) -> Result<ClusterWeight> {
    Ok(ClusterWeight {
        name: cluster_name(&destination.destination)?,
        weight: Some(UInt32Value {
            value: destination.weight,
        }),
        ..Default::default()
    })
}

/// Cluster name of a destination tag set.
pub fn cluster_name(destination: &BTreeMap<String, String>) -> Result<String> {
    let service = destination
        .get(SERVICE_TAG)
        .filter(|service| !service.is_empty())
        .ok_or_else(|| {
            Error::validation_field("Backend destination has no service tag", SERVICE_TAG)
        })?;

    let tags: Vec<String> = destination
        .iter()
        .filter(|(key, _)| key.as_str() != SERVICE_TAG)
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();

    if tags.is_empty() {
        Ok(service.clone())
    } else {
        Ok(format!("{}{{{}}}", service, tags.join(",")))
    }
}

fn to_mirror_policy(mirror: &Mirror) -> Result<RequestMirrorPolicy> {
    let percentage = mirror.percentage.clamp(0.0, 100.0);

    Ok(RequestMirrorPolicy {
        cluster: cluster_name(&mirror.forward.destination)?,
        runtime_fraction: Some(RuntimeFractionalPercent {
            default_value: Some(FractionalPercent {
                numerator: (percentage * 10_000.0).round() as u32,
                denominator: DenominatorType::Million as i32,
            }),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn to_redirect_action(redirect: &Redirection) -> RedirectAction {
    let scheme_rewrite_specifier = if redirect.scheme.is_empty() {
        None
    } else {
        Some(SchemeRewriteSpecifier::SchemeRedirect(redirect.scheme.clone()))
    };

    RedirectAction {
        scheme_rewrite_specifier,
        host_redirect: redirect.host.clone(),
        port_redirect: redirect.port,
        response_code: redirect_response_code(redirect.status) as i32,
        strip_query: redirect.strip_query,
        ..Default::default()
    }
}

fn redirect_response_code(status: u32) -> RedirectResponseCode {
    match status {
        302 => RedirectResponseCode::Found,
        303 => RedirectResponseCode::SeeOther,
        307 => RedirectResponseCode::TemporaryRedirect,
        308 => RedirectResponseCode::PermanentRedirect,
        _ => RedirectResponseCode::MovedPermanently,
    }
}

fn apply_request_headers(route: &mut Route, headers: &Headers) {
    let replace = headers
        .replace
        .iter()
        .map(|h| header_value_option(h, HeaderAppendAction::OverwriteIfExistsOrAdd));
    let append = headers
        .append
        .iter()
        .map(|h| header_value_option(h, HeaderAppendAction::AppendIfExistsOrAdd));
    let delete = headers.delete.iter().cloned();

    route.request_headers_to_add.extend(replace.chain(append));
    route.request_headers_to_remove.extend(delete);
}

fn header_value_option((key, value): &Pair, action: HeaderAppendAction) -> HeaderValueOption {
    HeaderValueOption {
        header: Some(HeaderValue {
            key: key.clone(),
            value: value.clone(),
            ..Default::default()
        }),
        append_action: action as i32,
        ..Default::default()
    }
}

fn header_matcher(name: &str, matcher: StringMatcher) -> HeaderMatcher {
    HeaderMatcher {
        name: name.to_string(),
        header_match_specifier: Some(HeaderMatchSpecifier::StringMatch(matcher)),
        ..Default::default()
    }
}

fn query_matcher(name: &str, matcher: StringMatcher) -> QueryParameterMatcher {
    QueryParameterMatcher {
        name: name.to_string(),
        query_parameter_match_specifier: Some(QueryParameterMatchSpecifier::StringMatch(matcher)),
    }
}

fn exact(value: &str) -> StringMatcher {
    StringMatcher {
        match_pattern: Some(MatchPattern::Exact(value.to_string())),
        ..Default::default()
    }
}

fn safe_regex(regex: &str) -> Result<StringMatcher> {
    Ok(StringMatcher {
        match_pattern: Some(MatchPattern::SafeRegex(regex_matcher(regex)?)),
        ..Default::default()
    })
}

/// The pattern must compile before it reaches Envoy.
fn regex_matcher(regex: &str) -> Result<RegexMatcher> {
    Regex::new(regex).map_err(|err| invalid_regex(regex, err))?;

    Ok(RegexMatcher {
        regex: regex.to_string(),
        ..Default::default()
    })
}

fn invalid_regex(regex: &str, err: regex::Error) -> Error {
    Error::validation(format!("Invalid route regex '{}': {}", regex, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateway_route::{
        Backend, GatewayRoute, HttpFilter, HttpMatch, HttpMethod, HttpRule, MirrorFilter,
        PathMatch, RedirectFilter, ValueMatch,
    };
    use crate::xds::gateway::route_entry::pair;
    use crate::xds::gateway::WILDCARD_HOSTNAME;

    fn forward_entry(service: &str) -> RouteEntry {
        let mut entry = RouteEntry {
            policy: "web".into(),
            ..Default::default()
        };
        entry.action.forward.push(Destination {
            destination: Backend::service(service, 1).destination,
            weight: 1,
        });
        entry
    }

    fn on_path(service: &str, path: PathSpec) -> RouteEntry {
        let mut entry = forward_entry(service);
        entry.policy = service.to_string();
        entry.r#match.path = Some(path);
        entry
    }

    fn route_action(route: &Route) -> &EnvoyRouteAction {
        match route.action.as_ref() {
            Some(Action::Route(action)) => action,
            other => panic!("expected route action, got {:?}", other),
        }
    }

    fn path_specifiers(vhost: &VirtualHost) -> Vec<PathSpecifier> {
        vhost
            .routes
            .iter()
            .filter_map(|r| r.r#match.as_ref()?.path_specifier.clone())
            .collect()
    }

    #[test]
    fn test_empty_table_has_no_virtual_host() {
        assert_eq!(build_virtual_host("example.com", &[]).unwrap(), None);
    }

    #[test]
    fn test_single_backend_route() {
        let entry = on_path("backend", PathSpec::Prefix("/api/".into()));

        let vhost = build_virtual_host("example.com", &[entry]).unwrap();
        let vhost = vhost.unwrap();
        assert_eq!(vhost.name, "example.com");
        assert_eq!(vhost.domains, vec!["example.com".to_string()]);
        assert_eq!(vhost.routes.len(), 1);

        let route = &vhost.routes[0];
        assert_eq!(route.name, "backend");
        assert_eq!(
            route.r#match.as_ref().unwrap().path_specifier,
            Some(PathSpecifier::Prefix("/api/".into()))
        );
        assert_eq!(
            route_action(route).cluster_specifier,
            Some(ClusterSpecifier::Cluster("backend".into()))
        );
    }

    #[test]
    fn test_routes_are_emitted_most_specific_first() {
        let mut unconstrained = forward_entry("header-only");
        unconstrained.policy = "header-only".into();
        unconstrained.r#match.exact_header = vec![pair("x-env", "prod")];

        let table = vec![
            unconstrained,
            on_path("regex", PathSpec::Regex("/r.*".into())),
            on_path("api", PathSpec::Prefix("/api/".into())),
            on_path("api-v2", PathSpec::Prefix("/api/v2/".into())),
            on_path("api-exact", PathSpec::Exact("/api".into())),
            on_path("z-exact", PathSpec::Exact("/z".into())),
        ];

        let vhost = build_virtual_host("example.com", &table).unwrap().unwrap();
        let names: Vec<&str> = vhost.routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "api-exact",
                "z-exact",
                "api-v2",
                "api",
                "regex",
                "header-only",
            ]
        );
    }

    #[test]
    fn test_same_rank_keeps_table_order() {
        let table = vec![
            on_path("second", PathSpec::Regex("/b.*".into())),
            on_path("first", PathSpec::Regex("/a.*".into())),
            on_path("long", PathSpec::Prefix("/aa/".into())),
            on_path("tie", PathSpec::Prefix("/bb/".into())),
        ];

        let vhost = build_virtual_host("example.com", &table).unwrap().unwrap();
        let names: Vec<&str> = vhost.routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["long", "tie", "second", "first"]);
    }

    #[test]
    fn test_match_without_path_uses_root_prefix() {
        let mut entry = forward_entry("backend");
        entry.r#match.method = MethodMatch::Only(HttpMethod::Delete);
        entry.r#match.exact_header = vec![pair("x-env", "prod")];
        entry.r#match.regex_header = vec![pair("x-team", "a|b")];
        entry.r#match.exact_query = vec![pair("page", "1")];
        entry.r#match.regex_query = vec![pair("sort", "asc|desc")];

        let route = to_envoy_route(&entry).unwrap();
        let m = route.r#match.unwrap();
        assert_eq!(m.path_specifier, Some(PathSpecifier::Prefix("/".into())));

        let names: Vec<&str> = m.headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec![":method", "x-env", "x-team"]);
        assert_eq!(
            m.headers[0].header_match_specifier,
            Some(HeaderMatchSpecifier::StringMatch(exact("DELETE")))
        );
        assert_eq!(
            m.headers[2].header_match_specifier,
            Some(HeaderMatchSpecifier::StringMatch(safe_regex("a|b").unwrap()))
        );

        assert_eq!(m.query_parameters.len(), 2);
        assert_eq!(m.query_parameters[1].name, "sort");
    }

    #[test]
    fn test_regex_path() {
        let entry = on_path("backend", PathSpec::Regex("/v[0-9]+/.*".into()));

        let route = to_envoy_route(&entry).unwrap();
        let expected = regex_matcher("/v[0-9]+/.*").unwrap();
        assert_eq!(
            route.r#match.unwrap().path_specifier,
            Some(PathSpecifier::SafeRegex(expected))
        );
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let entry = on_path("backend", PathSpec::Regex("/v(".into()));
        let err = build_virtual_host("example.com", &[entry]).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains("/v("));

        let mut entry = forward_entry("backend");
        entry.r#match.regex_header = vec![pair("x-env", "[prod")];
        let result = to_envoy_route(&entry);
        assert!(matches!(result, Err(Error::Validation { .. })));

        let mut entry = forward_entry("backend");
        entry.r#match.regex_query = vec![pair("page", "(")];
        let result = to_envoy_route(&entry);
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_weighted_backends() {
        let mut entry = forward_entry("web");
        entry.action.forward[0].weight = 90;
        entry.action.forward.push(Destination {
            destination: Backend::service("web-canary", 1).destination,
            weight: 10,
        });

        let route = to_envoy_route(&entry).unwrap();
        match &route_action(&route).cluster_specifier {
            Some(ClusterSpecifier::WeightedClusters(weighted)) => {
                let clusters: Vec<(&str, u32)> = weighted
                    .clusters
                    .iter()
                    .map(|c| (c.name.as_str(), c.weight.as_ref().unwrap().value))
                    .collect();
                assert_eq!(clusters, vec![("web", 90), ("web-canary", 10)]);
            }
            other => panic!("expected weighted clusters, got {:?}", other),
        }
    }

    #[test]
    fn test_cluster_name() {
        let mut destination = Backend::service("web", 1).destination;
        assert_eq!(cluster_name(&destination).unwrap(), "web");

        destination.insert("version".into(), "v2".into());
        destination.insert("region".into(), "eu".into());
        let name = cluster_name(&destination).unwrap();
        assert_eq!(name, "web{region=eu,version=v2}");

        destination.remove(SERVICE_TAG);
        let result = cluster_name(&destination);
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_entry_without_action_is_rejected() {
        let entry = RouteEntry {
            policy: "broken".into(),
            ..Default::default()
        };
        let err = build_virtual_host("example.com", &[entry]).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_redirect_route() {
        let mut entry = RouteEntry {
            policy: "redirect".into(),
            ..Default::default()
        };
        entry.action.redirect = Some(Redirection {
            status: 307,
            scheme: "https".into(),
            host: "secure.example.com".into(),
            port: 8443,
            strip_query: true,
        });

        let route = to_envoy_route(&entry).unwrap();
        match route.action {
            Some(Action::Redirect(redirect)) => {
                assert_eq!(
                    redirect.scheme_rewrite_specifier,
                    Some(SchemeRewriteSpecifier::SchemeRedirect("https".into()))
                );
                assert_eq!(redirect.host_redirect, "secure.example.com");
                assert_eq!(redirect.port_redirect, 8443);
                assert_eq!(
                    redirect.response_code,
                    RedirectResponseCode::TemporaryRedirect as i32
                );
                assert!(redirect.strip_query);
            }
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[test]
    fn test_redirect_response_codes() {
        let codes = [
            (301, RedirectResponseCode::MovedPermanently),
            (302, RedirectResponseCode::Found),
            (303, RedirectResponseCode::SeeOther),
            (307, RedirectResponseCode::TemporaryRedirect),
            (308, RedirectResponseCode::PermanentRedirect),
            (0, RedirectResponseCode::MovedPermanently),
        ];
        for (status, code) in codes {
            assert_eq!(redirect_response_code(status), code);
        }
    }

    #[test]
    fn test_mirror_policy() {
        let mut entry = forward_entry("web");
        entry.mirror = Some(Mirror {
            percentage: 12.5,
            forward: Destination {
                destination: Backend::service("shadow", 1).destination,
                weight: 0,
            },
        });

        let route = to_envoy_route(&entry).unwrap();
        let policies = &route_action(&route).request_mirror_policies;
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].cluster, "shadow");

        let runtime = policies[0].runtime_fraction.as_ref().unwrap();
        let fraction = runtime.default_value.as_ref().unwrap();
        assert_eq!(fraction.numerator, 125_000);
        assert_eq!(fraction.denominator, DenominatorType::Million as i32);
    }

    #[test]
    fn test_request_header_mutations() {
        let mut entry = forward_entry("web");
        entry.request_headers = Some(Headers {
            replace: vec![pair("x-a", "1")],
            append: vec![pair("x-b", "2")],
            delete: vec!["x-c".into()],
        });

        let route = to_envoy_route(&entry).unwrap();
        let added = &route.request_headers_to_add;
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].header.as_ref().unwrap().key, "x-a");
        assert_eq!(
            added[0].append_action,
            HeaderAppendAction::OverwriteIfExistsOrAdd as i32
        );
        assert_eq!(
            added[1].append_action,
            HeaderAppendAction::AppendIfExistsOrAdd as i32
        );
        assert_eq!(route.request_headers_to_remove, vec!["x-c".to_string()]);
    }

    #[test]
    fn test_generate_virtual_host() {
        let generator = GatewayRouteGenerator::default();
        let route = GatewayRoute {
            mesh: "default".into(),
            name: "echo".into(),
            hostnames: vec!["echo.example.com".into()],
            rules: vec![
                HttpRule {
                    matches: vec![HttpMatch {
                        path: Some(PathMatch::prefix("/echo")),
                        headers: vec![ValueMatch::exact("x-debug", "1")],
                        ..Default::default()
                    }],
                    filters: vec![HttpFilter::Mirror(MirrorFilter {
                        backend: Backend::service("echo-shadow", 1),
                        percentage: None,
                    })],
                    backends: vec![Backend::service("echo", 1)],
                },
                HttpRule {
                    matches: vec![HttpMatch {
                        path: Some(PathMatch::exact("/old")),
                        ..Default::default()
                    }],
                    filters: vec![HttpFilter::Redirect(RedirectFilter {
                        scheme: "https".into(),
                        status_code: 301,
                        ..Default::default()
                    })],
                    backends: vec![],
                },
            ],
        };

        let host = ListenerHost::new("echo.example.com", vec![route.clone()]);
        let vhost = generator.generate_virtual_host(&host).unwrap().unwrap();
        assert_eq!(
            path_specifiers(&vhost),
            vec![
                PathSpecifier::Path("/echo".into()),
                PathSpecifier::Path("/old".into()),
                PathSpecifier::Prefix("/echo/".into()),
            ]
        );
        assert!(matches!(vhost.routes[1].action, Some(Action::Redirect(_))));

        let other = ListenerHost::new("other.example.com", vec![route]);
        assert_eq!(generator.generate_virtual_host(&other).unwrap(), None);

        let wildcard = ListenerHost::new(WILDCARD_HOSTNAME, vec![]);
        assert_eq!(generator.generate_virtual_host(&wildcard).unwrap(), None);
    }
}
