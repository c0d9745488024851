//! Request matching predicates
//!
//! Pure functions deciding whether one request dimension satisfies the
//! criteria of a route entry. Regular expressions use full-match semantics,
//! the same as Envoy's `safe_regex`; a pattern that does not compile never
//! matches.
//!
//! [`RequestMatcher`] compiles every pattern of a [`RouteMatch`] once, so a
//! route can be evaluated against many requests without recompiling.

use regex::Regex;

use super::route_entry::{Pair, PathSpec, RouteMatch};
use super::WILDCARD_HOSTNAME;
use crate::domain::gateway_route::{HttpMethod, MethodMatch};

/// The parts of an HTTP request that route entries match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub host: String,
    pub path: String,
    pub method: HttpMethod,
    pub headers: Vec<Pair>,
    pub query: Vec<Pair>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            method,
            headers: Vec::new(),
            query: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// Whether `host` is selected by `names`.
///
/// The wildcard virtual host matches anything, as does an empty name list.
/// Otherwise a name matches when it is byte-for-byte equal to the host or
/// when it has the form `*.suffix` and the host is a strict subdomain of
/// `suffix`.
pub fn hostnames<S: AsRef<str>>(host: &str, names: &[S]) -> bool {
    if host == WILDCARD_HOSTNAME || names.is_empty() {
        return true;
    }

    names.iter().any(|name| hostname(host, name.as_ref()))
}

fn hostname(host: &str, name: &str) -> bool {
    if host == name {
        return true;
    }

    let Some(suffix) = name.strip_prefix('*') else {
        return false;
    };
    suffix.starts_with('.') && host.len() > suffix.len() && host.ends_with(suffix)
}

pub fn method(criterion: MethodMatch, method: HttpMethod) -> bool {
    match criterion {
        MethodMatch::Any => true,
        MethodMatch::Only(m) => m == method,
    }
}

/// Path predicate. Prefixes match whole path segments: `/foo` and `/foo/`
/// both match `/foo` and `/foo/bar` but never `/foobar`.
pub fn path(spec: &PathSpec, path: &str) -> bool {
    match spec {
        PathSpec::Exact(exact) => path == exact,
        PathSpec::Prefix(prefix) => prefix_matches(prefix, path),
        PathSpec::Regex(pattern) => full_match(&compile(pattern), path),
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    let stripped = prefix.trim_end_matches('/');
    if stripped.is_empty() {
        return path.starts_with('/') || path.is_empty();
    }

    match path.strip_prefix(stripped) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Every exact and every regex header predicate must hold. Header names are
/// case-insensitive.
pub fn headers(exact: &[Pair], regex: &[Pair], request: &[Pair]) -> bool {
    let compiled = compile_predicates(regex);
    exact_hold(exact, request, true) && regex_hold(&compiled, request, true)
}

/// Every exact and every regex query predicate must hold. Parameter names are
/// case-sensitive.
pub fn query(exact: &[Pair], regex: &[Pair], request: &[Pair]) -> bool {
    let compiled = compile_predicates(regex);
    exact_hold(exact, request, false) && regex_hold(&compiled, request, false)
}

/// Whether a request satisfies every criterion of `m`.
pub fn request(m: &RouteMatch, request: &HttpRequest) -> bool {
    RequestMatcher::new(m).matches(request)
}

/// The criteria of one route entry, with its regular expressions compiled.
#[derive(Debug, Clone)]
pub struct RequestMatcher<'a> {
    criteria: &'a RouteMatch,
    path_regex: Compiled,
    header_regex: Vec<(&'a str, Compiled)>,
    query_regex: Vec<(&'a str, Compiled)>,
}

impl<'a> RequestMatcher<'a> {
    pub fn new(criteria: &'a RouteMatch) -> Self {
        let path_regex = match &criteria.path {
            Some(PathSpec::Regex(pattern)) => compile(pattern),
            _ => None,
        };

        Self {
            criteria,
            path_regex,
            header_regex: compile_predicates(&criteria.regex_header),
            query_regex: compile_predicates(&criteria.regex_query),
        }
    }

    pub fn matches(&self, request: &HttpRequest) -> bool {
        let m = self.criteria;
        self.path_holds(&request.path)
            && method(m.method, request.method)
            && exact_hold(&m.exact_header, &request.headers, true)
            && regex_hold(&self.header_regex, &request.headers, true)
            && exact_hold(&m.exact_query, &request.query, false)
            && regex_hold(&self.query_regex, &request.query, false)
    }

    fn path_holds(&self, value: &str) -> bool {
        match &self.criteria.path {
            None => true,
            Some(PathSpec::Regex(_)) => full_match(&self.path_regex, value),
            Some(spec) => path(spec, value),
        }
    }
}

impl RouteMatch {
    pub fn compile(&self) -> RequestMatcher<'_> {
        RequestMatcher::new(self)
    }

    pub fn matches(&self, req: &HttpRequest) -> bool {
        request(self, req)
    }
}

/// An anchored pattern; `None` when it failed to compile.
type Compiled = Option<Regex>;

fn compile(pattern: &str) -> Compiled {
    Regex::new(&format!("^(?:{pattern})$")).ok()
}

fn full_match(re: &Compiled, value: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(value))
}

fn compile_predicates(regex: &[Pair]) -> Vec<(&str, Compiled)> {
    regex
        .iter()
        .map(|(name, pattern)| (name.as_str(), compile(pattern)))
        .collect()
}

fn exact_hold(exact: &[Pair], request: &[Pair], ignore_case: bool) -> bool {
    exact
        .iter()
        .all(|(name, want)| values(request, name, ignore_case).any(|v| v == want))
}

fn regex_hold(regex: &[(&str, Compiled)], request: &[Pair], ignore_case: bool) -> bool {
    regex
        .iter()
        .all(|(name, re)| values(request, name, ignore_case).any(|v| full_match(re, v)))
}

fn values<'a>(
    request: &'a [Pair],
    name: &'a str,
    ignore_case: bool,
) -> impl Iterator<Item = &'a str> + 'a {
    request
        .iter()
        .filter(move |(n, _)| same_name(n, name, ignore_case))
        .map(|(_, v)| v.as_str())
}

fn same_name(a: &str, b: &str, ignore_case: bool) -> bool {
    if ignore_case {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}
