//! Gateway route table generation
//!
//! Merges every `GatewayRoute` that applies to one listener host into a
//! single ordered route table.
//!
//! Gateway APIs define prefix matching in terms of path components while
//! Envoy compares prefixes byte-wise. Each prefix is therefore normalized to
//! end in exactly one `/`, and paired with an exact route on the bare path
//! unless one already exists, so `/foo` keeps reaching a `/foo/` prefix rule.
//!
//! Entries are keyed by path: of two entries with the same exact path, or the
//! same normalized prefix, only the first registered survives. Policy objects
//! are visited in `(mesh, name)` order and rules in declaration order, so the
//! winner does not depend on how the candidates were collected.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::{debug, Span};

use super::matching;
use super::route_entry::{make_route_entry, make_route_match, PathKind, PathSpec, RouteEntry};
use super::{ListenerHost, RouteTable, WILDCARD_HOSTNAME};
use crate::domain::{GatewayRoute, ListenerProtocol};

/// Result of generating the routes of one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRoutes {
    /// This many entries were appended to the table.
    Appended(usize),
    /// No policy produced an entry; the host should not be emitted.
    NothingApplicable,
}

/// Generates route tables from `GatewayRoute` policy objects.
#[derive(Debug, Clone)]
pub struct GatewayRouteGenerator {
    pub(super) span: Span,
}

impl Default for GatewayRouteGenerator {
    fn default() -> Self {
        Self::new(crate::generation_span!("gateway-routes"))
    }
}

impl GatewayRouteGenerator {
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    /// Only HTTP and HTTPS listeners carry route tables.
    pub fn supports_protocol(&self, protocol: ListenerProtocol) -> bool {
        matches!(protocol, ListenerProtocol::Http | ListenerProtocol::Https)
    }

    /// Append the merged route table of `host` to `table`.
    ///
    /// `table` is left untouched when [`HostRoutes::NothingApplicable`] is
    /// returned.
    pub fn generate_host(&self, host: &ListenerHost, table: &mut RouteTable) -> HostRoutes {
        let mut routes: Vec<&GatewayRoute> = host
            .routes
            .iter()
            .filter(|route| accepts(&host.hostname, route))
            .collect();

        if routes.is_empty() {
            debug!(
                parent: &self.span,
                hostname = %host.hostname,
                "No gateway routes apply to host"
            );
            return HostRoutes::NothingApplicable;
        }

        routes.sort_by(|a, b| (&a.mesh, &a.name).cmp(&(&b.mesh, &b.name)));

        debug!(
            parent: &self.span,
            hostname = %host.hostname,
            route_count = routes.len(),
            "Applying merged gateway routes"
        );

        let mut entries = Vec::new();
        let mut exact_entries: BTreeMap<String, RouteEntry> = BTreeMap::new();
        let mut prefix_entries: BTreeMap<String, RouteEntry> = BTreeMap::new();

        for route in routes {
            for rule in &route.rules {
                let entry = make_route_entry(&route.name, rule);

                // Match alternatives have OR semantics, so each one becomes
                // its own entry carrying the rule's action.
                for rule_match in &rule.matches {
                    let mut route_entry = entry.clone();
                    route_entry.r#match = make_route_match(rule_match);

                    match route_entry.r#match.path.clone() {
                        Some(PathSpec::Exact(path)) => {
                            let kind = PathKind::Exact;
                            self.register(&mut exact_entries, path, route_entry, kind);
                        }
                        Some(PathSpec::Prefix(path)) => {
                            let prefix = normalize_prefix(&path);
                            route_entry.r#match.path = Some(PathSpec::Prefix(prefix.clone()));
                            let kind = PathKind::Prefix;
                            self.register(&mut prefix_entries, prefix, route_entry, kind);
                        }
                        Some(PathSpec::Regex(_)) | None => entries.push(route_entry),
                    }
                }
            }
        }

        for (prefix, prefix_entry) in prefix_entries {
            // The root prefix matches everything, no exact twin needed.
            if prefix != "/" {
                let exact = prefix.trim_end_matches('/');
                if !exact_entries.contains_key(exact) {
                    let mut exact_entry = prefix_entry.clone();
                    exact_entry.r#match.path = Some(PathSpec::Exact(exact.to_string()));
                    exact_entries.insert(exact.to_string(), exact_entry);
                }
            }

            entries.push(prefix_entry);
        }

        entries.extend(exact_entries.into_values());

        if entries.is_empty() {
            debug!(
                parent: &self.span,
                hostname = %host.hostname,
                "Gateway routes for host contain no matches"
            );
            return HostRoutes::NothingApplicable;
        }

        let appended = entries.len();
        table.entries.extend(entries);
        HostRoutes::Appended(appended)
    }

    fn register(
        &self,
        accumulator: &mut BTreeMap<String, RouteEntry>,
        path: String,
        entry: RouteEntry,
        kind: PathKind,
    ) {
        match accumulator.entry(path) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            Entry::Occupied(existing) => {
                debug!(
                    parent: &self.span,
                    path = %existing.key(),
                    kind = ?kind,
                    kept_policy = %existing.get().policy,
                    dropped_policy = %entry.policy,
                    "Dropping gateway route entry with duplicate path"
                );
            }
        }
    }
}

/// Whether `route` applies to the listener host `hostname`.
fn accepts(hostname: &str, route: &GatewayRoute) -> bool {
    hostname == WILDCARD_HOSTNAME || matching::hostnames(hostname, &route.hostnames)
}

/// Strip trailing separators and append exactly one.
pub fn normalize_prefix(prefix: &str) -> String {
    format!("{}/", prefix.trim_end_matches('/'))
}
