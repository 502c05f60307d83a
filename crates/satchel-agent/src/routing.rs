//! Per-request caching policy selection.

use crate::config::AgentConfig;
use satchel_core::{Destination, Method, Request};
use std::fmt;
use url::{Origin, Url};

/// Why a request is left to the host untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    NonGet,
    Api,
    DevHost,
}

/// The policy applied to one intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Not intercepted.
    PassThrough(PassReason),
    /// Network first, falling back to the dynamic copy, then the root document.
    NetworkFirstDocument,
    /// Cached copy now, refreshed in the background.
    StaleWhileRevalidate,
    /// Network first, falling back to any cached copy of the same request.
    NetworkFirst,
}

impl fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingDecision::PassThrough(PassReason::NonGet) => f.write_str("pass-through (non-GET)"),
            RoutingDecision::PassThrough(PassReason::Api) => f.write_str("pass-through (API)"),
            RoutingDecision::PassThrough(PassReason::DevHost) => {
                f.write_str("pass-through (development host)")
            }
            RoutingDecision::NetworkFirstDocument => f.write_str("network-first (document)"),
            RoutingDecision::StaleWhileRevalidate => f.write_str("stale-while-revalidate"),
            RoutingDecision::NetworkFirst => f.write_str("network-first"),
        }
    }
}

/// Immutable routing table built from configuration.
#[derive(Debug, Clone)]
pub struct Router {
    api_origin: Origin,
    api_prefix: String,
    dev_hosts: Vec<String>,
    static_prefix: String,
}

impl Router {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            api_origin: config.api_origin.origin(),
            api_prefix: config.api_prefix.clone(),
            dev_hosts: config
                .dev_hosts
                .iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            static_prefix: config.static_prefix.clone(),
        }
    }

    /// Rules are evaluated in order; the first match wins.
    pub fn route(&self, request: &Request) -> RoutingDecision {
        if request.method != Method::Get {
            return RoutingDecision::PassThrough(PassReason::NonGet);
        }
        if self.is_api(&request.url) {
            return RoutingDecision::PassThrough(PassReason::Api);
        }
        if self.is_dev_host(&request.url) {
            return RoutingDecision::PassThrough(PassReason::DevHost);
        }
        if request.is_navigation() || request.url.path() == "/" {
            return RoutingDecision::NetworkFirstDocument;
        }
        if self.is_static_resource(request) {
            return RoutingDecision::StaleWhileRevalidate;
        }
        RoutingDecision::NetworkFirst
    }

    fn is_api(&self, url: &Url) -> bool {
        url.origin() == self.api_origin && path_has_prefix(url.path(), &self.api_prefix)
    }

    fn is_dev_host(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| {
                let host = host.trim_start_matches('[').trim_end_matches(']');
                self.dev_hosts.iter().any(|dev| dev == host)
            })
            .unwrap_or(false)
    }

    fn is_static_resource(&self, request: &Request) -> bool {
        matches!(
            request.destination,
            Destination::Style | Destination::Script | Destination::Image
        ) || request.url.path().starts_with(&self.static_prefix)
    }
}

/// `/api` matches `/api` and `/api/...` but not `/apiary`.
fn path_has_prefix(path: &str, prefix: &str) -> bool {
    if prefix.ends_with('/') {
        return path.starts_with(prefix) || path == prefix.trim_end_matches('/');
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
