use std::net::IpAddr;

use tracing::{debug, warn};
use trust_dns_resolver::Resolver;

use super::{LookupCache, Resolve};

/// Address → hostname cache, backed by the system resolver unless a test
/// swaps it.
pub type HostnameCache<R = SystemDnsResolver> = LookupCache<String, String, R>;

/// Reverse (PTR) lookups through the system resolver configuration.
///
/// Any failure echoes the address back, so the cache stores the address as
/// its own hostname and never asks again. Keys that are not IP addresses,
/// such as the `N/A` placeholder, skip the network entirely.
pub struct SystemDnsResolver {
    inner: Option<Resolver>,
}

impl SystemDnsResolver {
    pub fn from_system_conf() -> Self {
        match Resolver::from_system_conf() {
            Ok(resolver) => Self {
                inner: Some(resolver),
            },
            Err(err) => {
                warn!(%err, "system resolver unavailable, hostnames will echo addresses");
                Self::disabled()
            }
        }
    }

    /// A resolver that never performs lookups.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    fn lookup(&self, ip: IpAddr) -> Option<String> {
        let resolver = self.inner.as_ref()?;
        let response = match resolver.reverse_lookup(ip) {
            Ok(response) => response,
            Err(err) => {
                debug!(%ip, %err, "reverse lookup failed");
                return None;
            }
        };
        response
            .iter()
            .next()
            .map(|name| name.to_string().trim_end_matches('.').to_string())
            .filter(|name| !name.is_empty())
    }
}

impl std::fmt::Debug for SystemDnsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemDnsResolver")
            .field("enabled", &self.inner.is_some())
            .finish()
    }
}

impl Resolve<String, String> for SystemDnsResolver {
    fn resolve(&mut self, addr: &String) -> String {
        addr.parse::<IpAddr>()
            .ok()
            .and_then(|ip| self.lookup(ip))
            .unwrap_or_else(|| addr.clone())
    }
}
