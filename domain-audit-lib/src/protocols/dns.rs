//! DNS resolution stage.
//!
//! Resolves a domain to a single address. Every failure mode (timeout,
//! NXDOMAIN, no records, network error) comes back as a uniform
//! `ResolutionFailure`; the message keeps the detail for diagnostics.

use crate::error::DomainAuditError;
use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::{debug, instrument};

/// Resolves a domain name to one IP address.
#[async_trait]
pub trait DomainResolver: Send + Sync {
    async fn resolve(&self, domain: &str) -> Result<IpAddr, DomainAuditError>;
}

/// Resolver backed by hickory.
///
/// Uses the system resolver configuration and the hosts file, like the
/// platform's own lookup would. Falls back to Google DNS when no system
/// configuration can be read, or queries one explicit nameserver.
#[derive(Clone)]
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsResolver {
    /// Create a resolver with the given per-query timeout.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `nameserver` is not an IP address.
    pub fn new(timeout: Duration, nameserver: Option<&str>) -> Result<Self, DomainAuditError> {
        let (config, mut opts) = match nameserver {
            Some(ns) => {
                let ip: IpAddr = ns.parse().map_err(|_| {
                    DomainAuditError::config(format!("Invalid nameserver IP: {}", ns))
                })?;
                let mut config = ResolverConfig::new();
                config.add_name_server(NameServerConfig::new(
                    SocketAddr::new(ip, 53),
                    Protocol::Udp,
                ));
                (config, ResolverOpts::default())
            }
            None => hickory_resolver::system_conf::read_system_conf()
                .unwrap_or_else(|_| (ResolverConfig::google(), ResolverOpts::default())),
        };

        opts.timeout = timeout;
        opts.attempts = 2;
        opts.use_hosts_file = true;

        Ok(Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            timeout,
        })
    }
}

#[async_trait]
impl DomainResolver for DnsResolver {
    #[instrument(skip(self), fields(domain = %domain))]
    async fn resolve(&self, domain: &str) -> Result<IpAddr, DomainAuditError> {
        let lookup = tokio::time::timeout(self.timeout, self.resolver.lookup_ip(domain))
            .await
            .map_err(|_| {
                DomainAuditError::resolution(
                    domain,
                    format!("DNS lookup timed out after {:?}", self.timeout),
                )
            })?
            .map_err(|e| DomainAuditError::resolution(domain, e.to_string()))?;

        let addresses: Vec<IpAddr> = lookup.iter().collect();
        let chosen = pick_address(&addresses)
            .ok_or_else(|| DomainAuditError::resolution(domain, "No address records"))?;

        debug!(address = %chosen, candidates = addresses.len(), "Resolved");
        Ok(chosen)
    }
}

/// Prefer the first IPv4 answer; server IPs are compared as IPv4.
fn pick_address(addresses: &[IpAddr]) -> Option<IpAddr> {
    addresses
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addresses.first())
        .copied()
}
