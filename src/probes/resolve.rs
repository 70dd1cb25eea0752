// Reverse DNS through the system resolver, forward-resolution timing via the tokio resolver.

use super::{DnsTimer, HostnameResolver};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// A reverse-lookup answer worth keeping: trailing dot stripped, None when it only echoes the address.
pub fn usable_hostname(name: &str, ip: IpAddr) -> Option<String> {
    let name = name.trim().trim_end_matches('.');
    if name.is_empty() || name == ip.to_string() {
        return None;
    }
    Some(name.to_string())
}

pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl HostnameResolver for SystemResolver {
    async fn reverse_resolve(&self, ip: IpAddr) -> Option<String> {
        let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&ip));
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(Ok(name))) => usable_hostname(&name, ip),
            Ok(Ok(Err(e))) => {
                tracing::trace!(error = %e, %ip, "reverse lookup failed");
                None
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, %ip, "reverse lookup task failed");
                None
            }
            Err(_) => {
                tracing::trace!(%ip, "reverse lookup timed out");
                None
            }
        }
    }
}

pub struct TokioDnsTimer {
    timeout: Duration,
}

impl TokioDnsTimer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl DnsTimer for TokioDnsTimer {
    async fn measure_dns_latency(&self, domain: &str) -> Option<f64> {
        let start = Instant::now();
        match tokio::time::timeout(self.timeout, tokio::net::lookup_host((domain, 443))).await {
            Ok(Ok(mut addrs)) => addrs
                .next()
                .map(|_| start.elapsed().as_secs_f64() * 1000.0),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, domain, "dns resolution failed");
                None
            }
            Err(_) => {
                tracing::debug!(domain, "dns resolution timed out");
                None
            }
        }
    }
}
