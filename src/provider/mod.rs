pub mod namesilo;

use std::net::Ipv4Addr;

use async_trait::async_trait;

use crate::error::Result;

/// A record as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub record_id: String,
    pub record_type: String,
    /// Fully-qualified name, e.g. `www.domain.com`.
    pub host: String,
    pub value: String,
    pub ttl: Option<u32>,
}

/// The three calls the synchronizer needs from a DNS host.
///
/// `host` arguments are the bare subdomain label (empty for the apex).
#[async_trait]
pub trait DnsProvider: Send + Sync {
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>>;

    /// Returns the id of the new record when the provider reports one.
    async fn add_record(
        &self,
        domain: &str,
        host: &str,
        ttl: u32,
        value: Ipv4Addr,
    ) -> Result<Option<String>>;

    async fn update_record(
        &self,
        domain: &str,
        record_id: &str,
        host: &str,
        ttl: u32,
        value: Ipv4Addr,
    ) -> Result<Option<String>>;
}
