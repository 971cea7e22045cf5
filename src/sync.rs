use std::net::Ipv4Addr;

use log::debug;

use crate::error::Result;
use crate::ip::PublicIpSource;
use crate::provider::{DnsProvider, DnsRecord};
use crate::runlog::RunLog;

const A_RECORD: &str = "A";

/// What to do with one hostname, given the records the provider reported.
#[derive(Debug, PartialEq, Eq)]
pub enum Decision<'a> {
    Add,
    Update(&'a DnsRecord),
    UpToDate(&'a DnsRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    Created,
    Updated,
    UpToDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOutcome {
    pub host: String,
    pub action: HostAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub ip: Ipv4Addr,
    pub outcomes: Vec<HostOutcome>,
}

impl SyncReport {
    pub fn changed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.action != HostAction::UpToDate)
            .count()
    }
}

/// `www` + `domain.com` -> `www.domain.com`; an empty host means the apex.
pub fn full_hostname(host: &str, domain: &str) -> String {
    if host.is_empty() {
        domain.to_string()
    } else {
        format!("{host}.{domain}")
    }
}

pub fn decide<'a>(records: &'a [DnsRecord], full_host: &str, ip: Ipv4Addr) -> Decision<'a> {
    let found = records
        .iter()
        .find(|rec| rec.record_type == A_RECORD && rec.host == full_host);

    match found {
        None => Decision::Add,
        Some(rec) if rec.value.trim() == ip.to_string() => Decision::UpToDate(rec),
        Some(rec) => Decision::Update(rec),
    }
}

pub struct Synchronizer<'a> {
    ip_source: &'a dyn PublicIpSource,
    provider: &'a dyn DnsProvider,
    domain: &'a str,
    hostnames: &'a [String],
    ttl: u32,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        ip_source: &'a dyn PublicIpSource,
        provider: &'a dyn DnsProvider,
        domain: &'a str,
        hostnames: &'a [String],
        ttl: u32,
    ) -> Self {
        Self {
            ip_source,
            provider,
            domain,
            hostnames,
            ttl,
        }
    }

    /// Resolves the public IP once, then brings every hostname's A record
    /// in line with it. Stops at the first error.
    pub async fn run(&self, log: &mut RunLog) -> Result<SyncReport> {
        let ip = self.ip_source.current_ip().await?;
        log.info(format!("Current IP={ip}"));

        let records = self.provider.list_records(self.domain).await?;
        let mut outcomes = Vec::with_capacity(self.hostnames.len());

        for host in self.hostnames {
            let action = self.sync_host(host, ip, &records, log).await?;
            outcomes.push(HostOutcome {
                host: full_hostname(host, self.domain),
                action,
            });
        }

        Ok(SyncReport { ip, outcomes })
    }

    async fn sync_host(
        &self,
        host: &str,
        ip: Ipv4Addr,
        records: &[DnsRecord],
        log: &mut RunLog,
    ) -> Result<HostAction> {
        let full_host = full_hostname(host, self.domain);

        match decide(records, &full_host, ip) {
            Decision::Add => {
                log.info(format!(
                    "No A record found for host: '{full_host}', creating a new A record."
                ));
                log.info(format!("NEW: type={A_RECORD}, host={full_host}, value={ip}"));
                self.provider
                    .add_record(self.domain, host, self.ttl, ip)
                    .await?;
                Ok(HostAction::Created)
            }
            Decision::Update(rec) => {
                log.info("DDNS need to be updated.");
                log.info(format!(
                    "UPDATE: type={}, host={}, value={ip}, old={}",
                    rec.record_type, rec.host, rec.value
                ));
                debug!(
                    "Record {} ttl {:?} -> {}",
                    rec.record_id, rec.ttl, self.ttl
                );
                self.provider
                    .update_record(self.domain, &rec.record_id, host, self.ttl, ip)
                    .await?;
                Ok(HostAction::Updated)
            }
            Decision::UpToDate(rec) => {
                log.info("DDNS is up to date.");
                log.info(format!(
                    "CUR: type={}, host={}, value={}",
                    rec.record_type, rec.host, rec.value
                ));
                Ok(HostAction::UpToDate)
            }
        }
    }
}
