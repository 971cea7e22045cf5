use std::net::Ipv4Addr;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use regex::Regex;

use crate::config::IpLookupConfig;
use crate::error::{DdnsError, Result};

/// Lookup services tried in order until one answers with an address.
pub const DEFAULT_ENDPOINTS: &[&str] = &[
    "https://myip.ipip.net",
    "https://api.ipify.org",
    "https://checkip.amazonaws.com",
    "http://checkip.dyndns.com",
];

static IPV4_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+\.[0-9]+\.[0-9]+\.[0-9]+").expect("valid IPv4 pattern"));

/// Anything that can tell us our public IPv4 address.
#[async_trait]
pub trait PublicIpSource: Send + Sync {
    async fn current_ip(&self) -> Result<Ipv4Addr>;
}

/// Fetches the body of a lookup endpoint as text.
#[async_trait]
pub trait TextFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> anyhow::Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build IP lookup HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TextFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
        let text = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to connect to {url}"))?
            .text()
            .await
            .with_context(|| format!("Failed to read response from {url}"))?;
        Ok(text)
    }
}

/// Walks the endpoint list and returns the first valid address.
pub struct IpResolver<F = HttpFetcher> {
    fetcher: F,
    endpoints: Vec<String>,
    retries: u32,
}

impl IpResolver<HttpFetcher> {
    pub fn from_config(config: &IpLookupConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(fetcher, config.endpoints.clone(), config.retries))
    }
}

impl<F: TextFetcher> IpResolver<F> {
    pub fn new(fetcher: F, endpoints: Vec<String>, retries: u32) -> Self {
        Self {
            fetcher,
            endpoints,
            retries,
        }
    }

    pub async fn resolve(&self) -> Result<Ipv4Addr> {
        let mut last_error = None;

        for endpoint in &self.endpoints {
            for attempt in 0..=self.retries {
                debug!("Looking up public IP via {endpoint} (attempt {})", attempt + 1);
                match self.query(endpoint).await {
                    Ok(ip) => return Ok(ip),
                    Err(detail) => {
                        debug!("IP lookup via {endpoint} failed: {detail}");
                        last_error = Some(detail);
                    }
                }
            }
        }

        Err(DdnsError::IpResolution(
            last_error.unwrap_or_else(|| "no IP lookup endpoints configured".to_string()),
        ))
    }

    /// On failure returns the detail to report: the transport error, or the
    /// response text when it held no valid address.
    async fn query(&self, endpoint: &str) -> std::result::Result<Ipv4Addr, String> {
        let text = self
            .fetcher
            .fetch_text(endpoint)
            .await
            .map_err(|e| format!("{e:#}"))?;
        let text = text.trim();
        extract_ipv4(text).ok_or_else(|| text.to_string())
    }
}

#[async_trait]
impl<F: TextFetcher> PublicIpSource for IpResolver<F> {
    async fn current_ip(&self) -> Result<Ipv4Addr> {
        self.resolve().await
    }
}

/// Finds the first IPv4-shaped substring and checks every octet is 0..=255.
pub fn extract_ipv4(text: &str) -> Option<Ipv4Addr> {
    let candidate = IPV4_PATTERN.find(text)?.as_str();
    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(candidate.split('.')) {
        *slot = part.parse().ok()?;
    }
    Some(Ipv4Addr::from(octets))
}
