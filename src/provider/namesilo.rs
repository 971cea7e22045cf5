use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{DnsProvider, DnsRecord};
use crate::config::Config;
use crate::error::{DdnsError, Result};

const SUCCESS_CODE: &str = "300";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BODY_PREVIEW_CHARS: usize = 200;

pub struct NameSilo {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NameSilo {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build NameSilo HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn execute<R>(&self, operation: &Operation<'_>) -> Result<R>
    where
        R: DeserializeOwned + ReplyStatus,
    {
        let name = operation.name();
        let url = format!("{}{}", self.base_url, name);
        debug!("NameSilo {name} for {}", operation.domain());

        let text = self
            .client
            .get(&url)
            .query(&operation.params(&self.api_key))
            .send()
            .await
            .with_context(|| format!("Failed to send {name} request to NameSilo"))?
            .text()
            .await
            .with_context(|| format!("Failed to read {name} response from NameSilo"))?;

        parse_reply(name, &text)
    }
}

#[async_trait]
impl DnsProvider for NameSilo {
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>> {
        let reply: ListRecordsReply = self.execute(&Operation::List { domain }).await?;
        Ok(reply.records.into_iter().map(DnsRecord::from).collect())
    }

    async fn add_record(
        &self,
        domain: &str,
        host: &str,
        ttl: u32,
        value: Ipv4Addr,
    ) -> Result<Option<String>> {
        let reply: RecordReply = self
            .execute(&Operation::Add {
                domain,
                host,
                ttl,
                value,
            })
            .await?;
        Ok(reply.record_id)
    }

    async fn update_record(
        &self,
        domain: &str,
        record_id: &str,
        host: &str,
        ttl: u32,
        value: Ipv4Addr,
    ) -> Result<Option<String>> {
        let reply: RecordReply = self
            .execute(&Operation::Update {
                domain,
                record_id,
                host,
                ttl,
                value,
            })
            .await?;
        Ok(reply.record_id)
    }
}

/// One API call. Built fresh for each request; the shared template
/// parameters are added by [`Operation::params`].
#[derive(Debug, Clone, Copy)]
enum Operation<'a> {
    List {
        domain: &'a str,
    },
    Add {
        domain: &'a str,
        host: &'a str,
        ttl: u32,
        value: Ipv4Addr,
    },
    Update {
        domain: &'a str,
        record_id: &'a str,
        host: &'a str,
        ttl: u32,
        value: Ipv4Addr,
    },
}

impl Operation<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "dnsListRecords",
            Self::Add { .. } => "dnsAddRecord",
            Self::Update { .. } => "dnsUpdateRecord",
        }
    }

    fn domain(&self) -> &str {
        match self {
            Self::List { domain }
            | Self::Add { domain, .. }
            | Self::Update { domain, .. } => *domain,
        }
    }

    fn params(&self, api_key: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("version", "1".to_string()),
            ("type", "xml".to_string()),
            ("key", api_key.to_string()),
            ("domain", self.domain().to_string()),
        ];

        match *self {
            Self::List { .. } => {}
            Self::Add {
                host, ttl, value, ..
            } => {
                params.push(("rrtype", "A".to_string()));
                params.push(("rrhost", host.to_string()));
                params.push(("rrttl", ttl.to_string()));
                params.push(("rrvalue", value.to_string()));
            }
            Self::Update {
                record_id,
                host,
                ttl,
                value,
                ..
            } => {
                params.push(("rrid", record_id.to_string()));
                params.push(("rrhost", host.to_string()));
                params.push(("rrttl", ttl.to_string()));
                params.push(("rrvalue", value.to_string()));
            }
        }

        params
    }
}

// NameSilo XML types
//
// Every reply is `<namesilo><request>…</request><reply>…</reply></namesilo>`.
// Elements not named here (request echo, distance, …) are skipped.

#[derive(Debug, Deserialize)]
struct Envelope<R> {
    reply: R,
}

trait ReplyStatus {
    fn code(&self) -> &str;
    fn detail(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct ListRecordsReply {
    code: String,
    #[serde(default)]
    detail: String,
    #[serde(default, rename = "resource_record")]
    records: Vec<ResourceRecord>,
}

/// Reply to `dnsAddRecord` and `dnsUpdateRecord`.
#[derive(Debug, Deserialize)]
struct RecordReply {
    code: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    record_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceRecord {
    record_id: String,
    #[serde(rename = "type")]
    record_type: String,
    host: String,
    #[serde(default)]
    value: String,
    /// Kept as text: only informational, and must not fail the whole list.
    #[serde(default)]
    ttl: Option<String>,
}

impl ReplyStatus for ListRecordsReply {
    fn code(&self) -> &str {
        &self.code
    }

    fn detail(&self) -> &str {
        &self.detail
    }
}

impl ReplyStatus for RecordReply {
    fn code(&self) -> &str {
        &self.code
    }

    fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<ResourceRecord> for DnsRecord {
    fn from(rec: ResourceRecord) -> Self {
        Self {
            record_id: rec.record_id.trim().to_string(),
            record_type: rec.record_type.trim().to_string(),
            host: rec.host.trim().to_string(),
            value: rec.value.trim().to_string(),
            ttl: rec.ttl.and_then(|ttl| ttl.trim().parse().ok()),
        }
    }
}

fn parse_reply<R>(operation: &'static str, text: &str) -> Result<R>
where
    R: DeserializeOwned + ReplyStatus,
{
    let envelope: Envelope<R> = quick_xml::de::from_str(text).with_context(|| {
        format!(
            "Failed to parse {operation} response: {}",
            preview(text.trim())
        )
    })?;
    let reply = envelope.reply;

    if reply.code().trim() != SUCCESS_CODE {
        return Err(DdnsError::RequestFailed {
            operation,
            code: reply.code().trim().to_string(),
            detail: reply.detail().trim().to_string(),
        });
    }

    Ok(reply)
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
