use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::Config;

const IFTTT_BASE: &str = "https://maker.ifttt.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the run log goes when a run fails.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// IFTTT Maker webhook fired when a run fails.
pub struct Webhook {
    client: Client,
    url: String,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    value1: &'a str,
}

impl Webhook {
    /// `None` when no webhook key is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        if config.webhook_key.is_empty() {
            return Ok(None);
        }

        let url = trigger_url(&config.webhook_event, &config.webhook_key);
        Self::new(url, REQUEST_TIMEOUT).map(Some)
    }

    fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build webhook HTTP client")?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for Webhook {
    async fn notify(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { value1: message })
            .send()
            .await
            .context("Failed to connect to IFTTT")?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            anyhow::bail!(
                "Failed to connect to IFTTT with status code: {}",
                status.as_u16()
            );
        }

        Ok(())
    }
}

fn trigger_url(event: &str, key: &str) -> String {
    format!("{IFTTT_BASE}/trigger/{event}/with/key/{key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IpLookupConfig;

    fn config(event: &str, key: &str) -> Config {
        Config {
            api_key: "k".to_string(),
            domain: "domain.com".to_string(),
            hostnames: vec![String::new()],
            ttl: 3600,
            webhook_event: event.to_string(),
            webhook_key: key.to_string(),
            api_base_url: "https://www.namesilo.com/api/".to_string(),
            ip_lookup: IpLookupConfig::default(),
        }
    }

    #[test]
    fn disabled_without_key() {
        assert!(Webhook::from_config(&config("ddns_failed", ""))
            .unwrap()
            .is_none());
    }

    #[test]
    fn builds_maker_trigger_url() {
        let hook = Webhook::from_config(&config("ddns_failed", "s3cr3t"))
            .unwrap()
            .unwrap();
        assert_eq!(
            hook.url,
            "https://maker.ifttt.com/trigger/ddns_failed/with/key/s3cr3t"
        );
    }

    #[tokio::test]
    async fn stalled_endpoint_times_out() {
        // Accepts connections into the backlog but never answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/trigger/e/with/key/k", listener.local_addr().unwrap());
        let hook = Webhook::new(url, Duration::from_millis(200)).unwrap();

        let started = std::time::Instant::now();
        let err = hook.notify("log").await.unwrap_err();

        assert!(format!("{err:#}").contains("Failed to connect to IFTTT"));
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(listener);
    }

    #[test]
    fn payload_puts_message_in_value1() {
        let body = serde_json::to_value(WebhookPayload {
            value1: "a<br>b",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "value1": "a<br>b" }));
    }
}
