use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{DdnsError, Result};
use crate::ip::DEFAULT_ENDPOINTS;

const MAX_RETRIES: u32 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_key: String,
    pub domain: String,
    #[serde(default = "default_hostnames")]
    pub hostnames: Vec<String>,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub webhook_event: String,
    #[serde(default)]
    pub webhook_key: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub ip_lookup: IpLookupConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpLookupConfig {
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retries: u32,
}

fn default_hostnames() -> Vec<String> {
    vec![String::new()]
}

fn default_ttl() -> u32 {
    3600
}

fn default_api_base_url() -> String {
    "https://www.namesilo.com/api/".to_string()
}

fn default_endpoints() -> Vec<String> {
    DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for IpLookupConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            timeout_secs: default_timeout_secs(),
            retries: 0,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DdnsError::config(format!("failed to read {}: {e}", path.display()))
        })?;

        Self::parse(&content)
            .map_err(|e| DdnsError::config(format!("{}: {e}", path.display())))
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        let mut config: Config = toml::from_str(content).map_err(|e| e.to_string())?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Trims hostnames and drops repeats so each host is synced once.
    fn normalize(&mut self) {
        self.domain = self.domain.trim().to_string();
        let mut seen = Vec::with_capacity(self.hostnames.len());
        for host in self.hostnames.drain(..) {
            let host = host.trim().to_string();
            if !seen.contains(&host) {
                seen.push(host);
            }
        }
        self.hostnames = seen;
        if !self.api_base_url.ends_with('/') {
            self.api_base_url.push('/');
        }
        self.ip_lookup.retries = self.ip_lookup.retries.min(MAX_RETRIES);
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("api_key must not be empty".to_string());
        }
        if self.domain.is_empty() {
            return Err("domain must not be empty".to_string());
        }
        if self.hostnames.is_empty() {
            return Err("hostnames must list at least one host (\"\" for the apex)".to_string());
        }
        if self.ip_lookup.endpoints.is_empty() {
            return Err("ip_lookup.endpoints must not be empty".to_string());
        }
        if !self.webhook_key.is_empty() && self.webhook_event.trim().is_empty() {
            return Err("webhook_event is required when webhook_key is set".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = Config::parse(
            r#"
            api_key = "abc"
            domain = "domain.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.hostnames, vec![""]);
        assert_eq!(config.ttl, 3600);
        assert_eq!(config.api_base_url, "https://www.namesilo.com/api/");
        assert!(config.webhook_key.is_empty());
        assert_eq!(config.ip_lookup.endpoints.len(), DEFAULT_ENDPOINTS.len());
        assert_eq!(config.ip_lookup.timeout_secs, 10);
        assert_eq!(config.ip_lookup.retries, 0);
    }

    #[test]
    fn full_config_is_normalized() {
        let config = Config::parse(
            r#"
            api_key = "abc"
            domain = " domain.com "
            hostnames = ["", " www", "www"]
            ttl = 7207
            webhook_event = "ddns_failed"
            webhook_key = "secret"
            api_base_url = "http://localhost:8080/api"

            [ip_lookup]
            endpoints = ["https://api.ipify.org"]
            timeout_secs = 3
            retries = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.domain, "domain.com");
        assert_eq!(config.hostnames, vec!["", "www"]);
        assert_eq!(config.ttl, 7207);
        assert_eq!(config.api_base_url, "http://localhost:8080/api/");
        assert_eq!(config.ip_lookup.endpoints, vec!["https://api.ipify.org"]);
        assert_eq!(config.ip_lookup.timeout_secs, 3);
        assert_eq!(config.ip_lookup.retries, MAX_RETRIES);
    }

    #[test]
    fn missing_or_empty_required_fields_are_rejected() {
        assert!(Config::parse(r#"domain = "domain.com""#).is_err());

        let err = Config::parse(
            r#"
            api_key = ""
            domain = "domain.com"
            "#,
        )
        .unwrap_err();
        assert!(err.contains("api_key"));

        let err = Config::parse(
            r#"
            api_key = "abc"
            domain = "domain.com"
            hostnames = []
            "#,
        )
        .unwrap_err();
        assert!(err.contains("hostnames"));
    }

    #[test]
    fn webhook_key_requires_event() {
        let err = Config::parse(
            r#"
            api_key = "abc"
            domain = "domain.com"
            webhook_key = "secret"
            "#,
        )
        .unwrap_err();
        assert!(err.contains("webhook_event"));
    }

    #[test]
    fn load_reports_missing_file_as_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, DdnsError::Config(_)));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = \"k\"\ndomain = \"example.org\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.domain, "example.org");
    }
}
