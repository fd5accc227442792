//! Configuration management for the status monitor

use crate::errors::{MonitorError, Result};
use serde::{Deserialize, Deserializer};
use std::env;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the JSON API binds to
    pub listen: String,

    /// Delay between two status passes
    #[serde(deserialize_with = "human_duration")]
    pub service_interval: Duration,

    /// Delay between two repository/build passes
    #[serde(deserialize_with = "human_duration")]
    pub repo_interval: Duration,

    /// Optional token sent to the GitHub API
    pub github_token: Option<String>,

    /// Base URL of the GitHub API
    pub github_api_url: String,

    /// Timeout applied to every outbound request
    #[serde(deserialize_with = "human_duration")]
    pub request_timeout: Duration,

    /// Maximum number of fetch tasks in flight per cadence
    pub max_in_flight: usize,

    /// Skip TLS certificate verification for status probes
    pub accept_invalid_certs: bool,

    /// Default log filter when RUST_LOG is unset
    pub log_level: String,

    /// "json" or "text"
    pub log_format: String,

    /// Monitored services, in display order
    pub services: Vec<ServiceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            service_interval: Duration::from_secs(60),
            repo_interval: Duration::from_secs(600),
            github_token: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            max_in_flight: 16,
            accept_invalid_certs: false,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            services: Vec::new(),
        }
    }
}

/// Raw description of one monitored service
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub id: Option<String>,
    pub name: String,
    pub url: Option<String>,
    pub host: Option<String>,
    pub icon: Option<String>,
    pub own: bool,
    pub repo: Option<RepoConfig>,
    pub ci: Option<CiConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepoConfig {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub path: String,
    pub host: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CiConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub host: Option<String>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Override loaded values from environment variables
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(listen) = env::var("LISTEN_ADDR") {
            self.listen = listen;
        }

        if let Ok(interval) = env::var("SERVICE_INTERVAL") {
            self.service_interval = parse_duration("SERVICE_INTERVAL", &interval)?;
        }

        if let Ok(interval) = env::var("REPO_INTERVAL") {
            self.repo_interval = parse_duration("REPO_INTERVAL", &interval)?;
        }

        if let Ok(timeout) = env::var("REQUEST_TIMEOUT") {
            self.request_timeout = parse_duration("REQUEST_TIMEOUT", &timeout)?;
        }

        if let Ok(token) = env::var("GITHUB_TOKEN") {
            if !token.is_empty() {
                self.github_token = Some(token);
            }
        }

        if let Ok(max) = env::var("MAX_IN_FLIGHT") {
            self.max_in_flight = max.parse().map_err(|_| {
                MonitorError::Config(format!("MAX_IN_FLIGHT must be a number, got '{}'", max))
            })?;
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            self.log_level = level;
        }

        if let Ok(format) = env::var("LOG_FORMAT") {
            self.log_format = format.to_lowercase();
        }

        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.service_interval.is_zero() {
            return Err(MonitorError::Config("service_interval must be greater than 0".to_string()));
        }

        if self.repo_interval.is_zero() {
            return Err(MonitorError::Config("repo_interval must be greater than 0".to_string()));
        }

        if self.request_timeout.is_zero() {
            return Err(MonitorError::Config("request_timeout must be greater than 0".to_string()));
        }

        if self.max_in_flight == 0 {
            return Err(MonitorError::Config("max_in_flight must be greater than 0".to_string()));
        }

        if self.github_api_url.is_empty() {
            return Err(MonitorError::Config("github_api_url cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Token with surrounding whitespace removed, if any is left
    pub fn github_token(&self) -> Option<&str> {
        self.github_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value.trim()).map_err(|e| {
        MonitorError::Config(format!("could not parse {} ('{}'): {}", field, value, e))
    })
}

fn human_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
service_interval: 30s
repo_interval: 5m
github_token: abc
services:
  - name: api
    url: https://api.example.org/health
    own: true
  - name: lib
    repo:
      type: github
      path: o/r
    ci:
      type: drone
      host: https://drone.example.org/
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_interval, Duration::from_secs(60));
        assert_eq!(config.github_api_url, DEFAULT_GITHUB_API_URL);
        assert!(config.services.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let config = Config::from_yaml(SAMPLE).unwrap();

        assert_eq!(config.service_interval, Duration::from_secs(30));
        assert_eq!(config.repo_interval, Duration::from_secs(300));
        assert_eq!(config.github_token(), Some("abc"));
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].name, "api");
        assert!(config.services[0].own);

        let lib = &config.services[1];
        assert_eq!(lib.repo.as_ref().unwrap().kind.as_deref(), Some("github"));
        assert_eq!(lib.ci.as_ref().unwrap().kind, "drone");
        // unset fields keep their defaults
        assert_eq!(config.max_in_flight, 16);
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        let result = Config::from_yaml("service_interval: soon\n");
        assert!(matches!(result, Err(MonitorError::Yaml(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.services.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/status-monitor.yml");
        assert!(matches!(result, Err(MonitorError::Io(_))));
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.max_in_flight = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.repo_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_token_is_ignored() {
        let config = Config {
            github_token: Some("  ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.github_token(), None);
    }
}
