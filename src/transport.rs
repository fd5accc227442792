//! HTTP transport layer for outbound checks

use crate::config::Config;
use crate::errors::{MonitorError, Result};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// Outcome of a single timed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedResponse {
    pub status: StatusCode,
    /// Time until the response head arrived, truncated to whole milliseconds
    pub elapsed: Duration,
}

/// Transport that measures the wall-clock duration of exactly one attempt
#[derive(Debug, Clone)]
pub struct TimedTransport {
    client: Client,
    timeout: Duration,
}

impl TimedTransport {
    pub fn new(http_timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(http_timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .user_agent(user_agent())
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self {
            client,
            timeout: http_timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.request_timeout, config.accept_invalid_certs)
    }

    /// GET `url` once; the body is never read so decode time is not counted
    pub async fn get(&self, url: &str) -> Result<TimedResponse> {
        let start = Instant::now();

        let response = timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| MonitorError::Timeout)?
            .map_err(MonitorError::Http)?;

        let elapsed = truncate_to_millis(start.elapsed());
        let status = response.status();
        drop(response);

        debug!("GET {} answered {} in {}ms", url, status, elapsed.as_millis());

        Ok(TimedResponse { status, elapsed })
    }
}

/// Client shared by the API fetch tasks
pub fn api_client(config: &Config) -> Result<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .user_agent(user_agent())
        .build()
        .map_err(MonitorError::Http)
}

fn user_agent() -> String {
    format!("status-monitor/{}", env!("CARGO_PKG_VERSION"))
}

pub fn truncate_to_millis(elapsed: Duration) -> Duration {
    Duration::from_millis(elapsed.as_millis() as u64)
}
