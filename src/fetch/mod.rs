//! Fetch tasks refreshing one data category of one service

pub mod builds;
pub mod github;
pub mod status;

pub use builds::BuildFetch;
pub use github::{CommitFetch, GithubApi, RepoInfoFetch};
pub use status::StatusProbe;

use crate::config::Config;
use crate::errors::{MonitorError, Result};
use crate::registry::ServiceEntry;
use crate::transport::{api_client, TimedTransport};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use std::fmt;
use tracing::{debug, warn};

/// Data category refreshed by a fetch task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Status,
    Builds,
    Commits,
    RepoInfo,
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchKind::Status => write!(f, "status"),
            FetchKind::Builds => write!(f, "builds"),
            FetchKind::Commits => write!(f, "commits"),
            FetchKind::RepoInfo => write!(f, "repo"),
        }
    }
}

/// A single refresh of one category for one service.
///
/// Implementations write to the entry only once the new values are fully
/// decoded; on error the entry's results are left as they were.
#[async_trait]
pub trait FetchTask: Send + Sync {
    fn kind(&self) -> FetchKind;

    async fn fetch(&self, entry: &ServiceEntry) -> Result<()>;
}

/// The four fetch tasks, built once and shared by both cadences
pub struct Fetchers {
    status: StatusProbe,
    builds: BuildFetch,
    commits: CommitFetch,
    repo_info: RepoInfoFetch,
}

impl Fetchers {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = api_client(config)?;
        let github = GithubApi::new(
            client.clone(),
            config.github_api_url.clone(),
            config.github_token().map(str::to_string),
        );

        Ok(Self {
            status: StatusProbe::new(TimedTransport::from_config(config)?),
            builds: BuildFetch::new(client),
            commits: CommitFetch::new(github.clone()),
            repo_info: RepoInfoFetch::new(github),
        })
    }

    pub fn task(&self, kind: FetchKind) -> &dyn FetchTask {
        match kind {
            FetchKind::Status => &self.status,
            FetchKind::Builds => &self.builds,
            FetchKind::Commits => &self.commits,
            FetchKind::RepoInfo => &self.repo_info,
        }
    }

    /// Run one task, logging a failure with service and category context
    pub async fn run(&self, kind: FetchKind, entry: &ServiceEntry) -> Result<()> {
        let result = self.task(kind).fetch(entry).await;

        match &result {
            Ok(()) => debug!(service = %entry.name(), category = %kind, "Fetch succeeded"),
            Err(e) => warn!(
                service = %entry.name(),
                category = %kind,
                error = %e,
                "Fetch failed, keeping previous values"
            ),
        }

        result
    }
}

/// Turn a non-2xx response into a transport error
pub(crate) async fn ensure_success(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(MonitorError::Transport(status_message(status, what, body.trim())))
}

fn status_message(status: StatusCode, what: &str, body: &str) -> String {
    match status.as_u16() {
        401 => format!("unauthorized while fetching {}: {}", what, body),
        403 => format!("forbidden while fetching {}: {}", what, body),
        404 => format!("{} not found: {}", what, body),
        429 => format!("rate limited while fetching {}: {}", what, body),
        500..=599 => format!("server error {} while fetching {}: {}", status, what, body),
        _ => format!("unexpected response {} while fetching {}: {}", status, what, body),
    }
}
