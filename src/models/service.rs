use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::build::Build;
use super::github::Commit;

/// Repository hosting backends the monitor knows how to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoBackend {
    Github,
}

impl RepoBackend {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "github" => Some(RepoBackend::Github),
            _ => None,
        }
    }

    pub fn default_host(&self) -> &'static str {
        match self {
            RepoBackend::Github => "https://github.com",
        }
    }
}

impl fmt::Display for RepoBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoBackend::Github => write!(f, "github"),
        }
    }
}

/// Build pipelines the monitor knows how to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiBackend {
    Drone,
}

impl CiBackend {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "drone" => Some(CiBackend::Drone),
            _ => None,
        }
    }
}

impl fmt::Display for CiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CiBackend::Drone => write!(f, "drone"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepoDescriptor {
    pub backend: RepoBackend,
    pub path: String,
    pub url: String,
}

impl RepoDescriptor {
    /// Owner and repository name, taken from the last two segments of the URL
    pub fn owner_and_name(&self) -> Option<(&str, &str)> {
        let mut segments = self
            .url
            .trim_end_matches('/')
            .rsplit('/')
            .filter(|s| !s.is_empty());
        let name = segments.next()?;
        let owner = segments.next()?;
        Some((owner, name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CiDescriptor {
    pub backend: CiBackend,
    pub api: String,
    pub url: String,
}

/// Identity and derived URLs of a service, fixed once compiled
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub short_url: Option<String>,
    pub host: Option<String>,
    pub icon: Option<String>,
    pub own: bool,
    pub repo: Option<RepoDescriptor>,
    pub ci: Option<CiDescriptor>,
}

impl ServiceDescriptor {
    /// URL the status probe should hit, if any
    pub fn probe_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Repository metadata refreshed by the repo-info fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepoInfo {
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub description: Option<String>,
}

/// Mutable results written by fetch tasks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceState {
    pub last_checked: Option<DateTime<Utc>>,
    pub response_time: Option<Duration>,
    pub status: Option<u16>,
    pub repo_info: RepoInfo,
    pub builds: Vec<Build>,
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Repo {
    pub url: String,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ci {
    pub api: String,
    pub url: String,
    pub current_build_url: Option<String>,
}

/// Owned, consistent copy of one service as seen by readers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub short_url: Option<String>,
    pub host: Option<String>,
    pub icon: Option<String>,
    pub own: bool,
    pub repo: Option<Repo>,
    pub ci: Option<Ci>,
    pub last_checked: Option<DateTime<Utc>>,
    pub response_time_ms: Option<u64>,
    pub status: Option<u16>,
    pub last_builds: Vec<Build>,
    pub last_commits: Vec<Commit>,
}

impl Service {
    pub fn from_parts(descriptor: &ServiceDescriptor, state: &ServiceState) -> Self {
        let repo = descriptor.repo.as_ref().map(|repo| Repo {
            url: repo.url.clone(),
            stars: state.repo_info.stars,
            forks: state.repo_info.forks,
            watchers: state.repo_info.watchers,
            description: state.repo_info.description.clone(),
        });

        let ci = descriptor.ci.as_ref().map(|ci| Ci {
            api: ci.api.clone(),
            url: ci.url.clone(),
            current_build_url: state
                .builds
                .first()
                .map(|build| format!("{}/{}", ci.url, build.number)),
        });

        Self {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            url: descriptor.url.clone(),
            short_url: descriptor.short_url.clone(),
            host: descriptor.host.clone(),
            icon: descriptor.icon.clone(),
            own: descriptor.own,
            repo,
            ci,
            last_checked: state.last_checked,
            response_time_ms: state.response_time.map(|d| d.as_millis() as u64),
            status: state.status,
            last_builds: state.builds.clone(),
            last_commits: state.commits.clone(),
        }
    }
}
