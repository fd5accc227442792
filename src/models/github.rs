use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GithubUser {
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitSignature {
    pub name: String,
    pub email: String,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitCommit {
    pub author: GitSignature,
    pub committer: GitSignature,
    pub message: String,
}

/// Entry of the GitHub commit-list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommit {
    pub sha: String,
    #[serde(default)]
    pub commit: GitCommit,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub author: Option<GithubUser>,
    #[serde(default)]
    pub committer: Option<GithubUser>,
}

/// Subset of the GitHub repository endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GithubRepo {
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub subscribers_count: u64,
    pub description: Option<String>,
}

/// Immutable snapshot of one commit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub author_login: Option<String>,
    pub author_avatar: Option<String>,
    pub committer: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub url: String,
}

impl Commit {
    /// First line of the commit message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

impl From<GithubCommit> for Commit {
    fn from(raw: GithubCommit) -> Self {
        let author_login = raw.author.as_ref().map(|user| user.login.clone());
        let author_avatar = raw
            .author
            .map(|user| user.avatar_url)
            .filter(|avatar| !avatar.is_empty());

        Self {
            sha: raw.sha,
            message: raw.commit.message,
            author: raw.commit.author.name,
            author_login,
            author_avatar,
            committer: raw.commit.committer.name,
            timestamp: raw.commit.author.date.or(raw.commit.committer.date),
            url: raw.html_url,
        }
    }
}
