use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Build record as returned by the CI build-list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawBuild {
    pub id: i64,
    pub number: i64,
    pub event: String,
    pub status: String,
    pub enqueued_at: i64,
    pub created_at: i64,
    pub started_at: i64,
    pub finished_at: i64,
    pub deploy_to: String,
    pub commit: String,
    pub branch: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub refspec: String,
    pub remote: String,
    pub title: String,
    pub message: String,
    pub timestamp: i64,
    pub author: String,
    pub author_avatar: String,
    pub author_email: String,
    pub link_url: String,
}

/// Immutable snapshot of one CI build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Build {
    pub id: i64,
    pub number: i64,
    pub event: String,
    pub status: String,
    pub enqueued_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// finished_at - started_at, in seconds; zero or negative for unfinished builds
    pub duration_secs: i64,
    pub deploy_to: String,
    pub commit: String,
    pub branch: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub refspec: String,
    pub remote: String,
    pub title: String,
    pub message: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub author: String,
    pub author_avatar: String,
    pub author_email: String,
    pub link_url: String,
}

impl Build {
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.duration_secs)
    }
}

impl From<RawBuild> for Build {
    fn from(raw: RawBuild) -> Self {
        Self {
            id: raw.id,
            number: raw.number,
            event: raw.event,
            status: raw.status,
            enqueued_at: epoch(raw.enqueued_at),
            created_at: epoch(raw.created_at),
            started_at: epoch(raw.started_at),
            finished_at: epoch(raw.finished_at),
            duration_secs: raw.finished_at.saturating_sub(raw.started_at),
            deploy_to: raw.deploy_to,
            commit: raw.commit,
            branch: raw.branch,
            git_ref: raw.git_ref,
            refspec: raw.refspec,
            remote: raw.remote,
            title: raw.title,
            message: raw.message,
            timestamp: epoch(raw.timestamp),
            author: raw.author,
            author_avatar: raw.author_avatar,
            author_email: raw.author_email,
            link_url: raw.link_url,
        }
    }
}

fn epoch(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}
