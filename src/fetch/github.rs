use super::{ensure_success, FetchKind, FetchTask};
use crate::errors::{MonitorError, Result};
use crate::models::{Commit, GithubCommit, GithubRepo, RepoDescriptor, RepoInfo};
use crate::registry::ServiceEntry;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Minimal GitHub REST client shared by the repository fetch tasks
#[derive(Debug, Clone)]
pub struct GithubApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GithubApi {
    pub fn new(client: Client, base_url: String, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn repo_url(&self, repo: &RepoDescriptor) -> Result<String> {
        let (owner, name) = repo.owner_and_name().ok_or_else(|| {
            MonitorError::Config(format!("cannot derive owner/repo from '{}'", repo.url))
        })?;
        Ok(format!("{}/repos/{}/{}", self.base_url, owner, name))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let mut request = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/vnd.github+json");

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        debug!("Requesting {} from {}", what, url);
        let response = ensure_success(request.send().await?, what).await?;

        if response.status() != StatusCode::OK {
            return Err(MonitorError::Transport(format!(
                "unexpected response {} while fetching {}",
                response.status(),
                what
            )));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn repo_of(entry: &ServiceEntry) -> Result<&RepoDescriptor> {
    entry.descriptor().repo.as_ref().ok_or_else(|| {
        MonitorError::Config(format!("service {} has no repo configured", entry.name()))
    })
}

/// Refreshes the latest commits of a service's repository
pub struct CommitFetch {
    api: GithubApi,
}

impl CommitFetch {
    pub fn new(api: GithubApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl FetchTask for CommitFetch {
    fn kind(&self) -> FetchKind {
        FetchKind::Commits
    }

    async fn fetch(&self, entry: &ServiceEntry) -> Result<()> {
        let url = format!("{}/commits", self.api.repo_url(repo_of(entry)?)?);
        let raw: Vec<GithubCommit> = self.api.get_json(&url, "commits").await?;

        let commits = raw.into_iter().map(Commit::from).collect();
        entry.replace_commits(commits).await;
        Ok(())
    }
}

/// Refreshes stars, forks, watchers and description of a repository
pub struct RepoInfoFetch {
    api: GithubApi,
}

impl RepoInfoFetch {
    pub fn new(api: GithubApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl FetchTask for RepoInfoFetch {
    fn kind(&self) -> FetchKind {
        FetchKind::RepoInfo
    }

    async fn fetch(&self, entry: &ServiceEntry) -> Result<()> {
        let url = self.api.repo_url(repo_of(entry)?)?;
        let repo: GithubRepo = self.api.get_json(&url, "repository").await?;

        entry
            .update_repo_info(RepoInfo {
                stars: repo.stargazers_count,
                forks: repo.forks_count,
                watchers: repo.subscribers_count,
                description: repo.description.filter(|d| !d.is_empty()),
            })
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_service;
    use crate::config::{RepoConfig, ServiceConfig};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry() -> ServiceEntry {
        let raw = ServiceConfig {
            name: "lib".to_string(),
            repo: Some(RepoConfig {
                kind: Some("github".to_string()),
                path: "o/r".to_string(),
                host: None,
            }),
            ..ServiceConfig::default()
        };
        ServiceEntry::new(compile_service(&raw).unwrap())
    }

    fn api(server: &MockServer, token: Option<&str>) -> GithubApi {
        GithubApi::new(Client::new(), format!("{}/", server.uri()), token.map(str::to_string))
    }

    #[tokio::test]
    async fn test_commits_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/commits"))
            .and(header("authorization", "Bearer s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"sha": "a1", "html_url": "https://github.com/o/r/commit/a1",
                 "commit": {"author": {"name": "Ada"}, "committer": {"name": "Ada"}, "message": "init"}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let entry = entry();
        CommitFetch::new(api(&server, Some("s3cret")))
            .fetch(&entry)
            .await
            .unwrap();

        let commits = entry.state().await.commits;
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].sha, "a1");
        assert_eq!(commits[0].message, "init");
    }

    #[tokio::test]
    async fn test_commits_discarded_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/commits"))
            .respond_with(ResponseTemplate::new(403).set_body_string("rate limit exceeded"))
            .mount(&server)
            .await;

        let entry = entry();
        let previous = vec![Commit {
            sha: "a1".to_string(),
            message: "init".to_string(),
            author: "Ada".to_string(),
            author_login: Some("ada".to_string()),
            author_avatar: None,
            committer: "Ada".to_string(),
            timestamp: None,
            url: "https://github.com/o/r/commit/a1".to_string(),
        }];
        entry.replace_commits(previous.clone()).await;

        let err = CommitFetch::new(api(&server, None))
            .fetch(&entry)
            .await
            .unwrap_err();

        assert!(err.is_transport());
        assert_eq!(entry.state().await.commits, previous);
    }

    #[tokio::test]
    async fn test_repo_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stargazers_count": 12,
                "forks_count": 3,
                "subscribers_count": 5,
                "watchers_count": 12,
                "description": "A library"
            })))
            .mount(&server)
            .await;

        let entry = entry();
        RepoInfoFetch::new(api(&server, None))
            .fetch(&entry)
            .await
            .unwrap();

        let info = entry.state().await.repo_info;
        assert_eq!(info.stars, 12);
        assert_eq!(info.forks, 3);
        assert_eq!(info.watchers, 5);
        assert_eq!(info.description.as_deref(), Some("A library"));
    }

    #[tokio::test]
    async fn test_repo_info_malformed_keeps_previous() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let entry = entry();
        let previous = RepoInfo {
            stars: 1,
            forks: 1,
            watchers: 1,
            description: Some("old".to_string()),
        };
        entry.update_repo_info(previous.clone()).await;

        let err = RepoInfoFetch::new(api(&server, None))
            .fetch(&entry)
            .await
            .unwrap_err();

        assert!(err.is_decode());
        assert_eq!(entry.state().await.repo_info, previous);
    }
}
