use super::{ensure_success, FetchKind, FetchTask};
use crate::errors::{MonitorError, Result};
use crate::models::{Build, RawBuild};
use crate::registry::ServiceEntry;
use async_trait::async_trait;
use reqwest::Client;

/// Refreshes the build list of a service's CI pipeline
pub struct BuildFetch {
    client: Client,
}

impl BuildFetch {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FetchTask for BuildFetch {
    fn kind(&self) -> FetchKind {
        FetchKind::Builds
    }

    async fn fetch(&self, entry: &ServiceEntry) -> Result<()> {
        let ci = entry.descriptor().ci.as_ref().ok_or_else(|| {
            MonitorError::Config(format!("service {} has no ci configured", entry.name()))
        })?;

        let response = self.client.get(&ci.api).send().await?;
        let body = ensure_success(response, "builds").await?.text().await?;

        let builds = decode_builds(&body)?;
        entry.replace_builds(builds).await;
        Ok(())
    }
}

pub fn decode_builds(body: &str) -> Result<Vec<Build>> {
    let raw: Vec<RawBuild> = serde_json::from_str(body)?;
    if raw.is_empty() {
        return Err(MonitorError::Decode("empty build list".to_string()));
    }
    Ok(raw.into_iter().map(Build::from).collect())
}
