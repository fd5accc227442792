use super::{FetchKind, FetchTask};
use crate::errors::{MonitorError, Result};
use crate::registry::ServiceEntry;
use crate::transport::TimedTransport;
use async_trait::async_trait;
use chrono::Utc;

/// Liveness check of a service URL
pub struct StatusProbe {
    transport: TimedTransport,
}

impl StatusProbe {
    pub fn new(transport: TimedTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl FetchTask for StatusProbe {
    fn kind(&self) -> FetchKind {
        FetchKind::Status
    }

    async fn fetch(&self, entry: &ServiceEntry) -> Result<()> {
        let url = entry.descriptor().probe_url().ok_or_else(|| {
            MonitorError::Config(format!("service {} has no url to probe", entry.name()))
        })?;

        // stamped before sending so a cancelled attempt still counts
        let attempted_at = Utc::now();
        entry.record_attempt(attempted_at).await;

        let response = self.transport.get(url).await?;
        entry
            .record_status(attempted_at, response.status.as_u16(), response.elapsed)
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceDescriptor;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry(url: Option<String>) -> ServiceEntry {
        ServiceEntry::new(ServiceDescriptor {
            id: "api".to_string(),
            name: "api".to_string(),
            url,
            short_url: None,
            host: None,
            icon: None,
            own: false,
            repo: None,
            ci: None,
        })
    }

    fn probe() -> StatusProbe {
        StatusProbe::new(TimedTransport::new(Duration::from_secs(2), false).unwrap())
    }

    #[tokio::test]
    async fn test_records_status_and_latency() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(120)))
            .mount(&server)
            .await;

        let entry = entry(Some(format!("{}/health", server.uri())));
        probe().fetch(&entry).await.unwrap();

        let state = entry.state().await;
        assert_eq!(state.status, Some(200));
        assert!(state.response_time.unwrap() >= Duration::from_millis(120));
        assert!(state.last_checked.is_some());
    }

    #[tokio::test]
    async fn test_error_status_is_still_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let entry = entry(Some(server.uri()));
        probe().fetch(&entry).await.unwrap();
        assert_eq!(entry.state().await.status, Some(500));
    }

    #[tokio::test]
    async fn test_transport_failure_only_records_attempt() {
        let entry = entry(Some("http://127.0.0.1:1/health".to_string()));
        let before = Utc::now();
        entry
            .record_status(before, 200, Duration::from_millis(30))
            .await;

        assert!(probe().fetch(&entry).await.is_err());

        let state = entry.state().await;
        assert_eq!(state.status, Some(200));
        assert_eq!(state.response_time, Some(Duration::from_millis(30)));
        assert!(state.last_checked.unwrap() >= before);
    }

    #[tokio::test]
    async fn test_service_without_url() {
        let entry = entry(None);
        assert!(probe().fetch(&entry).await.is_err());
        assert_eq!(entry.state().await.last_checked, None);
    }
}
