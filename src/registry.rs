//! Shared registry of monitored services
//!
//! The set of services is fixed when the registry is built. Each record keeps
//! its descriptor immutable and guards its results with its own lock, so fetch
//! tasks for different services never contend and readers always receive an
//! owned copy taken under the record's read lock.

use crate::models::{Build, Commit, RepoInfo, Service, ServiceDescriptor, ServiceState};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// One monitored service: fixed identity plus lock-guarded results
#[derive(Debug)]
pub struct ServiceEntry {
    descriptor: ServiceDescriptor,
    state: RwLock<ServiceState>,
}

impl ServiceEntry {
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        Self {
            descriptor,
            state: RwLock::new(ServiceState::default()),
        }
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub async fn state(&self) -> ServiceState {
        self.state.read().await.clone()
    }

    pub async fn snapshot(&self) -> Service {
        let state = self.state.read().await;
        Service::from_parts(&self.descriptor, &state)
    }

    /// Record when a status check was attempted, keeping the previous result
    pub async fn record_attempt(&self, at: DateTime<Utc>) {
        self.state.write().await.last_checked = Some(at);
    }

    /// Record a probe attempt together with its result
    pub async fn record_status(&self, at: DateTime<Utc>, status: u16, response_time: Duration) {
        let mut state = self.state.write().await;
        state.last_checked = Some(at);
        state.status = Some(status);
        state.response_time = Some(response_time);
    }

    pub async fn replace_builds(&self, builds: Vec<Build>) {
        self.state.write().await.builds = builds;
    }

    pub async fn replace_commits(&self, commits: Vec<Commit>) {
        self.state.write().await.commits = commits;
    }

    pub async fn update_repo_info(&self, info: RepoInfo) {
        self.state.write().await.repo_info = info;
    }
}

/// Ordered, fixed collection of service records
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Arc<[Arc<ServiceEntry>]>,
}

impl Registry {
    pub fn new(descriptors: Vec<ServiceDescriptor>) -> Self {
        Self {
            entries: descriptors
                .into_iter()
                .map(|descriptor| Arc::new(ServiceEntry::new(descriptor)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Arc<ServiceEntry>] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&Arc<ServiceEntry>> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    /// Copy of every service, in configuration order
    pub async fn snapshot(&self) -> Vec<Service> {
        let mut services = Vec::with_capacity(self.entries.len());
        for entry in self.entries.iter() {
            services.push(entry.snapshot().await);
        }
        services
    }

    pub async fn get(&self, name: &str) -> Option<Service> {
        match self.entry(name) {
            Some(entry) => Some(entry.snapshot().await),
            None => None,
        }
    }

    /// Service name to last observed status code
    pub async fn statuses(&self) -> BTreeMap<String, Option<u16>> {
        let mut statuses = BTreeMap::new();
        for entry in self.entries.iter() {
            let status = entry.state.read().await.status;
            statuses.insert(entry.name().to_string(), status);
        }
        statuses
    }

    /// Copy of the services flagged as own, in configuration order
    pub async fn own(&self) -> Vec<Service> {
        let mut services = Vec::new();
        for entry in self.entries.iter().filter(|entry| entry.descriptor.own) {
            services.push(entry.snapshot().await);
        }
        services
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::config::ServiceConfig;

    fn registry(names: &[(&str, bool)]) -> Registry {
        let raw: Vec<ServiceConfig> = names
            .iter()
            .map(|(name, own)| ServiceConfig {
                name: name.to_string(),
                url: Some(format!("http://{}.test", name)),
                own: *own,
                ..ServiceConfig::default()
            })
            .collect();
        Registry::new(compile(&raw).unwrap())
    }

    #[tokio::test]
    async fn test_snapshot_keeps_order() {
        let registry = registry(&[("c", false), ("a", true), ("b", false)]);

        let names: Vec<_> = registry.snapshot().await.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn test_own_projection() {
        let registry = registry(&[("c", false), ("a", true), ("b", true)]);

        let names: Vec<_> = registry.own().await.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_status_projection() {
        let registry = registry(&[("api", false), ("web", false)]);
        let now = Utc::now();

        registry
            .entry("api")
            .unwrap()
            .record_status(now, 200, Duration::from_millis(12))
            .await;

        let statuses = registry.statuses().await;
        assert_eq!(statuses.get("api"), Some(&Some(200)));
        assert_eq!(statuses.get("web"), Some(&None));
    }

    #[tokio::test]
    async fn test_attempt_keeps_previous_result() {
        let registry = registry(&[("api", false)]);
        let entry = registry.entry("api").unwrap();
        let first = Utc::now();

        entry.record_status(first, 200, Duration::from_millis(40)).await;
        let later = first + chrono::Duration::seconds(30);
        entry.record_attempt(later).await;

        let state = entry.state().await;
        assert_eq!(state.last_checked, Some(later));
        assert_eq!(state.status, Some(200));
        assert_eq!(state.response_time, Some(Duration::from_millis(40)));
    }

    #[tokio::test]
    async fn test_concurrent_writers_and_readers() {
        let registry = registry(&[("api", false)]);
        let mut handles = Vec::new();

        for i in 0..32u16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let entry = registry.entry("api").unwrap();
                // status and latency always move together
                entry
                    .record_status(Utc::now(), 200 + i, Duration::from_millis(u64::from(i)))
                    .await;
                let service = registry.get("api").await.unwrap();
                let status = service.status.unwrap();
                assert_eq!(u64::from(status - 200), service.response_time_ms.unwrap());
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new(Vec::new());
        assert!(registry.is_empty());
        assert!(tokio_test::block_on(registry.snapshot()).is_empty());
        assert!(tokio_test::block_on(registry.statuses()).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_service() {
        let registry = registry(&[("api", false)]);
        assert!(registry.get("nope").await.is_none());
    }
}
