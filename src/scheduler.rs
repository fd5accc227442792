//! Periodic refresh of the registry
//!
//! Two cadences run as independent tasks: the status cadence probes every
//! service URL, the repo cadence refreshes builds, commits and repository
//! metadata. Every (service, category) pair is its own spawned task, bounded
//! by a per-cadence semaphore and a per-task timeout. A tick never waits for
//! the previous tick's tasks; it only skips pairs that are still running.

use crate::config::Config;
use crate::errors::{MonitorError, Result};
use crate::fetch::{FetchKind, Fetchers};
use crate::registry::{Registry, ServiceEntry};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// One unit of work in a pass
pub type Job = (Arc<ServiceEntry>, FetchKind);

/// Status probes for every service with a URL
pub fn plan_status(registry: &Registry) -> Vec<Job> {
    registry
        .entries()
        .iter()
        .filter(|entry| entry.descriptor().probe_url().is_some())
        .map(|entry| (Arc::clone(entry), FetchKind::Status))
        .collect()
}

/// Build fetches for services with CI, commit and repo fetches for services with a repo
pub fn plan_repo(registry: &Registry) -> Vec<Job> {
    let mut jobs = Vec::new();

    for entry in registry.entries() {
        let descriptor = entry.descriptor();
        if descriptor.ci.is_some() {
            jobs.push((Arc::clone(entry), FetchKind::Builds));
        }
        if descriptor.repo.is_some() {
            jobs.push((Arc::clone(entry), FetchKind::Commits));
            jobs.push((Arc::clone(entry), FetchKind::RepoInfo));
        }
    }

    jobs
}

/// Outcome counts of one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct Scheduler {
    registry: Registry,
    fetchers: Arc<Fetchers>,
    service_interval: Duration,
    repo_interval: Duration,
    task_timeout: Duration,
    status_permits: Arc<Semaphore>,
    repo_permits: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(config: &Config, registry: Registry) -> Result<Self> {
        config.validate()?;
        let fetchers = Arc::new(Fetchers::from_config(config)?);

        Ok(Self {
            registry,
            fetchers,
            service_interval: config.service_interval,
            repo_interval: config.repo_interval,
            task_timeout: config.request_timeout * 2,
            status_permits: Arc::new(Semaphore::new(config.max_in_flight)),
            repo_permits: Arc::new(Semaphore::new(config.max_in_flight)),
        })
    }

    /// Override the deadline applied to each fetch task
    pub fn with_task_timeout(mut self, task_timeout: Duration) -> Self {
        self.task_timeout = task_timeout;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[instrument(skip(self))]
    pub async fn run_status_pass(&self) -> PassSummary {
        self.run_pass(plan_status(&self.registry), &self.status_permits)
            .await
    }

    #[instrument(skip(self))]
    pub async fn run_repo_pass(&self) -> PassSummary {
        self.run_pass(plan_repo(&self.registry), &self.repo_permits)
            .await
    }

    async fn run_pass(&self, jobs: Vec<Job>, permits: &Arc<Semaphore>) -> PassSummary {
        let started = Instant::now();
        let mut summary = PassSummary {
            dispatched: jobs.len(),
            ..PassSummary::default()
        };
        let mut tasks = JoinSet::new();

        for (entry, kind) in jobs {
            self.spawn_job(&mut tasks, entry, kind, permits, None);
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => summary.succeeded += 1,
                Ok(Err(_)) => summary.failed += 1,
                Err(e) => {
                    error!("Fetch task panicked or was cancelled: {}", e);
                    summary.failed += 1;
                }
            }
        }

        debug!(
            dispatched = summary.dispatched,
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pass complete"
        );

        summary
    }

    /// Spawn one fetch, bounded by the cadence's permits and the task deadline
    fn spawn_job(
        &self,
        tasks: &mut JoinSet<Result<()>>,
        entry: Arc<ServiceEntry>,
        kind: FetchKind,
        permits: &Arc<Semaphore>,
        guard: Option<InFlightGuard>,
    ) {
        let fetchers = Arc::clone(&self.fetchers);
        let permits = Arc::clone(permits);
        let task_timeout = self.task_timeout;

        tasks.spawn(async move {
            let _guard = guard;
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| MonitorError::Transport(format!("scheduler stopped: {}", e)))?;

            match timeout(task_timeout, fetchers.run(kind, &entry)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        service = %entry.name(),
                        category = %kind,
                        timeout_ms = task_timeout.as_millis() as u64,
                        "Fetch timed out, keeping previous values"
                    );
                    Err(MonitorError::Timeout)
                }
            }
        });
    }

    /// Spawn both cadences; each runs its first pass immediately
    pub fn start(self) -> SchedulerHandle {
        info!(
            services = self.registry.len(),
            service_interval_s = self.service_interval.as_secs(),
            repo_interval_s = self.repo_interval.as_secs(),
            "Starting scheduler"
        );

        let scheduler = Arc::new(self);

        let status_scheduler = Arc::clone(&scheduler);
        let status = tokio::spawn(async move {
            status_scheduler.status_loop().await;
        });

        let repo_scheduler = Arc::clone(&scheduler);
        let repo = tokio::spawn(async move {
            repo_scheduler.repo_loop().await;
        });

        SchedulerHandle { status, repo }
    }

    async fn status_loop(&self) {
        self.cadence_loop("status", self.service_interval, plan_status, &self.status_permits)
            .await;
    }

    async fn repo_loop(&self) {
        self.cadence_loop("repo", self.repo_interval, plan_repo, &self.repo_permits)
            .await;
    }

    /// Dispatch the cadence's jobs on every tick without waiting for the
    /// previous tick's tasks. A job still running from an earlier tick is
    /// skipped; every other job is dispatched on time.
    async fn cadence_loop(
        &self,
        cadence: &'static str,
        every: Duration,
        plan: fn(&Registry) -> Vec<Job>,
        permits: &Arc<Semaphore>,
    ) {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let in_flight: InFlight = Arc::new(Mutex::new(HashSet::new()));
        let mut tasks = JoinSet::new();

        loop {
            ticker.tick().await;

            let mut failed = 0;
            while let Some(joined) = tasks.try_join_next() {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => failed += 1,
                    Err(e) => {
                        error!("Fetch task panicked or was cancelled: {}", e);
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                info!("{} cadence: {} fetches failed since last tick", cadence, failed);
            }

            let mut skipped = 0;
            for (entry, kind) in plan(&self.registry) {
                match InFlightGuard::claim(&in_flight, entry.name(), kind) {
                    Some(guard) => self.spawn_job(&mut tasks, entry, kind, permits, Some(guard)),
                    None => skipped += 1,
                }
            }
            if skipped > 0 {
                debug!(cadence, skipped, "Skipped fetches still in flight");
            }
        }
    }
}

type InFlight = Arc<Mutex<HashSet<(String, FetchKind)>>>;

/// Marks one (service, category) job as running until dropped
struct InFlightGuard {
    set: InFlight,
    key: (String, FetchKind),
}

impl InFlightGuard {
    fn claim(set: &InFlight, service: &str, kind: FetchKind) -> Option<Self> {
        let key = (service.to_string(), kind);
        let mut running = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !running.insert(key.clone()) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            key,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut running = self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        running.remove(&self.key);
    }
}

/// Handles of the two running cadences
pub struct SchedulerHandle {
    status: JoinHandle<()>,
    repo: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        !self.status.is_finished() && !self.repo.is_finished()
    }

    /// Stop both cadences; in-flight fetch tasks finish on their own
    pub fn shutdown(self) {
        self.status.abort();
        self.repo.abort();
        info!("Scheduler stopped");
    }
}
