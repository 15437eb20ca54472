//! Best-effort cache pre-warming.
//!
//! Warm-up work is assigned to hosts up front and dispatched on the ambient
//! tokio runtime without being awaited by planning. A failed warm-up is logged
//! and counted; it never fails or delays the query that triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use ssp_common::{CacheConfig, HostId, PrewarmConfig, Result, SplitId, global_metrics};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache_manager::CacheManagerRegistry;
use crate::locality::CacheLocalityRegistry;

/// One split to warm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrewarmTask {
    pub split: SplitId,
    pub size_bytes: u64,
}

impl PrewarmTask {
    pub fn new(split: SplitId, size_bytes: u64) -> Self {
        Self { split, size_bytes }
    }
}

/// Warm-up tasks routed to one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrewarmAssignment {
    pub host: HostId,
    pub tasks: Vec<PrewarmTask>,
}

#[async_trait]
/// Loads splits into a host's cache.
pub trait PrewarmExecutor: Send + Sync {
    async fn warm(&self, host: &HostId, tasks: &[PrewarmTask], cache: &CacheConfig)
    -> Result<()>;
}

/// Warms splits into in-process cache managers (embedded deployments).
#[derive(Debug, Clone)]
pub struct LocalPrewarmExecutor {
    caches: Arc<CacheManagerRegistry>,
}

impl LocalPrewarmExecutor {
    pub fn new(caches: Arc<CacheManagerRegistry>) -> Self {
        Self { caches }
    }
}

#[async_trait]
impl PrewarmExecutor for LocalPrewarmExecutor {
    async fn warm(
        &self,
        host: &HostId,
        tasks: &[PrewarmTask],
        cache: &CacheConfig,
    ) -> Result<()> {
        let manager = self.caches.get_or_create(cache)?;
        for t in tasks {
            let evicted = manager.admit(&t.split, t.size_bytes)?;
            debug!(
                host = %host,
                split = %t.split,
                evicted = evicted.len(),
                operator = "LocalPrewarm",
                "split warmed"
            );
        }
        Ok(())
    }
}

/// Outcome of one [`PrewarmCoordinator::trigger`] call.
#[derive(Debug, Default)]
pub struct PrewarmDispatch {
    pub assignments: Vec<PrewarmAssignment>,
    /// Splits left out because every host was at its per-host bound.
    pub unassigned: usize,
    handles: Vec<JoinHandle<bool>>,
}

impl PrewarmDispatch {
    pub fn dispatched(&self) -> bool {
        !self.handles.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.assignments.iter().map(|a| a.tasks.len()).sum()
    }

    /// Waits for dispatched warm-ups and returns how many hosts succeeded.
    ///
    /// Planning never calls this; it exists for callers that want to observe
    /// completion (shutdown paths, tests).
    pub async fn wait(self) -> usize {
        join_all(self.handles)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(true)))
            .count()
    }
}

/// Assigns and dispatches warm-up work.
pub struct PrewarmCoordinator {
    executor: Arc<dyn PrewarmExecutor>,
    locality: Arc<CacheLocalityRegistry>,
    config: PrewarmConfig,
}

impl std::fmt::Debug for PrewarmCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrewarmCoordinator")
            .field("config", &self.config)
            .finish()
    }
}

impl PrewarmCoordinator {
    pub fn new(
        executor: Arc<dyn PrewarmExecutor>,
        locality: Arc<CacheLocalityRegistry>,
        config: PrewarmConfig,
    ) -> Self {
        Self {
            executor,
            locality,
            config,
        }
    }

    pub fn config(&self) -> PrewarmConfig {
        self.config
    }

    /// Assigns each split to a host with spare capacity.
    ///
    /// The first preferred host (from locality hints) that is available and
    /// below `max_tasks_per_host` wins; splits without a usable hint go
    /// round-robin over `hosts`. Assignments follow `hosts` order.
    pub fn assign(
        &self,
        tasks: &[PrewarmTask],
        hosts: &[HostId],
    ) -> (Vec<PrewarmAssignment>, usize) {
        let limit = self.config.max_tasks_per_host.max(1);
        let mut buckets: Vec<Vec<PrewarmTask>> = vec![Vec::new(); hosts.len()];
        let mut cursor = 0usize;
        let mut unassigned = 0usize;

        for task in tasks {
            let preferred = self
                .locality
                .preferred_hosts(&task.split)
                .iter()
                .filter_map(|h| hosts.iter().position(|x| x == h))
                .find(|&i| buckets[i].len() < limit);
            let slot = match preferred {
                Some(i) => Some(i),
                None => {
                    let start = cursor;
                    let found = (0..hosts.len())
                        .map(|step| (start + step) % hosts.len())
                        .find(|&i| buckets[i].len() < limit);
                    if let Some(i) = found {
                        cursor = (i + 1) % hosts.len();
                    }
                    found
                }
            };
            match slot {
                Some(i) => buckets[i].push(task.clone()),
                None => unassigned += 1,
            }
        }

        let assignments = hosts
            .iter()
            .zip(buckets)
            .filter(|(_, b)| !b.is_empty())
            .map(|(host, tasks)| PrewarmAssignment {
                host: host.clone(),
                tasks,
            })
            .collect();
        (assignments, unassigned)
    }

    /// Assigns and dispatches warm-ups for `tasks` without waiting for them.
    ///
    /// Nothing is dispatched when pre-warm is disabled, there is no work or no
    /// host, or no tokio runtime is available. Successful warm-ups are recorded
    /// in the locality registry.
    pub fn trigger(
        &self,
        tasks: &[PrewarmTask],
        hosts: &[HostId],
        cache: &CacheConfig,
    ) -> PrewarmDispatch {
        if !self.config.enabled || tasks.is_empty() || hosts.is_empty() {
            debug!(
                enabled = self.config.enabled,
                splits = tasks.len(),
                hosts = hosts.len(),
                operator = "PrewarmCoordinator",
                "pre-warm skipped"
            );
            return PrewarmDispatch::default();
        }
        let (assignments, unassigned) = self.assign(tasks, hosts);
        let runtime = match Handle::try_current() {
            Ok(h) => h,
            Err(e) => {
                warn!(
                    error = %e,
                    operator = "PrewarmCoordinator",
                    "no async runtime available; pre-warm skipped"
                );
                return PrewarmDispatch {
                    assignments,
                    unassigned,
                    handles: Vec::new(),
                };
            }
        };

        let metrics = global_metrics();
        let mut handles = Vec::with_capacity(assignments.len());
        for a in &assignments {
            metrics.inc_prewarm_tasks(a.host.as_str(), "dispatched", a.tasks.len() as u64);
            let executor = Arc::clone(&self.executor);
            let locality = Arc::clone(&self.locality);
            let host = a.host.clone();
            let tasks = a.tasks.clone();
            let cache = cache.clone();
            handles.push(runtime.spawn(async move {
                match executor.warm(&host, &tasks, &cache).await {
                    Ok(()) => {
                        locality.record_accesses(tasks.iter().map(|t| &t.split), &host);
                        global_metrics().inc_prewarm_tasks(
                            host.as_str(),
                            "succeeded",
                            tasks.len() as u64,
                        );
                        debug!(
                            host = %host,
                            splits = tasks.len(),
                            operator = "PrewarmCoordinator",
                            "pre-warm completed"
                        );
                        true
                    }
                    Err(e) => {
                        global_metrics().inc_prewarm_tasks(
                            host.as_str(),
                            "failed",
                            tasks.len() as u64,
                        );
                        warn!(
                            host = %host,
                            splits = tasks.len(),
                            error = %e,
                            operator = "PrewarmCoordinator",
                            "pre-warm failed"
                        );
                        false
                    }
                }
            }));
        }
        info!(
            hosts = assignments.len(),
            splits = tasks.len(),
            unassigned,
            operator = "PrewarmCoordinator",
            "pre-warm dispatched"
        );
        PrewarmDispatch {
            assignments,
            unassigned,
            handles,
        }
    }
}
