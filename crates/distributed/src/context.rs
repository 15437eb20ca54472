//! Process-scoped planning entry point owning the shared registries.

use std::collections::HashMap;
use std::sync::Arc;

use ssp_common::{HostId, PlannerConfig, Result, SplitId};
use ssp_planner::{ScanPlan, ScanRequest, plan_scan};
use ssp_storage::TableSnapshot;
use tracing::info;

use crate::cache_manager::CacheManagerRegistry;
use crate::locality::CacheLocalityRegistry;
use crate::prewarm::{
    LocalPrewarmExecutor, PrewarmCoordinator, PrewarmDispatch, PrewarmExecutor, PrewarmTask,
};
use crate::scheduler::annotate_preferred_hosts;

/// A scan plan ready for the scheduler, plus any pre-warm it triggered.
#[derive(Debug)]
pub struct PlannedScan {
    pub plan: ScanPlan,
    pub prewarm: PrewarmDispatch,
}

/// Holds the locality and cache registries for one process.
///
/// Construct one per process (or per test) and share it by handle; planning
/// itself is stateless and may run concurrently through a shared reference.
#[derive(Debug)]
pub struct PlanningContext {
    config: PlannerConfig,
    locality: Arc<CacheLocalityRegistry>,
    caches: Arc<CacheManagerRegistry>,
    prewarm: PrewarmCoordinator,
}

impl PlanningContext {
    /// Context whose pre-warm loads into this process's cache managers.
    pub fn new(config: PlannerConfig) -> Self {
        let caches = Arc::new(CacheManagerRegistry::new());
        let executor = Arc::new(LocalPrewarmExecutor::new(Arc::clone(&caches)));
        Self::with_parts(config, caches, executor)
    }

    pub fn with_executor(config: PlannerConfig, executor: Arc<dyn PrewarmExecutor>) -> Self {
        Self::with_parts(config, Arc::new(CacheManagerRegistry::new()), executor)
    }

    fn with_parts(
        config: PlannerConfig,
        caches: Arc<CacheManagerRegistry>,
        executor: Arc<dyn PrewarmExecutor>,
    ) -> Self {
        let locality = Arc::new(CacheLocalityRegistry::new());
        let prewarm = PrewarmCoordinator::new(executor, Arc::clone(&locality), config.prewarm);
        Self {
            config,
            locality,
            caches,
            prewarm,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn locality(&self) -> &Arc<CacheLocalityRegistry> {
        &self.locality
    }

    pub fn caches(&self) -> &Arc<CacheManagerRegistry> {
        &self.caches
    }

    /// Plans `request`, attaches locality hints and, when enabled, pre-warms
    /// the retained splits on `hosts`.
    ///
    /// # Errors
    /// Any planning or validation error from [`plan_scan`]; pre-warm never fails
    /// the call.
    pub fn plan(
        &self,
        table: &TableSnapshot,
        request: &ScanRequest,
        hosts: &[HostId],
    ) -> Result<PlannedScan> {
        let mut plan = plan_scan(table, request, &self.config)?;
        let hinted = annotate_preferred_hosts(&mut plan, &self.locality);

        let sizes: HashMap<&SplitId, u64> = table
            .splits
            .iter()
            .map(|s| (&s.id, s.size_bytes.unwrap_or(0)))
            .collect();
        let tasks = plan
            .tasks
            .iter()
            .map(|t| {
                let size = sizes.get(&t.split).copied().unwrap_or(0);
                PrewarmTask::new(t.split.clone(), size)
            })
            .collect::<Vec<_>>();
        let prewarm = self.prewarm.trigger(&tasks, hosts, &self.config.cache);

        info!(
            table = %plan.table,
            tasks = plan.tasks.len(),
            hinted,
            prewarm_tasks = prewarm.task_count(),
            prewarm_dispatched = prewarm.dispatched(),
            operator = "PlanningContext",
            "scan ready for scheduling"
        );
        Ok(PlannedScan { plan, prewarm })
    }

    /// Clears locality hints and closes every cache manager.
    ///
    /// Returns `(hints_cleared, managers_closed)`.
    pub fn shutdown(&self) -> (usize, usize) {
        (self.locality.clear_all(), self.caches.close_all())
    }
}
