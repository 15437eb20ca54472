use ssp_common::HostId;
use ssp_planner::{ScanPlan, ScanTask};
use tracing::debug;

use crate::locality::CacheLocalityRegistry;

/// Attaches preferred hosts to every task of `plan` from one locality snapshot.
///
/// Returns the number of tasks that received at least one hint.
pub fn annotate_preferred_hosts(plan: &mut ScanPlan, locality: &CacheLocalityRegistry) -> usize {
    let snapshot = locality.snapshot();
    let mut hinted = 0usize;
    for task in &mut plan.tasks {
        task.preferred_hosts = snapshot
            .get(&task.split)
            .map(|h| h.to_vec())
            .unwrap_or_default();
        if !task.preferred_hosts.is_empty() {
            hinted += 1;
        }
    }
    debug!(
        table = %plan.table,
        tasks = plan.tasks.len(),
        hinted,
        operator = "SplitScheduler",
        "locality hints attached"
    );
    hinted
}

/// Picks the first preferred host of `task` that is currently live.
///
/// `None` means any host will do; the task has no usable hint.
pub fn pick_host<'a>(task: &ScanTask, live_hosts: &'a [HostId]) -> Option<&'a HostId> {
    task.preferred_hosts
        .iter()
        .find_map(|h| live_hosts.iter().find(|live| *live == h))
}

/// True when `host` may run `task` under locality preference: either the task
/// has no hint or `host` is one of its preferred hosts.
pub fn host_matches_locality(task: &ScanTask, host: &HostId) -> bool {
    task.preferred_hosts.is_empty() || task.preferred_hosts.contains(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssp_common::{PlannerConfig, SplitId};
    use ssp_planner::{ScanRequest, plan_scan};
    use ssp_storage::{Split, TableSnapshot};

    fn plan() -> ScanPlan {
        let table = TableSnapshot::new(
            "t",
            vec![],
            vec![Split::new("a", 1), Split::new("b", 1), Split::new("c", 1)],
        );
        plan_scan(&table, &ScanRequest::new(["x"]), &PlannerConfig::default()).expect("plan")
    }

    #[test]
    fn hints_follow_registry_and_stale_hosts_are_ignored() {
        let locality = CacheLocalityRegistry::new();
        locality.record_access(&SplitId::new("a"), &HostId::new("gone"));
        locality.record_access(&SplitId::new("a"), &HostId::new("h2"));
        locality.record_access(&SplitId::new("b"), &HostId::new("h1"));

        let mut plan = plan();
        assert_eq!(annotate_preferred_hosts(&mut plan, &locality), 2);

        let live = vec![HostId::new("h1"), HostId::new("h2")];
        assert_eq!(pick_host(&plan.tasks[0], &live), Some(&live[1]));
        assert_eq!(pick_host(&plan.tasks[1], &live), Some(&live[0]));
        assert_eq!(pick_host(&plan.tasks[2], &live), None);

        assert!(host_matches_locality(&plan.tasks[2], &live[0]));
        assert!(!host_matches_locality(&plan.tasks[1], &live[1]));
    }
}
