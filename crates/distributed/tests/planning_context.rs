use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ssp_common::{CacheConfig, HostId, PlannerConfig, PrewarmConfig, Result, SplitId, SspError};
use ssp_distributed::{PlanningContext, PrewarmExecutor, PrewarmTask};
use ssp_planner::{AggregateFunction, AggregationRequest, Predicate, ScanRequest};
use ssp_storage::{FieldCapability, FieldType, Split, TableSnapshot};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn table() -> TableSnapshot {
    let splits = (0..10)
        .map(|i| {
            let lo = i * 10;
            Split::new(format!("split-{i}"), 500)
                .with_size_bytes(1024)
                .with_bounds("score", lo.to_string(), (lo + 9).to_string())
                .with_field("score", FieldCapability::new(FieldType::Integer).fast())
        })
        .collect();
    TableSnapshot::new("scores", vec![], splits)
}

fn prewarm_config() -> PlannerConfig {
    PlannerConfig {
        prewarm: PrewarmConfig {
            enabled: true,
            max_tasks_per_host: 4,
        },
        ..PlannerConfig::default()
    }
}

#[tokio::test]
async fn prewarm_feeds_locality_for_the_next_plan() {
    init_tracing();
    let ctx = PlanningContext::new(prewarm_config());
    let hosts = vec![HostId::new("h1"), HostId::new("h2")];
    let req = ScanRequest::new(["score"]).filter(Predicate::gt("score", 85));

    let first = ctx.plan(&table(), &req, &hosts).expect("plan");
    assert_eq!(first.plan.tasks.len(), 2);
    assert!(first.plan.tasks.iter().all(|t| t.preferred_hosts.is_empty()));
    assert_eq!(first.prewarm.wait().await, 2);

    let second = ctx.plan(&table(), &req, &hosts).expect("plan");
    assert_eq!(
        second.plan.tasks[0].preferred_hosts,
        ctx.locality().preferred_hosts(&SplitId::new("split-8"))
    );
    assert!(second.plan.tasks.iter().all(|t| t.preferred_hosts.len() == 1));
    second.prewarm.wait().await;

    let cache = ctx
        .caches()
        .get_or_create(&CacheConfig::default())
        .expect("cache");
    assert_eq!(cache.resident_bytes(), 2048);

    let (hints, managers) = ctx.shutdown();
    assert_eq!((hints, managers), (2, 1));
    assert!(cache.is_closed());
}

struct CountingFailure(AtomicUsize);

#[async_trait]
impl PrewarmExecutor for CountingFailure {
    async fn warm(
        &self,
        _host: &HostId,
        tasks: &[PrewarmTask],
        _cache: &CacheConfig,
    ) -> Result<()> {
        self.0.fetch_add(tasks.len(), Ordering::SeqCst);
        Err(SspError::Execution("remote cache unavailable".to_string()))
    }
}

#[tokio::test]
async fn prewarm_failures_do_not_fail_planning() {
    init_tracing();
    let executor = Arc::new(CountingFailure(AtomicUsize::new(0)));
    let ctx = PlanningContext::with_executor(prewarm_config(), executor.clone());
    let hosts = vec![HostId::new("h1")];
    let planned = ctx
        .plan(&table(), &ScanRequest::new(["score"]), &hosts)
        .expect("plan");
    assert_eq!(planned.plan.tasks.len(), 10);
    assert_eq!(planned.prewarm.task_count(), 4);
    assert_eq!(planned.prewarm.unassigned, 6);
    assert_eq!(planned.prewarm.wait().await, 0);
    assert_eq!(executor.0.load(Ordering::SeqCst), 4);
    assert!(ctx.locality().is_empty());
}

#[tokio::test]
async fn log_count_skips_scheduling_and_prewarm() {
    let ctx = PlanningContext::new(prewarm_config());
    let req = ScanRequest::default().aggregate(AggregationRequest::new(AggregateFunction::Count));
    let planned = ctx
        .plan(&table(), &req, &[HostId::new("h1")])
        .expect("plan");
    assert!(planned.plan.tasks.is_empty());
    assert!(!planned.prewarm.dispatched());
    assert_eq!(planned.plan.log_count.expect("counts")[0].count, 5_000);
}

#[test]
fn configuration_errors_surface_from_context() {
    let ctx = PlanningContext::new(PlannerConfig::default());
    let req = ScanRequest::default()
        .aggregate(AggregationRequest::new(AggregateFunction::Sum("missing".into())));
    let err = ctx.plan(&table(), &req, &[]).expect_err("unknown column");
    assert!(matches!(err, SspError::InvalidConfig(_)));
}
