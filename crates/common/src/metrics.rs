use std::sync::{Arc, OnceLock};

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};

/// Prometheus-backed counters for pruning, pushdown, pre-warm and cache lifecycle decisions.
#[derive(Clone, Debug)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    registry: Registry,
    splits_considered: CounterVec,
    splits_pruned: CounterVec,
    splits_retained: CounterVec,
    predicates: CounterVec,
    aggregation_plans: CounterVec,
    stats_conversion_fallbacks: CounterVec,
    planning_seconds: HistogramVec,
    prewarm_tasks: CounterVec,
    cache_manager_events: CounterVec,
    locality_entries: GaugeVec,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::new()),
        }
    }

    /// Records the split-reduction outcome of one planning call.
    pub fn record_split_reduction(
        &self,
        table: &str,
        considered: u64,
        pruned_by_partition: u64,
        skipped_by_stats: u64,
        retained: u64,
    ) {
        self.inner
            .splits_considered
            .with_label_values(&[table])
            .inc_by(considered as f64);
        self.inner
            .splits_pruned
            .with_label_values(&[table, "partition"])
            .inc_by(pruned_by_partition as f64);
        self.inner
            .splits_pruned
            .with_label_values(&[table, "statistics"])
            .inc_by(skipped_by_stats as f64);
        self.inner
            .splits_retained
            .with_label_values(&[table])
            .inc_by(retained as f64);
    }

    pub fn record_predicates(&self, table: &str, pushed: u64, residual: u64) {
        self.inner
            .predicates
            .with_label_values(&[table, "pushed"])
            .inc_by(pushed as f64);
        self.inner
            .predicates
            .with_label_values(&[table, "residual"])
            .inc_by(residual as f64);
    }

    /// `kind` is one of `log_count`, `complete`, `partial`.
    pub fn inc_aggregation_plan(&self, table: &str, kind: &str) {
        self.inner
            .aggregation_plans
            .with_label_values(&[table, kind])
            .inc();
    }

    pub fn inc_stats_conversion_fallback(&self, column: &str) {
        self.inner
            .stats_conversion_fallbacks
            .with_label_values(&[column])
            .inc();
    }

    pub fn observe_planning(&self, table: &str, secs: f64) {
        self.inner
            .planning_seconds
            .with_label_values(&[table])
            .observe(secs.max(0.0));
    }

    /// `outcome` is one of `dispatched`, `succeeded`, `failed`.
    pub fn inc_prewarm_tasks(&self, host: &str, outcome: &str, n: u64) {
        self.inner
            .prewarm_tasks
            .with_label_values(&[host, outcome])
            .inc_by(n as f64);
    }

    /// `event` is one of `created`, `closed`, `flushed`, `close_failed`, `flush_failed`.
    pub fn inc_cache_manager_event(&self, event: &str) {
        self.inner
            .cache_manager_events
            .with_label_values(&[event])
            .inc();
    }

    pub fn set_locality_entries(&self, entries: u64) {
        self.inner
            .locality_entries
            .with_label_values(&["splits"])
            .set(entries as f64);
    }

    pub fn render_prometheus(&self) -> String {
        let metric_families = self.inner.registry.gather();
        let mut out = Vec::new();
        let enc = TextEncoder::new();
        if enc.encode(&metric_families, &mut out).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&out).to_string()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsInner {
    fn new() -> Self {
        let registry = Registry::new();

        let splits_considered = counter_vec(
            &registry,
            "ssp_splits_considered_total",
            "Splits listed by the table log for a planning call",
            &["table"],
        );
        let splits_pruned = counter_vec(
            &registry,
            "ssp_splits_pruned_total",
            "Splits removed before scanning",
            &["table", "reason"],
        );
        let splits_retained = counter_vec(
            &registry,
            "ssp_splits_retained_total",
            "Splits handed to the scheduler",
            &["table"],
        );
        let predicates = counter_vec(
            &registry,
            "ssp_predicates_total",
            "Predicates classified by pushdown disposition",
            &["table", "disposition"],
        );
        let aggregation_plans = counter_vec(
            &registry,
            "ssp_aggregation_plans_total",
            "Approved aggregation plans by kind",
            &["table", "kind"],
        );
        let stats_conversion_fallbacks = counter_vec(
            &registry,
            "ssp_stats_conversion_fallbacks_total",
            "Literal/statistic conversions that failed during skipping",
            &["column"],
        );
        let planning_seconds = histogram_vec(
            &registry,
            "ssp_planning_seconds",
            "Time spent planning a scan",
            &["table"],
        );
        let prewarm_tasks = counter_vec(
            &registry,
            "ssp_prewarm_tasks_total",
            "Pre-warm tasks by host and outcome",
            &["host", "outcome"],
        );
        let cache_manager_events = counter_vec(
            &registry,
            "ssp_cache_manager_events_total",
            "Cache manager lifecycle events",
            &["event"],
        );
        let locality_entries = gauge_vec(
            &registry,
            "ssp_locality_entries",
            "Splits with at least one cached-host hint",
            &["kind"],
        );

        Self {
            registry,
            splits_considered,
            splits_pruned,
            splits_retained,
            predicates,
            aggregation_plans,
            stats_conversion_fallbacks,
            planning_seconds,
            prewarm_tasks,
            cache_manager_events,
            locality_entries,
        }
    }
}

fn counter_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let c = CounterVec::new(Opts::new(name, help), labels).expect("counter vec");
    registry
        .register(Box::new(c.clone()))
        .expect("register counter");
    c
}

fn gauge_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> GaugeVec {
    let g = GaugeVec::new(Opts::new(name, help), labels).expect("gauge vec");
    registry
        .register(Box::new(g.clone()))
        .expect("register gauge");
    g
}

fn histogram_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> HistogramVec {
    let h = HistogramVec::new(HistogramOpts::new(name, help), labels).expect("histogram vec");
    registry
        .register(Box::new(h.clone()))
        .expect("register histogram");
    h
}

static GLOBAL_METRICS: OnceLock<MetricsRegistry> = OnceLock::new();

pub fn global_metrics() -> &'static MetricsRegistry {
    GLOBAL_METRICS.get_or_init(MetricsRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::MetricsRegistry;

    #[test]
    fn renders_split_reduction_counters() {
        let m = MetricsRegistry::new();
        m.record_split_reduction("events", 10, 3, 5, 2);
        let text = m.render_prometheus();
        assert!(text.contains("ssp_splits_considered_total"));
        assert!(text.contains("reason=\"statistics\""));
        assert!(text.contains("events"));
    }

    #[test]
    fn renders_all_metric_families() {
        let m = MetricsRegistry::new();
        m.record_split_reduction("t", 4, 1, 1, 2);
        m.record_predicates("t", 2, 1);
        m.inc_aggregation_plan("t", "partial");
        m.inc_stats_conversion_fallback("score");
        m.observe_planning("t", 0.001);
        m.inc_prewarm_tasks("host-a", "dispatched", 3);
        m.inc_cache_manager_event("created");
        m.set_locality_entries(7);
        let text = m.render_prometheus();

        assert!(text.contains("ssp_splits_pruned_total"));
        assert!(text.contains("ssp_splits_retained_total"));
        assert!(text.contains("ssp_predicates_total"));
        assert!(text.contains("ssp_aggregation_plans_total"));
        assert!(text.contains("ssp_stats_conversion_fallbacks_total"));
        assert!(text.contains("ssp_planning_seconds"));
        assert!(text.contains("ssp_prewarm_tasks_total"));
        assert!(text.contains("ssp_cache_manager_events_total"));
        assert!(text.contains("ssp_locality_entries"));
    }
}
