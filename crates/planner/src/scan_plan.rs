//! Scan planning: ties split reduction, pushdown classification and
//! aggregation validation into per-split units of work.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use ssp_common::{HostId, PlannerConfig, Result, SplitId, SspError, global_metrics};
use ssp_storage::{Split, TableSnapshot};
use tracing::info;

use crate::aggregation::{AggregationPlan, AggregationRequest, CountGroup, log_count, validate};
use crate::fast_fields::FastFieldSet;
use crate::predicate::Predicate;
use crate::pushdown::partition;
use crate::skipping::{
    PruningStats, SkippingOptions, Truth, eval_partition_predicate, reduce_with_options,
};

/// Logical read request against one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub projection: Vec<String>,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub aggregation: Option<AggregationRequest>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ScanRequest {
    pub fn new<S: Into<String>>(projection: impl IntoIterator<Item = S>) -> Self {
        Self {
            projection: projection.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    #[must_use]
    pub fn aggregate(mut self, aggregation: AggregationRequest) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Unit of work handed to the scheduler for one retained split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanTask {
    pub split: SplitId,
    pub partition_values: BTreeMap<String, Option<String>>,
    /// Columns the index engine must read, partition columns excluded.
    pub required_columns: Vec<String>,
    pub pushed_predicates: Vec<Predicate>,
    pub aggregation: Option<AggregationPlan>,
    pub limit: Option<usize>,
    /// Hosts believed to hold a warm cache of the split, most useful first.
    #[serde(default)]
    pub preferred_hosts: Vec<HostId>,
}

/// Output of [`plan_scan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanPlan {
    pub table: String,
    /// Empty for log-only counts.
    pub tasks: Vec<ScanTask>,
    /// Partition predicates fully resolved by pruning.
    pub partition_filters: Vec<Predicate>,
    /// Evaluated by the index engine inside every task.
    pub pushed_predicates: Vec<Predicate>,
    /// Must be re-evaluated by the caller over materialized rows.
    pub residual_predicates: Vec<Predicate>,
    pub aggregation: Option<AggregationPlan>,
    /// Result of a log-only count; set only when `aggregation` is `LogCount`.
    pub log_count: Option<Vec<CountGroup>>,
    /// Overall row limit; tasks also carry it when no residual or aggregation exists.
    pub limit: Option<usize>,
    pub stats: PruningStats,
}

impl ScanPlan {
    /// `false` when the caller must finish the aggregation from partials.
    pub fn aggregation_complete(&self) -> bool {
        self.aggregation
            .as_ref()
            .is_none_or(AggregationPlan::is_complete)
    }

    pub fn limit_pushed(&self) -> bool {
        self.tasks.iter().any(|t| t.limit.is_some())
    }

    pub fn split_ids(&self) -> Vec<&SplitId> {
        self.tasks.iter().map(|t| &t.split).collect()
    }
}

/// Plans a read of `table`.
///
/// Splits are reduced first; the fast-field set is then derived from the
/// table's latest split (or the configured fallback) and used for pushdown and
/// aggregation validation. Validation errors surface here, before any split is
/// scanned.
///
/// When an aggregation is pushed, every data predicate is handed to the engine
/// with it: the validator has already required each of them to be evaluated
/// exactly, and per-split partials over unfiltered rows would be wrong.
///
/// # Errors
/// - [`SspError::Planning`] for blank column names
/// - [`SspError::Unsupported`] for an aggregation whose partition predicates
///   are not resolved for every retained split; an aggregated result cannot be
///   re-filtered
/// - any error from [`validate`]
pub fn plan_scan(
    table: &TableSnapshot,
    request: &ScanRequest,
    config: &PlannerConfig,
) -> Result<ScanPlan> {
    let started = Instant::now();
    check_column_names(request)?;

    let partition_columns = table.partition_column_set();
    let options = SkippingOptions {
        string_fallback: config.stats_string_fallback,
    };
    let reduction = reduce_with_options(
        &table.splits,
        &request.predicates,
        &partition_columns,
        options,
    );
    let fast_fields = FastFieldSet::derive(table, &config.fast_fields);

    let (partition_preds, data_preds): (Vec<Predicate>, Vec<Predicate>) = request
        .predicates
        .iter()
        .cloned()
        .partition(|p| p.references_only(&partition_columns));
    let (partition_filters, unresolved): (Vec<Predicate>, Vec<Predicate>) = partition_preds
        .into_iter()
        .partition(|p| resolved_by_pruning(p, &reduction.retained));

    let aggregation = request
        .aggregation
        .as_ref()
        .map(|agg| validate(agg, &request.predicates, &fast_fields, &partition_columns))
        .transpose()?;
    if aggregation.is_some() && !unresolved.is_empty() {
        return Err(SspError::Unsupported(format!(
            "aggregation cannot be answered exactly: partition predicates [{}] are not \
             resolved by every retained split",
            unresolved
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let (pushed_predicates, mut residual_predicates) = match &aggregation {
        Some(AggregationPlan::Pushed { .. }) => (data_preds, Vec::new()),
        _ => {
            let split = partition(&data_preds, &|c: &str| fast_fields.capability(c));
            (split.pushed, split.residual)
        }
    };
    residual_predicates.extend(unresolved);

    let metrics = global_metrics();
    let stats = reduction.stats;
    metrics.record_split_reduction(
        &table.name,
        stats.considered as u64,
        stats.pruned_by_partition as u64,
        stats.skipped_by_stats as u64,
        stats.retained as u64,
    );
    metrics.record_predicates(
        &table.name,
        pushed_predicates.len() as u64,
        residual_predicates.len() as u64,
    );
    if let Some(plan) = &aggregation {
        metrics.inc_aggregation_plan(&table.name, plan.kind());
    }

    let push_limit = residual_predicates.is_empty() && aggregation.is_none();
    let task_limit = request.limit.filter(|_| push_limit);

    let (tasks, counts) = match &aggregation {
        Some(AggregationPlan::LogCount { group_by }) => {
            (Vec::new(), Some(log_count(&reduction.retained, group_by)))
        }
        _ => {
            let required = required_columns(
                request,
                aggregation.as_ref(),
                &pushed_predicates,
                &residual_predicates,
                &partition_columns,
            );
            let tasks = reduction
                .retained
                .iter()
                .map(|split| ScanTask {
                    split: split.id.clone(),
                    partition_values: split
                        .partition_values
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                    required_columns: required.clone(),
                    pushed_predicates: pushed_predicates.clone(),
                    aggregation: aggregation.clone(),
                    limit: task_limit,
                    preferred_hosts: Vec::new(),
                })
                .collect();
            (tasks, None)
        }
    };

    let plan = ScanPlan {
        table: table.name.clone(),
        tasks,
        partition_filters,
        pushed_predicates,
        residual_predicates,
        aggregation,
        log_count: counts,
        limit: request.limit,
        stats,
    };
    let elapsed = started.elapsed();
    metrics.observe_planning(&table.name, elapsed.as_secs_f64());
    info!(
        table = %plan.table,
        considered = stats.considered,
        retained = stats.retained,
        tasks = plan.tasks.len(),
        pushed = plan.pushed_predicates.len(),
        residual = plan.residual_predicates.len(),
        aggregation = plan.aggregation.as_ref().map_or("none", AggregationPlan::kind),
        fast_field_source = ?fast_fields.source(),
        elapsed_us = elapsed.as_micros() as u64,
        operator = "ScanPlanner",
        "scan planned"
    );
    Ok(plan)
}

fn resolved_by_pruning(pred: &Predicate, retained: &[&Split]) -> bool {
    retained
        .iter()
        .all(|s| eval_partition_predicate(pred, s) == Some(Truth::True))
}

fn check_column_names(request: &ScanRequest) -> Result<()> {
    if request.projection.iter().any(|c| is_blank(c)) {
        return Err(SspError::Planning("projection contains an empty column name".into()));
    }
    if let Some(p) = request
        .predicates
        .iter()
        .find(|p| p.columns().iter().any(|c| is_blank(c)))
    {
        return Err(SspError::Planning(format!(
            "predicate {p} references an empty column name"
        )));
    }
    if let Some(agg) = &request.aggregation {
        if agg.function.column().is_some_and(is_blank) || agg.group_by.iter().any(|c| is_blank(c))
        {
            return Err(SspError::Planning(
                "aggregation references an empty column name".into(),
            ));
        }
    }
    Ok(())
}

fn is_blank(column: &str) -> bool {
    column.trim().is_empty()
}

/// Columns the engine reads, in first-use order, partition columns excluded.
fn required_columns(
    request: &ScanRequest,
    aggregation: Option<&AggregationPlan>,
    pushed: &[Predicate],
    residual: &[Predicate],
    partition_columns: &HashSet<String>,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |c: &str| {
        if !partition_columns.contains(c) && !out.iter().any(|x| x == c) {
            out.push(c.to_string());
        }
    };
    match (aggregation, &request.aggregation) {
        (Some(_), Some(agg)) => {
            if let Some(c) = agg.function.column() {
                push(c);
            }
            for c in &agg.group_by {
                push(c);
            }
            for c in sorted_columns(pushed) {
                push(&c);
            }
        }
        _ => {
            for c in &request.projection {
                push(c);
            }
            for c in sorted_columns(residual) {
                push(&c);
            }
        }
    }
    out
}

fn sorted_columns(predicates: &[Predicate]) -> Vec<String> {
    let mut cols = Vec::new();
    for p in predicates {
        let mut own = p.columns().into_iter().collect::<Vec<_>>();
        own.sort();
        cols.extend(own);
    }
    cols
}
