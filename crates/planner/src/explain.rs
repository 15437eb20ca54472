use crate::aggregation::{AggregationPlan, CountGroup, PartialAggregate};
use crate::predicate::Predicate;
use crate::scan_plan::{ScanPlan, ScanTask};

/// Render a scan plan as human-readable multiline text.
pub fn explain_scan_plan(plan: &ScanPlan) -> String {
    let mut s = String::new();
    fmt_plan(plan, 0, &mut s);
    s
}

fn fmt_plan(plan: &ScanPlan, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    let st = &plan.stats;
    out.push_str(&format!(
        "{pad}SplitScan table={} tasks={}\n",
        plan.table,
        plan.tasks.len()
    ));
    out.push_str(&format!(
        "{pad}  splits considered={} pruned_by_partition={} skipped_by_stats={} retained={}\n",
        st.considered, st.pruned_by_partition, st.skipped_by_stats, st.retained
    ));
    fmt_predicates("partition_filters", &plan.partition_filters, &pad, out);
    fmt_predicates("pushed_filters", &plan.pushed_predicates, &pad, out);
    fmt_predicates("residual_filters", &plan.residual_predicates, &pad, out);
    if let Some(agg) = &plan.aggregation {
        fmt_aggregation(agg, plan.log_count.as_deref(), indent + 1, out);
    }
    match plan.limit {
        Some(n) => out.push_str(&format!(
            "{pad}  limit={n} pushed={}\n",
            plan.limit_pushed()
        )),
        None => out.push_str(&format!("{pad}  limit=none\n")),
    }
    for t in &plan.tasks {
        fmt_task(t, indent + 1, out);
    }
}

fn fmt_predicates(label: &str, preds: &[Predicate], pad: &str, out: &mut String) {
    out.push_str(&format!("{pad}  {label}={}\n", preds.len()));
    for p in preds {
        out.push_str(&format!("{pad}    {p}\n"));
    }
}

fn fmt_aggregation(
    agg: &AggregationPlan,
    counts: Option<&[CountGroup]>,
    indent: usize,
    out: &mut String,
) {
    let pad = "  ".repeat(indent);
    match agg {
        AggregationPlan::LogCount { group_by } => {
            out.push_str(&format!(
                "{pad}Aggregate mode=log_count group_by={group_by:?}\n"
            ));
            for g in counts.unwrap_or_default() {
                let key = g
                    .key
                    .iter()
                    .map(|v| v.as_deref().unwrap_or("NULL"))
                    .collect::<Vec<_>>()
                    .join(", ");
                out.push_str(&format!("{pad}  [{key}] count={}\n", g.count));
            }
        }
        AggregationPlan::Pushed {
            function,
            partials,
            group_by,
            complete,
        } => {
            out.push_str(&format!(
                "{pad}Aggregate mode=pushed function={} complete={complete} group_by={group_by:?}\n",
                function.name()
            ));
            out.push_str(&format!(
                "{pad}  partials={}\n",
                partials.iter().map(fmt_partial).collect::<Vec<_>>().join(", ")
            ));
        }
    }
}

fn fmt_partial(p: &PartialAggregate) -> String {
    match p {
        PartialAggregate::Count(None) => "count(*)".to_string(),
        PartialAggregate::Count(Some(c)) => format!("count({c})"),
        PartialAggregate::Sum(c) => format!("sum({c})"),
        PartialAggregate::Min(c) => format!("min({c})"),
        PartialAggregate::Max(c) => format!("max({c})"),
    }
}

fn fmt_task(t: &ScanTask, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    out.push_str(&format!("{pad}Task split={}\n", t.split));
    if !t.partition_values.is_empty() {
        let parts = t
            .partition_values
            .iter()
            .map(|(k, v)| format!("{k}={}", v.as_deref().unwrap_or("NULL")))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("{pad}  partition {parts}\n"));
    }
    out.push_str(&format!("{pad}  columns={:?}\n", t.required_columns));
    if !t.preferred_hosts.is_empty() {
        let hosts = t
            .preferred_hosts
            .iter()
            .map(|h| h.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("{pad}  preferred_hosts=[{hosts}]\n"));
    }
}
