//! Split reduction: exact partition pruning followed by min/max statistics skipping.
//!
//! Soundness contract: a split is only removed when its metadata proves that no
//! row in it can satisfy the predicate. Missing statistics, unknown partition
//! columns and failed type conversions all keep the split.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use ssp_common::global_metrics;
use ssp_storage::{FieldType, Split, tokenize};
use tracing::{debug, warn};

use crate::predicate::{LiteralValue, Predicate};
use crate::typed::{TypedValue, infer_type, type_literal, type_stat};

/// Knobs for statistics skipping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkippingOptions {
    /// Compare raw strings when typed conversion fails instead of keeping the split.
    pub string_fallback: bool,
}

/// Split counts observed while reducing one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruningStats {
    pub considered: usize,
    pub pruned_by_partition: usize,
    pub skipped_by_stats: usize,
    pub retained: usize,
}

/// Retained splits (in log order) plus counters.
#[derive(Debug, Clone)]
pub struct SplitReduction<'a> {
    pub retained: Vec<&'a Split>,
    pub stats: PruningStats,
}

/// SQL three-valued truth of a predicate over one split's partition values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Null,
}

impl Truth {
    fn from_bool(b: bool) -> Self {
        if b { Self::True } else { Self::False }
    }

    /// A filter keeps rows only when the predicate is `True`.
    fn rejects(self) -> bool {
        !matches!(self, Self::True)
    }
}

/// Reduces `splits` to those that may contain matching rows, using default options.
pub fn reduce<'a>(
    splits: &'a [Split],
    predicates: &[Predicate],
    partition_columns: &HashSet<String>,
) -> Vec<&'a Split> {
    reduce_with_options(splits, predicates, partition_columns, SkippingOptions::default()).retained
}

/// Reduces `splits` and reports how many were removed by each stage.
///
/// Predicates that reference only partition columns are resolved exactly by
/// partition pruning and are not re-applied to statistics.
pub fn reduce_with_options<'a>(
    splits: &'a [Split],
    predicates: &[Predicate],
    partition_columns: &HashSet<String>,
    options: SkippingOptions,
) -> SplitReduction<'a> {
    let mut stats = PruningStats {
        considered: splits.len(),
        ..PruningStats::default()
    };
    if predicates.is_empty() {
        stats.retained = splits.len();
        return SplitReduction {
            retained: splits.iter().collect(),
            stats,
        };
    }

    let (partition_preds, data_preds): (Vec<&Predicate>, Vec<&Predicate>) = predicates
        .iter()
        .partition(|p| p.references_only(partition_columns));

    let mut retained = Vec::with_capacity(splits.len());
    for split in splits {
        if let Some(p) = partition_preds
            .iter()
            .find(|p| partition_excludes(p, split))
        {
            debug!(
                split = %split.id,
                predicate = %p,
                operator = "PartitionPruning",
                "split pruned by partition values"
            );
            stats.pruned_by_partition += 1;
            continue;
        }
        if let Some(p) = data_preds
            .iter()
            .find(|p| stats_exclude(p, split, partition_columns, options))
        {
            debug!(
                split = %split.id,
                predicate = %p,
                operator = "StatisticsSkipping",
                "split skipped by statistics"
            );
            stats.skipped_by_stats += 1;
            continue;
        }
        retained.push(split);
    }
    stats.retained = retained.len();
    SplitReduction { retained, stats }
}

/// True when the split's partition values prove `pred` never holds.
pub fn partition_excludes(pred: &Predicate, split: &Split) -> bool {
    eval_partition_predicate(pred, split).is_some_and(Truth::rejects)
}

/// Evaluates `pred` against the split's partition values.
///
/// Returns `None` when some referenced column is not carried by the split.
pub fn eval_partition_predicate(pred: &Predicate, split: &Split) -> Option<Truth> {
    match pred {
        Predicate::And(a, b) => {
            let (l, r) = (
                eval_partition_predicate(a, split),
                eval_partition_predicate(b, split),
            );
            match (l, r) {
                (Some(Truth::False), _) | (_, Some(Truth::False)) => Some(Truth::False),
                (Some(Truth::True), Some(Truth::True)) => Some(Truth::True),
                (Some(_), Some(_)) => Some(Truth::Null),
                _ => None,
            }
        }
        Predicate::Or(a, b) => {
            let (l, r) = (
                eval_partition_predicate(a, split),
                eval_partition_predicate(b, split),
            );
            match (l, r) {
                (Some(Truth::True), _) | (_, Some(Truth::True)) => Some(Truth::True),
                (Some(Truth::False), Some(Truth::False)) => Some(Truth::False),
                (Some(_), Some(_)) => Some(Truth::Null),
                _ => None,
            }
        }
        Predicate::Not(x) => eval_partition_predicate(x, split).map(|t| match t {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Null => Truth::Null,
        }),
        leaf => eval_partition_leaf(leaf, split),
    }
}

fn eval_partition_leaf(leaf: &Predicate, split: &Split) -> Option<Truth> {
    let column = leaf.leaf_column()?;
    let value = split.partition_value(column)?;
    let declared = split.declared_type(column);

    let compare = |lit: &LiteralValue| -> Option<Ordering> {
        value.map(|raw| compare_partition_value(raw, lit, declared))
    };
    let ordered = |lit: &LiteralValue, accept: fn(Ordering) -> bool| -> Truth {
        compare(lit).map_or(Truth::Null, |o| Truth::from_bool(accept(o)))
    };

    let truth = match leaf {
        Predicate::Equals { value: lit, .. } => ordered(lit, Ordering::is_eq),
        Predicate::EqualsNullSafe { value: lit, .. } => {
            Truth::from_bool(compare(lit) == Some(Ordering::Equal))
        }
        Predicate::NotEquals { value: lit, .. } => ordered(lit, Ordering::is_ne),
        Predicate::GreaterThan { value: lit, .. } => ordered(lit, Ordering::is_gt),
        Predicate::GreaterOrEqual { value: lit, .. } => ordered(lit, Ordering::is_ge),
        Predicate::LessThan { value: lit, .. } => ordered(lit, Ordering::is_lt),
        Predicate::LessOrEqual { value: lit, .. } => ordered(lit, Ordering::is_le),
        Predicate::In { values, .. } => match value {
            None => Truth::Null,
            Some(_) => Truth::from_bool(values.iter().any(|v| compare(v) == Some(Ordering::Equal))),
        },
        Predicate::IsNull { .. } => Truth::from_bool(value.is_none()),
        Predicate::IsNotNull { .. } => Truth::from_bool(value.is_some()),
        Predicate::StartsWith { value: s, .. } => {
            value.map_or(Truth::Null, |raw| Truth::from_bool(raw.starts_with(s.as_str())))
        }
        Predicate::EndsWith { value: s, .. } => {
            value.map_or(Truth::Null, |raw| Truth::from_bool(raw.ends_with(s.as_str())))
        }
        Predicate::Contains { value: s, .. } => {
            value.map_or(Truth::Null, |raw| Truth::from_bool(raw.contains(s.as_str())))
        }
        Predicate::And(..) | Predicate::Or(..) | Predicate::Not(_) => return None,
    };
    Some(truth)
}

/// Orders a materialized partition value against a literal.
///
/// Partition values are exact, so a failed typed conversion degrades to a raw
/// string comparison rather than leaving the predicate undecided.
fn compare_partition_value(raw: &str, lit: &LiteralValue, declared: Option<FieldType>) -> Ordering {
    let target = declared.unwrap_or_else(|| infer_type(lit));
    if let (Ok(a), Ok(b)) = (type_stat(raw, target), type_literal(lit, target)) {
        if let Some(o) = a.compare(&b) {
            return o;
        }
    }
    raw.cmp(lit.to_string().as_str())
}

/// True when min/max statistics (or exact partition values for partition-only
/// sub-trees) prove no row of the split satisfies `pred`.
pub fn stats_exclude(
    pred: &Predicate,
    split: &Split,
    partition_columns: &HashSet<String>,
    options: SkippingOptions,
) -> bool {
    if pred.references_only(partition_columns) {
        return partition_excludes(pred, split);
    }
    match pred {
        Predicate::And(a, b) => {
            stats_exclude(a, split, partition_columns, options)
                || stats_exclude(b, split, partition_columns, options)
        }
        Predicate::Or(a, b) => {
            stats_exclude(a, split, partition_columns, options)
                && stats_exclude(b, split, partition_columns, options)
        }
        Predicate::Not(_) => false,
        leaf => {
            leaf_excluded_by_bounds(leaf, split, options) || leaf_excluded_by_terms(leaf, split)
        }
    }
}

/// True when the column's term filter proves a searched term is absent.
///
/// Tokenized columns are checked against the tokens of `Equals`/`Contains` text;
/// raw string columns against whole `Equals`/`In` values. A split without a filter
/// for the column is kept.
fn leaf_excluded_by_terms(leaf: &Predicate, split: &Split) -> bool {
    let Some(column) = leaf.leaf_column() else {
        return false;
    };
    let Some(filter) = split.term_filter(column) else {
        return false;
    };
    let capability = split.field(column);
    if capability.is_some_and(|c| c.field_type != FieldType::String) {
        return false;
    }
    let tokenized = capability.is_some_and(|c| c.tokenized);
    let absent = |lit: &LiteralValue| match lit {
        LiteralValue::Utf8(text) if tokenized => {
            tokenize(text).iter().any(|t| !filter.may_contain(t))
        }
        LiteralValue::Utf8(text) => !filter.may_contain(text),
        _ => false,
    };

    match leaf {
        Predicate::Equals { value, .. } | Predicate::EqualsNullSafe { value, .. } => absent(value),
        Predicate::In { values, .. } if !tokenized => {
            !values.is_empty() && values.iter().all(|v| absent(v))
        }
        Predicate::Contains { value, .. } if tokenized => {
            tokenize(value).iter().any(|t| !filter.may_contain(t))
        }
        _ => false,
    }
}

fn leaf_excluded_by_bounds(leaf: &Predicate, split: &Split, options: SkippingOptions) -> bool {
    let Some(column) = leaf.leaf_column() else {
        return false;
    };
    let Some((min, max)) = split.column_bounds(column) else {
        return false;
    };
    let declared = split.declared_type(column);
    let bounds = StatBounds {
        split,
        column,
        min,
        max,
        declared,
        options,
    };

    match leaf {
        Predicate::Equals { value, .. } | Predicate::EqualsNullSafe { value, .. } => {
            bounds.proves(value, |lo, hi| lo.is_lt() || hi.is_gt())
        }
        Predicate::NotEquals { value, .. } => {
            bounds.proves(value, |lo, hi| lo.is_eq() && hi.is_eq())
        }
        // col > v is impossible when max <= v
        Predicate::GreaterThan { value, .. } => bounds.proves(value, |_, hi| hi.is_ge()),
        Predicate::GreaterOrEqual { value, .. } => bounds.proves(value, |_, hi| hi.is_gt()),
        // col < v is impossible when min >= v
        Predicate::LessThan { value, .. } => bounds.proves(value, |lo, _| lo.is_le()),
        Predicate::LessOrEqual { value, .. } => bounds.proves(value, |lo, _| lo.is_lt()),
        Predicate::In { values, .. } => values
            .iter()
            .all(|v| bounds.proves(v, |lo, hi| lo.is_lt() || hi.is_gt())),
        Predicate::StartsWith { value, .. } => {
            matches!(declared, None | Some(FieldType::String)) && prefix_outside(min, max, value)
        }
        Predicate::IsNull { .. }
        | Predicate::IsNotNull { .. }
        | Predicate::EndsWith { .. }
        | Predicate::Contains { .. }
        | Predicate::And(..)
        | Predicate::Or(..)
        | Predicate::Not(_) => false,
    }
}

struct StatBounds<'a> {
    split: &'a Split,
    column: &'a str,
    min: &'a str,
    max: &'a str,
    declared: Option<FieldType>,
    options: SkippingOptions,
}

impl StatBounds<'_> {
    /// Applies `test(literal vs min, literal vs max)`; any incomparable pair keeps the split.
    fn proves(&self, lit: &LiteralValue, test: impl Fn(Ordering, Ordering) -> bool) -> bool {
        let Some((min, max, lit)) = self.typed(lit) else {
            return false;
        };
        match (lit.compare(&min), lit.compare(&max)) {
            (Some(lo), Some(hi)) => test(lo, hi),
            _ => false,
        }
    }

    fn typed(&self, lit: &LiteralValue) -> Option<(TypedValue, TypedValue, TypedValue)> {
        let target = self.declared.unwrap_or_else(|| infer_type(lit));
        let converted = type_stat(self.min, target).and_then(|min| {
            let max = type_stat(self.max, target)?;
            let lit = type_literal(lit, target)?;
            Ok((min, max, lit))
        });
        match converted {
            Ok(v) => Some(v),
            Err(e) => {
                global_metrics().inc_stats_conversion_fallback(self.column);
                warn!(
                    split = %self.split.id,
                    column = %self.column,
                    error = %e,
                    string_fallback = self.options.string_fallback,
                    operator = "StatisticsSkipping",
                    "statistics type conversion failed"
                );
                self.options.string_fallback.then(|| {
                    (
                        TypedValue::Str(self.min.to_string()),
                        TypedValue::Str(self.max.to_string()),
                        TypedValue::Str(lit.to_string()),
                    )
                })
            }
        }
    }
}

/// No string in `[min, max]` can start with `prefix`.
fn prefix_outside(min: &str, max: &str, prefix: &str) -> bool {
    let (min, max, prefix) = (min.as_bytes(), max.as_bytes(), prefix.as_bytes());
    if max < prefix {
        return true;
    }
    let head = &min[..min.len().min(prefix.len())];
    head > prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssp_storage::{FieldCapability, TermBloomFilter};

    fn partitions(cols: &[&str]) -> HashSet<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    fn scored_splits() -> Vec<Split> {
        (0..10)
            .map(|i| {
                Split::new(format!("split-{i}"), 10)
                    .with_bounds("score", (i * 10).to_string(), (i * 10 + 9).to_string())
                    .with_field("score", FieldCapability::new(FieldType::Integer).fast())
            })
            .collect()
    }

    fn ids(splits: &[&Split]) -> Vec<String> {
        splits.iter().map(|s| s.id.to_string()).collect()
    }

    #[test]
    fn empty_predicates_keep_every_split() {
        let splits = scored_splits();
        let out = reduce(&splits, &[], &HashSet::new());
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn greater_than_keeps_only_ranges_above_literal() {
        let splits = scored_splits();
        let out = reduce_with_options(
            &splits,
            &[Predicate::gt("score", 85_i32)],
            &HashSet::new(),
            SkippingOptions::default(),
        );
        assert_eq!(ids(&out.retained), vec!["split-8", "split-9"]);
        assert_eq!(out.stats.skipped_by_stats, 8);
        assert_eq!(out.stats.pruned_by_partition, 0);
        assert_eq!(out.stats.retained, 2);
    }

    #[test]
    fn comparisons_use_numeric_not_lexicographic_order() {
        let splits = vec![
            Split::new("a", 1)
                .with_bounds("n", "9", "10")
                .with_field("n", FieldCapability::new(FieldType::Long)),
        ];
        // lexicographically "10" < "9"; numerically 9..=10 contains 10
        let out = reduce(&splits, &[Predicate::eq("n", 10_i64)], &HashSet::new());
        assert_eq!(out.len(), 1);
        let out = reduce(&splits, &[Predicate::gt_eq("n", 11_i64)], &HashSet::new());
        assert!(out.is_empty());
    }

    #[test]
    fn boundary_operators_are_exact() {
        let split = Split::new("s", 1)
            .with_bounds("n", "10", "20")
            .with_field("n", FieldCapability::new(FieldType::Integer));
        let none = HashSet::new();
        let opts = SkippingOptions::default();
        assert!(stats_exclude(&Predicate::gt("n", 20), &split, &none, opts));
        assert!(!stats_exclude(&Predicate::gt_eq("n", 20), &split, &none, opts));
        assert!(stats_exclude(&Predicate::lt("n", 10), &split, &none, opts));
        assert!(!stats_exclude(&Predicate::lt_eq("n", 10), &split, &none, opts));
        assert!(stats_exclude(&Predicate::eq("n", 21), &split, &none, opts));
        assert!(!stats_exclude(&Predicate::not_eq("n", 15), &split, &none, opts));
        assert!(stats_exclude(&Predicate::in_list("n", [1, 2, 30]), &split, &none, opts));
        assert!(!stats_exclude(&Predicate::in_list("n", [1, 15]), &split, &none, opts));
    }

    #[test]
    fn large_long_bounds_compare_exactly_against_float_literals() {
        let split = Split::new("s", 1)
            .with_bounds("n", "0", "9007199254740993")
            .with_field("n", FieldCapability::new(FieldType::Long));
        let none = HashSet::new();
        let opts = SkippingOptions::default();
        // 2^53 + 1 has no f64 representation; the max row still satisfies n > 2^53
        assert!(!stats_exclude(&Predicate::gt("n", 9007199254740992.0_f64), &split, &none, opts));
        assert!(stats_exclude(&Predicate::gt("n", 9007199254740994.0_f64), &split, &none, opts));
        assert!(stats_exclude(&Predicate::gt_eq("n", 1e19_f64), &split, &none, opts));
    }

    #[test]
    fn not_equals_skips_only_constant_columns() {
        let split = Split::new("s", 1)
            .with_bounds("status", "done", "done")
            .with_field("status", FieldCapability::new(FieldType::String));
        let opts = SkippingOptions::default();
        assert!(stats_exclude(
            &Predicate::not_eq("status", "done"),
            &split,
            &HashSet::new(),
            opts
        ));
        assert!(!stats_exclude(
            &Predicate::not_eq("status", "open"),
            &split,
            &HashSet::new(),
            opts
        ));
    }

    #[test]
    fn missing_statistics_and_null_checks_keep_splits() {
        let split = Split::new("s", 1).with_field("n", FieldCapability::new(FieldType::Integer));
        let opts = SkippingOptions::default();
        assert!(!stats_exclude(&Predicate::eq("n", 1), &split, &HashSet::new(), opts));
        let split = split.with_bounds("n", "1", "2");
        assert!(!stats_exclude(&Predicate::is_null("n"), &split, &HashSet::new(), opts));
        assert!(!stats_exclude(&Predicate::is_not_null("n"), &split, &HashSet::new(), opts));
        assert!(!stats_exclude(
            &Predicate::not(Predicate::eq("n", 1)),
            &split,
            &HashSet::new(),
            opts
        ));
    }

    #[test]
    fn conversion_failure_keeps_split_unless_string_fallback_enabled() {
        let split = Split::new("s", 1)
            .with_bounds("n", "abc", "abd")
            .with_field("n", FieldCapability::new(FieldType::Integer));
        let pred = Predicate::eq("n", "zzz");
        assert!(!stats_exclude(
            &pred,
            &split,
            &HashSet::new(),
            SkippingOptions::default()
        ));
        assert!(stats_exclude(
            &pred,
            &split,
            &HashSet::new(),
            SkippingOptions {
                string_fallback: true
            }
        ));
    }

    #[test]
    fn dates_compare_as_day_offsets() {
        let split = Split::new("s", 1)
            .with_bounds("d", "2024-01-01", "2024-01-31")
            .with_field("d", FieldCapability::new(FieldType::Date));
        let opts = SkippingOptions::default();
        let none = HashSet::new();
        assert!(stats_exclude(&Predicate::gt("d", "2024-02-01"), &split, &none, opts));
        assert!(stats_exclude(
            &Predicate::lt("d", LiteralValue::Date32(19_000)),
            &split,
            &none,
            opts
        ));
        assert!(!stats_exclude(&Predicate::eq("d", 19_730_i64), &split, &none, opts));
    }

    #[test]
    fn combinators_follow_conjunction_and_disjunction_rules() {
        let split = Split::new("s", 1)
            .with_bounds("n", "0", "9")
            .with_field("n", FieldCapability::new(FieldType::Integer));
        let opts = SkippingOptions::default();
        let none = HashSet::new();
        let impossible = Predicate::gt("n", 100);
        let possible = Predicate::lt("n", 5);
        assert!(stats_exclude(
            &Predicate::and(possible.clone(), impossible.clone()),
            &split,
            &none,
            opts
        ));
        assert!(!stats_exclude(
            &Predicate::or(possible, impossible.clone()),
            &split,
            &none,
            opts
        ));
        assert!(stats_exclude(
            &Predicate::or(impossible.clone(), Predicate::eq("n", 42)),
            &split,
            &none,
            opts
        ));
    }

    #[test]
    fn prefix_skipping_uses_string_bounds() {
        let split = Split::new("s", 1)
            .with_bounds("name", "bob", "dave")
            .with_field("name", FieldCapability::new(FieldType::String));
        let opts = SkippingOptions::default();
        let none = HashSet::new();
        assert!(stats_exclude(&Predicate::starts_with("name", "al"), &split, &none, opts));
        assert!(stats_exclude(&Predicate::starts_with("name", "e"), &split, &none, opts));
        assert!(!stats_exclude(&Predicate::starts_with("name", "b"), &split, &none, opts));
        assert!(!stats_exclude(&Predicate::starts_with("name", "da"), &split, &none, opts));
        assert!(!stats_exclude(&Predicate::ends_with("name", "zz"), &split, &none, opts));
    }

    #[test]
    fn partition_pruning_is_exact_and_null_aware() {
        let splits = vec![
            Split::new("jan", 1).with_partition_value("day", Some("2024-01-01")),
            Split::new("feb", 1).with_partition_value("day", Some("2024-02-01")),
            Split::new("null", 1).with_partition_value("day", None::<String>),
            Split::new("untagged", 1),
        ];
        let parts = partitions(&["day"]);

        let out = reduce_with_options(
            &splits,
            &[Predicate::eq("day", "2024-01-01")],
            &parts,
            SkippingOptions::default(),
        );
        assert_eq!(ids(&out.retained), vec!["jan", "untagged"]);
        assert_eq!(out.stats.pruned_by_partition, 2);

        let out = reduce(&splits, &[Predicate::is_null("day")], &parts);
        assert_eq!(ids(&out), vec!["null", "untagged"]);

        let out = reduce(
            &splits,
            &[Predicate::not(Predicate::eq("day", "2024-01-01"))],
            &parts,
        );
        assert_eq!(ids(&out), vec!["feb", "untagged"]);
    }

    #[test]
    fn typed_partition_values_compare_numerically() {
        let splits = (1..=12)
            .map(|m| {
                Split::new(format!("m{m}"), 1)
                    .with_partition_value("month", Some(m.to_string()))
                    .with_field("month", FieldCapability::new(FieldType::Integer))
            })
            .collect::<Vec<_>>();
        let out = reduce(&splits, &[Predicate::gt_eq("month", 10)], &partitions(&["month"]));
        assert_eq!(ids(&out), vec!["m10", "m11", "m12"]);
    }

    #[test]
    fn mixed_predicates_use_partition_values_inside_statistics_pass() {
        let splits = vec![
            Split::new("a", 1)
                .with_partition_value("day", Some("x"))
                .with_bounds("n", "0", "9"),
            Split::new("b", 1)
                .with_partition_value("day", Some("y"))
                .with_bounds("n", "0", "9"),
        ];
        let pred = Predicate::or(Predicate::eq("day", "x"), Predicate::gt("n", 50_i64));
        let out = reduce_with_options(&splits, &[pred], &partitions(&["day"]), SkippingOptions::default());
        assert_eq!(ids(&out.retained), vec!["a"]);
        assert_eq!(out.stats.skipped_by_stats, 1);
    }

    fn searchable_split(id: &str, body: &str, category: &str) -> Split {
        Split::new(id, 100)
            .with_field("body", FieldCapability::new(FieldType::String).tokenized())
            .with_field("category", FieldCapability::new(FieldType::String).fast())
            .with_term_filter("body", TermBloomFilter::from_terms(tokenize(body), 10))
            .with_term_filter("category", TermBloomFilter::from_terms([category], 10))
    }

    #[test]
    fn term_filters_skip_splits_missing_a_searched_term() {
        let splits = vec![
            searchable_split("ml", "Machine learning with Apache Spark", "Research"),
            searchable_split("k8s", "Kubernetes and containers at scale", "Infrastructure"),
        ];
        let none = HashSet::new();

        let out = reduce(&splits, &[Predicate::contains("body", "machine")], &none);
        assert_eq!(ids(&out), vec!["ml"]);

        // every term of a multi-term search must be present
        let out = reduce(&splits, &[Predicate::contains("body", "Apache Kubernetes")], &none);
        assert!(out.is_empty());

        let out = reduce(&splits, &[Predicate::contains("body", "quantum")], &none);
        assert!(out.is_empty());

        let out = reduce(
            &splits,
            &[Predicate::in_list("category", ["Research", "Security"])],
            &none,
        );
        assert_eq!(ids(&out), vec!["ml"]);
    }

    #[test]
    fn term_filters_combine_with_other_filters() {
        let splits = vec![
            searchable_split("a", "spark streaming", "Research").with_bounds("year", "2020", "2021"),
            searchable_split("b", "spark batch jobs", "Research").with_bounds("year", "2022", "2023"),
        ];
        let preds = [
            Predicate::contains("body", "spark"),
            Predicate::gt_eq("year", 2022_i64),
            Predicate::eq("category", "Research"),
        ];
        let out = reduce(&splits, &preds, &HashSet::new());
        assert_eq!(ids(&out), vec!["b"]);

        let out = reduce(
            &splits,
            &[Predicate::or(
                Predicate::contains("body", "streaming"),
                Predicate::contains("body", "nothing"),
            )],
            &HashSet::new(),
        );
        assert_eq!(ids(&out), vec!["a"]);
    }

    #[test]
    fn splits_without_term_filters_are_kept() {
        let splits = vec![
            Split::new("plain", 10)
                .with_field("body", FieldCapability::new(FieldType::String).tokenized()),
        ];
        let out = reduce(&splits, &[Predicate::contains("body", "quantum")], &HashSet::new());
        assert_eq!(out.len(), 1);

        // substring search on a raw column cannot be answered from whole values
        let raw = Split::new("raw", 10)
            .with_field("code", FieldCapability::new(FieldType::String))
            .with_term_filter("code", TermBloomFilter::from_terms(["abc-123"], 10));
        assert!(!stats_exclude(
            &Predicate::contains("code", "123"),
            &raw,
            &HashSet::new(),
            SkippingOptions::default()
        ));
    }
}
