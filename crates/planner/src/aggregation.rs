//! Aggregation pushdown validation.
//!
//! An aggregation is pushed into the index engine only when every column it
//! reads (outside partition columns) is a fast field. Anything else is a hard
//! configuration error: computing per-split partials over non-fast columns and
//! merging them would silently produce wrong `Sum`/`Avg` results. The same
//! holds for filters: a pushed aggregation cannot be re-filtered, so every data
//! predicate must be one the engine evaluates exactly.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use ssp_common::{Result, SspError};
use ssp_storage::Split;

use crate::fast_fields::FastFieldSet;
use crate::predicate::Predicate;
use crate::pushdown::classify;

/// Aggregate function requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    /// `COUNT(<constant>)`.
    Count,
    /// `COUNT(*)`.
    CountStar,
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
}

impl AggregateFunction {
    /// Maps a function name to the supported set.
    ///
    /// # Errors
    /// [`SspError::Unsupported`] for unknown functions, [`SspError::Planning`]
    /// for a missing or blank column argument.
    pub fn parse(name: &str, column: Option<&str>) -> Result<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        let column_arg = || -> Result<String> {
            match column.map(str::trim) {
                Some(c) if !c.is_empty() => Ok(c.to_string()),
                _ => Err(SspError::Planning(format!(
                    "aggregate function '{lowered}' requires a column argument"
                ))),
            }
        };
        match lowered.as_str() {
            "count(*)" | "count_star" => Ok(Self::CountStar),
            "count" => match column.map(str::trim) {
                Some("*") => Ok(Self::CountStar),
                _ => Ok(Self::Count),
            },
            "sum" => Ok(Self::Sum(column_arg()?)),
            "avg" | "mean" => Ok(Self::Avg(column_arg()?)),
            "min" => Ok(Self::Min(column_arg()?)),
            "max" => Ok(Self::Max(column_arg()?)),
            other => Err(SspError::Unsupported(format!(
                "aggregate function '{other}' cannot be pushed down; supported: count, count(*), sum, avg, min, max"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::CountStar => "count(*)",
            Self::Sum(_) => "sum",
            Self::Avg(_) => "avg",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
        }
    }

    /// Aggregated column, if the function reads one.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Count | Self::CountStar => None,
            Self::Sum(c) | Self::Avg(c) | Self::Min(c) | Self::Max(c) => Some(c),
        }
    }

    fn is_row_count(&self) -> bool {
        matches!(self, Self::Count | Self::CountStar)
    }
}

/// Aggregation requested for a scan, with optional ordered group-by columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub function: AggregateFunction,
    #[serde(default)]
    pub group_by: Vec<String>,
}

impl AggregationRequest {
    pub fn new(function: AggregateFunction) -> Self {
        Self {
            function,
            group_by: Vec::new(),
        }
    }

    #[must_use]
    pub fn grouped_by<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Per-split aggregate the index engine computes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartialAggregate {
    /// Row count (`None`) or non-null value count of a column.
    Count(Option<String>),
    Sum(String),
    Min(String),
    Max(String),
}

/// Approved aggregation strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationPlan {
    /// Answered from split document counts; no split is scanned.
    LogCount { group_by: Vec<String> },
    /// Partials computed per split by the index engine.
    Pushed {
        function: AggregateFunction,
        partials: Vec<PartialAggregate>,
        group_by: Vec<String>,
        /// `false` when the caller must finish the result (e.g. `Avg = Sum / Count`).
        complete: bool,
    },
}

impl AggregationPlan {
    pub fn is_complete(&self) -> bool {
        match self {
            Self::LogCount { .. } => true,
            Self::Pushed { complete, .. } => *complete,
        }
    }

    pub fn requires_scan(&self) -> bool {
        matches!(self, Self::Pushed { .. })
    }

    pub fn group_by(&self) -> &[String] {
        match self {
            Self::LogCount { group_by } | Self::Pushed { group_by, .. } => group_by,
        }
    }

    /// Metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LogCount { .. } => "log_count",
            Self::Pushed { complete: true, .. } => "complete",
            Self::Pushed { complete: false, .. } => "partial",
        }
    }
}

/// Validates `request` against the fast-field set and returns the approved plan.
///
/// # Errors
/// - [`SspError::InvalidConfig`] when a required column is not a fast field, or a
///   group-by/aggregated column is missing from the schema
/// - [`SspError::Unsupported`] for non-numeric `sum`/`avg`/`min`/`max` columns,
///   aggregation over a partition column, group-by on a non random-access type,
///   or a data predicate the engine cannot evaluate exactly (ranges over fast
///   fields are evaluated exactly through fast-field access)
pub fn validate(
    request: &AggregationRequest,
    predicates: &[Predicate],
    fast_fields: &FastFieldSet,
    partition_columns: &HashSet<String>,
) -> Result<AggregationPlan> {
    let function = &request.function;
    let partition_only_predicates = predicates
        .iter()
        .all(|p| p.references_only(partition_columns));
    let partition_only_grouping = request
        .group_by
        .iter()
        .all(|c| partition_columns.contains(c));

    if function.is_row_count() && partition_only_predicates && partition_only_grouping {
        return Ok(AggregationPlan::LogCount {
            group_by: request.group_by.clone(),
        });
    }

    if let Some(column) = function.column() {
        validate_aggregated_column(function, column, fast_fields, partition_columns)?;
    }
    for column in &request.group_by {
        if !partition_columns.contains(column) {
            validate_group_by_column(column, fast_fields)?;
        }
    }

    let mut required = BTreeSet::new();
    if let Some(column) = function.column() {
        required.insert(column.to_string());
    }
    for p in predicates {
        if p.references_only(partition_columns) {
            continue;
        }
        required.extend(
            p.columns()
                .into_iter()
                .filter(|c| !partition_columns.contains(c)),
        );
    }
    let missing = required
        .iter()
        .filter(|c| !fast_fields.contains(c))
        .map(String::as_str)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(SspError::InvalidConfig(format!(
            "aggregation pushdown requires fast fields for columns [{}]; configured fast fields: [{}]",
            missing.join(", "),
            fast_fields.names().join(", ")
        )));
    }

    let inexact = predicates
        .iter()
        .filter(|p| !p.references_only(partition_columns))
        .filter(|p| !evaluated_exactly(p, fast_fields))
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    if !inexact.is_empty() {
        return Err(SspError::Unsupported(format!(
            "aggregation pushdown requires filters the index engine evaluates exactly; \
             not exact: [{}]",
            inexact.join(", ")
        )));
    }

    let partials = match function {
        AggregateFunction::Count | AggregateFunction::CountStar => {
            vec![PartialAggregate::Count(None)]
        }
        AggregateFunction::Sum(c) => vec![PartialAggregate::Sum(c.clone())],
        AggregateFunction::Avg(c) => vec![
            PartialAggregate::Sum(c.clone()),
            PartialAggregate::Count(Some(c.clone())),
        ],
        AggregateFunction::Min(c) => vec![PartialAggregate::Min(c.clone())],
        AggregateFunction::Max(c) => vec![PartialAggregate::Max(c.clone())],
    };
    Ok(AggregationPlan::Pushed {
        function: function.clone(),
        partials,
        group_by: request.group_by.clone(),
        complete: !matches!(function, AggregateFunction::Avg(_)),
    })
}

/// Whether the engine filters rows for `predicate` exactly while aggregating.
fn evaluated_exactly(predicate: &Predicate, fast_fields: &FastFieldSet) -> bool {
    match predicate {
        Predicate::GreaterThan { column, .. }
        | Predicate::GreaterOrEqual { column, .. }
        | Predicate::LessThan { column, .. }
        | Predicate::LessOrEqual { column, .. } => fast_fields.contains(column),
        Predicate::And(a, b) | Predicate::Or(a, b) => {
            evaluated_exactly(a, fast_fields) && evaluated_exactly(b, fast_fields)
        }
        Predicate::Not(x) => evaluated_exactly(x, fast_fields),
        leaf => classify(leaf, &|c: &str| fast_fields.capability(c)),
    }
}

fn validate_aggregated_column(
    function: &AggregateFunction,
    column: &str,
    fast_fields: &FastFieldSet,
    partition_columns: &HashSet<String>,
) -> Result<()> {
    if partition_columns.contains(column) {
        return Err(SspError::Unsupported(format!(
            "{} over partition column '{column}' cannot be pushed down",
            function.name()
        )));
    }
    let Some(schema) = fast_fields.schema() else {
        // configuration fallback carries no types; the fast-field check still applies
        return Ok(());
    };
    match schema.get(column) {
        None => Err(SspError::InvalidConfig(format!(
            "aggregation column '{column}' is missing from schema"
        ))),
        Some(cap) if !cap.field_type.is_numeric() => Err(SspError::Unsupported(format!(
            "{} requires a numeric column; '{column}' is declared {}",
            function.name(),
            cap.field_type
        ))),
        Some(_) => Ok(()),
    }
}

fn validate_group_by_column(column: &str, fast_fields: &FastFieldSet) -> Result<()> {
    match fast_fields.schema() {
        Some(schema) => match schema.get(column) {
            None => Err(SspError::InvalidConfig(format!(
                "group-by column '{column}' is missing from schema"
            ))),
            Some(cap) if !cap.field_type.supports_grouping() => {
                Err(SspError::Unsupported(format!(
                    "group-by column '{column}' has unsupported type {}; supported: string, integer, long, float, double, date",
                    cap.field_type
                )))
            }
            Some(cap) if !cap.fast => Err(SspError::InvalidConfig(format!(
                "group-by column '{column}' is present but not a fast field; configured fast fields: [{}]",
                fast_fields.names().join(", ")
            ))),
            Some(_) => Ok(()),
        },
        None if fast_fields.contains(column) => Ok(()),
        None => Err(SspError::InvalidConfig(format!(
            "group-by column '{column}' is not a fast field; configured fast fields: [{}]",
            fast_fields.names().join(", ")
        ))),
    }
}

/// One group of a log-only count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountGroup {
    /// Partition values in group-by order; empty when ungrouped.
    pub key: Vec<Option<String>>,
    pub count: u64,
}

/// Sums split document counts, grouped by partition values when `group_by` is non-empty.
///
/// Groups are ordered by key. An ungrouped count over zero splits yields a
/// single zero row.
pub fn log_count(splits: &[&Split], group_by: &[String]) -> Vec<CountGroup> {
    if group_by.is_empty() {
        return vec![CountGroup {
            key: Vec::new(),
            count: splits.iter().map(|s| s.num_docs).sum(),
        }];
    }
    let mut groups: BTreeMap<Vec<Option<String>>, u64> = BTreeMap::new();
    for split in splits {
        let key = group_by
            .iter()
            .map(|c| split.partition_value(c).flatten().map(str::to_string))
            .collect::<Vec<_>>();
        *groups.entry(key).or_default() += split.num_docs;
    }
    groups
        .into_iter()
        .map(|(key, count)| CountGroup { key, count })
        .collect()
}
