//! Pushdown classification: which predicates the index engine evaluates exactly.
//!
//! The policy is fixed. A predicate is pushed only when the engine's answer is
//! known to be exact for its shape; everything else stays residual and must be
//! re-checked by the caller after rows are materialized.

use serde::{Deserialize, Serialize};
use ssp_storage::FieldCapability;

use crate::predicate::Predicate;

/// Predicates split by pushdown disposition, each list in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushdownSplit {
    /// Evaluated by the index engine; never re-checked by the caller.
    pub pushed: Vec<Predicate>,
    /// Must be re-evaluated by the caller.
    pub residual: Vec<Predicate>,
}

/// Returns `true` when `predicate` can be pushed to the index engine.
///
/// `capability` resolves a column name to its declared capability; unknown
/// columns resolve to `None`.
pub fn classify<F>(predicate: &Predicate, capability: &F) -> bool
where
    F: Fn(&str) -> Option<FieldCapability>,
{
    match predicate {
        Predicate::Equals { column, .. } | Predicate::EqualsNullSafe { column, .. } => {
            capability(column).is_some_and(|c| c.exact_match())
        }
        // Range evaluation would need fast-field materialization inside the
        // engine; the caller re-checks ranges.
        Predicate::GreaterThan { .. }
        | Predicate::GreaterOrEqual { .. }
        | Predicate::LessThan { .. }
        | Predicate::LessOrEqual { .. } => false,
        Predicate::In { .. }
        | Predicate::IsNull { .. }
        | Predicate::IsNotNull { .. }
        | Predicate::Contains { .. } => true,
        // best-effort matching in the engine
        Predicate::StartsWith { .. } | Predicate::EndsWith { .. } => false,
        Predicate::NotEquals { .. } => false,
        Predicate::And(a, b) | Predicate::Or(a, b) => {
            classify(a, capability) && classify(b, capability)
        }
        Predicate::Not(x) => classify(x, capability),
    }
}

/// Partitions `predicates` into pushed and residual lists.
pub fn partition<F>(predicates: &[Predicate], capability: &F) -> PushdownSplit
where
    F: Fn(&str) -> Option<FieldCapability>,
{
    let (pushed, residual): (Vec<Predicate>, Vec<Predicate>) = predicates
        .iter()
        .cloned()
        .partition(|p| classify(p, capability));
    PushdownSplit { pushed, residual }
}
