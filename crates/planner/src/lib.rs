pub mod aggregation;
pub mod explain;
pub mod fast_fields;
pub mod predicate;
pub mod pushdown;
pub mod scan_plan;
pub mod skipping;
pub mod typed;

pub use aggregation::*;
pub use explain::*;
pub use fast_fields::*;
pub use predicate::*;
pub use pushdown::{PushdownSplit, classify, partition};
pub use scan_plan::*;
pub use skipping::*;
