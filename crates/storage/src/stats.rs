use serde::{Deserialize, Serialize};

use crate::split::Split;

/// Table-level totals derived from split records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub splits: u64,
    pub docs: u64,
    /// Known only when every split reports its size.
    pub bytes: Option<u64>,
}

impl TableStats {
    pub fn from_splits(splits: &[Split]) -> Self {
        let bytes = splits
            .iter()
            .map(|s| s.size_bytes)
            .sum::<Option<u64>>();
        Self {
            splits: splits.len() as u64,
            docs: splits.iter().map(|s| s.num_docs).sum(),
            bytes,
        }
    }
}
