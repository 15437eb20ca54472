pub mod bloom;
pub mod split;
pub mod stats;
pub mod table_log;

pub use bloom::{TermBloomFilter, tokenize};
pub use split::*;
pub use stats::TableStats;
pub use table_log::*;
