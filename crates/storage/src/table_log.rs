//! Read-only view over the durable table log: ordered splits plus partition columns.

use std::collections::HashSet;
use std::fs;

use serde::{Deserialize, Serialize};
use ssp_common::{Result, SspError};
use tracing::debug;

use crate::split::{FieldCapabilities, Split};
use crate::stats::TableStats;

/// Snapshot of a table as listed by the log at planning time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    #[serde(default)]
    pub partition_columns: Vec<String>,
    /// Append order; the last split is the most recently written.
    #[serde(default)]
    pub splits: Vec<Split>,
}

impl TableSnapshot {
    pub fn new(name: impl Into<String>, partition_columns: Vec<String>, splits: Vec<Split>) -> Self {
        Self {
            name: name.into(),
            partition_columns,
            splits,
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(s).map_err(|e| SspError::InvalidConfig(e.to_string()))?;
        for split in &snapshot.splits {
            for column in split.min_values.keys().chain(split.max_values.keys()) {
                if split.column_bounds(column).is_none() {
                    debug!(
                        table = %snapshot.name,
                        split = %split.id,
                        column = %column,
                        operator = "TableLogLoad",
                        "one-sided column statistics ignored"
                    );
                }
            }
        }
        Ok(snapshot)
    }

    pub fn load_from_json(path: &str) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }

    pub fn partition_column_set(&self) -> HashSet<String> {
        self.partition_columns.iter().cloned().collect()
    }

    pub fn latest_split(&self) -> Option<&Split> {
        self.splits.last()
    }

    /// Capability descriptor of the most recently written split, if any.
    pub fn latest_capabilities(&self) -> Option<&FieldCapabilities> {
        self.latest_split().map(|s| &s.fields)
    }

    pub fn stats(&self) -> TableStats {
        TableStats::from_splits(&self.splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::FieldType;
    use std::io::Write;

    const LOG: &str = r#"{
        "name": "events",
        "partition_columns": ["day"],
        "splits": [
            {
                "path": "s3://bucket/events/a.split",
                "num_docs": 100,
                "size_bytes": 4096,
                "min_values": {"score": "0"},
                "max_values": {"score": "9"},
                "partition_values": {"day": "2024-01-01"},
                "fields": {"score": {"fast": true, "type": "long"}}
            },
            {
                "path": "s3://bucket/events/b.split",
                "num_docs": 50,
                "partition_values": {"day": null},
                "fields": {"score": {"fast": true, "type": "long"}, "title": {"type": "string", "tokenized": true}}
            }
        ]
    }"#;

    #[test]
    fn loads_snapshot_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(LOG.as_bytes()).expect("write");
        let path = file.path().to_str().expect("utf8 path").to_string();

        let snapshot = TableSnapshot::load_from_json(&path).expect("load");
        assert_eq!(snapshot.name, "events");
        assert_eq!(snapshot.splits.len(), 2);
        assert_eq!(snapshot.splits[1].partition_value("day"), Some(None));
        let latest = snapshot.latest_capabilities().expect("caps");
        assert_eq!(latest["title"].field_type, FieldType::String);
        assert!(latest["title"].tokenized);

        let stats = snapshot.stats();
        assert_eq!(stats.splits, 2);
        assert_eq!(stats.docs, 150);
        assert_eq!(stats.bytes, None);
    }

    #[test]
    fn malformed_log_is_a_configuration_error() {
        let err = TableSnapshot::from_json_str("{\"name\": 3}").expect_err("bad log");
        assert!(matches!(err, SspError::InvalidConfig(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = TableSnapshot::load_from_json("/definitely/not/here.json").expect_err("io");
        assert!(matches!(err, SspError::Io(_)));
    }
}
