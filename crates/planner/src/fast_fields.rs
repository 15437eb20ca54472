use std::collections::BTreeSet;

use ssp_storage::{FieldCapabilities, FieldCapability, TableSnapshot};

/// Where a [`FastFieldSet`] was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastFieldSource {
    /// Capability descriptor of the most recently written split.
    LatestSplit,
    /// Configured `fast_fields` list; used before any split carries a descriptor.
    ConfigFallback,
}

/// Columns declared as random-access fast fields for one planning call.
///
/// When derived from a split, the full capability descriptor is kept as the
/// schema so callers can tell "missing from schema" apart from "not fast".
#[derive(Debug, Clone)]
pub struct FastFieldSet {
    fields: BTreeSet<String>,
    schema: Option<FieldCapabilities>,
    source: FastFieldSource,
}

impl FastFieldSet {
    /// Derives the set from the table's latest split, falling back to `configured`.
    pub fn derive(table: &TableSnapshot, configured: &[String]) -> Self {
        match table.latest_capabilities() {
            Some(caps) if !caps.is_empty() => Self::from_capabilities(caps),
            _ => Self::from_config(configured),
        }
    }

    pub fn from_capabilities(caps: &FieldCapabilities) -> Self {
        Self {
            fields: caps
                .iter()
                .filter(|(_, c)| c.fast)
                .map(|(name, _)| name.clone())
                .collect(),
            schema: Some(caps.clone()),
            source: FastFieldSource::LatestSplit,
        }
    }

    pub fn from_config(configured: &[String]) -> Self {
        Self {
            fields: configured.iter().cloned().collect(),
            schema: None,
            source: FastFieldSource::ConfigFallback,
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains(column)
    }

    /// Sorted fast-field names.
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(String::as_str).collect()
    }

    pub fn source(&self) -> FastFieldSource {
        self.source
    }

    /// Declared schema; `None` under configuration fallback.
    pub fn schema(&self) -> Option<&FieldCapabilities> {
        self.schema.as_ref()
    }

    pub fn capability(&self, column: &str) -> Option<FieldCapability> {
        self.schema.as_ref().and_then(|s| s.get(column).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssp_storage::{FieldType, Split};

    #[test]
    fn derives_from_latest_split_descriptor() {
        let table = TableSnapshot::new(
            "t",
            vec![],
            vec![
                Split::new("old", 1).with_field("a", FieldCapability::new(FieldType::Long).fast()),
                Split::new("new", 1)
                    .with_field("b", FieldCapability::new(FieldType::Long).fast())
                    .with_field("c", FieldCapability::new(FieldType::String)),
            ],
        );
        let set = FastFieldSet::derive(&table, &["a".to_string()]);
        assert_eq!(set.source(), FastFieldSource::LatestSplit);
        assert_eq!(set.names(), vec!["b"]);
        assert!(set.capability("c").is_some());
        assert!(set.capability("a").is_none());
    }

    #[test]
    fn empty_table_uses_configured_fallback() {
        let table = TableSnapshot::new("t", vec![], vec![]);
        let set = FastFieldSet::derive(&table, &["price".to_string(), "qty".to_string()]);
        assert_eq!(set.source(), FastFieldSource::ConfigFallback);
        assert!(set.contains("qty"));
        assert!(set.schema().is_none());
    }
}
