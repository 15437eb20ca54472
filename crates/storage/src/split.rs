//! Immutable split records as published by the table log.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use ssp_common::SplitId;

use crate::bloom::TermBloomFilter;

/// Column type declared in a split's field-capability descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Long,
    Float,
    Double,
    /// Days since 1970-01-01.
    Date,
    String,
    Boolean,
    Timestamp,
    Binary,
}

impl FieldType {
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Long | Self::Float | Self::Double)
    }

    /// Types the index engine can group by through fast-field random access.
    #[must_use]
    pub fn supports_grouping(self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Long | Self::Float | Self::Double | Self::Date | Self::String
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Date => "date",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the index engine can do with one column of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCapability {
    /// Column is stored in the random-access fast-field store.
    #[serde(default)]
    pub fast: bool,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// String column indexed as tokenized free text rather than as a raw exact-match term.
    #[serde(default)]
    pub tokenized: bool,
}

impl FieldCapability {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            fast: false,
            field_type,
            tokenized: false,
        }
    }

    #[must_use]
    pub fn fast(mut self) -> Self {
        self.fast = true;
        self
    }

    #[must_use]
    pub fn tokenized(mut self) -> Self {
        self.tokenized = true;
        self
    }

    /// Equality on this column is evaluated exactly by the index engine.
    #[must_use]
    pub fn exact_match(&self) -> bool {
        !self.tokenized
    }
}

/// Column name -> capability.
pub type FieldCapabilities = HashMap<String, FieldCapability>;

/// One immutable indexed data unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    #[serde(rename = "path")]
    pub id: SplitId,
    #[serde(default)]
    pub partition_id: u64,
    pub num_docs: u64,
    /// Serialized split size, used by cache residency bookkeeping.
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub min_values: HashMap<String, String>,
    #[serde(default)]
    pub max_values: HashMap<String, String>,
    /// Partition column -> value; `None` is a null partition value.
    #[serde(default)]
    pub partition_values: HashMap<String, Option<String>>,
    #[serde(default)]
    pub fields: FieldCapabilities,
    /// Optional term filters for string columns.
    #[serde(default)]
    pub term_filters: HashMap<String, TermBloomFilter>,
}

impl Split {
    pub fn new(id: impl Into<String>, num_docs: u64) -> Self {
        Self {
            id: SplitId::new(id),
            partition_id: 0,
            num_docs,
            size_bytes: None,
            min_values: HashMap::new(),
            max_values: HashMap::new(),
            partition_values: HashMap::new(),
            fields: HashMap::new(),
            term_filters: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_bounds(
        mut self,
        column: impl Into<String>,
        min: impl Into<String>,
        max: impl Into<String>,
    ) -> Self {
        let column = column.into();
        self.min_values.insert(column.clone(), min.into());
        self.max_values.insert(column, max.into());
        self
    }

    #[must_use]
    pub fn with_partition_value(
        mut self,
        column: impl Into<String>,
        value: Option<impl Into<String>>,
    ) -> Self {
        self.partition_values
            .insert(column.into(), value.map(Into::into));
        self
    }

    #[must_use]
    pub fn with_field(mut self, column: impl Into<String>, capability: FieldCapability) -> Self {
        self.fields.insert(column.into(), capability);
        self
    }

    #[must_use]
    pub fn with_term_filter(mut self, column: impl Into<String>, filter: TermBloomFilter) -> Self {
        self.term_filters.insert(column.into(), filter);
        self
    }

    #[must_use]
    pub fn with_size_bytes(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    /// Returns `(min, max)` only when both bounds were collected.
    ///
    /// A one-sided bound is treated as missing statistics.
    pub fn column_bounds(&self, column: &str) -> Option<(&str, &str)> {
        match (self.min_values.get(column), self.max_values.get(column)) {
            (Some(min), Some(max)) => Some((min.as_str(), max.as_str())),
            _ => None,
        }
    }

    /// Partition value for `column`: `None` when the split does not carry the column,
    /// `Some(None)` for a null partition value.
    pub fn partition_value(&self, column: &str) -> Option<Option<&str>> {
        self.partition_values.get(column).map(|v| v.as_deref())
    }

    pub fn field(&self, column: &str) -> Option<&FieldCapability> {
        self.fields.get(column)
    }

    pub fn term_filter(&self, column: &str) -> Option<&TermBloomFilter> {
        self.term_filters.get(column)
    }

    pub fn declared_type(&self, column: &str) -> Option<FieldType> {
        self.fields.get(column).map(|c| c.field_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_sided_bounds_are_treated_as_missing() {
        let mut split = Split::new("s1", 10).with_bounds("score", "0", "9");
        split.max_values.insert("price".to_string(), "12".to_string());
        assert_eq!(split.column_bounds("score"), Some(("0", "9")));
        assert_eq!(split.column_bounds("price"), None);
        assert_eq!(split.column_bounds("missing"), None);
    }

    #[test]
    fn capability_deserializes_with_defaults() {
        let cap: FieldCapability =
            serde_json::from_str(r#"{"type":"string","tokenized":true}"#).expect("decode");
        assert!(!cap.fast);
        assert!(!cap.exact_match());
        assert_eq!(cap.field_type, FieldType::String);
    }

    #[test]
    fn grouping_support_excludes_non_random_access_types() {
        assert!(FieldType::Date.supports_grouping());
        assert!(FieldType::String.supports_grouping());
        assert!(!FieldType::Boolean.supports_grouping());
        assert!(!FieldType::Binary.supports_grouping());
        assert!(!FieldType::Date.is_numeric());
    }
}
