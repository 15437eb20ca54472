//! Re-typing of predicate literals and stringified statistics against a column's declared type.

use std::cmp::Ordering;

use chrono::NaiveDate;
use ssp_storage::FieldType;

use crate::predicate::LiteralValue;

/// Comparable value after coercion to a declared column type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Int(i64),
    Float(f64),
    /// Days since 1970-01-01.
    Date(i32),
    Str(String),
}

impl TypedValue {
    /// Orders two values of compatible kinds; `None` when the kinds differ or a float is NaN.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => compare_int_float(*a, *b),
            (Self::Float(a), Self::Int(b)) => compare_int_float(*b, *a).map(Ordering::reverse),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Str(a), Self::Str(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => None,
        }
    }
}

/// Orders an integer against a float without rounding either side.
fn compare_int_float(a: i64, b: f64) -> Option<Ordering> {
    // 2^63; every f64 in [-2^63, 2^63) has an integral floor representable as i64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if b.is_nan() {
        return None;
    }
    if b >= LIMIT {
        return Some(Ordering::Less);
    }
    if b < -LIMIT {
        return Some(Ordering::Greater);
    }
    let floor = b.floor();
    match a.cmp(&(floor as i64)) {
        Ordering::Equal if b > floor => Some(Ordering::Less),
        other => Some(other),
    }
}

/// Why a value could not be typed; carried into warning logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    pub raw: String,
    pub target: FieldType,
}

impl std::fmt::Display for ConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot interpret '{}' as {}", self.raw, self.target)
    }
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Parses `YYYY-MM-DD` (optionally followed by a time part) into a day offset.
pub fn parse_date_days(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    let date_part = trimmed
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or(trimmed);
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    i32::try_from(date.signed_duration_since(unix_epoch()).num_days()).ok()
}

/// Types a stringified min/max statistic.
pub fn type_stat(raw: &str, target: FieldType) -> Result<TypedValue, ConversionError> {
    let fail = || ConversionError {
        raw: raw.to_string(),
        target,
    };
    let trimmed = raw.trim();
    match target {
        FieldType::Integer | FieldType::Long => {
            trimmed.parse::<i64>().map(TypedValue::Int).map_err(|_| fail())
        }
        FieldType::Float | FieldType::Double => {
            trimmed.parse::<f64>().map(TypedValue::Float).map_err(|_| fail())
        }
        FieldType::Date => trimmed
            .parse::<i32>()
            .ok()
            .or_else(|| parse_date_days(trimmed))
            .map(TypedValue::Date)
            .ok_or_else(fail),
        FieldType::String => Ok(TypedValue::Str(raw.to_string())),
        FieldType::Boolean | FieldType::Timestamp | FieldType::Binary => Err(fail()),
    }
}

/// Types a predicate literal for comparison against a column of `target` type.
///
/// Dates accept pre-typed [`LiteralValue::Date32`] values, already-normalized
/// integer day offsets, and `YYYY-MM-DD` strings.
pub fn type_literal(value: &LiteralValue, target: FieldType) -> Result<TypedValue, ConversionError> {
    let fail = || ConversionError {
        raw: value.to_string(),
        target,
    };
    match target {
        FieldType::Integer | FieldType::Long => match value {
            LiteralValue::Int32(v) => Ok(TypedValue::Int(i64::from(*v))),
            LiteralValue::Int64(v) => Ok(TypedValue::Int(*v)),
            LiteralValue::Float32(v) => Ok(TypedValue::Float(f64::from(*v))),
            LiteralValue::Float64(v) => Ok(TypedValue::Float(*v)),
            LiteralValue::Utf8(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(TypedValue::Int)
                    .or_else(|_| s.parse::<f64>().map(TypedValue::Float))
                    .map_err(|_| fail())
            }
            LiteralValue::Date32(_) | LiteralValue::Boolean(_) => Err(fail()),
        },
        FieldType::Float | FieldType::Double => match value {
            LiteralValue::Int32(v) => Ok(TypedValue::Float(f64::from(*v))),
            LiteralValue::Int64(v) => Ok(TypedValue::Int(*v)),
            LiteralValue::Float32(v) => Ok(TypedValue::Float(f64::from(*v))),
            LiteralValue::Float64(v) => Ok(TypedValue::Float(*v)),
            LiteralValue::Utf8(s) => s
                .trim()
                .parse::<f64>()
                .map(TypedValue::Float)
                .map_err(|_| fail()),
            LiteralValue::Date32(_) | LiteralValue::Boolean(_) => Err(fail()),
        },
        FieldType::Date => match value {
            LiteralValue::Date32(d) => Ok(TypedValue::Date(*d)),
            LiteralValue::Int32(d) => Ok(TypedValue::Date(*d)),
            LiteralValue::Int64(d) => i32::try_from(*d).map(TypedValue::Date).map_err(|_| fail()),
            LiteralValue::Utf8(s) => parse_date_days(s).map(TypedValue::Date).ok_or_else(fail),
            LiteralValue::Float32(_) | LiteralValue::Float64(_) | LiteralValue::Boolean(_) => {
                Err(fail())
            }
        },
        FieldType::String => Ok(TypedValue::Str(value.to_string())),
        FieldType::Boolean | FieldType::Timestamp | FieldType::Binary => Err(fail()),
    }
}

/// Declared type implied by a literal when the column's own declaration is unknown.
pub fn infer_type(value: &LiteralValue) -> FieldType {
    match value {
        LiteralValue::Int32(_) => FieldType::Integer,
        LiteralValue::Int64(_) => FieldType::Long,
        LiteralValue::Float32(_) => FieldType::Float,
        LiteralValue::Float64(_) => FieldType::Double,
        LiteralValue::Date32(_) => FieldType::Date,
        LiteralValue::Utf8(_) | LiteralValue::Boolean(_) => FieldType::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_normalize_from_strings_typed_values_and_integers() {
        let day = parse_date_days("2024-01-01").expect("date");
        assert_eq!(day, 19723);
        assert_eq!(
            type_literal(&LiteralValue::Utf8("2024-01-01".into()), FieldType::Date),
            Ok(TypedValue::Date(19723))
        );
        assert_eq!(
            type_literal(&LiteralValue::Date32(19723), FieldType::Date),
            Ok(TypedValue::Date(19723))
        );
        assert_eq!(
            type_literal(&LiteralValue::Int64(19723), FieldType::Date),
            Ok(TypedValue::Date(19723))
        );
        assert_eq!(
            type_stat("2024-01-01T10:30:00", FieldType::Date),
            Ok(TypedValue::Date(19723))
        );
        assert_eq!(type_stat("19723", FieldType::Date), Ok(TypedValue::Date(19723)));
    }

    #[test]
    fn numeric_literals_compare_across_int_and_float() {
        let stat = type_stat("89", FieldType::Long).expect("stat");
        let lit = type_literal(&LiteralValue::Float64(85.5), FieldType::Long).expect("lit");
        assert_eq!(stat.compare(&lit), Some(Ordering::Greater));
    }

    #[test]
    fn int_float_ordering_is_exact_beyond_f64_precision() {
        let above = TypedValue::Int(9_007_199_254_740_993);
        assert_eq!(
            above.compare(&TypedValue::Float(9_007_199_254_740_992.0)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            TypedValue::Float(9_007_199_254_740_992.0).compare(&above),
            Some(Ordering::Less)
        );
        assert_eq!(TypedValue::Int(3).compare(&TypedValue::Float(3.0)), Some(Ordering::Equal));
        assert_eq!(TypedValue::Int(3).compare(&TypedValue::Float(3.5)), Some(Ordering::Less));
        assert_eq!(TypedValue::Int(-4).compare(&TypedValue::Float(-3.5)), Some(Ordering::Less));
        assert_eq!(TypedValue::Int(-3).compare(&TypedValue::Float(-3.5)), Some(Ordering::Greater));
        assert_eq!(
            TypedValue::Int(i64::MAX).compare(&TypedValue::Float(f64::INFINITY)),
            Some(Ordering::Less)
        );
        assert_eq!(
            TypedValue::Int(i64::MIN).compare(&TypedValue::Float(-1e300)),
            Some(Ordering::Greater)
        );
        assert_eq!(TypedValue::Int(1).compare(&TypedValue::Float(f64::NAN)), None);

        // integer literals stay exact against double columns
        assert_eq!(
            type_literal(&LiteralValue::Int64(9_007_199_254_740_993), FieldType::Double),
            Ok(TypedValue::Int(9_007_199_254_740_993))
        );
    }

    #[test]
    fn unparsable_values_report_conversion_errors() {
        let err = type_stat("abc", FieldType::Integer).expect_err("not a number");
        assert_eq!(err.target, FieldType::Integer);
        assert!(type_literal(&LiteralValue::Boolean(true), FieldType::Double).is_err());
        assert!(type_stat("true", FieldType::Boolean).is_err());
    }

    #[test]
    fn mismatched_kinds_and_nan_are_incomparable() {
        assert_eq!(TypedValue::Int(1).compare(&TypedValue::Str("1".into())), None);
        assert_eq!(TypedValue::Float(f64::NAN).compare(&TypedValue::Float(1.0)), None);
    }
}
