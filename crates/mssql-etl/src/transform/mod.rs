//! Per-column value transformations.
//!
//! Each rule is a pure function from value to value. NULL passes through
//! every rule unchanged, casing and concat operate on the value's textual
//! representation, and date extraction returns the integer calendar field.
//! Unrecognized rule encodings fall back to [`TransformRule::Identity`]
//! rather than failing the load.

use std::collections::BTreeMap;

use chrono::{Datelike, Timelike};
use tracing::warn;

use crate::core::value::SqlValue;

/// Calendar field selector for [`TransformRule::DateExtract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    /// 1-based month.
    Month,
    Day,
    /// 24-hour clock.
    Hour,
}

/// A per-column transformation rule.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformRule {
    /// Pass the value through unchanged, including NULL.
    Identity,

    /// Lowercase the textual representation. Idempotent.
    LowerCase,

    /// Uppercase the textual representation. Idempotent.
    UpperCase,

    /// Extract an integer calendar field from a temporal value.
    ///
    /// Non-temporal values pass through unchanged; this is a documented
    /// pass-through, not an error.
    DateExtract(DatePart),

    /// Append a literal to the textual representation of non-null values.
    Concat(String),
}

impl TransformRule {
    /// Parse a rule encoding.
    ///
    /// Recognized forms: `identity`, `lowercase`, `uppercase`,
    /// `date_extract:<year|month|day|hour>`, `concat:<literal>`. Anything
    /// else falls back to `Identity` with a warning.
    pub fn parse(encoding: &str) -> Self {
        match encoding.trim().to_lowercase().as_str() {
            "identity" => TransformRule::Identity,
            "lowercase" => TransformRule::LowerCase,
            "uppercase" => TransformRule::UpperCase,
            other => {
                if let Some(part) = other.strip_prefix("date_extract:") {
                    match part.trim() {
                        "year" => return TransformRule::DateExtract(DatePart::Year),
                        "month" => return TransformRule::DateExtract(DatePart::Month),
                        "day" => return TransformRule::DateExtract(DatePart::Day),
                        "hour" => return TransformRule::DateExtract(DatePart::Hour),
                        _ => {}
                    }
                }
                // Concat keeps the literal's original casing.
                if let Some(literal) = encoding.trim().strip_prefix("concat:") {
                    return TransformRule::Concat(literal.to_string());
                }
                warn!(
                    "unrecognized transform encoding {:?}, falling back to identity",
                    encoding
                );
                TransformRule::Identity
            }
        }
    }

    /// Apply the rule to a value.
    pub fn apply(&self, value: SqlValue) -> SqlValue {
        if value.is_null() {
            return value;
        }

        match self {
            TransformRule::Identity => value,
            TransformRule::LowerCase => match value.as_text() {
                Some(text) => SqlValue::Text(text.to_lowercase()),
                None => value,
            },
            TransformRule::UpperCase => match value.as_text() {
                Some(text) => SqlValue::Text(text.to_uppercase()),
                None => value,
            },
            TransformRule::DateExtract(part) => extract_date_part(*part, value),
            TransformRule::Concat(literal) => match value.as_text() {
                Some(text) => SqlValue::Text(format!("{}{}", text, literal)),
                None => value,
            },
        }
    }
}

/// Extract a calendar field, passing non-temporal values through unchanged.
fn extract_date_part(part: DatePart, value: SqlValue) -> SqlValue {
    match (&value, part) {
        (SqlValue::DateTime(dt), DatePart::Year) => SqlValue::I32(dt.year()),
        (SqlValue::DateTime(dt), DatePart::Month) => SqlValue::I32(dt.month() as i32),
        (SqlValue::DateTime(dt), DatePart::Day) => SqlValue::I32(dt.day() as i32),
        (SqlValue::DateTime(dt), DatePart::Hour) => SqlValue::I32(dt.hour() as i32),

        (SqlValue::DateTimeOffset(dto), DatePart::Year) => SqlValue::I32(dto.year()),
        (SqlValue::DateTimeOffset(dto), DatePart::Month) => SqlValue::I32(dto.month() as i32),
        (SqlValue::DateTimeOffset(dto), DatePart::Day) => SqlValue::I32(dto.day() as i32),
        (SqlValue::DateTimeOffset(dto), DatePart::Hour) => SqlValue::I32(dto.hour() as i32),

        (SqlValue::Date(d), DatePart::Year) => SqlValue::I32(d.year()),
        (SqlValue::Date(d), DatePart::Month) => SqlValue::I32(d.month() as i32),
        (SqlValue::Date(d), DatePart::Day) => SqlValue::I32(d.day() as i32),
        // A bare date is midnight.
        (SqlValue::Date(_), DatePart::Hour) => SqlValue::I32(0),

        (SqlValue::Time(t), DatePart::Hour) => SqlValue::I32(t.hour() as i32),

        _ => value,
    }
}

/// Transformation rules keyed by source column name.
///
/// Built once from the configured encodings and read-only during the load.
/// Columns without a rule get `Identity`.
#[derive(Debug, Clone, Default)]
pub struct TransformSet {
    rules: BTreeMap<String, TransformRule>,
}

impl TransformSet {
    /// Build a rule set from `source column -> encoding` pairs.
    pub fn from_encodings(encodings: &BTreeMap<String, String>) -> Self {
        let rules = encodings
            .iter()
            .map(|(column, encoding)| (column.clone(), TransformRule::parse(encoding)))
            .collect();
        Self { rules }
    }

    /// Insert a rule for a source column.
    pub fn insert(&mut self, column: impl Into<String>, rule: TransformRule) {
        self.rules.insert(column.into(), rule);
    }

    /// Apply the rule registered for `column`, or identity when none is.
    pub fn apply(&self, column: &str, value: SqlValue) -> SqlValue {
        match self.rules.get(column) {
            Some(rule) => rule.apply(value),
            None => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SqlNullType;
    use chrono::NaiveDate;

    fn leap_datetime() -> SqlValue {
        SqlValue::DateTime(
            NaiveDate::from_ymd_opt(2024, 2, 29)
                .unwrap()
                .and_hms_opt(13, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_identity_passes_null() {
        let null = SqlValue::Null(SqlNullType::String);
        assert_eq!(TransformRule::Identity.apply(null.clone()), null);
    }

    #[test]
    fn test_null_passes_through_every_rule() {
        let null = SqlValue::Null(SqlNullType::String);
        let rules = [
            TransformRule::Identity,
            TransformRule::LowerCase,
            TransformRule::UpperCase,
            TransformRule::DateExtract(DatePart::Year),
            TransformRule::Concat("_x".to_string()),
        ];
        for rule in rules {
            assert_eq!(rule.apply(null.clone()), null);
        }
    }

    #[test]
    fn test_casing() {
        assert_eq!(
            TransformRule::UpperCase.apply(SqlValue::Text("AbC".into())),
            SqlValue::Text("ABC".into())
        );
        assert_eq!(
            TransformRule::LowerCase.apply(SqlValue::Text("AbC".into())),
            SqlValue::Text("abc".into())
        );
    }

    #[test]
    fn test_casing_idempotent() {
        let upper = TransformRule::UpperCase;
        let once = upper.apply(SqlValue::Text("mIxEd".into()));
        assert_eq!(upper.apply(once.clone()), once);

        let lower = TransformRule::LowerCase;
        let once = lower.apply(SqlValue::Text("mIxEd".into()));
        assert_eq!(lower.apply(once.clone()), once);
    }

    #[test]
    fn test_casing_applies_to_textual_form() {
        // Non-string values are cased via their textual representation.
        assert_eq!(
            TransformRule::UpperCase.apply(SqlValue::Bool(true)),
            SqlValue::Text("TRUE".into())
        );
    }

    #[test]
    fn test_date_extract_fields() {
        let dt = leap_datetime();
        assert_eq!(
            TransformRule::DateExtract(DatePart::Year).apply(dt.clone()),
            SqlValue::I32(2024)
        );
        assert_eq!(
            TransformRule::DateExtract(DatePart::Month).apply(dt.clone()),
            SqlValue::I32(2)
        );
        assert_eq!(
            TransformRule::DateExtract(DatePart::Day).apply(dt.clone()),
            SqlValue::I32(29)
        );
        assert_eq!(
            TransformRule::DateExtract(DatePart::Hour).apply(dt),
            SqlValue::I32(13)
        );
    }

    #[test]
    fn test_date_extract_non_temporal_pass_through() {
        let v = SqlValue::Text("abc".into());
        assert_eq!(
            TransformRule::DateExtract(DatePart::Year).apply(v.clone()),
            v
        );
    }

    #[test]
    fn test_date_extract_bare_date_hour_is_midnight() {
        let d = SqlValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(
            TransformRule::DateExtract(DatePart::Hour).apply(d),
            SqlValue::I32(0)
        );
    }

    #[test]
    fn test_concat() {
        assert_eq!(
            TransformRule::Concat("_suffix".into()).apply(SqlValue::Text("v".into())),
            SqlValue::Text("v_suffix".into())
        );
        // Applies to the textual form of non-string values too.
        assert_eq!(
            TransformRule::Concat("!".into()).apply(SqlValue::I32(7)),
            SqlValue::Text("7!".into())
        );
    }

    #[test]
    fn test_parse_recognized_encodings() {
        assert_eq!(TransformRule::parse("identity"), TransformRule::Identity);
        assert_eq!(TransformRule::parse("UPPERCASE"), TransformRule::UpperCase);
        assert_eq!(TransformRule::parse("lowercase"), TransformRule::LowerCase);
        assert_eq!(
            TransformRule::parse("date_extract:month"),
            TransformRule::DateExtract(DatePart::Month)
        );
        assert_eq!(
            TransformRule::parse("concat:_NEW"),
            TransformRule::Concat("_NEW".to_string())
        );
    }

    #[test]
    fn test_parse_unrecognized_falls_back_to_identity() {
        assert_eq!(TransformRule::parse("reverse"), TransformRule::Identity);
        assert_eq!(
            TransformRule::parse("date_extract:week"),
            TransformRule::Identity
        );
        assert_eq!(TransformRule::parse(""), TransformRule::Identity);
    }

    #[test]
    fn test_transform_set_defaults_to_identity() {
        let mut set = TransformSet::default();
        set.insert("name", TransformRule::UpperCase);

        assert_eq!(
            set.apply("name", SqlValue::Text("a".into())),
            SqlValue::Text("A".into())
        );
        assert_eq!(
            set.apply("other", SqlValue::Text("a".into())),
            SqlValue::Text("a".into())
        );
    }

    #[test]
    fn test_transform_set_from_encodings() {
        let mut encodings = BTreeMap::new();
        encodings.insert("city".to_string(), "uppercase".to_string());
        encodings.insert("born".to_string(), "date_extract:year".to_string());
        encodings.insert("weird".to_string(), "rot13".to_string());

        let set = TransformSet::from_encodings(&encodings);
        assert_eq!(
            set.apply("city", SqlValue::Text("oslo".into())),
            SqlValue::Text("OSLO".into())
        );
        let v = SqlValue::Text("kept".into());
        assert_eq!(set.apply("weird", v.clone()), v);
    }
}
