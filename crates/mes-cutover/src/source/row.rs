//! Dynamic legacy rows and row filters.

use super::value::SqlValue;
use std::collections::BTreeMap;

/// A single untyped record read from the legacy store.
///
/// Rows are read-only: the engine never mutates one, and mapping
/// functions only borrow them.
#[derive(Debug, Clone, Default)]
pub struct LegacyRow {
    columns: BTreeMap<String, SqlValue>,
}

impl LegacyRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column setter, used by readers and test fixtures.
    pub fn with(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.columns.insert(column.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<SqlValue>) {
        self.columns.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(SqlValue::as_str)
    }

    pub fn get_uuid(&self, column: &str) -> Option<uuid::Uuid> {
        self.get(column).and_then(SqlValue::as_uuid)
    }

    pub fn get_i32(&self, column: &str) -> Option<i32> {
        self.get(column).and_then(SqlValue::as_i32)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(SqlValue::as_i64)
    }

    pub fn get_bool(&self, column: &str) -> Option<bool> {
        self.get(column).and_then(SqlValue::as_bool)
    }

    pub fn get_datetime(&self, column: &str) -> Option<chrono::NaiveDateTime> {
        self.get(column).and_then(SqlValue::as_datetime)
    }

    pub fn get_decimal(&self, column: &str) -> Option<rust_decimal::Decimal> {
        self.get(column).and_then(SqlValue::as_decimal)
    }

    /// The row's stable legacy identifier, used to tag warnings.
    ///
    /// Falls back to "<no id>" so a malformed row still produces a
    /// traceable warning instead of a second failure.
    pub fn legacy_id(&self) -> String {
        self.get("Id")
            .filter(|v| !v.is_null())
            .map(|v| match v {
                SqlValue::Text(s) => s.clone(),
                SqlValue::Uuid(u) => u.to_string(),
                other => other.to_sql_literal(),
            })
            .unwrap_or_else(|| "<no id>".to_string())
    }
}

/// A filter over legacy rows.
///
/// DB-backed readers compile this to a WHERE clause; the in-memory
/// reader evaluates it directly.
#[derive(Debug, Clone)]
pub enum RowFilter {
    /// Column equals value.
    Eq(String, SqlValue),

    /// Column is 0/false or NULL. This is the is-test exclusion shape:
    /// legacy tables predate the marker, so NULL means "not test data".
    IsFalseOrNull(String),

    /// Conjunction of filters.
    All(Vec<RowFilter>),
}

impl RowFilter {
    /// Combine with another filter (AND).
    pub fn and(self, other: RowFilter) -> RowFilter {
        match self {
            RowFilter::All(mut filters) => {
                filters.push(other);
                RowFilter::All(filters)
            }
            f => RowFilter::All(vec![f, other]),
        }
    }

    /// Evaluate against an in-memory row.
    pub fn matches(&self, row: &LegacyRow) -> bool {
        match self {
            RowFilter::Eq(column, value) => row.get(column) == Some(value),
            RowFilter::IsFalseOrNull(column) => match row.get(column) {
                None => true,
                Some(v) => v.is_null() || v.as_bool() == Some(false),
            },
            RowFilter::All(filters) => filters.iter().all(|f| f.matches(row)),
        }
    }

    /// Compile to a SQL predicate (without the WHERE keyword).
    pub fn to_sql(&self) -> String {
        match self {
            RowFilter::Eq(column, value) => {
                format!("[{}] = {}", column, value.to_sql_literal())
            }
            RowFilter::IsFalseOrNull(column) => {
                format!("([{0}] = 0 OR [{0}] IS NULL)", column)
            }
            RowFilter::All(filters) => filters
                .iter()
                .map(|f| format!("({})", f.to_sql()))
                .collect::<Vec<_>>()
                .join(" AND "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_legacy_id_fallback() {
        let row = LegacyRow::new().with("Name", "anonymous");
        assert_eq!(row.legacy_id(), "<no id>");

        let id = Uuid::new_v4();
        let row = LegacyRow::new().with("Id", id);
        assert_eq!(row.legacy_id(), id.to_string());
    }

    #[test]
    fn test_is_false_or_null_filter() {
        let f = RowFilter::IsFalseOrNull("IsTest".into());
        assert!(f.matches(&LegacyRow::new()));
        assert!(f.matches(&LegacyRow::new().with("IsTest", false)));
        assert!(f.matches(&LegacyRow::new().with("IsTest", SqlValue::Null)));
        assert!(!f.matches(&LegacyRow::new().with("IsTest", true)));
        assert!(!f.matches(&LegacyRow::new().with("IsTest", 1i32)));
    }

    #[test]
    fn test_and_flattens() {
        let f = RowFilter::Eq("A".into(), SqlValue::I32(1))
            .and(RowFilter::Eq("B".into(), SqlValue::I32(2)))
            .and(RowFilter::IsFalseOrNull("IsTest".into()));
        let row = LegacyRow::new().with("A", 1i32).with("B", 2i32);
        assert!(f.matches(&row));
        assert!(!f.matches(&row.clone().with("IsTest", true)));
    }

    #[test]
    fn test_filter_to_sql() {
        let f = RowFilter::IsFalseOrNull("IsTest".into())
            .and(RowFilter::Eq("PlantCode".into(), SqlValue::Text("A".into())));
        assert_eq!(
            f.to_sql(),
            "(([IsTest] = 0 OR [IsTest] IS NULL)) AND ([PlantCode] = 'A')"
        );
    }
}
