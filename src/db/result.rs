use chrono::{DateTime, NaiveDate, NaiveDateTime};
use duckdb::types::{TimeUnit, ValueRef};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// A single scalar cell of a query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Boolean(b) => Value::Bool(b),
            ValueRef::TinyInt(i) => Value::Int(i as i64),
            ValueRef::SmallInt(i) => Value::Int(i as i64),
            ValueRef::Int(i) => Value::Int(i as i64),
            ValueRef::BigInt(i) => Value::Int(i),
            ValueRef::HugeInt(i) => Value::Int(i as i64),
            ValueRef::UTinyInt(u) => Value::Int(u as i64),
            ValueRef::USmallInt(u) => Value::Int(u as i64),
            ValueRef::UInt(u) => Value::Int(u as i64),
            ValueRef::UBigInt(u) => Value::Int(u as i64),
            ValueRef::Float(f) => Value::Float(f as f64),
            ValueRef::Double(f) => Value::Float(f),
            ValueRef::Decimal(d) => match d.to_string().parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => Value::Text(d.to_string()),
            },
            ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Date32(days) => DateTime::from_timestamp(days as i64 * 86_400, 0)
                .map(|dt| Value::Text(dt.date_naive().to_string()))
                .unwrap_or(Value::Null),
            ValueRef::Timestamp(unit, raw) => {
                let micros = match unit {
                    TimeUnit::Second => raw.saturating_mul(1_000_000),
                    TimeUnit::Millisecond => raw.saturating_mul(1_000),
                    TimeUnit::Microsecond => raw,
                    TimeUnit::Nanosecond => raw / 1_000,
                };
                DateTime::from_timestamp_micros(micros)
                    .map(|dt| Value::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
                    .unwrap_or(Value::Null)
            }
            other => Value::Text(format!("{:?}", other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Runtime classification of a result column, computed once per result and
/// shared by chart selection and insight generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
    Date,
    Other,
}

/// A successful query result: ordered named columns over row-major values.
/// A table with zero rows is a successful result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Classify every column by inspecting its first non-null value.
    /// Text values that parse as a calendar date or timestamp become `Date`.
    pub fn column_kinds(&self) -> Vec<ColumnKind> {
        (0..self.columns.len())
            .map(|i| {
                let first = self.column_values(i).find(|v| !v.is_null());
                match first {
                    Some(Value::Int(_)) | Some(Value::Float(_)) => ColumnKind::Numeric,
                    Some(Value::Text(s)) => {
                        if looks_like_date(s) {
                            ColumnKind::Date
                        } else {
                            ColumnKind::Text
                        }
                    }
                    _ => ColumnKind::Other,
                }
            })
            .collect()
    }

    /// Count of distinct non-null textual values in a column.
    pub fn distinct_text_count(&self, index: usize) -> usize {
        self.column_values(index)
            .filter_map(Value::as_text)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Total NULL count across all columns.
    pub fn missing_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|v| v.is_null())
            .count()
    }
}

fn looks_like_date(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    if DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(text, fmt).is_ok())
    {
        return true;
    }
    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    if DATETIME_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(text, fmt).is_ok())
    {
        return true;
    }
    DateTime::parse_from_rfc3339(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales_table() -> Table {
        Table::new(
            vec![
                "region".to_string(),
                "sold_on".to_string(),
                "revenue".to_string(),
            ],
            vec![
                vec![
                    Value::Text("North".to_string()),
                    Value::Text("2024-01-05".to_string()),
                    Value::Float(1200.0),
                ],
                vec![
                    Value::Text("South".to_string()),
                    Value::Text("2024-01-06".to_string()),
                    Value::Null,
                ],
            ],
        )
    }

    #[test]
    fn classifies_text_date_and_numeric_columns() {
        let kinds = sales_table().column_kinds();
        assert_eq!(
            kinds,
            vec![ColumnKind::Text, ColumnKind::Date, ColumnKind::Numeric]
        );
    }

    #[test]
    fn month_names_are_text_not_dates() {
        let table = Table::new(
            vec!["month".to_string(), "total".to_string()],
            vec![vec![Value::Text("January".to_string()), Value::Int(10)]],
        );
        assert_eq!(
            table.column_kinds(),
            vec![ColumnKind::Text, ColumnKind::Numeric]
        );
    }

    #[test]
    fn classification_skips_leading_nulls() {
        let table = Table::new(
            vec!["amount".to_string()],
            vec![vec![Value::Null], vec![Value::Float(3.5)]],
        );
        assert_eq!(table.column_kinds(), vec![ColumnKind::Numeric]);
    }

    #[test]
    fn all_null_column_is_other() {
        let table = Table::new(vec!["ghost".to_string()], vec![vec![Value::Null]]);
        assert_eq!(table.column_kinds(), vec![ColumnKind::Other]);
    }

    #[test]
    fn counts_missing_values_across_all_columns() {
        assert_eq!(sales_table().missing_count(), 1);
    }

    #[test]
    fn distinct_text_counts_ignore_nulls() {
        let table = Table::new(
            vec!["city".to_string()],
            vec![
                vec![Value::Text("Leeds".to_string())],
                vec![Value::Text("York".to_string())],
                vec![Value::Text("Leeds".to_string())],
                vec![Value::Null],
            ],
        );
        assert_eq!(table.distinct_text_count(0), 2);
    }

    #[test]
    fn empty_table_has_zero_rows_but_keeps_columns() {
        let table = Table::empty(vec!["a".to_string(), "b".to_string()]);
        assert!(table.is_empty());
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn value_numeric_coercion() {
        assert_eq!(Value::Int(4).as_f64(), Some(4.0));
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Text("4".to_string()).as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }
}
