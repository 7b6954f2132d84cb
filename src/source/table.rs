//! In-memory table model shared by every stage of the dashboard.
//!
//! A [`Table`] is an ordered list of typed columns plus an ordered list of
//! rows. Tables are never mutated once built: every transformation below
//! returns a new table.

use crate::utils::error::AggregateError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// A single typed cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

/// Column type, uniform for every non-null cell of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Number,
    Text,
    Date,
    Bool,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Number => "number",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Bool => "bool",
        }
    }
}

/// Hashable identity of a value, used for grouping and set membership
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Null,
    Bool(bool),
    Number(u64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Type of this value (`None` for null)
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnType::Bool),
            Value::Number(_) => Some(ColumnType::Number),
            Value::Date(_) => Some(ColumnType::Date),
            Value::Text(_) => Some(ColumnType::Text),
        }
    }

    pub fn key(&self) -> ValueKey {
        match self {
            Value::Null => ValueKey::Null,
            Value::Bool(b) => ValueKey::Bool(*b),
            // -0.0 and 0.0 land in the same group
            Value::Number(n) => ValueKey::Number(if *n == 0.0 { 0.0f64.to_bits() } else { n.to_bits() }),
            Value::Date(d) => ValueKey::Date(*d),
            Value::Text(s) => ValueKey::Text(s.clone()),
        }
    }

    /// Compare two values of the same type; `None` across types or with null
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{:.0}", n),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self { name: name.into(), kind }
    }
}

/// Sort direction for table sorts and ranked charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Immutable ordered table of uniformly-typed rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

/// Borrowed view of one table row
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> RowRef<'a> {
    /// Position of this row in its table
    pub fn index(&self) -> usize {
        self.index
    }

    /// Value of a named column in this row
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let ci = self.table.column_index(column)?;
        self.table.rows[self.index].get(ci)
    }

    pub fn values(&self) -> &'a [Value] {
        &self.table.rows[self.index]
    }
}

impl Table {
    /// Build a table, checking row widths and per-column types
    ///
    /// # Errors
    /// * `AggregateError::InvalidOption` - duplicate column name or ragged row
    /// * `AggregateError::TypeMismatch` - a cell does not match its column type
    pub fn from_rows(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Result<Self, AggregateError> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(AggregateError::InvalidOption(format!(
                    "duplicate column name '{}'",
                    col.name
                )));
            }
        }

        for (ri, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(AggregateError::InvalidOption(format!(
                    "row {} has {} cells, expected {}",
                    ri,
                    row.len(),
                    columns.len()
                )));
            }
            for (value, col) in row.iter().zip(&columns) {
                if let Some(kind) = value.column_type() {
                    if kind != col.kind {
                        return Err(AggregateError::TypeMismatch {
                            column: col.name.clone(),
                            expected: col.kind.name(),
                        });
                    }
                }
            }
        }

        Ok(Self { columns, rows })
    }

    /// Build a table inferring each column type from its first non-null cell
    ///
    /// All-null columns are typed as text.
    pub fn infer(names: &[&str], rows: Vec<Vec<Value>>) -> Result<Self, AggregateError> {
        let columns = names
            .iter()
            .enumerate()
            .map(|(ci, name)| {
                let kind = rows
                    .iter()
                    .filter_map(|r| r.get(ci).and_then(Value::column_type))
                    .next()
                    .unwrap_or(ColumnType::Text);
                Column::new(*name, kind)
            })
            .collect();
        Self::from_rows(columns, rows)
    }

    /// Build a table from CSV text with a header row
    ///
    /// Same inference rules as dataset loading, without schema resolution.
    pub fn from_csv_reader(label: &str, reader: impl std::io::Read) -> Result<Self, crate::utils::error::SourceError> {
        super::loader::parse_csv(label, reader)
    }

    pub fn empty(columns: Vec<Column>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Column index, or `MissingColumn` naming the absent column
    pub fn require_column(&self, name: &str) -> Result<usize, AggregateError> {
        self.column_index(name)
            .ok_or_else(|| AggregateError::MissingColumn(name.to_string()))
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column_index(name).map(|i| self.columns[i].kind)
    }

    /// Names of every numeric column, in table order
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnType::Number)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        (index < self.rows.len()).then_some(RowRef { table: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> + '_ {
        (0..self.rows.len()).map(move |index| RowRef { table: self, index })
    }

    pub(crate) fn raw_rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// All values of a column, in row order
    pub fn column_values(&self, name: &str) -> Result<Vec<&Value>, AggregateError> {
        let ci = self.require_column(name)?;
        Ok(self.rows.iter().map(|r| &r[ci]).collect())
    }

    /// Numeric values of a column (`None` for nulls)
    ///
    /// # Errors
    /// * `MissingColumn` - column absent
    /// * `TypeMismatch` - column is not numeric
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>, AggregateError> {
        let ci = self.require_numeric(name)?;
        Ok(self.rows.iter().map(|r| r[ci].as_f64()).collect())
    }

    pub(crate) fn require_numeric(&self, name: &str) -> Result<usize, AggregateError> {
        let ci = self.require_column(name)?;
        if self.columns[ci].kind != ColumnType::Number {
            return Err(AggregateError::TypeMismatch {
                column: name.to_string(),
                expected: "numeric",
            });
        }
        Ok(ci)
    }

    /// Distinct values of a column in first-seen order (nulls skipped)
    pub fn distinct(&self, name: &str) -> Result<Vec<Value>, AggregateError> {
        let ci = self.require_column(name)?;
        let mut seen = HashSet::new();
        Ok(self
            .rows
            .iter()
            .map(|r| &r[ci])
            .filter(|v| !v.is_null() && seen.insert(v.key()))
            .cloned()
            .collect())
    }

    /// New table holding only the given rows, in the given order
    pub(crate) fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Stable sort by one column; nulls always sort last
    pub fn sort_by(&self, name: &str, order: SortOrder) -> Result<Table, AggregateError> {
        let ci = self.require_column(name)?;
        let mut indices: Vec<usize> = (0..self.rows.len()).collect();
        indices.sort_by(|&a, &b| {
            let (va, vb) = (&self.rows[a][ci], &self.rows[b][ci]);
            match (va.is_null(), vb.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let ord = va.compare(vb).unwrap_or(Ordering::Equal);
                    match order {
                        SortOrder::Ascending => ord,
                        SortOrder::Descending => ord.reverse(),
                    }
                }
            }
        });
        Ok(self.take_rows(&indices))
    }

    /// Rows matching every filter
    pub fn filter(&self, filters: &[crate::aggregator::Filter]) -> Result<Table, AggregateError> {
        crate::aggregator::apply_filters(self, filters)
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Projection onto the named columns, in the given order
    pub fn select(&self, names: &[&str]) -> Result<Table, AggregateError> {
        let indices = names
            .iter()
            .map(|n| self.require_column(n))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Table {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        })
    }

    /// Copy of this table with one extra column appended
    pub fn with_column(&self, column: Column, values: Vec<Value>) -> Result<Table, AggregateError> {
        if values.len() != self.rows.len() {
            return Err(AggregateError::InvalidOption(format!(
                "column '{}' has {} values for {} rows",
                column.name,
                values.len(),
                self.rows.len()
            )));
        }
        let mut columns = self.columns.clone();
        columns.push(column);
        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(r, v)| {
                let mut row = r.clone();
                row.push(v);
                row
            })
            .collect();
        Table::from_rows(columns, rows)
    }

    /// Copy of this table with one column renamed
    pub fn rename(mut self, from: &str, to: &str) -> Result<Table, AggregateError> {
        if from == to {
            return Ok(self);
        }
        if self.has_column(to) {
            return Err(AggregateError::InvalidOption(format!(
                "cannot rename '{}' to existing column '{}'",
                from, to
            )));
        }
        let ci = self.require_column(from)?;
        self.columns[ci].name = to.to_string();
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::infer(
            &["channel", "revenue"],
            vec![
                vec!["Email".into(), 10.0.into()],
                vec!["Search".into(), Value::Null],
                vec!["Social".into(), 30.0.into()],
                vec!["Email".into(), 5.0.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_rejects_type_mismatch() {
        let result = Table::from_rows(
            vec![Column::new("n", ColumnType::Number)],
            vec![vec![Value::text("oops")]],
        );
        assert!(matches!(result, Err(AggregateError::TypeMismatch { .. })));
    }

    #[test]
    fn test_from_rows_rejects_ragged_rows() {
        let result = Table::from_rows(
            vec![Column::new("a", ColumnType::Text), Column::new("b", ColumnType::Text)],
            vec![vec![Value::text("x")]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_sort_by_puts_nulls_last() {
        let sorted = sample().sort_by("revenue", SortOrder::Descending).unwrap();
        let values: Vec<_> = sorted.rows().map(|r| r.get("revenue").unwrap().clone()).collect();
        assert_eq!(values, vec![Value::from(30.0), Value::from(10.0), Value::from(5.0), Value::Null]);
    }

    #[test]
    fn test_sort_is_stable() {
        let table = Table::infer(
            &["k", "v"],
            vec![
                vec![1.0.into(), "a".into()],
                vec![0.0.into(), "b".into()],
                vec![1.0.into(), "c".into()],
            ],
        )
        .unwrap();
        let sorted = table.sort_by("k", SortOrder::Ascending).unwrap();
        let order: Vec<_> = sorted.rows().map(|r| r.get("v").unwrap().to_string()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_distinct_first_seen_order() {
        let distinct = sample().distinct("channel").unwrap();
        assert_eq!(distinct, vec![Value::from("Email"), Value::from("Search"), Value::from("Social")]);
    }

    #[test]
    fn test_select_missing_column() {
        let err = sample().select(&["channel", "spend"]).unwrap_err();
        assert_eq!(err, AggregateError::MissingColumn("spend".to_string()));
    }

    #[test]
    fn test_numeric_column_rejects_text() {
        assert!(matches!(
            sample().numeric_column("channel"),
            Err(AggregateError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2024-03-01");
    }

    #[test]
    fn test_rename_to_existing_fails() {
        assert!(sample().rename("channel", "revenue").is_err());
    }
}
