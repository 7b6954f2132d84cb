//! Time bucketing and table reshaping.

use super::engine::{aggregate, ReductionSpec};
use super::filter::{apply_filters, Filter};
use crate::source::table::{Column, ColumnType, SortOrder, Table, Value, ValueKey};
use crate::utils::error::AggregateError;
use chrono::{Datelike, Duration, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Time bucket for trend aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Day,
    /// ISO week, labelled by its Monday
    Week,
    /// Calendar month, labelled by its first day
    Month,
}

impl Period {
    pub fn truncate(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Day => date,
            Period::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            Period::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Day => "Daily",
            Period::Week => "Weekly",
            Period::Month => "Monthly",
        }
    }
}

/// Calendar component extracted by [`date_part`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarPart {
    Year,
    Quarter,
    Month,
    IsoWeek,
}

impl CalendarPart {
    fn extract(&self, date: NaiveDate) -> f64 {
        let part = match self {
            CalendarPart::Year => date.year(),
            CalendarPart::Quarter => (date.month0() / 3 + 1) as i32,
            CalendarPart::Month => date.month() as i32,
            CalendarPart::IsoWeek => date.iso_week().week() as i32,
        };
        f64::from(part)
    }
}

fn require_date(table: &Table, column: &str) -> Result<usize, AggregateError> {
    let ci = table.require_column(column)?;
    if table.columns()[ci].kind != ColumnType::Date {
        return Err(AggregateError::InvalidDateColumn(column.to_string()));
    }
    Ok(ci)
}

/// Aggregate after truncating a date column to a period
///
/// **Public** - drives every revenue/spend trend chart
///
/// # Arguments
/// * `date_col` - Date column; its values are replaced by their bucket start
/// * `group_keys` - Extra keys grouped alongside the bucket
///
/// # Returns
/// Derived table keyed by `date_col` then `group_keys`, buckets ascending.
/// Rows with a null date are dropped.
///
/// # Errors
/// * `AggregateError::InvalidDateColumn` - `date_col` is not date typed
/// * Anything [`aggregate`] reports
pub fn aggregate_by_period(
    table: &Table,
    filters: &[Filter],
    date_col: &str,
    period: Period,
    group_keys: &[&str],
    reductions: &[ReductionSpec],
) -> Result<Table, AggregateError> {
    let ci = require_date(table, date_col)?;
    let filtered = apply_filters(table, filters)?;

    let rows: Vec<Vec<Value>> = filtered
        .raw_rows()
        .iter()
        .filter_map(|row| {
            let date = row[ci].as_date()?;
            let mut bucketed = row.clone();
            bucketed[ci] = Value::Date(period.truncate(date));
            Some(bucketed)
        })
        .collect();
    debug!(
        "Bucketed {} of {} rows by {:?}",
        rows.len(),
        filtered.len(),
        period
    );
    let bucketed = Table::from_rows(filtered.columns().to_vec(), rows)?;

    let mut keys = Vec::with_capacity(group_keys.len() + 1);
    keys.push(date_col);
    keys.extend_from_slice(group_keys);

    aggregate(&bucketed, &[], &keys, reductions)?.sort_by(date_col, SortOrder::Ascending)
}

/// Running sum of a column within each group, in `order_col` order
///
/// Rows are stable-sorted by `order_col` and returned in that order with
/// `output_col` appended. A null value leaves the running total unchanged
/// and yields a null cell.
pub fn cumulative_sum(
    table: &Table,
    value_col: &str,
    group_keys: &[&str],
    order_col: &str,
    output_col: &str,
) -> Result<Table, AggregateError> {
    let vi = table.require_numeric(value_col)?;
    let key_indices = group_keys
        .iter()
        .map(|k| table.require_column(k))
        .collect::<Result<Vec<_>, _>>()?;
    let sorted = table.sort_by(order_col, SortOrder::Ascending)?;

    let mut totals: HashMap<Vec<ValueKey>, f64> = HashMap::new();
    let running: Vec<Value> = sorted
        .raw_rows()
        .iter()
        .map(|row| {
            let Some(v) = row[vi].as_f64() else {
                return Value::Null;
            };
            let key: Vec<ValueKey> = key_indices.iter().map(|&i| row[i].key()).collect();
            let total = totals.entry(key).or_insert(0.0);
            *total += v;
            Value::Number(*total)
        })
        .collect();

    sorted.with_column(Column::new(output_col, ColumnType::Number), running)
}

/// One row per `row_key` value, one column per distinct `category_key` value
///
/// Values are summed per cell; absent combinations are `0`. Rows and
/// category columns follow first-seen order.
///
/// # Errors
/// * `AggregateError::MissingColumn` - any of the three columns absent
/// * `AggregateError::TypeMismatch` - `value_col` not numeric
/// * `AggregateError::InvalidOption` - a category collides with `row_key`
pub fn pivot(table: &Table, row_key: &str, category_key: &str, value_col: &str) -> Result<Table, AggregateError> {
    let ri = table.require_column(row_key)?;
    let ci = table.require_column(category_key)?;
    let vi = table.require_numeric(value_col)?;

    let row_values = table.distinct(row_key)?;
    let categories = table.distinct(category_key)?;
    let row_pos: HashMap<ValueKey, usize> = row_values.iter().enumerate().map(|(i, v)| (v.key(), i)).collect();
    let cat_pos: HashMap<ValueKey, usize> = categories.iter().enumerate().map(|(i, v)| (v.key(), i)).collect();

    let mut cells = vec![vec![0.0; categories.len()]; row_values.len()];
    for row in table.raw_rows() {
        let (Some(&r), Some(&c)) = (row_pos.get(&row[ri].key()), cat_pos.get(&row[ci].key())) else {
            continue;
        };
        if let Some(v) = row[vi].as_f64() {
            cells[r][c] += v;
        }
    }

    let mut columns = vec![table.columns()[ri].clone()];
    columns.extend(categories.iter().map(|c| Column::new(c.to_string(), ColumnType::Number)));

    let rows = row_values
        .into_iter()
        .zip(cells)
        .map(|(key, sums)| {
            let mut row = vec![key];
            row.extend(sums.into_iter().map(Value::Number));
            row
        })
        .collect();

    Table::from_rows(columns, rows)
}

/// Unpivot: one output row per `(id, value column)` pair
///
/// The output has `id_col`, `var_name` (the source column name) and
/// `value_name`. Every value column must share one type.
pub fn melt(
    table: &Table,
    id_col: &str,
    value_cols: &[&str],
    var_name: &str,
    value_name: &str,
) -> Result<Table, AggregateError> {
    let ii = table.require_column(id_col)?;
    let indices = value_cols
        .iter()
        .map(|c| table.require_column(c))
        .collect::<Result<Vec<_>, _>>()?;

    let value_type = match indices.first() {
        Some(&first) => table.columns()[first].kind,
        None => return Err(AggregateError::InvalidOption("melt needs at least one value column".to_string())),
    };
    if let Some(&odd) = indices.iter().find(|&&i| table.columns()[i].kind != value_type) {
        return Err(AggregateError::TypeMismatch {
            column: table.columns()[odd].name.clone(),
            expected: value_type.name(),
        });
    }

    let columns = vec![
        table.columns()[ii].clone(),
        Column::new(var_name, ColumnType::Text),
        Column::new(value_name, value_type),
    ];
    let rows = table
        .raw_rows()
        .iter()
        .flat_map(|row| {
            value_cols.iter().zip(&indices).map(move |(name, &vi)| {
                vec![row[ii].clone(), Value::text(*name), row[vi].clone()]
            })
        })
        .collect();

    Table::from_rows(columns, rows)
}

/// Append a numeric calendar component of a date column
pub fn date_part(table: &Table, date_col: &str, part: CalendarPart, output_col: &str) -> Result<Table, AggregateError> {
    let ci = require_date(table, date_col)?;
    let values = table
        .raw_rows()
        .iter()
        .map(|row| row[ci].as_date().map_or(Value::Null, |d| Value::Number(part.extract(d))))
        .collect();
    table.with_column(Column::new(output_col, ColumnType::Number), values)
}
