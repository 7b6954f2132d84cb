//! Group-by and reduction over tables.
//!
//! `aggregate` filters a table, partitions its rows by the distinct tuple of
//! group-key values and reduces each requested column per group. Groups come
//! out in first-seen order; callers sort the derived table if they need any
//! other order.

use super::filter::{apply_filters, Filter};
use crate::source::table::{Column, ColumnType, RowRef, Table, Value, ValueKey};
use crate::utils::config::ROW_COUNT_COLUMN;
use crate::utils::error::AggregateError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Per-group reduction function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Sum,
    Mean,
    Count,
    Min,
    Max,
    /// Sample standard deviation (n - 1)
    Std,
    Median,
    /// First non-null value in row order
    First,
    CountDistinct,
}

impl Reduction {
    pub fn name(&self) -> &'static str {
        match self {
            Reduction::Sum => "sum",
            Reduction::Mean => "mean",
            Reduction::Count => "count",
            Reduction::Min => "min",
            Reduction::Max => "max",
            Reduction::Std => "std",
            Reduction::Median => "median",
            Reduction::First => "first",
            Reduction::CountDistinct => "count_distinct",
        }
    }

    fn needs_numeric(&self) -> bool {
        matches!(self, Reduction::Sum | Reduction::Mean | Reduction::Std | Reduction::Median)
    }

    fn output_type(&self, input: ColumnType) -> ColumnType {
        match self {
            Reduction::Min | Reduction::Max | Reduction::First => input,
            _ => ColumnType::Number,
        }
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Reduction {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Reduction::Sum),
            "mean" | "avg" => Ok(Reduction::Mean),
            "count" => Ok(Reduction::Count),
            "min" => Ok(Reduction::Min),
            "max" => Ok(Reduction::Max),
            "std" => Ok(Reduction::Std),
            "median" => Ok(Reduction::Median),
            "first" => Ok(Reduction::First),
            "count_distinct" | "nunique" => Ok(Reduction::CountDistinct),
            other => Err(AggregateError::InvalidOption(format!("unknown reduction '{}'", other))),
        }
    }
}

/// One `(column, reduction)` pair, with an optional output name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionSpec {
    pub column: String,
    pub reduction: Reduction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ReductionSpec {
    pub fn new(column: impl Into<String>, reduction: Reduction) -> Self {
        Self {
            column: column.into(),
            reduction,
            alias: None,
        }
    }

    /// Count rows per group, independent of any column's nulls
    pub fn count_rows() -> Self {
        Self::new(ROW_COUNT_COLUMN, Reduction::Count)
    }

    pub fn named(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Column name of this reduction in the derived table
    pub fn output_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None if self.column == ROW_COUNT_COLUMN => "count",
            None => &self.column,
        }
    }
}

/// Reduction resolved against a table
struct BoundReduction<'s> {
    spec: &'s ReductionSpec,
    /// `None` for the row-count pseudo-column
    index: Option<usize>,
    output: Column,
}

/// Filter, group and reduce a table
///
/// **Public** - main entry point of the aggregation engine
///
/// # Arguments
/// * `table` - Source table
/// * `filters` - Conjunctive row filters (may be empty)
/// * `group_keys` - Columns whose distinct value tuples define groups; empty
///   means one grand-total group
/// * `reductions` - Reductions computed independently per group
///
/// # Returns
/// Derived table: group key columns followed by one column per reduction
///
/// # Errors
/// * `AggregateError::MissingColumn` - a key or reduction column is absent
/// * `AggregateError::TypeMismatch` - numeric reduction over a non-numeric column
/// * `AggregateError::EmptyGroup` - mean/std/median/min/max with no values
/// * `AggregateError::InvalidOption` - duplicate output names
pub fn aggregate(
    table: &Table,
    filters: &[Filter],
    group_keys: &[&str],
    reductions: &[ReductionSpec],
) -> Result<Table, AggregateError> {
    let filtered = apply_filters(table, filters)?;

    let key_indices = group_keys
        .iter()
        .map(|k| filtered.require_column(k))
        .collect::<Result<Vec<_>, _>>()?;
    let bound = bind_reductions(&filtered, group_keys, reductions)?;

    let groups = partition(&filtered, &key_indices);
    debug!(
        "Aggregating {} rows into {} groups by {:?}",
        filtered.len(),
        groups.len(),
        group_keys
    );

    let mut columns: Vec<Column> = key_indices
        .iter()
        .map(|&i| filtered.columns()[i].clone())
        .collect();
    columns.extend(bound.iter().map(|b| b.output.clone()));

    let rows = groups
        .into_iter()
        .map(|(key, members)| {
            let mut row = key;
            for b in &bound {
                row.push(reduce(&filtered, b, &members)?);
            }
            Ok(row)
        })
        .collect::<Result<Vec<_>, AggregateError>>()?;

    Table::from_rows(columns, rows)
}

fn bind_reductions<'s>(
    table: &Table,
    group_keys: &[&str],
    reductions: &'s [ReductionSpec],
) -> Result<Vec<BoundReduction<'s>>, AggregateError> {
    let mut names: HashSet<&str> = group_keys.iter().copied().collect();
    let mut bound = Vec::with_capacity(reductions.len());

    for spec in reductions {
        if !names.insert(spec.output_name()) {
            return Err(AggregateError::InvalidOption(format!(
                "duplicate output column '{}'",
                spec.output_name()
            )));
        }

        let (index, output_type) = if spec.column == ROW_COUNT_COLUMN {
            if spec.reduction != Reduction::Count {
                return Err(AggregateError::InvalidOption(format!(
                    "'{}' only supports count, not {}",
                    ROW_COUNT_COLUMN, spec.reduction
                )));
            }
            (None, ColumnType::Number)
        } else {
            let index = if spec.reduction.needs_numeric() {
                table.require_numeric(&spec.column)?
            } else {
                table.require_column(&spec.column)?
            };
            (Some(index), spec.reduction.output_type(table.columns()[index].kind))
        };

        bound.push(BoundReduction {
            spec,
            index,
            output: Column::new(spec.output_name(), output_type),
        });
    }

    Ok(bound)
}

/// Split row indices into groups, preserving first-seen group order
fn partition(table: &Table, key_indices: &[usize]) -> Vec<(Vec<Value>, Vec<usize>)> {
    if key_indices.is_empty() {
        return vec![(Vec::new(), (0..table.len()).collect())];
    }

    let mut lookup: HashMap<Vec<ValueKey>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Value>, Vec<usize>)> = Vec::new();

    for (ri, row) in table.raw_rows().iter().enumerate() {
        let key: Vec<ValueKey> = key_indices.iter().map(|&i| row[i].key()).collect();
        let slot = *lookup.entry(key).or_insert_with(|| {
            groups.push((key_indices.iter().map(|&i| row[i].clone()).collect(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(ri);
    }

    groups
}

fn reduce(table: &Table, bound: &BoundReduction<'_>, members: &[usize]) -> Result<Value, AggregateError> {
    let Some(ci) = bound.index else {
        return Ok(Value::Number(members.len() as f64));
    };

    let rows = table.raw_rows();
    let values: Vec<&Value> = members.iter().map(|&ri| &rows[ri][ci]).filter(|v| !v.is_null()).collect();
    let empty = || AggregateError::EmptyGroup {
        column: bound.spec.column.clone(),
    };
    let numbers = || values.iter().filter_map(|v| v.as_f64()).collect::<Vec<f64>>();

    let result = match bound.spec.reduction {
        Reduction::Count => Value::Number(values.len() as f64),
        Reduction::CountDistinct => {
            let distinct: HashSet<ValueKey> = values.iter().map(|v| v.key()).collect();
            Value::Number(distinct.len() as f64)
        }
        Reduction::First => values.first().map(|v| (*v).clone()).unwrap_or(Value::Null),
        Reduction::Sum => Value::Number(numbers().iter().sum()),
        Reduction::Mean => Value::Number(mean(&numbers()).ok_or_else(empty)?),
        Reduction::Median => Value::Number(median(&numbers()).ok_or_else(empty)?),
        Reduction::Std => Value::Number(sample_std(&numbers()).ok_or_else(empty)?),
        Reduction::Min => extreme(values.iter().copied(), Ordering::Less)
            .map(|(_, v)| v.clone())
            .ok_or_else(empty)?,
        Reduction::Max => extreme(values.iter().copied(), Ordering::Greater)
            .map(|(_, v)| v.clone())
            .ok_or_else(empty)?,
    };

    Ok(result)
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Sample standard deviation; needs at least two values
pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Position and value of the first extreme element (`Greater` = max)
fn extreme<'v>(values: impl Iterator<Item = &'v Value>, want: Ordering) -> Option<(usize, &'v Value)> {
    let mut best: Option<(usize, &Value)> = None;
    for (i, v) in values.enumerate() {
        if v.is_null() {
            continue;
        }
        match best {
            None => best = Some((i, v)),
            Some((_, current)) if v.compare(current) == Some(want) => best = Some((i, v)),
            _ => {}
        }
    }
    best
}

/// Row holding the largest value of a column; ties go to the first row
///
/// # Errors
/// * `AggregateError::MissingColumn` - column absent
/// * `AggregateError::EmptyGroup` - no non-null values
pub fn row_at_max<'t>(table: &'t Table, column: &str) -> Result<RowRef<'t>, AggregateError> {
    row_at_extreme(table, column, Ordering::Greater)
}

/// Row holding the smallest value of a column; ties go to the first row
pub fn row_at_min<'t>(table: &'t Table, column: &str) -> Result<RowRef<'t>, AggregateError> {
    row_at_extreme(table, column, Ordering::Less)
}

fn row_at_extreme<'t>(table: &'t Table, column: &str, want: Ordering) -> Result<RowRef<'t>, AggregateError> {
    let ci = table.require_column(column)?;
    let (index, _) = extreme(table.raw_rows().iter().map(|r| &r[ci]), want).ok_or_else(|| {
        AggregateError::EmptyGroup {
            column: column.to_string(),
        }
    })?;
    table.row(index).ok_or_else(|| AggregateError::EmptyGroup {
        column: column.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sales() -> Table {
        Table::infer(
            &["channel", "region", "revenue"],
            vec![
                vec!["Email".into(), "North".into(), 100.0.into()],
                vec!["Search".into(), "South".into(), 300.0.into()],
                vec!["Email".into(), "South".into(), 50.0.into()],
                vec!["Social".into(), "North".into(), Value::Null],
                vec!["Search".into(), "North".into(), 300.0.into()],
            ],
        )
        .unwrap()
    }

    fn column(table: &Table, name: &str) -> Vec<Value> {
        table.column_values(name).unwrap().into_iter().cloned().collect()
    }

    #[test]
    fn test_grand_total_without_keys() {
        let result = aggregate(&sales(), &[], &[], &[ReductionSpec::new("revenue", Reduction::Sum)]).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(column(&result, "revenue"), vec![Value::Number(750.0)]);
    }

    #[test]
    fn test_group_counts_sum_to_row_count() {
        let result = aggregate(&sales(), &[], &["region"], &[ReductionSpec::count_rows()]).unwrap();
        let total: f64 = column(&result, "count").iter().filter_map(Value::as_f64).sum();
        assert_eq!(total, 5.0);
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let result = aggregate(
            &sales(),
            &[],
            &["channel"],
            &[
                ReductionSpec::new("revenue", Reduction::Sum),
                ReductionSpec::new("revenue", Reduction::Count).named("orders"),
            ],
        )
        .unwrap();

        assert_eq!(result.column_names(), vec!["channel", "revenue", "orders"]);
        assert_eq!(
            column(&result, "channel"),
            vec![Value::from("Email"), Value::from("Search"), Value::from("Social")]
        );
        assert_eq!(
            column(&result, "revenue"),
            vec![Value::from(150.0), Value::from(600.0), Value::from(0.0)]
        );
        // Count skips nulls
        assert_eq!(column(&result, "orders"), vec![Value::from(2.0), Value::from(2.0), Value::from(0.0)]);
    }

    #[test]
    fn test_mean_over_empty_group_fails() {
        let result = aggregate(&sales(), &[], &["channel"], &[ReductionSpec::new("revenue", Reduction::Mean)]);
        assert_eq!(
            result.unwrap_err(),
            AggregateError::EmptyGroup {
                column: "revenue".to_string()
            }
        );
    }

    #[test]
    fn test_std_and_median() {
        let filters = vec![Filter::is_in("channel", ["Email", "Search"])];
        let result = aggregate(
            &sales(),
            &filters,
            &[],
            &[
                ReductionSpec::new("revenue", Reduction::Std),
                ReductionSpec::new("revenue", Reduction::Median).named("median"),
            ],
        )
        .unwrap();

        let std = column(&result, "revenue")[0].as_f64().unwrap();
        // values 100, 300, 50, 300 -> sqrt(51875 / 3)
        assert!((std - 131.498).abs() < 1e-3);
        assert_eq!(column(&result, "median"), vec![Value::Number(200.0)]);
    }

    #[test]
    fn test_std_of_single_value_is_empty_group() {
        let filters = vec![Filter::eq("channel", "Social")];
        let single = vec![Filter::eq("region", "South"), Filter::eq("channel", "Email")];
        let std = [ReductionSpec::new("revenue", Reduction::Std)];

        // Social has only a null revenue; Email/South has one value
        for filters in [filters, single] {
            assert_eq!(
                aggregate(&sales(), &filters, &[], &std).unwrap_err(),
                AggregateError::EmptyGroup {
                    column: "revenue".to_string()
                }
            );
        }
    }

    #[test]
    fn test_min_max_first_keep_input_type() {
        let result = aggregate(
            &sales(),
            &[],
            &["region"],
            &[
                ReductionSpec::new("channel", Reduction::Min),
                ReductionSpec::new("channel", Reduction::First).named("first_channel"),
                ReductionSpec::new("channel", Reduction::CountDistinct).named("channels"),
            ],
        )
        .unwrap();
        assert_eq!(result.column_type("channel"), Some(ColumnType::Text));
        assert_eq!(column(&result, "channel"), vec![Value::from("Email"), Value::from("Email")]);
        assert_eq!(column(&result, "channels"), vec![Value::from(3.0), Value::from(2.0)]);
    }

    #[test]
    fn test_sum_over_text_is_type_mismatch() {
        let result = aggregate(&sales(), &[], &[], &[ReductionSpec::new("channel", Reduction::Sum)]);
        assert!(matches!(result, Err(AggregateError::TypeMismatch { .. })));
    }

    #[test]
    fn test_duplicate_output_names() {
        let result = aggregate(
            &sales(),
            &[],
            &[],
            &[
                ReductionSpec::new("revenue", Reduction::Sum),
                ReductionSpec::new("revenue", Reduction::Max),
            ],
        );
        assert!(matches!(result, Err(AggregateError::InvalidOption(_))));
    }

    #[test]
    fn test_missing_group_key() {
        let result = aggregate(&sales(), &[], &["state"], &[ReductionSpec::count_rows()]);
        assert_eq!(result.unwrap_err(), AggregateError::MissingColumn("state".to_string()));
    }

    #[test]
    fn test_row_at_max_first_tie_wins() {
        let table = sales();
        let row = row_at_max(&table, "revenue").unwrap();
        assert_eq!(row.index(), 1);
        assert_eq!(row.get("region"), Some(&Value::text("South")));
    }

    #[test]
    fn test_row_at_min_skips_nulls() {
        let table = sales();
        let row = row_at_min(&table, "revenue").unwrap();
        assert_eq!(row.get("revenue"), Some(&Value::Number(50.0)));
    }

    #[test]
    fn test_row_at_max_empty_table() {
        let table = sales().head(0);
        assert!(matches!(row_at_max(&table, "revenue"), Err(AggregateError::EmptyGroup { .. })));
    }

    #[test]
    fn test_reduction_from_str() {
        assert_eq!("nunique".parse::<Reduction>().unwrap(), Reduction::CountDistinct);
        assert!("mode".parse::<Reduction>().is_err());
    }
}
