//! Statistical helpers built on the engine: correlation, summaries, funnels.

use super::engine::{mean, median, sample_std};
use crate::source::table::{Column, ColumnType, SortOrder, Table, Value};
use crate::utils::error::AggregateError;
use serde::{Deserialize, Serialize};

/// Pearson correlation of two numeric columns
///
/// Only rows where both cells are non-null take part.
///
/// # Errors
/// * `AggregateError::EmptyGroup` - fewer than two complete pairs
/// * `AggregateError::InvalidOption` - one of the columns has zero variance
pub fn pearson(table: &Table, a: &str, b: &str) -> Result<f64, AggregateError> {
    let xs = table.numeric_column(a)?;
    let ys = table.numeric_column(b)?;
    let pairs: Vec<(f64, f64)> = xs
        .into_iter()
        .zip(ys)
        .filter_map(|(x, y)| Some((x?, y?)))
        .collect();

    if pairs.len() < 2 {
        return Err(AggregateError::EmptyGroup { column: format!("{}/{}", a, b) });
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }

    if sxx == 0.0 || syy == 0.0 {
        return Err(AggregateError::InvalidOption(format!(
            "correlation of '{}' and '{}' is undefined: zero variance",
            a, b
        )));
    }
    Ok(sxy / (sxx.sqrt() * syy.sqrt()))
}

/// Pairwise Pearson matrix, labelled by a leading `variable` column
pub fn correlation_matrix(table: &Table, columns: &[&str]) -> Result<Table, AggregateError> {
    let mut out_columns = vec![Column::new("variable", ColumnType::Text)];
    out_columns.extend(columns.iter().map(|c| Column::new(*c, ColumnType::Number)));

    let rows = columns
        .iter()
        .map(|a| {
            let mut row = vec![Value::text(*a)];
            for b in columns {
                let r = if a == b { 1.0 } else { pearson(table, a, b)? };
                row.push(Value::Number(r));
            }
            Ok(row)
        })
        .collect::<Result<Vec<_>, AggregateError>>()?;

    Table::from_rows(out_columns, rows)
}

/// Sign of the correlations [`correlation_pairs`] looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub a: String,
    pub b: String,
    pub r: f64,
}

/// Strong pairs from the upper triangle of a square correlation matrix
///
/// Cells are read positionally: row `i` pairs with the `i`-th numeric
/// column. `Positive` keeps `r > threshold`, `Negative` keeps
/// `r < -threshold`.
///
/// # Errors
/// * `AggregateError::MissingColumn` - `label_col` absent
/// * `AggregateError::InvalidOption` - matrix is not square
pub fn correlation_pairs(
    matrix: &Table,
    label_col: &str,
    threshold: f64,
    direction: Direction,
) -> Result<Vec<CorrelationPair>, AggregateError> {
    let li = matrix.require_column(label_col)?;
    let value_cols: Vec<usize> = matrix
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, c)| *i != li && c.kind == ColumnType::Number)
        .map(|(i, _)| i)
        .collect();

    if value_cols.len() != matrix.len() {
        return Err(AggregateError::InvalidOption(format!(
            "correlation matrix has {} rows but {} value columns",
            matrix.len(),
            value_cols.len()
        )));
    }

    let mut pairs = Vec::new();
    for (i, row) in matrix.rows().enumerate() {
        let values = row.values();
        for (j, &cj) in value_cols.iter().enumerate().skip(i + 1) {
            let Some(r) = values[cj].as_f64() else {
                continue;
            };
            let strong = match direction {
                Direction::Positive => r > threshold,
                Direction::Negative => r < -threshold,
            };
            if strong {
                pairs.push(CorrelationPair {
                    a: values[li].to_string(),
                    b: matrix.columns()[value_cols[j]].name.clone(),
                    r,
                });
            }
        }
    }
    Ok(pairs)
}

/// Summary statistics of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// `None` below two values
    pub std: Option<f64>,
}

/// Count, mean, median, extremes and sample std of a column (nulls skipped)
pub fn describe(table: &Table, column: &str) -> Result<Summary, AggregateError> {
    let values: Vec<f64> = table.numeric_column(column)?.into_iter().flatten().collect();
    let empty = || AggregateError::EmptyGroup { column: column.to_string() };

    Ok(Summary {
        count: values.len(),
        mean: mean(&values).ok_or_else(empty)?,
        median: median(&values).ok_or_else(empty)?,
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        std: sample_std(&values),
    })
}

/// Funnel stages sorted by descending count, with drop-off columns
///
/// Adds `drop_off_pct` (share lost since the previous stage, null for the
/// first) and `cumulative_loss_pct` (share lost since the first stage).
pub fn funnel_stages(table: &Table, stage_col: &str, count_col: &str) -> Result<Table, AggregateError> {
    table.require_column(stage_col)?;
    let sorted = table.sort_by(count_col, SortOrder::Descending)?;
    let counts = sorted.numeric_column(count_col)?;

    let top = counts.first().copied().flatten();
    let mut drop_off = Vec::with_capacity(counts.len());
    let mut cumulative = Vec::with_capacity(counts.len());
    for (i, count) in counts.iter().enumerate() {
        let previous = if i == 0 { None } else { counts[i - 1] };
        drop_off.push(loss_pct(previous, *count));
        cumulative.push(loss_pct(top, *count));
    }

    sorted
        .with_column(Column::new("drop_off_pct", ColumnType::Number), drop_off)?
        .with_column(Column::new("cumulative_loss_pct", ColumnType::Number), cumulative)
}

fn loss_pct(from: Option<f64>, to: Option<f64>) -> Value {
    match (from, to) {
        (Some(from), Some(to)) if from != 0.0 => Value::Number((from - to) / from * 100.0),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn customers() -> Table {
        Table::infer(
            &["income", "ltv", "flat"],
            vec![
                vec![10.0.into(), 1.0.into(), 5.0.into()],
                vec![20.0.into(), 2.0.into(), 5.0.into()],
                vec![30.0.into(), 3.0.into(), 5.0.into()],
                vec![Value::Null, 9.0.into(), 5.0.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_pearson_perfect_line() {
        let r = pearson(&customers(), "income", "ltv").unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_zero_variance() {
        assert!(matches!(
            pearson(&customers(), "income", "flat"),
            Err(AggregateError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_pearson_needs_two_pairs() {
        let table = customers().head(1);
        assert!(matches!(
            pearson(&table, "income", "ltv"),
            Err(AggregateError::EmptyGroup { .. })
        ));
    }

    #[test]
    fn test_correlation_pairs_upper_triangle() {
        let matrix = Table::infer(
            &["variable", "spend", "revenue", "returns"],
            vec![
                vec!["spend".into(), 1.0.into(), 0.9.into(), (-0.8).into()],
                vec!["revenue".into(), 0.9.into(), 1.0.into(), (-0.2).into()],
                vec!["returns".into(), (-0.8).into(), (-0.2).into(), 1.0.into()],
            ],
        )
        .unwrap();

        let positive = correlation_pairs(&matrix, "variable", 0.7, Direction::Positive).unwrap();
        assert_eq!(
            positive,
            vec![CorrelationPair {
                a: "spend".to_string(),
                b: "revenue".to_string(),
                r: 0.9
            }]
        );

        let negative = correlation_pairs(&matrix, "variable", 0.7, Direction::Negative).unwrap();
        assert_eq!(negative.len(), 1);
        assert_eq!(negative[0].b, "returns");
    }

    #[test]
    fn test_describe() {
        let summary = describe(&customers(), "income").unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.mean, 20.0);
        assert_eq!(summary.median, 20.0);
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.max, 30.0);
        assert_eq!(summary.std, Some(10.0));
    }

    #[test]
    fn test_funnel_stages() {
        let table = Table::infer(
            &["stage", "visitors"],
            vec![
                vec!["Interest".into(), 500.0.into()],
                vec!["Awareness".into(), 1000.0.into()],
                vec!["Purchase".into(), 100.0.into()],
            ],
        )
        .unwrap();
        let funnel = funnel_stages(&table, "stage", "visitors").unwrap();

        assert_eq!(
            funnel.column_values("stage").unwrap(),
            vec![&Value::text("Awareness"), &Value::text("Interest"), &Value::text("Purchase")]
        );
        assert_eq!(funnel.numeric_column("drop_off_pct").unwrap(), vec![None, Some(50.0), Some(80.0)]);
        assert_eq!(
            funnel.numeric_column("cumulative_loss_pct").unwrap(),
            vec![Some(0.0), Some(50.0), Some(90.0)]
        );
    }
}
