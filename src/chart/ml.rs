//! Model evaluation charts: confusion matrix, ROC, feature importance and
//! learning curves.
//!
//! Labels are binary: `0` is the negative class and `1` the positive one.

use super::description::{ChartDescription, ChartKind, ChartOptions, ColumnBindings, Orientation};
use crate::source::table::{Column, ColumnType, SortOrder, Table, Value};
use crate::utils::error::ChartError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Binary confusion counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tp: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tn + self.tp, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// Harmonic mean of precision and recall; 0 when both are 0
    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn check_labels(labels: &[u8]) -> Result<(), ChartError> {
    match labels.iter().find(|&&l| l > 1) {
        Some(bad) => Err(ChartError::InvalidOption(format!("label {} is not 0 or 1", bad))),
        None => Ok(()),
    }
}

fn check_lengths(actual: usize, predicted: usize) -> Result<(), ChartError> {
    if actual != predicted {
        return Err(ChartError::LengthMismatch { actual, predicted });
    }
    if actual == 0 {
        return Err(ChartError::EmptyInput);
    }
    Ok(())
}

/// Count true/false positives and negatives
///
/// # Errors
/// * `ChartError::LengthMismatch` - sequences differ in length
/// * `ChartError::EmptyInput` - both sequences empty
/// * `ChartError::InvalidOption` - a label other than 0 or 1
pub fn confusion_matrix(actual: &[u8], predicted: &[u8]) -> Result<ConfusionMatrix, ChartError> {
    check_lengths(actual.len(), predicted.len())?;
    check_labels(actual)?;
    check_labels(predicted)?;

    let mut cm = ConfusionMatrix::default();
    for (&a, &p) in actual.iter().zip(predicted) {
        match (a, p) {
            (0, 0) => cm.tn += 1,
            (0, _) => cm.fp += 1,
            (_, 0) => cm.fn_ += 1,
            _ => cm.tp += 1,
        }
    }
    Ok(cm)
}

/// Classify scores at a cut-off: `score >= threshold` is positive
pub fn threshold_labels(scores: &[f64], threshold: f64) -> Vec<u8> {
    scores.iter().map(|&s| u8::from(s >= threshold)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub fpr: f64,
    pub tpr: f64,
    /// Score cut-off producing this point; `+inf` for the origin
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
    pub auc: f64,
}

/// Receiver operating characteristic curve and its area
///
/// Sweeps the distinct scores from high to low, emitting one point per
/// distinct score after the `(0, 0)` origin. AUC uses the trapezoid rule.
///
/// # Errors
/// * `ChartError::LengthMismatch` / `ChartError::EmptyInput`
/// * `ChartError::InvalidOption` - bad label or non-finite score
/// * `ChartError::SingleClass` - every label is the same
pub fn roc_curve(actual: &[u8], scores: &[f64]) -> Result<RocCurve, ChartError> {
    check_lengths(actual.len(), scores.len())?;
    check_labels(actual)?;
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(ChartError::InvalidOption(format!("score {} is not finite", bad)));
    }

    let positives = actual.iter().filter(|&&l| l == 1).count();
    let negatives = actual.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(ChartError::SingleClass);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut points = vec![RocPoint {
        fpr: 0.0,
        tpr: 0.0,
        threshold: f64::INFINITY,
    }];
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < order.len() {
        let score = scores[order[i]];
        while i < order.len() && scores[order[i]].total_cmp(&score) == Ordering::Equal {
            if actual[order[i]] == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(RocPoint {
            fpr: ratio(fp, negatives),
            tpr: ratio(tp, positives),
            threshold: score,
        });
    }

    let auc = points
        .windows(2)
        .map(|w| (w[1].fpr - w[0].fpr) * (w[0].tpr + w[1].tpr) / 2.0)
        .sum();
    debug!("ROC over {} samples: {} points, auc {:.4}", actual.len(), points.len(), auc);

    Ok(RocCurve { points, auc })
}

/// Binary labels from a numeric (0/1) or bool column
pub fn labels_from_column(table: &Table, column: &str) -> Result<Vec<u8>, ChartError> {
    let ci = table.require_column(column)?;
    table
        .raw_rows()
        .iter()
        .map(|row| match &row[ci] {
            Value::Bool(b) => Ok(u8::from(*b)),
            Value::Number(n) if *n == 0.0 => Ok(0),
            Value::Number(n) if *n == 1.0 => Ok(1),
            other => Err(ChartError::InvalidOption(format!(
                "column '{}' holds non-binary label '{}'",
                column, other
            ))),
        })
        .collect()
}

/// Numeric scores from a column; nulls are rejected
pub fn scores_from_column(table: &Table, column: &str) -> Result<Vec<f64>, ChartError> {
    table
        .numeric_column(column)?
        .into_iter()
        .map(|s| s.ok_or_else(|| ChartError::InvalidOption(format!("column '{}' has missing scores", column))))
        .collect()
}

/// Heatmap-style description of a confusion matrix with its rates as stats
pub fn confusion_matrix_chart(cm: &ConfusionMatrix, options: ChartOptions) -> Result<ChartDescription, ChartError> {
    let count = |n: usize| Value::Number(n as f64);
    let data = Table::from_rows(
        vec![
            Column::new("actual", ColumnType::Text),
            Column::new("predicted_negative", ColumnType::Number),
            Column::new("predicted_positive", ColumnType::Number),
        ],
        vec![
            vec![Value::text("negative"), count(cm.tn), count(cm.fp)],
            vec![Value::text("positive"), count(cm.fn_), count(cm.tp)],
        ],
    )?;

    Ok(
        ChartDescription::new(ChartKind::ConfusionMatrix, ColumnBindings::new().with_x("actual"), options, data)
            .with_stat("tn", cm.tn as f64)
            .with_stat("fp", cm.fp as f64)
            .with_stat("fn", cm.fn_ as f64)
            .with_stat("tp", cm.tp as f64)
            .with_stat("accuracy", cm.accuracy())
            .with_stat("precision", cm.precision())
            .with_stat("recall", cm.recall())
            .with_stat("f1", cm.f1()),
    )
}

/// Line description of an ROC curve with `auc` as a stat
pub fn roc_chart(curve: &RocCurve, options: ChartOptions) -> Result<ChartDescription, ChartError> {
    let data = Table::from_rows(
        vec![
            Column::new("fpr", ColumnType::Number),
            Column::new("tpr", ColumnType::Number),
            Column::new("threshold", ColumnType::Number),
        ],
        curve
            .points
            .iter()
            .map(|p| vec![p.fpr.into(), p.tpr.into(), p.threshold.into()])
            .collect(),
    )?;

    Ok(
        ChartDescription::new(ChartKind::RocCurve, ColumnBindings::xy("fpr", "tpr"), options, data)
            .with_stat("auc", curve.auc),
    )
}

/// Ranked horizontal bar of feature importances
///
/// **Public** - model explainability panel
///
/// # Arguments
/// * `bindings` - `x` names features (default `feature`), `y` holds the
///   importance (default `importance`), `error` the optional std column
/// * `order` - Order of the kept bars
/// * `top_n` - Keep only the N most important features
///
/// # Returns
/// Description without error bars when `error` is unset or absent
///
/// # Errors
/// * `ChartError::MissingColumn` - feature or importance column absent
/// * `ChartError::EmptyInput` - no features
/// * `ChartError::InvalidOption` - `top_n` of zero
pub fn feature_importance(
    table: &Table,
    bindings: &ColumnBindings,
    order: SortOrder,
    top_n: Option<usize>,
) -> Result<ChartDescription, ChartError> {
    let feature = bindings.x.as_deref().unwrap_or("feature");
    let importance = bindings.y.as_deref().unwrap_or("importance");
    table.require_column(feature)?;
    table.numeric_column(importance)?;

    if table.is_empty() {
        return Err(ChartError::EmptyInput);
    }
    if top_n == Some(0) {
        return Err(ChartError::InvalidOption("top_n must be positive".to_string()));
    }

    let error = bindings.error.as_deref().filter(|c| table.has_column(c));
    if let Some(missing) = bindings.error.as_deref().filter(|c| !table.has_column(c)) {
        debug!("Std column '{}' absent; drawing without error bars", missing);
    }

    let mut resolved = ColumnBindings::xy(feature, importance);
    let mut columns = vec![feature, importance];
    if let Some(err) = error {
        resolved = resolved.with_error(err);
        columns.push(err);
    }

    let ranked = table.sort_by(importance, SortOrder::Descending)?;
    let kept = match top_n {
        Some(n) => ranked.head(n),
        None => ranked,
    };
    let data = kept.select(&columns)?.sort_by(importance, order)?;

    let options = ChartOptions {
        orientation: Orientation::Horizontal,
        sort: Some(order),
        top_n,
        ..ChartOptions::titled("Feature Importance")
    };
    Ok(ChartDescription::new(ChartKind::FeatureImportance, resolved, options, data))
}

/// Training and validation scores over training set size
///
/// `x` is `bindings.x` or the first numeric column; every other numeric
/// column is a score series. The `final_gap` stat is the first series minus
/// the second at the last row.
///
/// # Errors
/// * `ChartError::InsufficientColumns` - fewer than two numeric columns
/// * `ChartError::MissingColumn` - `bindings.x` set but absent
pub fn learning_curve(table: &Table, bindings: &ColumnBindings) -> Result<ChartDescription, ChartError> {
    let numeric = table.numeric_columns();
    if numeric.len() < 2 {
        return Err(ChartError::InsufficientColumns { found: numeric.len() });
    }

    let x = match bindings.x.as_deref() {
        Some(x) => {
            table.numeric_column(x)?;
            x
        }
        None => numeric[0],
    };
    let series: Vec<&str> = numeric.iter().copied().filter(|c| *c != x).collect();
    if series.is_empty() {
        return Err(ChartError::InsufficientColumns { found: 1 });
    }

    let mut columns = vec![x];
    columns.extend(&series);
    let data = table.select(&columns)?.sort_by(x, SortOrder::Ascending)?;

    let mut resolved = ColumnBindings::new().with_x(x).with_y(series[0]);
    if let Some(second) = series.get(1) {
        resolved = resolved.with_color(*second);
    }
    let mut description = ChartDescription::new(
        ChartKind::LearningCurve,
        resolved,
        ChartOptions::titled("Learning Curve - Model Diagnostics"),
        data,
    );

    if series.len() >= 2 {
        let last = description.data.len().checked_sub(1).and_then(|i| description.data.row(i));
        let gap = last.and_then(|row| {
            let train = row.get(series[0])?.as_f64()?;
            let validation = row.get(series[1])?.as_f64()?;
            Some(train - validation)
        });
        if let Some(gap) = gap {
            description = description.with_stat("final_gap", gap);
        }
    }
    Ok(description)
}
