//! Turns a table plus bindings and options into a [`ChartDescription`].

use super::description::{BarNorm, Binding, ChartDescription, ChartKind, ChartOptions, ColumnBindings};
use super::ml::{
    confusion_matrix, confusion_matrix_chart, feature_importance, labels_from_column, learning_curve, roc_chart,
    roc_curve, scores_from_column,
};
use crate::source::table::{SortOrder, Table};
use crate::utils::config::DEFAULT_DONUT_HOLE;
use crate::utils::error::ChartError;
use log::debug;

/// Prepare a chart description
///
/// **Public** - single entry point for every chart on every page
///
/// # Arguments
/// * `table` - Source or derived table
/// * `kind` - Chart kind
/// * `bindings` - Column roles; each kind has required roles
/// * `options` - Kind-specific options
///
/// # Returns
/// Description whose data is `table` projected onto the bound columns
///
/// # Errors
/// * `ChartError::MissingColumn` - a bound column is absent from `table`
/// * `ChartError::InvalidOption` - unset required binding or an option
///   outside its domain
/// * ML kinds report the errors of their evaluation functions
///
/// # Example
/// ```ignore
/// let chart = prepare(&revenue_by_channel, ChartKind::Bar,
///     &ColumnBindings::xy("channel", "revenue"), &ChartOptions::titled("Revenue"))?;
/// ```
pub fn prepare(
    table: &Table,
    kind: ChartKind,
    bindings: &ColumnBindings,
    options: &ChartOptions,
) -> Result<ChartDescription, ChartError> {
    validate_options(kind, options)?;
    for binding in kind.required_bindings() {
        if bindings.get(*binding).is_none() {
            return Err(ChartError::InvalidOption(format!(
                "{} chart needs a '{}' binding",
                kind,
                binding.name()
            )));
        }
    }

    let mut options = options.clone();
    if kind == ChartKind::Donut && options.hole.is_none() {
        options.hole = Some(DEFAULT_DONUT_HOLE);
    }

    debug!("Preparing {} chart '{}' from {} rows", kind, options.title, table.len());

    match kind {
        ChartKind::ConfusionMatrix => {
            let (actual, predicted) = xy(bindings)?;
            let cm = confusion_matrix(&labels_from_column(table, actual)?, &labels_from_column(table, predicted)?)?;
            confusion_matrix_chart(&cm, options)
        }
        ChartKind::RocCurve => {
            let (actual, score) = xy(bindings)?;
            let curve = roc_curve(&labels_from_column(table, actual)?, &scores_from_column(table, score)?)?;
            roc_chart(&curve, options)
        }
        ChartKind::FeatureImportance => {
            let order = options.sort.unwrap_or(SortOrder::Ascending);
            let description = feature_importance(table, bindings, order, options.top_n)?;
            Ok(retitle(description, &options.title))
        }
        ChartKind::LearningCurve => Ok(retitle(learning_curve(table, bindings)?, &options.title)),
        _ => prepare_plain(table, kind, bindings, options),
    }
}

fn xy(bindings: &ColumnBindings) -> Result<(&str, &str), ChartError> {
    match (bindings.x.as_deref(), bindings.y.as_deref()) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(ChartError::InvalidOption("x and y bindings are required".to_string())),
    }
}

fn retitle(mut description: ChartDescription, title: &str) -> ChartDescription {
    if !title.is_empty() {
        description.title = title.to_string();
        description.options.title = title.to_string();
    }
    description
}

fn validate_options(kind: ChartKind, options: &ChartOptions) -> Result<(), ChartError> {
    match (kind, options.hole) {
        (ChartKind::Donut, Some(hole)) if !(0.0..1.0).contains(&hole) => {
            return Err(ChartError::InvalidOption(format!("donut hole {} is outside [0, 1)", hole)));
        }
        (ChartKind::Pie, Some(hole)) if hole != 0.0 => {
            return Err(ChartError::InvalidOption(format!(
                "pie charts have no hole (got {}); use a donut",
                hole
            )));
        }
        (ChartKind::Pie | ChartKind::Donut, _) | (_, None) => {}
        (_, Some(_)) => {
            return Err(ChartError::InvalidOption(format!("{} charts take no hole option", kind)));
        }
    }

    match options.bins {
        Some(bins) if bins <= 0 => {
            return Err(ChartError::InvalidOption(format!("histogram bins must be positive, got {}", bins)));
        }
        Some(_) if kind != ChartKind::Histogram => {
            return Err(ChartError::InvalidOption(format!("{} charts take no bins option", kind)));
        }
        _ => {}
    }

    if options.bar_norm == BarNorm::Percent && !matches!(kind, ChartKind::Bar | ChartKind::Area) {
        return Err(ChartError::InvalidOption(format!(
            "percent normalisation only applies to bar and area charts, not {}",
            kind
        )));
    }

    if options.top_n == Some(0) {
        return Err(ChartError::InvalidOption("top_n must be positive".to_string()));
    }

    Ok(())
}

fn prepare_plain(
    table: &Table,
    kind: ChartKind,
    bindings: &ColumnBindings,
    options: ChartOptions,
) -> Result<ChartDescription, ChartError> {
    for column in bindings.columns() {
        table.require_column(column)?;
    }
    if kind.needs_numeric_y() {
        if let Some(y) = bindings.get(Binding::Y) {
            table.numeric_column(y)?;
        }
    }
    if let Some(size) = bindings.get(Binding::Size) {
        table.numeric_column(size)?;
    }

    let mut columns = bindings.columns();
    if kind == ChartKind::Heatmap {
        let label = bindings.x.as_deref().unwrap_or_default();
        let cells: Vec<&str> = table.numeric_columns().into_iter().filter(|c| *c != label).collect();
        if cells.is_empty() {
            return Err(ChartError::InsufficientColumns { found: 0 });
        }
        for cell in cells {
            if !columns.contains(&cell) {
                columns.push(cell);
            }
        }
    }

    let mut data = table.select(&columns)?;
    if let (Some(order), Some(y)) = (options.sort, bindings.y.as_deref()) {
        data = data.sort_by(y, order)?;
    }

    let mut description = ChartDescription::new(kind, bindings.clone(), options, data);

    match kind {
        ChartKind::Scatter if description.options.trendline => {
            let (slope, intercept) = least_squares(&description.data, bindings)?;
            description = description.with_stat("slope", slope).with_stat("intercept", intercept);
        }
        ChartKind::Pie | ChartKind::Donut => {
            let total = sum_y(&description.data, bindings)?;
            description = description.with_stat("total", total);
        }
        _ => {}
    }

    Ok(description)
}

fn sum_y(data: &Table, bindings: &ColumnBindings) -> Result<f64, ChartError> {
    let y = bindings.y.as_deref().unwrap_or_default();
    Ok(data.numeric_column(y)?.into_iter().flatten().sum())
}

/// Ordinary least-squares fit of `y` on `x` over complete rows
fn least_squares(data: &Table, bindings: &ColumnBindings) -> Result<(f64, f64), ChartError> {
    let (x, y) = xy(bindings)?;
    let points: Vec<(f64, f64)> = data
        .numeric_column(x)?
        .into_iter()
        .zip(data.numeric_column(y)?)
        .filter_map(|(a, b)| Some((a?, b?)))
        .collect();

    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p.0 - mx).powi(2)).sum();
    let sxy: f64 = points.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();

    if points.len() < 2 || sxx == 0.0 {
        return Err(ChartError::InvalidOption(
            "trendline needs at least two distinct x values".to_string(),
        ));
    }
    let slope = sxy / sxx;
    Ok((slope, my - slope * mx))
}
