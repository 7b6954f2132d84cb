//! Lead scoring model evaluation.

use super::{MetricCard, PageId, PageReport, Panel};
use crate::aggregator::describe;
use crate::chart::{
    confusion_matrix, confusion_matrix_chart, labels_from_column, prepare, scores_from_column, threshold_labels,
    ChartKind, ChartOptions, ColumnBindings, ConfusionMatrix,
};
use crate::output::format::format_percent;
use crate::source::{Dataset, SortOrder, Table, TableCache};
use crate::utils::config::{DashboardConfig, AUC_EXCELLENT, AUC_FAIR, AUC_GOOD};
use crate::utils::error::{ChartError, PageError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD: f64 = 0.5;
pub const PROBABILITY_BINS: i64 = 30;
const TOP_FEATURES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlSelections {
    /// Probability cut-off for threshold analysis, in `[0, 1]`
    pub threshold: f64,
    pub feature_order: SortOrder,
    pub top_features: Option<usize>,
}

impl Default for MlSelections {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            feature_order: SortOrder::Descending,
            top_features: None,
        }
    }
}

/// Qualitative band of an ROC AUC
pub fn auc_rating(auc: f64) -> &'static str {
    if auc > AUC_EXCELLENT {
        "Excellent"
    } else if auc > AUC_GOOD {
        "Good"
    } else if auc > AUC_FAIR {
        "Fair"
    } else {
        "Poor"
    }
}

pub fn build(cache: &TableCache, selections: &MlSelections, _config: &DashboardConfig) -> PageReport {
    let mut report = PageReport::new(PageId::Ml);
    let leads = || cache.load_dataset(Dataset::LeadScoringResults);

    report.add_metrics("Model Performance", || {
        let leads = leads()?;
        let cm = confusion_matrix(
            &labels_from_column(&leads, "actual_converted")?,
            &labels_from_column(&leads, "predicted_class")?,
        )?;
        Ok(rate_cards(&cm, "", true))
    });

    report.push(Panel::chart("Confusion Matrix", || {
        Ok(prepare(
            &*leads()?,
            ChartKind::ConfusionMatrix,
            &ColumnBindings::xy("actual_converted", "predicted_class"),
            &ChartOptions::titled("Confusion Matrix"),
        )?)
    }));

    report.push(Panel::chart("ROC Curve", || {
        Ok(prepare(
            &*leads()?,
            ChartKind::RocCurve,
            &ColumnBindings::xy("actual_converted", "predicted_probability"),
            &ChartOptions::titled("ROC Curve"),
        )?)
    }));

    // AUC card reads the chart just built
    let auc = report
        .panel("ROC Curve")
        .and_then(|p| p.chart_description())
        .and_then(|c| c.stat("auc"));
    if let Some(auc) = auc {
        report
            .metrics
            .push(MetricCard::new("AUC", format!("{:.3}", auc)).with_delta(auc_rating(auc)));
    }

    let threshold = selections.threshold;
    report.push(Panel::chart(format!("Threshold Analysis ({:.2})", threshold), || {
        let cm = threshold_matrix(&*leads()?, threshold)?;
        Ok(confusion_matrix_chart(
            &cm,
            ChartOptions::titled(format!("Confusion Matrix at {:.2}", threshold)),
        )?)
    }));
    report.add_metrics("Threshold Metrics", || {
        let cm = threshold_matrix(&*leads()?, threshold)?;
        let mut cards = rate_cards(&cm, " @ threshold", false);
        cards.push(MetricCard::new("False Positives @ threshold", cm.fp.to_string()));
        Ok(cards)
    });

    report.push(Panel::chart("Learning Curve", || {
        Ok(prepare(
            &*cache.load_dataset(Dataset::LearningCurve)?,
            ChartKind::LearningCurve,
            &ColumnBindings::new().with_x("training_size"),
            &ChartOptions::titled("Learning Curve"),
        )?)
    }));

    let features = || cache.load_dataset(Dataset::FeatureImportance);
    report.push(Panel::chart("Feature Importance", || {
        let mut options = ChartOptions::titled("Feature Importance").with_sort(selections.feature_order);
        if let Some(n) = selections.top_features {
            options = options.with_top_n(n);
        }
        Ok(prepare(
            &*features()?,
            ChartKind::FeatureImportance,
            &ColumnBindings::xy("feature", "importance").with_error("std"),
            &options,
        )?)
    }));

    report.push(Panel::table("Top Features", || {
        Ok(features()?
            .sort_by("importance", SortOrder::Descending)?
            .head(TOP_FEATURES)
            .select(&["feature", "importance"])?)
    }));

    report.push(Panel::chart("Prediction Distribution", || {
        let leads = leads()?;
        let summary = describe(&leads, "predicted_probability")?;
        let chart = prepare(
            &leads,
            ChartKind::Histogram,
            &ColumnBindings::new()
                .with_x("predicted_probability")
                .with_color("actual_converted"),
            &ChartOptions::titled("Predicted Probability Distribution").with_bins(PROBABILITY_BINS),
        )?;
        let chart = chart
            .with_stat("mean", summary.mean)
            .with_stat("median", summary.median);
        Ok(match summary.std {
            Some(std) => chart.with_stat("std", std),
            None => chart,
        })
    }));

    report
}

fn threshold_matrix(leads: &Table, threshold: f64) -> Result<ConfusionMatrix, PageError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ChartError::InvalidOption(format!("threshold {} is outside [0, 1]", threshold)).into());
    }
    let actual = labels_from_column(leads, "actual_converted")?;
    let predicted = threshold_labels(&scores_from_column(leads, "predicted_probability")?, threshold);
    Ok(confusion_matrix(&actual, &predicted)?)
}

fn rate_cards(cm: &ConfusionMatrix, suffix: &str, with_f1: bool) -> Vec<MetricCard> {
    let mut cards = vec![
        MetricCard::new(format!("Accuracy{}", suffix), format_percent(cm.accuracy(), 2)),
        MetricCard::new(format!("Precision{}", suffix), format_percent(cm.precision(), 2)),
        MetricCard::new(format!("Recall{}", suffix), format_percent(cm.recall(), 2)),
    ];
    if with_f1 {
        cards.push(MetricCard::new(format!("F1 Score{}", suffix), format_percent(cm.f1(), 2)));
    }
    cards
}
