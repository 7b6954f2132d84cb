//! Attribution models, conversion funnel, correlations and customer journeys.

use super::{MetricCard, PageId, PageReport, Panel};
use crate::aggregator::{
    aggregate, correlation_matrix, correlation_pairs, funnel_stages, melt, pivot, row_at_max, CorrelationPair,
    Direction, Reduction, ReductionSpec,
};
use crate::chart::{prepare, ChartKind, ChartOptions, ColumnBindings};
use crate::output::format::{format_percent, format_thousands};
use crate::source::{Column, ColumnType, Dataset, SortOrder, Table, TableCache, Value};
use crate::utils::config::{DashboardConfig, STRONG_CORRELATION};
use crate::utils::error::{AggregateError, PageError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionSelections {
    /// Attribution model column; the first model when unset
    pub model: Option<String>,
}

pub fn build(cache: &TableCache, selections: &AttributionSelections, _config: &DashboardConfig) -> PageReport {
    let mut report = PageReport::new(PageId::Attribution);
    let attribution = || cache.load_dataset(Dataset::ChannelAttribution);
    let funnel = || cache.load_dataset(Dataset::FunnelData);

    report.push(Panel::chart("Attribution by Channel", || {
        let attribution = attribution()?;
        let model = selected_model(&attribution, selections)?;
        Ok(prepare(
            &attribution,
            ChartKind::Donut,
            &ColumnBindings::xy("channel", model.as_str()),
            &ChartOptions::titled(format!("{} Attribution", super::title_case(&model))),
        )?)
    }));

    report.push(Panel::table("Attribution Ranking", || {
        let attribution = attribution()?;
        let model = selected_model(&attribution, selections)?;
        Ok(attribution
            .select(&["channel", model.as_str()])?
            .sort_by(&model, SortOrder::Descending)?)
    }));

    report.push(Panel::table("Model Comparison", || {
        let attribution = attribution()?;
        let long = melt(&*attribution, "channel", &models(&attribution), "model", "credit")?;
        Ok(pivot(&long, "channel", "model", "credit")?)
    }));

    report.add_metrics("Model Consistency", || {
        let attribution = attribution()?;
        let model_names = models(&attribution);
        let long = melt(&*attribution, "channel", &model_names, "model", "credit")?;
        let spread = aggregate(
            &long,
            &[],
            &["channel"],
            &[ReductionSpec::new("credit", Reduction::Std).named("std")],
        )?;
        let inconsistent = row_at_max(&spread, "std")?;
        let channel = inconsistent.get("channel").map(ToString::to_string).unwrap_or_default();
        let std = inconsistent.get("std").and_then(Value::as_f64).unwrap_or(f64::NAN);
        Ok(vec![
            MetricCard::new("Most Inconsistent Channel", channel).with_delta(format!("std {:.2}", std)),
            MetricCard::new("Channels", format_thousands(attribution.len() as f64)),
            MetricCard::new("Attribution Models", model_names.len().to_string()),
        ])
    });

    report.push(Panel::chart("Conversion Funnel", || {
        Ok(prepare(
            &*funnel()?,
            ChartKind::Funnel,
            &ColumnBindings::xy("stage", "visitors"),
            &ChartOptions::titled("Conversion Funnel").with_sort(SortOrder::Descending),
        )?)
    }));

    report.push(Panel::table("Funnel Stages", || {
        Ok(funnel_stages(&*funnel()?, "stage", "visitors")?)
    }));

    report.add_metrics("Funnel Summary", || {
        let stages = funnel_stages(&*funnel()?, "stage", "visitors")?;
        let worst = row_at_max(&stages, "drop_off_pct")?;
        let worst_stage = worst.get("stage").map(ToString::to_string).unwrap_or_default();
        let worst_pct = worst.get("drop_off_pct").and_then(Value::as_f64).unwrap_or(f64::NAN);

        let visitors = stages.numeric_column("visitors")?;
        let (first, last) = match (visitors.first().copied().flatten(), visitors.last().copied().flatten()) {
            (Some(first), Some(last)) if first != 0.0 => (first, last),
            _ => {
                return Err(AggregateError::EmptyGroup {
                    column: "visitors".to_string(),
                }
                .into())
            }
        };
        Ok(vec![
            MetricCard::new("Biggest Drop-off", worst_stage).with_delta(format!("{:.1}%", worst_pct)),
            MetricCard::new("Overall Conversion", format_percent(last / first, 2)),
            MetricCard::new("Total Visitors", format_thousands(first)),
        ])
    });

    report.push(Panel::chart_with_notice("Correlation Heatmap", || {
        let (matrix, notice) = correlations(cache)?;
        let chart = prepare(
            &matrix,
            ChartKind::Heatmap,
            &ColumnBindings::new().with_x("variable"),
            &ChartOptions::titled("Feature Correlations").with_colorscale("RdBu"),
        )?;
        Ok((chart, notice))
    }));

    for (title, direction) in [
        ("Strong Positive Correlations", Direction::Positive),
        ("Strong Negative Correlations", Direction::Negative),
    ] {
        report.push(Panel::table_with_notice(title, || {
            let (matrix, notice) = correlations(cache)?;
            let pairs = correlation_pairs(&matrix, "variable", STRONG_CORRELATION, direction)?;
            Ok((pairs_table(&pairs)?, notice))
        }));
    }

    report.push(Panel::chart("Journey Touchpoints", || {
        let touchpoints = aggregate(
            &*cache.load_dataset(Dataset::CustomerJourney)?,
            &[],
            &["touchpoint"],
            &[ReductionSpec::count_rows().named("interactions")],
        )?;
        Ok(prepare(
            &touchpoints,
            ChartKind::Bar,
            &ColumnBindings::xy("touchpoint", "interactions"),
            &ChartOptions::titled("Touchpoint Frequency").with_sort(SortOrder::Descending),
        )?)
    }));

    report
}

/// Model columns: every numeric column besides `channel`
fn models(attribution: &Table) -> Vec<&str> {
    attribution
        .numeric_columns()
        .into_iter()
        .filter(|c| *c != "channel")
        .collect()
}

/// Stored correlation matrix, or one computed over the customer metrics
///
/// The fallback carries a notice; when customer data is unreadable too the
/// stored matrix's error is reported.
fn correlations(cache: &TableCache) -> Result<(Arc<Table>, Option<String>), PageError> {
    let missing = match cache.load_dataset(Dataset::CorrelationMatrix) {
        Ok(matrix) => return Ok((matrix, None)),
        Err(err) => err,
    };
    let Ok(customers) = cache.load_dataset(Dataset::CustomerData) else {
        return Err(missing.into());
    };
    let metrics: Vec<&str> = customers
        .numeric_columns()
        .into_iter()
        .filter(|c| *c != "customer_id")
        .collect();
    let matrix = correlation_matrix(&customers, &metrics)?;
    Ok((
        Arc::new(matrix),
        Some("Correlation matrix not available; computed from customer metrics".to_string()),
    ))
}

fn selected_model(attribution: &Table, selections: &AttributionSelections) -> Result<String, PageError> {
    match &selections.model {
        Some(model) => {
            attribution.numeric_column(model)?;
            Ok(model.clone())
        }
        None => models(attribution)
            .first()
            .map(|m| m.to_string())
            .ok_or_else(|| AggregateError::InvalidOption("no attribution model columns".to_string()).into()),
    }
}

fn pairs_table(pairs: &[CorrelationPair]) -> Result<Table, AggregateError> {
    Table::from_rows(
        vec![
            Column::new("variable_1", ColumnType::Text),
            Column::new("variable_2", ColumnType::Text),
            Column::new("correlation", ColumnType::Number),
        ],
        pairs
            .iter()
            .map(|p| vec![Value::text(p.a.as_str()), Value::text(p.b.as_str()), Value::Number(p.r)])
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::fixtures;
    use pretty_assertions::assert_eq;

    fn cache() -> TableCache {
        let cache = TableCache::new("/nonexistent");
        cache.prime(Dataset::ChannelAttribution, fixtures::attribution());
        cache.prime(Dataset::FunnelData, fixtures::funnel());
        cache.prime(Dataset::CorrelationMatrix, fixtures::correlations());
        cache.prime(Dataset::CustomerJourney, fixtures::journey());
        cache
    }

    #[test]
    fn test_default_model_donut() {
        let report = build(&cache(), &AttributionSelections::default(), &DashboardConfig::default());
        let donut = report.panel("Attribution by Channel").unwrap().chart_description().unwrap();
        assert_eq!(donut.kind, ChartKind::Donut);
        assert_eq!(donut.options.hole, Some(0.4));
        assert_eq!(donut.stat("total"), Some(80.0));
        assert_eq!(report.failed_panels(), 0);
    }

    #[test]
    fn test_unknown_model_fails_panel() {
        let selections = AttributionSelections {
            model: Some("u_shaped".to_string()),
        };
        let report = build(&cache(), &selections, &DashboardConfig::default());
        assert!(report.panel("Attribution by Channel").unwrap().is_failed());
        assert!(report.panel("Conversion Funnel").unwrap().chart_description().is_some());
    }

    #[test]
    fn test_model_consistency() {
        let report = build(&cache(), &AttributionSelections::default(), &DashboardConfig::default());
        assert_eq!(report.metric("Most Inconsistent Channel").unwrap().value, "Email");
        assert_eq!(report.metric("Attribution Models").unwrap().value, "3");
    }

    #[test]
    fn test_funnel_summary() {
        let report = build(&cache(), &AttributionSelections::default(), &DashboardConfig::default());
        let worst = report.metric("Biggest Drop-off").unwrap();
        assert_eq!(worst.value, "Purchase");
        assert_eq!(worst.delta.as_deref(), Some("75.0%"));
        assert_eq!(report.metric("Overall Conversion").unwrap().value, "5.00%");
        assert_eq!(report.metric("Total Visitors").unwrap().value, "10,000");
    }

    #[test]
    fn test_strong_correlation_tables() {
        let report = build(&cache(), &AttributionSelections::default(), &DashboardConfig::default());
        let positive = report.panel("Strong Positive Correlations").unwrap().table_data().unwrap();
        assert_eq!(positive.len(), 1);
        let negative = report.panel("Strong Negative Correlations").unwrap().table_data().unwrap();
        assert_eq!(
            negative.row(0).unwrap().values().to_vec(),
            vec![Value::text("revenue"), Value::text("churn"), Value::Number(-0.75)]
        );
    }

    #[test]
    fn test_model_comparison_is_channel_by_model() {
        let report = build(&cache(), &AttributionSelections::default(), &DashboardConfig::default());
        let comparison = report.panel("Model Comparison").unwrap().table_data().unwrap();
        assert_eq!(
            comparison.column_names(),
            vec!["channel", "first_touch", "last_touch", "linear"]
        );
        assert_eq!(
            comparison.row(1).unwrap().values().to_vec(),
            vec![Value::text("Email"), Value::Number(10.0), Value::Number(35.0), Value::Number(20.0)]
        );
    }

    #[test]
    fn test_correlations_computed_when_matrix_missing() {
        let cache = TableCache::new("/nonexistent");
        cache.prime(Dataset::CustomerData, fixtures::customers());
        let report = build(&cache, &AttributionSelections::default(), &DashboardConfig::default());

        let heatmap = report.panel("Correlation Heatmap").unwrap();
        let chart = heatmap.chart_description().unwrap();
        assert!(heatmap.notice.is_some());
        assert_eq!(chart.data.row(0).unwrap().get("variable"), Some(&Value::text("age")));

        // income tracks age exactly in the fixture
        let positive = report.panel("Strong Positive Correlations").unwrap();
        assert!(positive.notice.is_some());
        assert!(positive
            .table_data()
            .unwrap()
            .rows()
            .any(|r| r.get("variable_2") == Some(&Value::text("income"))));
    }

    #[test]
    fn test_missing_matrix_without_customers_fails() {
        let cache = TableCache::new("/nonexistent");
        let report = build(&cache, &AttributionSelections::default(), &DashboardConfig::default());
        assert!(report.panel("Correlation Heatmap").unwrap().is_failed());
    }

    #[test]
    fn test_touchpoints_ranked() {
        let report = build(&cache(), &AttributionSelections::default(), &DashboardConfig::default());
        let chart = report.panel("Journey Touchpoints").unwrap().chart_description().unwrap();
        assert_eq!(chart.data.row(0).unwrap().get("touchpoint"), Some(&Value::text("Search")));
        assert_eq!(chart.data.row(0).unwrap().get("interactions"), Some(&Value::Number(3.0)));
    }
}
