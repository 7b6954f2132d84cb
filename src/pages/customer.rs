//! Customer insights: age, lifetime value, satisfaction and segments.

use super::{correlation_strength, membership, totals, MetricCard, PageId, PageReport, Panel};
use crate::aggregator::{aggregate, describe, pearson, Filter, Reduction, ReductionSpec};
use crate::chart::{prepare, ChartDescription, ChartKind, ChartOptions, ColumnBindings, PointMode};
use crate::output::format::{format_percent, format_thousands};
use crate::source::{Column, ColumnType, Dataset, Table, TableCache, Value};
use crate::utils::config::DashboardConfig;
use crate::utils::error::{AggregateError, PageError};
use serde::{Deserialize, Serialize};

/// Default width of one age histogram bin, in years
pub const DEFAULT_AGE_BIN: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerSelections {
    pub age_bin_size: f64,
    /// `None` keeps every segment
    pub segments: Option<Vec<String>>,
    /// Draw every LTV point instead of outliers only
    pub show_all_points: bool,
    /// Split satisfaction violins by acquisition channel
    pub split_by_channel: bool,
    pub trendline: bool,
}

impl Default for CustomerSelections {
    fn default() -> Self {
        Self {
            age_bin_size: DEFAULT_AGE_BIN,
            segments: None,
            show_all_points: false,
            split_by_channel: false,
            trendline: true,
        }
    }
}

pub fn build(cache: &TableCache, selections: &CustomerSelections, config: &DashboardConfig) -> PageReport {
    let mut report = PageReport::new(PageId::Customer);
    let customers = || cache.load_dataset(Dataset::CustomerData);

    report.push(Panel::chart_with_notice("Age Distribution", || {
        age_histogram(&*customers()?, selections)
    }));

    report.push(Panel::chart("Lifetime Value by Segment", || {
        let points = if selections.show_all_points {
            PointMode::All
        } else {
            PointMode::Outliers
        };
        Ok(prepare(
            &*customers()?,
            ChartKind::Box,
            &ColumnBindings::xy("customer_segment", "lifetime_value").with_color("customer_segment"),
            &ChartOptions::titled("Lifetime Value Distribution by Segment").with_points(points),
        )?)
    }));

    report.push(Panel::table("Lifetime Value Statistics", || ltv_statistics(&*customers()?)));

    report.push(Panel::chart_with_notice("Satisfaction by NPS Category", || {
        satisfaction_chart(&*customers()?, selections.split_by_channel)
    }));

    report.push(Panel::chart("Income vs Lifetime Value", || {
        let customers = customers()?;
        let mut bindings = ColumnBindings::xy("income", "lifetime_value");
        if customers.has_column("customer_segment") {
            bindings = bindings.with_color("customer_segment");
        }
        let chart = prepare(
            &customers,
            ChartKind::Scatter,
            &bindings,
            &ChartOptions::titled("Income vs Lifetime Value").with_trendline(selections.trendline),
        )?;
        Ok(chart.with_stat("correlation", pearson(&customers, "income", "lifetime_value")?))
    }));

    report.add_metrics("Income Correlation", || {
        let r = pearson(&*customers()?, "income", "lifetime_value")?;
        let direction = if r < 0.0 { "negative" } else { "positive" };
        Ok(vec![MetricCard::new("Income/LTV Correlation", format!("{:.3}", r))
            .with_delta(format!("{} {} correlation", correlation_strength(r), direction))])
    });

    report.add_metrics("Engagement", || {
        let customers = customers()?;
        let values = totals(
            &customers,
            &[
                ReductionSpec::new("number_of_purchases", Reduction::Mean),
                ReductionSpec::new("satisfaction_score", Reduction::Mean),
                ReductionSpec::new("engagement_score", Reduction::Mean),
            ],
        )?;
        Ok(vec![
            MetricCard::new("Total Customers", format_thousands(customers.len() as f64)),
            MetricCard::new("Churn Rate", format_percent(churn_rate(&customers)?, config.percent_decimals)),
            MetricCard::new("Avg Purchases", format!("{:.1}", values[0])),
            MetricCard::new("Avg Satisfaction", format!("{:.2}/5.0", values[1])),
            MetricCard::new("Avg Engagement", format!("{:.1}", values[2])),
        ])
    });

    report.push(Panel::table("Segment Summary", || segment_summary(&*customers()?)));

    report
}

fn age_histogram(
    customers: &Table,
    selections: &CustomerSelections,
) -> Result<(ChartDescription, Option<String>), PageError> {
    if selections.age_bin_size.is_nan() || selections.age_bin_size <= 0.0 {
        return Err(AggregateError::InvalidOption(format!(
            "age bin size must be positive, got {}",
            selections.age_bin_size
        ))
        .into());
    }

    let (shown, notice) = if customers.has_column("customer_segment") {
        let filters = membership(customers, "customer_segment", &selections.segments)?;
        (customers.filter(&filters)?, None)
    } else {
        (
            customers.clone(),
            Some("Segment data not available; showing all customers".to_string()),
        )
    };

    let ages = describe(&shown, "age")?;
    // A bin wider than the oldest customer still draws one bar
    let bins = ((ages.max / selections.age_bin_size) as i64).max(1);
    let mut bindings = ColumnBindings::new().with_x("age");
    if notice.is_none() {
        bindings = bindings.with_color("customer_segment");
    }
    let chart = prepare(
        &shown,
        ChartKind::Histogram,
        &bindings,
        &ChartOptions::titled("Customer Age Distribution").with_bins(bins),
    )?
    .with_stat("min_age", ages.min)
    .with_stat("max_age", ages.max)
    .with_stat("mean_age", ages.mean)
    .with_stat("median_age", ages.median);
    Ok((chart, notice))
}

/// Per-segment LTV statistics; a one-customer segment has a null `std`
fn ltv_statistics(customers: &Table) -> Result<Table, PageError> {
    let ltv = |reduction: Reduction| ReductionSpec::new("lifetime_value", reduction).named(reduction.name());
    let stats = aggregate(
        customers,
        &[],
        &["customer_segment"],
        &[
            ltv(Reduction::Count),
            ltv(Reduction::Mean),
            ltv(Reduction::Median),
            ltv(Reduction::Min),
            ltv(Reduction::Max),
        ],
    )?;

    let std = stats
        .column_values("customer_segment")?
        .into_iter()
        .map(|segment| {
            let members = customers.filter(&[Filter::eq("customer_segment", segment.clone())])?;
            let summary = describe(&members, "lifetime_value")?;
            Ok(summary.std.map_or(Value::Null, Value::Number))
        })
        .collect::<Result<Vec<Value>, PageError>>()?;
    Ok(stats.with_column(Column::new("std", ColumnType::Number), std)?)
}

fn satisfaction_chart(customers: &Table, split: bool) -> Result<(ChartDescription, Option<String>), PageError> {
    if !customers.has_column("nps_category") {
        let chart = prepare(
            customers,
            ChartKind::Histogram,
            &ColumnBindings::new().with_x("satisfaction_score"),
            &ChartOptions::titled("Satisfaction Score Distribution"),
        )?;
        return Ok((
            chart,
            Some("NPS category data not available; showing overall satisfaction distribution".to_string()),
        ));
    }

    let mut bindings = ColumnBindings::xy("nps_category", "satisfaction_score");
    let mut notice = None;
    if split {
        if customers.has_column("acquisition_channel") {
            bindings = bindings.with_color("acquisition_channel");
        } else {
            notice = Some("Acquisition channel not available; violins are not split".to_string());
        }
    }
    let chart = prepare(
        customers,
        ChartKind::Violin,
        &bindings,
        &ChartOptions::titled("Satisfaction Score by NPS Category"),
    )?;
    Ok((chart, notice))
}

/// Share of churned customers; churn may be 0/1 or boolean
fn churn_rate(customers: &Table) -> Result<f64, PageError> {
    let flags = customers.column_values("churn")?;
    let churned = flags
        .iter()
        .filter(|v| matches!(v, Value::Bool(true)) || v.as_f64().is_some_and(|n| n != 0.0))
        .count();
    let known = flags.iter().filter(|v| !v.is_null()).count();
    if known == 0 {
        return Err(AggregateError::EmptyGroup {
            column: "churn".to_string(),
        }
        .into());
    }
    Ok(churned as f64 / known as f64)
}

fn segment_summary(customers: &Table) -> Result<Table, PageError> {
    let summary = aggregate(
        customers,
        &[],
        &["customer_segment"],
        &[
            ReductionSpec::count_rows().named("customers"),
            ReductionSpec::new("age", Reduction::Mean).named("avg_age"),
            ReductionSpec::new("income", Reduction::Mean).named("avg_income"),
            ReductionSpec::new("lifetime_value", Reduction::Mean).named("avg_lifetime_value"),
            ReductionSpec::new("satisfaction_score", Reduction::Mean).named("avg_satisfaction"),
        ],
    )?;

    let total = customers.len() as f64;
    let shares = summary
        .numeric_column("customers")?
        .into_iter()
        .map(|count| count.map_or(Value::Null, |c| Value::Number(c / total * 100.0)))
        .collect();
    Ok(summary.with_column(Column::new("pct_of_total", ColumnType::Number), shares)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::fixtures;
    use pretty_assertions::assert_eq;

    fn cache_with(table: Table) -> TableCache {
        let cache = TableCache::new("/nonexistent");
        cache.prime(Dataset::CustomerData, table);
        cache
    }

    #[test]
    fn test_age_bins_from_bin_size() {
        let report = build(
            &cache_with(fixtures::customers()),
            &CustomerSelections::default(),
            &DashboardConfig::default(),
        );
        let panel = report.panel("Age Distribution").unwrap();
        let chart = panel.chart_description().unwrap();
        // max age 55 at 5 years per bin
        assert_eq!(chart.options.bins, Some(11));
        assert_eq!(chart.stat("median_age"), Some(37.5));
        assert!(panel.notice.is_none());
    }

    #[test]
    fn test_segment_fallback_has_notice() {
        let table = fixtures::customers()
            .select(&["customer_id", "age", "income", "lifetime_value", "satisfaction_score", "churn"])
            .unwrap();
        let report = build(&cache_with(table), &CustomerSelections::default(), &DashboardConfig::default());

        let age = report.panel("Age Distribution").unwrap();
        assert!(age.chart_description().is_some());
        assert!(age.notice.is_some());

        let satisfaction = report.panel("Satisfaction by NPS Category").unwrap();
        assert_eq!(satisfaction.chart_description().unwrap().kind, ChartKind::Histogram);
        assert!(satisfaction.notice.is_some());

        // Box plot has no fallback
        assert!(report.panel("Lifetime Value by Segment").unwrap().is_failed());
    }

    #[test]
    fn test_zero_bin_size_fails_panel() {
        let selections = CustomerSelections {
            age_bin_size: 0.0,
            ..Default::default()
        };
        let report = build(&cache_with(fixtures::customers()), &selections, &DashboardConfig::default());
        assert!(report.panel("Age Distribution").unwrap().is_failed());
    }

    #[test]
    fn test_wide_bin_still_renders() {
        let selections = CustomerSelections {
            age_bin_size: 500.0,
            ..Default::default()
        };
        let report = build(&cache_with(fixtures::customers()), &selections, &DashboardConfig::default());
        let chart = report.panel("Age Distribution").unwrap().chart_description().unwrap();
        assert_eq!(chart.options.bins, Some(1));
    }

    #[test]
    fn test_bins_follow_selected_segments() {
        let selections = CustomerSelections {
            segments: Some(vec!["Budget".to_string()]),
            ..Default::default()
        };
        let report = build(&cache_with(fixtures::customers()), &selections, &DashboardConfig::default());
        let chart = report.panel("Age Distribution").unwrap().chart_description().unwrap();
        // oldest Budget customer is 35
        assert_eq!(chart.options.bins, Some(7));
        assert_eq!(chart.stat("max_age"), Some(35.0));
    }

    #[test]
    fn test_segment_filter() {
        let selections = CustomerSelections {
            segments: Some(vec!["Premium".to_string()]),
            ..Default::default()
        };
        let report = build(&cache_with(fixtures::customers()), &selections, &DashboardConfig::default());
        let chart = report.panel("Age Distribution").unwrap().chart_description().unwrap();
        assert_eq!(chart.data.len(), 2);
    }

    #[test]
    fn test_engagement_metrics() {
        let report = build(
            &cache_with(fixtures::customers()),
            &CustomerSelections::default(),
            &DashboardConfig::default(),
        );
        assert_eq!(report.metric("Total Customers").unwrap().value, "6");
        assert_eq!(report.metric("Churn Rate").unwrap().value, "33.3%");
        assert_eq!(report.metric("Avg Purchases").unwrap().value, "5.0");
        assert_eq!(report.metric("Avg Satisfaction").unwrap().value, "3.50/5.0");
        let correlation = report.metric("Income/LTV Correlation").unwrap();
        assert!(correlation.delta.as_deref().unwrap().starts_with("Strong positive"));
    }

    #[test]
    fn test_segment_summary_shares() {
        let summary = segment_summary(&fixtures::customers()).unwrap();
        assert_eq!(summary.len(), 3);
        let shares: Vec<Option<f64>> = summary.numeric_column("pct_of_total").unwrap();
        let total: f64 = shares.into_iter().flatten().sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_ltv_statistics() {
        let report = build(
            &cache_with(fixtures::customers()),
            &CustomerSelections::default(),
            &DashboardConfig::default(),
        );
        let stats = report.panel("Lifetime Value Statistics").unwrap().table_data().unwrap();
        assert_eq!(
            stats.column_names(),
            vec!["customer_segment", "count", "mean", "median", "min", "max", "std"]
        );
    }

    #[test]
    fn test_ltv_statistics_with_single_customer_segment() {
        let customers = fixtures::customers()
            .filter(&[Filter::is_in("customer_id", [1.0, 2.0, 3.0, 4.0, 5.0])])
            .unwrap();
        let stats = ltv_statistics(&customers).unwrap();

        let standard = stats
            .rows()
            .find(|r| r.get("customer_segment") == Some(&Value::text("Standard")))
            .unwrap();
        assert_eq!(standard.get("count"), Some(&Value::Number(1.0)));
        assert_eq!(standard.get("std"), Some(&Value::Null));

        let budget = stats
            .rows()
            .find(|r| r.get("customer_segment") == Some(&Value::text("Budget")))
            .unwrap();
        let std = budget.get("std").and_then(Value::as_f64).unwrap();
        assert!((std - 500.0 * 2f64.sqrt()).abs() < 1e-9);
    }
}
