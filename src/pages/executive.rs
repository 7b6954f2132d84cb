//! Executive overview: headline KPIs, revenue trend and channel comparison.

use super::{totals, MetricCard, PageId, PageReport, Panel};
use crate::aggregator::{aggregate, aggregate_by_period, row_at_max, Period, Reduction, ReductionSpec};
use crate::chart::{prepare, ChartKind, ChartOptions, ColumnBindings, Orientation};
use crate::output::format::{format_currency, format_magnitude, format_percent, format_ratio, format_thousands};
use crate::source::{Dataset, SortOrder, TableCache};
use crate::utils::config::DashboardConfig;
use serde::{Deserialize, Serialize};

/// Metric compared across channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMetric {
    #[default]
    Revenue,
    Conversions,
    Roas,
}

impl ChannelMetric {
    pub fn column(&self) -> &'static str {
        match self {
            ChannelMetric::Revenue => "revenue",
            ChannelMetric::Conversions => "conversions",
            ChannelMetric::Roas => "roas",
        }
    }

    /// ROAS is a ratio, so channels are compared on its mean
    pub fn reduction(&self) -> Reduction {
        match self {
            ChannelMetric::Roas => Reduction::Mean,
            _ => Reduction::Sum,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutiveSelections {
    pub period: Period,
    pub channel_metric: ChannelMetric,
}

pub fn build(cache: &TableCache, selections: &ExecutiveSelections, config: &DashboardConfig) -> PageReport {
    let mut report = PageReport::new(PageId::Executive);
    let campaign = || cache.load_dataset(Dataset::CampaignPerformance);
    let customers = || cache.load_dataset(Dataset::CustomerData);
    let currency = |v: f64| format_currency(v, &config.currency_prefix, config.magnitude_decimals);

    report.add_metrics("Key Metrics", || {
        let campaign = campaign()?;
        let values = totals(
            &campaign,
            &[
                ReductionSpec::new("revenue", Reduction::Sum),
                ReductionSpec::new("conversions", Reduction::Sum),
                ReductionSpec::new("roas", Reduction::Mean),
            ],
        )?;
        let customer_count = customers()?.len() as f64;
        Ok(vec![
            MetricCard::new("Total Revenue", currency(values[0])),
            MetricCard::new("Total Conversions", format_magnitude(values[1], config.magnitude_decimals)),
            MetricCard::new("Average ROAS", format_ratio(values[2], 2)),
            MetricCard::new("Total Customers", format_thousands(customer_count)),
        ])
    });

    let period = selections.period;
    report.push(Panel::chart(format!("Revenue Trend ({})", period.label()), || {
        let trend = aggregate_by_period(
            &*campaign()?,
            &[],
            "date",
            period,
            &[],
            &[ReductionSpec::new("revenue", Reduction::Sum)],
        )?;
        Ok(prepare(
            &trend,
            ChartKind::Line,
            &ColumnBindings::xy("date", "revenue"),
            &ChartOptions::titled(format!("{} Revenue", period.label())),
        )?)
    }));

    let metric = selections.channel_metric;
    report.push(Panel::chart("Channel Performance", || {
        let by_channel = aggregate(
            &*campaign()?,
            &[],
            &["channel"],
            &[ReductionSpec::new(metric.column(), metric.reduction())],
        )?;
        Ok(prepare(
            &by_channel,
            ChartKind::Bar,
            &ColumnBindings::xy("channel", metric.column()).with_color(metric.column()),
            &ChartOptions::titled(format!("{} by Channel", super::title_case(metric.column())))
                .with_orientation(Orientation::Horizontal)
                .with_sort(SortOrder::Ascending),
        )?)
    }));

    report.add_metrics("Channel Highlights", || {
        let campaign = campaign()?;
        let revenue_by_channel = aggregate(
            &campaign,
            &[],
            &["channel"],
            &[ReductionSpec::new("revenue", Reduction::Sum)],
        )?;
        let top = row_at_max(&revenue_by_channel, "revenue")?;
        let top_name = top.get("channel").map(ToString::to_string).unwrap_or_default();
        let top_revenue = top.get("revenue").and_then(|v| v.as_f64()).unwrap_or_default();

        let rates = totals(
            &campaign,
            &[
                ReductionSpec::new("ctr", Reduction::Mean),
                ReductionSpec::new("cpa", Reduction::Mean),
            ],
        )?;
        Ok(vec![
            MetricCard::new("Top Channel", top_name).with_delta(currency(top_revenue)),
            MetricCard::new("Avg CTR", format_percent(rates[0], 2)),
            MetricCard::new("Avg CPA", format_currency(rates[1], &config.currency_prefix, 2)),
        ])
    });

    report.push(Panel::table("Channel Summary", || {
        let summary = aggregate(
            &*campaign()?,
            &[],
            &["channel"],
            &[
                ReductionSpec::new("revenue", Reduction::Sum),
                ReductionSpec::new("conversions", Reduction::Sum),
                ReductionSpec::new("impressions", Reduction::Sum),
                ReductionSpec::new("clicks", Reduction::Sum),
                ReductionSpec::new("spend", Reduction::Sum),
                ReductionSpec::new("ctr", Reduction::Mean),
                ReductionSpec::new("roas", Reduction::Mean),
            ],
        )?;
        Ok(summary.sort_by("revenue", SortOrder::Descending)?)
    }));

    report.add_metrics("Customer Insights", || {
        let values = totals(
            &*customers()?,
            &[
                ReductionSpec::new("age", Reduction::Mean),
                ReductionSpec::new("lifetime_value", Reduction::Mean),
                ReductionSpec::new("satisfaction_score", Reduction::Mean),
            ],
        )?;
        Ok(vec![
            MetricCard::new("Avg Customer Age", format!("{:.1} years", values[0])),
            MetricCard::new("Avg Lifetime Value", currency(values[1])),
            MetricCard::new("Avg Satisfaction", format!("{:.1}/5.0", values[2])),
        ])
    });

    report
}
