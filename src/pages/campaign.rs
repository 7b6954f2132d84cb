//! Campaign analytics: filtered trends, cumulative conversions, regional and
//! spend breakdowns.

use super::{membership, totals, MetricCard, PageId, PageReport, Panel};
use crate::aggregator::{
    aggregate, aggregate_by_period, cumulative_sum, date_part, describe, CalendarPart, Filter, Period, Reduction,
    ReductionSpec,
};
use crate::chart::{prepare, BarMode, BarNorm, ChartKind, ChartOptions, ColumnBindings};
use crate::output::format::{format_currency, format_magnitude, format_percent, format_ratio, format_thousands};
use crate::source::{Column, ColumnType, Dataset, SortOrder, Table, TableCache, Value};
use crate::utils::config::DashboardConfig;
use crate::utils::error::PageError;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignSelections {
    pub period: Period,
    /// `None` keeps every channel
    pub channels: Option<Vec<String>>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Regions for the cumulative conversions chart
    pub regions: Option<Vec<String>>,
    /// Year of the regional breakdown; the latest year when unset
    pub year: Option<i32>,
    pub quarters: Option<Vec<String>>,
    /// `percent` draws the spend chart as a 100% stack
    pub spend_norm: BarNorm,
}

pub fn build(cache: &TableCache, selections: &CampaignSelections, config: &DashboardConfig) -> PageReport {
    let mut report = PageReport::new(PageId::Campaign);
    let campaign = || cache.load_dataset(Dataset::CampaignPerformance);

    let period = selections.period;
    report.push(Panel::chart(format!("Revenue Trend ({})", period.label()), || {
        let campaign = campaign()?;
        let mut filters = membership(&campaign, "channel", &selections.channels)?;
        if selections.start.is_some() || selections.end.is_some() {
            filters.push(Filter::between(
                "date",
                selections.start.map(Value::Date),
                selections.end.map(Value::Date),
            ));
        }
        let trend = aggregate_by_period(
            &campaign,
            &filters,
            "date",
            period,
            &["channel"],
            &[ReductionSpec::new("revenue", Reduction::Sum)],
        )?;
        Ok(prepare(
            &trend,
            ChartKind::Line,
            &ColumnBindings::xy("date", "revenue").with_color("channel"),
            &ChartOptions::titled(format!("{} Revenue by Channel", period.label())),
        )?)
    }));

    report.push(Panel::chart("Cumulative Conversions", || {
        let campaign = campaign()?;
        let filtered = campaign.filter(&membership(&campaign, "region", &selections.regions)?)?;
        let running = cumulative_sum(&filtered, "conversions", &["channel"], "date", "cumulative_conversions")?;
        let daily = aggregate(
            &running,
            &[],
            &["date", "channel"],
            &[ReductionSpec::new("cumulative_conversions", Reduction::Sum)],
        )?;
        Ok(prepare(
            &daily,
            ChartKind::Area,
            &ColumnBindings::xy("date", "cumulative_conversions").with_color("channel"),
            &ChartOptions::titled("Cumulative Conversions by Channel"),
        )?)
    }));

    report.push(Panel::chart("Regional Performance", || {
        let campaign = campaign()?;
        regional_by_quarter(&campaign, selections)
    }));

    let norm = selections.spend_norm;
    report.push(Panel::chart("Spend by Campaign Type", || {
        let monthly = aggregate_by_period(
            &*campaign()?,
            &[],
            "date",
            Period::Month,
            &["campaign_type"],
            &[ReductionSpec::new("spend", Reduction::Sum)],
        )?;
        let title = match norm {
            BarNorm::Percent => "Monthly Spend Share by Campaign Type",
            BarNorm::Absolute => "Monthly Spend by Campaign Type",
        };
        Ok(prepare(
            &monthly,
            ChartKind::Bar,
            &ColumnBindings::xy("date", "spend").with_color("campaign_type"),
            &ChartOptions::titled(title)
                .with_bar_mode(BarMode::Stack)
                .with_bar_norm(norm),
        )?)
    }));

    report.push(Panel::table("Detailed Channel Metrics", || {
        let detail = aggregate(
            &*campaign()?,
            &[],
            &["channel"],
            &[
                ReductionSpec::new("impressions", Reduction::Sum),
                ReductionSpec::new("clicks", Reduction::Sum),
                ReductionSpec::new("conversions", Reduction::Sum),
                ReductionSpec::new("spend", Reduction::Sum),
                ReductionSpec::new("revenue", Reduction::Sum),
                ReductionSpec::new("ctr", Reduction::Mean),
                ReductionSpec::new("cpa", Reduction::Mean),
                ReductionSpec::new("roas", Reduction::Mean),
            ],
        )?;
        Ok(detail.sort_by("revenue", SortOrder::Descending)?)
    }));

    report.add_metrics("Campaign Totals", || {
        let values = totals(
            &*campaign()?,
            &[
                ReductionSpec::new("revenue", Reduction::Sum),
                ReductionSpec::new("conversions", Reduction::Sum),
                ReductionSpec::new("roas", Reduction::Mean),
                ReductionSpec::new("ctr", Reduction::Mean),
                ReductionSpec::new("impressions", Reduction::Sum),
                ReductionSpec::new("spend", Reduction::Sum),
            ],
        )?;
        let currency = |v: f64| format_currency(v, &config.currency_prefix, config.magnitude_decimals);
        Ok(vec![
            MetricCard::new("Total Revenue", currency(values[0])),
            MetricCard::new("Total Conversions", format_thousands(values[1])),
            MetricCard::new("Avg ROAS", format_ratio(values[2], 2)),
            MetricCard::new("Avg CTR", format_percent(values[3], 2)),
            MetricCard::new("Total Impressions", format_magnitude(values[4], config.magnitude_decimals)),
            MetricCard::new("Total Spend", currency(values[5])),
        ])
    });

    report
}

/// Grouped bar of revenue per region and quarter within one year
fn regional_by_quarter(
    campaign: &Table,
    selections: &CampaignSelections,
) -> Result<crate::chart::ChartDescription, PageError> {
    let dated = date_part(campaign, "date", CalendarPart::Year, "year")?;
    let dated = date_part(&dated, "date", CalendarPart::Quarter, "quarter")?;

    let year = match selections.year {
        Some(year) => f64::from(year),
        None => describe(&dated, "year")?.max,
    };
    debug!("Regional breakdown for year {}", year);

    let mut filters = vec![Filter::eq("year", year)];
    filters.extend(membership(&dated, "quarter", &selections.quarters)?);

    let by_quarter = aggregate(
        &dated,
        &filters,
        &["region", "quarter"],
        &[ReductionSpec::new("revenue", Reduction::Sum)],
    )?;
    let labels = by_quarter
        .column_values("quarter")?
        .into_iter()
        .map(|q| match q.as_f64() {
            Some(q) => Value::text(format!("Q{}", q)),
            None => Value::Null,
        })
        .collect();
    let labelled = by_quarter.with_column(Column::new("quarter_label", ColumnType::Text), labels)?;

    Ok(prepare(
        &labelled,
        ChartKind::Bar,
        &ColumnBindings::xy("region", "revenue").with_color("quarter_label"),
        &ChartOptions::titled(format!("Revenue by Region and Quarter ({})", year)),
    )?)
}
