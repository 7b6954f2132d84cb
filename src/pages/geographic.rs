//! Geographic analysis: state rankings, growth and market classification.

use super::{title_case, totals, MetricCard, PageId, PageReport, Panel};
use crate::aggregator::{describe, row_at_max, row_at_min, Reduction, ReductionSpec};
use crate::chart::{prepare, ChartKind, ChartOptions, ColumnBindings, Orientation};
use crate::output::format::{format_currency, format_thousands};
use crate::source::{Dataset, RowRef, SortOrder, Table, TableCache};
use crate::utils::config::DashboardConfig;
use crate::utils::error::PageError;
use serde::{Deserialize, Serialize};

/// Metric ranked across states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoMetric {
    #[default]
    Revenue,
    Customers,
    MarketPenetration,
    YoyGrowth,
    Satisfaction,
}

impl GeoMetric {
    pub fn column(&self) -> &'static str {
        match self {
            GeoMetric::Revenue => "revenue",
            GeoMetric::Customers => "customers",
            GeoMetric::MarketPenetration => "market_penetration",
            GeoMetric::YoyGrowth => "yoy_growth",
            GeoMetric::Satisfaction => "satisfaction",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeographicSelections {
    pub metric: GeoMetric,
}

pub fn build(cache: &TableCache, selections: &GeographicSelections, config: &DashboardConfig) -> PageReport {
    let mut report = PageReport::new(PageId::Geographic);
    let geography = || cache.load_dataset(Dataset::GeographicData);
    let currency = |v: f64| format_currency(v, &config.currency_prefix, config.magnitude_decimals);

    report.add_metrics("Market Overview", || {
        let geography = geography()?;
        let values = totals(
            &geography,
            &[
                ReductionSpec::new("state", Reduction::CountDistinct),
                ReductionSpec::new("revenue", Reduction::Sum),
                ReductionSpec::new("customers", Reduction::Sum),
                ReductionSpec::new("satisfaction", Reduction::Mean),
            ],
        )?;
        Ok(vec![
            MetricCard::new("States Covered", format_thousands(values[0])),
            MetricCard::new("Total Revenue", currency(values[1])),
            MetricCard::new("Total Customers", format_thousands(values[2])),
            MetricCard::new("Avg Satisfaction", format!("{:.2}/5.0", values[3])),
        ])
    });

    let metric = selections.metric.column();
    report.push(Panel::chart(format!("{} by State", title_case(metric)), || {
        state_bar(&*geography()?, metric, SortOrder::Ascending)
    }));

    report.add_metrics("Top States", || {
        let geography = geography()?;
        let revenue = row_at_max(&geography, "revenue")?;
        let customers = row_at_max(&geography, "customers")?;
        let penetration = row_at_max(&geography, "market_penetration")?;
        Ok(vec![
            MetricCard::new("Top Revenue State", state_of(&revenue)).with_delta(currency(number(&revenue, "revenue"))),
            MetricCard::new("Most Customers", state_of(&customers))
                .with_delta(format_thousands(number(&customers, "customers"))),
            MetricCard::new("Highest Penetration", state_of(&penetration))
                .with_delta(format!("{:.1}%", number(&penetration, "market_penetration"))),
        ])
    });

    report.push(Panel::table("State Summary", || {
        let geography = geography()?;
        let columns: Vec<&str> = ["state", "region", "revenue", "customers", "market_penetration", "yoy_growth", "satisfaction"]
            .into_iter()
            .filter(|c| geography.has_column(c))
            .collect();
        Ok(geography.select(&columns)?.sort_by("revenue", SortOrder::Descending)?)
    }));

    report.push(Panel::chart("Year-over-Year Growth", || {
        state_bar(&*geography()?, "yoy_growth", SortOrder::Descending)
    }));

    report.add_metrics("Growth Leaders", || {
        let geography = geography()?;
        let highest = row_at_max(&geography, "yoy_growth")?;
        let lowest = row_at_min(&geography, "yoy_growth")?;
        Ok(vec![
            MetricCard::new("Highest Growth", state_of(&highest))
                .with_delta(format!("{:.1}%", number(&highest, "yoy_growth"))),
            MetricCard::new("Lowest Growth", state_of(&lowest))
                .with_delta(format!("{:.1}%", number(&lowest, "yoy_growth"))),
        ])
    });

    report.push(Panel::chart("Satisfaction by State", || {
        state_bar(&*geography()?, "satisfaction", SortOrder::Descending)
    }));

    report.push(Panel::chart("Market Penetration by State", || {
        state_bar(&*geography()?, "market_penetration", SortOrder::Descending)
    }));

    report.push(Panel::table("High Performers", || {
        classify(&*geography()?, Market::HighPerformer)
    }));
    report.push(Panel::table("Growth Opportunities", || {
        classify(&*geography()?, Market::GrowthOpportunity)
    }));

    report
}

fn state_bar(
    geography: &Table,
    metric: &str,
    order: SortOrder,
) -> Result<crate::chart::ChartDescription, PageError> {
    let orientation = match order {
        SortOrder::Ascending => Orientation::Horizontal,
        SortOrder::Descending => Orientation::Vertical,
    };
    Ok(prepare(
        geography,
        ChartKind::Bar,
        &ColumnBindings::xy("state", metric).with_color(metric),
        &ChartOptions::titled(format!("{} by State", title_case(metric)))
            .with_orientation(orientation)
            .with_sort(order),
    )?)
}

fn state_of(row: &RowRef<'_>) -> String {
    row.get("state").map(ToString::to_string).unwrap_or_default()
}

fn number(row: &RowRef<'_>, column: &str) -> f64 {
    row.get(column).and_then(|v| v.as_f64()).unwrap_or(f64::NAN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Market {
    /// Revenue and growth both above their medians
    HighPerformer,
    /// Revenue below its median, growth above its median
    GrowthOpportunity,
}

fn classify(geography: &Table, market: Market) -> Result<Table, PageError> {
    let revenue_median = describe(geography, "revenue")?.median;
    let growth_median = describe(geography, "yoy_growth")?.median;
    let revenue = geography.numeric_column("revenue")?;
    let growth = geography.numeric_column("yoy_growth")?;

    let keep: Vec<usize> = revenue
        .iter()
        .zip(&growth)
        .enumerate()
        .filter_map(|(i, (r, g))| {
            let (r, g) = ((*r)?, (*g)?);
            let revenue_side = match market {
                Market::HighPerformer => r > revenue_median,
                Market::GrowthOpportunity => r < revenue_median,
            };
            (revenue_side && g > growth_median).then_some(i)
        })
        .collect();

    Ok(geography
        .take_rows(&keep)
        .select(&["state", "revenue", "yoy_growth"])?
        .sort_by("yoy_growth", SortOrder::Descending)?)
}
