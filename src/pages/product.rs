//! Product performance: category, regional, margin and top-product views.

use super::{membership, totals, MetricCard, PageId, PageReport, Panel};
use crate::aggregator::{aggregate, describe, Filter, Reduction, ReductionSpec};
use crate::chart::{prepare, ChartKind, ChartOptions, ColumnBindings, Orientation};
use crate::output::format::{format_currency, format_thousands};
use crate::source::{Column, ColumnType, Dataset, SortOrder, Table, TableCache, Value};
use crate::utils::config::DashboardConfig;
use crate::utils::error::{AggregateError, PageError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_PRODUCTS: usize = 10;
pub const MIN_TOP_PRODUCTS: usize = 5;
pub const MAX_TOP_PRODUCTS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSelections {
    pub years: Option<Vec<String>>,
    pub regions: Option<Vec<String>>,
    pub quarters: Option<Vec<String>>,
    pub top_n: usize,
    /// Category for the subcategory breakdown; the first category when unset
    pub category: Option<String>,
}

impl Default for ProductSelections {
    fn default() -> Self {
        Self {
            years: None,
            regions: None,
            quarters: None,
            top_n: DEFAULT_TOP_PRODUCTS,
            category: None,
        }
    }
}

pub fn build(cache: &TableCache, selections: &ProductSelections, config: &DashboardConfig) -> PageReport {
    let mut report = PageReport::new(PageId::Product);
    let products = || cache.load_dataset(Dataset::ProductSales);
    let currency = |v: f64| format_currency(v, &config.currency_prefix, config.magnitude_decimals);

    report.add_metrics("Product Totals", || {
        let values = totals(
            &*products()?,
            &[
                ReductionSpec::new("product_name", Reduction::CountDistinct),
                ReductionSpec::new("sales", Reduction::Sum),
                ReductionSpec::new("profit", Reduction::Sum),
                ReductionSpec::new("profit_margin", Reduction::Mean),
            ],
        )?;
        Ok(vec![
            MetricCard::new("Total Products", format_thousands(values[0])),
            MetricCard::new("Total Sales", currency(values[1])),
            MetricCard::new("Total Profit", currency(values[2])),
            MetricCard::new("Avg Margin", format!("{:.2}%", values[3])),
        ])
    });

    report.push(Panel::chart("Sales by Category", || {
        let by_category = category_sales(&*products()?)?;
        Ok(prepare(
            &by_category,
            ChartKind::Bar,
            &ColumnBindings::xy("category", "sales").with_color("profit_margin"),
            &ChartOptions::titled("Sales by Category")
                .with_orientation(Orientation::Horizontal)
                .with_sort(SortOrder::Ascending),
        )?)
    }));

    report.push(Panel::table("Category Summary", || {
        Ok(category_sales(&*products()?)?.sort_by("sales", SortOrder::Descending)?)
    }));

    report.push(Panel::chart("Sales by Region and Quarter", || {
        let products = products()?;
        let mut filters = membership(&products, "year", &selections.years)?;
        filters.extend(membership(&products, "region", &selections.regions)?);
        filters.extend(membership(&products, "quarter", &selections.quarters)?);
        let grouped = aggregate(
            &products,
            &filters,
            &["region", "quarter"],
            &[ReductionSpec::new("sales", Reduction::Sum)],
        )?;
        Ok(prepare(
            &grouped,
            ChartKind::Bar,
            &ColumnBindings::xy("region", "sales").with_color("quarter"),
            &ChartOptions::titled("Sales by Region and Quarter"),
        )?)
    }));

    report.push(Panel::chart("Margin by Category", || {
        let margins = aggregate(
            &*products()?,
            &[],
            &["category"],
            &[ReductionSpec::new("profit_margin", Reduction::Mean)],
        )?;
        Ok(prepare(
            &margins,
            ChartKind::Bar,
            &ColumnBindings::xy("category", "profit_margin"),
            &ChartOptions::titled("Average Profit Margin by Category")
                .with_orientation(Orientation::Horizontal)
                .with_sort(SortOrder::Ascending),
        )?)
    }));

    report.push(Panel::table("Margin Statistics", || {
        let margin = describe(&*products()?, "profit_margin")?;
        let stats = [
            ("Highest Margin", margin.max),
            ("Lowest Margin", margin.min),
            ("Average Margin", margin.mean),
            ("Median Margin", margin.median),
        ];
        Ok(Table::from_rows(
            vec![
                Column::new("statistic", ColumnType::Text),
                Column::new("value", ColumnType::Number),
            ],
            stats
                .iter()
                .map(|(name, value)| vec![Value::text(*name), Value::Number(*value)])
                .collect(),
        )?)
    }));

    let top_n = selections.top_n;
    report.push(Panel::chart(format!("Top {} Products", top_n), || {
        let top = top_products(&*products()?, top_n)?;
        Ok(prepare(
            &top,
            ChartKind::Bar,
            &ColumnBindings::xy("product_name", "sales").with_color("profit"),
            &ChartOptions::titled(format!("Top {} Products by Sales", top_n))
                .with_orientation(Orientation::Horizontal)
                .with_sort(SortOrder::Ascending),
        )?)
    }));

    report.push(Panel::chart("Quarterly Sales Trend", || {
        let quarterly = aggregate(&*products()?, &[], &["quarter"], &[ReductionSpec::new("sales", Reduction::Sum)])?;
        Ok(prepare(
            &chronological_quarters(&quarterly)?,
            ChartKind::Line,
            &ColumnBindings::xy("quarter", "sales"),
            &ChartOptions::titled("Quarterly Sales Trend"),
        )?)
    }));

    report.push(Panel::chart("Sales vs Units", || {
        let per_product = aggregate(
            &*products()?,
            &[],
            &["product_name"],
            &[
                ReductionSpec::new("sales", Reduction::Sum),
                ReductionSpec::new("units_sold", Reduction::Sum),
                ReductionSpec::new("category", Reduction::First),
            ],
        )?;
        Ok(prepare(
            &per_product,
            ChartKind::Scatter,
            &ColumnBindings::xy("units_sold", "sales")
                .with_color("category")
                .with_text("product_name"),
            &ChartOptions::titled("Sales vs Units Sold"),
        )?)
    }));

    report.push(Panel::chart("Subcategory Breakdown", || {
        let products = products()?;
        let category = match &selections.category {
            Some(category) => category.clone(),
            None => first_category(&products)?,
        };
        let breakdown = aggregate(
            &products,
            &[Filter::eq("category", category.as_str())],
            &["subcategory"],
            &[
                ReductionSpec::new("sales", Reduction::Sum),
                ReductionSpec::new("units_sold", Reduction::Sum),
                ReductionSpec::new("profit", Reduction::Sum),
            ],
        )?;
        Ok(prepare(
            &breakdown,
            ChartKind::Bar,
            &ColumnBindings::xy("subcategory", "sales"),
            &ChartOptions::titled(format!("{} Subcategories", category))
                .with_orientation(Orientation::Horizontal)
                .with_sort(SortOrder::Ascending),
        )?)
    }));

    report.push(Panel::chart("Ratings by Category", || {
        let ratings = aggregate(
            &*products()?,
            &[],
            &["category"],
            &[
                ReductionSpec::new("avg_rating", Reduction::Mean),
                ReductionSpec::new("review_count", Reduction::Sum),
            ],
        )?;
        Ok(prepare(
            &ratings,
            ChartKind::Bar,
            &ColumnBindings::xy("category", "avg_rating").with_text("review_count"),
            &ChartOptions::titled("Average Rating by Category").with_sort(SortOrder::Descending),
        )?)
    }));

    report.push(Panel::chart("Return Rate by Category", || {
        let returns = aggregate(
            &*products()?,
            &[],
            &["category"],
            &[ReductionSpec::new("return_rate", Reduction::Mean)],
        )?;
        Ok(prepare(
            &returns,
            ChartKind::Bar,
            &ColumnBindings::xy("category", "return_rate"),
            &ChartOptions::titled("Average Return Rate by Category").with_sort(SortOrder::Descending),
        )?)
    }));

    report
}

fn category_sales(products: &Table) -> Result<Table, AggregateError> {
    aggregate(
        products,
        &[],
        &["category"],
        &[
            ReductionSpec::new("sales", Reduction::Sum),
            ReductionSpec::new("units_sold", Reduction::Sum),
            ReductionSpec::new("profit", Reduction::Sum),
            ReductionSpec::new("profit_margin", Reduction::Mean),
        ],
    )
}

/// The `n` best-selling products, smallest first
fn top_products(products: &Table, n: usize) -> Result<Table, PageError> {
    if !(MIN_TOP_PRODUCTS..=MAX_TOP_PRODUCTS).contains(&n) {
        return Err(AggregateError::InvalidOption(format!(
            "top products must be between {} and {}, got {}",
            MIN_TOP_PRODUCTS, MAX_TOP_PRODUCTS, n
        ))
        .into());
    }
    let per_product = aggregate(
        products,
        &[],
        &["product_name"],
        &[
            ReductionSpec::new("sales", Reduction::Sum),
            ReductionSpec::new("units_sold", Reduction::Sum),
            ReductionSpec::new("profit", Reduction::Sum),
        ],
    )?;
    Ok(per_product
        .sort_by("sales", SortOrder::Descending)?
        .head(n)
        .sort_by("sales", SortOrder::Ascending)?)
}

fn first_category(products: &Table) -> Result<String, AggregateError> {
    let mut categories: Vec<String> = products
        .distinct("category")?
        .into_iter()
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
        .collect();
    categories.sort();
    categories.into_iter().next().ok_or_else(|| AggregateError::EmptyGroup {
        column: "category".to_string(),
    })
}

/// Sort key of a quarter label such as `Q3 2023`; numeric quarters sort as is
fn quarter_key(value: &Value) -> Value {
    if let Some(n) = value.as_f64() {
        return Value::Number(n);
    }
    let parsed = value.as_str().and_then(|label| {
        let (quarter, year) = label.trim().split_once(' ')?;
        let quarter: u32 = quarter.trim_start_matches(['Q', 'q']).parse().ok()?;
        let year: u32 = year.trim().parse().ok()?;
        Some(f64::from(year * 10 + quarter))
    });
    parsed.map_or(Value::Null, Value::Number)
}

fn chronological_quarters(quarterly: &Table) -> Result<Table, AggregateError> {
    let keys = quarterly.column_values("quarter")?.into_iter().map(quarter_key).collect();
    quarterly
        .with_column(Column::new("quarter_order", ColumnType::Number), keys)?
        .sort_by("quarter_order", SortOrder::Ascending)
}
