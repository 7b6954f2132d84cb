//! Page controllers.
//!
//! Each page reads its selections, fetches tables from the cache, runs them
//! through the aggregation engine and the chart preparer, and collects the
//! results into a [`PageReport`]. A failure is confined to the panel that
//! raised it; the rest of the page still renders.

pub mod attribution;
pub mod campaign;
pub mod customer;
pub mod executive;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod geographic;
pub mod ml;
pub mod product;

use crate::aggregator::{aggregate, Filter, ReductionSpec};
use crate::chart::ChartDescription;
use crate::source::{ColumnType, Table, TableCache, Value};
use crate::utils::config::{DashboardConfig, SCHEMA_VERSION};
use crate::utils::error::{AggregateError, PageError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The seven dashboard pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageId {
    Executive,
    Campaign,
    Customer,
    Product,
    Geographic,
    Attribution,
    Ml,
}

impl PageId {
    pub const ALL: [PageId; 7] = [
        PageId::Executive,
        PageId::Campaign,
        PageId::Customer,
        PageId::Product,
        PageId::Geographic,
        PageId::Attribution,
        PageId::Ml,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PageId::Executive => "executive",
            PageId::Campaign => "campaign",
            PageId::Customer => "customer",
            PageId::Product => "product",
            PageId::Geographic => "geographic",
            PageId::Attribution => "attribution",
            PageId::Ml => "ml",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PageId::Executive => "Executive Overview",
            PageId::Campaign => "Campaign Analytics",
            PageId::Customer => "Customer Insights",
            PageId::Product => "Product Performance",
            PageId::Geographic => "Geographic Analysis",
            PageId::Attribution => "Attribution & Funnel",
            PageId::Ml => "ML Model Evaluation",
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PageId {
    type Err = PageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        PageId::ALL
            .iter()
            .copied()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| PageError::UnknownPage(s.to_string()))
    }
}

/// One KPI tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricCard {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
}

impl MetricCard {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            delta: None,
        }
    }

    pub fn with_delta(mut self, delta: impl Into<String>) -> Self {
        self.delta = Some(delta.into());
        self
    }
}

/// What a panel ended up showing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PanelOutcome {
    Chart(ChartDescription),
    Table(Table),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub title: String,
    pub outcome: PanelOutcome,
    /// Visible note when the panel shows a coarser view than requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl Panel {
    fn from_result<T>(title: String, result: Result<T, PageError>, wrap: impl FnOnce(T) -> PanelOutcome) -> Self {
        let outcome = match result {
            Ok(value) => wrap(value),
            Err(err) => {
                warn!("Panel '{}' failed: {}", title, err);
                PanelOutcome::Failed { error: err.to_string() }
            }
        };
        Self {
            title,
            outcome,
            notice: None,
        }
    }

    /// Chart panel; an error becomes a failed panel
    pub fn chart(title: impl Into<String>, build: impl FnOnce() -> Result<ChartDescription, PageError>) -> Self {
        Self::from_result(title.into(), build(), PanelOutcome::Chart)
    }

    /// Table panel; an error becomes a failed panel
    pub fn table(title: impl Into<String>, build: impl FnOnce() -> Result<Table, PageError>) -> Self {
        Self::from_result(title.into(), build(), PanelOutcome::Table)
    }

    /// Chart panel whose builder may fall back to a coarser view
    ///
    /// The builder returns the chart plus the notice explaining the fallback.
    pub fn chart_with_notice(
        title: impl Into<String>,
        build: impl FnOnce() -> Result<(ChartDescription, Option<String>), PageError>,
    ) -> Self {
        Self::with_notice(title.into(), build(), PanelOutcome::Chart)
    }

    /// Table counterpart of [`Panel::chart_with_notice`]
    pub fn table_with_notice(
        title: impl Into<String>,
        build: impl FnOnce() -> Result<(Table, Option<String>), PageError>,
    ) -> Self {
        Self::with_notice(title.into(), build(), PanelOutcome::Table)
    }

    fn with_notice<T>(
        title: String,
        result: Result<(T, Option<String>), PageError>,
        wrap: impl FnOnce(T) -> PanelOutcome,
    ) -> Self {
        let mut notice = None;
        let result = result.map(|(value, note)| {
            notice = note;
            value
        });
        let mut panel = Self::from_result(title, result, wrap);
        panel.notice = notice;
        panel
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, PanelOutcome::Failed { .. })
    }

    pub fn chart_description(&self) -> Option<&ChartDescription> {
        match &self.outcome {
            PanelOutcome::Chart(chart) => Some(chart),
            _ => None,
        }
    }

    pub fn table_data(&self) -> Option<&Table> {
        match &self.outcome {
            PanelOutcome::Table(table) => Some(table),
            _ => None,
        }
    }
}

/// Everything one page shows for one set of selections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    pub schema_version: String,
    pub page: PageId,
    pub title: String,
    pub generated_at: String,
    pub metrics: Vec<MetricCard>,
    pub panels: Vec<Panel>,
}

impl PageReport {
    pub fn new(page: PageId) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            page,
            title: page.title().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            metrics: Vec::new(),
            panels: Vec::new(),
        }
    }

    pub fn push(&mut self, panel: Panel) {
        self.panels.push(panel);
    }

    /// Append metric cards; a failure is recorded as a failed panel
    pub fn add_metrics(&mut self, section: &str, build: impl FnOnce() -> Result<Vec<MetricCard>, PageError>) {
        match build() {
            Ok(cards) => self.metrics.extend(cards),
            Err(err) => {
                warn!("Metrics '{}' failed: {}", section, err);
                self.panels.push(Panel {
                    title: section.to_string(),
                    outcome: PanelOutcome::Failed { error: err.to_string() },
                    notice: None,
                });
            }
        }
    }

    pub fn panel(&self, title: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.title == title)
    }

    pub fn metric(&self, label: &str) -> Option<&MetricCard> {
        self.metrics.iter().find(|m| m.label == label)
    }

    pub fn failed_panels(&self) -> usize {
        self.panels.iter().filter(|p| p.is_failed()).count()
    }
}

/// Build any page from JSON selections (missing fields take defaults)
///
/// **Public** - entry point used by the CLI
///
/// # Errors
/// * `serde_json::Error` - selections do not match the page's shape
pub fn render_page(
    cache: &TableCache,
    page: PageId,
    selections: Option<serde_json::Value>,
    config: &DashboardConfig,
) -> Result<PageReport, serde_json::Error> {
    fn parse<T: serde::de::DeserializeOwned + Default>(value: Option<serde_json::Value>) -> Result<T, serde_json::Error> {
        value.map_or_else(|| Ok(T::default()), serde_json::from_value)
    }

    info!("Building page: {}", page.title());
    let report = match page {
        PageId::Executive => executive::build(cache, &parse(selections)?, config),
        PageId::Campaign => campaign::build(cache, &parse(selections)?, config),
        PageId::Customer => customer::build(cache, &parse(selections)?, config),
        PageId::Product => product::build(cache, &parse(selections)?, config),
        PageId::Geographic => geographic::build(cache, &parse(selections)?, config),
        PageId::Attribution => attribution::build(cache, &parse(selections)?, config),
        PageId::Ml => ml::build(cache, &parse(selections)?, config),
    };
    info!(
        "Page {} built: {} metrics, {} panels ({} failed)",
        page,
        report.metrics.len(),
        report.panels.len(),
        report.failed_panels()
    );
    Ok(report)
}

/// Single-row reductions over a whole table, returned as numbers
pub(crate) fn totals(table: &Table, reductions: &[ReductionSpec]) -> Result<Vec<f64>, PageError> {
    let result = aggregate(table, &[], &[], reductions)?;
    let row = result.row(0).ok_or_else(|| AggregateError::EmptyGroup {
        column: "*".to_string(),
    })?;
    reductions
        .iter()
        .map(|spec| {
            row.get(spec.output_name())
                .and_then(Value::as_f64)
                .ok_or_else(|| {
                    PageError::from(AggregateError::TypeMismatch {
                        column: spec.output_name().to_string(),
                        expected: "numeric",
                    })
                })
        })
        .collect()
}

/// Membership filter from a multiselect; `None` means every value
///
/// Selected strings are coerced to the column's type, so numeric years and
/// quarters can be selected by their text.
pub(crate) fn membership(table: &Table, column: &str, selected: &Option<Vec<String>>) -> Result<Vec<Filter>, PageError> {
    let Some(selected) = selected else {
        return Ok(Vec::new());
    };
    let kind = table
        .column_type(column)
        .ok_or_else(|| AggregateError::MissingColumn(column.to_string()))?;

    let values = selected
        .iter()
        .map(|s| coerce(s, kind, column))
        .collect::<Result<Vec<Value>, _>>()?;
    Ok(vec![Filter::is_in(column, values)])
}

fn coerce(raw: &str, kind: ColumnType, column: &str) -> Result<Value, AggregateError> {
    let mismatch = || AggregateError::TypeMismatch {
        column: column.to_string(),
        expected: kind.name(),
    };
    match kind {
        ColumnType::Text => Ok(Value::text(raw)),
        ColumnType::Number => raw.trim().parse::<f64>().map(Value::Number).map_err(|_| mismatch()),
        ColumnType::Bool => raw.trim().parse::<bool>().map(Value::Bool).map_err(|_| mismatch()),
        ColumnType::Date => chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| mismatch()),
    }
}

/// Human label for a snake_case column name (`profit_margin` -> `Profit Margin`)
pub(crate) fn title_case(column: &str) -> String {
    column
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strength band of a correlation coefficient
pub(crate) fn correlation_strength(r: f64) -> &'static str {
    use crate::utils::config::{MODERATE_CORRELATION, STRONG_CORRELATION};
    let magnitude = r.abs();
    if magnitude > STRONG_CORRELATION {
        "Strong"
    } else if magnitude > MODERATE_CORRELATION {
        "Moderate"
    } else {
        "Weak"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Reduction;

    #[test]
    fn test_page_id_from_str() {
        assert_eq!("attribution".parse::<PageId>().unwrap(), PageId::Attribution);
        assert_eq!("ML".parse::<PageId>().unwrap(), PageId::Ml);
        assert!(matches!("sales".parse::<PageId>(), Err(PageError::UnknownPage(_))));
    }

    #[test]
    fn test_failed_panel_keeps_error_message() {
        let panel = Panel::table("Broken", || Err(AggregateError::MissingColumn("region".to_string()).into()));
        assert!(panel.is_failed());
        assert_eq!(
            panel.outcome,
            PanelOutcome::Failed {
                error: "Column not found: region".to_string()
            }
        );
    }

    #[test]
    fn test_failed_metrics_become_a_panel() {
        let mut report = PageReport::new(PageId::Executive);
        report.add_metrics("Key Metrics", || Err(AggregateError::MissingColumn("roas".to_string()).into()));
        assert!(report.metrics.is_empty());
        assert_eq!(report.failed_panels(), 1);
    }

    #[test]
    fn test_membership_coerces_numbers() {
        let table = Table::infer(&["year"], vec![vec![2023.0.into()], vec![2024.0.into()]]).unwrap();
        let filters = membership(&table, "year", &Some(vec!["2024".to_string()])).unwrap();
        assert_eq!(filters, vec![Filter::is_in("year", [2024.0])]);
        assert!(membership(&table, "year", &None).unwrap().is_empty());
        assert!(membership(&table, "year", &Some(vec!["last".to_string()])).is_err());
    }

    #[test]
    fn test_totals() {
        let table = Table::infer(&["revenue"], vec![vec![10.0.into()], vec![30.0.into()]]).unwrap();
        let values = totals(
            &table,
            &[
                ReductionSpec::new("revenue", Reduction::Sum),
                ReductionSpec::new("revenue", Reduction::Mean).named("avg"),
            ],
        )
        .unwrap();
        assert_eq!(values, vec![40.0, 20.0]);
    }

    #[test]
    fn test_title_case_and_strength() {
        assert_eq!(title_case("market_penetration"), "Market Penetration");
        assert_eq!(correlation_strength(-0.75), "Strong");
        assert_eq!(correlation_strength(0.5), "Moderate");
        assert_eq!(correlation_strength(0.4), "Weak");
    }
}
