//! Render command implementation.
//!
//! The render command:
//! 1. Reads the page selections (if any)
//! 2. Builds the page against the cached datasets
//! 3. Writes the page report as JSON
//! 4. Optionally exports each chart through a render sink
//! 5. Optionally prints a text summary

use super::models::{RenderAllArgs, RenderArgs};
use crate::output::{report_to_string, write_report, JsonSink, RenderSink};
use crate::pages::{render_page, PageId, PageReport, PanelOutcome};
use crate::source::TableCache;
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Execute the render command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Render command arguments
///
/// # Returns
/// The built report, after it has been written or printed
///
/// # Errors
/// * Selections file unreadable or not shaped like the page's selections
/// * Report write errors
///
/// # Example
/// ```ignore
/// let args = RenderArgs {
///     page: PageId::Customer,
///     selections: Some(PathBuf::from("customer.json")),
///     output: Some(PathBuf::from("reports/customer.json")),
///     ..Default::default()
/// };
/// execute_render(args)?;
/// ```
pub fn execute_render(args: RenderArgs) -> Result<PageReport> {
    let start_time = Instant::now();
    validate_args(&args)?;

    info!("Rendering page: {}", args.page.title());
    info!("Data directory: {}", args.config.data_dir.display());

    let selections = match &args.selections {
        Some(path) => Some(read_selections(path)?),
        None => None,
    };

    let cache = TableCache::new(&args.config.data_dir);
    let report = render_page(&cache, args.page, selections, &args.config)
        .with_context(|| format!("Selections do not match the {} page", args.page))?;

    match &args.output {
        Some(path) => {
            write_report(&report, path).context("Failed to write page report")?;
            info!("✓ Report written to: {}", path.display());
        }
        None => println!("{}", report_to_string(&report).context("Failed to serialize page report")?),
    }

    if let Some(dir) = &args.chart_dir {
        let sink = if args.chart_summary {
            JsonSink::new().summary_only()
        } else {
            JsonSink::new()
        };
        let written = export_charts(&report, &sink, dir)?;
        info!("✓ {} charts exported to: {}", written.len(), dir.display());
    }

    if args.print_summary {
        print_summary(&report);
    }

    if report.failed_panels() > 0 {
        warn!("{} of {} panels failed", report.failed_panels(), report.panels.len());
    }
    info!("Render completed in {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(report)
}

/// Build every page with default selections into `output_dir`
///
/// One cache is shared across pages, so each dataset is read once.
pub fn execute_render_all(args: RenderAllArgs) -> Result<Vec<PathBuf>> {
    let start_time = Instant::now();
    let cache = TableCache::new(&args.config.data_dir);
    let mut written = Vec::with_capacity(PageId::ALL.len());

    for page in PageId::ALL {
        let report = render_page(&cache, page, None, &args.config)
            .with_context(|| format!("Failed to build the {} page", page))?;
        let path = args.output_dir.join(format!("{}.json", page.name()));
        write_report(&report, &path).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(
            "✓ {} ({} panels, {} failed) -> {}",
            page.title(),
            report.panels.len(),
            report.failed_panels(),
            path.display()
        );
        written.push(path);
    }

    info!(
        "Rendered {} pages in {:.2}s",
        written.len(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(written)
}

/// Validate render arguments before touching any dataset
pub fn validate_args(args: &RenderArgs) -> Result<()> {
    if !args.config.data_dir.is_dir() {
        bail!("Data directory not found: {}", args.config.data_dir.display());
    }
    if let Some(path) = &args.selections {
        if !path.is_file() {
            bail!("Selections file not found: {}", path.display());
        }
    }
    Ok(())
}

/// Write every successful chart panel of `report` through `sink`
///
/// Files are named after the panel title (`Revenue Trend (Daily)` becomes
/// `revenue_trend_daily.json`). Failed and table panels are skipped.
///
/// # Errors
/// * Sink errors for any chart
/// * Directory or file write errors
pub fn export_charts<S>(report: &PageReport, sink: &S, dir: &Path) -> Result<Vec<PathBuf>>
where
    S: RenderSink<Output = serde_json::Value>,
{
    let panels: Vec<_> = report
        .panels
        .iter()
        .filter_map(|p| p.chart_description().map(|chart| (p.title.as_str(), chart)))
        .collect();
    let charts: Vec<_> = panels.iter().map(|(_, chart)| *chart).collect();
    let rendered = sink.render_all(&charts).context("Failed to render charts")?;

    fs::create_dir_all(dir).with_context(|| format!("Failed to create chart directory: {}", dir.display()))?;
    let mut written = Vec::with_capacity(rendered.len());
    for ((title, _), document) in panels.iter().zip(rendered) {
        let path = dir.join(format!("{}.json", file_stem(title)));
        let contents = serde_json::to_string_pretty(&document).context("Failed to serialize chart")?;
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

fn file_stem(title: &str) -> String {
    title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

fn read_selections(path: &Path) -> Result<serde_json::Value> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read selections: {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Selections are not valid JSON: {}", path.display()))
}

fn print_summary(report: &PageReport) {
    println!("\n{}", "=".repeat(80));
    println!("{}", report.title.to_uppercase());
    println!("{}", "=".repeat(80));

    for card in &report.metrics {
        match &card.delta {
            Some(delta) => println!("  {:<32} {} ({})", card.label, card.value, delta),
            None => println!("  {:<32} {}", card.label, card.value),
        }
    }

    println!();
    for panel in &report.panels {
        let status = match &panel.outcome {
            PanelOutcome::Chart(chart) => format!("✓ {} chart, {} rows", chart.kind, chart.data.len()),
            PanelOutcome::Table(table) => format!("✓ table, {} rows", table.len()),
            PanelOutcome::Failed { error } => format!("✗ {}", error),
        };
        println!("  {:<40} {}", panel.title, status);
        if let Some(notice) = &panel.notice {
            println!("  {:<40} note: {}", "", notice);
        }
    }
    println!("{}", "=".repeat(80));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::DashboardConfig;

    #[test]
    fn test_validate_args_missing_data_dir() {
        let args = RenderArgs {
            config: DashboardConfig::new().with_data_dir("/definitely/not/here"),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_missing_selections() {
        let dir = tempfile::tempdir().unwrap();
        let args = RenderArgs {
            selections: Some(dir.path().join("nope.json")),
            config: DashboardConfig::new().with_data_dir(dir.path()),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_bad_selections_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let selections = dir.path().join("sel.json");
        fs::write(&selections, r#"{"period": "fortnight"}"#).unwrap();

        let args = RenderArgs {
            selections: Some(selections),
            output: Some(dir.path().join("out.json")),
            config: DashboardConfig::new().with_data_dir(dir.path()),
            ..Default::default()
        };
        let err = execute_render(args).unwrap_err();
        assert!(err.to_string().contains("executive"));
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Revenue Trend (Daily)"), "revenue_trend_daily");
        assert_eq!(file_stem("Top 10 Products"), "top_10_products");
    }

    #[test]
    fn test_chart_export_skips_failed_panels() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("funnel_data.csv"),
            "stage,visitors\nAwareness,1000\nInterest,400\nPurchase,50\n",
        )
        .unwrap();
        let charts = dir.path().join("charts");
        let args = RenderArgs {
            page: PageId::Attribution,
            output: Some(dir.path().join("attribution.json")),
            config: DashboardConfig::new().with_data_dir(dir.path()),
            chart_dir: Some(charts.clone()),
            chart_summary: true,
            ..Default::default()
        };
        execute_render(args).unwrap();

        let exported: Vec<_> = fs::read_dir(&charts).unwrap().collect();
        assert_eq!(exported.len(), 1);
        let funnel: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(charts.join("conversion_funnel.json")).unwrap()).unwrap();
        assert_eq!(funnel["rows"], 3);
        assert!(funnel.get("data").is_none());
    }

    #[test]
    fn test_render_with_missing_files_still_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.json");
        let args = RenderArgs {
            page: PageId::Geographic,
            output: Some(output.clone()),
            config: DashboardConfig::new().with_data_dir(dir.path()),
            ..Default::default()
        };

        let report = execute_render(args).unwrap();
        assert_eq!(report.failed_panels(), report.panels.len());
        assert!(output.exists());
    }
}
