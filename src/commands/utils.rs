use crate::output::read_report;
use crate::source::{Dataset, TableCache};
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Validate a page report JSON file
pub fn validate_report_file(file_path: PathBuf) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(&file_path).with_context(|| format!("Invalid report: {}", file_path.display()))?;
    if report.schema_version != SCHEMA_VERSION {
        bail!(
            "Report schema v{} does not match supported v{}",
            report.schema_version,
            SCHEMA_VERSION
        );
    }

    println!("✓ Valid page report JSON");
    println!("  Version: {}", report.schema_version);
    println!("  Page: {} ({})", report.title, report.page);
    println!("  Generated: {}", report.generated_at);
    println!("  Metrics: {}", report.metrics.len());
    println!("  Panels: {} ({} failed)", report.panels.len(), report.failed_panels());

    Ok(())
}

/// Load every dataset once and print its shape
///
/// Returns the number of datasets that failed to load.
pub fn list_datasets(data_dir: &Path) -> usize {
    println!("Datasets in {}", data_dir.display());
    println!();

    let cache = TableCache::new(data_dir);
    let mut failures = 0;
    for dataset in Dataset::ALL {
        match cache.load_dataset(dataset) {
            Ok(table) => println!(
                "  ✓ {:<24} {:>7} rows  {}",
                dataset.name(),
                table.len(),
                table.column_names().join(", ")
            ),
            Err(err) => {
                failures += 1;
                println!("  ✗ {:<24} {}", dataset.name(), err);
            }
        }
    }
    failures
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("NovaMart Analytics Page Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  schema_version: string   - Schema version (e.g., '1.0.0')");
        println!("  page: string             - Page id (executive, campaign, ...)");
        println!("  title: string            - Page title");
        println!("  generated_at: string     - ISO 8601 timestamp");
        println!("  metrics: array           - Metric cards");
        println!("    label: string          - Card label");
        println!("    value: string          - Formatted value");
        println!("    delta: string?         - Secondary line");
        println!("  panels: array            - Charts and tables");
        println!("    title: string          - Panel title");
        println!("    outcome: object        - Tagged by status: chart | table | failed");
        println!("    notice: string?        - Fallback note shown with the panel");
        println!();
        println!("Datasets:");
        for dataset in Dataset::ALL {
            let columns: Vec<&str> = dataset.columns().iter().map(|c| c.name).collect();
            println!("  {:<24} {}", dataset.file_name(), columns.join(", "));
        }
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("NovaMart Analytics v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Marketing analytics dashboard engine: datasets in, chart descriptions out.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::write_report;
    use crate::pages::{PageId, PageReport};

    #[test]
    fn test_validate_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report(&PageReport::new(PageId::Ml), &path).unwrap();
        assert!(validate_report_file(path).is_ok());
    }

    #[test]
    fn test_validate_rejects_other_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut report = PageReport::new(PageId::Ml);
        report.schema_version = "0.1.0".to_string();
        write_report(&report, &path).unwrap();
        assert!(validate_report_file(path).is_err());
    }

    #[test]
    fn test_list_datasets_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("funnel_data.csv"), "stage,visitors\nAwareness,100\n").unwrap();
        assert_eq!(list_datasets(dir.path()), Dataset::COUNT - 1);
    }
}
