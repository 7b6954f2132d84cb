use crate::pages::PageId;
use crate::utils::config::DashboardConfig;
use std::path::PathBuf;

/// Arguments for the render command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct RenderArgs {
    /// Page to build
    pub page: PageId,

    /// JSON file with the page selections (defaults when absent)
    pub selections: Option<PathBuf>,

    /// Output path for the JSON report; stdout when absent
    pub output: Option<PathBuf>,

    /// Dashboard configuration (data dir, currency, decimals)
    pub config: DashboardConfig,

    /// Print metric cards and panel status to stdout
    pub print_summary: bool,

    /// Directory receiving one JSON file per rendered chart
    pub chart_dir: Option<PathBuf>,

    /// Export chart summaries (schema, row count, stats) without data rows
    pub chart_summary: bool,
}

impl Default for RenderArgs {
    fn default() -> Self {
        Self {
            page: PageId::Executive,
            selections: None,
            output: None,
            config: DashboardConfig::default(),
            print_summary: false,
            chart_dir: None,
            chart_summary: false,
        }
    }
}

/// Arguments for the render-all command
#[derive(Debug, Clone)]
pub struct RenderAllArgs {
    /// Directory receiving one `<page>.json` per page
    pub output_dir: PathBuf,

    pub config: DashboardConfig,
}

impl Default for RenderAllArgs {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            config: DashboardConfig::default(),
        }
    }
}
