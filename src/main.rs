//! NovaMart Analytics CLI
//!
//! Builds dashboard pages from the marketing datasets and writes each page
//! as a JSON report of metric cards and chart descriptions.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use novamart_analytics::commands::{
    display_schema, display_version, execute_render, execute_render_all, list_datasets, validate_report_file,
    RenderAllArgs, RenderArgs,
};
use novamart_analytics::pages::PageId;
use novamart_analytics::utils::config::{load_config, DashboardConfig};

/// NovaMart Analytics - marketing dashboard data engine
#[derive(Parser, Debug)]
#[command(name = "novamart")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the dataset CSVs (overrides the config file)
    #[arg(short, long, global = true, env = "NOVAMART_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Dashboard config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build one dashboard page
    Render {
        /// Page to build (executive, campaign, customer, product, geographic, attribution, ml)
        #[arg(short, long)]
        page: String,

        /// JSON file with page selections
        #[arg(short, long)]
        selections: Option<PathBuf>,

        /// Output path for the JSON report (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print a text summary of the page
        #[arg(long)]
        summary: bool,

        /// Export each chart as JSON into this directory
        #[arg(long)]
        chart_dir: Option<PathBuf>,

        /// Export chart summaries without data rows
        #[arg(long, requires = "chart_dir")]
        chart_summary: bool,
    },

    /// Build every page with default selections
    RenderAll {
        /// Directory receiving one JSON report per page
        #[arg(short, long, default_value = "reports")]
        output_dir: PathBuf,
    },

    /// Load every dataset and show its shape
    Datasets,

    /// Validate a page report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let mut config = match &cli.config {
        Some(path) => load_config(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config = config.with_data_dir(data_dir);
    }

    match cli.command {
        Commands::Render {
            page,
            selections,
            output,
            summary,
            chart_dir,
            chart_summary,
        } => {
            let page: PageId = page.parse()?;
            let args = RenderArgs {
                page,
                selections,
                output,
                config,
                print_summary: summary,
                chart_dir,
                chart_summary,
            };
            execute_render(args)?;
        }

        Commands::RenderAll { output_dir } => {
            let written = execute_render_all(RenderAllArgs { output_dir, config })?;
            println!("✓ Wrote {} page reports", written.len());
        }

        Commands::Datasets => {
            let failures = list_datasets(&config.data_dir);
            if failures > 0 {
                bail!("{} dataset(s) could not be loaded", failures);
            }
        }

        Commands::Validate { file } => {
            validate_report_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
