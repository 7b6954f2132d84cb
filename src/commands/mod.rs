//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the library components to perform user tasks.

pub mod models;
pub mod render;
pub mod utils;

// Re-export main command functions
pub use models::{RenderAllArgs, RenderArgs};
pub use render::{execute_render, execute_render_all, export_charts, validate_args};
pub use utils::{display_schema, display_version, list_datasets, validate_report_file};
