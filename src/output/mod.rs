//! Output: metric formatting, report files and rendering sinks.
//!
//! This module handles:
//! - Human-readable metric card values (K/M/B, percent, currency)
//! - JSON page reports on disk
//! - The renderer boundary for chart descriptions

pub mod format;
pub mod json;
pub mod sink;

// Re-export main functions
pub use format::{format_currency, format_magnitude, format_percent, format_ratio, format_thousands};
pub use json::{read_report, report_to_string, write_report};
pub use sink::{JsonSink, RenderSink};
