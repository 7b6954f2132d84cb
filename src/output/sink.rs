//! Rendering sink abstraction.
//!
//! The plotting engine lives outside this crate. A sink receives a finished
//! [`ChartDescription`] and turns it into whatever artifact its renderer
//! needs.

use crate::chart::ChartDescription;
use crate::utils::error::OutputError;
use log::debug;
use serde_json::{json, Value as JsonValue};

/// Renderer boundary for chart descriptions
pub trait RenderSink {
    /// Artifact produced per chart
    type Output;

    /// Render one chart
    ///
    /// # Errors
    /// * `OutputError::SerializationFailed` - the description cannot be encoded
    /// * `OutputError::InvalidPath` - sink-specific target problems
    fn render(&self, chart: &ChartDescription) -> Result<Self::Output, OutputError>;

    /// Render several charts, stopping at the first failure
    fn render_all(&self, charts: &[&ChartDescription]) -> Result<Vec<Self::Output>, OutputError> {
        charts.iter().map(|chart| self.render(chart)).collect()
    }
}

/// Sink producing JSON documents
#[derive(Debug, Clone, Default)]
pub struct JsonSink {
    /// Omit the data rows, keeping only schema and stats
    pub summary_only: bool,
}

impl JsonSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary_only(mut self) -> Self {
        self.summary_only = true;
        self
    }
}

impl RenderSink for JsonSink {
    type Output = JsonValue;

    fn render(&self, chart: &ChartDescription) -> Result<JsonValue, OutputError> {
        debug!("Rendering {} chart '{}' as JSON", chart.kind, chart.title);

        if !self.summary_only {
            return serde_json::to_value(chart).map_err(OutputError::SerializationFailed);
        }

        Ok(json!({
            "kind": chart.kind,
            "title": chart.title,
            "bindings": serde_json::to_value(&chart.bindings)?,
            "columns": chart.data.column_names(),
            "rows": chart.data.len(),
            "stats": chart.stats,
        }))
    }
}
