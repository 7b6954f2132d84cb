//! Chart description model handed to the rendering sink.

use crate::source::table::{SortOrder, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Every chart kind the preparer can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    Area,
    Scatter,
    Histogram,
    Box,
    Violin,
    Pie,
    Donut,
    Heatmap,
    Funnel,
    Treemap,
    ConfusionMatrix,
    RocCurve,
    FeatureImportance,
    LearningCurve,
}

/// Role a column plays in a chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    X,
    Y,
    Color,
    Size,
    Text,
    Parent,
    Error,
}

impl Binding {
    pub const ALL: [Binding; 7] = [
        Binding::X,
        Binding::Y,
        Binding::Color,
        Binding::Size,
        Binding::Text,
        Binding::Parent,
        Binding::Error,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Binding::X => "x",
            Binding::Y => "y",
            Binding::Color => "color",
            Binding::Size => "size",
            Binding::Text => "text",
            Binding::Parent => "parent",
            Binding::Error => "error",
        }
    }
}

impl ChartKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Area => "area",
            ChartKind::Scatter => "scatter",
            ChartKind::Histogram => "histogram",
            ChartKind::Box => "box",
            ChartKind::Violin => "violin",
            ChartKind::Pie => "pie",
            ChartKind::Donut => "donut",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Funnel => "funnel",
            ChartKind::Treemap => "treemap",
            ChartKind::ConfusionMatrix => "confusion_matrix",
            ChartKind::RocCurve => "roc_curve",
            ChartKind::FeatureImportance => "feature_importance",
            ChartKind::LearningCurve => "learning_curve",
        }
    }

    /// Bindings that must be set for this kind
    pub fn required_bindings(&self) -> &'static [Binding] {
        match self {
            ChartKind::Histogram | ChartKind::Heatmap => &[Binding::X],
            ChartKind::LearningCurve => &[],
            _ => &[Binding::X, Binding::Y],
        }
    }

    /// Kinds whose `y` binding carries the plotted quantity
    pub(crate) fn needs_numeric_y(&self) -> bool {
        matches!(
            self,
            ChartKind::Bar
                | ChartKind::Line
                | ChartKind::Area
                | ChartKind::Scatter
                | ChartKind::Box
                | ChartKind::Violin
                | ChartKind::Pie
                | ChartKind::Donut
                | ChartKind::Funnel
                | ChartKind::Treemap
        )
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column names bound to each chart role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnBindings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ColumnBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the common `x`/`y` pair
    pub fn xy(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self::new().with_x(x).with_y(y)
    }

    pub fn with_x(mut self, column: impl Into<String>) -> Self {
        self.x = Some(column.into());
        self
    }

    pub fn with_y(mut self, column: impl Into<String>) -> Self {
        self.y = Some(column.into());
        self
    }

    pub fn with_color(mut self, column: impl Into<String>) -> Self {
        self.color = Some(column.into());
        self
    }

    pub fn with_size(mut self, column: impl Into<String>) -> Self {
        self.size = Some(column.into());
        self
    }

    pub fn with_text(mut self, column: impl Into<String>) -> Self {
        self.text = Some(column.into());
        self
    }

    pub fn with_parent(mut self, column: impl Into<String>) -> Self {
        self.parent = Some(column.into());
        self
    }

    pub fn with_error(mut self, column: impl Into<String>) -> Self {
        self.error = Some(column.into());
        self
    }

    pub fn get(&self, binding: Binding) -> Option<&str> {
        let slot = match binding {
            Binding::X => &self.x,
            Binding::Y => &self.y,
            Binding::Color => &self.color,
            Binding::Size => &self.size,
            Binding::Text => &self.text,
            Binding::Parent => &self.parent,
            Binding::Error => &self.error,
        };
        slot.as_deref()
    }

    /// Bound column names in role order, without duplicates
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for column in Binding::ALL.iter().filter_map(|b| self.get(*b)) {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

/// Stacked bar normalisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarNorm {
    #[default]
    Absolute,
    /// Each stack sums to 100%
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarMode {
    #[default]
    Group,
    Stack,
    Overlay,
}

/// Which raw points box and violin plots draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointMode {
    #[default]
    Outliers,
    All,
    None,
}

/// Kind-specific chart options
///
/// Defaults match the dashboard's usual look; `prepare` rejects values
/// outside each option's domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    pub title: String,
    pub orientation: Orientation,
    /// Donut hole fraction in `[0, 1)`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole: Option<f64>,
    /// Histogram bin count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bins: Option<i64>,
    pub bar_norm: BarNorm,
    pub bar_mode: BarMode,
    pub markers: bool,
    pub points: PointMode,
    /// Fit a least-squares line through scatter points
    pub trendline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorscale: Option<String>,
    /// Sort the projected rows by `y`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
    /// Keep only the N largest rows by `y` (feature importance)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n: Option<usize>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            orientation: Orientation::Vertical,
            hole: None,
            bins: None,
            bar_norm: BarNorm::Absolute,
            bar_mode: BarMode::Group,
            markers: true,
            points: PointMode::Outliers,
            trendline: false,
            colorscale: None,
            sort: None,
            top_n: None,
        }
    }
}

impl ChartOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_hole(mut self, hole: f64) -> Self {
        self.hole = Some(hole);
        self
    }

    pub fn with_bins(mut self, bins: i64) -> Self {
        self.bins = Some(bins);
        self
    }

    pub fn with_bar_norm(mut self, norm: BarNorm) -> Self {
        self.bar_norm = norm;
        self
    }

    pub fn with_bar_mode(mut self, mode: BarMode) -> Self {
        self.bar_mode = mode;
        self
    }

    pub fn with_points(mut self, points: PointMode) -> Self {
        self.points = points;
        self
    }

    pub fn with_trendline(mut self, trendline: bool) -> Self {
        self.trendline = trendline;
        self
    }

    pub fn with_colorscale(mut self, colorscale: impl Into<String>) -> Self {
        self.colorscale = Some(colorscale.into());
        self
    }

    pub fn with_sort(mut self, order: SortOrder) -> Self {
        self.sort = Some(order);
        self
    }

    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }
}

/// Everything a renderer needs to draw one chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDescription {
    pub kind: ChartKind,
    pub title: String,
    pub bindings: ColumnBindings,
    pub options: ChartOptions,
    /// Input rows projected onto the bound columns
    pub data: Table,
    /// Named scalar statistics (`auc`, `accuracy`, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stats: BTreeMap<String, f64>,
}

impl ChartDescription {
    pub fn new(kind: ChartKind, bindings: ColumnBindings, options: ChartOptions, data: Table) -> Self {
        Self {
            kind,
            title: options.title.clone(),
            bindings,
            options,
            data,
            stats: BTreeMap::new(),
        }
    }

    pub fn with_stat(mut self, name: impl Into<String>, value: f64) -> Self {
        self.stats.insert(name.into(), value);
        self
    }

    pub fn stat(&self, name: &str) -> Option<f64> {
        self.stats.get(name).copied()
    }
}
