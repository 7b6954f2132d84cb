//! Chart preparation.
//!
//! This module turns tables into renderer-neutral chart descriptions:
//! - Column binding and option validation for every chart kind
//! - Projection of the source table onto the bound columns
//! - Model evaluation charts (confusion matrix, ROC, feature importance,
//!   learning curve)

pub mod description;
pub mod ml;
pub mod preparer;

// Re-export main types and functions
pub use description::{
    BarMode, BarNorm, Binding, ChartDescription, ChartKind, ChartOptions, ColumnBindings, Orientation, PointMode,
};
pub use ml::{
    confusion_matrix, confusion_matrix_chart, feature_importance, labels_from_column, learning_curve, roc_chart,
    roc_curve, scores_from_column, threshold_labels, ConfusionMatrix, RocCurve, RocPoint,
};
pub use preparer::prepare;
