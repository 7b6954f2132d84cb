//! Aggregation of source tables into derived tables.
//!
//! This module handles:
//! - Row filtering (set membership, ranges, equality)
//! - Group-by with sum/mean/count/min/max/std and friends
//! - Period bucketing, running sums, pivot and melt
//! - Correlation, column summaries and funnel drop-off

pub mod analysis;
pub mod engine;
pub mod filter;
pub mod reshape;

// Re-export main types and functions
pub use analysis::{
    correlation_matrix, correlation_pairs, describe, funnel_stages, pearson, CorrelationPair, Direction, Summary,
};
pub use engine::{aggregate, row_at_max, row_at_min, Reduction, ReductionSpec};
pub use filter::{apply_filters, Filter, Predicate};
pub use reshape::{aggregate_by_period, cumulative_sum, date_part, melt, pivot, CalendarPart, Period};
