//! Table Source: dataset loading, schema resolution and caching.
//!
//! This module handles:
//! - Reading the dataset CSVs into typed tables
//! - Renaming alias headers to canonical column names
//! - Memoizing loaded tables for the process lifetime

pub mod cache;
pub mod loader;
pub mod schema;
pub mod table;

// Re-export main types
pub use cache::TableCache;
pub use loader::{parse_csv, read_dataset};
pub use schema::{resolve_schema, ColumnSpec, Dataset};
pub use table::{Column, ColumnType, RowRef, SortOrder, Table, Value, ValueKey};
