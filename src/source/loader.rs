//! CSV reading and column type inference.
//!
//! Every cell is read as text first. A column then gets the narrowest type
//! that all of its non-empty cells parse as: number, then bool, then date,
//! falling back to text.

use super::schema::{resolve_schema, Dataset};
use super::table::{Column, ColumnType, Table, Value};
use crate::utils::error::SourceError;
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use log::{debug, info};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Parse CSV text into a typed table
///
/// **Public** - used by the cache and by tests building tables from strings
///
/// # Arguments
/// * `label` - Name used in error messages (dataset name or file name)
/// * `reader` - Any byte source holding CSV with a header row
///
/// # Errors
/// * `SourceError::DatasetUnreadable` - malformed CSV, ragged rows, bad UTF-8
pub fn parse_csv(label: &str, reader: impl Read) -> Result<Table, SourceError> {
    let unreadable = |reason: String| SourceError::DatasetUnreadable {
        dataset: label.to_string(),
        reason,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| unreadable(format!("CSV header error: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| unreadable(format!("CSV record error: {}", e)))?;
        raw_rows.push(record.iter().map(|field| field.to_string()).collect());
    }

    let kinds: Vec<ColumnType> = (0..headers.len())
        .map(|ci| infer_column_type(raw_rows.iter().map(|r| r[ci].as_str())))
        .collect();

    let columns: Vec<Column> = headers
        .iter()
        .zip(&kinds)
        .map(|(name, kind)| Column::new(name.clone(), *kind))
        .collect();

    let rows: Vec<Vec<Value>> = raw_rows
        .iter()
        .map(|r| r.iter().zip(&kinds).map(|(cell, kind)| parse_cell(cell, *kind)).collect())
        .collect();

    debug!("{}: parsed {} rows x {} columns", label, rows.len(), columns.len());

    Table::from_rows(columns, rows).map_err(|e| unreadable(e.to_string()))
}

/// Read one dataset from a data directory, resolving its schema
///
/// **Public** - the cache calls this on a miss
pub fn read_dataset(data_dir: &Path, dataset: Dataset) -> Result<Table, SourceError> {
    let path = data_dir.join(dataset.file_name());
    info!("Loading dataset {} from {}", dataset, path.display());

    let file = File::open(&path).map_err(|e| SourceError::DatasetUnreadable {
        dataset: dataset.to_string(),
        reason: format!("{}: {}", path.display(), e),
    })?;

    let table = parse_csv(dataset.name(), file)?;
    let table = resolve_schema(dataset, table)?;

    info!("Loaded {} ({} rows)", dataset, table.len());
    Ok(table)
}

/// Pick the narrowest type every non-empty cell parses as
fn infer_column_type<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> ColumnType {
    let mut non_empty = cells.filter(|c| !c.is_empty()).peekable();
    if non_empty.peek().is_none() {
        return ColumnType::Text;
    }

    if non_empty.clone().all(|c| parse_number(c).is_some()) {
        ColumnType::Number
    } else if non_empty.clone().all(|c| parse_bool(c).is_some()) {
        ColumnType::Bool
    } else if non_empty.all(|c| parse_date(c).is_some()) {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}

fn parse_cell(cell: &str, kind: ColumnType) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    let parsed = match kind {
        // "NaN" cells keep the column numeric but load as missing
        ColumnType::Number => parse_number(cell).filter(|n| !n.is_nan()).map(Value::Number),
        ColumnType::Bool => parse_bool(cell).map(Value::Bool),
        ColumnType::Date => parse_date(cell).map(Value::Date),
        ColumnType::Text => Some(Value::Text(cell.to_string())),
    };
    parsed.unwrap_or(Value::Null)
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok()
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_date(cell: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(cell, "%Y-%m-%d %H:%M:%S").ok().map(|dt| dt.date()))
        .or_else(|| NaiveDateTime::parse_from_str(cell, "%Y-%m-%dT%H:%M:%S").ok().map(|dt| dt.date()))
}
