//! Row filters applied before grouping.
//!
//! Filters are ANDed together; an empty filter list keeps every row.

use crate::source::table::{Table, Value, ValueKey};
use crate::utils::error::AggregateError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Condition a single cell must satisfy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Cell is one of the listed values (multiselect widgets)
    In { values: Vec<Value> },
    /// Cell lies within inclusive bounds; a missing bound is open
    Range { min: Option<Value>, max: Option<Value> },
    /// Cell equals the value
    Eq { value: Value },
}

/// A `(column, predicate)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    #[serde(flatten)]
    pub predicate: Predicate,
}

impl Filter {
    pub fn is_in<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::In {
                values: values.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn between(column: impl Into<String>, min: Option<Value>, max: Option<Value>) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::Range { min, max },
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::Eq { value: value.into() },
        }
    }

    /// Operands this filter compares against (nulls excluded)
    fn operands(&self) -> Vec<&Value> {
        match &self.predicate {
            Predicate::In { values } => values.iter().collect(),
            Predicate::Range { min, max } => min.iter().chain(max.iter()).collect(),
            Predicate::Eq { value } => vec![value],
        }
        .into_iter()
        .filter(|v| !v.is_null())
        .collect()
    }
}

/// Filter compiled against a concrete table
struct BoundFilter<'f> {
    index: usize,
    predicate: &'f Predicate,
    members: HashSet<ValueKey>,
}

impl BoundFilter<'_> {
    fn matches(&self, value: &Value) -> bool {
        match self.predicate {
            Predicate::In { .. } => self.members.contains(&value.key()),
            Predicate::Eq { value: wanted } => value.key() == wanted.key(),
            Predicate::Range { min, max } => {
                if value.is_null() {
                    return false;
                }
                let above = min.as_ref().map_or(true, |lo| {
                    matches!(value.compare(lo), Some(Ordering::Greater | Ordering::Equal))
                });
                let below = max.as_ref().map_or(true, |hi| {
                    matches!(value.compare(hi), Some(Ordering::Less | Ordering::Equal))
                });
                above && below
            }
        }
    }
}

/// Keep the rows matching every filter
///
/// **Public** - first stage of every aggregation
///
/// # Errors
/// * `AggregateError::MissingColumn` - a filter names an absent column
/// * `AggregateError::TypeMismatch` - an operand's type differs from the column's
pub fn apply_filters(table: &Table, filters: &[Filter]) -> Result<Table, AggregateError> {
    if filters.is_empty() {
        return Ok(table.clone());
    }

    let bound = filters
        .iter()
        .map(|f| bind(table, f))
        .collect::<Result<Vec<_>, _>>()?;

    let keep: Vec<usize> = table
        .raw_rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| bound.iter().all(|b| b.matches(&row[b.index])))
        .map(|(i, _)| i)
        .collect();

    debug!("Filters kept {} of {} rows", keep.len(), table.len());
    Ok(table.take_rows(&keep))
}

fn bind<'f>(table: &Table, filter: &'f Filter) -> Result<BoundFilter<'f>, AggregateError> {
    let index = table.require_column(&filter.column)?;
    let kind = table.columns()[index].kind;

    for operand in filter.operands() {
        if operand.column_type() != Some(kind) {
            return Err(AggregateError::TypeMismatch {
                column: filter.column.clone(),
                expected: kind.name(),
            });
        }
    }

    let members = match &filter.predicate {
        Predicate::In { values } => values.iter().map(Value::key).collect(),
        _ => HashSet::new(),
    };

    Ok(BoundFilter {
        index,
        predicate: &filter.predicate,
        members,
    })
}
