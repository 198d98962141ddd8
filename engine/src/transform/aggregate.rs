//! Grouped summaries, ordering and truncation.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use super::grouper::{partition, KeyPart};
use crate::error::{SchemaError, TableError, TableResult};
use crate::models::{DataType, Field, Schema, Table, Value};

// =============================================================================
// Reducers
// =============================================================================

/// How a group's cells collapse into one value.
///
/// All reducers skip missing cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    /// Rows in the group, or present cells when a column is given.
    Count,
    Sum,
    Mean,
    Min,
    Max,
    /// First present cell.
    First,
    /// Last present cell.
    Last,
    /// Number of distinct present cells.
    NDistinct,
}

impl Reducer {
    fn needs_numeric(self) -> bool {
        matches!(self, Reducer::Sum | Reducer::Mean)
    }

    /// Output type given the input column type.
    fn output_type(self, input: Option<DataType>) -> Option<DataType> {
        match self {
            Reducer::Count | Reducer::NDistinct => Some(DataType::Int),
            Reducer::Mean => Some(DataType::Float),
            _ => input,
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reducer::Count => "count",
            Reducer::Sum => "sum",
            Reducer::Mean => "mean",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::First => "first",
            Reducer::Last => "last",
            Reducer::NDistinct => "n_distinct",
        };
        f.write_str(name)
    }
}

/// One output column of [`group_aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub reducer: Reducer,
}

impl Aggregation {
    pub fn new(output: impl Into<String>, column: impl Into<String>, reducer: Reducer) -> Self {
        Self {
            output: output.into(),
            column: Some(column.into()),
            reducer,
        }
    }

    /// Row count per group.
    pub fn count(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            column: None,
            reducer: Reducer::Count,
        }
    }
}

/// An aggregation resolved against the input schema.
struct Plan {
    reducer: Reducer,
    column: Option<usize>,
    dtype: DataType,
}

fn plan(schema: &Schema, agg: &Aggregation) -> TableResult<Plan> {
    let column = match &agg.column {
        Some(name) => Some(schema.index_of(name)?),
        None if agg.reducer == Reducer::Count => None,
        None => {
            return Err(TableError::InvalidExpression(format!(
                "{} for '{}' needs an input column",
                agg.reducer, agg.output
            )))
        }
    };

    let input = column.map(|i| schema.fields()[i].dtype);
    if agg.reducer.needs_numeric() {
        if let Some(dtype) = input.filter(|t| !t.is_numeric()) {
            return Err(SchemaError::TypeMismatch {
                column: agg.column.clone().unwrap_or_default(),
                expected: "numeric".to_string(),
                found: dtype.to_string(),
            }
            .into());
        }
    }

    let dtype = agg.reducer.output_type(input).unwrap_or(DataType::Int);
    Ok(Plan {
        reducer: agg.reducer,
        column,
        dtype,
    })
}

fn reduce(plan: &Plan, rows: &[Vec<Value>], members: &[usize]) -> Value {
    let Some(col) = plan.column else {
        return Value::Int(members.len() as i64);
    };
    let mut present = members
        .iter()
        .map(|&r| &rows[r][col])
        .filter(|v| !v.is_missing());

    match plan.reducer {
        Reducer::Count => Value::Int(present.count() as i64),
        Reducer::NDistinct => {
            let distinct: HashSet<KeyPart> = present.map(KeyPart::of).collect();
            Value::Int(distinct.len() as i64)
        }
        Reducer::Sum if plan.dtype == DataType::Int => {
            let mut total: i64 = 0;
            let mut any = false;
            for v in present {
                any = true;
                match v.as_i64().and_then(|i| total.checked_add(i)) {
                    Some(t) => total = t,
                    None => return Value::Null,
                }
            }
            if any {
                Value::Int(total)
            } else {
                Value::Null
            }
        }
        Reducer::Sum => {
            let values: Vec<f64> = present.filter_map(Value::as_f64).collect();
            if values.is_empty() {
                Value::Null
            } else {
                Value::Float(values.iter().sum())
            }
        }
        Reducer::Mean => {
            let values: Vec<f64> = present.filter_map(Value::as_f64).collect();
            if values.is_empty() {
                Value::Null
            } else {
                Value::Float(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        Reducer::Min => present
            .min_by(|a, b| a.total_cmp(b))
            .cloned()
            .unwrap_or(Value::Null),
        Reducer::Max => present
            .max_by(|a, b| a.total_cmp(b))
            .cloned()
            .unwrap_or(Value::Null),
        Reducer::First => present.next().cloned().unwrap_or(Value::Null),
        Reducer::Last => present.last().cloned().unwrap_or(Value::Null),
    }
}

// =============================================================================
// Operations
// =============================================================================

/// Group by `by` and compute one row per group.
///
/// Output columns are the `by` columns followed by each aggregation's
/// output, groups in first-seen order. With `by` empty a non-empty table
/// collapses to a single row.
///
/// ```text
/// playerID yearID HR                    playerID career_HR
/// p1       1      10   by [playerID]    p1       15
/// p1       2       5   ──────────────►  p2        7
/// p2       1       7   sum(HR)
/// ```
pub fn group_aggregate<S: AsRef<str>>(
    table: &Table,
    by: &[S],
    aggregations: &[Aggregation],
) -> TableResult<Table> {
    let schema = table.schema();
    let keys = schema.indices_of(by)?;
    let plans = aggregations
        .iter()
        .map(|agg| plan(schema, agg))
        .collect::<TableResult<Vec<_>>>()?;

    let mut fields: Vec<Field> = keys.iter().map(|&i| schema.fields()[i].clone()).collect();
    fields.extend(
        aggregations
            .iter()
            .zip(&plans)
            .map(|(agg, p)| Field::new(agg.output.clone(), p.dtype)),
    );
    let out_schema = Schema::new(fields)?;

    let groups = partition(table.rows(), &keys);
    let rows: Vec<Vec<Value>> = groups
        .iter()
        .map(|group| {
            let first = &table.rows()[group.first];
            let mut row: Vec<Value> = keys.iter().map(|&k| first[k].clone()).collect();
            row.extend(plans.iter().map(|p| reduce(p, table.rows(), &group.rows)));
            row
        })
        .collect();

    tracing::debug!(groups = rows.len(), aggregations = plans.len(), "group aggregate");

    Ok(Table::from_parts(out_schema, rows))
}

/// Stable sort by `by` (lexicographic over the listed columns).
///
/// Missing cells sort last whether ascending or descending.
pub fn sort<S: AsRef<str>>(table: &Table, by: &[S], descending: bool) -> TableResult<Table> {
    let keys = table.schema().indices_of(by)?;

    let mut rows = table.rows().to_vec();
    rows.sort_by(|a, b| {
        for &k in &keys {
            let ordering = compare_cells(&a[k], &b[k], descending);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    Ok(Table::from_parts(table.schema().clone(), rows))
}

fn compare_cells(a: &Value, b: &Value, descending: bool) -> Ordering {
    match (a.is_missing(), b.is_missing()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if descending => b.total_cmp(a),
        (false, false) => a.total_cmp(b),
    }
}

/// First `n` rows.
pub fn head(table: &Table, n: usize) -> Table {
    table.head(n)
}
