//! Row selection and column projection.

use super::expr::Expr;
use crate::error::{SchemaError, TableResult};
use crate::models::{DataType, Schema, Table, Value};

/// Keep the rows for which `predicate` is true, in their original order.
///
/// Rows where the predicate is false or missing are dropped.
pub fn filter(table: &Table, predicate: &Expr) -> TableResult<Table> {
    let bound = predicate.bind(table.schema())?;
    if bound.dtype() != DataType::Bool {
        return Err(SchemaError::TypeMismatch {
            column: predicate.to_string(),
            expected: DataType::Bool.to_string(),
            found: bound.dtype().to_string(),
        }
        .into());
    }

    let rows: Vec<Vec<Value>> = table
        .rows()
        .iter()
        .filter(|row| bound.eval(row) == Value::Bool(true))
        .cloned()
        .collect();

    tracing::debug!(
        predicate = %predicate,
        kept = rows.len(),
        dropped = table.height() - rows.len(),
        "filter"
    );

    Ok(Table::from_parts(table.schema().clone(), rows))
}

/// Restrict a table to `columns`, in the given order.
pub fn select<S: AsRef<str>>(table: &Table, columns: &[S]) -> TableResult<Table> {
    let indices = table.schema().indices_of(columns)?;
    let fields = indices
        .iter()
        .map(|&i| table.schema().fields()[i].clone())
        .collect();
    let schema = Schema::new(fields)?;

    let rows = table
        .rows()
        .iter()
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
        .collect();

    Ok(Table::from_parts(schema, rows))
}

/// `filter` followed by `select`. Both are validated before any row is read.
pub fn filter_select<S: AsRef<str>>(
    table: &Table,
    predicate: &Expr,
    columns: &[S],
) -> TableResult<Table> {
    table.schema().indices_of(columns)?;
    let kept = filter(table, predicate)?;
    select(&kept, columns)
}
