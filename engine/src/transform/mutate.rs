//! Derived, concatenated and renamed columns.

use serde::{Deserialize, Serialize};

use super::expr::Expr;
use crate::error::{SchemaError, TableResult};
use crate::models::{DataType, Field, Schema, Table, Value};

/// One `name = expr` assignment of a [`mutate`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    pub expr: Expr,
}

impl Assignment {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }
}

/// Evaluate assignments row-wise, in order.
///
/// An existing column is replaced in place (its type follows the
/// expression); a new name is appended. Later assignments can read the
/// columns produced by earlier ones.
pub fn mutate(table: &Table, assignments: &[Assignment]) -> TableResult<Table> {
    let mut fields: Vec<Field> = table.schema().fields().to_vec();
    let mut rows: Vec<Vec<Value>> = table.rows().to_vec();

    for assignment in assignments {
        let schema = Schema::new(fields.clone())?;
        let bound = assignment.expr.bind(&schema)?;

        let target = fields.iter().position(|f| f.name == assignment.name);
        match target {
            Some(idx) => {
                fields[idx].dtype = bound.dtype();
                for row in &mut rows {
                    let value = bound.eval(row);
                    row[idx] = value;
                }
            }
            None => {
                fields.push(Field::new(assignment.name.clone(), bound.dtype()));
                for row in &mut rows {
                    let value = bound.eval(row);
                    row.push(value);
                }
            }
        }

        tracing::debug!(column = %assignment.name, expr = %assignment.expr, "mutate");
    }

    Ok(Table::from_parts(Schema::new(fields)?, rows))
}

/// Paste text columns together into `name`, replacing the sources.
///
/// The new column sits where the first source column was. Missing parts
/// render as `NA` unless `skip_missing` is set.
pub fn unite<S: AsRef<str>>(
    table: &Table,
    name: &str,
    sources: &[S],
    separator: &str,
    skip_missing: bool,
) -> TableResult<Table> {
    if sources.len() < 2 {
        return Err(SchemaError::TooFewColumns {
            operation: "unite",
            required: 2,
            given: sources.len(),
        }
        .into());
    }

    let indices = table.schema().indices_of(sources)?;
    for &i in &indices {
        let field = &table.schema().fields()[i];
        if !field.dtype.is_text() {
            return Err(SchemaError::TypeMismatch {
                column: field.name.clone(),
                expected: DataType::Str.to_string(),
                found: field.dtype.to_string(),
            }
            .into());
        }
    }

    let position = indices.iter().copied().min().unwrap_or(0);
    let mut fields = Vec::with_capacity(table.width() + 1 - indices.len());
    for (i, field) in table.schema().fields().iter().enumerate() {
        if i == position {
            fields.push(Field::new(name, DataType::Str));
        }
        if !indices.contains(&i) {
            fields.push(field.clone());
        }
    }
    let schema = Schema::new(fields)?;

    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let parts: Vec<String> = indices
                .iter()
                .map(|&i| &row[i])
                .filter(|v| !(skip_missing && v.is_missing()))
                .map(ToString::to_string)
                .collect();
            let joined = if parts.is_empty() {
                Value::Null
            } else {
                Value::Str(parts.join(separator))
            };

            let mut out = Vec::with_capacity(schema.len());
            for (i, value) in row.iter().enumerate() {
                if i == position {
                    out.push(joined.clone());
                }
                if !indices.contains(&i) {
                    out.push(value.clone());
                }
            }
            out
        })
        .collect();

    Ok(Table::from_parts(schema, rows))
}

/// Rename columns by `(old, new)` pairs.
///
/// Fails if an old name is absent or listed twice, or if a new name would
/// collide with a column that keeps its name (or with another rename
/// target).
pub fn rename<A, B>(table: &Table, mapping: &[(A, B)]) -> TableResult<Table>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut fields: Vec<Field> = table.schema().fields().to_vec();
    let mut renamed: Vec<usize> = Vec::with_capacity(mapping.len());

    for (old, new) in mapping {
        let idx = table.schema().index_of(old.as_ref())?;
        if renamed.contains(&idx) {
            return Err(SchemaError::DuplicateColumn(old.as_ref().to_string()).into());
        }
        fields[idx].name = new.as_ref().to_string();
        renamed.push(idx);
    }

    for (old, new) in mapping {
        let new = new.as_ref();
        let holders = fields.iter().filter(|f| f.name == new).count();
        if holders > 1 {
            return Err(SchemaError::RenameCollision {
                from: old.as_ref().to_string(),
                to: new.to_string(),
            }
            .into());
        }
    }

    tracing::debug!(renamed = renamed.len(), "rename");

    Ok(Table::from_parts(Schema::new(fields)?, table.rows().to_vec()))
}
