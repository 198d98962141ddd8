//! Immutable in-memory table.

use serde_json::Map;
use std::fmt;

use super::{DataType, Schema, Value};
use crate::error::SchemaError;

/// An ordered sequence of rows sharing one schema.
///
/// Tables are never modified by the transformation functions; each
/// operation borrows its input and returns a new table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, checking row widths and coercing cells to the
    /// declared column types (integers widen into float columns).
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Result<Self, SchemaError> {
        let mut checked = Vec::with_capacity(rows.len());
        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != schema.len() {
                return Err(SchemaError::RowWidth {
                    row: r,
                    expected: schema.len(),
                    found: row.len(),
                });
            }
            let mut cells = Vec::with_capacity(row.len());
            for (value, field) in row.into_iter().zip(schema.fields()) {
                let found = value.type_name();
                let cell = value.coerce(field.dtype).ok_or_else(|| SchemaError::TypeMismatch {
                    column: field.name.clone(),
                    expected: field.dtype.to_string(),
                    found: found.to_string(),
                })?;
                cells.push(cell);
            }
            checked.push(cells);
        }
        Ok(Self {
            schema,
            rows: checked,
        })
    }

    /// A table with no rows.
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Assemble a table from rows the caller has already shaped to `schema`.
    pub(crate) fn from_parts(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == schema.len()));
        Self { schema, rows }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.schema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema.names()
    }

    /// All cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>, SchemaError> {
        let idx = self.schema.index_of(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// One cell by row index and column name.
    pub fn value(&self, row: usize, name: &str) -> Result<Option<&Value>, SchemaError> {
        let idx = self.schema.index_of(name)?;
        Ok(self.rows.get(row).map(|r| &r[idx]))
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Table {
        Table::from_parts(
            self.schema.clone(),
            self.rows.iter().take(n).cloned().collect(),
        )
    }

    /// Apply a table-to-table function, for left-to-right composition:
    ///
    /// ```rust,ignore
    /// let out = batting
    ///     .pipe(|t| left_join(t, &people, &["playerID"]))?
    ///     .pipe(|t| filter(t, &col("yearID").gt_eq(lit(1955))))?;
    /// ```
    pub fn pipe<E, F>(&self, f: F) -> Result<Table, E>
    where
        F: FnOnce(&Table) -> Result<Table, E>,
    {
        f(self)
    }

    /// Rows as JSON objects keyed by column name, in schema order.
    pub fn to_records(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, serde_json::Value> = self
                    .schema
                    .fields()
                    .iter()
                    .zip(row)
                    .map(|(f, v)| (f.name.clone(), cell_to_json(v)))
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect()
    }
}

fn cell_to_json(value: &Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// Renders a compact text grid:
///
/// ```text
/// # 2 x 3
/// playerID  yearID  HR
/// <chr>      <int>  <int>
/// aaronha01   1957  44
/// ```
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.schema.fields();
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.iter().map(ToString::to_string).collect())
            .collect();

        let widths: Vec<usize> = fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let tag = field.dtype.abbrev().len() + 2;
                cells
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain([field.name.chars().count(), tag])
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        writeln!(f, "# {} x {}", self.height(), self.width())?;

        let header: Vec<String> = fields
            .iter()
            .zip(&widths)
            .map(|(field, w)| pad(&field.name, *w, field.dtype))
            .collect();
        writeln!(f, "{}", header.join("  ").trim_end())?;

        let tags: Vec<String> = fields
            .iter()
            .zip(&widths)
            .map(|(field, w)| pad(&format!("<{}>", field.dtype.abbrev()), *w, field.dtype))
            .collect();
        writeln!(f, "{}", tags.join("  ").trim_end())?;

        for row in &cells {
            let line: Vec<String> = row
                .iter()
                .zip(fields.iter().zip(&widths))
                .map(|(cell, (field, w))| pad(cell, *w, field.dtype))
                .collect();
            writeln!(f, "{}", line.join("  ").trim_end())?;
        }
        Ok(())
    }
}

fn pad(text: &str, width: usize, dtype: DataType) -> String {
    if dtype.is_numeric() {
        format!("{:>width$}", text, width = width)
    } else {
        format!("{:<width$}", text, width = width)
    }
}
