//! Wide/long reshaping.
//!
//! ```text
//!           long                                 wide
//! yearID lgID HR                      yearID   AL    NL
//! 1957   AL   1051   pivot_wide ──►   1957   1051  1178
//! 1957   NL   1178   ◄── pivot_long   1958   1057  1183
//! 1958   AL   1057
//! 1958   NL   1183
//! ```

use std::collections::HashMap;

use super::grouper::{partition, KeyPart};
use crate::error::{SchemaError, TableError, TableResult};
use crate::models::{DataType, Field, Schema, Table, Value};

/// Spread `key_column` into one column per distinct key, filled from
/// `value_column`.
///
/// Two rows with the same id tuple and key are a
/// [`TableError::Conflict`]; nothing is aggregated implicitly.
pub fn pivot_wide<S: AsRef<str>>(
    table: &Table,
    id_columns: &[S],
    key_column: &str,
    value_column: &str,
) -> TableResult<Table> {
    let schema = table.schema();
    let ids = schema.indices_of(id_columns)?;
    let key = schema.index_of(key_column)?;
    let value = schema.index_of(value_column)?;
    let value_type = schema.fields()[value].dtype;

    let mut key_slots: HashMap<KeyPart, usize> = HashMap::new();
    let mut key_names: Vec<String> = Vec::new();
    for row in table.rows() {
        key_slots.entry(KeyPart::of(&row[key])).or_insert_with(|| {
            key_names.push(row[key].to_string());
            key_names.len() - 1
        });
    }

    let mut fields: Vec<Field> = ids.iter().map(|&i| schema.fields()[i].clone()).collect();
    fields.extend(key_names.iter().map(|name| Field::new(name.clone(), value_type)));
    let out_schema = Schema::new(fields)?;

    let groups = partition(table.rows(), &ids);
    let mut rows = Vec::with_capacity(groups.len());
    for group in &groups {
        let first = &table.rows()[group.first];
        let mut cells: Vec<Option<Value>> = vec![None; key_names.len()];
        for &r in &group.rows {
            let row = &table.rows()[r];
            let slot = key_slots[&KeyPart::of(&row[key])];
            if cells[slot].is_some() {
                return Err(TableError::Conflict {
                    id: describe_id(first, &ids),
                    key: key_names[slot].clone(),
                });
            }
            cells[slot] = Some(row[value].clone());
        }

        let mut out: Vec<Value> = ids.iter().map(|&i| first[i].clone()).collect();
        out.extend(cells.into_iter().map(|c| c.unwrap_or(Value::Null)));
        rows.push(out);
    }

    tracing::debug!(ids = rows.len(), keys = key_names.len(), "pivot wide");

    Ok(Table::from_parts(out_schema, rows))
}

fn describe_id(row: &[Value], ids: &[usize]) -> String {
    ids.iter()
        .map(|&i| row[i].to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stack every non-id column into `key`/`value` pairs.
pub fn pivot_long<S: AsRef<str>>(table: &Table, id_columns: &[S]) -> TableResult<Table> {
    pivot_long_with(table, id_columns, "key", "value", false)
}

/// [`pivot_long`] with explicit names for the key and value columns.
///
/// The value column takes the common type of the stacked columns
/// (`Int`+`Float` widen to `Float`, `Str`+`Categorical` to `Str`).
/// With `drop_missing`, cells holding a missing value produce no row, so a
/// sparse long table survives `pivot_wide` followed by `pivot_long_with`.
pub fn pivot_long_with<S: AsRef<str>>(
    table: &Table,
    id_columns: &[S],
    key_name: &str,
    value_name: &str,
    drop_missing: bool,
) -> TableResult<Table> {
    let schema = table.schema();
    let ids = schema.indices_of(id_columns)?;
    let stacked: Vec<usize> = (0..table.width()).filter(|i| !ids.contains(i)).collect();

    if stacked.is_empty() {
        return Err(SchemaError::TooFewColumns {
            operation: "pivot_long",
            required: 1,
            given: 0,
        }
        .into());
    }

    let value_type = stacked
        .iter()
        .map(|&i| Some(schema.fields()[i].dtype))
        .reduce(|acc, t| match (acc, t) {
            (Some(a), Some(b)) => a.unify(b),
            _ => None,
        })
        .flatten()
        .ok_or_else(|| SchemaError::IncompatibleTypes {
            columns: stacked
                .iter()
                .map(|&i| schema.fields()[i].name.clone())
                .collect(),
        })?;

    let mut fields: Vec<Field> = ids.iter().map(|&i| schema.fields()[i].clone()).collect();
    fields.push(Field::new(key_name, DataType::Str));
    fields.push(Field::new(value_name, value_type));
    let out_schema = Schema::new(fields)?;

    let mut rows = Vec::with_capacity(table.height() * stacked.len());
    for row in table.rows() {
        for &c in &stacked {
            if drop_missing && row[c].is_missing() {
                continue;
            }
            let mut out: Vec<Value> = ids.iter().map(|&i| row[i].clone()).collect();
            out.push(Value::Str(schema.fields()[c].name.clone()));
            out.push(row[c].clone().coerce(value_type).unwrap_or(Value::Null));
            rows.push(out);
        }
    }

    tracing::debug!(rows = rows.len(), stacked = stacked.len(), "pivot long");

    Ok(Table::from_parts(out_schema, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn league_hr() -> Table {
        let schema = Schema::from_pairs(&[
            ("yearID", DataType::Int),
            ("lgID", DataType::Categorical),
            ("HR", DataType::Int),
            ("W", DataType::Int),
        ])
        .unwrap();
        Table::new(
            schema,
            vec![
                vec![1957.into(), "AL".into(), 1051.into(), 616.into()],
                vec![1957.into(), "NL".into(), 1178.into(), 616.into()],
                vec![1958.into(), "AL".into(), 1057.into(), 616.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_pivot_wide() {
        let wide = pivot_wide(&league_hr(), &["yearID"], "lgID", "HR").unwrap();
        assert_eq!(wide.column_names(), vec!["yearID", "AL", "NL"]);
        assert_eq!(wide.schema().dtype_of("NL").unwrap(), DataType::Int);
        assert_eq!(wide.row(0).unwrap(), &[Value::Int(1957), Value::Int(1051), Value::Int(1178)]);
        assert_eq!(wide.value(1, "NL").unwrap(), Some(&Value::Null));
    }

    #[test]
    fn test_pivot_wide_conflict() {
        let err = pivot_wide(&league_hr(), &["W"], "lgID", "HR").unwrap_err();
        assert_eq!(
            err,
            TableError::Conflict {
                id: "616".into(),
                key: "AL".into()
            }
        );
    }

    #[test]
    fn test_pivot_wide_name_collision() {
        let schema = Schema::from_pairs(&[
            ("id", DataType::Int),
            ("k", DataType::Str),
            ("v", DataType::Int),
        ])
        .unwrap();
        let t = Table::new(schema, vec![vec![1.into(), "id".into(), 2.into()]]).unwrap();
        assert!(matches!(
            pivot_wide(&t, &["id"], "k", "v"),
            Err(TableError::Schema(SchemaError::DuplicateColumn(_)))
        ));
    }

    #[test]
    fn test_pivot_long() {
        let long = pivot_long(&league_hr(), &["yearID", "lgID"]).unwrap();
        assert_eq!(long.column_names(), vec!["yearID", "lgID", "key", "value"]);
        assert_eq!(long.height(), 6);
        assert_eq!(long.value(0, "key").unwrap(), Some(&Value::from("HR")));
        assert_eq!(long.value(1, "key").unwrap(), Some(&Value::from("W")));
        assert_eq!(long.schema().dtype_of("value").unwrap(), DataType::Int);
    }

    #[test]
    fn test_pivot_long_widens_and_rejects() {
        let schema = Schema::from_pairs(&[
            ("id", DataType::Int),
            ("a", DataType::Int),
            ("b", DataType::Float),
        ])
        .unwrap();
        let t = Table::new(schema, vec![vec![1.into(), 2.into(), 0.5.into()]]).unwrap();
        let long = pivot_long_with(&t, &["id"], "stat", "amount", false).unwrap();
        assert_eq!(long.schema().dtype_of("amount").unwrap(), DataType::Float);
        assert_eq!(long.value(0, "amount").unwrap(), Some(&Value::Float(2.0)));

        let err = pivot_long(&league_hr(), &["yearID"]).unwrap_err();
        assert!(matches!(err, TableError::Schema(SchemaError::IncompatibleTypes { .. })));
    }

    #[test]
    fn test_round_trip() {
        let wide = pivot_wide(&league_hr(), &["yearID"], "lgID", "HR").unwrap();
        let long = pivot_long(&wide, &["yearID"]).unwrap();
        assert_eq!(long.height(), 4);
        let back = pivot_wide(&long, &["yearID"], "key", "value").unwrap();
        assert_eq!(back, wide);
    }

    #[test]
    fn test_sparse_long_round_trip() {
        let schema = Schema::from_pairs(&[
            ("id", DataType::Int),
            ("key", DataType::Str),
            ("value", DataType::Int),
        ])
        .unwrap();
        let long = Table::new(
            schema,
            vec![
                vec![1.into(), "HR".into(), 10.into()],
                vec![1.into(), "AB".into(), 400.into()],
                vec![2.into(), "HR".into(), 3.into()],
            ],
        )
        .unwrap();

        let wide = pivot_wide(&long, &["id"], "key", "value").unwrap();
        assert_eq!(wide.value(1, "AB").unwrap(), Some(&Value::Null));

        let padded = pivot_long(&wide, &["id"]).unwrap();
        assert_eq!(padded.height(), 4);
        assert_eq!(padded.row(3).unwrap(), &[Value::Int(2), Value::from("AB"), Value::Null]);

        let back = pivot_long_with(&wide, &["id"], "key", "value", true).unwrap();
        assert_eq!(back, long);
    }
}
