//! Left-outer join on shared key columns.
//!
//! Policy:
//! - every left row is kept, in order;
//! - a left row matching several right rows is repeated once per match,
//!   right rows in their original order;
//! - unmatched left rows get `NA` in every right column;
//! - key cells that are missing never match;
//! - non-key columns present on both sides are suffixed (`_x` left, `_y` right).

use serde::{Deserialize, Serialize};

use super::grouper::{index_rows, key_of};
use crate::error::{SchemaError, TableResult};
use crate::models::{Field, Schema, Table, Value};

/// Suffixes applied to colliding non-key column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSuffix {
    pub left: String,
    pub right: String,
}

impl Default for JoinSuffix {
    fn default() -> Self {
        Self {
            left: "_x".to_string(),
            right: "_y".to_string(),
        }
    }
}

impl JoinSuffix {
    /// Empty or identical suffixes cannot disambiguate colliding names.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.left.is_empty() || self.right.is_empty() || self.left == self.right {
            return Err(SchemaError::InvalidSuffix {
                left: self.left.clone(),
                right: self.right.clone(),
            });
        }
        Ok(())
    }
}

/// Left-join `right` onto `left` by the `on` columns, with `_x`/`_y` suffixes.
pub fn left_join<S: AsRef<str>>(left: &Table, right: &Table, on: &[S]) -> TableResult<Table> {
    left_join_with(left, right, on, &JoinSuffix::default())
}

/// Left join with explicit collision suffixes.
pub fn left_join_with<S: AsRef<str>>(
    left: &Table,
    right: &Table,
    on: &[S],
    suffix: &JoinSuffix,
) -> TableResult<Table> {
    suffix.validate()?;

    let left_keys = left.schema().indices_of(on)?;
    let right_keys = right.schema().indices_of(on)?;

    for (name, (&li, &ri)) in on.iter().zip(left_keys.iter().zip(&right_keys)) {
        let lt = left.schema().fields()[li].dtype;
        let rt = right.schema().fields()[ri].dtype;
        if lt.unify(rt).is_none() {
            return Err(SchemaError::IncompatibleKey {
                column: name.as_ref().to_string(),
                left: lt,
                right: rt,
            }
            .into());
        }
    }

    let right_payload: Vec<usize> = (0..right.width())
        .filter(|i| !right_keys.contains(i))
        .collect();

    let schema = joined_schema(left, right, &left_keys, &right_payload, suffix)?;

    let index = index_rows(right.rows(), &right_keys);
    let mut rows = Vec::with_capacity(left.height());
    for lrow in left.rows() {
        let key = key_of(lrow, &left_keys);
        match index.get(&key) {
            Some(matches) => {
                for &r in matches {
                    let rrow = &right.rows()[r];
                    let mut out = lrow.clone();
                    out.extend(right_payload.iter().map(|&c| rrow[c].clone()));
                    rows.push(out);
                }
            }
            None => {
                let mut out = lrow.clone();
                out.extend(right_payload.iter().map(|_| Value::Null));
                rows.push(out);
            }
        }
    }

    tracing::debug!(
        left_rows = left.height(),
        right_rows = right.height(),
        output_rows = rows.len(),
        "left join"
    );

    Ok(Table::from_parts(schema, rows))
}

fn joined_schema(
    left: &Table,
    right: &Table,
    left_keys: &[usize],
    right_payload: &[usize],
    suffix: &JoinSuffix,
) -> TableResult<Schema> {
    let right_names: Vec<&str> = right_payload
        .iter()
        .map(|&c| right.schema().fields()[c].name.as_str())
        .collect();

    let mut fields: Vec<Field> = left
        .schema()
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let collides = !left_keys.contains(&i) && right_names.contains(&f.name.as_str());
            if collides {
                Field::new(format!("{}{}", f.name, suffix.left), f.dtype)
            } else {
                f.clone()
            }
        })
        .collect();

    for &c in right_payload {
        let f = &right.schema().fields()[c];
        let name = if left.schema().contains(&f.name) {
            format!("{}{}", f.name, suffix.right)
        } else {
            f.name.clone()
        };
        fields.push(Field::new(name, f.dtype));
    }

    // a suffixed name may itself be taken; keep suffixing until unique
    for i in 0..fields.len() {
        let is_left = i < left.width();
        while fields[..i].iter().chain(&fields[i + 1..]).any(|f| f.name == fields[i].name) {
            let extra = if is_left { &suffix.left } else { &suffix.right };
            fields[i].name.push_str(extra);
        }
    }

    Ok(Schema::new(fields)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableError;
    use crate::models::DataType;

    fn batting() -> Table {
        let schema = Schema::from_pairs(&[
            ("playerID", DataType::Str),
            ("yearID", DataType::Int),
            ("teamID", DataType::Categorical),
            ("HR", DataType::Int),
        ])
        .unwrap();
        Table::new(
            schema,
            vec![
                vec!["aaronha01".into(), 1957.into(), "ML1".into(), 44.into()],
                vec!["zzz01".into(), 1957.into(), "NY1".into(), 1.into()],
                vec!["mayswi01".into(), 1957.into(), "NY1".into(), 35.into()],
            ],
        )
        .unwrap()
    }

    fn people() -> Table {
        let schema = Schema::from_pairs(&[
            ("playerID", DataType::Str),
            ("nameFirst", DataType::Str),
            ("nameLast", DataType::Str),
        ])
        .unwrap();
        Table::new(
            schema,
            vec![
                vec!["mayswi01".into(), "Willie".into(), "Mays".into()],
                vec!["aaronha01".into(), "Hank".into(), "Aaron".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_left_join_preserves_left_rows() {
        let joined = left_join(&batting(), &people(), &["playerID"]).unwrap();
        assert_eq!(
            joined.column_names(),
            vec!["playerID", "yearID", "teamID", "HR", "nameFirst", "nameLast"]
        );
        assert_eq!(joined.height(), 3);
        assert_eq!(joined.value(0, "nameLast").unwrap(), Some(&Value::from("Aaron")));
        assert_eq!(joined.value(1, "nameFirst").unwrap(), Some(&Value::Null));
        assert_eq!(joined.value(2, "nameFirst").unwrap(), Some(&Value::from("Willie")));
    }

    #[test]
    fn test_multiple_matches_expand() {
        let schema = Schema::from_pairs(&[
            ("teamID", DataType::Categorical),
            ("name", DataType::Str),
        ])
        .unwrap();
        let teams = Table::new(
            schema,
            vec![
                vec!["NY1".into(), "New York Giants".into()],
                vec!["ML1".into(), "Milwaukee Braves".into()],
                vec!["NY1".into(), "Giants (alt)".into()],
            ],
        )
        .unwrap();

        let joined = left_join(&batting(), &teams, &["teamID"]).unwrap();
        assert_eq!(joined.height(), 5);
        let names: Vec<String> = joined
            .column("name")
            .unwrap()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            names,
            vec![
                "Milwaukee Braves",
                "New York Giants",
                "Giants (alt)",
                "New York Giants",
                "Giants (alt)"
            ]
        );
    }

    #[test]
    fn test_collisions_are_suffixed() {
        let joined = left_join(&batting(), &batting(), &["playerID", "yearID"]).unwrap();
        assert_eq!(
            joined.column_names(),
            vec!["playerID", "yearID", "teamID_x", "HR_x", "teamID_y", "HR_y"]
        );
    }

    #[test]
    fn test_suffix_collision_keeps_suffixing() {
        let schema = Schema::from_pairs(&[
            ("id", DataType::Int),
            ("v", DataType::Int),
            ("v_x", DataType::Int),
        ])
        .unwrap();
        let left = Table::new(schema, vec![vec![1.into(), 2.into(), 3.into()]]).unwrap();
        let right_schema = Schema::from_pairs(&[("id", DataType::Int), ("v", DataType::Int)]).unwrap();
        let right = Table::new(right_schema, vec![vec![1.into(), 9.into()]]).unwrap();

        let joined = left_join(&left, &right, &["id"]).unwrap();
        assert_eq!(joined.column_names(), vec!["id", "v_x_x", "v_x", "v_y"]);
    }

    #[test]
    fn test_missing_key_column() {
        let err = left_join(&batting(), &people(), &["yearID"]).unwrap_err();
        assert!(matches!(
            err,
            TableError::Schema(SchemaError::MissingColumn { ref column, .. }) if column == "yearID"
        ));
    }

    #[test]
    fn test_incompatible_key_types() {
        let schema = Schema::from_pairs(&[("playerID", DataType::Int)]).unwrap();
        let ids = Table::new(schema, vec![vec![1.into()]]).unwrap();
        let err = left_join(&batting(), &ids, &["playerID"]).unwrap_err();
        assert!(matches!(err, TableError::Schema(SchemaError::IncompatibleKey { .. })));
    }

    #[test]
    fn test_missing_keys_never_match() {
        let schema = Schema::from_pairs(&[("k", DataType::Str), ("v", DataType::Int)]).unwrap();
        let left = Table::new(schema.clone(), vec![vec![Value::Null, 1.into()]]).unwrap();
        let right_schema = Schema::from_pairs(&[("k", DataType::Str), ("w", DataType::Int)]).unwrap();
        let right = Table::new(right_schema, vec![vec![Value::Null, 2.into()]]).unwrap();

        let joined = left_join(&left, &right, &["k"]).unwrap();
        assert_eq!(joined.height(), 1);
        assert_eq!(joined.value(0, "w").unwrap(), Some(&Value::Null));
    }

    #[test]
    fn test_empty_or_equal_suffixes_rejected() {
        for (l, r) in [("", ""), ("", "_y"), ("_x", ""), ("_dup", "_dup")] {
            let suffix = JoinSuffix {
                left: l.to_string(),
                right: r.to_string(),
            };
            let err = left_join_with(&batting(), &batting(), &["playerID"], &suffix).unwrap_err();
            assert!(matches!(err, TableError::Schema(SchemaError::InvalidSuffix { .. })));
        }
    }

    #[test]
    fn test_custom_suffixes() {
        let suffix = JoinSuffix {
            left: "_bat".to_string(),
            right: "_ref".to_string(),
        };
        let joined = left_join_with(&batting(), &batting(), &["playerID", "yearID"], &suffix).unwrap();
        assert_eq!(
            joined.column_names(),
            vec!["playerID", "yearID", "teamID_bat", "HR_bat", "teamID_ref", "HR_ref"]
        );
    }

    #[test]
    fn test_large_integral_float_keys_match_ints() {
        let left_schema = Schema::from_pairs(&[("k", DataType::Int), ("v", DataType::Int)]).unwrap();
        let left = Table::new(left_schema, vec![vec![Value::Int(10_000_000_000_000_000), 1.into()]]).unwrap();
        let right_schema = Schema::from_pairs(&[("k", DataType::Float), ("w", DataType::Int)]).unwrap();
        let right = Table::new(right_schema, vec![vec![Value::Float(1.0e16), 2.into()]]).unwrap();

        let joined = left_join(&left, &right, &["k"]).unwrap();
        assert_eq!(joined.value(0, "w").unwrap(), Some(&Value::Int(2)));
    }
}
