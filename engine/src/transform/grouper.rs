//! Partition rows by the value of one or more key columns.
//!
//! Shared by `group_aggregate`, `pivot_wide` and the join index. Groups are
//! returned in first-seen order of their key tuples:
//!
//! ```text
//! playerID  HR              key        rows
//! p1        10              (p1)  →    [0, 1]
//! p1         5        →     (p2)  →    [2]
//! p2         7
//! ```

use std::collections::HashMap;

use crate::models::Value;

// -2^63 and 2^63: the integral floats in between convert to i64 exactly.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

/// Hashable form of one key cell.
///
/// Integral floats collapse onto the matching integer and `-0.0` onto `0`,
/// so key equality follows numeric value rather than representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum KeyPart {
    Missing,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(String),
}

impl KeyPart {
    pub(crate) fn of(value: &Value) -> Self {
        match value {
            v if v.is_missing() => KeyPart::Missing,
            Value::Bool(b) => KeyPart::Bool(*b),
            Value::Int(i) => KeyPart::Int(*i),
            Value::Float(f) => {
                if f.fract() == 0.0 && *f >= I64_LOWER && *f < I64_UPPER {
                    KeyPart::Int(*f as i64)
                } else {
                    KeyPart::Float(f.to_bits())
                }
            }
            Value::Str(s) => KeyPart::Str(s.clone()),
            Value::Null => KeyPart::Missing,
        }
    }
}

/// Key tuple for one row.
pub(crate) type GroupKey = Vec<KeyPart>;

pub(crate) fn key_of(row: &[Value], columns: &[usize]) -> GroupKey {
    columns.iter().map(|&c| KeyPart::of(&row[c])).collect()
}

/// One partition: its first row (for reading key cells) and all member rows.
#[derive(Debug, Clone)]
pub(crate) struct Group {
    pub first: usize,
    pub rows: Vec<usize>,
}

/// Partition `rows` by the cells at `columns`, preserving first-seen order.
///
/// With no key columns every row lands in a single group (none if `rows`
/// is empty).
pub(crate) fn partition(rows: &[Vec<Value>], columns: &[usize]) -> Vec<Group> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let key = key_of(row, columns);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Group {
                first: i,
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push(i);
    }

    groups
}

/// Map from key tuple to matching row indices, for probing joins.
///
/// Rows whose key contains a missing cell are left out, so they never match.
pub(crate) fn index_rows(rows: &[Vec<Value>], columns: &[usize]) -> HashMap<GroupKey, Vec<usize>> {
    let mut index: HashMap<GroupKey, Vec<usize>> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        let key = key_of(row, columns);
        if key.contains(&KeyPart::Missing) {
            continue;
        }
        index.entry(key).or_default().push(i);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Vec<Value>> {
        vec![
            vec!["p1".into(), 1.into(), 10.into()],
            vec!["p2".into(), 1.into(), 7.into()],
            vec!["p1".into(), 2.into(), 5.into()],
            vec![Value::Null, 3.into(), 1.into()],
        ]
    }

    #[test]
    fn test_first_seen_order() {
        let groups = partition(&rows(), &[0]);
        let members: Vec<Vec<usize>> = groups.iter().map(|g| g.rows.clone()).collect();
        assert_eq!(members, vec![vec![0, 2], vec![1], vec![3]]);
        assert_eq!(groups[0].first, 0);
    }

    #[test]
    fn test_no_key_columns() {
        assert_eq!(partition(&rows(), &[]).len(), 1);
        assert!(partition(&[], &[]).is_empty());
    }

    #[test]
    fn test_numeric_key_equality() {
        assert_eq!(KeyPart::of(&Value::Float(3.0)), KeyPart::of(&Value::Int(3)));
        assert_eq!(KeyPart::of(&Value::Float(-0.0)), KeyPart::of(&Value::Int(0)));
        assert_eq!(KeyPart::of(&Value::Float(1.0e16)), KeyPart::of(&Value::Int(10_000_000_000_000_000)));
        assert_eq!(KeyPart::of(&Value::Float(-9.223372036854775808e18)), KeyPart::of(&Value::Int(i64::MIN)));
        assert!(matches!(KeyPart::of(&Value::Float(9.223372036854775808e18)), KeyPart::Float(_)));
        assert_ne!(KeyPart::of(&Value::Float(3.5)), KeyPart::of(&Value::Int(3)));
        assert_eq!(KeyPart::of(&Value::Float(f64::NAN)), KeyPart::Missing);
    }

    #[test]
    fn test_index_skips_missing_keys() {
        let index = index_rows(&rows(), &[0]);
        assert_eq!(index.len(), 2);
        assert_eq!(index[&vec![KeyPart::Str("p1".into())]], vec![0, 2]);
    }
}
