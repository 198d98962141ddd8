//! Column types of the packaged baseball tables.

use once_cell::sync::Lazy;

use crate::models::{DataType, Field, Schema};

use DataType::{Categorical as Cat, Int, Str};

const BATTING: &[(&str, DataType)] = &[
    ("playerID", Str),
    ("yearID", Int),
    ("stint", Int),
    ("teamID", Cat),
    ("lgID", Cat),
    ("G", Int),
    ("AB", Int),
    ("R", Int),
    ("H", Int),
    ("X2B", Int),
    ("X3B", Int),
    ("HR", Int),
    ("RBI", Int),
    ("SB", Int),
    ("CS", Int),
    ("BB", Int),
    ("SO", Int),
    ("IBB", Int),
    ("HBP", Int),
    ("SH", Int),
    ("SF", Int),
    ("GIDP", Int),
];

const PEOPLE: &[(&str, DataType)] = &[
    ("playerID", Str),
    ("birthYear", Int),
    ("birthCountry", Str),
    ("nameFirst", Str),
    ("nameLast", Str),
    ("bats", Cat),
    ("throws", Cat),
    ("debut", Str),
    ("finalGame", Str),
];

const TEAMS: &[(&str, DataType)] = &[
    ("yearID", Int),
    ("lgID", Cat),
    ("teamID", Cat),
    ("franchID", Cat),
    ("name", Str),
    ("W", Int),
    ("L", Int),
    ("R", Int),
    ("HR", Int),
    ("attendance", Int),
];

fn build(columns: &[(&str, DataType)]) -> Schema {
    let fields = columns
        .iter()
        .map(|&(name, dtype)| Field::new(name, dtype))
        .collect();
    // names above are unique, so this cannot fail
    Schema::new(fields).unwrap_or_else(|_| Schema::default())
}

static DICTIONARY: Lazy<Vec<(&'static str, Schema)>> = Lazy::new(|| {
    vec![
        ("batting", build(BATTING)),
        ("people", build(PEOPLE)),
        ("teams", build(TEAMS)),
    ]
});

/// Names of the dictionary tables, in presentation order.
pub fn table_names() -> Vec<&'static str> {
    DICTIONARY.iter().map(|(name, _)| *name).collect()
}

/// Declared schema of a dictionary table (case-insensitive).
pub fn schema_for(name: &str) -> Option<&'static Schema> {
    DICTIONARY
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, schema)| schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_tables() {
        assert_eq!(table_names(), vec!["batting", "people", "teams"]);
        assert_eq!(schema_for("batting").unwrap().len(), 22);
        assert_eq!(schema_for("People").unwrap().dtype_of("bats").unwrap(), DataType::Categorical);
        assert!(schema_for("salaries").is_none());
    }
}
