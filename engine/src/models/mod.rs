//! Core data model shared by every operation.
//!
//! - [`DataType`] - declared type of a column
//! - [`Value`] - a single cell, with [`Value::Null`] as the missing sentinel
//! - [`Field`] / [`Schema`] - ordered, uniquely named, typed columns
//! - [`Table`] - an immutable schema + rows pair

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::SchemaError;

pub mod table;

pub use table::Table;

// =============================================================================
// Data Types
// =============================================================================

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// Free-form text.
    Str,
    /// Text drawn from a small set of codes (team, league, handedness).
    Categorical,
    /// Boolean flag.
    Bool,
}

impl DataType {
    /// `Int` or `Float`.
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }

    /// `Str` or `Categorical`.
    pub fn is_text(self) -> bool {
        matches!(self, DataType::Str | DataType::Categorical)
    }

    /// Short tag used in table headers.
    pub fn abbrev(self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "dbl",
            DataType::Str => "chr",
            DataType::Categorical => "fct",
            DataType::Bool => "lgl",
        }
    }

    /// Common type two columns can be widened to, if any.
    pub fn unify(self, other: DataType) -> Option<DataType> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (a, b) if a.is_numeric() && b.is_numeric() => Some(DataType::Float),
            (a, b) if a.is_text() && b.is_text() => Some(DataType::Str),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int => "integer",
            DataType::Float => "float",
            DataType::Str => "string",
            DataType::Categorical => "categorical",
            DataType::Bool => "boolean",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Values
// =============================================================================

/// A single cell.
///
/// Serializes to the natural JSON scalar; `Null` and non-finite floats
/// serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing value.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// True for `Null` and for NaN/infinite floats.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => !f.is_finite(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if f.is_finite() => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Name of the runtime variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }

    /// Natural type of a literal. `None` for `Null`.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Bool),
            Value::Int(_) => Some(DataType::Int),
            Value::Float(_) => Some(DataType::Float),
            Value::Str(_) => Some(DataType::Str),
        }
    }

    /// Convert a cell to the representation of `dtype`.
    ///
    /// Integers widen to floats; missing values fit every type.
    pub fn coerce(self, dtype: DataType) -> Option<Value> {
        match (self, dtype) {
            (Value::Null, _) => Some(Value::Null),
            (Value::Int(i), DataType::Float) => Some(Value::Float(i as f64)),
            (v @ Value::Int(_), DataType::Int) => Some(v),
            (v @ Value::Float(_), DataType::Float) => Some(v),
            (v @ Value::Str(_), DataType::Str | DataType::Categorical) => Some(v),
            (v @ Value::Bool(_), DataType::Bool) => Some(v),
            _ => None,
        }
    }

    /// Total order used by `sort`: numbers compare numerically across
    /// `Int`/`Float`, missing values order after everything else.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (a, b) => match (a.rank(), b.rank()) {
                (1, 1) => {
                    // both present numbers, at least one float
                    let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                    x.total_cmp(&y)
                }
                (ra, rb) => ra.cmp(&rb),
            },
        }
    }

    fn rank(&self) -> u8 {
        if self.is_missing() {
            return 3;
        }
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) | Value::Float(_) => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NA"),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if !x.is_finite() => f.write_str("NA"),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// Schema
// =============================================================================

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub dtype: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, dtype: DataType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Ordered list of uniquely named fields.
///
/// Serializes as a JSON array of `{ "name": ..., "type": ... }` objects;
/// deserialization rejects duplicate names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Field>", into = "Vec<Field>")]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Build a schema, rejecting duplicate names.
    pub fn new(fields: Vec<Field>) -> Result<Self, SchemaError> {
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateColumn(field.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    /// Shorthand for tests and the data dictionary.
    pub fn from_pairs(pairs: &[(&str, DataType)]) -> Result<Self, SchemaError> {
        Self::new(pairs.iter().map(|(n, t)| Field::new(*n, *t)).collect())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Position of a column, or `MissingColumn`.
    pub fn index_of(&self, name: &str) -> Result<usize, SchemaError> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| self.missing(name))
    }

    pub fn field(&self, name: &str) -> Result<&Field, SchemaError> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    pub fn dtype_of(&self, name: &str) -> Result<DataType, SchemaError> {
        self.field(name).map(|f| f.dtype)
    }

    /// Resolve several column names at once, in order.
    pub fn indices_of<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>, SchemaError> {
        names.iter().map(|n| self.index_of(n.as_ref())).collect()
    }

    pub(crate) fn missing(&self, name: &str) -> SchemaError {
        SchemaError::MissingColumn {
            column: name.to_string(),
            available: self.names(),
        }
    }
}

impl TryFrom<Vec<Field>> for Schema {
    type Error = SchemaError;

    fn try_from(fields: Vec<Field>) -> Result<Self, Self::Error> {
        Schema::new(fields)
    }
}

impl From<Schema> for Vec<Field> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}
