//! Row-wise expressions used by `filter` and `mutate`.
//!
//! An [`Expr`] is a plain, serializable tree. Before evaluation it is bound
//! against a schema ([`Expr::bind`]), which resolves column names to
//! positions, type-checks every node and compiles regexes once. The
//! resulting [`BoundExpr`] is then evaluated per row and never fails:
//! missing operands and division by zero produce [`Value::Null`].
//!
//! ```rust,ignore
//! use statframe::transform::expr::{col, lit};
//!
//! let ba = (col("H") / col("AB")).round(3);
//! let modern = col("yearID").gt_eq(lit(1955)).and(col("AB").gt_eq(lit(200)));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{SchemaError, TableError, TableResult};
use crate::models::{DataType, Schema, Value};

/// An expression over the columns of one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    /// Column reference.
    Col { name: String },

    /// Constant.
    Lit { value: Value },

    Add { left: Box<Expr>, right: Box<Expr> },
    Sub { left: Box<Expr>, right: Box<Expr> },
    Mul { left: Box<Expr>, right: Box<Expr> },

    /// Float division. Zero denominators yield a missing value.
    Div { left: Box<Expr>, right: Box<Expr> },

    /// Round half away from zero to `digits` decimals.
    Round { expr: Box<Expr>, digits: u32 },

    /// Join the display form of each part with `separator`.
    Concat {
        parts: Vec<Expr>,
        #[serde(default = "default_separator")]
        separator: String,
        /// Drop missing parts instead of rendering them as `NA`.
        #[serde(default)]
        skip_missing: bool,
    },

    Eq { left: Box<Expr>, right: Box<Expr> },
    Ne { left: Box<Expr>, right: Box<Expr> },
    Lt { left: Box<Expr>, right: Box<Expr> },
    Le { left: Box<Expr>, right: Box<Expr> },
    Gt { left: Box<Expr>, right: Box<Expr> },
    Ge { left: Box<Expr>, right: Box<Expr> },

    And { left: Box<Expr>, right: Box<Expr> },
    Or { left: Box<Expr>, right: Box<Expr> },
    Not { expr: Box<Expr> },

    IsNull { expr: Box<Expr> },

    /// Membership in a literal set. Missing values are never members.
    IsIn { expr: Box<Expr>, values: Vec<Value> },

    /// Regex search on a text column.
    Matches { expr: Box<Expr>, pattern: String },
}

fn default_separator() -> String {
    " ".to_string()
}

/// Reference a column by name.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Col { name: name.into() }
}

/// A literal value.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Lit {
        value: value.into(),
    }
}

/// Concatenate parts with a separator; missing parts render as `NA`.
pub fn concat<I>(parts: I, separator: &str) -> Expr
where
    I: IntoIterator<Item = Expr>,
{
    Expr::Concat {
        parts: parts.into_iter().collect(),
        separator: separator.to_string(),
        skip_missing: false,
    }
}

fn boxed(left: Expr, right: Expr) -> (Box<Expr>, Box<Expr>) {
    (Box::new(left), Box::new(right))
}

impl Expr {
    pub fn equals(self, other: Expr) -> Expr {
        let (left, right) = boxed(self, other);
        Expr::Eq { left, right }
    }

    pub fn not_equals(self, other: Expr) -> Expr {
        let (left, right) = boxed(self, other);
        Expr::Ne { left, right }
    }

    pub fn lt(self, other: Expr) -> Expr {
        let (left, right) = boxed(self, other);
        Expr::Lt { left, right }
    }

    pub fn lt_eq(self, other: Expr) -> Expr {
        let (left, right) = boxed(self, other);
        Expr::Le { left, right }
    }

    pub fn gt(self, other: Expr) -> Expr {
        let (left, right) = boxed(self, other);
        Expr::Gt { left, right }
    }

    pub fn gt_eq(self, other: Expr) -> Expr {
        let (left, right) = boxed(self, other);
        Expr::Ge { left, right }
    }

    pub fn and(self, other: Expr) -> Expr {
        let (left, right) = boxed(self, other);
        Expr::And { left, right }
    }

    pub fn or(self, other: Expr) -> Expr {
        let (left, right) = boxed(self, other);
        Expr::Or { left, right }
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self),
        }
    }

    pub fn is_in<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Expr::IsIn {
            expr: Box::new(self),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(self, pattern: &str) -> Expr {
        Expr::Matches {
            expr: Box::new(self),
            pattern: pattern.to_string(),
        }
    }

    pub fn round(self, digits: u32) -> Expr {
        Expr::Round {
            expr: Box::new(self),
            digits,
        }
    }

    /// Resolve columns and type-check against `schema`.
    pub fn bind(&self, schema: &Schema) -> TableResult<BoundExpr> {
        let (node, dtype) = self.bind_node(schema)?;
        Ok(BoundExpr {
            node,
            // an untyped NA literal becomes a numeric column
            dtype: dtype.unwrap_or(DataType::Float),
        })
    }

    fn bind_node(&self, schema: &Schema) -> TableResult<(Node, Option<DataType>)> {
        let bound = match self {
            Expr::Col { name } => {
                let idx = schema.index_of(name)?;
                (Node::Col(idx), Some(schema.fields()[idx].dtype))
            }
            Expr::Lit { value } => {
                let value = if value.is_missing() {
                    Value::Null
                } else {
                    value.clone()
                };
                let dtype = value.data_type();
                (Node::Lit(value), dtype)
            }
            Expr::Add { left, right } => self.bind_arith(ArithOp::Add, left, right, schema)?,
            Expr::Sub { left, right } => self.bind_arith(ArithOp::Sub, left, right, schema)?,
            Expr::Mul { left, right } => self.bind_arith(ArithOp::Mul, left, right, schema)?,
            Expr::Div { left, right } => self.bind_arith(ArithOp::Div, left, right, schema)?,
            Expr::Round { expr, digits } => {
                let (node, dtype) = expr.bind_node(schema)?;
                self.require(dtype, "numeric", |t| t.is_numeric())?;
                (Node::Round(Box::new(node), *digits), dtype.or(Some(DataType::Float)))
            }
            Expr::Concat {
                parts,
                separator,
                skip_missing,
            } => {
                let nodes = parts
                    .iter()
                    .map(|p| p.bind_node(schema).map(|(n, _)| n))
                    .collect::<TableResult<Vec<_>>>()?;
                let node = Node::Concat {
                    parts: nodes,
                    separator: separator.clone(),
                    skip_missing: *skip_missing,
                };
                (node, Some(DataType::Str))
            }
            Expr::Eq { left, right } => self.bind_compare(CompareOp::Eq, left, right, schema)?,
            Expr::Ne { left, right } => self.bind_compare(CompareOp::Ne, left, right, schema)?,
            Expr::Lt { left, right } => self.bind_compare(CompareOp::Lt, left, right, schema)?,
            Expr::Le { left, right } => self.bind_compare(CompareOp::Le, left, right, schema)?,
            Expr::Gt { left, right } => self.bind_compare(CompareOp::Gt, left, right, schema)?,
            Expr::Ge { left, right } => self.bind_compare(CompareOp::Ge, left, right, schema)?,
            Expr::And { left, right } | Expr::Or { left, right } => {
                let (l, lt) = left.bind_node(schema)?;
                let (r, rt) = right.bind_node(schema)?;
                left.require(lt, "boolean", |t| t == DataType::Bool)?;
                right.require(rt, "boolean", |t| t == DataType::Bool)?;
                let node = if matches!(self, Expr::And { .. }) {
                    Node::And(Box::new(l), Box::new(r))
                } else {
                    Node::Or(Box::new(l), Box::new(r))
                };
                (node, Some(DataType::Bool))
            }
            Expr::Not { expr } => {
                let (node, dtype) = expr.bind_node(schema)?;
                expr.require(dtype, "boolean", |t| t == DataType::Bool)?;
                (Node::Not(Box::new(node)), Some(DataType::Bool))
            }
            Expr::IsNull { expr } => {
                let (node, _) = expr.bind_node(schema)?;
                (Node::IsNull(Box::new(node)), Some(DataType::Bool))
            }
            Expr::IsIn { expr, values } => {
                let (node, _) = expr.bind_node(schema)?;
                (Node::IsIn(Box::new(node), values.clone()), Some(DataType::Bool))
            }
            Expr::Matches { expr, pattern } => {
                let (node, dtype) = expr.bind_node(schema)?;
                expr.require(dtype, "string", |t| t.is_text())?;
                let re = Regex::new(pattern)
                    .map_err(|e| TableError::InvalidExpression(format!("{}: {}", pattern, e)))?;
                (Node::Matches(Box::new(node), re), Some(DataType::Bool))
            }
        };
        Ok(bound)
    }

    fn bind_arith(
        &self,
        op: ArithOp,
        left: &Expr,
        right: &Expr,
        schema: &Schema,
    ) -> TableResult<(Node, Option<DataType>)> {
        let (l, lt) = left.bind_node(schema)?;
        let (r, rt) = right.bind_node(schema)?;
        left.require(lt, "numeric", |t| t.is_numeric())?;
        right.require(rt, "numeric", |t| t.is_numeric())?;
        let dtype = match (op, lt, rt) {
            (ArithOp::Div, _, _) => DataType::Float,
            (_, Some(DataType::Float), _) | (_, _, Some(DataType::Float)) => DataType::Float,
            _ => DataType::Int,
        };
        Ok((Node::Arith(op, Box::new(l), Box::new(r)), Some(dtype)))
    }

    fn bind_compare(
        &self,
        op: CompareOp,
        left: &Expr,
        right: &Expr,
        schema: &Schema,
    ) -> TableResult<(Node, Option<DataType>)> {
        let (l, lt) = left.bind_node(schema)?;
        let (r, rt) = right.bind_node(schema)?;
        if let (Some(a), Some(b)) = (lt, rt) {
            if a.unify(b).is_none() {
                return Err(SchemaError::TypeMismatch {
                    column: self.to_string(),
                    expected: a.to_string(),
                    found: b.to_string(),
                }
                .into());
            }
        }
        Ok((Node::Compare(op, Box::new(l), Box::new(r)), Some(DataType::Bool)))
    }

    /// Fail unless `dtype` is untyped (an NA literal) or satisfies `ok`.
    fn require(
        &self,
        dtype: Option<DataType>,
        expected: &str,
        ok: impl Fn(DataType) -> bool,
    ) -> TableResult<()> {
        match dtype {
            Some(t) if !ok(t) => Err(SchemaError::TypeMismatch {
                column: self.to_string(),
                expected: expected.to_string(),
                found: t.to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        let (left, right) = boxed(self, rhs);
        Expr::Add { left, right }
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        let (left, right) = boxed(self, rhs);
        Expr::Sub { left, right }
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        let (left, right) = boxed(self, rhs);
        Expr::Mul { left, right }
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        let (left, right) = boxed(self, rhs);
        Expr::Div { left, right }
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not {
            expr: Box::new(self),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Col { name } => f.write_str(name),
            Expr::Lit { value: Value::Str(s) } => write!(f, "{:?}", s),
            Expr::Lit { value } => write!(f, "{}", value),
            Expr::Add { left, right } => write!(f, "({} + {})", left, right),
            Expr::Sub { left, right } => write!(f, "({} - {})", left, right),
            Expr::Mul { left, right } => write!(f, "({} * {})", left, right),
            Expr::Div { left, right } => write!(f, "({} / {})", left, right),
            Expr::Round { expr, digits } => write!(f, "round({}, {})", expr, digits),
            Expr::Concat { parts, separator, .. } => {
                let parts: Vec<String> = parts.iter().map(ToString::to_string).collect();
                write!(f, "concat({}; sep={:?})", parts.join(", "), separator)
            }
            Expr::Eq { left, right } => write!(f, "{} == {}", left, right),
            Expr::Ne { left, right } => write!(f, "{} != {}", left, right),
            Expr::Lt { left, right } => write!(f, "{} < {}", left, right),
            Expr::Le { left, right } => write!(f, "{} <= {}", left, right),
            Expr::Gt { left, right } => write!(f, "{} > {}", left, right),
            Expr::Ge { left, right } => write!(f, "{} >= {}", left, right),
            Expr::And { left, right } => write!(f, "({} & {})", left, right),
            Expr::Or { left, right } => write!(f, "({} | {})", left, right),
            Expr::Not { expr } => write!(f, "!{}", expr),
            Expr::IsNull { expr } => write!(f, "is.na({})", expr),
            Expr::IsIn { expr, values } => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} %in% [{}]", expr, values.join(", "))
            }
            Expr::Matches { expr, pattern } => write!(f, "{} ~ /{}/", expr, pattern),
        }
    }
}

// =============================================================================
// Bound expressions
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
enum Node {
    Col(usize),
    Lit(Value),
    Arith(ArithOp, Box<Node>, Box<Node>),
    Round(Box<Node>, u32),
    Concat {
        parts: Vec<Node>,
        separator: String,
        skip_missing: bool,
    },
    Compare(CompareOp, Box<Node>, Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
    IsNull(Box<Node>),
    IsIn(Box<Node>, Vec<Value>),
    Matches(Box<Node>, Regex),
}

/// An expression resolved against one schema.
#[derive(Debug, Clone)]
pub struct BoundExpr {
    node: Node,
    dtype: DataType,
}

impl BoundExpr {
    /// Type of the values this expression produces.
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Evaluate against a row shaped like the bound schema.
    pub fn eval(&self, row: &[Value]) -> Value {
        self.node.eval(row)
    }
}

/// Decimals beyond what an `f64` can carry.
const MAX_ROUND_DIGITS: u32 = 15;

fn round_to(x: f64, digits: u32) -> f64 {
    let scale = 10f64.powi(digits.min(MAX_ROUND_DIGITS) as i32);
    let scaled = x * scale;
    if scaled.is_finite() {
        scaled.round() / scale
    } else {
        x
    }
}

impl Node {
    fn eval(&self, row: &[Value]) -> Value {
        match self {
            Node::Col(idx) => row[*idx].clone(),
            Node::Lit(value) => value.clone(),
            Node::Arith(op, l, r) => arith(*op, &l.eval(row), &r.eval(row)),
            Node::Round(inner, digits) => match inner.eval(row) {
                Value::Float(x) if x.is_finite() => Value::Float(round_to(x, *digits)),
                Value::Int(i) => Value::Int(i),
                _ => Value::Null,
            },
            Node::Concat {
                parts,
                separator,
                skip_missing,
            } => {
                let rendered: Vec<String> = parts
                    .iter()
                    .map(|p| p.eval(row))
                    .filter(|v| !(*skip_missing && v.is_missing()))
                    .map(|v| v.to_string())
                    .collect();
                if rendered.is_empty() {
                    Value::Null
                } else {
                    Value::Str(rendered.join(separator))
                }
            }
            Node::Compare(op, l, r) => {
                let (a, b) = (l.eval(row), r.eval(row));
                if a.is_missing() || b.is_missing() {
                    return Value::Null;
                }
                let ord = a.total_cmp(&b);
                Value::Bool(match op {
                    CompareOp::Eq => ord == Ordering::Equal,
                    CompareOp::Ne => ord != Ordering::Equal,
                    CompareOp::Lt => ord == Ordering::Less,
                    CompareOp::Le => ord != Ordering::Greater,
                    CompareOp::Gt => ord == Ordering::Greater,
                    CompareOp::Ge => ord != Ordering::Less,
                })
            }
            // Kleene logic: a definite answer wins over a missing operand
            Node::And(l, r) => match (l.eval(row).as_bool(), r.eval(row).as_bool()) {
                (Some(false), _) | (_, Some(false)) => Value::Bool(false),
                (Some(true), Some(true)) => Value::Bool(true),
                _ => Value::Null,
            },
            Node::Or(l, r) => match (l.eval(row).as_bool(), r.eval(row).as_bool()) {
                (Some(true), _) | (_, Some(true)) => Value::Bool(true),
                (Some(false), Some(false)) => Value::Bool(false),
                _ => Value::Null,
            },
            Node::Not(inner) => match inner.eval(row).as_bool() {
                Some(b) => Value::Bool(!b),
                None => Value::Null,
            },
            Node::IsNull(inner) => Value::Bool(inner.eval(row).is_missing()),
            Node::IsIn(inner, values) => {
                let v = inner.eval(row);
                let found = !v.is_missing()
                    && values
                        .iter()
                        .any(|c| !c.is_missing() && v.total_cmp(c) == Ordering::Equal);
                Value::Bool(found)
            }
            Node::Matches(inner, re) => match inner.eval(row) {
                Value::Str(s) => Value::Bool(re.is_match(&s)),
                _ => Value::Null,
            },
        }
    }
}

fn arith(op: ArithOp, a: &Value, b: &Value) -> Value {
    if let (Value::Int(x), Value::Int(y), false) = (a, b, matches!(op, ArithOp::Div)) {
        let out = match op {
            ArithOp::Add => x.checked_add(*y),
            ArithOp::Sub => x.checked_sub(*y),
            _ => x.checked_mul(*y),
        };
        return out.map_or(Value::Null, Value::Int);
    }
    let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
        return Value::Null;
    };
    let out = match op {
        ArithOp::Add => x + y,
        ArithOp::Sub => x - y,
        ArithOp::Mul => x * y,
        ArithOp::Div if y == 0.0 => return Value::Null,
        ArithOp::Div => x / y,
    };
    if out.is_finite() {
        Value::Float(out)
    } else {
        Value::Null
    }
}
