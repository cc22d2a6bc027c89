use std::cmp::Ordering;

use crate::common::{Result, StratumError};

use super::{Record, Schema, Value};

/// The evaluator seam used by table scans.
///
/// A scan hands every live record to the predicate; a `Value::Bool(true)`
/// result selects the record, any other value skips it, and an error
/// aborts the scan. Anything that can judge a record against its schema
/// can drive a scan, so tests are free to plug in trivial predicates.
pub trait Predicate {
    fn eval(&self, record: &Record, schema: &Schema) -> Result<Value>;
}

/// Comparison operators over same-typed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn holds(&self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }
}

/// A small comparison/boolean expression tree over record attributes.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A literal value
    Const(Value),
    /// The value of attribute `i` of the record under evaluation
    Attr(usize),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn attr(index: usize) -> Expr {
        Expr::Attr(index)
    }

    pub fn constant(value: impl Into<Value>) -> Expr {
        Expr::Const(value.into())
    }

    pub fn cmp(op: CmpOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Cmp(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Expr {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Or(Box::new(lhs), Box::new(rhs))
    }

    pub fn not(inner: Expr) -> Expr {
        Expr::Not(Box::new(inner))
    }
}

fn as_bool(value: Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(StratumError::TypeMismatch {
            left: other.type_name(),
            right: "BOOL",
        }),
    }
}

impl Predicate for Expr {
    fn eval(&self, record: &Record, schema: &Schema) -> Result<Value> {
        match self {
            Expr::Const(v) => Ok(v.clone()),
            Expr::Attr(i) => record.get_attr(schema, *i),
            Expr::Cmp(op, lhs, rhs) => {
                let a = lhs.eval(record, schema)?;
                let b = rhs.eval(record, schema)?;
                Ok(Value::Bool(op.holds(a.compare(&b)?)))
            }
            Expr::And(lhs, rhs) => {
                let a = as_bool(lhs.eval(record, schema)?)?;
                let b = as_bool(rhs.eval(record, schema)?)?;
                Ok(Value::Bool(a && b))
            }
            Expr::Or(lhs, rhs) => {
                let a = as_bool(lhs.eval(record, schema)?)?;
                let b = as_bool(rhs.eval(record, schema)?)?;
                Ok(Value::Bool(a || b))
            }
            Expr::Not(inner) => {
                let v = as_bool(inner.eval(record, schema)?)?;
                Ok(Value::Bool(!v))
            }
        }
    }
}
