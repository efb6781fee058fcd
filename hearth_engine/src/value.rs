//! Runtime values: what entity states, service kwargs, and comparison
//! operands look like once the AST has been evaluated.

use std::fmt;

use hearth_script::{CompareOp, NumberLit};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// Keyword map handed to `call_service`. Order-preserving so dispatch and
/// test expectations stay deterministic.
pub type ServiceData = IndexMap<String, Value>;

/// A runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Apply a relational operator. Int/Float cross-compare numerically;
    /// strings compare lexicographically; any other mix is a
    /// [`EvalError::TypeMismatch`] rather than a silent coercion.
    pub fn compare(&self, op: CompareOp, other: &Value) -> Result<bool, EvalError> {
        use std::cmp::Ordering;
        let ord: Ordering = match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (a, b) if a.as_f64().is_some() && b.as_f64().is_some() => a
                .as_f64()
                .unwrap()
                .partial_cmp(&b.as_f64().unwrap())
                .ok_or_else(|| EvalError::TypeMismatch("NaN is not comparable".into()))?,
            (Value::Bool(a), Value::Bool(b)) => {
                return match op {
                    CompareOp::Eq => Ok(a == b),
                    CompareOp::Ne => Ok(a != b),
                    _ => Err(EvalError::TypeMismatch("bool only supports == and !=".into())),
                };
            },
            (Value::Null, Value::Null) => {
                return match op {
                    CompareOp::Eq => Ok(true),
                    CompareOp::Ne => Ok(false),
                    _ => Err(EvalError::TypeMismatch("null only supports == and !=".into())),
                };
            },
            (a, b) => {
                return Err(EvalError::TypeMismatch(format!(
                    "cannot compare {} with {}",
                    a.type_name(),
                    b.type_name()
                )));
            },
        };
        Ok(match op {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        })
    }
}

impl From<NumberLit> for Value {
    fn from(n: NumberLit) -> Self {
        match n {
            NumberLit::Int(i) => Value::Int(i),
            NumberLit::Float(f) => Value::Float(f),
        }
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}
impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items.into_iter().map(Value::Str).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            },
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cross_comparison_works() {
        assert!(Value::Int(3).compare(CompareOp::Lt, &Value::Float(3.5)).unwrap());
        assert!(Value::Float(2.0).compare(CompareOp::Eq, &Value::Int(2)).unwrap());
    }

    #[test]
    fn mixed_types_raise_type_mismatch() {
        let err = Value::Str("21".into())
            .compare(CompareOp::Lt, &Value::Int(22))
            .unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch(_)));
        // equality is just as strict
        let err = Value::Str("on".into())
            .compare(CompareOp::Eq, &Value::Int(1))
            .unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch(_)));
    }

    #[test]
    fn strings_compare_lexicographically() {
        assert!(Value::Str("abc".into())
            .compare(CompareOp::Lt, &Value::Str("abd".into()))
            .unwrap());
    }
}
