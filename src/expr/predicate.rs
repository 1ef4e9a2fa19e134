use std::cmp::Ordering;

use serde_json::Map;
use serde_json::Value;

use crate::RpcError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "gt" => Some(CompareOp::Gt),
            "ge" => Some(CompareOp::Ge),
            "lt" => Some(CompareOp::Lt),
            "le" => Some(CompareOp::Le),
            _ => None,
        }
    }
}

/// Compiled record filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Const(bool),
    Compare {
        op: CompareOp,
        pointer: String,
        operand: Value,
    },
    Exists(String),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Matches every record.
    pub fn always() -> Self {
        Predicate::Const(true)
    }

    pub fn compile(expr: &Value) -> std::result::Result<Self, RpcError> {
        match expr {
            Value::Bool(b) => Ok(Predicate::Const(*b)),
            Value::Object(map) => Self::compile_object(map),
            other => Err(invalid(format!("predicate must be a bool or object, got {}", other))),
        }
    }

    fn compile_object(map: &Map<String, Value>) -> std::result::Result<Self, RpcError> {
        let mut entries = map.iter();
        let (keyword, body) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => return Err(invalid("predicate object must have exactly one operator")),
        };

        if let Some(op) = CompareOp::from_keyword(keyword) {
            let (pointer, operand) = match body.as_array().map(Vec::as_slice) {
                Some([Value::String(pointer), operand]) => (pointer, operand),
                _ => {
                    return Err(invalid(format!(
                        "'{}' expects [pointer, value]",
                        keyword
                    )))
                }
            };
            return Ok(Predicate::Compare {
                op,
                pointer: checked_pointer(pointer)?,
                operand: operand.clone(),
            });
        }

        match keyword.as_str() {
            "all" => Ok(Predicate::Const(true)),
            "exists" => match body {
                Value::String(pointer) => Ok(Predicate::Exists(checked_pointer(pointer)?)),
                _ => Err(invalid("'exists' expects a pointer string")),
            },
            "and" | "or" => {
                let parts = body
                    .as_array()
                    .ok_or_else(|| invalid(format!("'{}' expects a list", keyword)))?
                    .iter()
                    .map(Predicate::compile)
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                if keyword == "and" {
                    Ok(Predicate::And(parts))
                } else {
                    Ok(Predicate::Or(parts))
                }
            }
            "not" => Ok(Predicate::Not(Box::new(Predicate::compile(body)?))),
            other => Err(invalid(format!("unknown operator '{}'", other))),
        }
    }

    pub fn matches(
        &self,
        record: &Value,
    ) -> bool {
        match self {
            Predicate::Const(b) => *b,
            Predicate::Compare {
                op,
                pointer,
                operand,
            } => compare(*op, record.pointer(pointer), operand),
            Predicate::Exists(pointer) => record.pointer(pointer).is_some(),
            Predicate::And(parts) => parts.iter().all(|p| p.matches(record)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(record)),
            Predicate::Not(inner) => !inner.matches(record),
        }
    }
}

fn compare(
    op: CompareOp,
    field: Option<&Value>,
    operand: &Value,
) -> bool {
    let equal = field.is_some_and(|f| values_equal(f, operand));
    match op {
        CompareOp::Eq => equal,
        CompareOp::Ne => !equal,
        _ => match field.and_then(|f| order(f, operand)) {
            Some(ordering) => match op {
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Ge => ordering != Ordering::Less,
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Eq | CompareOp::Ne => unreachable!(),
            },
            None => false,
        },
    }
}

/// Numbers compare by value, so `1` equals `1.0`.
pub(crate) fn values_equal(
    a: &Value,
    b: &Value,
) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn order(
    a: &Value,
    b: &Value,
) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

pub(crate) fn checked_pointer(pointer: &str) -> std::result::Result<String, RpcError> {
    if pointer.is_empty() || pointer.starts_with('/') {
        Ok(pointer.to_string())
    } else {
        Err(invalid(format!(
            "'{}' is not a JSON pointer (must be empty or start with '/')",
            pointer
        )))
    }
}

pub(crate) fn invalid(reason: impl Into<String>) -> RpcError {
    RpcError::InvalidExpression(reason.into())
}
