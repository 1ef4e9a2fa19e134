use serde_json::Map;
use serde_json::Value;

use super::predicate::checked_pointer;
use super::predicate::invalid;
use super::Predicate;
use crate::RpcError;

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Replace(Value),
    Patch {
        set: Vec<(String, Value)>,
        remove: Vec<String>,
    },
}

/// Compiled in-place record rewrite: a filter plus the change to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    filter: Predicate,
    action: Action,
}

impl Transform {
    pub fn compile(expr: &Value) -> std::result::Result<Self, RpcError> {
        let map = expr
            .as_object()
            .ok_or_else(|| invalid("update expression must be an object"))?;

        let filter = match map.get("where") {
            Some(where_expr) => Predicate::compile(where_expr)?,
            None => Predicate::always(),
        };

        let action = match (map.get("replace"), map.get("set"), map.get("remove")) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(invalid("'replace' cannot be combined with 'set' or 'remove'"))
            }
            (Some(value), None, None) => Action::Replace(value.clone()),
            (None, None, None) => {
                return Err(invalid("update expression needs 'replace', 'set' or 'remove'"))
            }
            (None, set, remove) => Action::Patch {
                set: compile_set(set)?,
                remove: compile_remove(remove)?,
            },
        };

        if let Some(unknown) = map
            .keys()
            .find(|k| !matches!(k.as_str(), "where" | "replace" | "set" | "remove"))
        {
            return Err(invalid(format!("unknown update key '{}'", unknown)));
        }

        Ok(Self { filter, action })
    }

    /// The rewritten record, or `None` when the filter does not match.
    pub fn apply(
        &self,
        record: &Value,
    ) -> Option<Value> {
        if !self.filter.matches(record) {
            return None;
        }

        match &self.action {
            Action::Replace(value) => Some(value.clone()),
            Action::Patch { set, remove } => {
                let mut updated = record.clone();
                for (pointer, value) in set {
                    set_pointer(&mut updated, pointer, value.clone());
                }
                for pointer in remove {
                    remove_pointer(&mut updated, pointer);
                }
                Some(updated)
            }
        }
    }
}

fn compile_set(set: Option<&Value>) -> std::result::Result<Vec<(String, Value)>, RpcError> {
    match set {
        None => Ok(Vec::new()),
        Some(Value::Object(fields)) => fields
            .iter()
            .map(|(pointer, value)| Ok((checked_pointer(pointer)?, value.clone())))
            .collect(),
        Some(_) => Err(invalid("'set' expects an object of pointer -> value")),
    }
}

fn compile_remove(remove: Option<&Value>) -> std::result::Result<Vec<String>, RpcError> {
    match remove {
        None => Ok(Vec::new()),
        Some(Value::Array(pointers)) => pointers
            .iter()
            .map(|p| match p {
                Value::String(pointer) if !pointer.is_empty() => checked_pointer(pointer),
                _ => Err(invalid("'remove' expects a list of non-empty pointers")),
            })
            .collect(),
        Some(_) => Err(invalid("'remove' expects a list of pointers")),
    }
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Split `/a/b/c` into (`/a/b`, `c`).
fn split_last(pointer: &str) -> Option<(&str, String)> {
    let idx = pointer.rfind('/')?;
    Some((&pointer[..idx], unescape(&pointer[idx + 1..])))
}

/// Write `value` at `pointer`, creating missing object levels.
/// Paths through scalars or out-of-range array indexes are left untouched.
fn set_pointer(
    target: &mut Value,
    pointer: &str,
    value: Value,
) {
    if pointer.is_empty() {
        *target = value;
        return;
    }

    let mut current = target;
    let tokens: Vec<String> = pointer.split('/').skip(1).map(unescape).collect();
    let (last, parents) = match tokens.split_last() {
        Some(split) => split,
        None => return,
    };

    for token in parents {
        current = match current {
            Value::Object(map) => map
                .entry(token.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => match token.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                Some(item) => item,
                None => return,
            },
            _ => return,
        };
    }

    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
        }
        Value::Array(items) => {
            if let Some(slot) = last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                *slot = value;
            } else if last == "-" {
                items.push(value);
            }
        }
        _ => {}
    }
}

fn remove_pointer(
    target: &mut Value,
    pointer: &str,
) {
    let Some((parent, last)) = split_last(pointer) else {
        return;
    };

    match target.pointer_mut(parent) {
        Some(Value::Object(map)) => {
            map.remove(&last);
        }
        Some(Value::Array(items)) => {
            if let Ok(i) = last.parse::<usize>() {
                if i < items.len() {
                    items.remove(i);
                }
            }
        }
        _ => {}
    }
}
