use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter-code keyed selections of a configuration. Keys iterate in a
/// stable order so snapshots and diffs are deterministic.
pub type Selections = BTreeMap<String, SelectionValue>;

/// A single selection value.
///
/// Scalars are kept as typed variants; arrays and objects are carried as an
/// opaque document and only ever replaced as a whole.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionValue {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    Document(Value),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    Text,
    Document,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Text => "string",
            Self::Document => "document",
        }
    }
}

impl SelectionValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Boolean,
            Self::Integer(_) | Self::Decimal(_) => ValueKind::Number,
            Self::Text(_) => ValueKind::Text,
            Self::Document(_) => ValueKind::Document,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Document(Value::Null))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Text form used for string comparisons against catalog predicates and
    /// visibility rules. `Null` has no text form.
    pub fn display_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(value) => Some(value.to_string()),
            Self::Integer(value) => Some(value.to_string()),
            Self::Decimal(value) => Some(value.to_string()),
            Self::Text(value) => Some(value.clone()),
            Self::Document(Value::Null) => None,
            Self::Document(value) => Some(value.to_string()),
        }
    }

    /// Equality that treats `2000` and `2000.0` as the same number.
    pub fn same_as(&self, other: &SelectionValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(left), Some(right)) => left == right,
            _ => self == other,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(value) => Value::Bool(*value),
            Self::Integer(value) => Value::from(*value),
            Self::Decimal(value) => {
                serde_json::Number::from_f64(*value).map(Value::Number).unwrap_or(Value::Null)
            }
            Self::Text(value) => Value::String(value.clone()),
            Self::Document(value) => value.clone(),
        }
    }
}

impl From<Value> for SelectionValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(value) => Self::Bool(value),
            Value::Number(number) => match number.as_i64() {
                Some(integer) => Self::Integer(integer),
                None => number.as_f64().map(Self::Decimal).unwrap_or(Self::Null),
            },
            Value::String(value) => Self::Text(value),
            other => Self::Document(other),
        }
    }
}

impl From<&str> for SelectionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<i64> for SelectionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for SelectionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MergeOutcome {
    pub selections: Selections,
    pub changed_fields: Vec<String>,
}

/// Overwrites each patched key in full. Nested documents are replaced, never
/// merged.
pub fn merge_patch(current: &Selections, patch: &Selections) -> MergeOutcome {
    let mut selections = current.clone();
    let mut changed_fields = Vec::new();

    for (code, value) in patch {
        let changed = match current.get(code) {
            Some(previous) => !previous.same_as(value),
            None => true,
        };
        if changed {
            changed_fields.push(code.clone());
        }
        selections.insert(code.clone(), value.clone());
    }

    MergeOutcome { selections, changed_fields }
}

/// Removes every listed field and returns the de-duplicated list that was
/// applied, in decision order.
pub fn apply_reset_fields(selections: &mut Selections, reset_fields: &[String]) -> Vec<String> {
    let mut applied: Vec<String> = Vec::with_capacity(reset_fields.len());
    for field in reset_fields {
        if applied.contains(field) {
            continue;
        }
        selections.remove(field);
        applied.push(field.clone());
    }
    applied
}

pub fn selections_to_json(selections: &Selections) -> Value {
    Value::Object(
        selections.iter().map(|(code, value)| (code.clone(), value.to_json())).collect(),
    )
}
