//! Predicate matching for SKU mapping rows.

use serde_json::{Map, Value};

use crate::domain::catalog::SkuMapping;

const WILDCARD: &str = "*";

/// Picks the SKU of the highest-priority active row whose predicate matches.
/// Rows of equal priority keep their stored order.
pub fn select_mapping<'a>(
    mappings: &'a [SkuMapping],
    family_code: &str,
    category: &str,
    criteria: &Map<String, Value>,
) -> Option<&'a SkuMapping> {
    let mut candidates: Vec<&SkuMapping> = mappings
        .iter()
        .filter(|mapping| {
            mapping.active && mapping.family_code == family_code && mapping.category == category
        })
        .collect();
    candidates.sort_by(|left, right| right.priority.cmp(&left.priority));

    candidates.into_iter().find(|mapping| matches_criteria(&mapping.match_criteria, criteria))
}

/// Every predicate key must be present in `criteria` and satisfied:
/// `"*"` matches anything and `{min, max}` is an inclusive numeric range.
/// A numeric literal on either side compares by value, so `20` matches `20.0`.
/// Anything else is compared as text, ignoring case.
pub fn matches_criteria(predicate: &Value, criteria: &Map<String, Value>) -> bool {
    let Some(predicate) = predicate.as_object() else {
        return false;
    };

    predicate.iter().all(|(attribute, expected)| {
        let Some(actual) = criteria.get(attribute) else {
            return false;
        };
        matches_value(expected, actual)
    })
}

fn matches_value(expected: &Value, actual: &Value) -> bool {
    if expected.as_str() == Some(WILDCARD) {
        return true;
    }

    if let Some((min, max)) = range_bounds(expected) {
        return match numeric(actual) {
            Some(number) => number >= min && number <= max,
            None => false,
        };
    }

    if expected.is_number() || actual.is_number() {
        if let (Some(expected), Some(actual)) = (numeric(expected), numeric(actual)) {
            return expected == actual;
        }
    }

    match (text(expected), text(actual)) {
        (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(&actual),
        _ => false,
    }
}

fn range_bounds(expected: &Value) -> Option<(f64, f64)> {
    let object = expected.as_object()?;
    let min = object.get("min")?.as_f64()?;
    let max = object.get("max")?.as_f64()?;
    Some((min, max))
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
