//! Decoding of decision documents into typed results.
//!
//! Every decision may arrive wrapped as `{"result": <payload>}` or bare.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::domain::validation::{ValidationIssue, ValidationResult};
use crate::rules::{AvailableOption, BomSkeletonLine, OptionsDecision};

pub fn unwrap_result(document: &Value) -> &Value {
    document.get("result").unwrap_or(document)
}

/// Reads a `validate` decision. A payload that does not have the expected
/// shape becomes an invalid result carrying a single `_system` parse error.
pub fn parse_validation(document: &Value) -> ValidationResult {
    read_validation(unwrap_result(document)).unwrap_or_else(|_| ValidationResult::unreadable())
}

fn read_validation(payload: &Value) -> Result<ValidationResult, String> {
    let object = payload.as_object().ok_or("validation payload is not an object")?;

    let valid = match object.get("valid") {
        None => true,
        Some(Value::Bool(valid)) => *valid,
        Some(_) => return Err("`valid` is not a boolean".to_owned()),
    };
    let errors = read_issues(object, "errors")?;
    let warnings = read_issues(object, "warnings")?;

    Ok(ValidationResult { valid: valid && errors.is_empty(), errors, warnings })
}

fn read_issues(object: &Map<String, Value>, key: &str) -> Result<Vec<ValidationIssue>, String> {
    let Some(Value::Array(items)) = object.get(key) else {
        return Ok(Vec::new());
    };

    items
        .iter()
        .map(|item| -> Result<ValidationIssue, String> {
            let item = item.as_object().ok_or_else(|| format!("`{key}` entry is not an object"))?;
            Ok(ValidationIssue {
                parameter: optional_string(item, "parameter")?.unwrap_or_default(),
                rule: optional_string(item, "rule")?.unwrap_or_default(),
                message: optional_string(item, "message")?.unwrap_or_default(),
            })
        })
        .collect()
}

/// Reads an `options` decision. Entries under `availableOptions` that are not
/// arrays are skipped; `isActive` defaults to true.
pub fn parse_options(document: &Value) -> Result<OptionsDecision, String> {
    let payload = unwrap_result(document);
    let object = payload.as_object().ok_or("options payload is not an object")?;

    let reset_fields = match object.get("resetFields") {
        Some(Value::Array(fields)) => fields
            .iter()
            .filter(|field| !field.is_null())
            .map(|field| {
                field.as_str().map(str::to_owned).ok_or("`resetFields` entry is not a string")
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => Vec::new(),
    };

    let available_options = match object.get("availableOptions") {
        Some(Value::Object(by_parameter)) => {
            let mut options = BTreeMap::new();
            for (parameter, entries) in by_parameter {
                let Value::Array(entries) = entries else {
                    continue;
                };
                let parsed = entries.iter().map(read_option).collect::<Result<Vec<_>, _>>()?;
                options.insert(parameter.clone(), parsed);
            }
            Some(options)
        }
        _ => None,
    };

    Ok(OptionsDecision { available_options, reset_fields })
}

fn read_option(entry: &Value) -> Result<AvailableOption, String> {
    let entry = entry.as_object().ok_or("option entry is not an object")?;
    let is_active = match entry.get("isActive") {
        None => true,
        Some(Value::Bool(active)) => *active,
        Some(_) => return Err("`isActive` is not a boolean".to_owned()),
    };

    Ok(AvailableOption {
        code: optional_string(entry, "code")?.unwrap_or_default(),
        display_name: optional_string(entry, "displayName")?.unwrap_or_default(),
        is_active,
    })
}

/// Reads a `bom` decision: either a bare array of lines or `{"lines": [...]}`.
///
/// Lines without `sortOrder` take the next value of a running counter that
/// only advances for such lines. `quantity` defaults to 1 and `unit` to
/// `pcs`. `partSku` wins over `sku`; an empty SKU is treated as missing.
pub fn parse_bom(document: &Value) -> Result<Vec<BomSkeletonLine>, String> {
    let payload = unwrap_result(document);
    let lines = match payload {
        Value::Array(lines) => lines,
        Value::Object(object) => match object.get("lines") {
            Some(Value::Array(lines)) => lines,
            Some(_) => return Err("`lines` is not an array".to_owned()),
            None => return Err("bom payload has neither an array nor `lines`".to_owned()),
        },
        _ => return Err("bom payload is neither an array nor an object".to_owned()),
    };

    let mut next_sort_order = 0;
    let mut parsed = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        let line = line.as_object().ok_or_else(|| format!("bom line {index} is not an object"))?;

        let sku = match optional_string(line, "partSku")? {
            Some(sku) => Some(sku),
            None => optional_string(line, "sku")?,
        }
        .filter(|sku| !sku.trim().is_empty());

        let quantity = match line.get("quantity") {
            None | Some(Value::Null) => Decimal::ONE,
            Some(Value::Number(number)) => decimal_from_number(number)
                .ok_or_else(|| format!("bom line {index} has an unreadable quantity"))?,
            Some(_) => return Err(format!("bom line {index} quantity is not a number")),
        };

        let sort_order = match line.get("sortOrder") {
            Some(Value::Number(number)) => number
                .as_i64()
                .and_then(|value| i32::try_from(value).ok())
                .ok_or_else(|| format!("bom line {index} sortOrder is not an integer"))?,
            Some(Value::Null) | None => {
                let assigned = next_sort_order;
                next_sort_order += 1;
                assigned
            }
            Some(_) => return Err(format!("bom line {index} sortOrder is not a number")),
        };

        let cut_length_mm = match line.get("cutLengthMm") {
            Some(Value::Number(number)) => Some(
                number
                    .as_i64()
                    .and_then(|value| i32::try_from(value).ok())
                    .ok_or_else(|| format!("bom line {index} cutLengthMm is not an integer"))?,
            ),
            _ => None,
        };

        let criteria = match line.get("criteria") {
            Some(Value::Object(criteria)) => Some(Value::Object(criteria.clone())),
            _ => None,
        };

        parsed.push(BomSkeletonLine {
            sku,
            criteria,
            name: optional_string(line, "name")?,
            category: optional_string(line, "category")?,
            quantity,
            unit: optional_string(line, "unit")?.unwrap_or_else(|| "pcs".to_owned()),
            cut_length_mm,
            sort_order,
            notes: optional_string(line, "notes")?,
        });
    }

    Ok(parsed)
}

pub fn decimal_from_number(number: &serde_json::Number) -> Option<Decimal> {
    if let Some(integer) = number.as_i64() {
        return Some(Decimal::from(integer));
    }
    let text = number.to_string();
    Decimal::from_str(&text).ok().or_else(|| Decimal::from_scientific(&text).ok())
}

fn optional_string(object: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(format!("`{key}` is not a string")),
    }
}
