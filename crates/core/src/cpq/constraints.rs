//! Local structural checks applied to a selection patch before any decision
//! engine round-trip.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::product::{ParameterDataType, ProductOption, ProductParameter};
use crate::domain::selection::{SelectionValue, Selections, ValueKind};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub code: String,
    pub parameter: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintResult {
    pub valid: bool,
    pub violations: Vec<ConstraintViolation>,
}

impl Default for ConstraintResult {
    fn default() -> Self {
        Self { valid: true, violations: Vec::new() }
    }
}

impl ConstraintResult {
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|violation| violation.message.clone()).collect()
    }

    fn push(&mut self, code: &str, parameter: &str, message: String) {
        self.valid = false;
        self.violations.push(ConstraintViolation {
            code: code.to_owned(),
            parameter: parameter.to_owned(),
            message,
        });
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SelectionInput<'a> {
    /// Active parameters of the configuration's product type.
    pub parameters: &'a [ProductParameter],
    /// Active options of the product type; only select parameters consult them.
    pub options: &'a [ProductOption],
    pub patch: &'a Selections,
}

pub trait SelectionValidator: Send + Sync {
    fn validate(&self, input: &SelectionInput<'_>) -> ConstraintResult;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicSelectionValidator;

impl SelectionValidator for DeterministicSelectionValidator {
    fn validate(&self, input: &SelectionInput<'_>) -> ConstraintResult {
        validate_selections(input)
    }
}

/// Checks every patched key and collects all violations. Parameter codes are
/// matched case-insensitively; unknown codes pass through untouched.
pub fn validate_selections(input: &SelectionInput<'_>) -> ConstraintResult {
    let parameters_by_code: HashMap<String, &ProductParameter> = input
        .parameters
        .iter()
        .filter(|parameter| parameter.active)
        .map(|parameter| (parameter.code.to_lowercase(), parameter))
        .collect();

    let mut options_by_parameter: HashMap<&str, HashSet<String>> = HashMap::new();
    for option in input.options.iter().filter(|option| option.active) {
        options_by_parameter
            .entry(option.parameter_code.as_str())
            .or_default()
            .insert(option.code.to_lowercase());
    }

    let mut result = ConstraintResult::default();

    for (code, value) in input.patch {
        let Some(parameter) = parameters_by_code.get(&code.to_lowercase()) else {
            continue;
        };

        if value.is_null() {
            if parameter.required {
                result.push(
                    "REQUIRED",
                    code,
                    format!("Parameter '{code}' is required and cannot be null."),
                );
            }
            continue;
        }

        let declared = parameter.declared_type();
        if !accepts_kind(&declared, value.kind()) {
            result.push(
                "TYPE_MISMATCH",
                code,
                format!(
                    "Parameter '{code}' expects type '{}' but got '{}'.",
                    parameter.data_type,
                    value.kind().as_str()
                ),
            );
            continue;
        }

        if declared == ParameterDataType::Select {
            check_option(&mut result, code, value, options_by_parameter.get(parameter.code.as_str()));
        }

        if declared.is_numeric() {
            check_range(&mut result, code, value, parameter);
        }
    }

    result
}

fn accepts_kind(declared: &ParameterDataType, kind: ValueKind) -> bool {
    match declared {
        ParameterDataType::Number | ParameterDataType::Decimal | ParameterDataType::Integer => {
            kind == ValueKind::Number
        }
        ParameterDataType::Boolean => kind == ValueKind::Boolean,
        ParameterDataType::Text | ParameterDataType::Select => kind == ValueKind::Text,
        ParameterDataType::Other(_) => true,
    }
}

fn check_option(
    result: &mut ConstraintResult,
    code: &str,
    value: &SelectionValue,
    allowed: Option<&HashSet<String>>,
) {
    // No loaded options means nothing to check against.
    let Some(allowed) = allowed else {
        return;
    };
    let Some(selected) = value.as_str().filter(|selected| !selected.is_empty()) else {
        return;
    };
    if !allowed.contains(&selected.to_lowercase()) {
        result.push(
            "INVALID_OPTION",
            code,
            format!("Parameter '{code}' value '{selected}' is not a valid option."),
        );
    }
}

fn check_range(
    result: &mut ConstraintResult,
    code: &str,
    value: &SelectionValue,
    parameter: &ProductParameter,
) {
    let Some(number) = value.as_f64() else {
        return;
    };
    if let Some(min) = parameter.min() {
        if number < min {
            result.push(
                "BELOW_MINIMUM",
                code,
                format!("Parameter '{code}' value {number} is below minimum {min}."),
            );
        }
    }
    if let Some(max) = parameter.max() {
        if number > max {
            result.push(
                "ABOVE_MAXIMUM",
                code,
                format!("Parameter '{code}' value {number} exceeds maximum {max}."),
            );
        }
    }
}
