use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(default)]
    pub parameter: String,
    #[serde(default)]
    pub rule: String,
    #[serde(default)]
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        parameter: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { parameter: parameter.into(), rule: rule.into(), message: message.into() }
    }
}

/// Cached outcome of the rule engine's `validate` decision.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn passed() -> Self {
        Self { valid: true, errors: Vec::new(), warnings: Vec::new() }
    }

    pub fn failed(errors: Vec<ValidationIssue>) -> Self {
        Self { valid: false, errors, warnings: Vec::new() }
    }

    /// Stand-in recorded when the decision payload cannot be read.
    pub fn unreadable() -> Self {
        Self::failed(vec![ValidationIssue::new(
            "_system",
            "parse",
            "Failed to parse validation result from rules engine.",
        )])
    }

    pub fn is_clean(&self) -> bool {
        self.valid && self.errors.is_empty()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|issue| issue.message.clone()).collect()
    }
}
