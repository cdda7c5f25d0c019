use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::selection::Selections;
use crate::domain::validation::ValidationResult;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigurationId(pub String);

impl ConfigurationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ConfigurationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigurationStatus {
    Draft,
    Valid,
    Invalid,
    Finalized,
}

impl ConfigurationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Finalized => "finalized",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized)
    }

    /// Status implied by a validation decision; no decision leaves the
    /// configuration unvalidated.
    pub fn from_validation(validation: Option<&ValidationResult>) -> Self {
        match validation {
            Some(result) if result.is_clean() => Self::Valid,
            Some(_) => Self::Invalid,
            None => Self::Draft,
        }
    }
}

impl fmt::Display for ConfigurationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigurationStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "valid" => Ok(Self::Valid),
            "invalid" => Ok(Self::Invalid),
            "finalized" => Ok(Self::Finalized),
            other => {
                Err(DomainError::InvariantViolation(format!("unknown configuration status `{other}`")))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub id: ConfigurationId,
    pub product_type_code: String,
    pub family_code: String,
    pub reference: Option<String>,
    pub status: ConfigurationStatus,
    pub selections: Selections,
    pub version: i64,
    pub validation: Option<ValidationResult>,
    pub bom_snapshot: Option<Value>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Configuration {
    pub fn new_draft(
        product_type_code: impl Into<String>,
        family_code: impl Into<String>,
        reference: Option<String>,
        created_by: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConfigurationId::generate(),
            product_type_code: product_type_code.into(),
            family_code: family_code.into(),
            reference,
            status: ConfigurationStatus::Draft,
            selections: Selections::new(),
            version: 1,
            validation: None,
            bom_snapshot: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_transition_to(&self, next: ConfigurationStatus) -> bool {
        use ConfigurationStatus::{Draft, Finalized, Invalid, Valid};

        matches!(
            (self.status, next),
            (Draft | Valid | Invalid, Draft | Valid | Invalid) | (Draft | Valid | Invalid, Finalized)
        )
    }

    pub fn transition_to(&mut self, next: ConfigurationStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidTransition { from: self.status, to: next })
    }

    /// Rejects any mutation of a finalized configuration.
    pub fn ensure_mutable(&self, action: &'static str) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::Finalized { id: self.id.to_string(), action });
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.validation.as_ref().is_some_and(ValidationResult::is_clean)
    }

    pub fn can_finalize(&self) -> bool {
        self.is_complete() && !self.status.is_terminal()
    }

    /// Fresh draft carrying the same selections. History, cached validation
    /// and the BOM snapshot stay with the source.
    pub fn clone_as_draft(&self, now: DateTime<Utc>) -> Self {
        Self {
            id: ConfigurationId::generate(),
            product_type_code: self.product_type_code.clone(),
            family_code: self.family_code.clone(),
            reference: self.reference.as_ref().map(|reference| format!("{reference} (copy)")),
            status: ConfigurationStatus::Draft,
            selections: self.selections.clone(),
            version: 1,
            validation: None,
            bom_snapshot: None,
            created_by: self.created_by.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}
