use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::configuration::{Configuration, ConfigurationId};
use crate::domain::selection::Selections;
use crate::domain::validation::ValidationResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Created,
    Updated,
    Finalized,
    Cloned,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Finalized => "finalized",
            Self::Cloned => "cloned",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "finalized" => Some(Self::Finalized),
            "cloned" => Some(Self::Cloned),
            _ => None,
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit record. Entries are written in the same unit of work as
/// the mutation they describe and never edited afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub configuration_id: ConfigurationId,
    pub action: HistoryAction,
    pub selections_snapshot: Selections,
    pub validation_snapshot: Option<ValidationResult>,
    pub changed_fields: Vec<String>,
    pub performed_by: Option<String>,
    pub performed_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn record(
        configuration: &Configuration,
        action: HistoryAction,
        changed_fields: Vec<String>,
        performed_by: Option<String>,
        performed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            configuration_id: configuration.id.clone(),
            action,
            selections_snapshot: configuration.selections.clone(),
            validation_snapshot: configuration.validation.clone(),
            changed_fields,
            performed_by,
            performed_at,
        }
    }
}
