//! Contract with the external decision engine.
//!
//! The engine is opaque: the configurator only knows the three decision kinds
//! it can ask for and the payload shapes it gets back.

pub mod payload;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::product::ProductTypeProfile;
use crate::domain::selection::Selections;
use crate::domain::validation::ValidationResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Validate,
    Options,
    Bom,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Options => "options",
            Self::Bom => "bom",
        }
    }

    pub fn path(&self, rule_prefix: &str) -> String {
        format!("{}/{}", rule_prefix.trim_end_matches('/'), self.as_str())
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTypeIdentity {
    pub code: String,
    pub variant: String,
    pub family: String,
}

impl From<&ProductTypeProfile> for ProductTypeIdentity {
    fn from(profile: &ProductTypeProfile) -> Self {
        Self {
            code: profile.product_type.code.clone(),
            variant: profile.product_type.variant.clone(),
            family: profile.family.code.clone(),
        }
    }
}

/// Body sent with every decision request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleContext {
    pub user_selections: Selections,
    pub specs: Value,
    pub product_type: ProductTypeIdentity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableOption {
    pub code: String,
    pub display_name: String,
    pub is_active: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsDecision {
    pub available_options: Option<BTreeMap<String, Vec<AvailableOption>>>,
    pub reset_fields: Vec<String>,
}

/// BOM skeleton line as returned by the engine, before SKU resolution and
/// catalog enrichment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomSkeletonLine {
    pub sku: Option<String>,
    /// Attribute values used to look the SKU up when `sku` is missing.
    pub criteria: Option<Value>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Decimal,
    pub unit: String,
    pub cut_length_mm: Option<i32>,
    pub sort_order: i32,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BomDecision {
    pub lines: Vec<BomSkeletonLine>,
    /// Raw decision document, kept as the configuration's BOM snapshot.
    pub payload: Value,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("rules engine request for `{decision_path}` failed: {message}")]
    Transport { decision_path: String, message: String },
    #[error("rules engine returned HTTP {status} for `{decision_path}`: {body}")]
    Status { decision_path: String, status: u16, body: String },
    #[error("rules engine response for `{decision_path}` could not be decoded: {message}")]
    Decode { decision_path: String, message: String },
}

impl GatewayError {
    pub fn decision_path(&self) -> &str {
        match self {
            Self::Transport { decision_path, .. }
            | Self::Status { decision_path, .. }
            | Self::Decode { decision_path, .. } => decision_path,
        }
    }

    /// Client-safe description: the decision path and HTTP status, never the
    /// upstream response body or transport details.
    pub fn summary(&self) -> String {
        match self {
            Self::Transport { decision_path, .. } => {
                format!("rules engine request for `{decision_path}` failed")
            }
            Self::Status { decision_path, status, .. } => {
                format!("rules engine returned HTTP {status} for `{decision_path}`")
            }
            Self::Decode { decision_path, .. } => {
                format!("rules engine response for `{decision_path}` could not be decoded")
            }
        }
    }
}

#[async_trait]
pub trait RuleEvaluationGateway: Send + Sync {
    async fn validate(
        &self,
        decision_path: &str,
        context: &RuleContext,
    ) -> Result<ValidationResult, GatewayError>;

    async fn options(
        &self,
        decision_path: &str,
        context: &RuleContext,
    ) -> Result<OptionsDecision, GatewayError>;

    async fn bom(&self, decision_path: &str, context: &RuleContext)
        -> Result<BomDecision, GatewayError>;
}
