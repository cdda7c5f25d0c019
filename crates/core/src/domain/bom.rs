use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::configuration::ConfigurationId;

/// Resolved, persisted BOM line owned by a configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomLine {
    pub part_sku: String,
    pub part_name: Option<String>,
    pub category: Option<String>,
    pub quantity: Decimal,
    pub unit: String,
    pub cut_length_mm: Option<i32>,
    pub sort_order: i32,
    pub notes: Option<String>,
}

/// Skeleton line that could not be mapped to a SKU.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedLine {
    pub category: Option<String>,
    pub sort_order: i32,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bom {
    pub configuration_id: ConfigurationId,
    pub lines: Vec<BomLine>,
    pub total_weight_kg: Decimal,
    pub unresolved: Vec<UnresolvedLine>,
    pub generated_at: Option<DateTime<Utc>>,
}
