//! Shared reference data curated outside the configurator. The core only
//! reads these rows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub cuttable: bool,
    pub weight_kg: Option<Decimal>,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkuMapping {
    pub family_code: String,
    pub category: String,
    /// Predicate document: `{attribute: "*" | {min, max} | literal}`.
    pub match_criteria: Value,
    pub sku: String,
    pub priority: i32,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub code: String,
    pub name: String,
    pub density_kg_per_m3: Option<Decimal>,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialColor {
    pub material_code: String,
    pub color_code: String,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub code: String,
    pub name: String,
    pub color_system: String,
    pub hex_value: Option<String>,
    pub standard: bool,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub code: String,
    pub name: String,
    pub material_code: String,
    pub height_mm: Decimal,
    pub thickness_mm: Decimal,
    pub weight_per_meter_kg: Decimal,
    pub max_width_mm: i32,
    pub min_width_mm: i32,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Motor {
    pub code: String,
    pub brand: String,
    pub model: String,
    pub torque_nm: Decimal,
    pub max_weight_kg: Option<Decimal>,
    pub max_surface_m2: Option<Decimal>,
    pub control_types: Vec<String>,
    pub tube_diameter_mm: Option<i32>,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuideRail {
    pub code: String,
    pub name: String,
    pub rail_type: String,
    pub material_code: String,
    pub width_mm: Decimal,
    pub depth_mm: Decimal,
    pub max_height_mm: i32,
    pub weight_per_meter_kg: Decimal,
    pub bracket_spacing_mm: i32,
    pub compatible_profiles: Vec<String>,
    pub wind_class: Option<i32>,
    pub active: bool,
}

/// Roller housing box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShutterBox {
    pub code: String,
    pub name: String,
    pub box_type: String,
    pub inner_diameter_mm: i32,
    pub outer_height_mm: i32,
    pub compatible_materials: Vec<String>,
    pub max_width_mm: Option<i32>,
    pub active: bool,
}

/// Snapshot of every global reference table the rule context exposes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalCatalog {
    pub materials: Vec<Material>,
    pub material_colors: Vec<MaterialColor>,
    pub colors: Vec<Color>,
    pub profiles: Vec<Profile>,
    pub motors: Vec<Motor>,
    pub guide_rails: Vec<GuideRail>,
    pub boxes: Vec<ShutterBox>,
}
