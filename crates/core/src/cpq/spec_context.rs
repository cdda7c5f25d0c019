//! Assembly of the `specs` section of a rule context.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use crate::domain::catalog::GlobalCatalog;
use crate::domain::product::ProductSpec;

/// Groups active spec rows as `{group: {key: value}}`. Later rows win on a
/// duplicate key.
pub fn group_specs(specs: &[ProductSpec]) -> Map<String, Value> {
    let mut grouped = Map::new();
    for spec in specs.iter().filter(|spec| spec.active) {
        let group = grouped
            .entry(spec.group.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(entries) = group {
            entries.insert(spec.key.clone(), spec.value.clone());
        }
    }
    grouped
}

/// Renders the cached reference tables. Only active rows are exposed; a
/// material lists the colours whose link and colour are both active.
pub fn catalog_sections(catalog: &GlobalCatalog) -> Map<String, Value> {
    let active_colors: Vec<&str> = catalog
        .colors
        .iter()
        .filter(|color| color.active)
        .map(|color| color.code.as_str())
        .collect();

    let materials = catalog
        .materials
        .iter()
        .filter(|material| material.active)
        .map(|material| {
            let available_colors: Vec<&str> = catalog
                .material_colors
                .iter()
                .filter(|link| {
                    link.active
                        && link.material_code == material.code
                        && active_colors.contains(&link.color_code.as_str())
                })
                .map(|link| link.color_code.as_str())
                .collect();
            json!({
                "code": material.code,
                "name": material.name,
                "densityKgPerM3": number(material.density_kg_per_m3.unwrap_or_default()),
                "availableColors": available_colors,
            })
        })
        .collect::<Vec<_>>();

    let profiles = catalog
        .profiles
        .iter()
        .filter(|profile| profile.active)
        .map(|profile| {
            json!({
                "code": profile.code,
                "name": profile.name,
                "materialCode": profile.material_code,
                "heightMm": number(profile.height_mm),
                "thicknessMm": number(profile.thickness_mm),
                "weightPerMeterKg": number(profile.weight_per_meter_kg),
                "maxWidthMm": profile.max_width_mm,
                "minWidthMm": profile.min_width_mm,
            })
        })
        .collect::<Vec<_>>();

    let motors = catalog
        .motors
        .iter()
        .filter(|motor| motor.active)
        .map(|motor| {
            json!({
                "code": motor.code,
                "brand": motor.brand,
                "model": motor.model,
                "torqueNm": number(motor.torque_nm),
                "maxWeightKg": number(motor.max_weight_kg.unwrap_or_default()),
                "maxSurfaceM2": number(motor.max_surface_m2.unwrap_or_default()),
                "controlTypes": motor.control_types,
                "tubeDiameterMm": motor.tube_diameter_mm.unwrap_or_default(),
            })
        })
        .collect::<Vec<_>>();

    let guide_rails = catalog
        .guide_rails
        .iter()
        .filter(|rail| rail.active)
        .map(|rail| {
            json!({
                "code": rail.code,
                "name": rail.name,
                "type": rail.rail_type,
                "materialCode": rail.material_code,
                "maxHeightMm": rail.max_height_mm,
                "widthMm": number(rail.width_mm),
                "depthMm": number(rail.depth_mm),
                "weightPerMeterKg": number(rail.weight_per_meter_kg),
                "bracketSpacingMm": rail.bracket_spacing_mm,
                "compatibleProfiles": rail.compatible_profiles,
                "windClass": rail.wind_class.unwrap_or_default(),
            })
        })
        .collect::<Vec<_>>();

    let boxes = catalog
        .boxes
        .iter()
        .filter(|shutter_box| shutter_box.active)
        .map(|shutter_box| {
            json!({
                "code": shutter_box.code,
                "name": shutter_box.name,
                "type": shutter_box.box_type,
                "innerDiameterMm": shutter_box.inner_diameter_mm,
                "outerHeightMm": shutter_box.outer_height_mm,
                "compatibleMaterials": shutter_box.compatible_materials,
                "maxWidthMm": shutter_box.max_width_mm.unwrap_or_default(),
            })
        })
        .collect::<Vec<_>>();

    let colors = catalog
        .colors
        .iter()
        .filter(|color| color.active)
        .map(|color| {
            json!({
                "code": color.code,
                "name": color.name,
                "colorSystem": color.color_system,
                "hexValue": color.hex_value.clone().unwrap_or_default(),
                "isStandard": color.standard,
            })
        })
        .collect::<Vec<_>>();

    let mut sections = Map::new();
    sections.insert("materials".to_owned(), Value::Array(materials));
    sections.insert("profiles".to_owned(), Value::Array(profiles));
    sections.insert("motors".to_owned(), Value::Array(motors));
    sections.insert("guideRails".to_owned(), Value::Array(guide_rails));
    sections.insert("boxes".to_owned(), Value::Array(boxes));
    sections.insert("colors".to_owned(), Value::Array(colors));
    sections
}

/// Product-type groups with the catalog sections merged in at the same level,
/// so rules read both `specs.dimensions` and `specs.materials`.
pub fn build_spec_context(specs: &[ProductSpec], catalog: Option<&GlobalCatalog>) -> Value {
    let mut context = group_specs(specs);
    if let Some(catalog) = catalog {
        context.extend(catalog_sections(catalog));
    }
    Value::Object(context)
}

/// Decimal rendered as a JSON number for the decision engine.
pub fn number(value: Decimal) -> Value {
    if value.fract().is_zero() {
        if let Some(integer) = value.to_i64() {
            return Value::from(integer);
        }
    }
    value
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{build_spec_context, number};
    use crate::domain::catalog::{Color, GlobalCatalog, Material, MaterialColor};
    use crate::domain::product::ProductSpec;

    fn spec(group: &str, key: &str, value: serde_json::Value, active: bool) -> ProductSpec {
        ProductSpec {
            product_type_code: "RS-STD".to_owned(),
            group: group.to_owned(),
            key: key.to_owned(),
            value,
            active,
        }
    }

    fn color(code: &str, active: bool) -> Color {
        Color {
            code: code.to_owned(),
            name: code.to_owned(),
            color_system: "RAL".to_owned(),
            hex_value: None,
            standard: true,
            active,
        }
    }

    #[test]
    fn groups_specs_and_merges_catalog_sections() {
        let specs = vec![
            spec("dimensions", "ALU", json!({"maxWidthMm": 3500}), true),
            spec("dimensions", "PVC", json!({"maxWidthMm": 2500}), true),
            spec("dimensions", "WOOD", json!({"maxWidthMm": 1800}), false),
            spec("drive", "defaultMotor", json!("SOMFY-10"), true),
        ];
        let catalog = GlobalCatalog {
            materials: vec![Material {
                code: "ALU".to_owned(),
                name: "Aluminium".to_owned(),
                density_kg_per_m3: Some(Decimal::new(2700, 0)),
                active: true,
            }],
            material_colors: vec![
                MaterialColor { material_code: "ALU".to_owned(), color_code: "RAL9016".to_owned(), active: true },
                MaterialColor { material_code: "ALU".to_owned(), color_code: "RAL7016".to_owned(), active: true },
                MaterialColor { material_code: "ALU".to_owned(), color_code: "RAL1015".to_owned(), active: false },
            ],
            colors: vec![color("RAL9016", true), color("RAL7016", false), color("RAL1015", true)],
            ..GlobalCatalog::default()
        };

        let context = build_spec_context(&specs, Some(&catalog));

        assert_eq!(context["dimensions"]["PVC"]["maxWidthMm"], json!(2500));
        assert!(context["dimensions"].get("WOOD").is_none());
        assert_eq!(context["drive"]["defaultMotor"], json!("SOMFY-10"));
        assert_eq!(context["materials"][0]["availableColors"], json!(["RAL9016"]));
        assert_eq!(context["materials"][0]["densityKgPerM3"], json!(2700));
        assert_eq!(context["colors"].as_array().map(Vec::len), Some(2));
        assert_eq!(context["guideRails"], json!([]));
    }

    #[test]
    fn decimals_render_as_numbers() {
        assert_eq!(number(Decimal::new(185, 3)), json!(0.185));
        assert_eq!(number(Decimal::new(12, 0)), json!(12));
    }
}
