//! Demo roller-shutter catalog used by `bespoke seed`, local development and
//! the repository tests.

use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::{Sqlite, Transaction};

use bespoke_core::domain::catalog::{
    Color, GlobalCatalog, GuideRail, Material, MaterialColor, Motor, Part, Profile, ShutterBox,
    SkuMapping,
};
use bespoke_core::domain::product::{
    ProductFamily, ProductOption, ProductParameter, ProductSpec, ProductType,
};

use crate::connection::DbPool;
use crate::repositories::{to_json, RepositoryError};

#[derive(Clone, Debug, PartialEq)]
pub struct CatalogSeed {
    pub families: Vec<ProductFamily>,
    pub product_types: Vec<ProductType>,
    pub parameters: Vec<ProductParameter>,
    pub options: Vec<ProductOption>,
    pub specs: Vec<ProductSpec>,
    pub catalog: GlobalCatalog,
    pub parts: Vec<Part>,
    pub sku_mappings: Vec<SkuMapping>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub families: usize,
    pub product_types: usize,
    pub parameters: usize,
    pub options: usize,
    pub specs: usize,
    pub reference_rows: usize,
    pub parts: usize,
    pub sku_mappings: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

impl CatalogSeed {
    /// Single roller-shutter family with a standard and a mini variant.
    pub fn demo() -> Self {
        let family = ProductFamily {
            code: "RS".to_owned(),
            name: "Roller shutters".to_owned(),
            description: Some("External roller shutters made to measure".to_owned()),
            rule_prefix: "roller-shutter".to_owned(),
            active: true,
        };

        let product_types = vec![
            product_type("RS-STD", "Roller shutter standard", "standard", 1),
            product_type("RS-MINI", "Roller shutter mini", "mini", 2),
        ];

        let mut parameters = Vec::new();
        let mut options = Vec::new();
        for product_type in &product_types {
            parameters.extend(wizard_parameters(&product_type.code));
            options.extend(wizard_options(&product_type.code));
        }

        let specs = vec![
            spec("RS-STD", "dimensions", "ALU", json!({"maxWidthMm": 3500, "maxHeightMm": 3000})),
            spec("RS-STD", "dimensions", "PVC", json!({"maxWidthMm": 2500, "maxHeightMm": 2500})),
            spec("RS-STD", "drive", "motorRequiredAboveM2", json!(6)),
            spec("RS-MINI", "dimensions", "ALU", json!({"maxWidthMm": 2000, "maxHeightMm": 2000})),
        ];

        Self {
            families: vec![family],
            product_types,
            parameters,
            options,
            specs,
            catalog: demo_global_catalog(),
            parts: demo_parts(),
            sku_mappings: demo_sku_mappings(),
        }
    }

    pub fn reference_row_count(&self) -> usize {
        let catalog = &self.catalog;
        catalog.materials.len()
            + catalog.material_colors.len()
            + catalog.colors.len()
            + catalog.profiles.len()
            + catalog.motors.len()
            + catalog.guide_rails.len()
            + catalog.boxes.len()
    }

    /// Loads the seed in one transaction. Keyed rows that already exist are
    /// left untouched; SKU mappings of the seeded families are replaced.
    pub async fn load(&self, pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        for family in &self.families {
            sqlx::query(
                "INSERT INTO product_family (code, name, description, rule_prefix, is_active)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(code) DO NOTHING",
            )
            .bind(&family.code)
            .bind(&family.name)
            .bind(&family.description)
            .bind(&family.rule_prefix)
            .bind(family.active)
            .execute(&mut *tx)
            .await?;
        }

        for product_type in &self.product_types {
            sqlx::query(
                "INSERT INTO product_type (code, family_code, name, variant, description,
                                           display_order, is_active)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(code) DO NOTHING",
            )
            .bind(&product_type.code)
            .bind(&product_type.family_code)
            .bind(&product_type.name)
            .bind(&product_type.variant)
            .bind(&product_type.description)
            .bind(product_type.display_order)
            .bind(product_type.active)
            .execute(&mut *tx)
            .await?;
        }

        for parameter in &self.parameters {
            let metadata_json =
                parameter.metadata.as_ref().map(|value| to_json("metadata_json", value)).transpose()?;
            sqlx::query(
                "INSERT INTO product_parameter (product_type_code, code, name, data_type, unit,
                                                step_number, step_name, display_order,
                                                is_required, is_active, default_value,
                                                depends_on_json, metadata_json)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(product_type_code, code) DO NOTHING",
            )
            .bind(&parameter.product_type_code)
            .bind(&parameter.code)
            .bind(&parameter.name)
            .bind(&parameter.data_type)
            .bind(&parameter.unit)
            .bind(parameter.step_number)
            .bind(&parameter.step_name)
            .bind(parameter.display_order)
            .bind(parameter.required)
            .bind(parameter.active)
            .bind(&parameter.default_value)
            .bind(to_json("depends_on_json", &parameter.depends_on)?)
            .bind(&metadata_json)
            .execute(&mut *tx)
            .await?;
        }

        for option in &self.options {
            sqlx::query(
                "INSERT INTO product_option (product_type_code, parameter_code, code, display_name,
                                             display_order, is_active)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(product_type_code, parameter_code, code) DO NOTHING",
            )
            .bind(&option.product_type_code)
            .bind(&option.parameter_code)
            .bind(&option.code)
            .bind(&option.display_name)
            .bind(option.display_order)
            .bind(option.active)
            .execute(&mut *tx)
            .await?;
        }

        for spec in &self.specs {
            sqlx::query(
                "INSERT INTO product_spec (product_type_code, spec_group, spec_key,
                                           spec_value_json, is_active)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(product_type_code, spec_group, spec_key) DO NOTHING",
            )
            .bind(&spec.product_type_code)
            .bind(&spec.group)
            .bind(&spec.key)
            .bind(to_json("spec_value_json", &spec.value)?)
            .bind(spec.active)
            .execute(&mut *tx)
            .await?;
        }

        insert_reference_catalog(&mut tx, &self.catalog).await?;

        for part in &self.parts {
            sqlx::query(
                "INSERT INTO part (sku, name, category, unit, is_cuttable, weight_kg, is_active)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(sku) DO NOTHING",
            )
            .bind(&part.sku)
            .bind(&part.name)
            .bind(&part.category)
            .bind(&part.unit)
            .bind(part.cuttable)
            .bind(part.weight_kg.map(|weight| weight.to_string()))
            .bind(part.active)
            .execute(&mut *tx)
            .await?;
        }

        for family in &self.families {
            sqlx::query("DELETE FROM sku_mapping WHERE family_code = ?")
                .bind(&family.code)
                .execute(&mut *tx)
                .await?;
        }
        for mapping in &self.sku_mappings {
            sqlx::query(
                "INSERT INTO sku_mapping (family_code, category, match_criteria_json, sku,
                                          priority, is_active)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&mapping.family_code)
            .bind(&mapping.category)
            .bind(to_json("match_criteria_json", &mapping.match_criteria)?)
            .bind(&mapping.sku)
            .bind(mapping.priority)
            .bind(mapping.active)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(SeedResult {
            families: self.families.len(),
            product_types: self.product_types.len(),
            parameters: self.parameters.len(),
            options: self.options.len(),
            specs: self.specs.len(),
            reference_rows: self.reference_row_count(),
            parts: self.parts.len(),
            sku_mappings: self.sku_mappings.len(),
        })
    }

    /// Checks that every seeded row is present.
    pub async fn verify(&self, pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let family_codes: Vec<String> = self.families.iter().map(|f| f.code.clone()).collect();
        checks.push((
            "product-families",
            count_in(pool, "product_family", "code", &family_codes).await?
                == self.families.len() as i64,
        ));

        let type_codes: Vec<String> = self.product_types.iter().map(|t| t.code.clone()).collect();
        checks.push((
            "product-types",
            count_in(pool, "product_type", "code", &type_codes).await?
                == self.product_types.len() as i64,
        ));
        checks.push((
            "product-parameters",
            count_in(pool, "product_parameter", "product_type_code", &type_codes).await?
                >= self.parameters.len() as i64,
        ));
        checks.push((
            "product-options",
            count_in(pool, "product_option", "product_type_code", &type_codes).await?
                >= self.options.len() as i64,
        ));
        checks.push((
            "product-specs",
            count_in(pool, "product_spec", "product_type_code", &type_codes).await?
                >= self.specs.len() as i64,
        ));

        let material_codes: Vec<String> =
            self.catalog.materials.iter().map(|m| m.code.clone()).collect();
        checks.push((
            "materials",
            count_in(pool, "material", "code", &material_codes).await?
                == self.catalog.materials.len() as i64,
        ));

        let skus: Vec<String> = self.parts.iter().map(|p| p.sku.clone()).collect();
        checks.push(("parts", count_in(pool, "part", "sku", &skus).await? == self.parts.len() as i64));
        checks.push((
            "sku-mappings",
            count_in(pool, "sku_mapping", "family_code", &family_codes).await?
                == self.sku_mappings.len() as i64,
        ));

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded catalog together with every configuration built on
    /// it.
    pub async fn clean(&self, pool: &DbPool) -> Result<(), RepositoryError> {
        let family_codes: Vec<String> = self.families.iter().map(|f| f.code.clone()).collect();
        let type_codes: Vec<String> = self.product_types.iter().map(|t| t.code.clone()).collect();
        let skus: Vec<String> = self.parts.iter().map(|p| p.sku.clone()).collect();
        let catalog = &self.catalog;
        let codes = |items: Vec<&String>| items.into_iter().cloned().collect::<Vec<_>>();

        let mut tx = pool.begin().await?;

        delete_in(&mut tx, "configuration", "product_type_code", &type_codes).await?;
        delete_in(&mut tx, "sku_mapping", "family_code", &family_codes).await?;
        delete_in(&mut tx, "product_spec", "product_type_code", &type_codes).await?;
        delete_in(&mut tx, "product_option", "product_type_code", &type_codes).await?;
        delete_in(&mut tx, "product_parameter", "product_type_code", &type_codes).await?;
        delete_in(&mut tx, "product_type", "code", &type_codes).await?;
        delete_in(&mut tx, "product_family", "code", &family_codes).await?;
        delete_in(&mut tx, "part", "sku", &skus).await?;
        delete_in(
            &mut tx,
            "material_color",
            "material_code",
            &codes(catalog.material_colors.iter().map(|row| &row.material_code).collect()),
        )
        .await?;
        delete_in(
            &mut tx,
            "guide_rail",
            "code",
            &codes(catalog.guide_rails.iter().map(|row| &row.code).collect()),
        )
        .await?;
        delete_in(
            &mut tx,
            "profile",
            "code",
            &codes(catalog.profiles.iter().map(|row| &row.code).collect()),
        )
        .await?;
        delete_in(
            &mut tx,
            "shutter_box",
            "code",
            &codes(catalog.boxes.iter().map(|row| &row.code).collect()),
        )
        .await?;
        delete_in(
            &mut tx,
            "motor",
            "code",
            &codes(catalog.motors.iter().map(|row| &row.code).collect()),
        )
        .await?;
        delete_in(
            &mut tx,
            "color",
            "code",
            &codes(catalog.colors.iter().map(|row| &row.code).collect()),
        )
        .await?;
        delete_in(
            &mut tx,
            "material",
            "code",
            &codes(catalog.materials.iter().map(|row| &row.code).collect()),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn insert_reference_catalog(
    tx: &mut Transaction<'_, Sqlite>,
    catalog: &GlobalCatalog,
) -> Result<(), RepositoryError> {
    for material in &catalog.materials {
        sqlx::query(
            "INSERT INTO material (code, name, density_kg_per_m3, is_active) VALUES (?, ?, ?, ?)
             ON CONFLICT(code) DO NOTHING",
        )
        .bind(&material.code)
        .bind(&material.name)
        .bind(material.density_kg_per_m3.map(|density| density.to_string()))
        .bind(material.active)
        .execute(&mut **tx)
        .await?;
    }

    for color in &catalog.colors {
        sqlx::query(
            "INSERT INTO color (code, name, color_system, hex_value, is_standard, is_active)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(code) DO NOTHING",
        )
        .bind(&color.code)
        .bind(&color.name)
        .bind(&color.color_system)
        .bind(&color.hex_value)
        .bind(color.standard)
        .bind(color.active)
        .execute(&mut **tx)
        .await?;
    }

    for pair in &catalog.material_colors {
        sqlx::query(
            "INSERT INTO material_color (material_code, color_code, is_active) VALUES (?, ?, ?)
             ON CONFLICT(material_code, color_code) DO NOTHING",
        )
        .bind(&pair.material_code)
        .bind(&pair.color_code)
        .bind(pair.active)
        .execute(&mut **tx)
        .await?;
    }

    for profile in &catalog.profiles {
        sqlx::query(
            "INSERT INTO profile (code, name, material_code, height_mm, thickness_mm,
                                  weight_per_meter_kg, max_width_mm, min_width_mm, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(code) DO NOTHING",
        )
        .bind(&profile.code)
        .bind(&profile.name)
        .bind(&profile.material_code)
        .bind(profile.height_mm.to_string())
        .bind(profile.thickness_mm.to_string())
        .bind(profile.weight_per_meter_kg.to_string())
        .bind(profile.max_width_mm)
        .bind(profile.min_width_mm)
        .bind(profile.active)
        .execute(&mut **tx)
        .await?;
    }

    for motor in &catalog.motors {
        sqlx::query(
            "INSERT INTO motor (code, brand, model, torque_nm, max_weight_kg, max_surface_m2,
                                control_types_json, tube_diameter_mm, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(code) DO NOTHING",
        )
        .bind(&motor.code)
        .bind(&motor.brand)
        .bind(&motor.model)
        .bind(motor.torque_nm.to_string())
        .bind(motor.max_weight_kg.map(|value| value.to_string()))
        .bind(motor.max_surface_m2.map(|value| value.to_string()))
        .bind(to_json("control_types_json", &motor.control_types)?)
        .bind(motor.tube_diameter_mm)
        .bind(motor.active)
        .execute(&mut **tx)
        .await?;
    }

    for rail in &catalog.guide_rails {
        sqlx::query(
            "INSERT INTO guide_rail (code, name, rail_type, material_code, width_mm, depth_mm,
                                     max_height_mm, weight_per_meter_kg, bracket_spacing_mm,
                                     compatible_profiles_json, wind_class, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(code) DO NOTHING",
        )
        .bind(&rail.code)
        .bind(&rail.name)
        .bind(&rail.rail_type)
        .bind(&rail.material_code)
        .bind(rail.width_mm.to_string())
        .bind(rail.depth_mm.to_string())
        .bind(rail.max_height_mm)
        .bind(rail.weight_per_meter_kg.to_string())
        .bind(rail.bracket_spacing_mm)
        .bind(to_json("compatible_profiles_json", &rail.compatible_profiles)?)
        .bind(rail.wind_class)
        .bind(rail.active)
        .execute(&mut **tx)
        .await?;
    }

    for shutter_box in &catalog.boxes {
        sqlx::query(
            "INSERT INTO shutter_box (code, name, box_type, inner_diameter_mm, outer_height_mm,
                                      compatible_materials_json, max_width_mm, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(code) DO NOTHING",
        )
        .bind(&shutter_box.code)
        .bind(&shutter_box.name)
        .bind(&shutter_box.box_type)
        .bind(shutter_box.inner_diameter_mm)
        .bind(shutter_box.outer_height_mm)
        .bind(to_json("compatible_materials_json", &shutter_box.compatible_materials)?)
        .bind(shutter_box.max_width_mm)
        .bind(shutter_box.active)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

async fn count_in(
    pool: &DbPool,
    table: &str,
    column: &str,
    values: &[String],
) -> Result<i64, RepositoryError> {
    if values.is_empty() {
        return Ok(0);
    }
    let sql = format!("SELECT COUNT(1) FROM {table} WHERE {column} IN ({})", placeholders(values.len()));
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for value in values {
        query = query.bind(value);
    }
    Ok(query.fetch_one(pool).await?)
}

async fn delete_in(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    column: &str,
    values: &[String],
) -> Result<(), RepositoryError> {
    if values.is_empty() {
        return Ok(());
    }
    let sql = format!("DELETE FROM {table} WHERE {column} IN ({})", placeholders(values.len()));
    let mut query = sqlx::query(&sql);
    for value in values {
        query = query.bind(value);
    }
    query.execute(&mut **tx).await?;
    Ok(())
}

fn product_type(code: &str, name: &str, variant: &str, display_order: i32) -> ProductType {
    ProductType {
        code: code.to_owned(),
        family_code: "RS".to_owned(),
        name: name.to_owned(),
        variant: variant.to_owned(),
        description: None,
        display_order,
        active: true,
    }
}

#[allow(clippy::too_many_arguments)]
fn parameter(
    product_type_code: &str,
    code: &str,
    name: &str,
    data_type: &str,
    unit: Option<&str>,
    (step_number, step_name): (i32, &str),
    display_order: i32,
    required: bool,
    metadata: Option<Value>,
) -> ProductParameter {
    ProductParameter {
        product_type_code: product_type_code.to_owned(),
        code: code.to_owned(),
        name: name.to_owned(),
        data_type: data_type.to_owned(),
        unit: unit.map(str::to_owned),
        step_number,
        step_name: Some(step_name.to_owned()),
        display_order,
        required,
        active: true,
        default_value: None,
        depends_on: Vec::new(),
        metadata,
    }
}

fn wizard_parameters(product_type_code: &str) -> Vec<ProductParameter> {
    let dimensions = (1, "Dimensions");
    let finish = (2, "Material and colour");
    let drive = (3, "Drive");
    let extras = (4, "Accessories");

    let mut color = parameter(
        product_type_code,
        "color",
        "Colour",
        "select",
        None,
        finish,
        2,
        true,
        None,
    );
    color.depends_on = vec!["material".to_owned()];

    let mut motor_type = parameter(
        product_type_code,
        "motorType",
        "Motor type",
        "select",
        None,
        drive,
        2,
        false,
        Some(json!({"visibleWhen": "driveType == 'motor'"})),
    );
    motor_type.depends_on = vec!["driveType".to_owned()];

    let mut drive_type = parameter(
        product_type_code,
        "driveType",
        "Drive type",
        "select",
        None,
        drive,
        1,
        true,
        None,
    );
    drive_type.default_value = Some("manual".to_owned());

    vec![
        parameter(
            product_type_code,
            "widthMm",
            "Width",
            "integer",
            Some("mm"),
            dimensions,
            1,
            true,
            Some(json!({"min": 400, "max": 3500})),
        ),
        parameter(
            product_type_code,
            "heightMm",
            "Height",
            "integer",
            Some("mm"),
            dimensions,
            2,
            true,
            Some(json!({"min": 400, "max": 3000})),
        ),
        parameter(product_type_code, "material", "Material", "select", None, finish, 1, true, None),
        color,
        drive_type,
        motor_type,
        parameter(
            product_type_code,
            "insectScreen",
            "Insect screen",
            "boolean",
            None,
            extras,
            1,
            false,
            None,
        ),
        parameter(
            product_type_code,
            "installationNotes",
            "Installation notes",
            "text",
            None,
            extras,
            2,
            false,
            None,
        ),
    ]
}

fn wizard_options(product_type_code: &str) -> Vec<ProductOption> {
    let option = |parameter_code: &str, code: &str, display_name: &str, order: i32, active: bool| {
        ProductOption {
            product_type_code: product_type_code.to_owned(),
            parameter_code: parameter_code.to_owned(),
            code: code.to_owned(),
            display_name: display_name.to_owned(),
            display_order: order,
            active,
        }
    };

    vec![
        option("material", "ALU", "Aluminium", 1, true),
        option("material", "PVC", "PVC", 2, true),
        option("material", "WOOD", "Wood (discontinued)", 3, false),
        option("color", "RAL9016", "Traffic white", 1, true),
        option("color", "RAL7016", "Anthracite grey", 2, true),
        option("color", "RAL8019", "Grey brown", 3, true),
        option("driveType", "manual", "Manual crank", 1, true),
        option("driveType", "motor", "Electric motor", 2, true),
        option("motorType", "SOMFY-RS100", "Somfy RS100 io", 1, true),
        option("motorType", "SOMFY-ILMO", "Somfy Ilmo 2 WT", 2, true),
    ]
}

fn spec(product_type_code: &str, group: &str, key: &str, value: Value) -> ProductSpec {
    ProductSpec {
        product_type_code: product_type_code.to_owned(),
        group: group.to_owned(),
        key: key.to_owned(),
        value,
        active: true,
    }
}

fn demo_global_catalog() -> GlobalCatalog {
    let color = |code: &str, name: &str, hex: &str| Color {
        code: code.to_owned(),
        name: name.to_owned(),
        color_system: "RAL".to_owned(),
        hex_value: Some(hex.to_owned()),
        standard: true,
        active: true,
    };
    let pair = |material_code: &str, color_code: &str| MaterialColor {
        material_code: material_code.to_owned(),
        color_code: color_code.to_owned(),
        active: true,
    };

    GlobalCatalog {
        materials: vec![
            Material {
                code: "ALU".to_owned(),
                name: "Aluminium".to_owned(),
                density_kg_per_m3: Some(Decimal::new(2700, 0)),
                active: true,
            },
            Material {
                code: "PVC".to_owned(),
                name: "PVC".to_owned(),
                density_kg_per_m3: Some(Decimal::new(1400, 0)),
                active: true,
            },
        ],
        material_colors: vec![
            pair("ALU", "RAL7016"),
            pair("ALU", "RAL8019"),
            pair("ALU", "RAL9016"),
            pair("PVC", "RAL9016"),
        ],
        colors: vec![
            color("RAL7016", "Anthracite grey", "#383E42"),
            color("RAL8019", "Grey brown", "#403A3A"),
            color("RAL9016", "Traffic white", "#F1F0EA"),
        ],
        profiles: vec![
            Profile {
                code: "ALU-39".to_owned(),
                name: "Aluminium slat 39".to_owned(),
                material_code: "ALU".to_owned(),
                height_mm: Decimal::new(39, 0),
                thickness_mm: Decimal::new(9, 0),
                weight_per_meter_kg: Decimal::new(185, 3),
                max_width_mm: 3500,
                min_width_mm: 400,
                active: true,
            },
            Profile {
                code: "PVC-37".to_owned(),
                name: "PVC slat 37".to_owned(),
                material_code: "PVC".to_owned(),
                height_mm: Decimal::new(37, 0),
                thickness_mm: Decimal::new(8, 0),
                weight_per_meter_kg: Decimal::new(140, 3),
                max_width_mm: 2500,
                min_width_mm: 400,
                active: true,
            },
        ],
        motors: vec![
            Motor {
                code: "SOMFY-ILMO".to_owned(),
                brand: "Somfy".to_owned(),
                model: "Ilmo 2 WT".to_owned(),
                torque_nm: Decimal::new(10, 0),
                max_weight_kg: Some(Decimal::new(20, 0)),
                max_surface_m2: Some(Decimal::new(4, 0)),
                control_types: vec!["switch".to_owned()],
                tube_diameter_mm: Some(40),
                active: true,
            },
            Motor {
                code: "SOMFY-RS100".to_owned(),
                brand: "Somfy".to_owned(),
                model: "RS100 io".to_owned(),
                torque_nm: Decimal::new(15, 0),
                max_weight_kg: Some(Decimal::new(30, 0)),
                max_surface_m2: Some(Decimal::new(8, 0)),
                control_types: vec!["switch".to_owned(), "radio".to_owned()],
                tube_diameter_mm: Some(50),
                active: true,
            },
        ],
        guide_rails: vec![GuideRail {
            code: "RAIL-53".to_owned(),
            name: "Guide rail 53".to_owned(),
            rail_type: "standard".to_owned(),
            material_code: "ALU".to_owned(),
            width_mm: Decimal::new(53, 0),
            depth_mm: Decimal::new(22, 0),
            max_height_mm: 3000,
            weight_per_meter_kg: Decimal::new(42, 2),
            bracket_spacing_mm: 600,
            compatible_profiles: vec!["ALU-39".to_owned(), "PVC-37".to_owned()],
            wind_class: Some(3),
            active: true,
        }],
        boxes: vec![
            ShutterBox {
                code: "BOX-165".to_owned(),
                name: "Box 165".to_owned(),
                box_type: "surface".to_owned(),
                inner_diameter_mm: 150,
                outer_height_mm: 165,
                compatible_materials: vec!["ALU".to_owned(), "PVC".to_owned()],
                max_width_mm: Some(2500),
                active: true,
            },
            ShutterBox {
                code: "BOX-205".to_owned(),
                name: "Box 205".to_owned(),
                box_type: "surface".to_owned(),
                inner_diameter_mm: 190,
                outer_height_mm: 205,
                compatible_materials: vec!["ALU".to_owned()],
                max_width_mm: Some(3500),
                active: true,
            },
        ],
    }
}

fn demo_parts() -> Vec<Part> {
    let part = |sku: &str, name: &str, category: &str, unit: &str, cuttable: bool, weight: Decimal| {
        Part {
            sku: sku.to_owned(),
            name: name.to_owned(),
            category: category.to_owned(),
            unit: unit.to_owned(),
            cuttable,
            weight_kg: Some(weight),
            active: true,
        }
    };

    vec![
        part("RS-SLAT-ALU", "Aluminium slat 39mm", "slat", "pcs", true, Decimal::new(185, 3)),
        part("RS-SLAT-PVC", "PVC slat 37mm", "slat", "pcs", true, Decimal::new(140, 3)),
        part("RS-RAIL-53", "Guide rail 53mm", "rail", "pcs", true, Decimal::new(42, 2)),
        part("RS-BRACKET", "Mounting bracket", "bracket", "pcs", false, Decimal::new(12, 1)),
        part("RS-BOX-165", "Shutter box 165", "box", "pcs", true, Decimal::new(25, 1)),
        part("RS-BOX-205", "Shutter box 205", "box", "pcs", true, Decimal::new(31, 1)),
        part("RS-MOTOR-RS100", "Somfy RS100 io motor", "motor", "pcs", false, Decimal::new(19, 1)),
        part("RS-MOTOR-ILMO", "Somfy Ilmo 2 WT motor", "motor", "pcs", false, Decimal::new(16, 1)),
        part("RS-CRANK", "Crank handle set", "drive", "set", false, Decimal::new(8, 1)),
        Part {
            sku: "RS-ENDCAP".to_owned(),
            name: "Slat end cap".to_owned(),
            category: "accessory".to_owned(),
            unit: "pcs".to_owned(),
            cuttable: false,
            weight_kg: None,
            active: true,
        },
    ]
}

fn demo_sku_mappings() -> Vec<SkuMapping> {
    let mapping = |category: &str, criteria: Value, sku: &str, priority: i32| SkuMapping {
        family_code: "RS".to_owned(),
        category: category.to_owned(),
        match_criteria: criteria,
        sku: sku.to_owned(),
        priority,
        active: true,
    };

    vec![
        mapping("slat", json!({"material": "ALU"}), "RS-SLAT-ALU", 10),
        mapping("slat", json!({"material": "PVC"}), "RS-SLAT-PVC", 10),
        mapping("slat", json!({"material": "*"}), "RS-SLAT-ALU", 0),
        mapping("rail", json!({"heightMm": {"min": 400, "max": 3000}}), "RS-RAIL-53", 5),
        mapping("box", json!({"widthMm": {"min": 400, "max": 2500}}), "RS-BOX-165", 10),
        mapping("box", json!({"widthMm": "*"}), "RS-BOX-205", 0),
        mapping("motor", json!({"motorType": "SOMFY-RS100"}), "RS-MOTOR-RS100", 10),
        mapping("motor", json!({"motorType": "SOMFY-ILMO"}), "RS-MOTOR-ILMO", 10),
        mapping("drive", json!({"driveType": "manual"}), "RS-CRANK", 5),
        mapping("bracket", json!({"component": "*"}), "RS-BRACKET", 0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    async fn migrated_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    #[test]
    fn demo_seed_is_internally_consistent() {
        let seed = CatalogSeed::demo();
        let type_codes: Vec<&str> =
            seed.product_types.iter().map(|product_type| product_type.code.as_str()).collect();

        assert!(seed
            .parameters
            .iter()
            .all(|parameter| type_codes.contains(&parameter.product_type_code.as_str())));
        assert!(seed.sku_mappings.iter().all(|mapping| seed
            .parts
            .iter()
            .any(|part| part.sku == mapping.sku)));

        let mut profile_codes: Vec<&str> =
            seed.catalog.profiles.iter().map(|profile| profile.code.as_str()).collect();
        let listed = profile_codes.clone();
        profile_codes.sort_unstable();
        assert_eq!(profile_codes, listed, "profiles are listed in code order");
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = migrated_pool().await;
        let seed = CatalogSeed::demo();

        let first = seed.load(&pool).await.expect("load seed");
        let first_verification = seed.verify(&pool).await.expect("verify seed");
        assert!(first_verification.all_present, "{:?}", first_verification.checks);
        assert_eq!(first.product_types, 2);

        let second = seed.load(&pool).await.expect("reload seed");
        let second_verification = seed.verify(&pool).await.expect("re-verify seed");
        assert!(second_verification.all_present);
        assert_eq!(first, second);
        assert_eq!(first_verification.checks, second_verification.checks);
    }

    #[tokio::test]
    async fn clean_removes_seeded_rows() {
        let pool = migrated_pool().await;
        let seed = CatalogSeed::demo();
        seed.load(&pool).await.expect("load seed");

        seed.clean(&pool).await.expect("clean seed");

        let verification = seed.verify(&pool).await.expect("verify after clean");
        assert!(!verification.all_present);
        let families: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM product_family")
            .fetch_one(&pool)
            .await
            .expect("count families");
        assert_eq!(families, 0);
    }
}
