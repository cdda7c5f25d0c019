use sqlx::{sqlite::SqliteRow, Row};

use bespoke_core::domain::catalog::{
    Color, GlobalCatalog, GuideRail, Material, MaterialColor, Motor, Part, Profile, ShutterBox,
    SkuMapping,
};

use super::{
    parse_decimal, parse_json, parse_optional_decimal, ReferenceCatalogRepository,
    RepositoryError, SkuMappingRepository,
};
use crate::DbPool;

pub struct SqlReferenceCatalogRepository {
    pool: DbPool,
}

impl SqlReferenceCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReferenceCatalogRepository for SqlReferenceCatalogRepository {
    async fn global_catalog(&self) -> Result<GlobalCatalog, RepositoryError> {
        let materials = sqlx::query(
            "SELECT code, name, density_kg_per_m3, is_active FROM material
             WHERE is_active = 1 ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(material_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let material_colors = sqlx::query(
            "SELECT material_code, color_code, is_active FROM material_color
             WHERE is_active = 1 ORDER BY material_code, color_code",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(material_color_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let colors = sqlx::query(
            "SELECT code, name, color_system, hex_value, is_standard, is_active FROM color
             WHERE is_active = 1 ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(color_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let profiles = sqlx::query(
            "SELECT code, name, material_code, height_mm, thickness_mm, weight_per_meter_kg,
                    max_width_mm, min_width_mm, is_active
             FROM profile WHERE is_active = 1 ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(profile_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let motors = sqlx::query(
            "SELECT code, brand, model, torque_nm, max_weight_kg, max_surface_m2,
                    control_types_json, tube_diameter_mm, is_active
             FROM motor WHERE is_active = 1 ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(motor_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let guide_rails = sqlx::query(
            "SELECT code, name, rail_type, material_code, width_mm, depth_mm, max_height_mm,
                    weight_per_meter_kg, bracket_spacing_mm, compatible_profiles_json,
                    wind_class, is_active
             FROM guide_rail WHERE is_active = 1 ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(guide_rail_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let boxes = sqlx::query(
            "SELECT code, name, box_type, inner_diameter_mm, outer_height_mm,
                    compatible_materials_json, max_width_mm, is_active
             FROM shutter_box WHERE is_active = 1 ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(box_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(GlobalCatalog {
            materials,
            material_colors,
            colors,
            profiles,
            motors,
            guide_rails,
            boxes,
        })
    }

    async fn parts_by_skus(&self, skus: &[String]) -> Result<Vec<Part>, RepositoryError> {
        if skus.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; skus.len()].join(", ");
        let sql = format!(
            "SELECT sku, name, category, unit, is_cuttable, weight_kg, is_active
             FROM part WHERE sku IN ({placeholders}) ORDER BY sku"
        );
        let mut query = sqlx::query(&sql);
        for sku in skus {
            query = query.bind(sku);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(part_from_row).collect()
    }
}

pub struct SqlSkuMappingRepository {
    pool: DbPool,
}

impl SqlSkuMappingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SkuMappingRepository for SqlSkuMappingRepository {
    async fn active_mappings(
        &self,
        family_code: &str,
        category: &str,
    ) -> Result<Vec<SkuMapping>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT family_code, category, match_criteria_json, sku, priority, is_active
             FROM sku_mapping
             WHERE family_code = ? AND category = ? AND is_active = 1
             ORDER BY priority DESC, id ASC",
        )
        .bind(family_code)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(sku_mapping_from_row).collect()
    }
}

fn material_from_row(row: &SqliteRow) -> Result<Material, RepositoryError> {
    Ok(Material {
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        density_kg_per_m3: parse_optional_decimal(
            "density_kg_per_m3",
            row.try_get("density_kg_per_m3")?,
        )?,
        active: row.try_get("is_active")?,
    })
}

fn material_color_from_row(row: &SqliteRow) -> Result<MaterialColor, RepositoryError> {
    Ok(MaterialColor {
        material_code: row.try_get("material_code")?,
        color_code: row.try_get("color_code")?,
        active: row.try_get("is_active")?,
    })
}

fn color_from_row(row: &SqliteRow) -> Result<Color, RepositoryError> {
    Ok(Color {
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        color_system: row.try_get("color_system")?,
        hex_value: row.try_get("hex_value")?,
        standard: row.try_get("is_standard")?,
        active: row.try_get("is_active")?,
    })
}

fn profile_from_row(row: &SqliteRow) -> Result<Profile, RepositoryError> {
    Ok(Profile {
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        material_code: row.try_get("material_code")?,
        height_mm: parse_decimal("height_mm", &row.try_get::<String, _>("height_mm")?)?,
        thickness_mm: parse_decimal("thickness_mm", &row.try_get::<String, _>("thickness_mm")?)?,
        weight_per_meter_kg: parse_decimal(
            "weight_per_meter_kg",
            &row.try_get::<String, _>("weight_per_meter_kg")?,
        )?,
        max_width_mm: row.try_get("max_width_mm")?,
        min_width_mm: row.try_get("min_width_mm")?,
        active: row.try_get("is_active")?,
    })
}

fn motor_from_row(row: &SqliteRow) -> Result<Motor, RepositoryError> {
    Ok(Motor {
        code: row.try_get("code")?,
        brand: row.try_get("brand")?,
        model: row.try_get("model")?,
        torque_nm: parse_decimal("torque_nm", &row.try_get::<String, _>("torque_nm")?)?,
        max_weight_kg: parse_optional_decimal("max_weight_kg", row.try_get("max_weight_kg")?)?,
        max_surface_m2: parse_optional_decimal("max_surface_m2", row.try_get("max_surface_m2")?)?,
        control_types: parse_json(
            "control_types_json",
            &row.try_get::<String, _>("control_types_json")?,
        )?,
        tube_diameter_mm: row.try_get("tube_diameter_mm")?,
        active: row.try_get("is_active")?,
    })
}

fn guide_rail_from_row(row: &SqliteRow) -> Result<GuideRail, RepositoryError> {
    Ok(GuideRail {
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        rail_type: row.try_get("rail_type")?,
        material_code: row.try_get("material_code")?,
        width_mm: parse_decimal("width_mm", &row.try_get::<String, _>("width_mm")?)?,
        depth_mm: parse_decimal("depth_mm", &row.try_get::<String, _>("depth_mm")?)?,
        max_height_mm: row.try_get("max_height_mm")?,
        weight_per_meter_kg: parse_decimal(
            "weight_per_meter_kg",
            &row.try_get::<String, _>("weight_per_meter_kg")?,
        )?,
        bracket_spacing_mm: row.try_get("bracket_spacing_mm")?,
        compatible_profiles: parse_json(
            "compatible_profiles_json",
            &row.try_get::<String, _>("compatible_profiles_json")?,
        )?,
        wind_class: row.try_get("wind_class")?,
        active: row.try_get("is_active")?,
    })
}

fn box_from_row(row: &SqliteRow) -> Result<ShutterBox, RepositoryError> {
    Ok(ShutterBox {
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        box_type: row.try_get("box_type")?,
        inner_diameter_mm: row.try_get("inner_diameter_mm")?,
        outer_height_mm: row.try_get("outer_height_mm")?,
        compatible_materials: parse_json(
            "compatible_materials_json",
            &row.try_get::<String, _>("compatible_materials_json")?,
        )?,
        max_width_mm: row.try_get("max_width_mm")?,
        active: row.try_get("is_active")?,
    })
}

fn part_from_row(row: &SqliteRow) -> Result<Part, RepositoryError> {
    Ok(Part {
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        unit: row.try_get("unit")?,
        cuttable: row.try_get("is_cuttable")?,
        weight_kg: parse_optional_decimal("weight_kg", row.try_get("weight_kg")?)?,
        active: row.try_get("is_active")?,
    })
}

fn sku_mapping_from_row(row: &SqliteRow) -> Result<SkuMapping, RepositoryError> {
    Ok(SkuMapping {
        family_code: row.try_get("family_code")?,
        category: row.try_get("category")?,
        match_criteria: parse_json(
            "match_criteria_json",
            &row.try_get::<String, _>("match_criteria_json")?,
        )?,
        sku: row.try_get("sku")?,
        priority: row.try_get("priority")?,
        active: row.try_get("is_active")?,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use std::str::FromStr;

    use super::{SqlReferenceCatalogRepository, SqlSkuMappingRepository};
    use crate::fixtures::CatalogSeed;
    use crate::repositories::{ReferenceCatalogRepository, SkuMappingRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        CatalogSeed::demo().load(&pool).await.expect("seed");
        pool
    }

    #[tokio::test]
    async fn global_catalog_reads_every_reference_table() {
        let repo = SqlReferenceCatalogRepository::new(seeded_pool().await);

        let catalog = repo.global_catalog().await.expect("catalog");
        let seed = CatalogSeed::demo().catalog;
        assert_eq!(catalog.materials.len(), seed.materials.len());
        assert_eq!(catalog.material_colors.len(), seed.material_colors.len());
        assert_eq!(catalog.profiles, seed.profiles);
        assert_eq!(catalog.motors.len(), seed.motors.len());
        assert_eq!(catalog.guide_rails.len(), seed.guide_rails.len());
        assert_eq!(catalog.boxes.len(), seed.boxes.len());
    }

    #[tokio::test]
    async fn parts_are_looked_up_by_sku_with_decimal_weights() {
        let repo = SqlReferenceCatalogRepository::new(seeded_pool().await);

        let parts = repo
            .parts_by_skus(&["RS-SLAT-ALU".to_owned(), "UNKNOWN".to_owned()])
            .await
            .expect("parts");
        assert_eq!(parts.len(), 1);
        assert!(parts[0].cuttable);
        assert_eq!(parts[0].weight_kg, Some(Decimal::from_str("0.185").expect("decimal")));

        assert!(repo.parts_by_skus(&[]).await.expect("empty lookup").is_empty());
    }

    #[tokio::test]
    async fn mappings_come_back_highest_priority_first() {
        let repo = SqlSkuMappingRepository::new(seeded_pool().await);

        let mappings = repo.active_mappings("RS", "slat").await.expect("mappings");
        assert!(mappings.len() >= 2);
        assert!(mappings.windows(2).all(|pair| pair[0].priority >= pair[1].priority));
        assert!(mappings.iter().all(|mapping| mapping.active));

        assert!(repo.active_mappings("RS", "no-such-category").await.expect("empty").is_empty());
    }
}
