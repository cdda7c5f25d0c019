use sqlx::{sqlite::SqliteRow, Row};

use bespoke_core::domain::product::{
    ProductFamily, ProductOption, ProductParameter, ProductSpec, ProductType, ProductTypeProfile,
};

use super::{parse_json, ProductRepository, RepositoryError};
use crate::DbPool;

const PROFILE_SELECT: &str = "SELECT t.code, t.family_code, t.name, t.variant, t.description,
        t.display_order, t.is_active,
        f.name AS family_name, f.description AS family_description, f.rule_prefix,
        f.is_active AS family_active
    FROM product_type t
    JOIN product_family f ON f.code = t.family_code";

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_product_type(
        &self,
        code: &str,
    ) -> Result<Option<ProductTypeProfile>, RepositoryError> {
        let row = sqlx::query(&format!("{PROFILE_SELECT} WHERE t.code = ?"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn list_product_types(&self) -> Result<Vec<ProductTypeProfile>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{PROFILE_SELECT}
             WHERE t.is_active = 1 AND f.is_active = 1
             ORDER BY t.family_code ASC, t.display_order ASC, t.code ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(profile_from_row).collect()
    }

    async fn parameters(
        &self,
        product_type_code: &str,
    ) -> Result<Vec<ProductParameter>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT product_type_code, code, name, data_type, unit, step_number, step_name,
                    display_order, is_required, is_active, default_value, depends_on_json,
                    metadata_json
             FROM product_parameter
             WHERE product_type_code = ? AND is_active = 1
             ORDER BY step_number ASC, display_order ASC, code ASC",
        )
        .bind(product_type_code)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parameter_from_row).collect()
    }

    async fn options(
        &self,
        product_type_code: &str,
    ) -> Result<Vec<ProductOption>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT product_type_code, parameter_code, code, display_name, display_order, is_active
             FROM product_option
             WHERE product_type_code = ? AND is_active = 1
             ORDER BY parameter_code ASC, display_order ASC, code ASC",
        )
        .bind(product_type_code)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(option_from_row).collect()
    }

    async fn specs(&self, product_type_code: &str) -> Result<Vec<ProductSpec>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT product_type_code, spec_group, spec_key, spec_value_json, is_active
             FROM product_spec
             WHERE product_type_code = ? AND is_active = 1
             ORDER BY spec_group ASC, spec_key ASC",
        )
        .bind(product_type_code)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(spec_from_row).collect()
    }
}

fn profile_from_row(row: &SqliteRow) -> Result<ProductTypeProfile, RepositoryError> {
    let family_code: String = row.try_get("family_code")?;

    Ok(ProductTypeProfile {
        product_type: ProductType {
            code: row.try_get("code")?,
            family_code: family_code.clone(),
            name: row.try_get("name")?,
            variant: row.try_get("variant")?,
            description: row.try_get("description")?,
            display_order: row.try_get("display_order")?,
            active: row.try_get("is_active")?,
        },
        family: ProductFamily {
            code: family_code,
            name: row.try_get("family_name")?,
            description: row.try_get("family_description")?,
            rule_prefix: row.try_get("rule_prefix")?,
            active: row.try_get("family_active")?,
        },
    })
}

fn option_from_row(row: &SqliteRow) -> Result<ProductOption, RepositoryError> {
    Ok(ProductOption {
        product_type_code: row.try_get("product_type_code")?,
        parameter_code: row.try_get("parameter_code")?,
        code: row.try_get("code")?,
        display_name: row.try_get("display_name")?,
        display_order: row.try_get("display_order")?,
        active: row.try_get("is_active")?,
    })
}

fn spec_from_row(row: &SqliteRow) -> Result<ProductSpec, RepositoryError> {
    Ok(ProductSpec {
        product_type_code: row.try_get("product_type_code")?,
        group: row.try_get("spec_group")?,
        key: row.try_get("spec_key")?,
        value: parse_json("spec_value_json", &row.try_get::<String, _>("spec_value_json")?)?,
        active: row.try_get("is_active")?,
    })
}

fn parameter_from_row(row: &SqliteRow) -> Result<ProductParameter, RepositoryError> {
    Ok(ProductParameter {
        product_type_code: row.try_get("product_type_code")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        data_type: row.try_get("data_type")?,
        unit: row.try_get("unit")?,
        step_number: row.try_get("step_number")?,
        step_name: row.try_get("step_name")?,
        display_order: row.try_get("display_order")?,
        required: row.try_get("is_required")?,
        active: row.try_get("is_active")?,
        default_value: row.try_get("default_value")?,
        depends_on: parse_json("depends_on_json", &row.try_get::<String, _>("depends_on_json")?)?,
        metadata: row
            .try_get::<Option<String>, _>("metadata_json")?
            .map(|raw| parse_json("metadata_json", &raw))
            .transpose()?,
    })
}
