use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row};

use bespoke_core::domain::bom::BomLine;
use bespoke_core::domain::configuration::ConfigurationId;

use super::{format_timestamp, parse_decimal, to_json, BomRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBomRepository {
    pool: DbPool,
}

impl SqlBomRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BomRepository for SqlBomRepository {
    async fn replace_lines(
        &self,
        id: &ConfigurationId,
        lines: &[BomLine],
        snapshot: &Value,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let snapshot_json = to_json("bom_snapshot_json", snapshot)?;
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query(
            "UPDATE configuration SET bom_snapshot_json = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&snapshot_json)
        .bind(format_timestamp(&updated_at))
        .bind(&id.0)
        .execute(&mut *tx)
        .await?;

        if touched.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::NotFound { entity: "configuration", id: id.0.clone() });
        }

        sqlx::query("DELETE FROM bom_line WHERE configuration_id = ?")
            .bind(&id.0)
            .execute(&mut *tx)
            .await?;

        for line in lines {
            sqlx::query(
                "INSERT INTO bom_line (configuration_id, part_sku, part_name, category, quantity,
                                       unit, cut_length_mm, sort_order, notes)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&id.0)
            .bind(&line.part_sku)
            .bind(&line.part_name)
            .bind(&line.category)
            .bind(line.quantity.to_string())
            .bind(&line.unit)
            .bind(line.cut_length_mm)
            .bind(line.sort_order)
            .bind(&line.notes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn lines_for(&self, id: &ConfigurationId) -> Result<Vec<BomLine>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT part_sku, part_name, category, quantity, unit, cut_length_mm, sort_order, notes
             FROM bom_line
             WHERE configuration_id = ?
             ORDER BY sort_order ASC, id ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bom_line_from_row).collect()
    }
}

fn bom_line_from_row(row: &SqliteRow) -> Result<BomLine, RepositoryError> {
    Ok(BomLine {
        part_sku: row.try_get("part_sku")?,
        part_name: row.try_get("part_name")?,
        category: row.try_get("category")?,
        quantity: parse_decimal("quantity", &row.try_get::<String, _>("quantity")?)?,
        unit: row.try_get("unit")?,
        cut_length_mm: row.try_get("cut_length_mm")?,
        sort_order: row.try_get("sort_order")?,
        notes: row.try_get("notes")?,
    })
}
