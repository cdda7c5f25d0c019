use sqlx::{sqlite::SqliteRow, Row, Sqlite, Transaction};

use bespoke_core::domain::configuration::{Configuration, ConfigurationId, ConfigurationStatus};
use bespoke_core::domain::history::{HistoryAction, HistoryEntry};

use super::{
    format_timestamp, parse_json, parse_timestamp, to_json, ConfigurationFilter,
    ConfigurationPage, ConfigurationRepository, RepositoryError,
};
use crate::DbPool;

const CONFIGURATION_COLUMNS: &str = "id, product_type_code, family_code, reference, status,
    selections_json, version, validation_json, bom_snapshot_json, created_by, created_at,
    updated_at";

const FILTER_CLAUSE: &str = "(?1 IS NULL OR status = ?1)
    AND (?2 IS NULL OR product_type_code = ?2)
    AND (?3 IS NULL OR family_code = ?3)";

pub struct SqlConfigurationRepository {
    pool: DbPool,
}

impl SqlConfigurationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConfigurationRepository for SqlConfigurationRepository {
    async fn find_by_id(
        &self,
        id: &ConfigurationId,
    ) -> Result<Option<Configuration>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CONFIGURATION_COLUMNS} FROM configuration WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(configuration_from_row).transpose()
    }

    async fn list(
        &self,
        filter: &ConfigurationFilter,
    ) -> Result<ConfigurationPage, RepositoryError> {
        let status = filter.status.map(|status| status.as_str());
        let direction = filter.direction.as_sql();

        let rows = sqlx::query(&format!(
            "SELECT {CONFIGURATION_COLUMNS}
             FROM configuration
             WHERE {FILTER_CLAUSE}
             ORDER BY created_at {direction}, rowid {direction}
             LIMIT ?4 OFFSET ?5"
        ))
        .bind(status)
        .bind(filter.product_type_code.as_deref())
        .bind(filter.family_code.as_deref())
        .bind(i64::from(filter.page_size))
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await?;

        let total_count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(1) FROM configuration WHERE {FILTER_CLAUSE}"))
                .bind(status)
                .bind(filter.product_type_code.as_deref())
                .bind(filter.family_code.as_deref())
                .fetch_one(&self.pool)
                .await?;

        let items = rows.iter().map(configuration_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(ConfigurationPage { items, total_count })
    }

    async fn insert(
        &self,
        configuration: &Configuration,
        entry: &HistoryEntry,
    ) -> Result<(), RepositoryError> {
        let selections_json = to_json("selections_json", &configuration.selections)?;
        let validation_json = configuration
            .validation
            .as_ref()
            .map(|validation| to_json("validation_json", validation))
            .transpose()?;
        let bom_snapshot_json = configuration
            .bom_snapshot
            .as_ref()
            .map(|snapshot| to_json("bom_snapshot_json", snapshot))
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO configuration (id, product_type_code, family_code, reference, status,
                                        selections_json, version, validation_json,
                                        bom_snapshot_json, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&configuration.id.0)
        .bind(&configuration.product_type_code)
        .bind(&configuration.family_code)
        .bind(&configuration.reference)
        .bind(configuration.status.as_str())
        .bind(&selections_json)
        .bind(configuration.version)
        .bind(&validation_json)
        .bind(&bom_snapshot_json)
        .bind(&configuration.created_by)
        .bind(format_timestamp(&configuration.created_at))
        .bind(format_timestamp(&configuration.updated_at))
        .execute(&mut *tx)
        .await?;

        insert_history(&mut tx, entry).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn apply_update(
        &self,
        configuration: &Configuration,
        expected_version: i64,
        entry: Option<&HistoryEntry>,
    ) -> Result<(), RepositoryError> {
        let selections_json = to_json("selections_json", &configuration.selections)?;
        let validation_json = configuration
            .validation
            .as_ref()
            .map(|validation| to_json("validation_json", validation))
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE configuration
             SET reference = ?, status = ?, selections_json = ?, version = ?,
                 validation_json = ?, updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(&configuration.reference)
        .bind(configuration.status.as_str())
        .bind(&selections_json)
        .bind(configuration.version)
        .bind(&validation_json)
        .bind(format_timestamp(&configuration.updated_at))
        .bind(&configuration.id.0)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM configuration WHERE id = ?")
                    .bind(&configuration.id.0)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return Err(match actual {
                Some(actual) => RepositoryError::VersionConflict {
                    id: configuration.id.0.clone(),
                    expected: expected_version,
                    actual,
                },
                None => RepositoryError::NotFound {
                    entity: "configuration",
                    id: configuration.id.0.clone(),
                },
            });
        }

        if let Some(entry) = entry {
            insert_history(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: &ConfigurationId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM configuration WHERE id = ? AND status <> 'finalized'")
                .bind(&id.0)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn history(&self, id: &ConfigurationId) -> Result<Vec<HistoryEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT configuration_id, action, selections_json, validation_json,
                    changed_fields_json, performed_by, performed_at
             FROM configuration_history
             WHERE configuration_id = ?
             ORDER BY id ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(history_from_row).collect()
    }
}

async fn insert_history(
    tx: &mut Transaction<'_, Sqlite>,
    entry: &HistoryEntry,
) -> Result<(), RepositoryError> {
    let validation_json = entry
        .validation_snapshot
        .as_ref()
        .map(|validation| to_json("validation_json", validation))
        .transpose()?;

    sqlx::query(
        "INSERT INTO configuration_history (configuration_id, action, selections_json,
                                            validation_json, changed_fields_json,
                                            performed_by, performed_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.configuration_id.0)
    .bind(entry.action.as_str())
    .bind(to_json("selections_json", &entry.selections_snapshot)?)
    .bind(&validation_json)
    .bind(to_json("changed_fields_json", &entry.changed_fields)?)
    .bind(&entry.performed_by)
    .bind(format_timestamp(&entry.performed_at))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn configuration_from_row(row: &SqliteRow) -> Result<Configuration, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = status_raw.parse::<ConfigurationStatus>().map_err(|error| {
        RepositoryError::Decode(format!("unknown configuration status `{status_raw}`: {error}"))
    })?;

    let validation = row
        .try_get::<Option<String>, _>("validation_json")?
        .map(|raw| parse_json("validation_json", &raw))
        .transpose()?;
    let bom_snapshot = row
        .try_get::<Option<String>, _>("bom_snapshot_json")?
        .map(|raw| parse_json("bom_snapshot_json", &raw))
        .transpose()?;

    Ok(Configuration {
        id: ConfigurationId(row.try_get("id")?),
        product_type_code: row.try_get("product_type_code")?,
        family_code: row.try_get("family_code")?,
        reference: row.try_get("reference")?,
        status,
        selections: parse_json("selections_json", &row.try_get::<String, _>("selections_json")?)?,
        version: row.try_get("version")?,
        validation,
        bom_snapshot,
        created_by: row.try_get("created_by")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn history_from_row(row: &SqliteRow) -> Result<HistoryEntry, RepositoryError> {
    let action_raw = row.try_get::<String, _>("action")?;
    let action = HistoryAction::parse(&action_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown history action `{action_raw}`")))?;

    Ok(HistoryEntry {
        configuration_id: ConfigurationId(row.try_get("configuration_id")?),
        action,
        selections_snapshot: parse_json(
            "selections_json",
            &row.try_get::<String, _>("selections_json")?,
        )?,
        validation_snapshot: row
            .try_get::<Option<String>, _>("validation_json")?
            .map(|raw| parse_json("validation_json", &raw))
            .transpose()?,
        changed_fields: parse_json(
            "changed_fields_json",
            &row.try_get::<String, _>("changed_fields_json")?,
        )?,
        performed_by: row.try_get("performed_by")?,
        performed_at: parse_timestamp("performed_at", row.try_get("performed_at")?)?,
    })
}
