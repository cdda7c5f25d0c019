use std::sync::Arc;

use bespoke_core::config::{AppConfig, ConfigError, LoadOptions};
use bespoke_core::errors::ApplicationError;
use bespoke_db::{connect_with_settings, migrations, DbPool};
use bespoke_engine::{ConfiguratorEngine, EngineStores, HttpRuleGateway};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: ConfiguratorEngine,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("rules engine client setup failed: {0}")]
    RulesEngine(#[source] ApplicationError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let gateway =
        HttpRuleGateway::from_config(&config.rules_engine).map_err(BootstrapError::RulesEngine)?;
    let engine = ConfiguratorEngine::new(
        EngineStores::sql(db_pool.clone()),
        Arc::new(gateway),
        &config.catalog_cache,
    );
    info!(
        event_name = "system.bootstrap.engine_ready",
        correlation_id = "bootstrap",
        rules_engine = %config.rules_engine.base_url,
        project_slug = %config.rules_engine.project_slug,
        catalog_ttl_secs = config.catalog_cache.ttl_secs,
        "configurator engine wired"
    );

    Ok(Application { config, db_pool, engine })
}

#[cfg(test)]
mod tests {
    use bespoke_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap, BootstrapError};

    #[tokio::test]
    async fn bootstrap_fails_fast_on_an_invalid_rules_engine_url() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                rules_engine_base_url: Some("ftp://rules.internal".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let error = result.err().expect("error");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("rules_engine.base_url"));
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_wires_the_engine() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('configuration', 'configuration_history', 'bom_line')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected configuration tables after bootstrap");
        assert_eq!(table_count, 3);

        let product_types =
            app.engine.configurations.product_types().await.expect("product types query");
        assert!(product_types.is_empty(), "a fresh database carries no catalog");

        app.db_pool.close().await;
    }
}
