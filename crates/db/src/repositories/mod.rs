use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use bespoke_core::domain::bom::BomLine;
use bespoke_core::domain::catalog::{GlobalCatalog, Part, SkuMapping};
use bespoke_core::domain::configuration::{Configuration, ConfigurationId, ConfigurationStatus};
use bespoke_core::domain::history::HistoryEntry;
use bespoke_core::domain::product::{ProductOption, ProductParameter, ProductSpec, ProductTypeProfile};
use bespoke_core::errors::ApplicationError;

pub mod bom;
pub mod catalog;
pub mod configuration;
pub mod memory;
pub mod product;

pub use bom::SqlBomRepository;
pub use catalog::{SqlReferenceCatalogRepository, SqlSkuMappingRepository};
pub use configuration::SqlConfigurationRepository;
pub use memory::{InMemoryCatalog, InMemoryConfigurationStore};
pub use product::SqlProductRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("version conflict on configuration {id}: expected {expected}, found {actual}")]
    VersionConflict { id: String, expected: i64, actual: i64 },
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound { entity, id } => ApplicationError::NotFound { entity, id },
            RepositoryError::VersionConflict { id, expected, actual } => {
                ApplicationError::VersionConflict { id, expected, actual }
            }
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Ascending),
            "desc" | "descending" => Some(Self::Descending),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Listing filter; `page` is one-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigurationFilter {
    pub status: Option<ConfigurationStatus>,
    pub product_type_code: Option<String>,
    pub family_code: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub direction: SortDirection,
}

impl Default for ConfigurationFilter {
    fn default() -> Self {
        Self {
            status: None,
            product_type_code: None,
            family_code: None,
            page: 1,
            page_size: 20,
            direction: SortDirection::default(),
        }
    }
}

impl ConfigurationFilter {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(self.page_size)
    }

    pub fn matches(&self, configuration: &Configuration) -> bool {
        self.status.map_or(true, |status| configuration.status == status)
            && self
                .product_type_code
                .as_deref()
                .map_or(true, |code| configuration.product_type_code == code)
            && self.family_code.as_deref().map_or(true, |code| configuration.family_code == code)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConfigurationPage {
    pub items: Vec<Configuration>,
    pub total_count: i64,
}

#[async_trait]
pub trait ConfigurationRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &ConfigurationId,
    ) -> Result<Option<Configuration>, RepositoryError>;

    async fn list(&self, filter: &ConfigurationFilter)
        -> Result<ConfigurationPage, RepositoryError>;

    /// Inserts a new configuration together with its first history entry.
    async fn insert(
        &self,
        configuration: &Configuration,
        entry: &HistoryEntry,
    ) -> Result<(), RepositoryError>;

    /// Conditional write keyed on `expected_version`. Writes status, reference,
    /// selections, version, validation and `updated_at`; the BOM snapshot is
    /// owned by [`BomRepository::replace_lines`].
    async fn apply_update(
        &self,
        configuration: &Configuration,
        expected_version: i64,
        entry: Option<&HistoryEntry>,
    ) -> Result<(), RepositoryError>;

    /// Removes a non-finalized configuration. Returns false when no row was
    /// deleted.
    async fn delete(&self, id: &ConfigurationId) -> Result<bool, RepositoryError>;

    async fn history(&self, id: &ConfigurationId) -> Result<Vec<HistoryEntry>, RepositoryError>;
}

#[async_trait]
pub trait BomRepository: Send + Sync {
    /// Replaces every BOM line and the cached snapshot in one unit of work.
    async fn replace_lines(
        &self,
        id: &ConfigurationId,
        lines: &[BomLine],
        snapshot: &Value,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn lines_for(&self, id: &ConfigurationId) -> Result<Vec<BomLine>, RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_product_type(
        &self,
        code: &str,
    ) -> Result<Option<ProductTypeProfile>, RepositoryError>;

    async fn list_product_types(&self) -> Result<Vec<ProductTypeProfile>, RepositoryError>;

    /// Active parameters ordered by wizard step, then display order.
    async fn parameters(&self, product_type_code: &str)
        -> Result<Vec<ProductParameter>, RepositoryError>;

    async fn options(&self, product_type_code: &str) -> Result<Vec<ProductOption>, RepositoryError>;

    async fn specs(&self, product_type_code: &str) -> Result<Vec<ProductSpec>, RepositoryError>;
}

#[async_trait]
pub trait ReferenceCatalogRepository: Send + Sync {
    async fn global_catalog(&self) -> Result<GlobalCatalog, RepositoryError>;

    async fn parts_by_skus(&self, skus: &[String]) -> Result<Vec<Part>, RepositoryError>;
}

#[async_trait]
pub trait SkuMappingRepository: Send + Sync {
    /// Active mappings for a family and category, highest priority first.
    async fn active_mappings(
        &self,
        family_code: &str,
        category: &str,
    ) -> Result<Vec<SkuMapping>, RepositoryError>;
}

pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value.trim()).map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_optional_decimal(
    column: &str,
    value: Option<String>,
) -> Result<Option<Decimal>, RepositoryError> {
    value.map(|raw| parse_decimal(column, &raw)).transpose()
}

pub(crate) fn parse_json<T: DeserializeOwned>(column: &str, value: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(value)
        .map_err(|error| RepositoryError::Decode(format!("invalid json in `{column}`: {error}")))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(column: &str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|error| RepositoryError::Decode(format!("cannot encode `{column}`: {error}")))
}

#[cfg(test)]
mod tests {
    use bespoke_core::domain::configuration::{Configuration, ConfigurationStatus};
    use bespoke_core::errors::ApplicationError;
    use chrono::Utc;

    use super::{parse_decimal, parse_timestamp, ConfigurationFilter, RepositoryError, SortDirection};

    #[test]
    fn filter_defaults_to_first_page_newest_first() {
        let filter = ConfigurationFilter::default();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, 20);
        assert_eq!(filter.direction, SortDirection::Descending);
        assert_eq!(filter.offset(), 0);

        let third = ConfigurationFilter { page: 3, page_size: 25, ..ConfigurationFilter::default() };
        assert_eq!(third.offset(), 50);
    }

    #[test]
    fn filter_matches_on_every_provided_criterion() {
        let configuration = Configuration::new_draft("RS-STD", "RS", None, None, Utc::now());
        let filter = ConfigurationFilter {
            status: Some(ConfigurationStatus::Draft),
            family_code: Some("RS".to_owned()),
            ..ConfigurationFilter::default()
        };
        assert!(filter.matches(&configuration));

        let other_type = ConfigurationFilter {
            product_type_code: Some("RS-MINI".to_owned()),
            ..ConfigurationFilter::default()
        };
        assert!(!other_type.matches(&configuration));
    }

    #[test]
    fn sort_direction_parses_short_and_long_forms() {
        assert_eq!(SortDirection::parse("ASC"), Some(SortDirection::Ascending));
        assert_eq!(SortDirection::parse("descending"), Some(SortDirection::Descending));
        assert_eq!(SortDirection::parse("sideways"), None);
    }

    #[test]
    fn repository_errors_map_to_application_errors() {
        let conflict = ApplicationError::from(RepositoryError::VersionConflict {
            id: "cfg-1".to_owned(),
            expected: 2,
            actual: 3,
        });
        assert!(matches!(conflict, ApplicationError::VersionConflict { expected: 2, actual: 3, .. }));

        let decode = ApplicationError::from(RepositoryError::Decode("bad row".to_owned()));
        assert!(matches!(decode, ApplicationError::Persistence(message) if message.contains("bad row")));
    }

    #[test]
    fn malformed_columns_are_decode_errors() {
        assert!(matches!(
            parse_timestamp("created_at", "yesterday".to_owned()),
            Err(RepositoryError::Decode(_))
        ));
        assert!(matches!(parse_decimal("weight_kg", "1,2"), Err(RepositoryError::Decode(_))));
        assert_eq!(parse_decimal("weight_kg", "0.185").expect("decimal").to_string(), "0.185");
    }
}
