use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use bespoke_core::domain::bom::BomLine;
use bespoke_core::domain::catalog::{GlobalCatalog, Part, SkuMapping};
use bespoke_core::domain::configuration::{Configuration, ConfigurationId};
use bespoke_core::domain::history::HistoryEntry;
use bespoke_core::domain::product::{ProductOption, ProductParameter, ProductSpec, ProductTypeProfile};

use super::{
    BomRepository, ConfigurationFilter, ConfigurationPage, ConfigurationRepository,
    ProductRepository, ReferenceCatalogRepository, RepositoryError, SkuMappingRepository,
    SortDirection,
};
use crate::fixtures::CatalogSeed;

struct StoredConfiguration {
    configuration: Configuration,
    sequence: u64,
    history: Vec<HistoryEntry>,
    bom_lines: Vec<BomLine>,
}

#[derive(Default)]
struct StoreState {
    next_sequence: u64,
    rows: HashMap<String, StoredConfiguration>,
}

/// Configuration, history and BOM storage behind a single lock so the
/// conditional-write semantics match the SQL repositories.
#[derive(Default)]
pub struct InMemoryConfigurationStore {
    state: RwLock<StoreState>,
}

#[async_trait::async_trait]
impl ConfigurationRepository for InMemoryConfigurationStore {
    async fn find_by_id(
        &self,
        id: &ConfigurationId,
    ) -> Result<Option<Configuration>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.rows.get(&id.0).map(|stored| stored.configuration.clone()))
    }

    async fn list(
        &self,
        filter: &ConfigurationFilter,
    ) -> Result<ConfigurationPage, RepositoryError> {
        let state = self.state.read().await;
        let mut matching: Vec<&StoredConfiguration> =
            state.rows.values().filter(|stored| filter.matches(&stored.configuration)).collect();

        matching.sort_by(|left, right| {
            let ordering = left
                .configuration
                .created_at
                .cmp(&right.configuration.created_at)
                .then(left.sequence.cmp(&right.sequence));
            match filter.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });

        let total_count = matching.len() as i64;
        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(filter.page_size as usize)
            .map(|stored| stored.configuration.clone())
            .collect();

        Ok(ConfigurationPage { items, total_count })
    }

    async fn insert(
        &self,
        configuration: &Configuration,
        entry: &HistoryEntry,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if state.rows.contains_key(&configuration.id.0) {
            return Err(RepositoryError::Decode(format!(
                "configuration `{}` already exists",
                configuration.id
            )));
        }

        state.next_sequence += 1;
        let sequence = state.next_sequence;
        state.rows.insert(
            configuration.id.0.clone(),
            StoredConfiguration {
                configuration: configuration.clone(),
                sequence,
                history: vec![entry.clone()],
                bom_lines: Vec::new(),
            },
        );
        Ok(())
    }

    async fn apply_update(
        &self,
        configuration: &Configuration,
        expected_version: i64,
        entry: Option<&HistoryEntry>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let stored = state.rows.get_mut(&configuration.id.0).ok_or_else(|| {
            RepositoryError::NotFound { entity: "configuration", id: configuration.id.0.clone() }
        })?;

        if stored.configuration.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                id: configuration.id.0.clone(),
                expected: expected_version,
                actual: stored.configuration.version,
            });
        }

        let current = &mut stored.configuration;
        current.reference = configuration.reference.clone();
        current.status = configuration.status;
        current.selections = configuration.selections.clone();
        current.version = configuration.version;
        current.validation = configuration.validation.clone();
        current.updated_at = configuration.updated_at;

        if let Some(entry) = entry {
            stored.history.push(entry.clone());
        }
        Ok(())
    }

    async fn delete(&self, id: &ConfigurationId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let deletable = state
            .rows
            .get(&id.0)
            .is_some_and(|stored| !stored.configuration.status.is_terminal());
        if deletable {
            state.rows.remove(&id.0);
        }
        Ok(deletable)
    }

    async fn history(&self, id: &ConfigurationId) -> Result<Vec<HistoryEntry>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.rows.get(&id.0).map(|stored| stored.history.clone()).unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl BomRepository for InMemoryConfigurationStore {
    async fn replace_lines(
        &self,
        id: &ConfigurationId,
        lines: &[BomLine],
        snapshot: &Value,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let stored = state.rows.get_mut(&id.0).ok_or_else(|| RepositoryError::NotFound {
            entity: "configuration",
            id: id.0.clone(),
        })?;

        stored.bom_lines = lines.to_vec();
        stored.configuration.bom_snapshot = Some(snapshot.clone());
        stored.configuration.updated_at = updated_at;
        Ok(())
    }

    async fn lines_for(&self, id: &ConfigurationId) -> Result<Vec<BomLine>, RepositoryError> {
        let state = self.state.read().await;
        let mut lines =
            state.rows.get(&id.0).map(|stored| stored.bom_lines.clone()).unwrap_or_default();
        lines.sort_by_key(|line| line.sort_order);
        Ok(lines)
    }
}

/// Read-only catalog backed by a [`CatalogSeed`]. Counts reference catalog
/// reads so cache behaviour can be asserted.
pub struct InMemoryCatalog {
    seed: RwLock<CatalogSeed>,
    catalog_reads: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn from_seed(seed: CatalogSeed) -> Self {
        Self { seed: RwLock::new(seed), catalog_reads: AtomicUsize::new(0) }
    }

    pub fn demo() -> Self {
        Self::from_seed(CatalogSeed::demo())
    }

    pub fn catalog_reads(&self) -> usize {
        self.catalog_reads.load(Ordering::SeqCst)
    }

    pub async fn replace_global_catalog(&self, catalog: GlobalCatalog) {
        self.seed.write().await.catalog = catalog;
    }

    pub async fn replace_parts(&self, parts: Vec<Part>) {
        self.seed.write().await.parts = parts;
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryCatalog {
    async fn find_product_type(
        &self,
        code: &str,
    ) -> Result<Option<ProductTypeProfile>, RepositoryError> {
        let seed = self.seed.read().await;
        Ok(profile(&seed, code))
    }

    async fn list_product_types(&self) -> Result<Vec<ProductTypeProfile>, RepositoryError> {
        let seed = self.seed.read().await;
        let mut profiles: Vec<ProductTypeProfile> = seed
            .product_types
            .iter()
            .filter_map(|product_type| profile(&seed, &product_type.code))
            .filter(|profile| profile.product_type.active && profile.family.active)
            .collect();
        profiles.sort_by(|left, right| {
            (&left.product_type.family_code, left.product_type.display_order, &left.product_type.code)
                .cmp(&(
                    &right.product_type.family_code,
                    right.product_type.display_order,
                    &right.product_type.code,
                ))
        });
        Ok(profiles)
    }

    async fn parameters(
        &self,
        product_type_code: &str,
    ) -> Result<Vec<ProductParameter>, RepositoryError> {
        let seed = self.seed.read().await;
        let mut parameters: Vec<ProductParameter> = seed
            .parameters
            .iter()
            .filter(|parameter| parameter.product_type_code == product_type_code && parameter.active)
            .cloned()
            .collect();
        parameters.sort_by(|left, right| {
            (left.step_number, left.display_order, &left.code).cmp(&(
                right.step_number,
                right.display_order,
                &right.code,
            ))
        });
        Ok(parameters)
    }

    async fn options(
        &self,
        product_type_code: &str,
    ) -> Result<Vec<ProductOption>, RepositoryError> {
        let seed = self.seed.read().await;
        let mut options: Vec<ProductOption> = seed
            .options
            .iter()
            .filter(|option| option.product_type_code == product_type_code && option.active)
            .cloned()
            .collect();
        options.sort_by(|left, right| {
            (&left.parameter_code, left.display_order, &left.code).cmp(&(
                &right.parameter_code,
                right.display_order,
                &right.code,
            ))
        });
        Ok(options)
    }

    async fn specs(&self, product_type_code: &str) -> Result<Vec<ProductSpec>, RepositoryError> {
        let seed = self.seed.read().await;
        Ok(seed
            .specs
            .iter()
            .filter(|spec| spec.product_type_code == product_type_code && spec.active)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl ReferenceCatalogRepository for InMemoryCatalog {
    async fn global_catalog(&self) -> Result<GlobalCatalog, RepositoryError> {
        self.catalog_reads.fetch_add(1, Ordering::SeqCst);
        let seed = self.seed.read().await;
        Ok(seed.catalog.clone())
    }

    async fn parts_by_skus(&self, skus: &[String]) -> Result<Vec<Part>, RepositoryError> {
        let seed = self.seed.read().await;
        Ok(seed.parts.iter().filter(|part| skus.contains(&part.sku)).cloned().collect())
    }
}

#[async_trait::async_trait]
impl SkuMappingRepository for InMemoryCatalog {
    async fn active_mappings(
        &self,
        family_code: &str,
        category: &str,
    ) -> Result<Vec<SkuMapping>, RepositoryError> {
        let seed = self.seed.read().await;
        let mut mappings: Vec<SkuMapping> = seed
            .sku_mappings
            .iter()
            .filter(|mapping| {
                mapping.active && mapping.family_code == family_code && mapping.category == category
            })
            .cloned()
            .collect();
        mappings.sort_by(|left, right| right.priority.cmp(&left.priority));
        Ok(mappings)
    }
}

fn profile(seed: &CatalogSeed, code: &str) -> Option<ProductTypeProfile> {
    let product_type = seed.product_types.iter().find(|product_type| product_type.code == code)?;
    let family = seed.families.iter().find(|family| family.code == product_type.family_code)?;
    Some(ProductTypeProfile { product_type: product_type.clone(), family: family.clone() })
}
