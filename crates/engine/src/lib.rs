//! Orchestration services of the configurator: the configuration aggregate,
//! BOM generation, SKU resolution, the cached spec context and the HTTP seam
//! to the decision engine.

pub mod bom;
pub mod configuration;
pub mod gateway;
pub mod sku;
pub mod spec_context;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

use std::sync::Arc;
use std::time::Duration;

use bespoke_core::config::CatalogCacheConfig;
use bespoke_core::cpq::constraints::{DeterministicSelectionValidator, SelectionValidator};
use bespoke_core::rules::RuleEvaluationGateway;
use bespoke_db::repositories::{
    BomRepository, ConfigurationRepository, InMemoryCatalog, InMemoryConfigurationStore,
    ProductRepository, ReferenceCatalogRepository, SkuMappingRepository, SqlBomRepository,
    SqlConfigurationRepository, SqlProductRepository, SqlReferenceCatalogRepository,
    SqlSkuMappingRepository,
};
use bespoke_db::DbPool;

pub use bom::BomGenerator;
pub use configuration::{
    ConfigurationListPage, ConfigurationService, ConfigurationView, CreateConfiguration,
    ParameterView, ProductParametersView, StepView, UpdateConfiguration, UpdateOutcome,
};
pub use gateway::HttpRuleGateway;
pub use sku::SkuResolver;
pub use spec_context::SpecContextProvider;

/// Repository handles shared by every engine service.
#[derive(Clone)]
pub struct EngineStores {
    pub configurations: Arc<dyn ConfigurationRepository>,
    pub boms: Arc<dyn BomRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub reference: Arc<dyn ReferenceCatalogRepository>,
    pub sku_mappings: Arc<dyn SkuMappingRepository>,
}

impl EngineStores {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            configurations: Arc::new(SqlConfigurationRepository::new(pool.clone())),
            boms: Arc::new(SqlBomRepository::new(pool.clone())),
            products: Arc::new(SqlProductRepository::new(pool.clone())),
            reference: Arc::new(SqlReferenceCatalogRepository::new(pool.clone())),
            sku_mappings: Arc::new(SqlSkuMappingRepository::new(pool)),
        }
    }

    pub fn in_memory(
        store: Arc<InMemoryConfigurationStore>,
        catalog: Arc<InMemoryCatalog>,
    ) -> Self {
        Self {
            configurations: store.clone(),
            boms: store,
            products: catalog.clone(),
            reference: catalog.clone(),
            sku_mappings: catalog,
        }
    }
}

/// Fully wired services over one set of stores and one gateway.
#[derive(Clone)]
pub struct ConfiguratorEngine {
    pub configurations: Arc<ConfigurationService>,
    pub boms: Arc<BomGenerator>,
    pub spec_context: Arc<SpecContextProvider>,
}

impl ConfiguratorEngine {
    pub fn new(
        stores: EngineStores,
        gateway: Arc<dyn RuleEvaluationGateway>,
        cache: &CatalogCacheConfig,
    ) -> Self {
        let validator: Arc<dyn SelectionValidator> = Arc::new(DeterministicSelectionValidator);
        Self::with_validator(stores, gateway, validator, Duration::from_secs(cache.ttl_secs))
    }

    pub fn with_validator(
        stores: EngineStores,
        gateway: Arc<dyn RuleEvaluationGateway>,
        validator: Arc<dyn SelectionValidator>,
        catalog_ttl: Duration,
    ) -> Self {
        let spec_context = Arc::new(SpecContextProvider::new(
            stores.products.clone(),
            stores.reference.clone(),
            catalog_ttl,
        ));
        let configurations = Arc::new(ConfigurationService::new(
            stores.configurations.clone(),
            stores.products.clone(),
            spec_context.clone(),
            gateway.clone(),
            validator,
        ));
        let boms = Arc::new(BomGenerator::new(
            stores.configurations,
            stores.boms,
            stores.products,
            stores.reference,
            spec_context.clone(),
            SkuResolver::new(stores.sku_mappings),
            gateway,
        ));

        Self { configurations, boms, spec_context }
    }
}
