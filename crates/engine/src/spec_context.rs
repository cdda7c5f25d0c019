//! Read-through cache for the `specs` section of a rule context.
//!
//! Product-type spec rows are read on every call; the global reference
//! catalog is shared by every product type and kept for a bounded time.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use bespoke_core::cpq::spec_context::build_spec_context;
use bespoke_core::domain::catalog::GlobalCatalog;
use bespoke_db::repositories::{ProductRepository, ReferenceCatalogRepository, RepositoryError};

struct CachedCatalog {
    catalog: Arc<GlobalCatalog>,
    loaded_at: Instant,
}

pub struct SpecContextProvider {
    products: Arc<dyn ProductRepository>,
    reference: Arc<dyn ReferenceCatalogRepository>,
    ttl: Duration,
    cached: RwLock<Option<CachedCatalog>>,
}

impl SpecContextProvider {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        reference: Arc<dyn ReferenceCatalogRepository>,
        ttl: Duration,
    ) -> Self {
        Self { products, reference, ttl, cached: RwLock::new(None) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Spec rows of the product type grouped by group and key, with the
    /// catalog sections merged in.
    pub async fn spec_context(&self, product_type_code: &str) -> Result<Value, RepositoryError> {
        let specs = self.products.specs(product_type_code).await?;
        let catalog = self.global_catalog().await?;
        Ok(build_spec_context(&specs, Some(catalog.as_ref())))
    }

    pub async fn global_catalog(&self) -> Result<Arc<GlobalCatalog>, RepositoryError> {
        if let Some(catalog) = self.fresh_entry().await {
            return Ok(catalog);
        }

        let mut cached = self.cached.write().await;
        // Another caller may have refilled the entry while we waited for the lock.
        if let Some(entry) = cached.as_ref() {
            if entry.loaded_at.elapsed() < self.ttl {
                return Ok(entry.catalog.clone());
            }
        }

        let catalog = Arc::new(self.reference.global_catalog().await?);
        debug!(
            event_name = "spec_context.catalog.loaded",
            materials = catalog.materials.len(),
            motors = catalog.motors.len(),
            ttl_secs = self.ttl.as_secs(),
            "global reference catalog loaded"
        );
        *cached = Some(CachedCatalog { catalog: catalog.clone(), loaded_at: Instant::now() });
        Ok(catalog)
    }

    /// Drops the cached catalog so the next read goes to the store. Called
    /// after reference data is reseeded.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        if cached.take().is_some() {
            debug!(event_name = "spec_context.catalog.invalidated", "global catalog cache cleared");
        }
    }

    async fn fresh_entry(&self) -> Option<Arc<GlobalCatalog>> {
        let cached = self.cached.read().await;
        cached
            .as_ref()
            .filter(|entry| entry.loaded_at.elapsed() < self.ttl)
            .map(|entry| entry.catalog.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bespoke_core::domain::catalog::GlobalCatalog;
    use bespoke_db::repositories::InMemoryCatalog;

    use super::SpecContextProvider;

    fn provider(catalog: &Arc<InMemoryCatalog>, ttl: Duration) -> SpecContextProvider {
        SpecContextProvider::new(catalog.clone(), catalog.clone(), ttl)
    }

    #[tokio::test]
    async fn context_groups_specs_and_includes_catalog_sections() {
        let catalog = Arc::new(InMemoryCatalog::demo());
        let provider = provider(&catalog, Duration::from_secs(300));

        let context = provider.spec_context("RS-STD").await.expect("spec context");

        assert!(context["dimensions"].get("ALU").is_some());
        assert!(context["dimensions"].get("PVC").is_some());
        assert!(context["materials"].as_array().is_some_and(|materials| !materials.is_empty()));
        assert!(context["motors"].as_array().is_some_and(|motors| motors.len() == 2));
    }

    #[tokio::test(start_paused = true)]
    async fn catalog_is_reused_until_the_ttl_expires() {
        let catalog = Arc::new(InMemoryCatalog::demo());
        let provider = provider(&catalog, Duration::from_secs(300));

        provider.spec_context("RS-STD").await.expect("first read");
        provider.spec_context("RS-MINI").await.expect("second read");
        assert_eq!(catalog.catalog_reads(), 1);

        tokio::time::advance(Duration::from_secs(299)).await;
        provider.spec_context("RS-STD").await.expect("still cached");
        assert_eq!(catalog.catalog_reads(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        provider.spec_context("RS-STD").await.expect("expired");
        assert_eq!(catalog.catalog_reads(), 2);
    }

    #[tokio::test]
    async fn invalidation_forces_a_reload() {
        let catalog = Arc::new(InMemoryCatalog::demo());
        let provider = provider(&catalog, Duration::from_secs(300));

        let before = provider.spec_context("RS-STD").await.expect("cached read");
        assert!(before["materials"].as_array().is_some_and(|materials| !materials.is_empty()));

        catalog.replace_global_catalog(GlobalCatalog::default()).await;
        let stale = provider.spec_context("RS-STD").await.expect("stale read");
        assert_eq!(stale["materials"], before["materials"]);

        provider.invalidate().await;
        let fresh = provider.spec_context("RS-STD").await.expect("fresh read");
        assert_eq!(fresh["materials"], serde_json::json!([]));
        assert_eq!(catalog.catalog_reads(), 2);
    }

    #[tokio::test]
    async fn zero_ttl_reads_through_every_time() {
        let catalog = Arc::new(InMemoryCatalog::demo());
        let provider = provider(&catalog, Duration::ZERO);

        provider.global_catalog().await.expect("first");
        provider.global_catalog().await.expect("second");
        assert_eq!(catalog.catalog_reads(), 2);
    }
}
