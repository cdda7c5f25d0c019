use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use bespoke_core::cpq::sku::select_mapping;
use bespoke_db::repositories::{RepositoryError, SkuMappingRepository};

/// Maps abstract selection criteria to a purchasable part number.
pub struct SkuResolver {
    mappings: Arc<dyn SkuMappingRepository>,
}

impl SkuResolver {
    pub fn new(mappings: Arc<dyn SkuMappingRepository>) -> Self {
        Self { mappings }
    }

    /// Returns `None` when no active mapping for the family and category
    /// matches; that is an expected outcome, not an error.
    pub async fn resolve(
        &self,
        family_code: &str,
        category: &str,
        criteria: &Map<String, Value>,
    ) -> Result<Option<String>, RepositoryError> {
        let mappings = self.mappings.active_mappings(family_code, category).await?;
        let selected = select_mapping(&mappings, family_code, category, criteria);

        debug!(
            event_name = "sku.resolve.completed",
            family_code,
            category,
            candidates = mappings.len(),
            sku = selected.map(|mapping| mapping.sku.as_str()).unwrap_or("<none>"),
            "sku resolution finished"
        );

        Ok(selected.map(|mapping| mapping.sku.clone()))
    }
}
