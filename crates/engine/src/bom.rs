//! BOM generation: decision-engine skeleton, SKU resolution, catalog
//! enrichment, weight and an all-or-nothing replace of the stored lines.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use bespoke_core::cpq::catalog::{sort_lines, PartCatalog};
use bespoke_core::domain::bom::{Bom, BomLine, UnresolvedLine};
use bespoke_core::domain::configuration::{Configuration, ConfigurationId, ConfigurationStatus};
use bespoke_core::domain::selection::selections_to_json;
use bespoke_core::errors::ApplicationError;
use bespoke_core::rules::{
    BomSkeletonLine, DecisionKind, ProductTypeIdentity, RuleContext, RuleEvaluationGateway,
};
use bespoke_db::repositories::{
    BomRepository, ConfigurationRepository, ProductRepository, ReferenceCatalogRepository,
};

use crate::sku::SkuResolver;
use crate::spec_context::SpecContextProvider;

pub struct BomGenerator {
    configurations: Arc<dyn ConfigurationRepository>,
    boms: Arc<dyn BomRepository>,
    products: Arc<dyn ProductRepository>,
    reference: Arc<dyn ReferenceCatalogRepository>,
    spec_context: Arc<SpecContextProvider>,
    sku_resolver: SkuResolver,
    gateway: Arc<dyn RuleEvaluationGateway>,
}

impl BomGenerator {
    pub fn new(
        configurations: Arc<dyn ConfigurationRepository>,
        boms: Arc<dyn BomRepository>,
        products: Arc<dyn ProductRepository>,
        reference: Arc<dyn ReferenceCatalogRepository>,
        spec_context: Arc<SpecContextProvider>,
        sku_resolver: SkuResolver,
        gateway: Arc<dyn RuleEvaluationGateway>,
    ) -> Self {
        Self { configurations, boms, products, reference, spec_context, sku_resolver, gateway }
    }

    /// Generates and stores a fresh BOM. A failed `bom` decision aborts before
    /// anything is written, so the previous lines stay in place.
    pub async fn generate(&self, id: &ConfigurationId) -> Result<Bom, ApplicationError> {
        let configuration = self.load(id).await?;
        if configuration.status == ConfigurationStatus::Draft {
            warn!(
                event_name = "bom.generate.draft",
                configuration_id = %id,
                "generating BOM for a draft configuration"
            );
        }

        let profile = self
            .products
            .find_product_type(&configuration.product_type_code)
            .await?
            .ok_or_else(|| {
                ApplicationError::not_found("product type", &configuration.product_type_code)
            })?;
        let specs = self.spec_context.spec_context(&profile.product_type.code).await?;
        let context = RuleContext {
            user_selections: configuration.selections.clone(),
            specs,
            product_type: ProductTypeIdentity::from(&profile),
        };

        let decision_path = DecisionKind::Bom.path(profile.rule_prefix());
        info!(
            event_name = "bom.generate.start",
            configuration_id = %id,
            decision_path = %decision_path,
            "generating BOM"
        );
        let decision = self.gateway.bom(&decision_path, &context).await.map_err(|failure| {
            error!(
                event_name = "bom.generate.gateway_failed",
                configuration_id = %id,
                error = %failure,
                "bom decision failed"
            );
            failure
        })?;

        let (resolved, unresolved) = self.resolve_skus(&configuration, &decision.lines).await?;

        let mut skus: Vec<String> = resolved.iter().map(|(_, sku)| sku.clone()).collect();
        skus.sort();
        skus.dedup();
        let catalog = PartCatalog::new(self.reference.parts_by_skus(&skus).await?);

        let mut lines: Vec<BomLine> =
            resolved.iter().map(|(line, sku)| catalog.enrich(line, sku)).collect();
        sort_lines(&mut lines);
        let total_weight_kg = catalog.total_weight(&lines);

        let generated_at = Utc::now();
        self.boms.replace_lines(id, &lines, &decision.payload, generated_at).await?;

        info!(
            event_name = "bom.generate.completed",
            configuration_id = %id,
            lines = lines.len(),
            unresolved = unresolved.len(),
            total_weight_kg = %total_weight_kg,
            "BOM generated"
        );

        Ok(Bom {
            configuration_id: id.clone(),
            lines,
            total_weight_kg,
            unresolved,
            generated_at: Some(generated_at),
        })
    }

    /// Stored lines of the last generation with their weight recomputed from
    /// the current part catalog.
    pub async fn current_bom(&self, id: &ConfigurationId) -> Result<Bom, ApplicationError> {
        self.load(id).await?;
        let lines = self.boms.lines_for(id).await?;

        let mut skus: Vec<String> = lines.iter().map(|line| line.part_sku.clone()).collect();
        skus.sort();
        skus.dedup();
        let catalog = PartCatalog::new(self.reference.parts_by_skus(&skus).await?);
        let total_weight_kg = catalog.total_weight(&lines);

        Ok(Bom {
            configuration_id: id.clone(),
            lines,
            total_weight_kg,
            unresolved: Vec::new(),
            generated_at: None,
        })
    }

    /// Lines with a concrete SKU pass through; the rest are looked up by
    /// category using the line's criteria, or the selections when it has
    /// none. Lines that cannot be resolved are reported, not persisted.
    async fn resolve_skus<'a>(
        &self,
        configuration: &Configuration,
        lines: &'a [BomSkeletonLine],
    ) -> Result<(Vec<(&'a BomSkeletonLine, String)>, Vec<UnresolvedLine>), ApplicationError> {
        let fallback_criteria = match selections_to_json(&configuration.selections) {
            Value::Object(criteria) => criteria,
            _ => Map::new(),
        };

        let mut resolved = Vec::with_capacity(lines.len());
        let mut unresolved = Vec::new();
        for line in lines {
            if let Some(sku) = &line.sku {
                resolved.push((line, sku.clone()));
                continue;
            }

            let Some(category) = line.category.as_deref() else {
                unresolved.push(unresolved_line(line, "line has neither a SKU nor a category"));
                continue;
            };
            let criteria =
                line.criteria.as_ref().and_then(Value::as_object).unwrap_or(&fallback_criteria);

            match self.sku_resolver.resolve(&configuration.family_code, category, criteria).await? {
                Some(sku) => resolved.push((line, sku)),
                None => {
                    warn!(
                        event_name = "bom.sku.unresolved",
                        configuration_id = %configuration.id,
                        family_code = %configuration.family_code,
                        category,
                        sort_order = line.sort_order,
                        "no SKU mapping matched"
                    );
                    unresolved.push(unresolved_line(line, "no SKU mapping matched"));
                }
            }
        }

        Ok((resolved, unresolved))
    }

    async fn load(&self, id: &ConfigurationId) -> Result<Configuration, ApplicationError> {
        self.configurations
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("configuration", id.to_string()))
    }
}

fn unresolved_line(line: &BomSkeletonLine, reason: &str) -> UnresolvedLine {
    UnresolvedLine {
        category: line.category.clone(),
        sort_order: line.sort_order,
        reason: reason.to_owned(),
    }
}
