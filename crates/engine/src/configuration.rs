//! Configuration aggregate operations.
//!
//! Every mutation reads the current row, does its work (including decision
//! engine round-trips) without holding a transaction, and then commits through
//! a conditional write keyed on the version it read. A lost race surfaces as
//! [`ApplicationError::VersionConflict`]; nothing retries internally.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use bespoke_core::cpq::constraints::{SelectionInput, SelectionValidator};
use bespoke_core::cpq::visibility::is_visible;
use bespoke_core::domain::configuration::{Configuration, ConfigurationId, ConfigurationStatus};
use bespoke_core::domain::history::{HistoryAction, HistoryEntry};
use bespoke_core::domain::product::{ProductOption, ProductParameter, ProductTypeProfile};
use bespoke_core::domain::selection::{apply_reset_fields, merge_patch, Selections};
use bespoke_core::domain::validation::ValidationResult;
use bespoke_core::errors::{ApplicationError, DomainError};
use bespoke_core::rules::{
    AvailableOption, DecisionKind, ProductTypeIdentity, RuleContext, RuleEvaluationGateway,
};
use bespoke_db::repositories::{
    ConfigurationFilter, ConfigurationRepository, ProductRepository,
};

use crate::spec_context::SpecContextProvider;

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConfiguration {
    pub product_type_code: String,
    pub reference: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfiguration {
    pub selections: Selections,
    pub expected_version: i64,
    #[serde(default)]
    pub performed_by: Option<String>,
}

/// Read model of a configuration as returned to callers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationView {
    pub id: ConfigurationId,
    pub product_type_code: String,
    pub family_code: String,
    pub reference: Option<String>,
    pub status: ConfigurationStatus,
    pub selections: Selections,
    pub version: i64,
    pub validation: Option<ValidationResult>,
    pub is_complete: bool,
    pub can_finalize: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Configuration> for ConfigurationView {
    fn from(configuration: &Configuration) -> Self {
        Self {
            id: configuration.id.clone(),
            product_type_code: configuration.product_type_code.clone(),
            family_code: configuration.family_code.clone(),
            reference: configuration.reference.clone(),
            status: configuration.status,
            selections: configuration.selections.clone(),
            version: configuration.version,
            validation: configuration.validation.clone(),
            is_complete: configuration.is_complete(),
            can_finalize: configuration.can_finalize(),
            created_by: configuration.created_by.clone(),
            created_at: configuration.created_at,
            updated_at: configuration.updated_at,
        }
    }
}

/// Result of a patch: the persisted configuration plus what the decision
/// engine said about it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    #[serde(flatten)]
    pub configuration: ConfigurationView,
    pub available_options: Option<BTreeMap<String, Vec<AvailableOption>>>,
    /// Reset fields actually removed from the selections.
    pub reset_fields: Vec<String>,
    pub changed_fields: Vec<String>,
    /// Advisory decisions that could not be obtained for this update.
    pub decisions_unavailable: Vec<DecisionKind>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationListPage {
    pub items: Vec<ConfigurationView>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterOptionView {
    pub code: String,
    pub display_name: String,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterView {
    pub code: String,
    pub name: String,
    pub data_type: String,
    pub unit: Option<String>,
    pub is_required: bool,
    pub default_value: Option<String>,
    pub depends_on: Vec<String>,
    pub metadata: Option<serde_json::Value>,
    pub visible: bool,
    pub options: Vec<ParameterOptionView>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub step_number: i32,
    pub step_name: Option<String>,
    pub parameters: Vec<ParameterView>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductParametersView {
    pub product_type_code: String,
    pub steps: Vec<StepView>,
}

pub struct ConfigurationService {
    configurations: Arc<dyn ConfigurationRepository>,
    products: Arc<dyn ProductRepository>,
    spec_context: Arc<SpecContextProvider>,
    gateway: Arc<dyn RuleEvaluationGateway>,
    validator: Arc<dyn SelectionValidator>,
}

impl ConfigurationService {
    pub fn new(
        configurations: Arc<dyn ConfigurationRepository>,
        products: Arc<dyn ProductRepository>,
        spec_context: Arc<SpecContextProvider>,
        gateway: Arc<dyn RuleEvaluationGateway>,
        validator: Arc<dyn SelectionValidator>,
    ) -> Self {
        Self { configurations, products, spec_context, gateway, validator }
    }

    pub async fn create(
        &self,
        request: CreateConfiguration,
    ) -> Result<ConfigurationView, ApplicationError> {
        let profile = self
            .products
            .find_product_type(&request.product_type_code)
            .await?
            .filter(|profile| profile.product_type.active && profile.family.active)
            .ok_or_else(|| ApplicationError::not_found("product type", &request.product_type_code))?;

        let now = Utc::now();
        let configuration = Configuration::new_draft(
            profile.product_type.code.clone(),
            profile.family.code.clone(),
            request.reference,
            request.created_by.clone(),
            now,
        );
        let entry = HistoryEntry::record(
            &configuration,
            HistoryAction::Created,
            Vec::new(),
            request.created_by,
            now,
        );
        self.configurations.insert(&configuration, &entry).await?;

        info!(
            event_name = "configuration.created",
            configuration_id = %configuration.id,
            product_type_code = %configuration.product_type_code,
            "configuration created"
        );
        Ok(ConfigurationView::from(&configuration))
    }

    pub async fn get(&self, id: &ConfigurationId) -> Result<ConfigurationView, ApplicationError> {
        let configuration = self.load(id).await?;
        Ok(ConfigurationView::from(&configuration))
    }

    pub async fn list(
        &self,
        filter: &ConfigurationFilter,
    ) -> Result<ConfigurationListPage, ApplicationError> {
        let mut problems = Vec::new();
        if filter.page < 1 {
            problems.push("page must be at least 1".to_owned());
        }
        if !(1..=MAX_PAGE_SIZE).contains(&filter.page_size) {
            problems.push(format!("pageSize must be between 1 and {MAX_PAGE_SIZE}"));
        }
        if !problems.is_empty() {
            return Err(ApplicationError::ValidationFailed(problems));
        }

        let page = self.configurations.list(filter).await?;
        Ok(ConfigurationListPage {
            items: page.items.iter().map(ConfigurationView::from).collect(),
            total_count: page.total_count,
            page: filter.page,
            page_size: filter.page_size,
        })
    }

    /// Applies a selection patch.
    ///
    /// `validate` and `options` are advisory: when either decision cannot be
    /// obtained the update still commits, the decision is recorded as `None`
    /// and listed in [`UpdateOutcome::decisions_unavailable`].
    pub async fn update(
        &self,
        id: &ConfigurationId,
        request: UpdateConfiguration,
    ) -> Result<UpdateOutcome, ApplicationError> {
        let current = self.load(id).await?;
        if current.version != request.expected_version {
            return Err(ApplicationError::VersionConflict {
                id: id.to_string(),
                expected: request.expected_version,
                actual: current.version,
            });
        }
        current.ensure_mutable("updated")?;

        let parameters = self.products.parameters(&current.product_type_code).await?;
        let options = self.products.options(&current.product_type_code).await?;
        let checked = self.validator.validate(&SelectionInput {
            parameters: &parameters,
            options: &options,
            patch: &request.selections,
        });
        if !checked.valid {
            warn!(
                event_name = "configuration.update.rejected",
                configuration_id = %id,
                violations = checked.violations.len(),
                "selection patch failed structural validation"
            );
            return Err(ApplicationError::ValidationFailed(checked.messages()));
        }

        let merged = merge_patch(&current.selections, &request.selections);
        let profile = self.profile(&current).await?;
        let context = self.rule_context(&profile, merged.selections.clone()).await?;

        let mut decisions_unavailable = Vec::new();
        let validation = match self
            .gateway
            .validate(&DecisionKind::Validate.path(profile.rule_prefix()), &context)
            .await
        {
            Ok(result) => Some(result),
            Err(error) => {
                warn!(
                    event_name = "configuration.update.validate_unavailable",
                    configuration_id = %id,
                    error = %error,
                    "validate decision failed, continuing without validation"
                );
                decisions_unavailable.push(DecisionKind::Validate);
                None
            }
        };
        let options_decision = match self
            .gateway
            .options(&DecisionKind::Options.path(profile.rule_prefix()), &context)
            .await
        {
            Ok(decision) => Some(decision),
            Err(error) => {
                warn!(
                    event_name = "configuration.update.options_unavailable",
                    configuration_id = %id,
                    error = %error,
                    "options decision failed, continuing without options"
                );
                decisions_unavailable.push(DecisionKind::Options);
                None
            }
        };

        let mut selections = merged.selections;
        let (available_options, reset_fields) = match options_decision {
            Some(decision) => {
                let applied = apply_reset_fields(&mut selections, &decision.reset_fields);
                (decision.available_options, applied)
            }
            None => (None, Vec::new()),
        };

        let now = Utc::now();
        let mut updated = current.clone();
        updated.selections = selections;
        updated.transition_to(ConfigurationStatus::from_validation(validation.as_ref()))?;
        updated.validation = validation;
        updated.version = current.version + 1;
        updated.updated_at = now;

        let entry = HistoryEntry::record(
            &updated,
            HistoryAction::Updated,
            merged.changed_fields.clone(),
            request.performed_by,
            now,
        );
        self.configurations.apply_update(&updated, current.version, Some(&entry)).await?;

        info!(
            event_name = "configuration.update.applied",
            configuration_id = %id,
            version = updated.version,
            status = %updated.status,
            changed_fields = merged.changed_fields.len(),
            reset_fields = reset_fields.len(),
            "configuration updated"
        );

        Ok(UpdateOutcome {
            configuration: ConfigurationView::from(&updated),
            available_options,
            reset_fields,
            changed_fields: merged.changed_fields,
            decisions_unavailable,
        })
    }

    /// Re-runs the `validate` decision and refreshes the cached result and
    /// status. Selections and version are left alone; a finalized
    /// configuration only gets the fresh result back.
    pub async fn validate(&self, id: &ConfigurationId) -> Result<ValidationResult, ApplicationError> {
        let current = self.load(id).await?;
        let profile = self.profile(&current).await?;
        let context = self.rule_context(&profile, current.selections.clone()).await?;

        let result = self
            .gateway
            .validate(&DecisionKind::Validate.path(profile.rule_prefix()), &context)
            .await?;

        if current.status.is_terminal() {
            return Ok(result);
        }

        let mut refreshed = current.clone();
        refreshed.transition_to(ConfigurationStatus::from_validation(Some(&result)))?;
        refreshed.validation = Some(result.clone());
        refreshed.updated_at = Utc::now();
        self.configurations.apply_update(&refreshed, current.version, None).await?;

        info!(
            event_name = "configuration.validated",
            configuration_id = %id,
            status = %refreshed.status,
            errors = result.errors.len(),
            "configuration validated"
        );
        Ok(result)
    }

    /// Re-validates and moves the configuration to `finalized`. A gateway
    /// failure propagates; outstanding errors reject without persisting.
    pub async fn finalize(
        &self,
        id: &ConfigurationId,
        performed_by: Option<String>,
    ) -> Result<ConfigurationView, ApplicationError> {
        let current = self.load(id).await?;
        let mut finalized = current.clone();
        finalized.transition_to(ConfigurationStatus::Finalized)?;

        let profile = self.profile(&current).await?;
        let context = self.rule_context(&profile, current.selections.clone()).await?;
        let result = self
            .gateway
            .validate(&DecisionKind::Validate.path(profile.rule_prefix()), &context)
            .await
            .map_err(|error| {
                warn!(
                    event_name = "configuration.finalize.validate_failed",
                    configuration_id = %id,
                    error = %error,
                    "validate decision failed during finalize"
                );
                error
            })?;

        if !result.is_clean() {
            return Err(DomainError::OutstandingErrors {
                id: id.to_string(),
                error_count: result.errors.len(),
            }
            .into());
        }

        let now = Utc::now();
        finalized.validation = Some(result);
        finalized.version = current.version + 1;
        finalized.updated_at = now;
        let entry =
            HistoryEntry::record(&finalized, HistoryAction::Finalized, Vec::new(), performed_by, now);
        self.configurations.apply_update(&finalized, current.version, Some(&entry)).await?;

        info!(
            event_name = "configuration.finalized",
            configuration_id = %id,
            version = finalized.version,
            "configuration finalized"
        );
        Ok(ConfigurationView::from(&finalized))
    }

    pub async fn delete(&self, id: &ConfigurationId) -> Result<(), ApplicationError> {
        let current = self.load(id).await?;
        current.ensure_mutable("deleted")?;

        if !self.configurations.delete(id).await? {
            // Finalized or removed between the read and the delete.
            let latest = self.load(id).await?;
            latest.ensure_mutable("deleted")?;
            return Err(ApplicationError::Persistence(format!(
                "configuration {id} could not be deleted"
            )));
        }

        info!(event_name = "configuration.deleted", configuration_id = %id, "configuration deleted");
        Ok(())
    }

    pub async fn clone_configuration(
        &self,
        id: &ConfigurationId,
        performed_by: Option<String>,
    ) -> Result<ConfigurationView, ApplicationError> {
        let source = self.load(id).await?;
        let now = Utc::now();
        let copy = source.clone_as_draft(now);
        let entry = HistoryEntry::record(
            &copy,
            HistoryAction::Cloned,
            vec!["clonedFrom".to_owned()],
            performed_by,
            now,
        );
        self.configurations.insert(&copy, &entry).await?;

        info!(
            event_name = "configuration.cloned",
            configuration_id = %copy.id,
            source_id = %id,
            "configuration cloned"
        );
        Ok(ConfigurationView::from(&copy))
    }

    pub async fn history(&self, id: &ConfigurationId) -> Result<Vec<HistoryEntry>, ApplicationError> {
        self.load(id).await?;
        Ok(self.configurations.history(id).await?)
    }

    pub async fn product_types(&self) -> Result<Vec<ProductTypeProfile>, ApplicationError> {
        Ok(self.products.list_product_types().await?)
    }

    /// Wizard view of a product type's parameters. Visibility is evaluated
    /// against `selections`.
    pub async fn product_parameters(
        &self,
        product_type_code: &str,
        selections: &Selections,
    ) -> Result<ProductParametersView, ApplicationError> {
        let profile = self
            .products
            .find_product_type(product_type_code)
            .await?
            .filter(|profile| profile.product_type.active)
            .ok_or_else(|| ApplicationError::not_found("product type", product_type_code))?;
        let parameters = self.products.parameters(&profile.product_type.code).await?;
        let options = self.products.options(&profile.product_type.code).await?;

        Ok(ProductParametersView {
            product_type_code: profile.product_type.code,
            steps: group_steps(&parameters, &options, selections),
        })
    }

    /// Wizard view for an existing configuration, evaluated against its
    /// current selections.
    pub async fn configuration_parameters(
        &self,
        id: &ConfigurationId,
    ) -> Result<ProductParametersView, ApplicationError> {
        let configuration = self.load(id).await?;
        self.product_parameters(&configuration.product_type_code, &configuration.selections).await
    }

    async fn load(&self, id: &ConfigurationId) -> Result<Configuration, ApplicationError> {
        self.configurations
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("configuration", id.to_string()))
    }

    async fn profile(
        &self,
        configuration: &Configuration,
    ) -> Result<ProductTypeProfile, ApplicationError> {
        self.products
            .find_product_type(&configuration.product_type_code)
            .await?
            .ok_or_else(|| {
                ApplicationError::not_found("product type", &configuration.product_type_code)
            })
    }

    async fn rule_context(
        &self,
        profile: &ProductTypeProfile,
        selections: Selections,
    ) -> Result<RuleContext, ApplicationError> {
        let specs = self.spec_context.spec_context(&profile.product_type.code).await?;
        Ok(RuleContext {
            user_selections: selections,
            specs,
            product_type: ProductTypeIdentity::from(profile),
        })
    }
}

/// Parameters arrive ordered by step then display order; consecutive rows of
/// the same step form one group.
fn group_steps(
    parameters: &[ProductParameter],
    options: &[ProductOption],
    selections: &Selections,
) -> Vec<StepView> {
    let mut steps: Vec<StepView> = Vec::new();
    for parameter in parameters.iter().filter(|parameter| parameter.active) {
        let view = ParameterView {
            code: parameter.code.clone(),
            name: parameter.name.clone(),
            data_type: parameter.data_type.clone(),
            unit: parameter.unit.clone(),
            is_required: parameter.required,
            default_value: parameter.default_value.clone(),
            depends_on: parameter.depends_on.clone(),
            metadata: parameter.metadata.clone(),
            visible: is_visible(parameter.visible_when(), selections),
            options: options
                .iter()
                .filter(|option| option.active && option.parameter_code == parameter.code)
                .map(|option| ParameterOptionView {
                    code: option.code.clone(),
                    display_name: option.display_name.clone(),
                    is_active: option.active,
                })
                .collect(),
        };

        match steps.last_mut() {
            Some(step) if step.step_number == parameter.step_number => step.parameters.push(view),
            _ => steps.push(StepView {
                step_number: parameter.step_number,
                step_name: parameter.step_name.clone(),
                parameters: vec![view],
            }),
        }
    }
    steps
}
