//! In-process decision engine double and an in-memory engine harness, used by
//! the engine's own tests and by the server's handler tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use bespoke_core::cpq::constraints::DeterministicSelectionValidator;
use bespoke_core::domain::validation::ValidationResult;
use bespoke_core::rules::payload::parse_bom;
use bespoke_core::rules::{
    BomDecision, DecisionKind, GatewayError, OptionsDecision, RuleContext, RuleEvaluationGateway,
};
use bespoke_db::repositories::{InMemoryCatalog, InMemoryConfigurationStore};

use crate::{ConfiguratorEngine, EngineStores};

type Scripted<T> = Option<Result<T, GatewayError>>;

#[derive(Default)]
struct Script {
    validate: Scripted<ValidationResult>,
    options: Scripted<OptionsDecision>,
    bom: Scripted<BomDecision>,
    calls: Vec<(DecisionKind, String, RuleContext)>,
}

/// Gateway answering from a script. Unscripted decisions answer with a clean
/// validation, no options and an empty BOM. Every call yields once so
/// concurrent callers interleave.
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<Script>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_validation(&self, result: ValidationResult) {
        self.script().validate = Some(Ok(result));
    }

    pub fn set_options(&self, decision: OptionsDecision) {
        self.script().options = Some(Ok(decision));
    }

    /// Scripts the `bom` decision from a raw document, decoded the same way
    /// the HTTP gateway decodes it.
    pub fn set_bom_document(&self, document: Value) {
        let decision = parse_bom(&document)
            .map(|lines| BomDecision { lines, payload: document })
            .map_err(|message| GatewayError::Decode {
                decision_path: "scripted/bom".to_owned(),
                message,
            });
        self.script().bom = Some(decision);
    }

    /// Makes every subsequent call of `kind` fail with a transport error.
    pub fn fail(&self, kind: DecisionKind) {
        self.fail_with(
            kind,
            GatewayError::Transport {
                decision_path: format!("scripted/{kind}"),
                message: "decision engine unavailable".to_owned(),
            },
        );
    }

    pub fn fail_with(&self, kind: DecisionKind, error: GatewayError) {
        let mut script = self.script();
        match kind {
            DecisionKind::Validate => script.validate = Some(Err(error)),
            DecisionKind::Options => script.options = Some(Err(error)),
            DecisionKind::Bom => script.bom = Some(Err(error)),
        }
    }

    pub fn calls(&self) -> Vec<(DecisionKind, String)> {
        self.script().calls.iter().map(|(kind, path, _)| (*kind, path.clone())).collect()
    }

    pub fn last_context(&self, kind: DecisionKind) -> Option<RuleContext> {
        self.script()
            .calls
            .iter()
            .rev()
            .find(|(called, _, _)| *called == kind)
            .map(|(_, _, context)| context.clone())
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, kind: DecisionKind, decision_path: &str, context: &RuleContext) {
        self.script().calls.push((kind, decision_path.to_owned(), context.clone()));
    }
}

#[async_trait]
impl RuleEvaluationGateway for ScriptedGateway {
    async fn validate(
        &self,
        decision_path: &str,
        context: &RuleContext,
    ) -> Result<ValidationResult, GatewayError> {
        self.record(DecisionKind::Validate, decision_path, context);
        tokio::task::yield_now().await;
        self.script().validate.clone().unwrap_or_else(|| Ok(ValidationResult::passed()))
    }

    async fn options(
        &self,
        decision_path: &str,
        context: &RuleContext,
    ) -> Result<OptionsDecision, GatewayError> {
        self.record(DecisionKind::Options, decision_path, context);
        tokio::task::yield_now().await;
        self.script().options.clone().unwrap_or_else(|| Ok(OptionsDecision::default()))
    }

    async fn bom(
        &self,
        decision_path: &str,
        context: &RuleContext,
    ) -> Result<BomDecision, GatewayError> {
        self.record(DecisionKind::Bom, decision_path, context);
        tokio::task::yield_now().await;
        self.script()
            .bom
            .clone()
            .unwrap_or_else(|| Ok(BomDecision { lines: Vec::new(), payload: json!([]) }))
    }
}

/// Engine over the demo catalog and an empty in-memory configuration store.
pub struct Harness {
    pub engine: ConfiguratorEngine,
    pub gateway: Arc<ScriptedGateway>,
    pub store: Arc<InMemoryConfigurationStore>,
    pub catalog: Arc<InMemoryCatalog>,
}

impl Harness {
    pub fn demo() -> Self {
        let gateway = Arc::new(ScriptedGateway::new());
        let store = Arc::new(InMemoryConfigurationStore::default());
        let catalog = Arc::new(InMemoryCatalog::demo());
        let engine = ConfiguratorEngine::with_validator(
            EngineStores::in_memory(store.clone(), catalog.clone()),
            gateway.clone(),
            Arc::new(DeterministicSelectionValidator),
            Duration::from_secs(300),
        );

        Self { engine, gateway, store, catalog }
    }
}
