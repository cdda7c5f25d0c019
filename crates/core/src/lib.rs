pub mod config;
pub mod cpq;
pub mod domain;
pub mod errors;
pub mod rules;

pub use cpq::catalog::PartCatalog;
pub use cpq::constraints::{
    ConstraintResult, ConstraintViolation, DeterministicSelectionValidator, SelectionInput,
    SelectionValidator,
};
pub use cpq::visibility::VisibilityPredicate;
pub use domain::bom::{Bom, BomLine, UnresolvedLine};
pub use domain::catalog::{GlobalCatalog, Part, SkuMapping};
pub use domain::configuration::{Configuration, ConfigurationId, ConfigurationStatus};
pub use domain::history::{HistoryAction, HistoryEntry};
pub use domain::product::{
    ProductFamily, ProductOption, ProductParameter, ProductSpec, ProductType, ProductTypeProfile,
};
pub use domain::selection::{SelectionValue, Selections};
pub use domain::validation::{ValidationIssue, ValidationResult};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use rules::{
    BomDecision, BomSkeletonLine, DecisionKind, GatewayError, OptionsDecision, RuleContext,
    RuleEvaluationGateway,
};
