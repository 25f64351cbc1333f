pub mod engine;
pub mod facet;
pub mod orchestrator;

pub use engine::{applicable_entities, validate_applicable, validate_batch, validate_batch_with};
pub use facet::{match_applicability, match_requirement, FacetMatcher};
pub use orchestrator::{
    AbortHandle, IdsSource, IfcSource, Orchestrator, OrchestratorState, Strategy, ValidationEvent,
};
