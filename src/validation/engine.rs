//! Validation of an entity collection against one specification.

use super::facet::FacetMatcher;
use crate::model::{Entity, EntityResult, Specification, SpecificationResult};

/// Validates `entities` against `spec` with the default matcher.
///
/// Returns `None` when no entity passes the applicability filter.
#[must_use]
pub fn validate_batch(entities: &[Entity], spec: &Specification) -> Option<SpecificationResult> {
    validate_batch_with(entities, spec, &FacetMatcher::default())
}

/// Like [`validate_batch`] with an explicit matcher.
///
/// Entity results keep the input order of the applicable entities and
/// validations keep requirement order.
#[must_use]
pub fn validate_batch_with(
    entities: &[Entity],
    spec: &Specification,
    matcher: &FacetMatcher,
) -> Option<SpecificationResult> {
    let applicable = applicable_entities(entities, spec, matcher);
    validate_applicable(entities, &applicable, spec, matcher)
}

/// Indices of the entities every applicability facet selects, in input order.
#[must_use]
pub fn applicable_entities(
    entities: &[Entity],
    spec: &Specification,
    matcher: &FacetMatcher,
) -> Vec<usize> {
    entities
        .iter()
        .enumerate()
        .filter(|(_, entity)| spec.applicability.iter().all(|f| matcher.applies(entity, f)))
        .map(|(i, _)| i)
        .collect()
}

/// Checks the requirements of `spec` on the entities at `applicable`.
#[must_use]
pub fn validate_applicable(
    entities: &[Entity],
    applicable: &[usize],
    spec: &Specification,
    matcher: &FacetMatcher,
) -> Option<SpecificationResult> {
    let entity_results: Vec<EntityResult> = applicable
        .iter()
        .filter_map(|&i| entities.get(i))
        .map(|entity| {
            let validations = spec
                .requirements
                .iter()
                .map(|f| matcher.check(entity, f))
                .collect();
            EntityResult::new(entity, &spec.name, validations)
        })
        .collect();

    let result = SpecificationResult::from_entity_results(&spec.name, entity_results);
    match &result {
        Some(r) => tracing::debug!(
            specification = %spec.name,
            passed = r.pass_count,
            failed = r.fail_count,
            "specification validated"
        ),
        None => tracing::debug!(specification = %spec.name, "no applicable entities"),
    }
    result
}
