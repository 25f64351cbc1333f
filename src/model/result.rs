//! Validation result tree: report → IDS → IFC file → specification → entity → facet.

use super::{Entity, FacetKind};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Fail,
}

impl Status {
    #[must_use]
    pub fn from_pass(pass: bool) -> Self {
        if pass {
            Status::Pass
        } else {
            Status::Fail
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Fail => "fail",
        }
    }
}

/// Outcome of checking one requirement facet against one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetValidation {
    #[serde(rename = "type")]
    pub facet_type: FacetKind,
    pub status: Status,
    pub message: String,
    pub details: String,
}

impl FacetValidation {
    #[must_use]
    pub fn pass(facet_type: FacetKind, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            facet_type,
            status: Status::Pass,
            message: message.into(),
            details: details.into(),
        }
    }

    #[must_use]
    pub fn fail(facet_type: FacetKind, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            facet_type,
            status: Status::Fail,
            message: message.into(),
            details: details.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityResult {
    pub entity_type: String,
    pub name: String,
    pub guid: String,
    pub file_name: String,
    pub specification: String,
    pub status: Status,
    pub validations: Vec<FacetValidation>,
}

impl EntityResult {
    /// Status is `fail` iff any validation failed.
    #[must_use]
    pub fn new(entity: &Entity, specification: &str, validations: Vec<FacetValidation>) -> Self {
        let status = Status::from_pass(validations.iter().all(|v| v.status == Status::Pass));
        Self {
            entity_type: entity.entity_type.clone(),
            name: entity.name.clone(),
            guid: entity.guid.clone(),
            file_name: entity.source_file.clone(),
            specification: specification.to_string(),
            status,
            validations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecificationResult {
    pub specification: String,
    pub status: Status,
    pub pass_count: usize,
    pub fail_count: usize,
    pub entity_results: Vec<EntityResult>,
}

impl SpecificationResult {
    /// Aggregates entity results; `None` when no entity was applicable.
    #[must_use]
    pub fn from_entity_results(specification: &str, entity_results: Vec<EntityResult>) -> Option<Self> {
        if entity_results.is_empty() {
            return None;
        }
        let fail_count = entity_results
            .iter()
            .filter(|r| r.status == Status::Fail)
            .count();
        Some(Self {
            specification: specification.to_string(),
            status: Status::from_pass(fail_count == 0),
            pass_count: entity_results.len() - fail_count,
            fail_count,
            entity_results,
        })
    }
}

/// Results for one IFC file against one IDS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IfcResult {
    pub file_name: String,
    pub entity_count: usize,
    pub specification_results: Vec<SpecificationResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdsResult {
    pub ids_name: String,
    pub ifc_results: Vec<IfcResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub ids_results: Vec<IdsResult>,
    pub aborted: bool,
}

/// Entity-level totals for one (IFC, IDS) pair or a whole report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl ReportSummary {
    /// Percentage of passing entity results, 0 when there are none.
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }

    fn add(&mut self, other: ReportSummary) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
    }
}

impl IfcResult {
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for spec in &self.specification_results {
            summary.add(ReportSummary {
                total: spec.entity_results.len(),
                passed: spec.pass_count,
                failed: spec.fail_count,
            });
        }
        summary
    }
}

impl ValidationReport {
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for ifc in self.ids_results.iter().flat_map(|ids| &ids.ifc_results) {
            summary.add(ifc.summary());
        }
        summary
    }
}
