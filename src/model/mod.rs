pub mod entity;
pub mod facet;
pub mod result;
pub mod specification;
pub mod value;

pub use entity::{ClassificationRef, Entity, ParentRef};
pub use facet::{
    AttributeFacet, Cardinality, ClassificationFacet, EntityFacet, Facet, FacetKind,
    MaterialFacet, PartOfFacet, PartOfRelation, PropertyFacet,
};
pub use result::{
    EntityResult, FacetValidation, IdsResult, IfcResult, ReportSummary, SpecificationResult,
    Status, ValidationReport,
};
pub use specification::{IdsDocument, IdsInfo, Specification};
pub use value::{Bounds, LengthRestriction, Pattern, Value};
