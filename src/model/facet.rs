//! IDS facets: the atomic conditions of a specification.

use super::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Required,
    Optional,
    Prohibited,
}

impl Cardinality {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Cardinality::Required => "required",
            Cardinality::Optional => "optional",
            Cardinality::Prohibited => "prohibited",
        }
    }

    /// Lenient parse: anything unrecognised (including blank) is `required`.
    #[must_use]
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "optional" => Cardinality::Optional,
            "prohibited" => Cardinality::Prohibited,
            _ => Cardinality::Required,
        }
    }
}

/// Discriminant of [`Facet`], also the IDS element name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacetKind {
    Entity,
    Property,
    Attribute,
    Classification,
    Material,
    PartOf,
}

impl FacetKind {
    pub const ALL: [FacetKind; 6] = [
        FacetKind::Entity,
        FacetKind::PartOf,
        FacetKind::Classification,
        FacetKind::Attribute,
        FacetKind::Property,
        FacetKind::Material,
    ];

    #[must_use]
    pub fn element_name(self) -> &'static str {
        match self {
            FacetKind::Entity => "entity",
            FacetKind::Property => "property",
            FacetKind::Attribute => "attribute",
            FacetKind::Classification => "classification",
            FacetKind::Material => "material",
            FacetKind::PartOf => "partOf",
        }
    }

    #[must_use]
    pub fn from_element_name(name: &str) -> Option<Self> {
        FacetKind::ALL
            .into_iter()
            .find(|k| k.element_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// IFC relationships a `partOf` facet may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartOfRelation {
    #[serde(rename = "IFCRELAGGREGATES")]
    Aggregates,
    #[serde(rename = "IFCRELASSIGNSTOGROUP")]
    AssignsToGroup,
    #[serde(rename = "IFCRELCONTAINEDINSPATIALSTRUCTURE")]
    ContainedInSpatialStructure,
    #[serde(rename = "IFCRELNESTS")]
    Nests,
    #[serde(rename = "IFCRELVOIDSELEMENT")]
    VoidsElement,
    #[serde(rename = "IFCRELFILLSELEMENT")]
    FillsElement,
    /// IDS 1.0 combined token: either voids or fills.
    #[serde(rename = "IFCRELVOIDSELEMENT IFCRELFILLSELEMENT")]
    VoidsOrFills,
}

impl PartOfRelation {
    pub const ALL: [PartOfRelation; 7] = [
        PartOfRelation::Aggregates,
        PartOfRelation::AssignsToGroup,
        PartOfRelation::ContainedInSpatialStructure,
        PartOfRelation::Nests,
        PartOfRelation::VoidsElement,
        PartOfRelation::FillsElement,
        PartOfRelation::VoidsOrFills,
    ];

    #[must_use]
    pub fn ifc_name(self) -> &'static str {
        match self {
            PartOfRelation::Aggregates => "IFCRELAGGREGATES",
            PartOfRelation::AssignsToGroup => "IFCRELASSIGNSTOGROUP",
            PartOfRelation::ContainedInSpatialStructure => "IFCRELCONTAINEDINSPATIALSTRUCTURE",
            PartOfRelation::Nests => "IFCRELNESTS",
            PartOfRelation::VoidsElement => "IFCRELVOIDSELEMENT",
            PartOfRelation::FillsElement => "IFCRELFILLSELEMENT",
            PartOfRelation::VoidsOrFills => "IFCRELVOIDSELEMENT IFCRELFILLSELEMENT",
        }
    }

    /// Whether a parent link made through `relation` (an IFC type name)
    /// satisfies this relation.
    #[must_use]
    pub fn accepts(self, relation: &str) -> bool {
        match self {
            PartOfRelation::VoidsOrFills => {
                PartOfRelation::VoidsElement.accepts(relation)
                    || PartOfRelation::FillsElement.accepts(relation)
            }
            other => other.ifc_name().eq_ignore_ascii_case(relation),
        }
    }
}

impl FromStr for PartOfRelation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
        PartOfRelation::ALL
            .into_iter()
            .find(|r| r.ifc_name() == upper)
            .ok_or_else(|| format!("unknown partOf relation '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityFacet {
    pub name: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predefined_type: Option<Value>,
    pub cardinality: Cardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFacet {
    pub property_set: Value,
    /// The property name.
    pub base_name: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub cardinality: Cardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFacet {
    pub name: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub cardinality: Cardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationFacet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub cardinality: Cardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialFacet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub cardinality: Cardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartOfFacet {
    /// Parent entity type.
    pub entity: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<PartOfRelation>,
    pub cardinality: Cardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// One condition of a specification's applicability or requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Facet {
    Entity(EntityFacet),
    Property(PropertyFacet),
    Attribute(AttributeFacet),
    Classification(ClassificationFacet),
    Material(MaterialFacet),
    PartOf(PartOfFacet),
}

impl Facet {
    #[must_use]
    pub fn entity(name: Value) -> Self {
        Facet::Entity(EntityFacet {
            name,
            predefined_type: None,
            cardinality: Cardinality::Required,
            instructions: None,
        })
    }

    #[must_use]
    pub fn property(property_set: Value, base_name: Value, value: Option<Value>) -> Self {
        Facet::Property(PropertyFacet {
            property_set,
            base_name,
            value,
            data_type: None,
            cardinality: Cardinality::Required,
            uri: None,
            instructions: None,
        })
    }

    #[must_use]
    pub fn attribute(name: Value, value: Option<Value>) -> Self {
        Facet::Attribute(AttributeFacet {
            name,
            value,
            cardinality: Cardinality::Required,
            instructions: None,
        })
    }

    #[must_use]
    pub fn kind(&self) -> FacetKind {
        match self {
            Facet::Entity(_) => FacetKind::Entity,
            Facet::Property(_) => FacetKind::Property,
            Facet::Attribute(_) => FacetKind::Attribute,
            Facet::Classification(_) => FacetKind::Classification,
            Facet::Material(_) => FacetKind::Material,
            Facet::PartOf(_) => FacetKind::PartOf,
        }
    }

    #[must_use]
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Facet::Entity(f) => f.cardinality,
            Facet::Property(f) => f.cardinality,
            Facet::Attribute(f) => f.cardinality,
            Facet::Classification(f) => f.cardinality,
            Facet::Material(f) => f.cardinality,
            Facet::PartOf(f) => f.cardinality,
        }
    }

    #[must_use]
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        match &mut self {
            Facet::Entity(f) => f.cardinality = cardinality,
            Facet::Property(f) => f.cardinality = cardinality,
            Facet::Attribute(f) => f.cardinality = cardinality,
            Facet::Classification(f) => f.cardinality = cardinality,
            Facet::Material(f) => f.cardinality = cardinality,
            Facet::PartOf(f) => f.cardinality = cardinality,
        }
        self
    }

    /// Every value restriction the facet carries, in declaration order.
    #[must_use]
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Facet::Entity(f) => std::iter::once(&f.name).chain(&f.predefined_type).collect(),
            Facet::Property(f) => [&f.property_set, &f.base_name]
                .into_iter()
                .chain(&f.value)
                .collect(),
            Facet::Attribute(f) => std::iter::once(&f.name).chain(&f.value).collect(),
            Facet::Classification(f) => f.system.iter().chain(&f.value).collect(),
            Facet::Material(f) => f.value.iter().collect(),
            Facet::PartOf(f) => vec![&f.entity],
        }
    }
}
