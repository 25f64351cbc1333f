use serde::Serialize;
use std::collections::HashMap;

/// One IFC object instance extracted from a model file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    /// STEP instance id (`#123`).
    pub id: u64,
    pub guid: String,
    pub entity_type: String,
    /// Display name, `-` when the model has none.
    pub name: String,
    pub attributes: HashMap<String, String>,
    /// pset name → property name → stringified value
    pub property_sets: HashMap<String, HashMap<String, String>>,
    pub materials: Vec<String>,
    pub classifications: Vec<ClassificationRef>,
    pub parents: Vec<ParentRef>,
    pub source_file: String,
}

/// A classification reference attached through `IFCRELASSOCIATESCLASSIFICATION`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationRef {
    /// Name of the classification system (e.g. `Uniclass 2015`), empty when unknown.
    pub system: String,
    /// Identification / item reference (e.g. `EF_25_10`).
    pub identification: String,
}

/// A parent entity reached through an aggregation, containment or nesting relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentRef {
    /// Relationship entity type, e.g. `IFCRELAGGREGATES`.
    pub relation: String,
    pub entity_type: String,
    pub guid: String,
}

impl Entity {
    #[must_use]
    pub fn new(id: u64, guid: String, entity_type: String, source_file: String) -> Self {
        Self {
            id,
            guid,
            entity_type,
            name: "-".to_string(),
            attributes: HashMap::new(),
            property_sets: HashMap::new(),
            materials: Vec::new(),
            classifications: Vec::new(),
            parents: Vec::new(),
            source_file,
        }
    }

    #[must_use]
    pub fn property(&self, pset: &str, name: &str) -> Option<&String> {
        self.property_sets.get(pset).and_then(|p| p.get(name))
    }

    #[must_use]
    pub fn total_properties(&self) -> usize {
        self.property_sets.values().map(HashMap::len).sum()
    }
}
