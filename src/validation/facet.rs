//! Facet matching: applicability predicates and requirement checks.

use crate::model::{
    AttributeFacet, Cardinality, ClassificationFacet, Entity, EntityFacet, Facet, FacetKind,
    FacetValidation, MaterialFacet, PartOfFacet, PropertyFacet, Value,
};

pub const INCOMPLETE: &str = "incomplete specification";

/// Decides whether entities match facets.
///
/// By default classification, material and partOf *requirements* are reported
/// as passed without inspecting the entity. With `strict_structural` they are
/// checked against the entity's relationship data, like applicability is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FacetMatcher {
    pub strict_structural: bool,
}

/// Applicability check with the default matcher.
#[must_use]
pub fn match_applicability(entity: &Entity, facet: &Facet) -> bool {
    FacetMatcher::default().applies(entity, facet)
}

/// Requirement check with the default matcher.
#[must_use]
pub fn match_requirement(entity: &Entity, facet: &Facet) -> FacetValidation {
    FacetMatcher::default().check(entity, facet)
}

/// Plain text for a value inside messages: literals unquoted, restrictions described.
fn label(value: &Value) -> String {
    match value {
        Value::Simple { value } => value.clone(),
        other => other.to_string(),
    }
}

/// Why a value failed, or `None` when it matches.
fn mismatch(expected: &Value, actual: &str) -> Option<String> {
    if let Value::Pattern { regex } = expected {
        if !regex.is_valid() {
            return Some(format!("invalid pattern /{}/", regex.as_str()));
        }
    }
    if expected.matches(actual) {
        None
    } else {
        Some(format!("Expected {expected}, got \"{actual}\""))
    }
}

/// Outcome of looking something up on an entity, before cardinality is applied.
enum Lookup {
    /// Nothing with that name is present.
    Absent(String),
    /// Present, but the value is wrong.
    Mismatch(String),
    /// Present and acceptable; carries the pass details.
    Found(String),
}

impl FacetMatcher {
    #[must_use]
    pub fn new(strict_structural: bool) -> Self {
        Self { strict_structural }
    }

    /// Boolean applicability predicate.
    #[must_use]
    pub fn applies(&self, entity: &Entity, facet: &Facet) -> bool {
        match facet {
            Facet::Entity(f) => entity_matches(entity, f),
            Facet::Property(f) => {
                !is_incomplete_property(f) && matches!(find_property(entity, f), Lookup::Found(_))
            }
            Facet::Attribute(f) => {
                !f.name.is_empty() && matches!(find_attribute(entity, f), Lookup::Found(_))
            }
            Facet::Classification(f) => classification_matches(entity, f),
            Facet::Material(f) => material_matches(entity, f),
            Facet::PartOf(f) => part_of_matches(entity, f),
        }
    }

    /// Requirement check with a pass/fail explanation.
    #[must_use]
    pub fn check(&self, entity: &Entity, facet: &Facet) -> FacetValidation {
        match facet {
            Facet::Entity(f) => check_entity(entity, f),
            Facet::Property(f) => check_property(entity, f),
            Facet::Attribute(f) => check_attribute(entity, f),
            Facet::Classification(_) | Facet::Material(_) | Facet::PartOf(_) => {
                self.check_structural(entity, facet)
            }
        }
    }

    fn check_structural(&self, entity: &Entity, facet: &Facet) -> FacetValidation {
        let kind = facet.kind();
        let message = structural_message(facet);

        if !self.strict_structural {
            return FacetValidation::pass(
                kind,
                message,
                format!("{kind} requirement present; not validated against the model"),
            );
        }

        let matched = self.applies(entity, facet);
        let has_any = match facet {
            Facet::Classification(_) => !entity.classifications.is_empty(),
            Facet::Material(_) => !entity.materials.is_empty(),
            _ => !entity.parents.is_empty(),
        };
        let found = structural_found(entity, facet);

        match facet.cardinality() {
            Cardinality::Required if matched => FacetValidation::pass(kind, message, found),
            Cardinality::Required => {
                FacetValidation::fail(kind, message, format!("No matching {kind} (found: {found})"))
            }
            Cardinality::Optional if matched || !has_any => {
                FacetValidation::pass(kind, message, found)
            }
            Cardinality::Optional => FacetValidation::fail(
                kind,
                message,
                format!("{kind} present but does not match (found: {found})"),
            ),
            Cardinality::Prohibited if matched => {
                FacetValidation::fail(kind, message, format!("Prohibited {kind} present: {found}"))
            }
            Cardinality::Prohibited => FacetValidation::pass(kind, message, found),
        }
    }
}

fn entity_matches(entity: &Entity, facet: &EntityFacet) -> bool {
    !facet.name.is_empty() && facet.name.matches_ignore_case(&entity.entity_type)
}

fn check_entity(entity: &Entity, facet: &EntityFacet) -> FacetValidation {
    let message = format!("Entity type {}", label(&facet.name));
    if facet.name.is_empty() {
        return FacetValidation::fail(FacetKind::Entity, INCOMPLETE, "Entity name is missing");
    }
    if !entity_matches(entity, facet) {
        return FacetValidation::fail(
            FacetKind::Entity,
            message,
            format!("Expected {}, got \"{}\"", facet.name, entity.entity_type),
        );
    }
    let Some(predefined) = &facet.predefined_type else {
        return FacetValidation::pass(
            FacetKind::Entity,
            message,
            format!("Type: \"{}\"", entity.entity_type),
        );
    };

    // Asserted predefined types are checked in requirements only
    let message = format!("{message} / {}", label(predefined));
    match entity.attributes.get("PredefinedType") {
        Some(actual) if predefined.matches_ignore_case(actual) => FacetValidation::pass(
            FacetKind::Entity,
            message,
            format!("Type: \"{}.{actual}\"", entity.entity_type),
        ),
        Some(actual) => FacetValidation::fail(
            FacetKind::Entity,
            message,
            format!("Expected predefined type {predefined}, got \"{actual}\""),
        ),
        None => FacetValidation::fail(
            FacetKind::Entity,
            message,
            format!("Expected predefined type {predefined}, none set"),
        ),
    }
}

fn is_incomplete_property(facet: &PropertyFacet) -> bool {
    facet.property_set.is_empty() || facet.base_name.is_empty()
}

fn find_property(entity: &Entity, facet: &PropertyFacet) -> Lookup {
    let pset_label = label(&facet.property_set);
    let name_label = label(&facet.base_name);

    let mut psets: Vec<(&String, _)> = entity
        .property_sets
        .iter()
        .filter(|(name, _)| facet.property_set.matches(name))
        .collect();
    if psets.is_empty() {
        return Lookup::Absent(format!("Property set \"{pset_label}\" not found"));
    }
    // Stable order when a pattern selects several psets
    psets.sort_by(|a, b| a.0.cmp(b.0));

    let mut first_mismatch = None;
    for (_, properties) in psets {
        let mut names: Vec<&String> = properties
            .keys()
            .filter(|name| facet.base_name.matches(name))
            .collect();
        names.sort();
        for name in names {
            let actual = &properties[name];
            match facet.value.as_ref().and_then(|v| mismatch(v, actual)) {
                None => return Lookup::Found(format!("Value: \"{actual}\"")),
                Some(reason) => {
                    first_mismatch.get_or_insert(reason);
                }
            }
        }
    }

    match first_mismatch {
        Some(reason) => Lookup::Mismatch(reason),
        None => Lookup::Absent(format!(
            "Property \"{name_label}\" not found in \"{pset_label}\""
        )),
    }
}

fn find_attribute(entity: &Entity, facet: &AttributeFacet) -> Lookup {
    let mut names: Vec<&String> = entity
        .attributes
        .iter()
        .filter(|(name, value)| facet.name.matches(name) && !value.is_empty())
        .map(|(name, _)| name)
        .collect();
    if names.is_empty() {
        return Lookup::Absent(format!("Attribute \"{}\" not found", label(&facet.name)));
    }
    names.sort();

    let mut first_mismatch = None;
    for name in names {
        let actual = &entity.attributes[name];
        match facet.value.as_ref().and_then(|v| mismatch(v, actual)) {
            None => return Lookup::Found(format!("Value: \"{actual}\"")),
            Some(reason) => {
                first_mismatch.get_or_insert(reason);
            }
        }
    }
    Lookup::Mismatch(first_mismatch.unwrap_or_default())
}

/// Applies cardinality to a lookup.
fn resolve(kind: FacetKind, message: String, cardinality: Cardinality, lookup: Lookup) -> FacetValidation {
    match (cardinality, lookup) {
        (Cardinality::Required, Lookup::Found(details))
        | (Cardinality::Optional, Lookup::Found(details)) => {
            FacetValidation::pass(kind, message, details)
        }
        (Cardinality::Required, Lookup::Absent(details) | Lookup::Mismatch(details))
        | (Cardinality::Optional, Lookup::Mismatch(details)) => {
            FacetValidation::fail(kind, message, details)
        }
        (Cardinality::Optional, Lookup::Absent(details)) => {
            FacetValidation::pass(kind, message, format!("{details} (optional)"))
        }
        (Cardinality::Prohibited, Lookup::Found(details)) => {
            FacetValidation::fail(kind, message, format!("Prohibited but present. {details}"))
        }
        (Cardinality::Prohibited, Lookup::Absent(details) | Lookup::Mismatch(details)) => {
            FacetValidation::pass(kind, message, details)
        }
    }
}

fn check_property(entity: &Entity, facet: &PropertyFacet) -> FacetValidation {
    if is_incomplete_property(facet) {
        return FacetValidation::fail(
            FacetKind::Property,
            INCOMPLETE,
            "Property set or property name is missing",
        );
    }

    let mut message = format!(
        "{}.{}",
        label(&facet.property_set),
        label(&facet.base_name)
    );
    if let Some(value) = &facet.value {
        message.push_str(&format!(" = {value}"));
    }
    resolve(
        FacetKind::Property,
        message,
        facet.cardinality,
        find_property(entity, facet),
    )
}

fn check_attribute(entity: &Entity, facet: &AttributeFacet) -> FacetValidation {
    if facet.name.is_empty() {
        return FacetValidation::fail(FacetKind::Attribute, INCOMPLETE, "Attribute name is missing");
    }

    let mut message = format!("Attribute {}", label(&facet.name));
    if let Some(value) = &facet.value {
        message.push_str(&format!(" = {value}"));
    }
    resolve(
        FacetKind::Attribute,
        message,
        facet.cardinality,
        find_attribute(entity, facet),
    )
}

fn classification_matches(entity: &Entity, facet: &ClassificationFacet) -> bool {
    entity.classifications.iter().any(|c| {
        facet.system.as_ref().map_or(true, |s| s.matches(&c.system))
            && facet
                .value
                .as_ref()
                .map_or(true, |v| v.matches(&c.identification))
    })
}

fn material_matches(entity: &Entity, facet: &MaterialFacet) -> bool {
    match &facet.value {
        None => !entity.materials.is_empty(),
        Some(value) => entity.materials.iter().any(|m| value.matches(m)),
    }
}

fn part_of_matches(entity: &Entity, facet: &PartOfFacet) -> bool {
    !facet.entity.is_empty()
        && entity.parents.iter().any(|p| {
            facet.entity.matches_ignore_case(&p.entity_type)
                && facet.relation.map_or(true, |r| r.accepts(&p.relation))
        })
}

fn structural_message(facet: &Facet) -> String {
    match facet {
        Facet::Classification(f) => {
            let system = f.system.as_ref().map_or_else(|| "any system".to_string(), label);
            match &f.value {
                Some(value) => format!("Classification {} in {system}", label(value)),
                None => format!("Classification in {system}"),
            }
        }
        Facet::Material(f) => match &f.value {
            Some(value) => format!("Material {}", label(value)),
            None => "Material".to_string(),
        },
        Facet::PartOf(f) => match f.relation {
            Some(relation) => format!("Part of {} via {}", label(&f.entity), relation.ifc_name()),
            None => format!("Part of {}", label(&f.entity)),
        },
        other => other.kind().to_string(),
    }
}

/// What the entity actually carries for a structural facet, for details.
fn structural_found(entity: &Entity, facet: &Facet) -> String {
    let found: Vec<String> = match facet {
        Facet::Classification(_) => entity
            .classifications
            .iter()
            .map(|c| format!("{}:{}", c.system, c.identification))
            .collect(),
        Facet::Material(_) => entity.materials.clone(),
        _ => entity
            .parents
            .iter()
            .map(|p| format!("{} ({})", p.entity_type, p.relation))
            .collect(),
    };
    if found.is_empty() {
        "none".to_string()
    } else {
        found.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bounds, ClassificationRef, ParentRef, PartOfRelation, Status};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn wall() -> Entity {
        let mut e = Entity::new(1, "GUID-1".into(), "IFCWALL".into(), "a.ifc".into());
        e.name = "Wall A".into();
        e.attributes.insert("Name".into(), "Wall A".into());
        e.attributes.insert("GlobalId".into(), "GUID-1".into());
        e.property_sets.insert(
            "Pset_WallCommon".into(),
            HashMap::from([
                ("FireRating".to_string(), "REI60".to_string()),
                ("ThermalTransmittance".to_string(), "0.25".to_string()),
            ]),
        );
        e
    }

    fn fire_rating(value: Option<Value>) -> Facet {
        Facet::property(
            Value::simple("Pset_WallCommon"),
            Value::simple("FireRating"),
            value,
        )
    }

    #[test]
    fn entity_facet() {
        assert!(match_applicability(&wall(), &Facet::entity(Value::simple("IFCWALL"))));
        assert!(match_applicability(&wall(), &Facet::entity(Value::simple("IfcWall"))));
        assert!(match_applicability(&wall(), &Facet::entity(Value::pattern("^IFCWALL"))));
        assert!(!match_applicability(&wall(), &Facet::entity(Value::simple("IFCDOOR"))));
        assert!(!match_applicability(&wall(), &Facet::entity(Value::simple(""))));
    }

    #[test]
    fn missing_pset_fails() {
        let entity = Entity::new(1, "GUID-1".into(), "IFCWALL".into(), "a.ifc".into());
        let result = match_requirement(&entity, &fire_rating(None));
        assert_eq!(result.status, Status::Fail);
        assert_eq!(result.details, "Property set \"Pset_WallCommon\" not found");
        assert!(!match_applicability(&entity, &fire_rating(None)));
    }

    #[test]
    fn missing_property_fails() {
        let facet = Facet::property(
            Value::simple("Pset_WallCommon"),
            Value::simple("IsExternal"),
            None,
        );
        let result = match_requirement(&wall(), &facet);
        assert_eq!(result.status, Status::Fail);
        assert_eq!(result.details, "Property \"IsExternal\" not found in \"Pset_WallCommon\"");
    }

    #[test]
    fn presence_only_ignores_value() {
        let result = match_requirement(&wall(), &fire_rating(None));
        assert_eq!(result.status, Status::Pass);
        assert_eq!(result.details, "Value: \"REI60\"");
    }

    #[test]
    fn value_restrictions() {
        let e = wall();
        let pass = |v: Value| match_requirement(&e, &fire_rating(Some(v))).status == Status::Pass;
        assert!(pass(Value::simple("REI60")));
        assert!(!pass(Value::simple("REI30")));
        assert!(pass(Value::enumeration(["REI30", "REI60", "REI90"])));
        assert!(pass(Value::pattern("REI[0-9]+")));
        assert!(!pass(Value::pattern("([")));

        let mismatch = match_requirement(&e, &fire_rating(Some(Value::simple("REI30"))));
        assert_eq!(mismatch.details, "Expected \"REI30\", got \"REI60\"");
    }

    #[test]
    fn bounds_on_properties() {
        let facet = Facet::property(
            Value::simple("Pset_WallCommon"),
            Value::simple("ThermalTransmittance"),
            Some(Value::Bounds(Bounds {
                max_inclusive: Some("0.25".into()),
                ..Bounds::default()
            })),
        );
        assert_eq!(match_requirement(&wall(), &facet).status, Status::Pass);
    }

    #[test]
    fn incomplete_property_facet() {
        let facet = Facet::property(Value::simple(""), Value::simple("FireRating"), None);
        let result = match_requirement(&wall(), &facet);
        assert_eq!(result.status, Status::Fail);
        assert_eq!(result.message, INCOMPLETE);
        assert!(!match_applicability(&wall(), &facet));
    }

    #[test]
    fn cardinality() {
        let e = wall();
        let absent = Facet::property(Value::simple("Pset_X"), Value::simple("Y"), None);

        let optional = absent.clone().with_cardinality(Cardinality::Optional);
        assert_eq!(match_requirement(&e, &optional).status, Status::Pass);
        let optional_wrong = fire_rating(Some(Value::simple("REI30"))).with_cardinality(Cardinality::Optional);
        assert_eq!(match_requirement(&e, &optional_wrong).status, Status::Fail);

        let prohibited = fire_rating(None).with_cardinality(Cardinality::Prohibited);
        assert_eq!(match_requirement(&e, &prohibited).status, Status::Fail);
        let prohibited_absent = absent.with_cardinality(Cardinality::Prohibited);
        assert_eq!(match_requirement(&e, &prohibited_absent).status, Status::Pass);
    }

    #[test]
    fn attribute_facet() {
        let e = wall();
        let name = Facet::attribute(Value::simple("Name"), Some(Value::pattern("^Wall")));
        assert!(match_applicability(&e, &name));
        assert_eq!(match_requirement(&e, &name).status, Status::Pass);

        let missing = Facet::attribute(Value::simple("Description"), None);
        let result = match_requirement(&e, &missing);
        assert_eq!(result.status, Status::Fail);
        assert_eq!(result.details, "Attribute \"Description\" not found");
    }

    #[test]
    fn structural_applicability() {
        let mut e = wall();
        e.materials.push("Concrete".into());
        e.classifications.push(ClassificationRef {
            system: "Uniclass 2015".into(),
            identification: "EF_25_10".into(),
        });
        e.parents.push(ParentRef {
            relation: "IFCRELCONTAINEDINSPATIALSTRUCTURE".into(),
            entity_type: "IFCBUILDINGSTOREY".into(),
            guid: "S1".into(),
        });

        let material = Facet::Material(MaterialFacet {
            value: Some(Value::simple("Concrete")),
            cardinality: Cardinality::Required,
            uri: None,
            instructions: None,
        });
        let classification = Facet::Classification(ClassificationFacet {
            system: Some(Value::simple("Uniclass 2015")),
            value: Some(Value::pattern("^EF_25")),
            cardinality: Cardinality::Required,
            uri: None,
            instructions: None,
        });
        let contained = Facet::PartOf(PartOfFacet {
            entity: Value::simple("IfcBuildingStorey"),
            relation: Some(PartOfRelation::ContainedInSpatialStructure),
            cardinality: Cardinality::Required,
            instructions: None,
        });
        let aggregated = Facet::PartOf(PartOfFacet {
            entity: Value::simple("IFCBUILDINGSTOREY"),
            relation: Some(PartOfRelation::Aggregates),
            cardinality: Cardinality::Required,
            instructions: None,
        });

        assert!(match_applicability(&e, &material));
        assert!(match_applicability(&e, &classification));
        assert!(match_applicability(&e, &contained));
        assert!(!match_applicability(&e, &aggregated));
    }

    #[test]
    fn asserted_predefined_type_is_checked_in_requirements() {
        let shear = Facet::Entity(EntityFacet {
            name: Value::simple("IFCWALL"),
            predefined_type: Some(Value::simple("SHEAR")),
            cardinality: Cardinality::Required,
            instructions: None,
        });

        let mut e = wall();
        let unset = match_requirement(&e, &shear);
        assert_eq!(unset.status, Status::Fail);
        assert_eq!(unset.details, r#"Expected predefined type "SHEAR", none set"#);

        e.attributes.insert("PredefinedType".into(), "PARTITIONING".into());
        assert_eq!(match_requirement(&e, &shear).status, Status::Fail);

        e.attributes.insert("PredefinedType".into(), "shear".into());
        let matched = match_requirement(&e, &shear);
        assert_eq!(matched.status, Status::Pass);
        assert_eq!(matched.details, r#"Type: "IFCWALL.shear""#);

        // Applicability only looks at the type name
        e.attributes.remove("PredefinedType");
        assert!(match_applicability(&e, &shear));
    }

    #[test]
    fn door_in_opening_matches_combined_voids_fills_relation() {
        let mut door = Entity::new(2, "D1".into(), "IFCDOOR".into(), "a.ifc".into());
        door.parents.push(ParentRef {
            relation: "IFCRELFILLSELEMENT".into(),
            entity_type: "IFCOPENINGELEMENT".into(),
            guid: "O1".into(),
        });
        let in_opening = |relation| {
            Facet::PartOf(PartOfFacet {
                entity: Value::simple("IFCOPENINGELEMENT"),
                relation: Some(relation),
                cardinality: Cardinality::Required,
                instructions: None,
            })
        };

        assert!(match_applicability(&door, &in_opening(PartOfRelation::VoidsOrFills)));
        assert!(match_applicability(&door, &in_opening(PartOfRelation::FillsElement)));
        assert!(!match_applicability(&door, &in_opening(PartOfRelation::VoidsElement)));
    }

    #[test]
    fn structural_requirements_pass_unless_strict() {
        let e = wall();
        let material = Facet::Material(MaterialFacet {
            value: Some(Value::simple("Steel")),
            cardinality: Cardinality::Required,
            uri: None,
            instructions: None,
        });

        let lenient = match_requirement(&e, &material);
        assert_eq!(lenient.status, Status::Pass);
        assert!(lenient.details.contains("not validated"));

        let strict = FacetMatcher::new(true).check(&e, &material);
        assert_eq!(strict.status, Status::Fail);
        assert_eq!(strict.details, "No matching material (found: none)");
    }
}
