//! IDS XML reader.
//!
//! The document is first read into a small element tree (local names only, so
//! `xs:restriction` and `restriction` are the same thing), then interpreted.

use crate::error::ParseError;
use crate::model::{
    AttributeFacet, Bounds, Cardinality, ClassificationFacet, EntityFacet, Facet, FacetKind,
    IdsDocument, LengthRestriction, MaterialFacet, PartOfFacet, PartOfRelation, PropertyFacet,
    Specification, Value,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

#[derive(Debug, Default)]
struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value, `None` when absent or blank.
    fn attr_string(&self, key: &str) -> Option<String> {
        self.attr(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn utf8(bytes: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|e| ParseError::MalformedXml {
        message: e.to_string(),
    })
}

fn open_node(e: &BytesStart) -> Result<Node, ParseError> {
    let mut node = Node {
        name: utf8(e.local_name().as_ref())?.to_string(),
        ..Node::default()
    };
    for attr in e.attributes() {
        let attr = attr?;
        let key = utf8(attr.key.local_name().as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

/// Reads the whole document into a tree, rejecting anything not well-formed.
fn read_tree(xml: &str) -> Result<Node, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                if root.is_some() {
                    return Err(ParseError::MalformedXml {
                        message: "content after the root element".to_string(),
                    });
                }
                stack.push(open_node(e)?);
            }
            Event::Empty(ref e) => {
                let node = open_node(e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None if root.is_none() => root = Some(node),
                    None => {
                        return Err(ParseError::MalformedXml {
                            message: "content after the root element".to_string(),
                        })
                    }
                }
            }
            Event::End(_) => {
                let Some(node) = stack.pop() else {
                    return Err(ParseError::MalformedXml {
                        message: "unexpected closing tag".to_string(),
                    });
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Event::Text(ref t) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(ref t) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(utf8(t.as_ref())?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::MalformedXml {
            message: format!("unclosed element <{}>", open.name),
        });
    }
    root.ok_or_else(|| ParseError::MalformedXml {
        message: "document has no root element".to_string(),
    })
}

/// Parses IDS XML text.
///
/// Fails with [`ParseError::MalformedXml`] when the text is not well-formed or
/// the root element is not `<ids>`. Facets keep document order.
pub fn parse_ids(xml: &str) -> Result<IdsDocument, ParseError> {
    let root = read_tree(xml)?;
    if root.name != "ids" {
        return Err(ParseError::MalformedXml {
            message: format!("expected <ids> root element, found <{}>", root.name),
        });
    }

    let mut document = IdsDocument::default();
    if let Some(info) = root.child("info") {
        for field in &info.children {
            let text = field.text.trim();
            if !text.is_empty() {
                document.info.set(&field.name, text.to_string());
            }
        }
    }

    if let Some(specifications) = root.child("specifications") {
        for node in specifications.children_named("specification") {
            document.specifications.push(read_specification(node));
        }
    }

    tracing::debug!(
        title = document.info.title.as_deref().unwrap_or_default(),
        specifications = document.specifications.len(),
        "parsed IDS document"
    );
    Ok(document)
}

/// Reads and parses an IDS file from disk.
pub fn parse_ids_file<P: AsRef<Path>>(path: P) -> Result<IdsDocument, ParseError> {
    let path_ref = path.as_ref();
    let xml = std::fs::read_to_string(path_ref).map_err(|source| ParseError::FileRead {
        path: path_ref.to_path_buf(),
        source,
    })?;
    parse_ids(&xml)
}

fn read_specification(node: &Node) -> Specification {
    let mut spec = Specification::new(
        node.attr("name").unwrap_or_default(),
        node.attr("ifcVersion").unwrap_or_default(),
    );
    spec.identifier = node.attr_string("identifier");
    spec.description = node.attr_string("description");
    spec.instructions = node.attr_string("instructions");

    if let Some(applicability) = node.child("applicability") {
        spec.applicability = read_facets(applicability, false);
    }
    if let Some(requirements) = node.child("requirements") {
        spec.requirements = read_facets(requirements, true);
    }
    spec
}

fn read_facets(container: &Node, with_cardinality: bool) -> Vec<Facet> {
    container
        .children
        .iter()
        .filter_map(|node| {
            let Some(kind) = FacetKind::from_element_name(&node.name) else {
                tracing::debug!(element = %node.name, "ignoring unknown facet element");
                return None;
            };
            let facet = read_facet(kind, node);
            Some(if with_cardinality {
                facet.with_cardinality(Cardinality::parse_or_default(
                    node.attr("cardinality").unwrap_or_default(),
                ))
            } else {
                facet
            })
        })
        .collect()
}

fn read_facet(kind: FacetKind, node: &Node) -> Facet {
    let cardinality = Cardinality::Required;
    let instructions = node.attr_string("instructions");
    let uri = node.attr_string("uri");

    match kind {
        FacetKind::Entity => Facet::Entity(EntityFacet {
            name: required_value(node, "name"),
            predefined_type: child_value(node, "predefinedType"),
            cardinality,
            instructions,
        }),
        FacetKind::Property => Facet::Property(PropertyFacet {
            property_set: required_value(node, "propertySet"),
            // IDS 0.9 used <name> for the property name
            base_name: child_value(node, "baseName")
                .or_else(|| child_value(node, "name"))
                .unwrap_or_else(|| Value::simple("")),
            value: child_value(node, "value"),
            data_type: node.attr_string("dataType"),
            cardinality,
            uri,
            instructions,
        }),
        FacetKind::Attribute => Facet::Attribute(AttributeFacet {
            name: required_value(node, "name"),
            value: child_value(node, "value"),
            cardinality,
            instructions,
        }),
        FacetKind::Classification => Facet::Classification(ClassificationFacet {
            system: child_value(node, "system"),
            value: child_value(node, "value"),
            cardinality,
            uri,
            instructions,
        }),
        FacetKind::Material => Facet::Material(MaterialFacet {
            value: child_value(node, "value"),
            cardinality,
            uri,
            instructions,
        }),
        FacetKind::PartOf => {
            // IDS 1.0 nests an entity facet; older drafts put the value directly
            let entity = node
                .child("entity")
                .and_then(|e| child_value(e, "name").or_else(|| read_value(e)))
                .unwrap_or_else(|| Value::simple(""));
            let relation = node.attr_string("relation").and_then(|r| match r.parse::<PartOfRelation>() {
                Ok(relation) => Some(relation),
                Err(err) => {
                    tracing::warn!(%err, "ignoring partOf relation");
                    None
                }
            });
            Facet::PartOf(PartOfFacet {
                entity,
                relation,
                cardinality,
                instructions,
            })
        }
    }
}

fn child_value(node: &Node, name: &str) -> Option<Value> {
    node.child(name).and_then(read_value)
}

/// A value the facet cannot do without; absent becomes an empty literal so
/// matching can report the facet as incomplete.
fn required_value(node: &Node, name: &str) -> Value {
    child_value(node, name).unwrap_or_else(|| Value::simple(""))
}

/// Normalizes `<simpleValue>` and `<xs:restriction>` into a [`Value`].
fn read_value(node: &Node) -> Option<Value> {
    if let Some(simple) = node.child("simpleValue") {
        return Some(Value::simple(simple.text.trim()));
    }
    node.child("restriction").and_then(read_restriction)
}

fn facet_text(node: &Node) -> String {
    node.attr("value")
        .map_or_else(|| node.text.trim().to_string(), |v| v.trim().to_string())
}

fn read_restriction(restriction: &Node) -> Option<Value> {
    let options: Vec<String> = restriction
        .children_named("enumeration")
        .map(facet_text)
        .collect();
    if !options.is_empty() {
        return Some(Value::Enumeration { options });
    }

    if let Some(pattern) = restriction.child("pattern") {
        return Some(Value::pattern(facet_text(pattern)));
    }

    let get = |name: &str| restriction.child(name).map(facet_text);

    let bounds = Bounds {
        min_inclusive: get("minInclusive"),
        max_inclusive: get("maxInclusive"),
        min_exclusive: get("minExclusive"),
        max_exclusive: get("maxExclusive"),
    };
    if bounds != Bounds::default() {
        return Some(Value::Bounds(bounds));
    }

    let length = LengthRestriction {
        min_length: get("minLength"),
        max_length: get("maxLength"),
        length: get("length"),
    };
    if length != LengthRestriction::default() {
        return Some(Value::Length(length));
    }

    tracing::warn!(
        base = restriction.attr("base").unwrap_or_default(),
        "restriction without a supported facet"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const IDS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ids xmlns="http://standards.buildingsmart.org/IDS" xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <info>
    <title>Walls &amp; doors</title>
    <author>bim@example.com</author>
  </info>
  <specifications>
    <specification name="Fire rating" ifcVersion="IFC4" identifier="FR-01" minOccurs="0">
      <applicability>
        <entity><name><simpleValue>IFCWALL</simpleValue></name></entity>
      </applicability>
      <requirements>
        <attribute><name><simpleValue>Name</simpleValue></name></attribute>
        <property dataType="IFCLABEL">
          <propertySet><simpleValue>Pset_WallCommon</simpleValue></propertySet>
          <baseName><simpleValue>FireRating</simpleValue></baseName>
          <value>
            <xs:restriction base="xs:string">
              <xs:enumeration value="REI30"/>
              <xs:enumeration value="REI60"/>
            </xs:restriction>
          </value>
        </property>
        <property cardinality="optional">
          <propertySet><simpleValue>Pset_WallCommon</simpleValue></propertySet>
          <baseName><simpleValue>ThermalTransmittance</simpleValue></baseName>
          <value>
            <xs:restriction base="xs:decimal">
              <xs:minInclusive value="0"/>
              <xs:maxInclusive value="0.3"/>
            </xs:restriction>
          </value>
        </property>
        <partOf relation="IFCRELCONTAINEDINSPATIALSTRUCTURE">
          <entity><name><simpleValue>IFCBUILDINGSTOREY</simpleValue></name></entity>
        </partOf>
      </requirements>
    </specification>
  </specifications>
</ids>"#;

    #[test]
    fn reads_info_and_specification_attributes() {
        let doc = parse_ids(IDS).unwrap();
        assert_eq!(doc.info.title.as_deref(), Some("Walls & doors"));
        assert_eq!(doc.info.author.as_deref(), Some("bim@example.com"));

        let spec = &doc.specifications[0];
        assert_eq!(spec.name, "Fire rating");
        assert_eq!(spec.ifc_version, "IFC4");
        assert_eq!(spec.identifier.as_deref(), Some("FR-01"));
        assert_eq!(spec.applicability, vec![Facet::entity(Value::simple("IFCWALL"))]);
    }

    #[test]
    fn requirements_keep_document_order() {
        let doc = parse_ids(IDS).unwrap();
        let kinds: Vec<FacetKind> = doc.specifications[0]
            .requirements
            .iter()
            .map(Facet::kind)
            .collect();
        assert_eq!(
            kinds,
            [
                FacetKind::Attribute,
                FacetKind::Property,
                FacetKind::Property,
                FacetKind::PartOf
            ]
        );
    }

    #[test]
    fn restrictions_are_normalized() {
        let doc = parse_ids(IDS).unwrap();
        let requirements = &doc.specifications[0].requirements;

        let Facet::Property(fire) = &requirements[1] else {
            panic!("expected property facet");
        };
        assert_eq!(fire.value, Some(Value::enumeration(["REI30", "REI60"])));
        assert_eq!(fire.data_type.as_deref(), Some("IFCLABEL"));
        assert_eq!(fire.cardinality, Cardinality::Required);

        let Facet::Property(thermal) = &requirements[2] else {
            panic!("expected property facet");
        };
        assert_eq!(thermal.cardinality, Cardinality::Optional);
        assert_eq!(
            thermal.value,
            Some(Value::Bounds(Bounds {
                min_inclusive: Some("0".into()),
                max_inclusive: Some("0.3".into()),
                ..Bounds::default()
            }))
        );

        let Facet::PartOf(part_of) = &requirements[3] else {
            panic!("expected partOf facet");
        };
        assert_eq!(part_of.entity, Value::simple("IFCBUILDINGSTOREY"));
        assert_eq!(part_of.relation, Some(PartOfRelation::ContainedInSpatialStructure));
    }

    #[test]
    fn pattern_from_text_content() {
        let xml = r#"<ids><specifications><specification name="p" ifcVersion="IFC4">
            <applicability><attribute><name><simpleValue>Name</simpleValue></name>
            <value><restriction><pattern>W-[0-9]+</pattern></restriction></value></attribute></applicability>
            </specification></specifications></ids>"#;
        let doc = parse_ids(xml).unwrap();
        let Facet::Attribute(attr) = &doc.specifications[0].applicability[0] else {
            panic!("expected attribute facet");
        };
        assert_eq!(attr.value, Some(Value::pattern("W-[0-9]+")));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        for xml in ["", "<ids><info>", "<ids></info>", "not xml at all", "<ids/><ids/>"] {
            let err = parse_ids(xml).unwrap_err();
            assert!(matches!(err, ParseError::MalformedXml { .. }), "{xml}: {err}");
        }
    }

    #[test]
    fn wrong_root_is_an_error() {
        assert!(matches!(
            parse_ids("<project/>"),
            Err(ParseError::MalformedXml { .. })
        ));
    }

    #[test]
    fn empty_ids_has_no_specifications() {
        let doc = parse_ids("<ids><info><title>t</title></info></ids>").unwrap();
        assert!(doc.specifications.is_empty());
    }
}
