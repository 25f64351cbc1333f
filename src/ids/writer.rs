//! IDS XML writer.

use crate::error::ExportError;
use crate::model::{Facet, IdsDocument, Specification, Value};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs::File;
use std::io::Write as IoWrite;
use std::path::Path;

const IDS_NAMESPACE: &str = "http://standards.buildingsmart.org/IDS";
const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

type XmlResult = Result<(), ExportError>;

fn xml_err(e: impl std::fmt::Display) -> ExportError {
    ExportError::XmlWrite {
        message: e.to_string(),
    }
}

fn start<W: IoWrite>(writer: &mut Writer<W>, elem: BytesStart<'_>) -> XmlResult {
    writer.write_event(Event::Start(elem)).map_err(xml_err)
}

fn end<W: IoWrite>(writer: &mut Writer<W>, name: &str) -> XmlResult {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)
}

fn empty<W: IoWrite>(writer: &mut Writer<W>, elem: BytesStart<'_>) -> XmlResult {
    writer.write_event(Event::Empty(elem)).map_err(xml_err)
}

fn text_element<W: IoWrite>(writer: &mut Writer<W>, name: &str, text: &str) -> XmlResult {
    start(writer, BytesStart::new(name))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_err)?;
    end(writer, name)
}

impl IdsDocument {
    /// Serializes the document as IDS XML.
    pub fn to_xml(&self) -> Result<String, ExportError> {
        let mut buffer = Vec::new();
        write_ids(self, &mut buffer)?;
        String::from_utf8(buffer).map_err(xml_err)
    }
}

/// Writes `document` as IDS XML to `path`.
pub fn write_ids_file<P: AsRef<Path>>(document: &IdsDocument, path: P) -> XmlResult {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;
    write_ids(document, file)
}

pub fn write_ids<W: IoWrite>(document: &IdsDocument, out: W) -> XmlResult {
    let mut writer = Writer::new_with_indent(out, b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut root = BytesStart::new("ids");
    root.push_attribute(("xmlns", IDS_NAMESPACE));
    root.push_attribute(("xmlns:xs", XS_NAMESPACE));
    start(&mut writer, root)?;

    start(&mut writer, BytesStart::new("info"))?;
    for (field, value) in document.info.fields() {
        if let Some(value) = value {
            text_element(&mut writer, field, value)?;
        }
    }
    end(&mut writer, "info")?;

    start(&mut writer, BytesStart::new("specifications"))?;
    for spec in &document.specifications {
        write_specification(&mut writer, spec)?;
    }
    end(&mut writer, "specifications")?;

    end(&mut writer, "ids")?;
    writer.into_inner().flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })
}

fn write_specification<W: IoWrite>(writer: &mut Writer<W>, spec: &Specification) -> XmlResult {
    let mut elem = BytesStart::new("specification");
    elem.push_attribute(("name", spec.name.as_str()));
    elem.push_attribute(("ifcVersion", spec.ifc_version.as_str()));
    for (key, value) in [
        ("identifier", &spec.identifier),
        ("description", &spec.description),
        ("instructions", &spec.instructions),
    ] {
        if let Some(value) = value {
            elem.push_attribute((key, value.as_str()));
        }
    }
    elem.push_attribute(("minOccurs", "1"));
    elem.push_attribute(("maxOccurs", "unbounded"));
    start(writer, elem)?;

    start(writer, BytesStart::new("applicability"))?;
    for facet in &spec.applicability {
        write_facet(writer, facet, false)?;
    }
    end(writer, "applicability")?;

    start(writer, BytesStart::new("requirements"))?;
    for facet in &spec.requirements {
        write_facet(writer, facet, true)?;
    }
    end(writer, "requirements")?;

    end(writer, "specification")
}

fn write_facet<W: IoWrite>(writer: &mut Writer<W>, facet: &Facet, requirement: bool) -> XmlResult {
    let name = facet.kind().element_name();
    let mut elem = BytesStart::new(name);

    let (uri, instructions) = match facet {
        Facet::Entity(f) => (None, &f.instructions),
        Facet::Property(f) => (f.uri.as_ref(), &f.instructions),
        Facet::Attribute(f) => (None, &f.instructions),
        Facet::Classification(f) => (f.uri.as_ref(), &f.instructions),
        Facet::Material(f) => (f.uri.as_ref(), &f.instructions),
        Facet::PartOf(f) => (None, &f.instructions),
    };
    if let Facet::Property(f) = facet {
        if let Some(data_type) = &f.data_type {
            elem.push_attribute(("dataType", data_type.as_str()));
        }
    }
    if let Facet::PartOf(f) = facet {
        if let Some(relation) = f.relation {
            elem.push_attribute(("relation", relation.ifc_name()));
        }
    }
    // Entity facets carry no cardinality in IDS
    if requirement && !matches!(facet, Facet::Entity(_)) {
        elem.push_attribute(("cardinality", facet.cardinality().as_str()));
    }
    if let Some(uri) = uri {
        elem.push_attribute(("uri", uri.as_str()));
    }
    if let Some(instructions) = instructions {
        elem.push_attribute(("instructions", instructions.as_str()));
    }
    start(writer, elem)?;

    match facet {
        Facet::Entity(f) => {
            write_value(writer, "name", &f.name)?;
            if let Some(predefined) = &f.predefined_type {
                write_value(writer, "predefinedType", predefined)?;
            }
        }
        Facet::Property(f) => {
            write_value(writer, "propertySet", &f.property_set)?;
            write_value(writer, "baseName", &f.base_name)?;
            if let Some(value) = &f.value {
                write_value(writer, "value", value)?;
            }
        }
        Facet::Attribute(f) => {
            write_value(writer, "name", &f.name)?;
            if let Some(value) = &f.value {
                write_value(writer, "value", value)?;
            }
        }
        Facet::Classification(f) => {
            if let Some(value) = &f.value {
                write_value(writer, "value", value)?;
            }
            if let Some(system) = &f.system {
                write_value(writer, "system", system)?;
            }
        }
        Facet::Material(f) => {
            if let Some(value) = &f.value {
                write_value(writer, "value", value)?;
            }
        }
        Facet::PartOf(f) => {
            start(writer, BytesStart::new("entity"))?;
            write_value(writer, "name", &f.entity)?;
            end(writer, "entity")?;
        }
    }

    end(writer, name)
}

fn write_value<W: IoWrite>(writer: &mut Writer<W>, name: &str, value: &Value) -> XmlResult {
    start(writer, BytesStart::new(name))?;

    if let Value::Simple { value } = value {
        text_element(writer, "simpleValue", value)?;
        return end(writer, name);
    }

    let base = if matches!(value, Value::Bounds(_)) {
        "xs:decimal"
    } else {
        "xs:string"
    };
    let mut restriction = BytesStart::new("xs:restriction");
    restriction.push_attribute(("base", base));
    start(writer, restriction)?;

    let mut facet = |name: &str, v: &str| {
        let mut elem = BytesStart::new(name);
        elem.push_attribute(("value", v));
        empty(writer, elem)
    };

    match value {
        Value::Simple { .. } => {}
        Value::Pattern { regex } => facet("xs:pattern", regex.as_str())?,
        Value::Enumeration { options } => {
            for option in options {
                facet("xs:enumeration", option)?;
            }
        }
        Value::Bounds(b) => {
            for (key, bound) in [
                ("xs:minInclusive", &b.min_inclusive),
                ("xs:minExclusive", &b.min_exclusive),
                ("xs:maxInclusive", &b.max_inclusive),
                ("xs:maxExclusive", &b.max_exclusive),
            ] {
                if let Some(bound) = bound {
                    facet(key, bound)?;
                }
            }
        }
        Value::Length(l) => {
            for (key, bound) in [
                ("xs:length", &l.length),
                ("xs:minLength", &l.min_length),
                ("xs:maxLength", &l.max_length),
            ] {
                if let Some(bound) = bound {
                    facet(key, bound)?;
                }
            }
        }
    }

    end(writer, "xs:restriction")?;
    end(writer, name)
}
