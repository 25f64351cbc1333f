use ids_inspector::ids::{parse_ids, parse_workbook, Workbook};
use ids_inspector::model::{Facet, Value};
use pretty_assertions::assert_eq;

const IDS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ids xmlns="http://standards.buildingsmart.org/IDS" xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <info>
    <title>Fire safety</title>
    <version>1.0</version>
  </info>
  <specifications>
    <specification name="Fire-rated walls" ifcVersion="IFC4">
      <applicability minOccurs="1" maxOccurs="unbounded">
        <entity><name><simpleValue>IFCWALL</simpleValue></name></entity>
      </applicability>
      <requirements>
        <property cardinality="required">
          <propertySet><simpleValue>Pset_WallCommon</simpleValue></propertySet>
          <baseName><simpleValue>FireRating</simpleValue></baseName>
          <value>
            <xs:restriction base="xs:string">
              <xs:enumeration value="REI30"/>
              <xs:enumeration value="REI60"/>
            </xs:restriction>
          </value>
        </property>
        <attribute>
          <name><simpleValue>Name</simpleValue></name>
          <value><xs:restriction base="xs:string"><xs:pattern value="^W-"/></xs:restriction></value>
        </attribute>
        <property>
          <propertySet><simpleValue>Qto_WallBaseQuantities</simpleValue></propertySet>
          <baseName><simpleValue>Width</simpleValue></baseName>
          <value><xs:restriction base="xs:decimal"><xs:minInclusive value="0.1"/></xs:restriction></value>
        </property>
        <material><value><simpleValue>Concrete</simpleValue></value></material>
      </requirements>
    </specification>
  </specifications>
</ids>
"#;

fn restriction_kinds(facets: &[Facet]) -> Vec<Vec<&'static str>> {
    facets
        .iter()
        .map(|f| f.values().iter().map(|v| v.kind()).collect())
        .collect()
}

#[test]
fn written_ids_reads_back_the_same() {
    let document = parse_ids(IDS).unwrap();
    let xml = document.to_xml().unwrap();
    let reread = parse_ids(&xml).unwrap();

    let (before, after) = (&document.specifications[0], &reread.specifications[0]);
    assert_eq!(after.name, before.name);
    assert_eq!(after.ifc_version, before.ifc_version);
    assert_eq!(after.requirements.len(), 4);
    assert_eq!(restriction_kinds(&after.requirements), restriction_kinds(&before.requirements));
    assert_eq!(reread, document);
}

#[test]
fn malformed_xml_is_an_error() {
    let broken = IDS.replace("</specifications>", "");
    assert!(parse_ids(&broken).is_err());
}

#[test]
fn workbook_with_unknown_pset_warns_and_skips() {
    let json = r#"{
        "info": [{ "title": "Walls" }],
        "specifications": [{ "spec_id": "S1", "name": "Wall data", "ifc_version": "IFC4" }],
        "applicability": [{ "spec_id": "S1", "facet": "entity", "name": "IFCWALL" }],
        "psets_lookup": [
            { "pset_name": "Pset_WallCommon", "property_name": "FireRating", "value": "REI30|REI60" }
        ],
        "element_psets": [
            { "spec_id": "S1", "pset_name": "Pset_WallCommon" },
            { "spec_id": "S1", "pset_name": "Pset_Missing" }
        ]
    }"#;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("walls.json");
    std::fs::write(&path, json).unwrap();

    let import = parse_workbook(&Workbook::load(&path).unwrap()).unwrap();
    assert!(!import.warnings.is_empty());

    let requirements = &import.document.specifications[0].requirements;
    assert_eq!(
        requirements,
        &vec![Facet::property(
            Value::simple("Pset_WallCommon"),
            Value::simple("FireRating"),
            Some(Value::enumeration(["REI30", "REI60"])),
        )]
    );
}

#[test]
fn workbook_csv_directory_loads() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("info.csv"), "title,author\nDoors,bim@example.com\n").unwrap();
    std::fs::write(
        dir.path().join("specifications.csv"),
        "spec_id,name,ifc_version\nS1,Door data,\n",
    )
    .unwrap();

    let import = parse_workbook(&Workbook::load(dir.path()).unwrap()).unwrap();
    let spec = &import.document.specifications[0];
    assert_eq!(spec.name, "Door data");
    assert_eq!(spec.ifc_version, "IFC4");
    assert!(spec.applicability.is_empty());
}
