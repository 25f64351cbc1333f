//! Tabular IDS surrogate: a workbook of named sheets flattened into an [`IdsDocument`].
//!
//! A workbook is loaded from a spreadsheet file (`.xlsx`, `.xlsm`, `.xlsb`, `.xls` or
//! `.ods`) whose worksheets are named after the sheets, from a directory holding
//! one `<sheet>.csv` per sheet, or from a JSON object mapping sheet names to
//! arrays of row objects. The first row of every worksheet or CSV file holds
//! the column names.
//!
//! | sheet            | columns                                                          |
//! |------------------|------------------------------------------------------------------|
//! | `info`           | one row, columns named after the IDS info fields                 |
//! | `specifications` | `spec_id, name, ifc_version, identifier, description, instructions` |
//! | `applicability`  | `spec_id, facet, name, property_set, value`                      |
//! | `psets_lookup`   | `pset_name, property_name, data_type, value`                     |
//! | `element_psets`  | `spec_id, pset_name, cardinality, value`                         |
//!
//! `info` and `specifications` are required. Value cells use a small syntax:
//! `re:<regex>` is a pattern, `a|b|c` an enumeration, `min..max` inclusive
//! numeric bounds (either side may be empty) and anything else a literal.

use crate::error::ParseError;
use crate::model::value::parse_number;
use crate::model::{
    Bounds, Cardinality, ClassificationFacet, Facet, FacetKind, IdsDocument, MaterialFacet,
    PartOfFacet, PropertyFacet, Specification, Value,
};
use calamine::{open_workbook_auto, Data, Reader};
use std::collections::HashMap;
use std::path::Path;

pub const REQUIRED_SHEETS: [&str; 2] = ["info", "specifications"];
pub const OPTIONAL_SHEETS: [&str; 3] = ["applicability", "psets_lookup", "element_psets"];

/// Version assumed for specifications whose `ifc_version` cell is blank.
const DEFAULT_IFC_VERSION: &str = "IFC4";

/// File extensions read as spreadsheets.
pub const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

pub type Row = HashMap<String, String>;

/// Sheets by lowercase name; each row maps a lowercase column name to its cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    sheets: HashMap<String, Vec<Row>>,
}

/// The flattened document plus any non-fatal reference warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookImport {
    pub document: IdsDocument,
    pub warnings: Vec<String>,
}

impl Workbook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a sheet.
    pub fn insert_sheet<I>(&mut self, name: &str, rows: I)
    where
        I: IntoIterator<Item = Row>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(k, v)| (k.trim().to_ascii_lowercase(), v))
                    .collect()
            })
            .collect();
        self.sheets.insert(name.trim().to_ascii_lowercase(), rows);
    }

    #[must_use]
    pub fn sheet(&self, name: &str) -> Option<&[Row]> {
        self.sheets.get(name).map(Vec::as_slice)
    }

    /// Loads `<sheet>.csv` files from a directory. Unrelated files are ignored.
    pub fn from_csv_dir<P: AsRef<Path>>(dir: P) -> Result<Self, ParseError> {
        let dir = dir.as_ref();
        let mut workbook = Workbook::new();

        for sheet in REQUIRED_SHEETS.iter().chain(OPTIONAL_SHEETS.iter()) {
            let path = dir.join(format!("{sheet}.csv"));
            if !path.is_file() {
                continue;
            }
            let mut reader = csv::ReaderBuilder::new()
                .flexible(true)
                .trim(csv::Trim::All)
                .from_path(&path)?;
            let headers = reader.headers()?.clone();
            let mut rows = Vec::new();
            for record in reader.records() {
                let record = record?;
                let row: Row = headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, v)| (h.to_string(), v.to_string()))
                    .collect();
                rows.push(row);
            }
            workbook.insert_sheet(sheet, rows);
        }

        Ok(workbook)
    }

    /// Parses a JSON workbook: `{"sheet": [{"column": cell, ...}, ...], ...}`.
    ///
    /// Non-string cells (numbers, booleans) are stringified; `null` is blank.
    pub fn from_json(text: &str) -> Result<Self, ParseError> {
        let root: serde_json::Value = serde_json::from_str(text)?;
        let serde_json::Value::Object(sheets) = root else {
            return Err(ParseError::InvalidWorkbook {
                message: "expected a JSON object of sheets".to_string(),
            });
        };

        let mut workbook = Workbook::new();
        for (name, rows) in sheets {
            let serde_json::Value::Array(rows) = rows else {
                return Err(ParseError::InvalidWorkbook {
                    message: format!("sheet '{name}' is not an array of rows"),
                });
            };
            let mut parsed = Vec::with_capacity(rows.len());
            for row in rows {
                let serde_json::Value::Object(cells) = row else {
                    return Err(ParseError::InvalidWorkbook {
                        message: format!("sheet '{name}' has a row that is not an object"),
                    });
                };
                parsed.push(
                    cells
                        .into_iter()
                        .map(|(column, cell)| (column, json_cell(cell)))
                        .collect(),
                );
            }
            workbook.insert_sheet(&name, parsed);
        }
        Ok(workbook)
    }

    /// Reads every worksheet of a spreadsheet. Columns without a header and
    /// rows without any value are dropped.
    pub fn from_spreadsheet<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let mut spreadsheet = open_workbook_auto(path)?;
        let mut workbook = Workbook::new();

        for name in spreadsheet.sheet_names() {
            let range = spreadsheet.worksheet_range(&name)?;
            let mut rows = range.rows();
            let Some(headers) = rows.next() else {
                workbook.insert_sheet(&name, []);
                continue;
            };
            let headers: Vec<String> = headers.iter().map(spreadsheet_cell).collect();
            let parsed: Vec<Row> = rows
                .filter(|cells| cells.iter().any(|c| !matches!(c, Data::Empty)))
                .map(|cells| {
                    headers
                        .iter()
                        .zip(cells)
                        .filter(|(header, _)| !header.trim().is_empty())
                        .map(|(header, cell)| (header.clone(), spreadsheet_cell(cell)))
                        .collect()
                })
                .collect();
            workbook.insert_sheet(&name, parsed);
        }

        tracing::debug!(sheets = workbook.sheets.len(), "spreadsheet workbook read");
        Ok(workbook)
    }

    /// Loads from a CSV directory, a spreadsheet or a `.json` file. Files are
    /// told apart by extension; anything that is not a spreadsheet is JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let path_ref = path.as_ref();
        if path_ref.is_dir() {
            return Self::from_csv_dir(path_ref);
        }
        let is_spreadsheet = path_ref
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SPREADSHEET_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)));
        if is_spreadsheet {
            return Self::from_spreadsheet(path_ref);
        }
        let text = std::fs::read_to_string(path_ref).map_err(|source| ParseError::FileRead {
            path: path_ref.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

/// Whole numbers lose their trailing `.0`, as in the JSON reader; empty
/// cells are blank.
fn spreadsheet_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        other => other.to_string(),
    }
}

fn json_cell(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

fn cell<'a>(row: &'a Row, column: &str) -> &'a str {
    row.get(column).map_or("", |v| v.trim())
}

fn optional_cell(row: &Row, column: &str) -> Option<String> {
    let value = cell(row, column);
    (!value.is_empty()).then(|| value.to_string())
}

/// Interprets a value cell. Blank cells carry no value.
#[must_use]
pub fn parse_cell(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(regex) = text.strip_prefix("re:") {
        return Some(Value::pattern(regex));
    }
    if text.contains('|') {
        return Some(Value::enumeration(
            text.split('|').map(str::trim).filter(|o| !o.is_empty()),
        ));
    }
    if let Some((min, max)) = text.split_once("..") {
        let (min, max) = (min.trim(), max.trim());
        let numeric = |s: &str| s.is_empty() || parse_number(s).is_some();
        if (!min.is_empty() || !max.is_empty()) && numeric(min) && numeric(max) {
            return Some(Value::Bounds(Bounds {
                min_inclusive: (!min.is_empty()).then(|| min.to_string()),
                max_inclusive: (!max.is_empty()).then(|| max.to_string()),
                ..Bounds::default()
            }));
        }
    }
    Some(Value::simple(text))
}

#[derive(Debug)]
struct LookupProperty {
    name: String,
    data_type: Option<String>,
    value: Option<Value>,
}

/// Flattens a workbook into an IDS document.
///
/// Missing required sheets fail before any row is read. Rows that reference an
/// unknown specification id or property set are skipped and reported in
/// [`WorkbookImport::warnings`].
pub fn parse_workbook(workbook: &Workbook) -> Result<WorkbookImport, ParseError> {
    for sheet in REQUIRED_SHEETS {
        if workbook.sheet(sheet).is_none() {
            return Err(ParseError::MissingSheet {
                sheet: sheet.to_string(),
            });
        }
    }

    let mut warnings = Vec::new();
    let mut document = IdsDocument::default();

    if let Some(row) = workbook.sheet("info").and_then(<[Row]>::first) {
        let mut fields: Vec<_> = row.iter().collect();
        fields.sort();
        for (column, value) in fields {
            let value = value.trim();
            if !value.is_empty() {
                document.info.set(column, value.to_string());
            }
        }
    }

    // spec_id → index into document.specifications
    let mut spec_index: HashMap<String, usize> = HashMap::new();
    for (i, row) in workbook.sheet("specifications").unwrap_or_default().iter().enumerate() {
        let spec_id = optional_cell(row, "spec_id").unwrap_or_else(|| (i + 1).to_string());
        let name = optional_cell(row, "name").unwrap_or_else(|| spec_id.clone());
        let ifc_version =
            optional_cell(row, "ifc_version").unwrap_or_else(|| DEFAULT_IFC_VERSION.to_string());

        let mut spec = Specification::new(name, ifc_version);
        spec.identifier = optional_cell(row, "identifier");
        spec.description = optional_cell(row, "description");
        spec.instructions = optional_cell(row, "instructions");

        if spec_index.contains_key(&spec_id) {
            warn(&mut warnings, format!("specifications row {}: duplicate spec_id '{spec_id}'", i + 2));
            continue;
        }
        spec_index.insert(spec_id, document.specifications.len());
        document.specifications.push(spec);
    }

    for (i, row) in workbook.sheet("applicability").unwrap_or_default().iter().enumerate() {
        let line = i + 2;
        let spec_id = cell(row, "spec_id");
        let Some(&target) = spec_index.get(spec_id) else {
            warn(&mut warnings, format!("applicability row {line}: unknown spec_id '{spec_id}'"));
            continue;
        };
        let kind_name = cell(row, "facet");
        let Some(kind) = FacetKind::from_element_name(kind_name) else {
            warn(&mut warnings, format!("applicability row {line}: unknown facet '{kind_name}'"));
            continue;
        };
        document.specifications[target]
            .applicability
            .push(applicability_facet(kind, row));
    }

    let mut lookup: HashMap<String, Vec<LookupProperty>> = HashMap::new();
    for row in workbook.sheet("psets_lookup").unwrap_or_default() {
        let pset = cell(row, "pset_name");
        let property = cell(row, "property_name");
        if pset.is_empty() || property.is_empty() {
            continue;
        }
        lookup.entry(pset.to_string()).or_default().push(LookupProperty {
            name: property.to_string(),
            data_type: optional_cell(row, "data_type"),
            value: parse_cell(cell(row, "value")),
        });
    }

    for (i, row) in workbook.sheet("element_psets").unwrap_or_default().iter().enumerate() {
        let line = i + 2;
        let spec_id = cell(row, "spec_id");
        let Some(&target) = spec_index.get(spec_id) else {
            warn(&mut warnings, format!("element_psets row {line}: unknown spec_id '{spec_id}'"));
            continue;
        };
        let pset = cell(row, "pset_name");
        let Some(properties) = lookup.get(pset) else {
            warn(&mut warnings, format!("element_psets row {line}: unknown property set '{pset}'"));
            continue;
        };

        let cardinality = Cardinality::parse_or_default(cell(row, "cardinality"));
        let override_value = parse_cell(cell(row, "value"));
        for property in properties {
            document.specifications[target]
                .requirements
                .push(Facet::Property(PropertyFacet {
                    property_set: Value::simple(pset),
                    base_name: Value::simple(property.name.as_str()),
                    value: override_value.clone().or_else(|| property.value.clone()),
                    data_type: property.data_type.clone(),
                    cardinality,
                    uri: None,
                    instructions: None,
                }));
        }
    }

    tracing::info!(
        specifications = document.specifications.len(),
        warnings = warnings.len(),
        "flattened workbook"
    );
    Ok(WorkbookImport { document, warnings })
}

fn warn(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("{message}");
    warnings.push(message);
}

/// Builds an applicability facet from a row. `name` holds the primary value,
/// `property_set` the pset for property facets and `value` the restriction
/// (the relation, for `partOf`).
fn applicability_facet(kind: FacetKind, row: &Row) -> Facet {
    let name = parse_cell(cell(row, "name")).unwrap_or_else(|| Value::simple(""));
    let value = parse_cell(cell(row, "value"));

    match kind {
        FacetKind::Entity => Facet::entity(name),
        FacetKind::Property => Facet::property(
            parse_cell(cell(row, "property_set")).unwrap_or_else(|| Value::simple("")),
            name,
            value,
        ),
        FacetKind::Attribute => Facet::attribute(name, value),
        FacetKind::Classification => Facet::Classification(ClassificationFacet {
            system: (!name.is_empty()).then_some(name),
            value,
            cardinality: Cardinality::Required,
            uri: None,
            instructions: None,
        }),
        FacetKind::Material => Facet::Material(MaterialFacet {
            value: value.or_else(|| (!name.is_empty()).then_some(name)),
            cardinality: Cardinality::Required,
            uri: None,
            instructions: None,
        }),
        FacetKind::PartOf => Facet::PartOf(PartOfFacet {
            entity: name,
            relation: cell(row, "value").parse().ok(),
            cardinality: Cardinality::Required,
            instructions: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[(&str, &str)]) -> Row {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.insert_sheet("info", [row(&[("title", "Walls"), ("author", "bim@example.com")])]);
        wb.insert_sheet(
            "specifications",
            [row(&[("spec_id", "S1"), ("name", "Wall data"), ("ifc_version", "IFC4")])],
        );
        wb.insert_sheet(
            "applicability",
            [row(&[("spec_id", "S1"), ("facet", "entity"), ("name", "IFCWALL")])],
        );
        wb.insert_sheet(
            "psets_lookup",
            [
                row(&[("pset_name", "Pset_WallCommon"), ("property_name", "FireRating"), ("value", "REI30|REI60")]),
                row(&[("pset_name", "Pset_WallCommon"), ("property_name", "IsExternal")]),
            ],
        );
        wb.insert_sheet(
            "element_psets",
            [row(&[("spec_id", "S1"), ("pset_name", "Pset_WallCommon")])],
        );
        wb
    }

    #[test]
    fn flattens_psets_into_requirements() {
        let import = parse_workbook(&workbook()).unwrap();
        assert!(import.warnings.is_empty());
        assert_eq!(import.document.info.title.as_deref(), Some("Walls"));

        let spec = &import.document.specifications[0];
        assert_eq!(spec.name, "Wall data");
        assert_eq!(spec.applicability, vec![Facet::entity(Value::simple("IFCWALL"))]);
        assert_eq!(
            spec.requirements,
            vec![
                Facet::property(
                    Value::simple("Pset_WallCommon"),
                    Value::simple("FireRating"),
                    Some(Value::enumeration(["REI30", "REI60"])),
                ),
                Facet::property(Value::simple("Pset_WallCommon"), Value::simple("IsExternal"), None),
            ]
        );
    }

    #[test]
    fn missing_required_sheet_fails_fast() {
        let mut wb = Workbook::new();
        wb.insert_sheet("info", []);
        let err = parse_workbook(&wb).unwrap_err();
        assert!(matches!(err, ParseError::MissingSheet { sheet } if sheet == "specifications"));
    }

    #[test]
    fn unknown_references_are_warnings() {
        let mut wb = workbook();
        wb.insert_sheet(
            "element_psets",
            [
                row(&[("spec_id", "S1"), ("pset_name", "Pset_Unknown")]),
                row(&[("spec_id", "S9"), ("pset_name", "Pset_WallCommon")]),
            ],
        );
        let import = parse_workbook(&wb).unwrap();
        assert_eq!(import.warnings.len(), 2);
        assert!(import.document.specifications[0].requirements.is_empty());
    }

    #[test]
    fn row_override_wins_over_lookup() {
        let mut wb = workbook();
        wb.insert_sheet(
            "element_psets",
            [row(&[("spec_id", "S1"), ("pset_name", "Pset_WallCommon"), ("cardinality", "optional"), ("value", "re:^REI")])],
        );
        let import = parse_workbook(&wb).unwrap();
        let requirements = &import.document.specifications[0].requirements;
        assert_eq!(requirements.len(), 2);
        assert!(requirements.iter().all(|f| f.cardinality() == Cardinality::Optional));
        let Facet::Property(first) = &requirements[0] else {
            panic!("expected property facet");
        };
        assert_eq!(first.value, Some(Value::pattern("^REI")));
    }

    #[test]
    fn cell_syntax() {
        assert_eq!(parse_cell(""), None);
        assert_eq!(parse_cell("REI60"), Some(Value::simple("REI60")));
        assert_eq!(parse_cell("re:[0-9]+"), Some(Value::pattern("[0-9]+")));
        assert_eq!(parse_cell("a | b"), Some(Value::enumeration(["a", "b"])));
        assert_eq!(
            parse_cell("0..0.3"),
            Some(Value::Bounds(Bounds {
                min_inclusive: Some("0".into()),
                max_inclusive: Some("0.3".into()),
                ..Bounds::default()
            }))
        );
        assert_eq!(parse_cell("a..b"), Some(Value::simple("a..b")));
    }

    #[test]
    fn json_workbook() {
        let json = r#"{
            "info": [{"title": "From JSON", "version": 2}],
            "specifications": [{"spec_id": 1, "name": "Doors", "ifc_version": null}]
        }"#;
        let import = parse_workbook(&Workbook::from_json(json).unwrap()).unwrap();
        assert_eq!(import.document.info.version.as_deref(), Some("2"));
        assert_eq!(import.document.specifications[0].ifc_version, "IFC4");
    }

    #[test]
    fn json_must_be_sheet_map() {
        assert!(matches!(
            Workbook::from_json("[1, 2]"),
            Err(ParseError::InvalidWorkbook { .. })
        ));
    }

    #[test]
    fn spreadsheet_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.xlsx");
        let mut xlsx = rust_xlsxwriter::Workbook::new();
        let info = xlsx.add_worksheet().set_name("Info").unwrap();
        info.write_string(0, 0, "title").unwrap();
        info.write_string(0, 1, "version").unwrap();
        info.write_string(1, 0, "From XLSX").unwrap();
        info.write_number(1, 1, 3).unwrap();
        let specs = xlsx.add_worksheet().set_name("specifications").unwrap();
        for (col, header) in (0u16..).zip(["spec_id", "name", "", "ifc_version"]) {
            specs.write_string(0, col, header).unwrap();
        }
        specs.write_number(1, 0, 1).unwrap();
        specs.write_string(1, 1, "Slabs").unwrap();
        specs.write_string(1, 2, "ignored").unwrap();
        specs.write_string(1, 3, "IFC4X3").unwrap();
        xlsx.save(&path).unwrap();

        let workbook = Workbook::load(&path).unwrap();
        assert_eq!(workbook.sheet("specifications").unwrap()[0].get(""), None);
        let import = parse_workbook(&workbook).unwrap();
        assert_eq!(import.document.info.title.as_deref(), Some("From XLSX"));
        assert_eq!(import.document.info.version.as_deref(), Some("3"));
        assert_eq!(import.document.specifications[0].name, "Slabs");
        assert_eq!(import.document.specifications[0].ifc_version, "IFC4X3");
    }

    #[test]
    fn spreadsheet_extension_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.XLSX");
        std::fs::write(&path, "not a zip").unwrap();
        assert!(matches!(Workbook::load(&path), Err(ParseError::Spreadsheet { .. })));
    }

    #[test]
    fn csv_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("info.csv"), "title\nCSV IDS\n").unwrap();
        std::fs::write(
            dir.path().join("specifications.csv"),
            "spec_id,name,ifc_version\nS1,Walls,IFC2X3\n",
        )
        .unwrap();
        let import = parse_workbook(&Workbook::load(dir.path()).unwrap()).unwrap();
        assert_eq!(import.document.info.title.as_deref(), Some("CSV IDS"));
        assert_eq!(import.document.specifications[0].ifc_version, "IFC2X3");
    }
}
