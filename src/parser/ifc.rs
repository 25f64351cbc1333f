use crate::config::DEFAULT_PARSE_CHUNK;
use crate::error::ParseError;
use crate::model::{ClassificationRef, Entity, ParentRef};
use crate::parser::step::{
    parse_file_schema, parse_params, parse_record, references_in, QuotedStrings, RawStepRecord,
    StepValue,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::path::Path;
use std::str::Lines;

/// Relationships whose children get a [`ParentRef`]: (type, parent param, children param).
const PARENT_RELATIONS: &[(&str, usize, usize)] = &[
    ("IFCRELAGGREGATES", 4, 5),
    ("IFCRELNESTS", 4, 5),
    ("IFCRELCONTAINEDINSPATIALSTRUCTURE", 5, 4),
    ("IFCRELVOIDSELEMENT", 4, 5),
    ("IFCRELFILLSELEMENT", 4, 5),
    ("IFCRELASSIGNSTOGROUP", 6, 4),
];

/// Recursion limit when walking material and classification definitions.
const MAX_LINK_DEPTH: usize = 6;

/// A parsed IFC file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfcModel {
    pub file_name: String,
    pub schema: String,
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParsePhase {
    /// Reading lines into raw records.
    Scan,
    /// Resolving property sets and relationships.
    Resolve,
    /// Building entities.
    Assemble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseProgress {
    pub phase: ParsePhase,
    pub processed: usize,
    pub total: usize,
}

#[derive(Debug)]
pub enum ParseStatus {
    Pending(ParseProgress),
    Done(IfcModel),
}

#[derive(Debug, Default)]
struct PropertySet {
    name: String,
    properties: HashMap<String, String>,
}

/// Links collected during the resolve phase, keyed by the related object's id.
#[derive(Debug, Default)]
struct Relations {
    property_sets: HashMap<u64, PropertySet>,
    defined_by: HashMap<u64, Vec<u64>>,
    typed_by: HashMap<u64, u64>,
    materials: HashMap<u64, Vec<String>>,
    classifications: HashMap<u64, Vec<ClassificationRef>>,
    parents: HashMap<u64, Vec<(String, u64)>>,
}

/// Incremental IFC parser.
///
/// Each call to [`IfcParser::step`] does a bounded amount of work (at most
/// `chunk_size` lines or records) so a single-threaded host can interleave
/// parsing with other work. The three phases are chunked independently.
pub struct IfcParser<'a> {
    file_name: String,
    chunk_size: usize,
    lines: Lines<'a>,
    total_lines: usize,
    lines_read: usize,
    pending: Option<String>,
    schema: String,
    phase: ParsePhase,
    records: Vec<RawStepRecord>,
    index: HashMap<u64, usize>,
    cursor: usize,
    relations: Relations,
    entities: Vec<Entity>,
}

impl<'a> IfcParser<'a> {
    #[must_use]
    pub fn new(content: &'a str, file_name: impl Into<String>) -> Self {
        Self::with_chunk_size(content, file_name, DEFAULT_PARSE_CHUNK)
    }

    #[must_use]
    pub fn with_chunk_size(content: &'a str, file_name: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            file_name: file_name.into(),
            chunk_size: chunk_size.max(1),
            lines: content.lines(),
            total_lines: content.lines().count(),
            lines_read: 0,
            pending: None,
            schema: String::new(),
            phase: ParsePhase::Scan,
            records: Vec::new(),
            index: HashMap::new(),
            cursor: 0,
            relations: Relations::default(),
            entities: Vec::new(),
        }
    }

    /// Runs one chunk of work.
    ///
    /// Returns `Done` once; the model is moved out, so stepping again after
    /// that yields an empty model.
    pub fn step(&mut self) -> ParseStatus {
        match self.phase {
            ParsePhase::Scan => self.scan_chunk(),
            ParsePhase::Resolve => self.resolve_chunk(),
            ParsePhase::Assemble => self.assemble_chunk(),
        }
    }

    /// Steps to completion.
    pub fn run(mut self) -> IfcModel {
        loop {
            if let ParseStatus::Done(model) = self.step() {
                return model;
            }
        }
    }

    fn scan_chunk(&mut self) -> ParseStatus {
        for _ in 0..self.chunk_size {
            let Some(line) = self.lines.next() else {
                // A record still open at EOF is malformed and dropped
                self.pending = None;
                tracing::debug!(
                    file = %self.file_name,
                    records = self.records.len(),
                    "scan complete"
                );
                self.phase = ParsePhase::Resolve;
                self.cursor = 0;
                return progress(ParsePhase::Scan, self.total_lines, self.total_lines);
            };
            self.lines_read += 1;
            self.scan_line(line);
        }
        progress(ParsePhase::Scan, self.lines_read, self.total_lines)
    }

    fn scan_line(&mut self, line: &str) {
        let trimmed = line.trim();

        if let Some(mut buffer) = self.pending.take() {
            if starts_record(trimmed) {
                // The open record never terminated; drop it and start over
                tracing::debug!(file = %self.file_name, "skipping unterminated record");
                self.scan_line(line);
                return;
            }
            buffer.push_str(trimmed);
            if trimmed.ends_with(';') {
                self.push_record(&buffer);
            } else {
                self.pending = Some(buffer);
            }
            return;
        }

        if starts_record(trimmed) {
            if trimmed.ends_with(';') || trimmed.ends_with(')') {
                self.push_record(trimmed);
            } else {
                self.pending = Some(trimmed.to_string());
            }
        } else if self.schema.is_empty() {
            if let Some(schema) = parse_file_schema(trimmed) {
                self.schema = schema;
            }
        }
    }

    fn push_record(&mut self, text: &str) {
        if let Some(record) = parse_record(text) {
            self.index.insert(record.id, self.records.len());
            self.records.push(record);
        }
    }

    fn resolve_chunk(&mut self) -> ParseStatus {
        let end = (self.cursor + self.chunk_size).min(self.records.len());
        for i in self.cursor..end {
            self.resolve_record(i);
        }
        self.cursor = end;

        if self.cursor >= self.records.len() {
            tracing::debug!(
                file = %self.file_name,
                property_sets = self.relations.property_sets.len(),
                "relations resolved"
            );
            self.phase = ParsePhase::Assemble;
            self.cursor = 0;
        }
        progress(ParsePhase::Resolve, end, self.records.len())
    }

    fn resolve_record(&mut self, i: usize) {
        let record = &self.records[i];
        let entity_type = record.entity_type.as_str();

        match entity_type {
            "IFCPROPERTYSET" | "IFCELEMENTQUANTITY" => {
                let pset = self.resolve_property_set(record);
                self.relations.property_sets.insert(record.id, pset);
            }
            "IFCRELDEFINESBYPROPERTIES" => {
                let params = parse_params(&record.params);
                let relating = params.get(5).and_then(StepValue::as_reference);
                if let Some(pset_id) = relating {
                    for object_id in params.get(4).map(StepValue::references).unwrap_or_default() {
                        self.relations
                            .defined_by
                            .entry(object_id)
                            .or_default()
                            .push(pset_id);
                    }
                }
            }
            "IFCRELDEFINESBYTYPE" => {
                let params = parse_params(&record.params);
                if let Some(type_id) = params.get(5).and_then(StepValue::as_reference) {
                    for object_id in params.get(4).map(StepValue::references).unwrap_or_default() {
                        self.relations.typed_by.insert(object_id, type_id);
                    }
                }
            }
            "IFCRELASSOCIATESMATERIAL" => {
                let params = parse_params(&record.params);
                if let Some(material_id) = params.get(5).and_then(StepValue::as_reference) {
                    let mut names = Vec::new();
                    let mut seen = HashSet::new();
                    self.collect_material_names(material_id, 0, &mut seen, &mut names);
                    for object_id in params.get(4).map(StepValue::references).unwrap_or_default() {
                        let entry = self.relations.materials.entry(object_id).or_default();
                        for name in &names {
                            if !entry.contains(name) {
                                entry.push(name.clone());
                            }
                        }
                    }
                }
            }
            "IFCRELASSOCIATESCLASSIFICATION" => {
                let params = parse_params(&record.params);
                let classification = params
                    .get(5)
                    .and_then(StepValue::as_reference)
                    .and_then(|id| self.resolve_classification(id));
                if let Some(classification) = classification {
                    for object_id in params.get(4).map(StepValue::references).unwrap_or_default() {
                        self.relations
                            .classifications
                            .entry(object_id)
                            .or_default()
                            .push(classification.clone());
                    }
                }
            }
            _ => {
                let Some(&(relation, parent_idx, children_idx)) =
                    PARENT_RELATIONS.iter().find(|(t, _, _)| *t == entity_type)
                else {
                    return;
                };
                let params = parse_params(&record.params);
                if let Some(parent_id) = params.get(parent_idx).and_then(StepValue::as_reference) {
                    for child_id in params
                        .get(children_idx)
                        .map(StepValue::references)
                        .unwrap_or_default()
                    {
                        self.relations
                            .parents
                            .entry(child_id)
                            .or_default()
                            .push((relation.to_string(), parent_id));
                    }
                }
            }
        }
    }

    fn record(&self, id: u64) -> Option<&RawStepRecord> {
        self.index.get(&id).map(|&i| &self.records[i])
    }

    fn resolve_property_set(&self, record: &RawStepRecord) -> PropertySet {
        let params = parse_params(&record.params);
        let name = params
            .get(2)
            .and_then(StepValue::as_str)
            .unwrap_or_default()
            .to_string();
        // IfcPropertySet.HasProperties / IfcElementQuantity.Quantities
        let members_idx = if record.entity_type == "IFCELEMENTQUANTITY" { 5 } else { 4 };

        let mut properties = HashMap::new();
        for member_id in params
            .get(members_idx)
            .map(StepValue::references)
            .unwrap_or_default()
        {
            let Some(member) = self.record(member_id) else {
                continue;
            };
            let member_params = parse_params(&member.params);
            let Some(prop_name) = member_params.first().and_then(StepValue::as_str) else {
                continue;
            };
            let value_idx = match member.entity_type.as_str() {
                "IFCPROPERTYSINGLEVALUE" | "IFCPROPERTYENUMERATEDVALUE" => 2,
                t if t.starts_with("IFCQUANTITY") => 3,
                _ => continue,
            };
            let value = member_params
                .get(value_idx)
                .map(StepValue::to_property_string)
                .unwrap_or_default();
            if !prop_name.is_empty() {
                properties.insert(prop_name.to_string(), value);
            }
        }

        PropertySet { name, properties }
    }

    fn collect_material_names(
        &self,
        id: u64,
        depth: usize,
        seen: &mut HashSet<u64>,
        names: &mut Vec<String>,
    ) {
        if depth > MAX_LINK_DEPTH || !seen.insert(id) {
            return;
        }
        let Some(record) = self.record(id) else {
            return;
        };
        let is_named = record.entity_type == "IFCMATERIAL"
            || (record.entity_type.starts_with("IFCMATERIAL") && record.entity_type.ends_with("SET"));
        if is_named {
            if let Some(name) = QuotedStrings::new(&record.params).next() {
                if !name.is_empty() && !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        if record.entity_type == "IFCMATERIAL" {
            return;
        }
        for child in references_in(&record.params) {
            self.collect_material_names(child, depth + 1, seen, names);
        }
    }

    fn resolve_classification(&self, id: u64) -> Option<ClassificationRef> {
        let record = self.record(id)?;
        let params = parse_params(&record.params);
        match record.entity_type.as_str() {
            "IFCCLASSIFICATIONREFERENCE" => {
                // Location, Identification (ItemReference in IFC2X3), Name, ReferencedSource
                let identification = params
                    .get(1)
                    .and_then(StepValue::as_str)
                    .filter(|s| !s.is_empty())
                    .or_else(|| params.get(2).and_then(StepValue::as_str))
                    .unwrap_or_default()
                    .to_string();
                let system = params
                    .get(3)
                    .and_then(StepValue::as_reference)
                    .and_then(|source| self.classification_system(source, 0))
                    .unwrap_or_default();
                Some(ClassificationRef {
                    system,
                    identification,
                })
            }
            "IFCCLASSIFICATION" => Some(ClassificationRef {
                system: params
                    .get(3)
                    .and_then(StepValue::as_str)
                    .unwrap_or_default()
                    .to_string(),
                identification: String::new(),
            }),
            _ => None,
        }
    }

    /// Walks `ReferencedSource` links up to the owning `IFCCLASSIFICATION`.
    fn classification_system(&self, id: u64, depth: usize) -> Option<String> {
        if depth > MAX_LINK_DEPTH {
            return None;
        }
        let record = self.record(id)?;
        let params = parse_params(&record.params);
        match record.entity_type.as_str() {
            "IFCCLASSIFICATION" => params.get(3).and_then(StepValue::as_str).map(String::from),
            "IFCCLASSIFICATIONREFERENCE" => params
                .get(3)
                .and_then(StepValue::as_reference)
                .and_then(|parent| self.classification_system(parent, depth + 1)),
            _ => None,
        }
    }

    fn assemble_chunk(&mut self) -> ParseStatus {
        let end = (self.cursor + self.chunk_size).min(self.records.len());
        for i in self.cursor..end {
            if let Some(entity) = self.build_entity(&self.records[i]) {
                self.entities.push(entity);
            }
        }
        self.cursor = end;

        if self.cursor < self.records.len() {
            return progress(ParsePhase::Assemble, end, self.records.len());
        }

        tracing::info!(
            file = %self.file_name,
            schema = %self.schema,
            entities = self.entities.len(),
            "IFC parse complete"
        );
        self.records.clear();
        self.index.clear();
        self.relations = Relations::default();
        ParseStatus::Done(IfcModel {
            file_name: self.file_name.clone(),
            schema: std::mem::take(&mut self.schema),
            entities: std::mem::take(&mut self.entities),
        })
    }

    fn build_entity(&self, record: &RawStepRecord) -> Option<Entity> {
        if !is_entity_candidate(&record.entity_type) {
            return None;
        }

        let mut strings = QuotedStrings::new(&record.params);
        let guid = strings.next()?;
        if guid.is_empty() {
            return None;
        }

        let mut entity = Entity::new(
            record.id,
            guid.clone(),
            record.entity_type.clone(),
            self.file_name.clone(),
        );
        entity.attributes.insert("GlobalId".to_string(), guid);
        if let Some(name) = strings.next() {
            entity.attributes.insert("Name".to_string(), name.clone());
            entity.name = name;
        }
        let params = parse_params(&record.params);
        // IfcRoot.Description is positional
        if let Some(StepValue::String(description)) = params.get(3) {
            entity
                .attributes
                .insert("Description".to_string(), description.clone());
        }
        if let Some(predefined) = predefined_type(&params) {
            entity
                .attributes
                .insert("PredefinedType".to_string(), predefined.to_string());
        }

        self.attach_property_sets(record, &mut entity);

        if let Some(materials) = self.relations.materials.get(&record.id) {
            entity.materials.clone_from(materials);
        }
        if let Some(classifications) = self.relations.classifications.get(&record.id) {
            entity.classifications.clone_from(classifications);
        }
        if let Some(parents) = self.relations.parents.get(&record.id) {
            entity.parents = parents
                .iter()
                .filter_map(|(relation, parent_id)| {
                    let parent = self.record(*parent_id)?;
                    Some(ParentRef {
                        relation: relation.clone(),
                        entity_type: parent.entity_type.clone(),
                        guid: QuotedStrings::new(&parent.params).next().unwrap_or_default(),
                    })
                })
                .collect();
        }

        Some(entity)
    }

    /// Type property sets first, then occurrence sets overriding them.
    fn attach_property_sets(&self, record: &RawStepRecord, entity: &mut Entity) {
        let mut pset_ids = Vec::new();

        let type_record = self
            .relations
            .typed_by
            .get(&record.id)
            .and_then(|type_id| self.record(*type_id));
        if let Some(type_record) = type_record {
            pset_ids.extend(type_property_sets(type_record));
        }
        if is_type_object(&record.entity_type) {
            pset_ids.extend(type_property_sets(record));
        }
        if let Some(ids) = self.relations.defined_by.get(&record.id) {
            pset_ids.extend(ids.iter().copied());
        }

        for pset_id in pset_ids {
            let Some(pset) = self.relations.property_sets.get(&pset_id) else {
                continue;
            };
            entity
                .property_sets
                .entry(pset.name.clone())
                .or_default()
                .extend(pset.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
}

fn progress(phase: ParsePhase, processed: usize, total: usize) -> ParseStatus {
    ParseStatus::Pending(ParseProgress {
        phase,
        processed,
        total,
    })
}

/// True for lines opening a `#id=` data record.
fn starts_record(line: &str) -> bool {
    line.strip_prefix('#').is_some_and(|rest| {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        digits > 0 && rest[digits..].trim_start().starts_with('=')
    })
}

/// Object records become entities; relationships, property definitions and
/// quantities do not.
fn is_entity_candidate(entity_type: &str) -> bool {
    entity_type.starts_with("IFC")
        && !entity_type.contains("REL")
        && !entity_type.contains("PROPERTY")
        && !entity_type.contains("QUANTITY")
}

fn is_type_object(entity_type: &str) -> bool {
    entity_type.ends_with("TYPE") || entity_type.ends_with("STYLE")
}

/// IfcTypeObject.HasPropertySets
fn type_property_sets(record: &RawStepRecord) -> Vec<u64> {
    parse_params(&record.params)
        .get(5)
        .map(StepValue::references)
        .unwrap_or_default()
}

/// PredefinedType is the trailing enumeration of occurrences and types.
/// Logical flags (`.T.`, `.F.`, `.U.`) are not predefined types.
fn predefined_type(params: &[StepValue]) -> Option<&str> {
    match params.last()? {
        StepValue::Enum(value) if !matches!(value.as_str(), "T" | "F" | "U") => Some(value),
        _ => None,
    }
}

/// Parses IFC text into entities. Never fails: malformed lines are skipped and
/// non-IFC input yields an empty list.
#[must_use]
pub fn parse_ifc(content: &str, file_name: &str) -> Vec<Entity> {
    IfcParser::new(content, file_name).run().entities
}

/// Parses in chunks of `chunk_size`, reporting progress between chunks.
///
/// The observer may stop the parse by returning `ControlFlow::Break`, in which
/// case `None` is returned.
pub fn parse_chunked<F>(
    content: &str,
    file_name: &str,
    chunk_size: usize,
    mut observer: F,
) -> Option<IfcModel>
where
    F: FnMut(&ParseProgress) -> ControlFlow<()>,
{
    let mut parser = IfcParser::with_chunk_size(content, file_name, chunk_size);
    loop {
        match parser.step() {
            ParseStatus::Done(model) => return Some(model),
            ParseStatus::Pending(progress) => {
                if observer(&progress).is_break() {
                    tracing::debug!(file = file_name, "parse stopped by observer");
                    return None;
                }
            }
        }
    }
}

/// Reads and parses an IFC file from disk.
///
/// # Example
///
/// ```no_run
/// use ids_inspector::parser::parse_ifc_file;
///
/// let model = parse_ifc_file("model.ifc")?;
/// println!("{}: {} entities", model.schema, model.entities.len());
/// # Ok::<(), ids_inspector::error::ParseError>(())
/// ```
pub fn parse_ifc_file<P: AsRef<Path>>(path: P) -> Result<IfcModel, ParseError> {
    let path_ref = path.as_ref();
    let content = std::fs::read_to_string(path_ref).map_err(|source| ParseError::FileRead {
        path: path_ref.to_path_buf(),
        source,
    })?;
    let file_name = path_ref
        .file_name()
        .map_or_else(|| path_ref.to_string_lossy(), |n| n.to_string_lossy())
        .to_string();
    Ok(IfcParser::new(&content, file_name).run())
}
