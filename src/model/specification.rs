use super::Facet;
use serde::{Deserialize, Serialize};

/// Metadata from the IDS `<info>` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdsInfo {
    pub title: Option<String>,
    pub copyright: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub purpose: Option<String>,
    pub milestone: Option<String>,
}

impl IdsInfo {
    /// Field names in IDS schema order, paired with their values.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, Option<&str>); 8] {
        [
            ("title", self.title.as_deref()),
            ("copyright", self.copyright.as_deref()),
            ("version", self.version.as_deref()),
            ("description", self.description.as_deref()),
            ("author", self.author.as_deref()),
            ("date", self.date.as_deref()),
            ("purpose", self.purpose.as_deref()),
            ("milestone", self.milestone.as_deref()),
        ]
    }

    /// Sets a field by its IDS element name. Unknown names are ignored.
    pub fn set(&mut self, field: &str, value: String) {
        let slot = match field {
            "title" => &mut self.title,
            "copyright" => &mut self.copyright,
            "version" => &mut self.version,
            "description" => &mut self.description,
            "author" => &mut self.author,
            "date" => &mut self.date,
            "purpose" => &mut self.purpose,
            "milestone" => &mut self.milestone,
            _ => return,
        };
        *slot = Some(value);
    }
}

/// One IDS specification: which entities it applies to and what they must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specification {
    pub name: String,
    pub ifc_version: String,
    pub identifier: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub applicability: Vec<Facet>,
    pub requirements: Vec<Facet>,
}

impl Specification {
    #[must_use]
    pub fn new(name: impl Into<String>, ifc_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ifc_version: ifc_version.into(),
            identifier: None,
            description: None,
            instructions: None,
            applicability: Vec::new(),
            requirements: Vec::new(),
        }
    }
}

/// A parsed IDS file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdsDocument {
    pub info: IdsInfo,
    pub specifications: Vec<Specification>,
}
