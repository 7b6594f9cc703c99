//! Structured feed (`DATA.CGX`) as a two-level tree of named string fields.
//!
//! The device document looks like:
//!
//! ```xml
//! <data>
//!   <tic1><ISOUSC>45</ISOUSC><PAP>1230</PAP>...</tic1>
//!   <pince><I1>2.3</I1>...<V>231</V></pince>
//! </data>
//! ```
//!
//! Only leaf elements are kept; nested elements below a section are ignored.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Fields of one section, by element name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    name: String,
    fields: BTreeMap<String, String>,
}

impl Section {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trimmed field text. Empty elements count as absent.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Field text, or [`Error::MissingField`].
    pub fn require(&self, field: &str) -> Result<&str> {
        self.get(field)
            .ok_or_else(|| Error::MissingField(format!("{}.{field}", self.name)))
    }

    /// Trimmed text of an element that must exist, possibly empty.
    pub fn require_element(&self, field: &str) -> Result<&str> {
        self.fields
            .get(field)
            .map(|v| v.trim())
            .ok_or_else(|| Error::MissingField(format!("{}.{field}", self.name)))
    }

    /// Required numeric field.
    pub fn number(&self, field: &str) -> Result<f64> {
        let raw = self.require(field)?;
        self.parse(field, raw)
    }

    /// Presence-guarded numeric field: `Ok(None)` when absent, an error when
    /// present but not a number.
    pub fn optional_number(&self, field: &str) -> Result<Option<f64>> {
        self.get(field).map(|raw| self.parse(field, raw)).transpose()
    }

    fn parse(&self, field: &str, raw: &str) -> Result<f64> {
        raw.parse::<f64>().map_err(|_| Error::InvalidNumber {
            field: format!("{}.{field}", self.name),
            value: raw.to_string(),
        })
    }
}

/// Parsed structured feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTree {
    sections: BTreeMap<String, Section>,
}

/// Name of the document root element.
pub const ROOT_ELEMENT: &str = "data";

impl FieldTree {
    /// Parse the device XML document.
    pub fn from_xml(text: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(text).map_err(|e| Error::Parse(e.to_string()))?;
        let root = doc.root_element();
        if root.tag_name().name() != ROOT_ELEMENT {
            return Err(Error::Parse(format!(
                "expected <{ROOT_ELEMENT}> root element, found <{}>",
                root.tag_name().name()
            )));
        }

        let mut tree = Self::default();
        for section_node in root.children().filter(|n| n.is_element()) {
            let section_name = section_node.tag_name().name();
            for field_node in section_node.children().filter(|n| n.is_element()) {
                if field_node.children().any(|n| n.is_element()) {
                    continue;
                }
                let value: String = field_node
                    .children()
                    .filter(|n| n.is_text())
                    .filter_map(|n| n.text())
                    .collect();
                tree.insert(section_name, field_node.tag_name().name(), value);
            }
            // Keep empty sections so `section()` can tell "empty" from "missing".
            tree.sections
                .entry(section_name.to_string())
                .or_insert_with(|| Section {
                    name: section_name.to_string(),
                    fields: BTreeMap::new(),
                });
        }
        Ok(tree)
    }

    /// Set a field, creating the section if needed. Later values win.
    pub fn insert(&mut self, section: &str, field: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_insert_with(|| Section {
                name: section.to_string(),
                fields: BTreeMap::new(),
            })
            .fields
            .insert(field.to_string(), value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_field(mut self, section: &str, field: &str, value: impl Into<String>) -> Self {
        self.insert(section, field, value);
        self
    }

    /// Remove a field; returns its previous text.
    pub fn remove(&mut self, section: &str, field: &str) -> Option<String> {
        self.sections.get_mut(section)?.fields.remove(field)
    }

    /// A section that must exist, or [`Error::Parse`].
    pub fn section(&self, name: &str) -> Result<&Section> {
        self.sections
            .get(name)
            .ok_or_else(|| Error::Parse(format!("missing <{name}> section")))
    }

    /// Trimmed, non-empty text at `path`.
    pub fn get(&self, path: &FieldPath) -> Option<&str> {
        self.sections.get(&path.section)?.get(&path.field)
    }

}

/// Decode a device response body.
///
/// The firmware declares ISO-8859-1 on some pages; bytes that are not valid
/// UTF-8 are mapped one-to-one to Latin-1 code points.
pub fn decode_body(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// `section.field` address in the structured feed (e.g. `pince.V`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    pub section: String,
    pub field: String,
}

impl FieldPath {
    pub fn new(section: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            field: field.into(),
        }
    }

    /// Required numeric value at this path.
    pub fn number(&self, tree: &FieldTree) -> Result<f64> {
        tree.section(&self.section)?.number(&self.field)
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.section, self.field)
    }
}

impl FromStr for FieldPath {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((section, field))
                if !section.is_empty() && !field.is_empty() && !field.contains('.') =>
            {
                Ok(Self::new(section, field))
            }
            _ => Err(format!(
                "invalid field path {s:?}: expected `section.field` (e.g. `pince.V`)"
            )),
        }
    }
}
