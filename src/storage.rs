//! Content records and a YAML-backed in-memory content store.

use crate::config::ConfigError;
use crate::i18n::{ContentRecord, ContentTypes, FieldValue};
use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::Value;
use std::path::Path;
use tracing::debug;

/// Field types whose values are stored as rendered markup.
const MARKUP_FIELD_TYPES: &[&str] = &["html", "markdown", "textarea"];

/// Lookup of content records by `"<contenttype>/<id-or-slug>"`.
pub trait ContentStorage: Send + Sync {
    fn get_content(&self, path: &str) -> Option<Record>;

    /// The record whose public link is `link`, e.g. `/page/about`.
    fn find_by_link(&self, link: &str) -> Option<Record>;
}

/// A stored content record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "contenttype")]
    pub content_type: String,
    pub id: String,
    pub slug: String,
    pub link: String,
    pub values: IndexMap<String, FieldValue>,
}

impl Record {
    pub fn link(&self) -> &str {
        &self.link
    }
}

impl ContentRecord for Record {
    fn value(&self, field: &str) -> Option<FieldValue> {
        self.values.get(field).cloned()
    }
}

/// Records kept in memory, grouped by content type.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: IndexMap<String, Vec<Record>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path, types: &ContentTypes) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, &path.display().to_string(), types)
    }

    pub fn from_yaml_str(raw: &str, types: &ContentTypes) -> Result<Self, ConfigError> {
        Self::parse(raw, "inline content", types)
    }

    /// Parse `<contenttype>: [ { id, slug, <field>: <value>, ... } ]`.
    ///
    /// Values of `html`, `markdown` and `textarea` fields (including their
    /// localized variants) become markup.
    fn parse(raw: &str, origin: &str, types: &ContentTypes) -> Result<Self, ConfigError> {
        let parsed: IndexMap<String, Vec<IndexMap<String, Value>>> = serde_yaml::from_str(raw)
            .map_err(|source| ConfigError::Parse {
                origin: origin.to_string(),
                source,
            })?;

        let mut storage = Self::new();
        for (content_type, entries) in parsed {
            let link_base = types
                .get(&content_type)
                .and_then(|ct| ct.extra.get("singular_slug"))
                .and_then(Value::as_str)
                .unwrap_or(&content_type)
                .to_string();

            for (idx, mut entry) in entries.into_iter().enumerate() {
                let id = entry
                    .shift_remove("id")
                    .map(scalar_to_string)
                    .unwrap_or_else(|| (idx + 1).to_string());
                let slug = entry
                    .shift_remove("slug")
                    .map(scalar_to_string)
                    .unwrap_or_else(|| id.clone());

                let values = entry
                    .into_iter()
                    .map(|(field, value)| {
                        let value = FieldValue::from(value);
                        let value = if is_markup_field(types, &content_type, &field) {
                            value.into_markup()
                        } else {
                            value
                        };
                        (field, value)
                    })
                    .collect();

                storage.insert(Record {
                    link: format!("/{}/{}", link_base, slug),
                    content_type: content_type.clone(),
                    id,
                    slug,
                    values,
                });
            }
        }

        debug!("Loaded {} content record(s)", storage.len());
        Ok(storage)
    }

    pub fn insert(&mut self, record: Record) {
        self.records
            .entry(record.content_type.clone())
            .or_default()
            .push(record);
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentStorage for MemoryStorage {
    fn get_content(&self, path: &str) -> Option<Record> {
        let (content_type, key) = path.split_once('/')?;
        self.records
            .get(content_type)?
            .iter()
            .find(|record| record.id == key || record.slug == key)
            .cloned()
    }

    fn find_by_link(&self, link: &str) -> Option<Record> {
        self.records
            .values()
            .flatten()
            .find(|record| record.link == link)
            .cloned()
    }
}

fn is_markup_field(types: &ContentTypes, content_type: &str, field: &str) -> bool {
    types
        .get(content_type)
        .and_then(|ct| ct.fields.get(field))
        .and_then(|spec| spec.field_type())
        .is_some_and(|field_type| MARKUP_FIELD_TYPES.contains(&field_type))
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(&other)
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}
