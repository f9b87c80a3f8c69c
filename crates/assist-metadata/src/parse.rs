//! `spring-configuration-metadata.json` reader.
//!
//! Each entry is decoded independently so a single malformed entry costs only
//! itself; the rest of the document still loads.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::TypeDescriptor;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid metadata JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read metadata file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Groups,
    Properties,
    Hints,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Section::Groups => "groups",
            Section::Properties => "properties",
            Section::Hints => "hints",
        })
    }
}

/// A single entry that could not be read; the entry was skipped.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{section}[{index}]: {reason}")]
pub struct SchemaViolationError {
    pub section: Section,
    pub index: usize,
    pub reason: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeprecationLevel {
    #[default]
    Warning,
    Error,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Deprecation {
    #[serde(default)]
    pub level: DeprecationLevel,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataGroup {
    pub name: String,
    pub ty: Option<String>,
    pub source_type: Option<String>,
    pub source_method: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetadataProperty {
    /// Dotted name exactly as declared.
    pub name: String,
    pub ty: TypeDescriptor,
    pub description: Option<String>,
    pub source_type: Option<String>,
    pub default_value: Option<Value>,
    pub deprecation: Option<Deprecation>,
}

impl MetadataProperty {
    pub fn is_deprecated(&self) -> bool {
        self.deprecation.is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValueHint {
    pub value: Value,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValueProvider {
    pub name: String,
    pub parameters: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetadataHint {
    pub name: String,
    pub values: Vec<ValueHint>,
    pub providers: Vec<ValueProvider>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetadataDocument {
    pub groups: BTreeMap<String, MetadataGroup>,
    pub properties: BTreeMap<String, MetadataProperty>,
    pub hints: BTreeMap<String, MetadataHint>,
    pub violations: Vec<SchemaViolationError>,
}

impl MetadataDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MetadataError> {
        let raw: RawDocument = serde_json::from_slice(bytes)?;
        Ok(Self::from_raw(raw))
    }

    pub fn from_json(text: &str) -> Result<Self, MetadataError> {
        Self::from_slice(text.as_bytes())
    }

    pub fn read(path: &Path) -> Result<Self, MetadataError> {
        let bytes = std::fs::read(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.properties.is_empty() && self.hints.is_empty()
    }

    fn from_raw(raw: RawDocument) -> Self {
        let mut doc = MetadataDocument::default();

        for (index, value) in raw.groups.into_iter().enumerate() {
            match decode::<RawGroup>(Section::Groups, index, value) {
                Ok(group) => {
                    doc.groups.insert(
                        group.name.clone(),
                        MetadataGroup {
                            name: group.name,
                            ty: group.ty,
                            source_type: group.source_type,
                            source_method: group.source_method,
                            description: group.description,
                        },
                    );
                }
                Err(violation) => doc.record(violation),
            }
        }

        for (index, value) in raw.properties.into_iter().enumerate() {
            match decode::<RawProperty>(Section::Properties, index, value) {
                Ok(property) => {
                    let deprecation = match (property.deprecation, property.deprecated) {
                        (Some(deprecation), _) => Some(deprecation),
                        (None, true) => Some(Deprecation::default()),
                        (None, false) => None,
                    };
                    doc.properties.insert(
                        property.name.clone(),
                        MetadataProperty {
                            name: property.name,
                            ty: property
                                .ty
                                .as_deref()
                                .map_or(TypeDescriptor::Unknown, TypeDescriptor::parse),
                            description: property.description,
                            source_type: property.source_type,
                            default_value: property.default_value,
                            deprecation,
                        },
                    );
                }
                Err(violation) => doc.record(violation),
            }
        }

        for (index, value) in raw.hints.into_iter().enumerate() {
            match decode::<RawHint>(Section::Hints, index, value) {
                Ok(hint) => {
                    let values = hint
                        .values
                        .into_iter()
                        .filter_map(|value| {
                            Some(ValueHint {
                                value: value.value?,
                                description: value.description,
                            })
                        })
                        .collect();
                    let providers = hint
                        .providers
                        .into_iter()
                        .map(|provider| ValueProvider {
                            name: provider.name,
                            parameters: provider.parameters,
                        })
                        .collect();
                    doc.hints.insert(
                        hint.name.clone(),
                        MetadataHint {
                            name: hint.name,
                            values,
                            providers,
                        },
                    );
                }
                Err(violation) => doc.record(violation),
            }
        }

        doc
    }

    fn record(&mut self, violation: SchemaViolationError) {
        tracing::warn!(
            target = "assist.metadata",
            section = %violation.section,
            index = violation.index,
            reason = %violation.reason,
            "skipping malformed metadata entry"
        );
        self.violations.push(violation);
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    section: Section,
    index: usize,
    value: Value,
) -> Result<T, SchemaViolationError> {
    let violation = |reason: String| SchemaViolationError {
        section,
        index,
        reason,
    };

    let Value::Object(object) = &value else {
        return Err(violation("entry is not a JSON object".to_string()));
    };
    match object.get("name") {
        Some(Value::String(name)) if !name.is_empty() => {}
        Some(Value::String(_)) => return Err(violation("`name` is empty".to_string())),
        Some(_) => return Err(violation("`name` is not a string".to_string())),
        None => return Err(violation("missing `name`".to_string())),
    }

    serde_json::from_value(value).map_err(|err| violation(err.to_string()))
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    groups: Vec<Value>,
    #[serde(default)]
    properties: Vec<Value>,
    #[serde(default)]
    hints: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGroup {
    name: String,
    #[serde(rename = "type", default)]
    ty: Option<String>,
    #[serde(default)]
    source_type: Option<String>,
    #[serde(default)]
    source_method: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProperty {
    name: String,
    #[serde(rename = "type", default)]
    ty: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    source_type: Option<String>,
    #[serde(default)]
    default_value: Option<Value>,
    #[serde(default)]
    deprecation: Option<Deprecation>,
    #[serde(default)]
    deprecated: bool,
}

#[derive(Deserialize)]
struct RawHint {
    name: String,
    #[serde(default)]
    values: Vec<RawValueHint>,
    #[serde(default)]
    providers: Vec<RawProvider>,
}

#[derive(Deserialize)]
struct RawValueHint {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct RawProvider {
    name: String,
    #[serde(default)]
    parameters: BTreeMap<String, Value>,
}
