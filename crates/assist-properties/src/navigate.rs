use assist_core::{text_range, TextRange};
use assist_metadata::{PropertyName, SuggestionNode, SuggestionTree};

use crate::parse::{parse, EntryPart, PropertiesFile, PropertyEntry};

/// A key in a `.properties` file resolved against metadata.
#[derive(Clone, Debug)]
pub struct KeyReference<'t> {
    pub key: String,
    pub key_range: TextRange,
    /// The name that resolved: the key itself, or its closest ancestor
    /// known to the metadata.
    pub name: PropertyName,
    /// The part of `key_range` spelled by `name`.
    pub target_range: TextRange,
    pub nodes: Vec<&'t SuggestionNode>,
}

impl<'t> KeyReference<'t> {
    pub fn target(&self) -> Option<&'t SuggestionNode> {
        self.nodes.last().copied()
    }

    /// `true` when the full key resolved rather than one of its ancestors.
    pub fn is_exact(&self) -> bool {
        self.name.len() == PropertyName::adapt(&self.key).map_or(0, |name| name.len())
    }
}

/// The entry whose key contains `offset`.
pub fn key_at_offset(file: &PropertiesFile, offset: usize) -> Option<&PropertyEntry> {
    match file.entry_at(offset)? {
        (entry, EntryPart::Key) => Some(entry),
        (_, EntryPart::Value) => None,
    }
}

/// Resolve `key`, falling back to each of its ancestors in turn.
pub fn resolve_key<'t>(key: &str, tree: &'t SuggestionTree) -> Option<(PropertyName, Vec<&'t SuggestionNode>)> {
    let name = match PropertyName::adapt(key) {
        Ok(name) => name,
        Err(err) => {
            tracing::debug!(target = "assist.properties", key, error = %err, "key is not a property name");
            return None;
        }
    };
    name.ancestors().find_map(|candidate| {
        let nodes = tree.resolve(&candidate);
        (!nodes.is_empty()).then_some((candidate, nodes))
    })
}

/// Find the key under `offset` in `text` and resolve it against `tree`.
pub fn resolve_reference<'t>(text: &str, offset: usize, tree: &'t SuggestionTree) -> Option<KeyReference<'t>> {
    let file = parse(text);
    let entry = key_at_offset(&file, offset)?;
    let (name, nodes) = resolve_key(&entry.key, tree)?;
    let target_range = target_range(text, entry, &name);
    Some(KeyReference {
        key: entry.key.clone(),
        key_range: entry.key_range,
        name,
        target_range,
        nodes,
    })
}

fn target_range(text: &str, entry: &PropertyEntry, name: &PropertyName) -> TextRange {
    let start = usize::from(entry.key_range.start());
    let end = usize::from(entry.key_range.end());
    let spelled = name.to_string();
    // Escapes or continuations make source and key differ; use the whole key then.
    if text.get(start..end) == Some(entry.key.as_str()) && entry.key.starts_with(&spelled) {
        text_range(start, start + spelled.len())
    } else {
        entry.key_range
    }
}
