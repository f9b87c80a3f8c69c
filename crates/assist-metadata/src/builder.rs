//! Merges parsed metadata documents into one [`SuggestionTree`].

use std::fmt;
use std::sync::Arc;

use assist_scheduler::{CancellationToken, Cancelled};
use serde::Deserialize;
use thiserror::Error;

use crate::matcher::{resolve_from, SuggestionTree};
use crate::name::{normalize, MalformedPathError, PropertyName, Segment};
use crate::node::{NodeKind, SuggestionNode};
use crate::parse::{MetadataDocument, MetadataHint};

/// Which declaration wins when two documents describe the same path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    #[default]
    LastWins,
    FirstWins,
}

/// Where a document came from (a file path or `jar!/entry`), used in logs and
/// reports.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetadataSource(Arc<str>);

impl MetadataSource {
    pub fn new(source: impl AsRef<str>) -> Self {
        Self(Arc::from(source.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MetadataSource {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("deprecated property `{property}` names replacement `{replacement}`, which is not declared")]
pub struct ReplacementNotFoundError {
    pub property: String,
    pub replacement: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub documents: usize,
    pub properties: usize,
    pub schema_violations: usize,
    pub malformed_names: Vec<MalformedPathError>,
    pub missing_replacements: Vec<ReplacementNotFoundError>,
    pub unattached_hints: Vec<String>,
}

pub struct TreeBuilder {
    policy: MergePolicy,
    root: SuggestionNode,
    sources: Vec<MetadataSource>,
    hints: Vec<Arc<MetadataHint>>,
    report: BuildReport,
}

impl TreeBuilder {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            root: SuggestionNode::root(),
            sources: Vec::new(),
            hints: Vec::new(),
            report: BuildReport::default(),
        }
    }

    pub fn add_document(&mut self, source: MetadataSource, doc: &MetadataDocument) {
        self.report.documents += 1;
        self.report.schema_violations += doc.violations.len();

        for group in doc.groups.values() {
            let Some(name) = self.adapt(&source, &group.name) else {
                continue;
            };
            let node = walk_or_create(&mut self.root, &name);
            if self.policy == MergePolicy::FirstWins && node.has_group() {
                continue;
            }
            node.set_group(Arc::new(group.clone()), source.clone());
        }

        for property in doc.properties.values() {
            let Some(name) = self.adapt(&source, &property.name) else {
                continue;
            };
            let node = walk_or_create(&mut self.root, &name);
            node.mark_leaf();
            if self.policy == MergePolicy::FirstWins && node.has_property() {
                continue;
            }

            let ty = property.ty.clone();
            let wildcard = if ty.is_map() {
                Some(NodeKind::MapKey)
            } else if ty.is_collection() {
                Some(NodeKind::Indexed)
            } else {
                None
            };
            if let (Some(kind), Some(value_ty)) = (wildcard, ty.value_type()) {
                let wildcard = node.wildcard_mut_or_insert(kind);
                wildcard.set_ty(value_ty.clone());
            }
            node.set_ty(ty);
            node.set_property(Arc::new(property.clone()), source.clone());
        }

        self.hints.extend(doc.hints.values().cloned().map(Arc::new));

        tracing::debug!(
            target = "assist.metadata",
            source = %source,
            groups = doc.groups.len(),
            properties = doc.properties.len(),
            hints = doc.hints.len(),
            "merged metadata document"
        );
        self.sources.push(source);
    }

    pub fn finish(mut self) -> (SuggestionTree, BuildReport) {
        for hint in std::mem::take(&mut self.hints) {
            if !attach_hint(&mut self.root, &hint) {
                tracing::debug!(
                    target = "assist.metadata",
                    hint = %hint.name,
                    "hint does not name a known property; ignoring"
                );
                self.report.unattached_hints.push(hint.name.clone());
            }
        }

        let mut replacements = Vec::new();
        collect_replacements(&self.root, &mut replacements);
        for (property, replacement) in replacements {
            let found = PropertyName::adapt(&replacement)
                .map(|name| !name.is_empty() && !resolve_from(&self.root, &name).is_empty())
                .unwrap_or(false);
            if !found {
                let err = ReplacementNotFoundError {
                    property,
                    replacement,
                };
                tracing::warn!(target = "assist.metadata", error = %err, "dangling deprecation replacement");
                self.report.missing_replacements.push(err);
            }
        }

        let tree = SuggestionTree::new(self.root, self.sources);
        self.report.properties = tree.property_count();
        (tree, self.report)
    }

    fn adapt(&mut self, source: &MetadataSource, raw: &str) -> Option<PropertyName> {
        match PropertyName::adapt(raw) {
            Ok(name) if !name.is_empty() => Some(name),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(
                    target = "assist.metadata",
                    source = %source,
                    error = %err,
                    "skipping metadata entry with malformed name"
                );
                self.report.malformed_names.push(err);
                None
            }
        }
    }
}

pub fn build_tree<'a>(
    docs: impl IntoIterator<Item = (&'a MetadataSource, &'a MetadataDocument)>,
    policy: MergePolicy,
) -> (SuggestionTree, BuildReport) {
    let mut builder = TreeBuilder::new(policy);
    for (source, doc) in docs {
        builder.add_document(source.clone(), doc);
    }
    builder.finish()
}

/// Like [`build_tree`], but gives up between documents once `token` fires.
pub fn build_tree_cancellable<'a>(
    docs: impl IntoIterator<Item = (&'a MetadataSource, &'a MetadataDocument)>,
    policy: MergePolicy,
    token: &CancellationToken,
) -> Result<(SuggestionTree, BuildReport), Cancelled> {
    let mut builder = TreeBuilder::new(policy);
    for (source, doc) in docs {
        Cancelled::check(token)?;
        builder.add_document(source.clone(), doc);
    }
    Cancelled::check(token)?;
    Ok(builder.finish())
}

fn walk_or_create<'a>(root: &'a mut SuggestionNode, name: &PropertyName) -> &'a mut SuggestionNode {
    let mut node = root;
    for segment in name.segments() {
        node = if segment.is_numeric_index() {
            node.wildcard_mut_or_insert(NodeKind::Indexed)
        } else if segment.is_index() {
            node.wildcard_mut_or_insert(NodeKind::MapKey)
        } else {
            node.child_mut_or_insert(segment.text())
        };
    }
    node
}

/// Apply `f` to every existing node `segments` can reach; literal segments
/// visit all spelling variants.
fn for_each_match(
    node: &mut SuggestionNode,
    segments: &[Segment],
    f: &mut dyn FnMut(&mut SuggestionNode),
) {
    let Some((first, rest)) = segments.split_first() else {
        f(node);
        return;
    };
    if first.is_index() {
        if let Some(wildcard) = node.wildcard_mut() {
            for_each_match(wildcard, rest, f);
        }
        return;
    }
    for variant in node.variants_mut(first.normalized()) {
        for_each_match(variant, rest, f);
    }
}

fn attach_hint(root: &mut SuggestionNode, hint: &Arc<MetadataHint>) -> bool {
    let Ok(name) = PropertyName::adapt(&hint.name) else {
        return false;
    };
    let mut attached = false;

    // `X.keys` / `X.values` describe the entries of map property `X`.
    if let (Some(last), Ok(base)) = (name.last(), name.parent()) {
        let for_keys = last.normalized() == normalize("keys");
        let for_values = last.normalized() == normalize("values");
        if !last.is_index() && (for_keys || for_values) {
            for_each_match(root, base.segments(), &mut |node| {
                if let Some(wildcard) = node.wildcard_mut() {
                    if wildcard.kind() == NodeKind::MapKey {
                        if for_keys {
                            wildcard.set_key_hint(Arc::clone(hint));
                        } else {
                            wildcard.set_hint(Arc::clone(hint));
                        }
                        attached = true;
                    }
                }
            });
            if attached {
                return true;
            }
        }
    }

    for_each_match(root, name.segments(), &mut |node| {
        node.set_hint(Arc::clone(hint));
        attached = true;
    });
    attached
}

fn collect_replacements(node: &SuggestionNode, out: &mut Vec<(String, String)>) {
    if let Some(property) = node.property() {
        if let Some(replacement) = property
            .deprecation
            .as_ref()
            .and_then(|d| d.replacement.as_ref())
        {
            out.push((property.name.clone(), replacement.clone()));
        }
    }
    for child in node.children() {
        collect_replacements(child, out);
    }
}
