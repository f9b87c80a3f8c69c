use std::collections::BTreeMap;
use std::sync::Arc;

use crate::builder::MetadataSource;
use crate::parse::{Deprecation, MetadataGroup, MetadataHint, MetadataProperty};
use crate::types::TypeDescriptor;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Group,
    Leaf,
    /// `list[0]`: matches any index.
    Indexed,
    /// `map[key]` / `map.key`: matches any key.
    MapKey,
}

impl NodeKind {
    pub fn is_wildcard(self) -> bool {
        matches!(self, NodeKind::Indexed | NodeKind::MapKey)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Leaf => "leaf",
            NodeKind::Indexed => "indexed",
            NodeKind::MapKey => "map-key",
        }
    }
}

/// One path segment of the merged suggestion tree.
#[derive(Clone, Debug)]
pub struct SuggestionNode {
    original_name: String,
    normalized_name: String,
    compact_name: String,
    kind: NodeKind,
    depth: usize,
    ty: TypeDescriptor,
    property: Option<Arc<MetadataProperty>>,
    group: Option<Arc<MetadataGroup>>,
    hint: Option<Arc<MetadataHint>>,
    key_hint: Option<Arc<MetadataHint>>,
    source: Option<MetadataSource>,
    /// normalized name -> variants, sorted by original name.
    children: BTreeMap<String, Vec<SuggestionNode>>,
    wildcard: Option<Box<SuggestionNode>>,
}

impl SuggestionNode {
    pub(crate) fn root() -> Self {
        Self::new(String::new(), NodeKind::Group, 0)
    }

    pub(crate) fn new(original_name: String, kind: NodeKind, depth: usize) -> Self {
        let normalized_name = crate::name::normalize(&original_name);
        let compact_name = normalized_name.replace('-', "");
        Self {
            original_name,
            normalized_name,
            compact_name,
            kind,
            depth,
            ty: TypeDescriptor::Unknown,
            property: None,
            group: None,
            hint: None,
            key_hint: None,
            source: None,
            children: BTreeMap::new(),
            wildcard: None,
        }
    }

    fn new_wildcard(kind: NodeKind, depth: usize) -> Self {
        let name = match kind {
            NodeKind::Indexed => "[*]",
            _ => "*",
        };
        let mut node = Self::new(String::new(), kind, depth);
        node.original_name = name.to_string();
        node.normalized_name = name.to_string();
        node.compact_name = name.to_string();
        node
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn normalized_name(&self) -> &str {
        &self.normalized_name
    }

    pub fn compact_name(&self) -> &str {
        &self.compact_name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Number of segments from the root; the root itself is at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn property(&self) -> Option<&MetadataProperty> {
        self.property.as_deref()
    }

    pub fn group(&self) -> Option<&MetadataGroup> {
        self.group.as_deref()
    }

    pub fn hint(&self) -> Option<&MetadataHint> {
        self.hint.as_deref()
    }

    /// `X.keys` hint, carried by the map-key wildcard of `X`.
    pub fn key_hint(&self) -> Option<&MetadataHint> {
        self.key_hint.as_deref()
    }

    /// The metadata file that last contributed attributes to this node.
    pub fn source(&self) -> Option<&MetadataSource> {
        self.source.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.property
            .as_ref()
            .and_then(|p| p.description.as_deref())
            .or_else(|| self.group.as_ref().and_then(|g| g.description.as_deref()))
    }

    pub fn deprecation(&self) -> Option<&Deprecation> {
        self.property.as_ref().and_then(|p| p.deprecation.as_ref())
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecation().is_some()
    }

    /// First variant with the given normalized name.
    pub fn child(&self, normalized: &str) -> Option<&SuggestionNode> {
        self.children.get(normalized).and_then(|v| v.first())
    }

    pub fn child_exact(&self, original: &str) -> Option<&SuggestionNode> {
        let normalized = crate::name::normalize(original);
        self.variants(&normalized)
            .iter()
            .find(|node| node.original_name == original)
    }

    /// All spellings declared for one normalized name (`dataSource`, `data-source`).
    pub fn variants(&self, normalized: &str) -> &[SuggestionNode] {
        match self.children.get(normalized) {
            Some(variants) => variants,
            None => &[],
        }
    }

    pub fn wildcard(&self) -> Option<&SuggestionNode> {
        self.wildcard.as_deref()
    }

    pub fn literal_children(&self) -> impl Iterator<Item = &SuggestionNode> + Clone {
        self.children.values().flatten()
    }

    pub fn children(&self) -> Children<'_> {
        Children {
            literals: self.children.values().flatten(),
            wildcard: self.wildcard.as_deref(),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty() || self.wildcard.is_some()
    }

    // Builder-side mutation; a published tree is never touched again.

    pub(crate) fn child_mut_or_insert(&mut self, original: &str) -> &mut SuggestionNode {
        let normalized = crate::name::normalize(original);
        let depth = self.depth + 1;
        let variants = self.children.entry(normalized).or_default();
        let idx = match variants.binary_search_by(|node| node.original_name.as_str().cmp(original)) {
            Ok(idx) => idx,
            Err(idx) => {
                variants.insert(idx, SuggestionNode::new(original.to_string(), NodeKind::Group, depth));
                idx
            }
        };
        &mut variants[idx]
    }

    /// Existing literal variants matching `normalized`, for hint attachment.
    pub(crate) fn variants_mut(&mut self, normalized: &str) -> &mut [SuggestionNode] {
        match self.children.get_mut(normalized) {
            Some(variants) => variants,
            None => &mut [],
        }
    }

    pub(crate) fn wildcard_mut(&mut self) -> Option<&mut SuggestionNode> {
        self.wildcard.as_deref_mut()
    }

    /// Get or create the wildcard child. A map-key request upgrades an indexed
    /// wildcard; an indexed request never downgrades a map-key one.
    pub(crate) fn wildcard_mut_or_insert(&mut self, kind: NodeKind) -> &mut SuggestionNode {
        debug_assert!(kind.is_wildcard());
        let depth = self.depth + 1;
        let wildcard = self
            .wildcard
            .get_or_insert_with(|| Box::new(SuggestionNode::new_wildcard(kind, depth)));
        if kind == NodeKind::MapKey && wildcard.kind == NodeKind::Indexed {
            wildcard.kind = NodeKind::MapKey;
            wildcard.original_name = "*".to_string();
            wildcard.normalized_name = "*".to_string();
            wildcard.compact_name = "*".to_string();
        }
        wildcard
    }

    pub(crate) fn mark_leaf(&mut self) {
        if !self.kind.is_wildcard() {
            self.kind = NodeKind::Leaf;
        }
    }

    pub(crate) fn set_ty(&mut self, ty: TypeDescriptor) {
        self.ty = ty;
    }

    pub(crate) fn has_property(&self) -> bool {
        self.property.is_some()
    }

    pub(crate) fn has_group(&self) -> bool {
        self.group.is_some()
    }

    pub(crate) fn set_property(&mut self, property: Arc<MetadataProperty>, source: MetadataSource) {
        self.property = Some(property);
        self.source = Some(source);
    }

    pub(crate) fn set_group(&mut self, group: Arc<MetadataGroup>, source: MetadataSource) {
        self.group = Some(group);
        if self.property.is_none() {
            self.source = Some(source);
        }
    }

    pub(crate) fn set_hint(&mut self, hint: Arc<MetadataHint>) {
        self.hint = Some(hint);
    }

    pub(crate) fn set_key_hint(&mut self, hint: Arc<MetadataHint>) {
        self.key_hint = Some(hint);
    }

    pub(crate) fn count_properties(&self) -> usize {
        let own = usize::from(self.property.is_some());
        own + self
            .children()
            .map(SuggestionNode::count_properties)
            .sum::<usize>()
    }
}

/// Children of a node: literal children in normalized-name order (variants by
/// original name), then the wildcard. A clone iterates independently of the
/// original.
#[derive(Clone)]
pub struct Children<'a> {
    literals: std::iter::Flatten<std::collections::btree_map::Values<'a, String, Vec<SuggestionNode>>>,
    wildcard: Option<&'a SuggestionNode>,
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a SuggestionNode;

    fn next(&mut self) -> Option<&'a SuggestionNode> {
        self.literals.next().or_else(|| self.wildcard.take())
    }
}
