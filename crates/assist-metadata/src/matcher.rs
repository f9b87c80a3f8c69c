//! Query side of the suggestion tree: resolving full names and completing
//! partial ones.

use std::cmp::Reverse;
use std::collections::HashSet;

use crate::builder::MetadataSource;
use crate::name::{compact, MalformedPathError, PropertyName, Segment};
use crate::node::{NodeKind, SuggestionNode};

/// An immutable, merged view of every metadata document in a scope.
#[derive(Clone, Debug)]
pub struct SuggestionTree {
    root: SuggestionNode,
    sources: Vec<MetadataSource>,
    property_count: usize,
}

impl Default for SuggestionTree {
    fn default() -> Self {
        Self::new(SuggestionNode::root(), Vec::new())
    }
}

impl SuggestionTree {
    pub(crate) fn new(root: SuggestionNode, sources: Vec<MetadataSource>) -> Self {
        let property_count = root.count_properties();
        Self {
            root,
            sources,
            property_count,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &SuggestionNode {
        &self.root
    }

    pub fn sources(&self) -> &[MetadataSource] {
        &self.sources
    }

    pub fn property_count(&self) -> usize {
        self.property_count
    }

    pub fn is_empty(&self) -> bool {
        !self.root.has_children()
    }

    /// The chain of nodes (root excluded) that `name` walks through, or an
    /// empty vec when some segment has no match.
    ///
    /// Segments past a childless map-key node are absorbed into the key, so
    /// `logging.level.org.springframework.web` resolves to
    /// `[logging, level, *]`.
    pub fn resolve(&self, name: &PropertyName) -> Vec<&SuggestionNode> {
        resolve_from(&self.root, name)
    }

    pub fn resolve_str(&self, raw: &str) -> Result<Vec<&SuggestionNode>, MalformedPathError> {
        Ok(self.resolve(&PropertyName::adapt(raw)?))
    }

    /// Last node of [`SuggestionTree::resolve`].
    pub fn find(&self, name: &PropertyName) -> Option<&SuggestionNode> {
        self.resolve(name).pop()
    }

    pub fn find_str(&self, raw: &str) -> Option<&SuggestionNode> {
        PropertyName::adapt(raw).ok().and_then(|name| self.find(&name))
    }

    /// Candidates for the last segment of `partial`, best first.
    pub fn complete(&self, partial: &PropertyName) -> Vec<&SuggestionNode> {
        let Some(last) = partial.last() else {
            return rank(self.root.literal_children(), "");
        };
        if last.is_index() {
            return Vec::new();
        }
        let Ok(parent) = partial.parent() else {
            return Vec::new();
        };
        let parents = self.nodes_at(&parent);
        let typed = compact(last.text());
        rank(
            literal_children_of(parents).filter(|child| child.compact_name().starts_with(&typed)),
            last.text(),
        )
    }

    /// Completion from raw editor text. A trailing `.` lists every child of
    /// the name before it.
    pub fn complete_str(&self, raw: &str) -> Result<Vec<&SuggestionNode>, MalformedPathError> {
        if let Some(parent) = raw.strip_suffix('.') {
            let parent = PropertyName::adapt(parent)?;
            let parents = self.nodes_at(&parent);
            return Ok(rank(literal_children_of(parents), ""));
        }
        Ok(self.complete(&PropertyName::adapt(raw)?))
    }

    /// Every node `name` can resolve to, one per spelling variant along the
    /// way, in preference order.
    fn nodes_at<'t>(&'t self, name: &PropertyName) -> Vec<&'t SuggestionNode> {
        if name.is_empty() {
            return vec![&self.root];
        }
        let mut found: Vec<&'t SuggestionNode> = Vec::new();
        let mut chain = Vec::with_capacity(name.len());
        walk(&self.root, name.segments(), &mut chain, &mut |chain: &[&'t SuggestionNode]| {
            if let Some(&last) = chain.last() {
                if !found.iter().any(|seen| std::ptr::eq(*seen, last)) {
                    found.push(last);
                }
            }
            false
        });
        found
    }
}

pub(crate) fn resolve_from<'a>(root: &'a SuggestionNode, name: &PropertyName) -> Vec<&'a SuggestionNode> {
    let mut chain = Vec::with_capacity(name.len());
    if walk(root, name.segments(), &mut chain, &mut |_: &[&SuggestionNode]| true) {
        chain
    } else {
        Vec::new()
    }
}

/// Depth-first walk over every node chain matching `segments`. Per segment the
/// variant spelled like the query is tried first, then its relaxed siblings,
/// then the wildcard. `visit` sees each complete chain and returns `true` to
/// stop the walk there, leaving that chain in `chain`.
fn walk<'a>(
    node: &'a SuggestionNode,
    segments: &[Segment],
    chain: &mut Vec<&'a SuggestionNode>,
    visit: &mut dyn FnMut(&[&'a SuggestionNode]) -> bool,
) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
        return visit(chain);
    };
    if node.kind() == NodeKind::MapKey && !node.has_children() {
        return visit(chain);
    }

    let mut candidates: Vec<&SuggestionNode> = Vec::new();
    if !segment.is_index() {
        let variants = node.variants(segment.normalized());
        candidates.extend(variants.iter().filter(|v| v.original_name() == segment.text()));
        candidates.extend(variants.iter().filter(|v| v.original_name() != segment.text()));
    }
    candidates.extend(node.wildcard());

    for next in candidates {
        chain.push(next);
        if walk(next, rest, chain, visit) {
            return true;
        }
        chain.pop();
    }
    false
}

/// Literal children of every node in `parents`, keeping the first child seen
/// for each declared spelling.
fn literal_children_of<'a>(parents: Vec<&'a SuggestionNode>) -> impl Iterator<Item = &'a SuggestionNode> {
    let mut seen = HashSet::new();
    parents
        .into_iter()
        .flat_map(SuggestionNode::literal_children)
        .filter(move |&child| seen.insert(child.original_name()))
}

fn rank<'a>(candidates: impl Iterator<Item = &'a SuggestionNode>, typed: &str) -> Vec<&'a SuggestionNode> {
    let mut ranked: Vec<_> = candidates.collect();
    ranked.sort_by_key(|node| {
        (
            Reverse(common_prefix_len(typed, node.original_name())),
            node.is_deprecated(),
            node.original_name(),
        )
    });
    ranked
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}
