//! Per-scope metadata service: owns the known metadata files of one scope and
//! the published suggestion tree built from them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use assist_core::ScopeId;
use assist_metadata::{
    build_tree_cancellable, BuildReport, MalformedPathError, MergePolicy, MetadataDocument,
    MetadataSource, NodeKind, PropertyName, Segment, SuggestionNode, SuggestionTree,
};
use assist_scheduler::{BlockingTask, CancellationToken, Cancelled, Scheduler};
use parking_lot::Mutex;

use crate::discovery::FileHandle;

/// Outcome of one published rebuild.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebuildReport {
    pub scope: ScopeId,
    pub generation: u64,
    pub files: usize,
    /// Files that could not be read or parsed, with the reason.
    pub failed_files: Vec<(FileHandle, String)>,
    pub build: BuildReport,
}

/// Owned view of one node, detached from the snapshot it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct Suggestion {
    pub name: String,
    pub kind: NodeKind,
    pub ty: Option<String>,
    pub description: Option<String>,
    pub default_value: Option<String>,
    pub deprecated: bool,
    pub replacement: Option<String>,
    pub source: Option<String>,
}

impl Suggestion {
    pub fn from_node(name: impl Into<String>, node: &SuggestionNode) -> Self {
        let ty = node.ty().raw();
        Self {
            name: name.into(),
            kind: node.kind(),
            ty: (!ty.is_empty()).then(|| ty.to_string()),
            description: node.description().map(str::to_string),
            default_value: node
                .property()
                .and_then(|p| p.default_value.as_ref())
                .map(render_default),
            deprecated: node.is_deprecated(),
            replacement: node.deprecation().and_then(|d| d.replacement.clone()),
            source: node.source().map(ToString::to_string),
        }
    }
}

/// Strings render bare; everything else as JSON.
fn render_default(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Default)]
struct ServiceState {
    known_files: Vec<FileHandle>,
    in_flight: Option<CancellationToken>,
}

struct ServiceInner {
    scope: ScopeId,
    policy: MergePolicy,
    scheduler: Scheduler,
    tree: ArcSwap<SuggestionTree>,
    state: Mutex<ServiceState>,
    generation: AtomicU64,
}

#[derive(Clone)]
pub struct MetadataService {
    inner: Arc<ServiceInner>,
}

impl MetadataService {
    pub fn new(scope: ScopeId, scheduler: Scheduler, policy: MergePolicy) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                scope,
                policy,
                scheduler,
                tree: ArcSwap::from_pointee(SuggestionTree::empty()),
                state: Mutex::new(ServiceState::default()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn scope(&self) -> &ScopeId {
        &self.inner.scope
    }

    /// The currently published tree. Never blocks on a rebuild.
    pub fn snapshot(&self) -> Arc<SuggestionTree> {
        self.inner.tree.load_full()
    }

    pub fn known_files(&self) -> Vec<FileHandle> {
        self.inner.state.lock().known_files.clone()
    }

    /// Add `files` to the scope and rebuild from every known file.
    ///
    /// A rebuild already running for this scope is cancelled; only the newest
    /// rebuild publishes.
    pub fn refresh_metadata(&self, files: impl IntoIterator<Item = FileHandle>) -> BlockingTask<RebuildReport> {
        self.rebuild_with(|known| {
            for file in files {
                if !known.contains(&file) {
                    known.push(file);
                }
            }
        })
    }

    /// Drop `files` from the scope and rebuild without them.
    pub fn forget_files(&self, files: &[FileHandle]) -> BlockingTask<RebuildReport> {
        self.rebuild_with(|known| known.retain(|file| !files.contains(file)))
    }

    /// Cancel any running rebuild and publish an empty tree.
    pub fn dispose(&self) {
        let mut state = self.inner.state.lock();
        if let Some(token) = state.in_flight.take() {
            token.cancel();
        }
        state.known_files.clear();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.tree.store(Arc::new(SuggestionTree::empty()));
    }

    pub fn resolve(&self, raw: &str) -> Result<Vec<Suggestion>, MalformedPathError> {
        let name = PropertyName::adapt(raw)?;
        let tree = self.snapshot();
        let chain = tree.resolve(&name);

        // Each entry is named by the query text up to its own segment. A map
        // key that absorbed the rest of the query is named by the whole query.
        let mut prefixes: Vec<PropertyName> = name.ancestors().collect();
        prefixes.reverse();
        let last = chain.len().saturating_sub(1);
        Ok(chain
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let absorbs = i == last && node.kind() == NodeKind::MapKey && !node.has_children();
                let label = match prefixes.get(i) {
                    Some(prefix) if !absorbs => prefix.to_string(),
                    _ => name.to_string(),
                };
                Suggestion::from_node(label, node)
            })
            .collect())
    }

    pub fn complete(&self, raw: &str) -> Result<Vec<Suggestion>, MalformedPathError> {
        let tree = self.snapshot();
        let parent = match raw.strip_suffix('.') {
            Some(parent) => PropertyName::adapt(parent)?,
            None => PropertyName::adapt(raw)?.parent().unwrap_or_default(),
        };
        let parent = declared_spelling(&parent, &tree);
        let found = tree.complete_str(raw)?;
        Ok(found
            .into_iter()
            .map(|node| {
                let name = if parent.is_empty() {
                    node.original_name().to_string()
                } else {
                    format!("{parent}.{}", node.original_name())
                };
                Suggestion::from_node(name, node)
            })
            .collect())
    }

    fn rebuild_with(&self, update: impl FnOnce(&mut Vec<FileHandle>)) -> BlockingTask<RebuildReport> {
        let token = CancellationToken::new();
        let (files, generation) = {
            let mut state = self.inner.state.lock();
            update(&mut state.known_files);
            if let Some(previous) = state.in_flight.replace(token.clone()) {
                previous.cancel();
            }
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            (state.known_files.clone(), generation)
        };

        tracing::debug!(
            target = "assist.index",
            scope = %self.inner.scope,
            generation,
            files = files.len(),
            "scheduling metadata rebuild"
        );

        let inner = Arc::clone(&self.inner);
        self.inner
            .scheduler
            .spawn_background_with_token(token, move |token| inner.rebuild(generation, files, &token))
    }
}

/// `name` with every literal segment respelled as declared in the metadata.
/// Indices and map keys keep the query text.
fn declared_spelling(name: &PropertyName, tree: &SuggestionTree) -> PropertyName {
    let chain = tree.resolve(name);
    PropertyName::from_segments(name.segments().iter().enumerate().map(|(i, segment)| {
        match chain.get(i) {
            Some(node) if !node.kind().is_wildcard() => Segment::literal(node.original_name()),
            _ => segment.clone(),
        }
    }))
}

impl ServiceInner {
    fn rebuild(
        &self,
        generation: u64,
        files: Vec<FileHandle>,
        token: &CancellationToken,
    ) -> Result<RebuildReport, Cancelled> {
        let progress = self
            .scheduler
            .progress()
            .start(format!("Loading configuration metadata for {}", self.scope));

        let total = files.len();
        let mut docs: Vec<(MetadataSource, MetadataDocument)> = Vec::with_capacity(total);
        let mut failed_files = Vec::new();
        for (idx, file) in files.iter().enumerate() {
            Cancelled::check(token)?;
            let parsed = file
                .read_bytes()
                .map_err(|err| err.to_string())
                .and_then(|bytes| MetadataDocument::from_slice(&bytes).map_err(|err| err.to_string()));
            match parsed {
                Ok(doc) => docs.push((file.source(), doc)),
                Err(reason) => {
                    tracing::warn!(
                        target = "assist.index",
                        scope = %self.scope,
                        file = %file,
                        error = %reason,
                        "skipping unreadable metadata file"
                    );
                    failed_files.push((file.clone(), reason));
                }
            }
            progress.report_fraction(file.to_string(), idx + 1, total);
        }

        let (tree, build) =
            build_tree_cancellable(docs.iter().map(|(s, d)| (s, d)), self.policy, token)?;

        {
            let mut state = self.state.lock();
            if token.is_cancelled() || self.generation.load(Ordering::SeqCst) != generation {
                return Err(Cancelled);
            }
            self.tree.store(Arc::new(tree));
            state.in_flight = None;
        }

        tracing::info!(
            target = "assist.index",
            scope = %self.scope,
            generation,
            files = total,
            properties = build.properties,
            "published suggestion tree"
        );
        progress.finish(format!("{} properties", build.properties));

        Ok(RebuildReport {
            scope: self.scope.clone(),
            generation,
            files: total,
            failed_files,
            build,
        })
    }
}
