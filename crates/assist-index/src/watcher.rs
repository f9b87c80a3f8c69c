//! Reacting to dependency changes of modules: newly added dependencies are
//! scanned for metadata files, which are handed to the owning scope.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use assist_config::IndexConfig;
use assist_core::ScopeId;
use assist_scheduler::{BlockingTask, CancellationToken, Cancelled, KeyedDebouncer};
use parking_lot::Mutex;

use crate::discovery::{ClasspathRoot, FileHandle, MetadataDiscovery};
use crate::registry::ScopeRegistry;
use crate::service::RebuildReport;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModuleRef {
    pub name: String,
    /// Excluded directories of the module's content roots (build output).
    pub excluded_dirs: Vec<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LibraryRef {
    pub name: String,
    pub roots: Vec<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DependencyItem {
    Module(ModuleRef),
    Library(LibraryRef),
    /// SDKs, source folders and anything else that never carries metadata.
    Other(String),
}

impl DependencyItem {
    pub fn classpath_roots(&self) -> Vec<ClasspathRoot> {
        match self {
            DependencyItem::Module(module) => module
                .excluded_dirs
                .iter()
                .map(|dir| ClasspathRoot::Directory(dir.clone()))
                .collect(),
            DependencyItem::Library(library) => library
                .roots
                .iter()
                .filter_map(|root| ClasspathRoot::from_path(root.clone()))
                .collect(),
            DependencyItem::Other(_) => Vec::new(),
        }
    }
}

/// Items of `new` that are not in `old`, in `new`'s order.
pub fn added_dependencies<'a>(old: &[DependencyItem], new: &'a [DependencyItem]) -> Vec<&'a DependencyItem> {
    new.iter().filter(|item| !old.contains(item)).collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleChange {
    pub scope: ScopeId,
    pub old: Vec<DependencyItem>,
    pub new: Vec<DependencyItem>,
}

/// A rebuild started for one scope.
pub struct ScopeRefresh {
    pub scope: ScopeId,
    pub files: Vec<FileHandle>,
    pub task: BlockingTask<RebuildReport>,
}

#[derive(Default)]
pub struct WatchReport {
    pub modules: usize,
    pub refreshed: Vec<ScopeRefresh>,
}

struct WatcherInner {
    registry: ScopeRegistry,
    discovery: MetadataDiscovery,
    pending: Mutex<HashMap<ScopeId, Vec<DependencyItem>>>,
}

#[derive(Clone)]
pub struct DependencyWatcher {
    inner: Arc<WatcherInner>,
    debouncer: KeyedDebouncer<ScopeId>,
}

impl DependencyWatcher {
    pub fn new(registry: ScopeRegistry, discovery: MetadataDiscovery, debounce: Duration) -> Self {
        let debouncer = KeyedDebouncer::new(registry.scheduler().clone(), debounce);
        Self {
            inner: Arc::new(WatcherInner {
                registry,
                discovery,
                pending: Mutex::new(HashMap::new()),
            }),
            debouncer,
        }
    }

    /// A watcher debounced by `[index] debounce_ms`.
    pub fn from_config(registry: ScopeRegistry, discovery: MetadataDiscovery, config: &IndexConfig) -> Self {
        Self::new(registry, discovery, config.debounce())
    }

    pub fn debounce_delay(&self) -> Duration {
        self.debouncer.delay()
    }

    pub fn registry(&self) -> &ScopeRegistry {
        &self.inner.registry
    }

    /// Handle a batch of module changes on the background pool.
    pub fn process(&self, changes: Vec<ModuleChange>) -> BlockingTask<WatchReport> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .registry
            .scheduler()
            .spawn_background(move |token| inner.process(&changes, &token))
    }

    /// Queue a module change; changes to the same scope arriving within the
    /// debounce window are handled together.
    pub fn schedule(&self, change: ModuleChange) -> CancellationToken {
        {
            let mut pending = self.inner.pending.lock();
            let queued = pending.entry(change.scope.clone()).or_default();
            for item in added_dependencies(&change.old, &change.new) {
                if !queued.contains(item) {
                    queued.push(item.clone());
                }
            }
        }

        let inner = Arc::clone(&self.inner);
        let scope = change.scope.clone();
        self.debouncer.debounce(change.scope, move |token| {
            Cancelled::check(&token)?;
            let Some(items) = inner.pending.lock().remove(&scope) else {
                return Ok(());
            };
            inner.refresh_scope(&scope, items.iter());
            Ok(())
        })
    }

    pub fn is_pending(&self, scope: &ScopeId) -> bool {
        self.debouncer.is_pending(scope)
    }
}

impl WatcherInner {
    fn process(&self, changes: &[ModuleChange], token: &CancellationToken) -> Result<WatchReport, Cancelled> {
        let progress = self
            .registry
            .scheduler()
            .progress()
            .start("Scanning dependencies for configuration metadata");

        let mut report = WatchReport {
            modules: changes.len(),
            refreshed: Vec::new(),
        };
        for (idx, change) in changes.iter().enumerate() {
            Cancelled::check(token)?;
            let added = added_dependencies(&change.old, &change.new);
            if let Some(refresh) = self.refresh_scope(&change.scope, added.into_iter()) {
                report.refreshed.push(refresh);
            }
            progress.report_fraction(change.scope.to_string(), idx + 1, changes.len());
        }
        progress.finish(None);
        Ok(report)
    }

    fn refresh_scope<'a>(
        &self,
        scope: &ScopeId,
        items: impl Iterator<Item = &'a DependencyItem>,
    ) -> Option<ScopeRefresh> {
        let roots: Vec<ClasspathRoot> = items.flat_map(DependencyItem::classpath_roots).collect();
        if roots.is_empty() {
            return None;
        }
        let files = self.discovery.find_in_roots(&roots);
        tracing::debug!(
            target = "assist.index",
            scope = %scope,
            roots = roots.len(),
            files = files.len(),
            "scanned added dependencies"
        );
        if files.is_empty() {
            return None;
        }

        let task = self
            .registry
            .get_or_create(scope)
            .refresh_metadata(files.iter().cloned());
        Some(ScopeRefresh {
            scope: scope.clone(),
            files,
            task,
        })
    }
}
