//! Metadata file index: discovering `spring-configuration-metadata.json` files
//! in classpath roots, keeping one published suggestion tree per scope, and
//! refreshing scopes when their dependencies change.

pub mod discovery;
pub mod registry;
pub mod service;
pub mod watcher;

pub use discovery::{jar_roots_in_dir, ClasspathRoot, DiscoveryError, FileHandle, MetadataDiscovery};
pub use registry::ScopeRegistry;
pub use service::{MetadataService, RebuildReport, Suggestion};
pub use watcher::{
    added_dependencies, DependencyItem, DependencyWatcher, LibraryRef, ModuleChange, ModuleRef,
    ScopeRefresh, WatchReport,
};
