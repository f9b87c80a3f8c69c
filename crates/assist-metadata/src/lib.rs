//! Spring Boot configuration metadata: parsing `spring-configuration-metadata.json`,
//! merging documents into a [`SuggestionTree`], and answering resolve/complete
//! queries against it with relaxed property-name matching.

pub mod builder;
pub mod matcher;
pub mod name;
pub mod node;
pub mod parse;
pub mod text;
pub mod types;

pub use builder::{
    build_tree, build_tree_cancellable, BuildReport, MergePolicy, MetadataSource,
    ReplacementNotFoundError, TreeBuilder,
};
pub use matcher::SuggestionTree;
pub use name::{EmptyPathError, MalformedPathError, MalformedReason, PropertyName, Segment, SegmentKind};
pub use node::{Children, NodeKind, SuggestionNode};
pub use parse::{
    Deprecation, DeprecationLevel, MetadataDocument, MetadataError, MetadataGroup, MetadataHint,
    MetadataProperty, SchemaViolationError, ValueHint, ValueProvider,
};
pub use types::TypeDescriptor;

/// Main metadata file generated by `spring-boot-configuration-processor`.
pub const METADATA_FILE_NAME: &str = "spring-configuration-metadata.json";
/// Hand-written metadata merged in by the configuration processor.
pub const ADDITIONAL_METADATA_FILE_NAME: &str = "additional-spring-configuration-metadata.json";
