//! Core shared types for spring-assist.
//!
//! This crate is intentionally small: text ranges, scope identifiers, and a few
//! filesystem helpers shared by the indexing and navigation crates.

mod fs;
mod text;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use fs::collect_files_with_extension;
pub use text::{text_range, text_size, LineCol, LineIndex, TextRange, TextSize};

/// Identifier of a dependency scope (a project or one of its modules).
///
/// Every scope owns exactly one suggestion tree; the identifier is the key of
/// the process-wide scope registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(String);

impl ScopeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ScopeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Render a `catch_unwind` payload as text for logging.
pub fn panic_payload_to_str(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}
