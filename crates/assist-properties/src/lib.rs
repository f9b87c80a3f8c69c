//! A range-preserving parser for Java `.properties` files, and navigation
//! from the key under a cursor to its configuration metadata.

mod navigate;
mod parse;

pub use navigate::{key_at_offset, resolve_key, resolve_reference, KeyReference};
pub use parse::{parse, EntryPart, PropertiesFile, PropertyEntry};
