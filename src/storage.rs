//! Filesystem glue around the extraction engine.
//!
//! Documents are read from a single file or a directory tree; records are
//! written as delimited text or JSON.

mod document;
pub use document::{Document, LoadError};

mod table;
pub use table::{Format, Table};
