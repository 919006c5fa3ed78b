//! Test-case extraction from plain-text requirement specifications
//!
//! Requirement documents are plain text with numbered section headings and
//! embedded `IF` / `THEN` / `ELSE` blocks. Each block is turned into one or
//! more tabular test-case [`Record`]s.

pub mod domain;
pub use domain::{Config, Heading, HeadingTracker, Record};

/// The extraction engine.
pub mod extract;
pub use extract::{Extractor, Grammar, extract_records};

/// Filesystem input and output of documents and records.
pub mod storage;
pub use storage::{Document, Format, LoadError};
