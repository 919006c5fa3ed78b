//! Domain models for test-case extraction.
//!
//! This module contains the typed data model shared by the extraction
//! engine and its callers: section headings, condition expressions, output
//! records, and configuration.

/// Numbered section headings and the live heading hierarchy.
pub mod heading;
pub use heading::{Error as HeadingError, Heading, HeadingTracker};

/// Boolean test-step expressions.
pub mod condition;
pub use condition::{Aggregator, Condition, ConditionBlock};

mod config;
pub use config::Config;

mod record;
pub use record::{InitialCondition, Record};
