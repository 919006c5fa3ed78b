//! The extraction engine.
//!
//! Extraction is a single pass over the lines of one document. Headings
//! update the live section hierarchy; every `IF` line starts a block whose
//! conditions and expected results are parsed and combined with the
//! hierarchy into [`Record`]s.
//!
//! ```
//! let text = "3.2.1 Lane Keep【REQ-7】\nIF\n{v}==1\nTHEN\n{out}=1\n";
//! let records = reqcase::extract::extract_records(text);
//!
//! assert_eq!(records[0].requirement_id, "REQ-7");
//! assert_eq!(records[0].steps, "{v} == 1");
//! assert_eq!(records[0].expected_result, "{out} = 1");
//! ```

/// Canonicalization of annotation syntax.
pub mod normalize;

/// Recognized textual conventions and line classification.
pub mod grammar;
pub use grammar::Grammar;

/// Parsing of IF-block conditions.
pub mod condition;
pub use condition::{ConditionParser, ParsedConditions};

/// Parsing of THEN/ELSE results.
pub mod result;
pub use result::{ParsedResult, ResultExpression, ResultParser, Transition};

mod rows;
pub use rows::Extractor;

use crate::domain::Record;

/// Extracts the records of one document using the built-in conventions.
#[must_use]
pub fn extract_records(text: &str) -> Vec<Record> {
    Extractor::default().extract(text)
}
