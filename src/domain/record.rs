use std::fmt;

use serde::Serialize;

/// One extracted test case.
///
/// Records are produced once per IF-block (possibly several when a block
/// describes alternatives) and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Identifier of the nearest enclosing requirement, or empty.
    pub requirement_id: String,
    /// Title of the enclosing requirement heading.
    pub test_point: String,
    /// Precondition context paired with the expected outcome.
    pub initial_condition: String,
    /// The test steps as a boolean expression.
    pub steps: String,
    /// The expected result as a boolean expression.
    pub expected_result: String,
}

impl Record {
    /// The fields in output column order.
    #[must_use]
    pub fn fields(&self) -> [&str; 5] {
        [
            &self.requirement_id,
            &self.test_point,
            &self.initial_condition,
            &self.steps,
            &self.expected_result,
        ]
    }
}

/// The precondition of a test case, kept as ordered segments.
///
/// The first segment is the context taken from the section hierarchy; later
/// segments record the state the test is paired against. Segments are
/// rendered joined by ` : `.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InitialCondition {
    segments: Vec<String>,
}

impl InitialCondition {
    /// Starts an initial condition from its context text.
    #[must_use]
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            segments: vec![context.into()],
        }
    }

    /// Appends a state annotation.
    #[must_use]
    pub fn annotate(mut self, state: impl Into<String>) -> Self {
        self.segments.push(state.into());
        self
    }

    /// The segments, context first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Replaces the segment at `index`.
    #[must_use]
    pub fn with_segment(&self, index: usize, segment: String) -> Self {
        let mut segments = self.segments.clone();
        if let Some(slot) = segments.get_mut(index) {
            *slot = segment;
        }
        Self { segments }
    }
}

impl fmt::Display for InitialCondition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.segments.join(" : "))
    }
}
