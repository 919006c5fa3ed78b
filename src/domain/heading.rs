use std::{collections::BTreeMap, fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<num>\d+(?:\.\d+)*)\s+(?P<title>.*?)(?:【(?P<id>[^】]+)】)?\s*$")
        .expect("heading pattern is valid")
});

/// One numbered section title.
///
/// Format: `<dotted-number> <title>[【<id>】]`, for example
/// `3.2.1 Lane Keep【REQ-7】`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    number: String,
    title: String,
    id: Option<String>,
}

impl Heading {
    /// Creates a heading from pre-split parts.
    ///
    /// An empty or whitespace-only id is treated as absent.
    #[must_use]
    pub fn new(number: impl Into<String>, title: impl Into<String>, id: Option<String>) -> Self {
        Self {
            number: number.into(),
            title: title.into(),
            id: id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        }
    }

    /// The dotted section number, e.g. `3.2.1`.
    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }

    /// The title text, without the bracketed id.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The requirement identifier embedded in the title, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Depth in the section hierarchy: the number of dot-separated
    /// components in the section number.
    #[must_use]
    pub fn level(&self) -> usize {
        self.number.split('.').count()
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.number, self.title)
    }
}

/// Returned when a line is not a heading.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Not a heading: '{0}'")]
pub struct Error(String);

impl FromStr for Heading {
    type Err = Error;

    /// Parses a heading line.
    ///
    /// Dotted numbers (`1.2`, `3.2.1`) may be indented. A bare top-level
    /// number (`2 Overview`) is only accepted at column 0 with a non-empty
    /// title, so that indented enumerations are never read as headings.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let trimmed = line.trim();
        let captures = HEADING
            .captures(trimmed)
            .ok_or_else(|| Error(line.to_string()))?;

        let number = &captures["num"];
        let title = captures["title"].trim();

        if !number.contains('.') && (line.starts_with(char::is_whitespace) || title.is_empty()) {
            return Err(Error(line.to_string()));
        }

        let id = captures.name("id").map(|id| id.as_str().to_string());
        Ok(Self::new(number, title, id))
    }
}

/// Tracks the live section hierarchy during a single document scan.
///
/// At most one heading is held per level. Seeing a heading discards every
/// held heading at the same or a deeper level, so a sibling or ancestor
/// invalidates the stale subtree. Levels may be skipped.
#[derive(Debug, Default, Clone)]
pub struct HeadingTracker {
    levels: BTreeMap<usize, Heading>,
}

impl HeadingTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line to the tracker.
    ///
    /// Returns `true` if the line was a heading (and the hierarchy was
    /// updated), `false` otherwise. Non-heading lines leave the hierarchy
    /// untouched.
    pub fn update(&mut self, line: &str) -> bool {
        match line.parse::<Heading>() {
            Ok(heading) => {
                tracing::trace!(number = heading.number(), "heading");
                self.push(heading);
                true
            }
            Err(_) => false,
        }
    }

    /// Installs a heading at its level, pruning that level and everything
    /// deeper.
    pub fn push(&mut self, heading: Heading) {
        let level = heading.level();
        self.levels.retain(|&held, _| held < level);
        self.levels.insert(level, heading);
    }

    /// The heading currently held at `level`.
    #[must_use]
    pub fn heading_at_level(&self, level: usize) -> Option<&Heading> {
        self.levels.get(&level)
    }

    /// The deepest heading currently held.
    #[must_use]
    pub fn deepest(&self) -> Option<&Heading> {
        self.iter().next_back()
    }

    /// Walks from the deepest held level up to level 1 and returns the first
    /// heading carrying a requirement id.
    #[must_use]
    pub fn nearest_ancestor_with_id(&self) -> Option<&Heading> {
        self.iter().rev().find(|heading| heading.id().is_some())
    }

    /// The held headings, shallowest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Heading> {
        self.levels.values()
    }
}
