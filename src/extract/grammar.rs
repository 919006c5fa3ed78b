//! Line classification for IF/THEN/ELSE blocks.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{Aggregator, Config, Heading};

/// Built-in phrases meaning "all of the following must hold".
const AND_PHRASES: [&str; 4] = [
    "以下条件同时满足",
    "all of the following must hold",
    "both of the following",
    "all of the following",
];

/// Built-in phrases meaning "any one of the following holds".
const OR_PHRASES: [&str; 3] = [
    "以下条件满足其一",
    "any one of the following",
    "any of the following",
];

/// Built-in prefixes of platform and state-machine annotations.
const SENTINELS: [&str; 3] = ["C平台", "B平台", "FSM_index"];

static ENUMERATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s*(?P<text>.*)$").expect("enumeration pattern is valid"));

static SUB_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{2,}\d+\.\s*(?P<text>.+)$").expect("sub-item pattern is valid"));

static INDENTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{2,}\S").expect("indentation pattern is valid"));

static OR_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bor\b").expect("or pattern is valid"));

/// Errors raised while building a grammar from configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configured phrase or sentinel produced an unusable pattern.
    #[error("Invalid convention '{0}': {1}")]
    Pattern(String, regex::Error),
}

/// How a non-blank line inside an IF-block is classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// The `THEN` keyword (possibly followed by inline content).
    Then,
    /// A numbered line consisting solely of a guide phrase.
    BranchHeader(Aggregator),
    /// An un-numbered line carrying a guide phrase.
    GuidePhrase(Aggregator),
    /// `Either`: opens a list of independent scenarios.
    Either,
    /// A lone `OR`: separates independent scenarios.
    ScenarioBreak,
    /// A line that ends the block without being consumed.
    Terminator,
    /// A condition item, with its enumeration stripped.
    Item(&'a str),
}

/// The recognized textual conventions of requirement documents.
///
/// A grammar is built once from [`Config`] and shared, read-only, by every
/// scan.
#[derive(Debug, Clone)]
pub struct Grammar {
    and_phrases: Vec<String>,
    or_phrases: Vec<String>,
    sentinels: Regex,
    branch_header: Regex,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new(&Config::default()).expect("built-in conventions are valid")
    }
}

impl Grammar {
    /// Builds the grammar from the built-in conventions plus those in
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the combined phrases or sentinels do not compile
    /// into a pattern.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let and_phrases = merge(&AND_PHRASES, config.and_phrases());
        let or_phrases = merge(&OR_PHRASES, config.or_phrases());
        let sentinels = merge(&SENTINELS, config.sentinels());

        let alternation = |items: &[String]| {
            items
                .iter()
                .map(|item| regex::escape(item))
                .collect::<Vec<_>>()
                .join("|")
        };

        let sentinel_pattern = format!(r"^\s*\{{?(?:{})", alternation(&sentinels));
        let header_pattern = format!(
            r"(?i)^\s*\d+[.、]\s*(?:{}|{})\s*[:：]?\s*$",
            alternation(&and_phrases),
            alternation(&or_phrases)
        );

        Ok(Self {
            sentinels: compile(&sentinel_pattern)?,
            branch_header: compile(&header_pattern)?,
            and_phrases,
            or_phrases,
        })
    }

    /// The aggregator implied by a guide phrase anywhere in `line`.
    #[must_use]
    pub fn guide_phrase(&self, line: &str) -> Option<Aggregator> {
        let lowered = line.to_lowercase();
        let contains = |phrases: &[String]| phrases.iter().any(|phrase| lowered.contains(phrase));
        if contains(&self.and_phrases) {
            Some(Aggregator::All)
        } else if contains(&self.or_phrases) {
            Some(Aggregator::Any)
        } else {
            None
        }
    }

    /// The aggregator of a branch header line: a numbered line whose whole
    /// text is a guide phrase.
    #[must_use]
    pub fn branch_header(&self, line: &str) -> Option<Aggregator> {
        if self.branch_header.is_match(line) {
            self.guide_phrase(line)
        } else {
            None
        }
    }

    /// Whether the line is a platform or state-machine annotation.
    #[must_use]
    pub fn is_sentinel(&self, line: &str) -> bool {
        self.sentinels.is_match(line)
    }

    /// Whether the line ends an IF- or THEN-block without being part of it:
    /// a heading, a sentinel annotation, or the start of another IF-block.
    #[must_use]
    pub fn is_terminator(&self, line: &str) -> bool {
        is_if(line) || self.is_sentinel(line) || line.parse::<Heading>().is_ok()
    }

    /// Classifies a non-blank line of condition text.
    #[must_use]
    pub fn classify<'a>(&self, line: &'a str) -> Line<'a> {
        let trimmed = line.trim();
        if is_then(line) {
            return Line::Then;
        }
        if let Some(aggregator) = self.branch_header(line) {
            return Line::BranchHeader(aggregator);
        }
        if self.is_terminator(line) {
            return Line::Terminator;
        }
        if trimmed.eq_ignore_ascii_case("either") {
            return Line::Either;
        }
        if trimmed.eq_ignore_ascii_case("or") {
            return Line::ScenarioBreak;
        }
        if let Some(aggregator) = self.guide_phrase(line) {
            return Line::GuidePhrase(aggregator);
        }
        Line::Item(strip_enumeration(line))
    }
}

fn merge(builtin: &[&str], extra: &[String]) -> Vec<String> {
    builtin
        .iter()
        .map(|phrase| (*phrase).to_string())
        .chain(extra.iter().map(|phrase| phrase.trim().to_lowercase()))
        .filter(|phrase| !phrase.is_empty())
        .collect()
}

fn compile(pattern: &str) -> Result<Regex, Error> {
    Regex::new(pattern).map_err(|e| Error::Pattern(pattern.to_string(), e))
}

/// Whether the line is the `IF` sentinel.
#[must_use]
pub fn is_if(line: &str) -> bool {
    line.trim() == "IF"
}

/// Whether the line opens the THEN section.
#[must_use]
pub fn is_then(line: &str) -> bool {
    line.trim().starts_with("THEN")
}

/// Whether the line opens the ELSE section.
#[must_use]
pub fn is_else(line: &str) -> bool {
    line.trim().starts_with("ELSE")
}

/// Removes a leading `N.` enumeration and surrounding whitespace.
#[must_use]
pub fn strip_enumeration(line: &str) -> &str {
    ENUMERATION
        .captures(line)
        .and_then(|captures| captures.name("text"))
        .map_or_else(|| line.trim(), |text| text.as_str().trim())
}

/// The text of an indented sub-item (numbered or not), if `line` is one.
#[must_use]
pub fn sub_item(line: &str) -> Option<&str> {
    if let Some(captures) = SUB_ITEM.captures(line) {
        return captures.name("text").map(|text| text.as_str().trim());
    }
    INDENTED.is_match(line).then(|| line.trim())
}

/// Splits an item on the standalone keyword `or` (case-insensitive).
#[must_use]
pub fn split_or(item: &str) -> Vec<&str> {
    OR_KEYWORD
        .split(item)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("  1. 以下条件同时满足", Some(Aggregator::All); "chinese and")]
    #[test_case("2. 以下条件满足其一：", Some(Aggregator::Any); "chinese or with colon")]
    #[test_case("1. All of the following:", Some(Aggregator::All); "english and")]
    #[test_case("3. any one of the following", Some(Aggregator::Any); "english or")]
    #[test_case("以下条件同时满足", None; "not numbered")]
    #[test_case("1. 以下条件同时满足 {v} == 1", None; "phrase with content")]
    fn recognizes_branch_headers(line: &str, expected: Option<Aggregator>) {
        assert_eq!(Grammar::default().branch_header(line), expected);
    }

    #[test]
    fn classifies_lines() {
        let grammar = Grammar::default();
        assert_eq!(grammar.classify("THEN"), Line::Then);
        assert_eq!(grammar.classify("  THEN {x} = 1"), Line::Then);
        assert_eq!(grammar.classify("以下条件满足其一："), Line::GuidePhrase(Aggregator::Any));
        assert_eq!(
            grammar.classify("When all of the following must hold"),
            Line::GuidePhrase(Aggregator::All)
        );
        assert_eq!(grammar.classify("3.2 Next section"), Line::Terminator);
        assert_eq!(grammar.classify("C平台: 不适用"), Line::Terminator);
        assert_eq!(grammar.classify("{FSM_index} = 3"), Line::Terminator);
        assert_eq!(grammar.classify("IF"), Line::Terminator);
        assert_eq!(grammar.classify("Either"), Line::Either);
        assert_eq!(grammar.classify("  OR "), Line::ScenarioBreak);
        assert_eq!(grammar.classify("  2. {v} == 1"), Line::Item("{v} == 1"));
        assert_eq!(grammar.classify("{v} == 1"), Line::Item("{v} == 1"));
    }

    #[test]
    fn configured_conventions_extend_builtins() {
        let config: Config = toml::from_str(
            "_version = \"1\"\nor_phrases = [\"Either Of These\"]\nsentinels = [\"D平台\"]\n",
        )
        .unwrap();
        let grammar = Grammar::new(&config).unwrap();

        assert_eq!(grammar.branch_header("1. either of these"), Some(Aggregator::Any));
        assert!(grammar.is_sentinel("D平台 only"));
        assert!(grammar.is_sentinel("B平台 only"));
    }

    #[test_case("  1. {v} == 1", Some("{v} == 1"); "numbered")]
    #[test_case("    {v} == 1", Some("{v} == 1"); "plain indented")]
    #[test_case(" 1. {v} == 1", None; "single space")]
    #[test_case("{v} == 1", None; "flush")]
    fn recognizes_sub_items(line: &str, expected: Option<&str>) {
        assert_eq!(sub_item(line), expected);
    }

    #[test_case("{a} == 1 or {b} == 2", &["{a} == 1", "{b} == 2"]; "lowercase")]
    #[test_case("{a} == 1 OR {b} == 2 Or {c} == 3", &["{a} == 1", "{b} == 2", "{c} == 3"]; "mixed case")]
    #[test_case("{color} == 1", &["{color} == 1"]; "inside a word")]
    fn splits_on_or_keyword(item: &str, expected: &[&str]) {
        assert_eq!(split_or(item), expected);
    }

    #[test]
    fn strips_enumeration() {
        assert_eq!(strip_enumeration("  12. {v} == 1 "), "{v} == 1");
        assert_eq!(strip_enumeration("  {v} == 1 "), "{v} == 1");
    }
}
