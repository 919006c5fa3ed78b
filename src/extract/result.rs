//! Parsing of the `THEN`/`ELSE` sections that follow a condition block.

use std::{fmt, sync::LazyLock};

use regex::Regex;

use super::{
    grammar::{self, Grammar},
    normalize,
};
use crate::domain::{Aggregator, Condition};

static TRANSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<head>.*?)\s*\bfrom\b\s*(?P<from>.+?)\s*\bto\b\s*(?P<to>.+?)\s*$")
        .expect("transition pattern is valid")
});

/// Which section of the result block a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Section {
    #[default]
    Then,
    Else,
}

/// The expected outcome of one IF-block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultExpression {
    then_items: Vec<String>,
    else_items: Vec<String>,
}

impl ResultExpression {
    /// Creates an expression from already-normalized items.
    #[must_use]
    pub const fn new(then_items: Vec<String>, else_items: Vec<String>) -> Self {
        Self {
            then_items,
            else_items,
        }
    }

    /// Whether neither section has content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.then_items.is_empty() && self.else_items.is_empty()
    }

    /// Finds the first `THEN` item of the form `head from A to B`.
    ///
    /// Returns the transition and a copy of the expression in which that
    /// item is replaced by the target state `head = B`.
    #[must_use]
    pub fn transition(&self) -> Option<(Transition, Self)> {
        let (index, transition) = self
            .then_items
            .iter()
            .enumerate()
            .find_map(|(index, item)| Transition::parse(item).map(|found| (index, found)))?;

        let mut rewritten = self.clone();
        rewritten.then_items[index] = transition.after();
        Some((transition, rewritten))
    }
}

fn conjunction(items: &[String]) -> String {
    Condition::group(
        Aggregator::All,
        items.iter().map(|item| Condition::clause(item.as_str())).collect(),
    )
    .render()
}

impl fmt::Display for ResultExpression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.then_items.is_empty(), self.else_items.is_empty()) {
            (false, false) => write!(
                f,
                "THEN: ({}) || ELSE: ({})",
                conjunction(&self.then_items),
                conjunction(&self.else_items)
            ),
            (false, true) => f.write_str(&conjunction(&self.then_items)),
            (true, false) => f.write_str(&conjunction(&self.else_items)),
            (true, true) => Ok(()),
        }
    }
}

/// A result that moves a value from one state to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// What changes, with trailing `=`/`:` removed.
    pub head: String,
    /// The value before the steps.
    pub from: String,
    /// The value after the steps.
    pub to: String,
}

impl Transition {
    /// Parses `head from A to B` (keywords are case-insensitive whole words).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let captures = TRANSITION.captures(text)?;
        let head = captures["head"]
            .trim()
            .trim_end_matches(['=', ':'])
            .trim_end()
            .to_string();
        let from = captures["from"].trim().to_string();
        let to = captures["to"].trim().to_string();
        if head.is_empty() || from.is_empty() || to.is_empty() {
            return None;
        }
        Some(Self { head, from, to })
    }

    /// The state before the steps, `head = from`.
    #[must_use]
    pub fn before(&self) -> String {
        format!("{} = {}", self.head, self.from)
    }

    /// The state after the steps, `head = to`.
    #[must_use]
    pub fn after(&self) -> String {
        format!("{} = {}", self.head, self.to)
    }
}

/// The outcome of parsing a result block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResult {
    /// The recognized expression.
    pub expression: ResultExpression,
    /// Index of the first line not consumed.
    pub next: usize,
}

/// Parses the `THEN` (and optional `ELSE`) section of one IF-block.
#[derive(Debug)]
pub struct ResultParser<'a> {
    grammar: &'a Grammar,
    lines: &'a [&'a str],
    start: usize,
}

impl<'a> ResultParser<'a> {
    /// Creates a parser positioned at the `THEN` line.
    #[must_use]
    pub const fn new(grammar: &'a Grammar, lines: &'a [&'a str], start: usize) -> Self {
        Self {
            grammar,
            lines,
            start,
        }
    }

    /// Consumes lines until a heading, a sentinel annotation, the next `IF`
    /// or the end of input.
    #[must_use]
    pub fn parse(self) -> ParsedResult {
        let mut section = Section::default();
        let mut then_items = Vec::new();
        let mut else_items = Vec::new();
        let mut index = self.start;

        while let Some(&line) = self.lines.get(index) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                index += 1;
                continue;
            }

            let content = if grammar::is_then(line) {
                section = Section::Then;
                keyword_content(trimmed, "THEN")
            } else if grammar::is_else(line) {
                section = Section::Else;
                keyword_content(trimmed, "ELSE")
            } else if self.grammar.is_terminator(line) {
                break;
            } else {
                grammar::strip_enumeration(line)
            };

            if !content.is_empty() {
                let item = normalize::normalize(content);
                match section {
                    Section::Then => then_items.push(item),
                    Section::Else => else_items.push(item),
                }
            }
            index += 1;
        }

        ParsedResult {
            expression: ResultExpression::new(then_items, else_items),
            next: index,
        }
    }
}

/// Inline content written after a section keyword, as in `THEN {out}=1`.
fn keyword_content<'t>(line: &'t str, keyword: &str) -> &'t str {
    let rest = line.strip_prefix(keyword).unwrap_or(line);
    grammar::strip_enumeration(rest.trim_start_matches([':', '：']))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn parse(text: &str) -> ParsedResult {
        let lines: Vec<&str> = text.lines().collect();
        let grammar = Grammar::default();
        ResultParser::new(&grammar, &lines, 0).parse()
    }

    fn items(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|text| (*text).to_string()).collect()
    }

    #[test]
    fn then_only_is_unlabeled() {
        let parsed = parse("THEN\n  1. p\n\n  2. q\n");
        assert_eq!(parsed.expression.to_string(), "p && q");
        assert_eq!(parsed.next, 4);
    }

    #[test]
    fn then_and_else_are_labeled() {
        let parsed = parse("THEN\n1. p\n2. q\nELSE\n1. r");
        assert_eq!(
            parsed.expression,
            ResultExpression::new(items(&["p", "q"]), items(&["r"]))
        );
        assert_eq!(parsed.expression.to_string(), "THEN: (p && q) || ELSE: (r)");
    }

    #[test]
    fn inline_content_after_keyword() {
        let parsed = parse("THEN {out}=1\nELSE: {out}=0");
        assert_eq!(parsed.expression.to_string(), "THEN: ({out} = 1) || ELSE: ({out} = 0)");
    }

    #[test]
    fn items_are_normalized() {
        let parsed = parse("THEN\n  1. {out}＝0x1(Active)");
        assert_eq!(parsed.expression.to_string(), "{out} = 0x1: Active");
    }

    #[test_case("THEN\n{a}=1\n3.2 Next\n{b}=2", 2; "heading")]
    #[test_case("THEN\n{a}=1\nB平台：不涉及\n{b}=2", 2; "sentinel")]
    #[test_case("THEN\n{a}=1\n\nIF\n{b}=2", 3; "next block")]
    #[test_case("THEN\n{a}=1", 2; "end of input")]
    fn stops_at_terminators(text: &str, next: usize) {
        let parsed = parse(text);
        assert_eq!(parsed.expression.to_string(), "{a} = 1");
        assert_eq!(parsed.next, next);
    }

    #[test]
    fn empty_block() {
        let parsed = parse("THEN\nIF");
        assert!(parsed.expression.is_empty());
        assert_eq!(parsed.expression.to_string(), "");
    }

    #[test_case("{mode} = from 1 to 2", "{mode}", "1", "2"; "with equals")]
    #[test_case("状态: From OFF To ON", "状态", "OFF", "ON"; "with colon and capitals")]
    #[test_case("{gear} from P to D", "{gear}", "P", "D"; "bare")]
    fn detects_transitions(text: &str, head: &str, from: &str, to: &str) {
        let transition = Transition::parse(text).unwrap();
        assert_eq!(transition.head, head);
        assert_eq!(transition.from, from);
        assert_eq!(transition.to, to);
    }

    #[test_case("{platform} = 0x1: Tofrom"; "keywords inside words")]
    #[test_case("from 1 to 2"; "missing head")]
    #[test_case("{a} = 1"; "no keywords")]
    fn rejects_non_transitions(text: &str) {
        assert_eq!(Transition::parse(text), None);
    }

    #[test]
    fn transition_is_found_among_then_items() {
        let expression = ResultExpression::new(
            items(&["{lamp} = 1", "{state} = from Standby to Active"]),
            items(&["{warn} = 1"]),
        );

        let (transition, rewritten) = expression.transition().unwrap();

        assert_eq!(transition.before(), "{state} = Standby");
        assert_eq!(
            rewritten.to_string(),
            "THEN: ({lamp} = 1 && {state} = Active) || ELSE: ({warn} = 1)"
        );
    }

    #[test]
    fn else_items_are_not_transitions() {
        let expression =
            ResultExpression::new(items(&["{a} = 1"]), items(&["{b} = from 1 to 2"]));
        assert_eq!(expression.transition(), None);
    }

    #[test]
    fn transition_states() {
        let transition = Transition::parse("{mode} = from 1 to 2").unwrap();
        assert_eq!(transition.before(), "{mode} = 1");
        assert_eq!(transition.after(), "{mode} = 2");
    }
}
