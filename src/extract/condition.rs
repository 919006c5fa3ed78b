//! Parsing of the condition lines between `IF` and `THEN`.
//!
//! Two layouts are recognized. The flat layout lists condition items,
//! optionally under a guide phrase, and may contain numbered branch headers
//! that open an indented sub-group:
//!
//! ```text
//! IF
//!   1. 以下条件同时满足
//!     {v}==1
//!     {w}>5 (HighSpeed)
//! THEN
//! ```
//!
//! The nested layout starts with a top-level guide phrase directly followed
//! by branch headers; every branch is a group and the branches are joined
//! by the outer phrase's aggregator:
//!
//! ```text
//! IF
//! 以下条件同时满足
//!   1. 以下条件同时满足
//!       1. A
//!       2. B
//!   2. 以下条件满足其一
//!       1. C
//!       2. D
//! THEN
//! ```
//!
//! The grammar never nests deeper than these two levels.

use super::{
    grammar::{self, Grammar, Line},
    normalize,
};
use crate::domain::{Aggregator, Condition, ConditionBlock};

/// The result of parsing one IF-block's conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConditions {
    /// The recognized expression.
    pub block: ConditionBlock,
    /// Index of the line the scan stopped at: the `THEN` line on success,
    /// otherwise the terminator or the end of input.
    pub next: usize,
}

/// Where the parser is within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Scanning top-level items.
    TopScan,
    /// Collecting the sub-items of a branch header.
    InBranch(Aggregator),
    /// Stopped at `THEN` or a terminator.
    Done,
}

/// Parses the conditions of one IF-block.
#[derive(Debug)]
pub struct ConditionParser<'a> {
    grammar: &'a Grammar,
    lines: &'a [&'a str],
    cursor: usize,
}

impl<'a> ConditionParser<'a> {
    /// Creates a parser positioned at `start`, the line after `IF`.
    #[must_use]
    pub const fn new(grammar: &'a Grammar, lines: &'a [&'a str], start: usize) -> Self {
        Self {
            grammar,
            lines,
            cursor: start,
        }
    }

    /// Consumes lines up to (not including) `THEN` or a terminator.
    #[must_use]
    pub fn parse(mut self) -> ParsedConditions {
        let mut aggregator = None;

        let first = self.skip_blank(self.cursor);
        if let Some(line) = self.lines.get(first) {
            if let Line::GuidePhrase(outer) = self.grammar.classify(line) {
                aggregator = Some(outer);
                let after = self.skip_blank(first + 1);
                if self
                    .lines
                    .get(after)
                    .is_some_and(|line| self.grammar.branch_header(line).is_some())
                {
                    self.cursor = after;
                    return self.parse_nested(outer);
                }
                self.cursor = first + 1;
            }
        }

        self.parse_flat(aggregator)
    }

    fn parse_flat(mut self, mut aggregator: Option<Aggregator>) -> ParsedConditions {
        let mut units: Vec<Condition> = Vec::new();
        let mut scenarios: Vec<Vec<Condition>> = Vec::new();
        let mut in_scenarios = false;
        let mut state = State::TopScan;

        while state != State::Done {
            match state {
                State::TopScan => {
                    let Some(line) = self.lines.get(self.cursor).copied() else {
                        state = State::Done;
                        continue;
                    };
                    if line.trim().is_empty() {
                        self.cursor += 1;
                        continue;
                    }
                    match self.grammar.classify(line) {
                        Line::Then | Line::Terminator => state = State::Done,
                        Line::BranchHeader(branch) => {
                            self.cursor += 1;
                            state = State::InBranch(branch);
                        }
                        Line::GuidePhrase(Aggregator::All) => {
                            aggregator = Some(Aggregator::All);
                            self.cursor += 1;
                        }
                        Line::GuidePhrase(Aggregator::Any) => {
                            let (group, after) = self.collect_sub_items(self.cursor + 1);
                            if group.is_empty() {
                                aggregator = Some(Aggregator::Any);
                                self.cursor += 1;
                            } else {
                                units.push(Condition::group(Aggregator::Any, group));
                                self.cursor = after;
                            }
                        }
                        Line::Either => {
                            in_scenarios = true;
                            self.cursor += 1;
                        }
                        Line::ScenarioBreak => {
                            if in_scenarios {
                                scenarios.push(std::mem::take(&mut units));
                            }
                            self.cursor += 1;
                        }
                        Line::Item(item) => {
                            if !item.is_empty() {
                                units.push(parse_item(item));
                            }
                            self.cursor += 1;
                        }
                    }
                }
                State::InBranch(branch) => {
                    let (group, after) = self.collect_sub_items(self.cursor);
                    if group.is_empty() {
                        aggregator = Some(branch);
                    } else {
                        units.push(Condition::group(branch, group));
                    }
                    self.cursor = after;
                    state = State::TopScan;
                }
                State::Done => {}
            }
        }

        let aggregator = aggregator.unwrap_or_default();
        let block = if in_scenarios {
            scenarios.push(units);
            let scenarios: Vec<Condition> = scenarios
                .into_iter()
                .map(|units| Condition::group(aggregator, units))
                .filter(|scenario| !scenario.is_empty())
                .collect();
            tracing::debug!(count = scenarios.len(), "independent scenarios");
            scenario_block(scenarios)
        } else if units.is_empty() {
            ConditionBlock::Empty
        } else {
            ConditionBlock::Single(Condition::group(aggregator, units))
        };

        ParsedConditions {
            block,
            next: self.cursor,
        }
    }

    /// Two-level layout: the outer aggregator joins branches, each branch
    /// joins its own items.
    ///
    /// When the outer aggregator is OR, every branch is an independent
    /// scenario.
    fn parse_nested(mut self, outer: Aggregator) -> ParsedConditions {
        let mut branches: Vec<Condition> = Vec::new();

        while let Some(line) = self.lines.get(self.cursor).copied() {
            if line.trim().is_empty() {
                self.cursor += 1;
                continue;
            }
            match self.grammar.classify(line) {
                Line::BranchHeader(branch) => {
                    let (group, after) = self.collect_sub_items(self.cursor + 1);
                    if !group.is_empty() {
                        branches.push(Condition::group(branch, group));
                    }
                    self.cursor = after;
                }
                Line::Item(item) if grammar::strip_enumeration(line) != line.trim() => {
                    branches.push(parse_item(item));
                    self.cursor += 1;
                }
                _ => break,
            }
        }

        // Skip stray text between the last branch and THEN.
        while let Some(line) = self.lines.get(self.cursor) {
            if grammar::is_then(line) || self.grammar.is_terminator(line) {
                break;
            }
            self.cursor += 1;
        }

        let block = match (outer, branches.len()) {
            (_, 0) => ConditionBlock::Empty,
            (Aggregator::Any, count) if count > 1 => {
                tracing::debug!(count, "alternative branches become separate scenarios");
                ConditionBlock::Scenarios(branches)
            }
            _ => ConditionBlock::Single(Condition::group(outer, branches)),
        };

        ParsedConditions {
            block,
            next: self.cursor,
        }
    }

    /// Collects the indented items following a branch header or guide
    /// phrase, starting at `start`.
    ///
    /// Returns the items and the index of the first line not consumed.
    /// Blank lines are skipped; `THEN`, another branch header or a
    /// non-indented line ends the list.
    fn collect_sub_items(&self, start: usize) -> (Vec<Condition>, usize) {
        let mut items = Vec::new();
        let mut index = start;
        while let Some(line) = self.lines.get(index) {
            if grammar::is_then(line) || self.grammar.branch_header(line).is_some() {
                break;
            }
            if let Some(item) = grammar::sub_item(line) {
                items.push(parse_item(item));
            } else if !line.trim().is_empty() {
                break;
            }
            index += 1;
        }
        (items, index)
    }

    fn skip_blank(&self, mut index: usize) -> usize {
        while self
            .lines
            .get(index)
            .is_some_and(|line| line.trim().is_empty())
        {
            index += 1;
        }
        index
    }
}

fn scenario_block(mut scenarios: Vec<Condition>) -> ConditionBlock {
    match scenarios.len() {
        0 => ConditionBlock::Empty,
        1 => ConditionBlock::Single(scenarios.remove(0)),
        _ => ConditionBlock::Scenarios(scenarios),
    }
}

/// Turns one condition item into an expression node.
///
/// The item is split on the standalone keyword `or`; each part gets its
/// free-text label separated, has slash alternatives expanded and is
/// normalized.
#[must_use]
pub fn parse_item(item: &str) -> Condition {
    let mut parts: Vec<Condition> = grammar::split_or(item)
        .into_iter()
        .map(|part| expand_alternatives(&normalize::label_signal_prefix(part)))
        .collect();
    if parts.is_empty() {
        return Condition::clause(normalize::normalize(item));
    }

    if parts.len() == 1 {
        parts.remove(0)
    } else {
        Condition::group(Aggregator::Any, parts)
    }
}

/// Expands `{X} = A/B` into `({X} = A || {X} = B)`.
///
/// Only an explicit signal comparison on the left of the slash is expanded;
/// anything else is normalized as a single clause.
fn expand_alternatives(part: &str) -> Condition {
    const OPERATORS: [&str; 7] = ["==", ">=", "<=", "!=", ">", "<", "="];

    let alternatives = normalize::split_alternatives(part);
    if alternatives.len() > 1 {
        let first = &alternatives[0];
        let split = OPERATORS.iter().find_map(|&operator| {
            first
                .split_once(operator)
                .map(|(head, value)| (head, operator, value))
        });
        if let Some((head, operator, value)) = split {
            let head = head.trim();
            if is_braced_signal(head) {
                let clauses = std::iter::once(value.trim())
                    .chain(alternatives[1..].iter().map(String::as_str))
                    .filter(|value| !value.is_empty())
                    .map(|value| {
                        let value = flip_label(value);
                        Condition::clause(normalize::normalize(&format!("{head} {operator} {value}")))
                    })
                    .collect();
                return Condition::group(Aggregator::Any, clauses);
            }
        }
    }
    Condition::clause(normalize::normalize(part))
}

fn is_braced_signal(text: &str) -> bool {
    text.starts_with('{')
        && text.ends_with('}')
        && text.len() > 2
        && !text[1..text.len() - 1].contains(['{', '}'])
}

/// Rewrites `LABEL:value` as `value:LABEL`.
fn flip_label(value: &str) -> String {
    match value.split_once(':') {
        Some((label, rest))
            if !rest.contains(':')
                && !rest.trim().is_empty()
                && label.trim().starts_with(|ch: char| ch.is_ascii_alphabetic())
                && label
                    .trim()
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_') =>
        {
            format!("{}:{}", rest.trim(), label.trim())
        }
        _ => value.trim().to_string(),
    }
}
