use std::fmt;

/// How the members of a group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregator {
    /// Every member must hold (`&&`).
    #[default]
    All,
    /// At least one member must hold (`||`).
    Any,
}

impl Aggregator {
    /// The operator placed between members when flattening to text.
    const fn separator(self) -> &'static str {
        match self {
            Self::All => " && ",
            Self::Any => " || ",
        }
    }
}

/// A node of a test-step expression.
///
/// Leaves are normalized condition clauses. Groups combine their members
/// with a single aggregator and are parenthesized whenever they are nested
/// inside another expression, so precedence survives flattening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// A single normalized condition, e.g. `{v} == 1`.
    Clause(String),
    /// Members joined by one aggregator.
    Group {
        /// The operator joining the members.
        aggregator: Aggregator,
        /// The members, in document order.
        members: Vec<Condition>,
    },
}

impl Condition {
    /// Creates a leaf.
    #[must_use]
    pub fn clause(text: impl Into<String>) -> Self {
        Self::Clause(text.into())
    }

    /// Creates a group.
    #[must_use]
    pub const fn group(aggregator: Aggregator, members: Vec<Self>) -> Self {
        Self::Group {
            aggregator,
            members,
        }
    }

    /// Whether the node renders to nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Clause(text) => text.trim().is_empty(),
            Self::Group { members, .. } => members.iter().all(Self::is_empty),
        }
    }

    /// Renders the node as a top-level expression.
    ///
    /// A top-level conjunction is left bare (`A && B`); a top-level
    /// disjunction keeps its parentheses (`(A || B)`).
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Group {
                aggregator: Aggregator::All,
                members,
            } => join(Aggregator::All, members),
            _ => self.render_nested(),
        }
    }

    fn render_nested(&self) -> String {
        match self {
            Self::Clause(text) if has_operator(text) => format!("({text})"),
            Self::Clause(text) => text.clone(),
            Self::Group { aggregator, members } => {
                let live: Vec<&Self> = members.iter().filter(|m| !m.is_empty()).collect();
                match live.as_slice() {
                    [] => String::new(),
                    [single] => single.render_nested(),
                    _ => format!("({})", join(*aggregator, members)),
                }
            }
        }
    }
}

fn join(aggregator: Aggregator, members: &[Condition]) -> String {
    members
        .iter()
        .filter(|member| !member.is_empty())
        .map(Condition::render_nested)
        .collect::<Vec<_>>()
        .join(aggregator.separator())
}

fn has_operator(text: &str) -> bool {
    text.contains("&&") || text.contains("||") || text.contains('&')
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// The parsed content of one IF-block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConditionBlock {
    /// No condition was recognized.
    #[default]
    Empty,
    /// One expression, tested as a single scenario.
    Single(Condition),
    /// Independent alternatives, each tested as its own scenario.
    Scenarios(Vec<Condition>),
}

impl ConditionBlock {
    /// Flattens the block into one step expression per scenario.
    ///
    /// An empty block still yields one (empty) expression, so that a
    /// malformed block produces a row rather than vanishing.
    #[must_use]
    pub fn branches(&self) -> Vec<String> {
        match self {
            Self::Empty => vec![String::new()],
            Self::Single(condition) => vec![condition.render()],
            Self::Scenarios(scenarios) => scenarios.iter().map(Condition::render).collect(),
        }
    }
}

impl fmt::Display for ConditionBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Single(condition) => condition.fmt(f),
            Self::Scenarios(scenarios) => {
                let rendered: Vec<String> = scenarios
                    .iter()
                    .map(|scenario| format!("({})", scenario.render()))
                    .collect();
                write!(f, "Either: {}", rendered.join(" OR "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clauses(aggregator: Aggregator, texts: &[&str]) -> Condition {
        Condition::group(aggregator, texts.iter().map(|t| Condition::clause(*t)).collect())
    }

    #[test]
    fn top_level_conjunction_is_bare() {
        let condition = clauses(Aggregator::All, &["A", "B"]);
        assert_eq!(condition.render(), "A && B");
    }

    #[test]
    fn top_level_disjunction_is_parenthesized() {
        let condition = clauses(Aggregator::Any, &["a", "b", "c"]);
        assert_eq!(condition.render(), "(a || b || c)");
    }

    #[test]
    fn nested_groups_keep_precedence() {
        let condition = Condition::group(
            Aggregator::All,
            vec![
                clauses(Aggregator::All, &["A", "B"]),
                clauses(Aggregator::Any, &["C", "D"]),
            ],
        );
        assert_eq!(condition.render(), "(A && B) && (C || D)");
    }

    #[test]
    fn single_member_groups_collapse() {
        let condition = Condition::group(
            Aggregator::All,
            vec![clauses(Aggregator::All, &["{v} == 1", "{w} > 5"])],
        );
        assert_eq!(condition.render(), "({v} == 1 && {w} > 5)");

        let condition = Condition::group(Aggregator::Any, vec![Condition::clause("A")]);
        assert_eq!(condition.render(), "A");
    }

    #[test]
    fn clauses_with_operators_are_wrapped_when_nested() {
        let condition = Condition::group(
            Aggregator::All,
            vec![Condition::clause("A || B"), Condition::clause("C")],
        );
        assert_eq!(condition.render(), "(A || B) && C");
    }

    #[test]
    fn empty_members_are_skipped() {
        let condition = Condition::group(
            Aggregator::All,
            vec![
                Condition::clause(""),
                Condition::group(Aggregator::Any, Vec::new()),
                Condition::clause("A"),
            ],
        );
        assert_eq!(condition.render(), "A");
    }

    #[test]
    fn scenarios_yield_one_branch_each() {
        let block = ConditionBlock::Scenarios(vec![
            clauses(Aggregator::All, &["A", "B"]),
            Condition::clause("C"),
        ]);
        assert_eq!(block.branches(), vec!["A && B".to_string(), "C".to_string()]);
        assert_eq!(block.to_string(), "Either: (A && B) OR (C)");
    }

    #[test]
    fn empty_block_yields_one_empty_branch() {
        assert_eq!(ConditionBlock::Empty.branches(), vec![String::new()]);
    }
}
