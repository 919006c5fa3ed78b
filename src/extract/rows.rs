use tracing::instrument;

use super::{
    condition::ConditionParser,
    grammar::{self, Grammar},
    normalize,
    result::{ResultExpression, ResultParser},
};
use crate::domain::{Config, ConditionBlock, HeadingTracker, InitialCondition, Record};

/// Scans whole documents and turns every IF-block into records.
///
/// An extractor holds only the immutable [`Grammar`]; all scan state lives
/// in a single call to [`Extractor::extract`], so one extractor can serve
/// many documents concurrently.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    grammar: Grammar,
}

/// The ambient context captured from the heading hierarchy when an `IF`
/// line is reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BlockContext {
    requirement_id: String,
    test_point: String,
    initial: String,
}

impl BlockContext {
    fn capture(tracker: &HeadingTracker) -> Self {
        let owner = tracker.nearest_ancestor_with_id();
        let requirement_id = owner
            .and_then(|heading| heading.id())
            .unwrap_or_default()
            .to_string();

        let test_point = owner
            .or_else(|| tracker.deepest())
            .map(|heading| strip_number(&normalize::clean_field(&heading.to_string())))
            .unwrap_or_default();

        let initial = tracker
            .heading_at_level(3)
            .map(|heading| normalize::clean_field(truncate_at_arrow(heading.title())))
            .unwrap_or_default();

        Self {
            requirement_id,
            test_point,
            initial,
        }
    }
}

impl Extractor {
    /// Creates an extractor recognizing the given conventions.
    #[must_use]
    pub const fn new(grammar: Grammar) -> Self {
        Self { grammar }
    }

    /// Creates an extractor from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured conventions cannot be compiled.
    pub fn from_config(config: &Config) -> Result<Self, grammar::Error> {
        Grammar::new(config).map(Self::new)
    }

    /// Extracts the records of one document, in document order.
    ///
    /// Malformed blocks never abort the scan; they produce records with
    /// whatever fields could be recovered.
    #[instrument(skip_all, fields(lines = tracing::field::Empty))]
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<Record> {
        let lines: Vec<&str> = text.lines().collect();
        tracing::Span::current().record("lines", lines.len());

        let mut tracker = HeadingTracker::new();
        let mut records = Vec::new();
        let mut index = 0;

        while let Some(&line) = lines.get(index) {
            if tracker.update(line) || !grammar::is_if(line) {
                index += 1;
                continue;
            }

            let context = BlockContext::capture(&tracker);
            let conditions = ConditionParser::new(&self.grammar, &lines, index + 1).parse();
            let mut next = conditions.next;

            let result = if lines.get(next).is_some_and(|line| grammar::is_then(line)) {
                let parsed = ResultParser::new(&self.grammar, &lines, next).parse();
                next = parsed.next;
                parsed.expression
            } else {
                ResultExpression::default()
            };

            tracing::debug!(
                line = index + 1,
                requirement = %context.requirement_id,
                "IF-block"
            );
            if conditions.block == ConditionBlock::Empty {
                tracing::warn!(line = index + 1, "IF-block without conditions");
            }
            if result.is_empty() {
                tracing::warn!(line = index + 1, "IF-block without an expected result");
            }

            records.extend(rows(&context, &conditions.block, &result));
            index = next.max(index + 1);
        }

        records
    }
}

/// Builds the records of one IF-block.
///
/// A transition result moves its source state into the initial condition.
/// Slash alternatives in the initial condition and independent scenarios in
/// the condition multiply into one record per combination.
fn rows(context: &BlockContext, block: &ConditionBlock, result: &ResultExpression) -> Vec<Record> {
    let initial = InitialCondition::new(context.initial.as_str());
    let (initial, expected_result) = if let Some((transition, rewritten)) = result.transition() {
        tracing::debug!(head = %transition.head, "state transition");
        (initial.annotate(transition.before()), rewritten.to_string())
    } else {
        let rendered = result.to_string();
        (initial.annotate(rendered.as_str()), rendered)
    };

    let initials = expand_initial(&initial);
    let branches = block.branches();

    initials
        .iter()
        .flat_map(|initial| {
            branches.iter().map(|steps| Record {
                requirement_id: context.requirement_id.clone(),
                test_point: context.test_point.clone(),
                initial_condition: initial.to_string(),
                steps: steps.clone(),
                expected_result: expected_result.clone(),
            })
        })
        .collect()
}

/// One initial condition per slash alternative of the first segment whose
/// value (the text after its final `=`) lists several.
fn expand_initial(initial: &InitialCondition) -> Vec<InitialCondition> {
    for (index, segment) in initial.segments().iter().enumerate() {
        let Some(at) = segment.rfind('=') else {
            continue;
        };
        let (head, value) = segment.split_at(at + 1);
        let alternatives = normalize::split_alternatives(value);
        if alternatives.len() < 2 {
            continue;
        }

        tracing::debug!(count = alternatives.len(), "initial condition alternatives");
        let gap = &value[..value.len() - value.trim_start().len()];
        return alternatives
            .iter()
            .map(|alternative| initial.with_segment(index, format!("{head}{gap}{alternative}")))
            .collect();
    }
    vec![initial.clone()]
}

fn truncate_at_arrow(title: &str) -> &str {
    let end = ["->", "→"]
        .iter()
        .filter_map(|arrow| title.find(arrow))
        .min()
        .unwrap_or(title.len());
    &title[..end]
}

/// Drops the leading section number of `3.2.1 Title`.
fn strip_number(text: &str) -> String {
    text.split_once(' ')
        .map_or(text, |(_, rest)| rest.trim())
        .to_string()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn extract(text: &str) -> Vec<Record> {
        Extractor::default().extract(text)
    }

    #[test]
    fn lane_keep_block() {
        let text = "\
3 Functions
3.2 Lateral
3.2.1 Lane Keep【REQ-7】
IF
  1. 以下条件同时满足
    {v}==1
    {w}>5 (HighSpeed)
THEN
  1. {out}=1
";
        let records = extract(text);
        assert_eq!(
            records,
            vec![Record {
                requirement_id: "REQ-7".into(),
                test_point: "Lane Keep".into(),
                initial_condition: "Lane Keep : {out} = 1".into(),
                steps: "({v} == 1 && {w} > 5: HighSpeed)".into(),
                expected_result: "{out} = 1".into(),
            }]
        );
    }

    #[test]
    fn slash_alternatives_in_context_multiply_records() {
        let text = "1 A\n1.1 B【REQ-1】\n1.1.1 speed = 60/80\nIF\nX\nTHEN\n{out} = 1\n";
        let records = extract(text);
        let initials: Vec<&str> = records.iter().map(|r| r.initial_condition.as_str()).collect();
        assert_eq!(initials, ["speed = 60 : {out} = 1", "speed = 80 : {out} = 1"]);
        assert!(records.iter().all(|record| record.steps == "X"));
        assert!(records.iter().all(|record| record.requirement_id == "REQ-1"));
    }

    #[test]
    fn scenarios_times_alternatives() {
        let text = "\
1 A【REQ-2】
1.1 B
1.1.1 mode = 1/2
IF
以下条件满足其一
  1. 以下条件同时满足
      1. A
      2. B
  2. 以下条件同时满足
      1. C
THEN
{out} = 1
";
        let rows: Vec<(String, String)> = extract(text)
            .into_iter()
            .map(|record| (record.initial_condition, record.steps))
            .collect();
        assert_eq!(
            rows,
            [
                ("mode = 1 : {out} = 1", "A && B"),
                ("mode = 1 : {out} = 1", "C"),
                ("mode = 2 : {out} = 1", "A && B"),
                ("mode = 2 : {out} = 1", "C"),
            ]
            .map(|(initial, steps)| (initial.to_string(), steps.to_string()))
        );
    }

    #[test]
    fn transition_moves_source_into_initial_condition() {
        let text = "1.1.1 Gear shift【REQ-3】\nIF\n{brake} == 1\nTHEN\n{gear} = from P to D\n";
        let records = extract(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].initial_condition, "Gear shift : {gear} = P");
        assert_eq!(records[0].expected_result, "{gear} = D");
    }

    #[test]
    fn transition_alongside_else_keeps_sections_intact() {
        let text = "\
1.1.1 Ctx【REQ-8】
IF
{a} == 1
THEN
{state} = from Standby to Active
ELSE
{warn} = 1
";
        let records = extract(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].initial_condition, "Ctx : {state} = Standby");
        assert_eq!(
            records[0].expected_result,
            "THEN: ({state} = Active) || ELSE: ({warn} = 1)"
        );
    }

    #[test]
    fn hex_prefix_before_non_ascii_text_is_kept() {
        let records = extract("1.1 Door【REQ-1】\nIF\n{X} == 0x未定义\nTHEN\n{out}=1\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].steps, "{X} == 0x未定义");
    }

    #[test]
    fn missing_id_falls_back_to_deepest_heading() {
        let text = "2 Overview\n2.1 Startup sequence\nIF\n{ign} == 1\nTHEN\n{ready} = 1\n";
        let records = extract(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].requirement_id, "");
        assert_eq!(records[0].test_point, "Startup sequence");
        assert_eq!(records[0].initial_condition, " : {ready} = 1");
    }

    #[test]
    fn stale_headings_do_not_leak_into_later_blocks() {
        let text = "\
1 A
1.1 B
1.1.1 Old context【REQ-1】
IF
{a} == 1
THEN
{b} = 1
1.2 C【REQ-2】
IF
{c} == 1
THEN
{d} = 1
";
        let records = extract(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].requirement_id, "REQ-2");
        assert_eq!(records[1].test_point, "C");
        assert_eq!(records[1].initial_condition, " : {d} = 1");
    }

    #[test]
    fn context_is_truncated_at_arrow_and_cleaned() {
        let text = "1.1.1 {ACC} active -> standby【REQ-4】\nIF\n{a} == 1\nTHEN\n{b} = 1\n";
        let records = extract(text);
        assert_eq!(records[0].initial_condition, "ACC active : {b} = 1");
        assert_eq!(records[0].test_point, "ACC active -> standby");
    }

    #[test]
    fn consecutive_blocks_without_blank_lines() {
        let text = "1.1 Two blocks【REQ-5】\nIF\n{a} == 1\nTHEN\n{b} = 1\nIF\n{c} == 1\nTHEN\n{d} = 1\n";
        let steps: Vec<String> = extract(text).into_iter().map(|record| record.steps).collect();
        assert_eq!(steps, ["{a} == 1", "{c} == 1"]);
    }

    #[test]
    fn malformed_block_still_produces_a_record() {
        let records = extract("IF\nTHEN\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].steps, "");
        assert_eq!(records[0].expected_result, "");
    }

    #[test]
    fn block_without_then_has_empty_result() {
        let records = extract("1.1 X【REQ-6】\nIF\n{a} == 1\n1.2 Y\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].steps, "{a} == 1");
        assert_eq!(records[0].expected_result, "");
    }

    #[test]
    fn text_without_blocks_yields_nothing() {
        assert!(extract("1 Intro\nJust prose.\n").is_empty());
    }

    #[test_case("3.2.1 Lane Keep", "Lane Keep"; "numbered")]
    #[test_case("3.2.1", "3.2.1"; "number only")]
    fn strips_leading_number(text: &str, expected: &str) {
        assert_eq!(strip_number(text), expected);
    }

    #[test_case("A -> B", "A "; "ascii arrow")]
    #[test_case("A→B->C", "A"; "unicode arrow first")]
    #[test_case("A", "A"; "no arrow")]
    fn truncates_at_first_arrow(title: &str, expected: &str) {
        assert_eq!(truncate_at_arrow(title), expected);
    }
}
