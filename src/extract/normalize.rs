//! Canonicalization of annotation syntax inside one line of text.
//!
//! Requirement authors annotate signal comparisons in many ad-hoc ways:
//!
//! - `{X} == 0x0 (Unavailable)` or `{X} == 0x0（Unavailable）`
//! - `{X} == 0x0Unavailable`
//! - `{X} == 0x0 Unavailable`
//! - `{X} == 1，debounce 500ms`
//! - `{X} = 0x3C "请控制车辆"`
//! - `{X}(描述) == 0x1(Active)`
//!
//! All of them are rewritten to `{X} OP value: description`. The rules form
//! a frozen cascade that runs once per clause; the first rule that matches
//! wins and nothing is re-applied, so a canonical string is a fixed point.
//! Text that matches no rule passes through unchanged.

use std::sync::LazyLock;

use regex::Regex;

/// Unit tokens that may trail a number as part of the value.
const UNITS: &str = "kph|kmh|kmph|mph|rpm|kpa|pa|bar|hz|khz|mhz|ghz|mv|ma|ua|kg|ms|min|v|a|g|n|s";

/// Comparison operators, longest first, with their canonical ASCII form.
const OPERATORS: [(&str, &str); 15] = [
    ("＞＝", ">="),
    ("＜＝", "<="),
    ("==", "=="),
    (">=", ">="),
    ("<=", "<="),
    ("!=", "!="),
    ("≥", ">="),
    ("≤", "<="),
    ("≠", "!="),
    ("＞", ">"),
    ("＜", "<"),
    ("＝", "="),
    ("=", "="),
    (">", ">"),
    ("<", "<"),
];

static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"【[^】]*】").expect("annotation pattern is valid"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static SIGNAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]+\}").expect("signal pattern is valid"));

static SIGNAL_COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{[^{}]+\}\s*(?:==|>=|<=|!=|=|>|<)").expect("comparison pattern is valid")
});

static NUMBER_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^(?P<num>[-+]?\d+(?:\.\d+)?)\s*(?P<unit>{UNITS})$"))
        .expect("unit pattern is valid")
});

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?\d+(?:\.\d+)?%?").expect("number pattern is valid"));

static CANONICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?P<val>[^:"“()（）]+?)\s*:\s*(?P<note>.+)$"#).expect("canonical pattern is valid")
});

static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<val>[^\s:()（）]+(?:\s+(?i:{UNITS}))?)\s*[(（]\s*(?P<note>[^()（）:]+?)\s*[)）](?P<rest>.*)$"
    ))
    .expect("parenthesized pattern is valid")
});

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?P<val>[^\s:()（）"“]+)\s*(?:"(?P<plain>[^"]+)"|“(?P<curly>[^”]+)”)$"#)
        .expect("quoted pattern is valid")
});

static COMMA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?P<val>[^,，:()（）"]+?)\s*[,，]\s*(?P<note>[^()（）"]*?)\s*$"#)
        .expect("comma pattern is valid")
});

static TRANSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^from\b.+\bto\b").expect("transition pattern is valid")
});

static SPACED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<val>[^\s:()（）]+)\s+(?P<note>[A-Za-z\p{Han}][^:()（）]*?)\s*$")
        .expect("spaced pattern is valid")
});

/// Cleans a heading-derived field for output.
///
/// Removes `【…】` annotations and brace characters, collapses whitespace and
/// maps the full-width colon to ASCII.
#[must_use]
pub fn clean_field(text: &str) -> String {
    collapse(&text.replace(['{', '}'], ""))
}

/// Canonicalizes every signal comparison in a line of condition or result
/// text.
///
/// The text is split into clauses at `&&`/`||`; each clause is rewritten
/// independently and the clauses are rejoined with single-spaced operators.
#[must_use]
pub fn normalize(text: &str) -> String {
    let text = collapse(text);
    let mut out = String::with_capacity(text.len());
    for (clause, operator) in split_clauses(&text) {
        out.push_str(&canonicalize_grouped(clause));
        if let Some(operator) = operator {
            out.push(' ');
            out.push_str(operator);
            out.push(' ');
        }
    }
    out.trim().to_string()
}

/// Inserts a colon between free-text and a following signal comparison.
///
/// `车速条件 {X} == 1` becomes `车速条件:{X} == 1`. Text whose prefix already
/// ends in a colon, an opening bracket or a boolean operator is left alone.
#[must_use]
pub fn label_signal_prefix(text: &str) -> String {
    let Some(found) = SIGNAL_COMPARISON.find(text) else {
        return text.to_string();
    };
    let prefix = &text[..found.start()];
    let label = prefix.trim_end();
    if label.is_empty()
        || label.len() == prefix.len()
        || label.ends_with([':', '：', '(', '（', '[', '【'])
        || label.ends_with("&&")
        || label.ends_with("||")
        || SIGNAL.is_match(label)
    {
        return text.to_string();
    }
    format!("{label}:{}", &text[found.start()..])
}

/// Splits text at every top-level slash.
///
/// Slashes inside parentheses and unit slashes (`km/h`, `m/s²`) do not
/// split. Empty pieces are dropped. Text without a splitting slash yields a
/// single piece.
#[must_use]
pub fn split_alternatives(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for (index, &ch) in chars.iter().enumerate() {
        match ch {
            '(' | '（' => depth += 1,
            ')' | '）' => depth = depth.saturating_sub(1),
            '/' if depth == 0 && !is_unit_slash(&chars, index) => {
                push_piece(&mut pieces, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    push_piece(&mut pieces, &current);
    pieces
}

fn push_piece(pieces: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        pieces.push(piece.to_string());
    }
}

/// A slash is part of a unit when both neighbouring tokens are letters and
/// a digit comes right before the left-hand token, as in `3 m/s` or `60km/h`.
fn is_unit_slash(chars: &[char], index: usize) -> bool {
    let is_unit_char = |ch: char| ch.is_alphabetic() || ch == '°' || ch == 'µ';

    let Some(left) = chars[..index].iter().rposition(|ch| !ch.is_whitespace()) else {
        return false;
    };
    let Some(right) = chars[index + 1..].iter().position(|ch| !ch.is_whitespace()) else {
        return false;
    };
    if !is_unit_char(chars[left]) || !is_unit_char(chars[index + 1 + right]) {
        return false;
    }

    let token_start = chars[..=left]
        .iter()
        .rposition(|&ch| !is_unit_char(ch))
        .map_or(0, |position| position + 1);
    chars[..token_start]
        .iter()
        .rev()
        .find(|ch| !ch.is_whitespace())
        .is_some_and(|&ch| ch.is_ascii_digit() || ch == '.' || ch == '°')
}

fn collapse(text: &str) -> String {
    let text = ANNOTATION.replace_all(text, "");
    WHITESPACE
        .replace_all(&text, " ")
        .replace('：', ":")
        .trim()
        .to_string()
}

fn split_clauses(text: &str) -> Vec<(&str, Option<&'static str>)> {
    let mut clauses = Vec::new();
    let mut rest = text;
    loop {
        let next = ["&&", "||"]
            .into_iter()
            .filter_map(|operator| rest.find(operator).map(|at| (at, operator)))
            .min_by_key(|&(at, _)| at);
        if let Some((at, operator)) = next {
            clauses.push((&rest[..at], Some(operator)));
            rest = &rest[at + operator.len()..];
        } else {
            clauses.push((rest, None));
            return clauses;
        }
    }
}

/// Sets aside grouping parentheses at the clause edges, canonicalizes the
/// core and puts the parentheses back.
fn canonicalize_grouped(clause: &str) -> String {
    let mut core = clause.trim();
    let mut opened = 0;
    let mut closed = 0;

    loop {
        if core.starts_with(['(', '（']) && (imbalance(core) > 0 || wraps_whole(core)) {
            let wrapped = wraps_whole(core);
            core = strip_first(core).trim_start();
            opened += 1;
            if wrapped {
                core = strip_last(core).trim_end();
                closed += 1;
            }
        } else if core.ends_with([')', '）']) && imbalance(core) < 0 {
            core = strip_last(core).trim_end();
            closed += 1;
        } else {
            break;
        }
    }

    format!(
        "{}{}{}",
        "(".repeat(opened),
        canonicalize_clause(core),
        ")".repeat(closed)
    )
}

fn imbalance(text: &str) -> isize {
    text.chars().fold(0, |depth, ch| match ch {
        '(' | '（' => depth + 1,
        ')' | '）' => depth - 1,
        _ => depth,
    })
}

/// Whether the opening parenthesis at the start closes at the very end.
fn wraps_whole(text: &str) -> bool {
    let mut depth = 0isize;
    for (at, ch) in text.char_indices() {
        match ch {
            '(' | '（' => depth += 1,
            ')' | '）' => {
                depth -= 1;
                if depth == 0 {
                    return at + ch.len_utf8() == text.len();
                }
            }
            _ => {}
        }
    }
    false
}

fn strip_first(text: &str) -> &str {
    let mut chars = text.chars();
    chars.next();
    chars.as_str()
}

fn strip_last(text: &str) -> &str {
    let mut chars = text.chars();
    chars.next_back();
    chars.as_str()
}

/// Rewrites the first signal comparison of a clause into canonical form.
fn canonicalize_clause(clause: &str) -> String {
    for signal in SIGNAL.find_iter(clause) {
        let Some((signal_note, after_note)) = signal_annotation(&clause[signal.end()..]) else {
            continue;
        };
        let Some((operator, tail)) = comparison_operator(after_note) else {
            continue;
        };
        let tail = tail.trim();
        if tail.is_empty() {
            return clause.to_string();
        }

        let (value, value_note) = split_value(tail);
        let note = match (value_note, signal_note) {
            (Some(value_note), Some(signal_note)) => Some(format!("{value_note}-{signal_note}")),
            (value_note, signal_note) => value_note.or_else(|| signal_note.map(str::to_string)),
        };

        let mut out = format!(
            "{}{} {operator} {value}",
            &clause[..signal.start()],
            signal.as_str()
        );
        if let Some(note) = note {
            out.push_str(": ");
            out.push_str(&note);
        }
        return out;
    }
    clause.to_string()
}

/// Reads an optional `(note)` written between the signal and its operator.
fn signal_annotation(text: &str) -> Option<(Option<&str>, &str)> {
    let text = text.trim_start();
    let Some(inner) = text.strip_prefix(['(', '（']) else {
        return Some((None, text));
    };
    let close = inner.find([')', '）'])?;
    let note = inner[..close].trim();
    if note.is_empty() || note.contains([':', '(', '（']) {
        return None;
    }
    let after = &inner[close..];
    Some((Some(note), strip_first(after)))
}

fn comparison_operator(text: &str) -> Option<(&'static str, &str)> {
    let text = text.trim_start();
    OPERATORS
        .iter()
        .find(|(written, _)| text.starts_with(written))
        .map(|&(written, canonical)| (canonical, &text[written.len()..]))
}

/// Separates the compared value from its description.
fn split_value(tail: &str) -> (String, Option<String>) {
    if TRANSITION.is_match(tail) {
        return (tail.to_string(), None);
    }

    if let Some(captures) = CANONICAL.captures(tail) {
        return (
            compact_unit(captures["val"].trim()),
            Some(captures["note"].trim().to_string()),
        );
    }

    if let Some(captures) = PARENTHESIZED.captures(tail) {
        let note = format!("{}{}", captures["note"].trim(), &captures["rest"]);
        if is_description(&note) {
            return (compact_unit(&captures["val"]), Some(note.trim_end().to_string()));
        }
    }

    if let Some(captures) = QUOTED.captures(tail) {
        let quoted = captures
            .name("plain")
            .or_else(|| captures.name("curly"))
            .map_or("", |quoted| quoted.as_str());
        return (
            compact_unit(&captures["val"]),
            Some(format!("\"{}\"", quoted.trim())),
        );
    }

    if let Some(captures) = COMMA.captures(tail) {
        let note = captures["note"].trim();
        if !note.is_empty() {
            return (compact_unit(captures["val"].trim()), Some(note.to_string()));
        }
    }

    if let Some(split) = split_attached(tail) {
        return split;
    }

    if let Some(captures) = SPACED.captures(tail) {
        let value = &captures["val"];
        let note = captures["note"].trim();
        if starts_compound_unit(note) {
            return (tail.to_string(), None);
        }
        if let Some(split) = absorb_unit(value, note) {
            return split;
        }
        if is_description(note) {
            return (compact_unit(value), Some(note.to_string()));
        }
    }

    if tail.contains(char::is_whitespace) {
        (tail.to_string(), None)
    } else {
        (compact_unit(tail), None)
    }
}

/// Splits a description written directly against its value, as in
/// `0x0Unavailable` or `1Active`.
fn split_attached(tail: &str) -> Option<(String, Option<String>)> {
    let at = attached_split_point(tail)?;
    let (value, note) = tail.split_at(at);

    if starts_compound_unit(note) || note.contains([':', '(', '（', ')', '）']) {
        return None;
    }

    if let Some(split) = absorb_unit(value, note.trim()) {
        return Some(split);
    }
    is_description(note).then(|| (value.to_string(), Some(note.trim().to_string())))
}

/// Whether the first word of `note` is followed by a fraction or exponent
/// marker, as in `m/s` or `m²`.
fn starts_compound_unit(note: &str) -> bool {
    let word_end = note
        .find(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '-'))
        .unwrap_or(note.len());
    note[word_end..].starts_with(['/', '²', '³', '^'])
}

fn attached_split_point(tail: &str) -> Option<usize> {
    let starts_description = |at: usize| tail[at..].starts_with(char::is_alphabetic);

    if let Some(digits) = tail.strip_prefix("0x").or_else(|| tail.strip_prefix("0X")) {
        let mut chars = digits.char_indices().peekable();
        if !chars.next().is_some_and(|(_, ch)| ch.is_ascii_hexdigit()) {
            return None;
        }
        while let Some((index, ch)) = chars.next() {
            let camel_case = ch.is_ascii_uppercase()
                && chars.peek().is_some_and(|&(_, next)| next.is_ascii_lowercase());
            if camel_case || !ch.is_ascii_hexdigit() {
                let at = index + 2;
                return starts_description(at).then_some(at);
            }
        }
        return None;
    }

    let number = LEADING_NUMBER.find(tail)?;
    let rest = &tail[number.end()..];
    let hex_like = rest.starts_with(['x', 'X'])
        && rest[1..].starts_with(|ch: char| ch.is_ascii_hexdigit());
    (!hex_like && starts_description(number.end())).then_some(number.end())
}

/// Treats a leading unit token in the description as part of a numeric value.
fn absorb_unit(value: &str, note: &str) -> Option<(String, Option<String>)> {
    let (unit, rest) = note
        .split_once(char::is_whitespace)
        .map_or((note, ""), |(unit, rest)| (unit, rest.trim()));
    let combined = compact_unit(&format!("{value}{unit}"));
    if !NUMBER_WITH_UNIT.is_match(&combined) {
        return None;
    }
    let note = (!rest.is_empty() && is_description(rest)).then(|| rest.to_string());
    Some((combined, note))
}

/// Inserts the missing space in a compact number-and-unit value.
fn compact_unit(value: &str) -> String {
    NUMBER_WITH_UNIT.captures(value).map_or_else(
        || value.to_string(),
        |captures| format!("{} {}", &captures["num"], &captures["unit"]),
    )
}

/// Rejects candidate descriptions that are really logic.
fn is_description(note: &str) -> bool {
    let note = note.trim();
    !note.is_empty()
        && !note.contains("&&")
        && !note.contains("||")
        && !note.eq_ignore_ascii_case("and")
        && !note.eq_ignore_ascii_case("or")
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("{X} == 0x0 (Unavailable)", "{X} == 0x0: Unavailable"; "parenthesized")]
    #[test_case("{X} == 0x0（Unavailable）", "{X} == 0x0: Unavailable"; "full width parenthesized")]
    #[test_case("{X} == 0x0Unavailable", "{X} == 0x0: Unavailable"; "attached to hex")]
    #[test_case("{X} == 0x1Enabled", "{X} == 0x1: Enabled"; "attached camel case")]
    #[test_case("{X} == 0xFFActive", "{X} == 0xFF: Active"; "attached after hex letters")]
    #[test_case("{X} == 1Active", "{X} == 1: Active"; "attached to decimal")]
    #[test_case("{X} == 0x0 Unavailable", "{X} == 0x0: Unavailable"; "space separated")]
    #[test_case("{X} == 1，debounce 500ms", "{X} == 1: debounce 500ms"; "full width comma")]
    #[test_case("{X} == 1, debounce 500ms", "{X} == 1: debounce 500ms"; "ascii comma")]
    #[test_case("{X} = 0x3C \"请控制车辆，注意环境变化\"", "{X} = 0x3C: \"请控制车辆，注意环境变化\""; "quoted")]
    #[test_case("{X} = 0x3C “注意”", "{X} = 0x3C: \"注意\""; "curly quoted")]
    #[test_case("{X}(描述) == 0x1(Active)", "{X} == 0x1: Active-描述"; "signal and value notes")]
    #[test_case("{X}（描述） = 0x0", "{X} = 0x0: 描述"; "signal note only")]
    #[test_case("{v}==1", "{v} == 1"; "plain comparison spacing")]
    #[test_case("{w}>5 (HighSpeed)", "{w} > 5: HighSpeed"; "plain with note")]
    #[test_case("{v}＞＝3", "{v} >= 3"; "full width operator")]
    #[test_case("{v} ≠ 0", "{v} != 0"; "unicode operator")]
    #[test_case("{X} == 0x1未定义", "{X} == 0x1: 未定义"; "attached non-ascii description")]
    fn canonicalizes_annotations(input: &str, expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[test_case("{v} > 135kph", "{v} > 135 kph"; "compact unit")]
    #[test_case("{v} > 60 kph HighSpeed", "{v} > 60 kph: HighSpeed"; "unit then description")]
    #[test_case("{v} > 60kph (fast)", "{v} > 60 kph: fast"; "unit before parenthesized note")]
    #[test_case("{t} >= 500ms", "{t} >= 500 ms"; "time unit")]
    #[test_case("{a} > 3m/s²", "{a} > 3m/s²"; "compound unit is protected")]
    #[test_case("{a} > 3 m/s", "{a} > 3 m/s"; "spaced compound unit is protected")]
    fn units_stay_with_their_value(input: &str, expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[test_case("{X} == 1 and"; "bare and keyword")]
    #[test_case("no signal here"; "no comparison")]
    #[test_case("{X} == "; "missing value")]
    #[test_case("{gear} = from P to D"; "state transition")]
    #[test_case("{X} == 0x未定义"; "hex prefix before non-ascii text")]
    #[test_case("{X} == 0X状态"; "uppercase hex prefix before non-ascii text")]
    fn passes_through(input: &str) {
        assert_eq!(normalize(input), input.trim());
    }

    #[test_case("{X} == 0x1: Active"; "canonical note")]
    #[test_case("{w} > 5: HighSpeed"; "canonical decimal")]
    #[test_case("{X} = 0x3C: \"请控制车辆，注意环境变化\""; "canonical quoted")]
    #[test_case("{X} == 0x1: Active-描述"; "canonical combined note")]
    #[test_case("{v} > 60 kph: HighSpeed"; "canonical unit value")]
    #[test_case("({A} == 1 || {B} == 2: On) && {C} != 0"; "canonical expression")]
    fn canonical_text_is_a_fixed_point(canonical: &str) {
        assert_eq!(normalize(canonical), canonical);
        assert_eq!(normalize(&normalize(canonical)), canonical);
    }

    #[test]
    fn clauses_are_normalized_independently() {
        assert_eq!(
            normalize("({A}==1(On)||{B}=0x0Off)&&{C}>2"),
            "({A} == 1: On || {B} = 0x0: Off) && {C} > 2"
        );
    }

    #[test]
    fn wrapped_clause_keeps_its_parentheses() {
        assert_eq!(normalize("( {A}==1 )"), "({A} == 1)");
    }

    #[test]
    fn strips_requirement_annotations_and_collapses_whitespace() {
        assert_eq!(normalize("{A}  ==   1【REQ-1】"), "{A} == 1");
        assert_eq!(normalize("模式：{A} == 1"), "模式:{A} == 1");
    }

    #[test]
    fn clean_field_removes_braces_and_annotations() {
        assert_eq!(clean_field(" 3.2 {Lane}  Keep【REQ-7】 "), "3.2 Lane Keep");
        assert_eq!(clean_field("状态：开启"), "状态:开启");
    }

    #[test_case("车速条件 {X} == 1", "车速条件:{X} == 1"; "label inserted")]
    #[test_case("车速条件: {X} == 1", "车速条件: {X} == 1"; "label already has colon")]
    #[test_case("({X} == 1", "({X} == 1"; "opening bracket")]
    #[test_case("{X} == 1", "{X} == 1"; "no prefix")]
    #[test_case("{a} == 1 && {b} == 2", "{a} == 1 && {b} == 2"; "second comparison")]
    fn labels_signal_prefix(input: &str, expected: &str) {
        assert_eq!(label_signal_prefix(input), expected);
    }

    #[test_case("60/80", &["60", "80"]; "simple")]
    #[test_case("A /B/ C(Keep/It) / D", &["A", "B", "C(Keep/It)", "D"]; "nested slash kept")]
    #[test_case("3 m/s", &["3 m/s"]; "unit slash")]
    #[test_case("60km/h/80km/h", &["60km/h", "80km/h"]; "alternatives with units")]
    #[test_case("ON", &["ON"]; "no slash")]
    fn splits_alternatives(input: &str, expected: &[&str]) {
        assert_eq!(split_alternatives(input), expected);
    }
}
