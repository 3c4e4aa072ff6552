//! YAML scalar styles: detecting how a value is written and writing a new one
//! the same way when the text allows it.

use std::{fmt::Write as _, sync::LazyLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    /// No value after the key (`description:`).
    Empty,
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl ScalarStyle {
    /// Style of a value whose text starts with `first`.
    pub fn detect(first: char) -> Option<Self> {
        match first {
            '"' => Some(Self::DoubleQuoted),
            '\'' => Some(Self::SingleQuoted),
            '|' => Some(Self::Literal),
            '>' => Some(Self::Folded),
            // anchors, aliases, tags and flow collections are not rewritten
            '&' | '*' | '!' | '[' | '{' => None,
            _ => Some(Self::Plain),
        }
    }
}

const INDICATORS: &[char] = &[
    '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`',
];

/// Plain scalars a YAML 1.1 loader resolves to something other than a string.
static YAML11_IMPLICIT: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(concat!(
        r"\A(?:",
        // bool and null
        r"(?i:y|n|yes|no|true|false|on|off|null)|~|=|<<",
        // int: binary, hex, octal, decimal with `_`, sexagesimal
        r"|[-+]?0[bB][01_]+|[-+]?0[xX][0-9a-fA-F_]+|[-+]?0[oO]?[0-7_]+",
        r"|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])*",
        // float
        r"|[-+]?(?:[0-9][0-9_]*)?\.[0-9_]*(?:[eE][-+]?[0-9]+)?",
        r"|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*",
        r"|[-+]?\.(?i:inf)|\.(?i:nan)",
        // date and timestamp
        r"|[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}",
        r"(?:(?:[Tt]|[ \t]+)[0-9]{1,2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]*)?",
        r"(?:[ \t]*(?:Z|[-+][0-9]{1,2}(?::[0-9]{2})?))?)?",
        r")\z",
    ))
    .unwrap()
});

fn is_plain_safe(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    if INDICATORS.contains(&first)
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.ends_with(':')
        || value.contains(": ")
        || value.contains(" #")
        || value.chars().any(char::is_control)
        || YAML11_IMPLICIT.is_match(value)
    {
        return false;
    }
    // reject anything that would resolve to null, bool or a number
    matches!(
        serde_yaml::from_str::<serde_yaml::Value>(value),
        Ok(serde_yaml::Value::String(ref parsed)) if parsed == value
    )
}

fn is_single_quote_safe(value: &str) -> bool {
    !value.chars().any(char::is_control)
}

fn is_literal_safe(value: &str) -> bool {
    let content = value.strip_suffix('\n').unwrap_or(value);
    !content.is_empty()
        && !content.starts_with([' ', '\n'])
        && !content.ends_with('\n')
        && !content
            .chars()
            .any(|c| c.is_control() && c != '\n')
}

pub fn double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Block scalar introduced by `indicator` (`|` or `>`).
fn block(value: &str, indicator: char, indent: usize, eol: &str) -> String {
    let (chomp, content) = match value.strip_suffix('\n') {
        Some(content) => ("", content),
        None => ("-", value),
    };
    let mut out = format!("{indicator}{chomp}");
    for line in content.split('\n') {
        out.push_str(eol);
        if !line.is_empty() {
            out.extend(std::iter::repeat_n(' ', indent));
            out.push_str(line);
        }
    }
    out
}

/// Render `value` as a scalar, keeping `style` when it can carry the text.
///
/// `indent` is the column block scalar content is written at; `eol` is the
/// document's line terminator.
pub fn render(value: &str, style: ScalarStyle, indent: usize, eol: &str) -> String {
    match style {
        ScalarStyle::Plain | ScalarStyle::Empty if is_plain_safe(value) => value.to_owned(),
        ScalarStyle::SingleQuoted if is_single_quote_safe(value) => single_quoted(value),
        // only a single line reads back unchanged when folded
        ScalarStyle::Folded
            if is_literal_safe(value) && !value.trim_end_matches('\n').contains('\n') =>
        {
            block(value, '>', indent, eol)
        }
        ScalarStyle::Literal | ScalarStyle::Folded if is_literal_safe(value) => {
            block(value, '|', indent, eol)
        }
        _ => double_quoted(value),
    }
}
