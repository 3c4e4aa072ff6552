//! Byte-level layout of the top-level `fields` sequence.
//!
//! The scanner only understands as much YAML as a hand-maintained schema file
//! uses: a block sequence of block mappings under a top-level `fields:` key.
//! It records, per field, where the `description` value sits and where a new
//! `description` line would go, so edits can splice the source text without
//! touching anything else.

use winnow::{
    Parser as _,
    combinator::{alt, delimited, preceded, repeat},
    token::{any, none_of},
};

use super::scalar::ScalarStyle;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("top-level `fields` key not found")]
    FieldsNotFound,
    #[error("`fields` is not a block sequence")]
    NotBlockSequence,
    #[error("unterminated quoted scalar at line {line}")]
    UnterminatedQuote { line: usize },
}

/// Span of a mapping value in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSpan {
    pub start: usize,
    pub end: usize,
    /// `None` for anchors, aliases, tags and flow collections.
    pub style: Option<ScalarStyle>,
    /// The span starts right after the `:`; a replacement needs a leading space.
    pub after_colon: bool,
    /// Column block scalar content is written at.
    pub block_indent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub key_indent: Option<usize>,
    /// Offset of the line following the `name` value, where a missing
    /// `description` is inserted.
    pub after_name: Option<usize>,
    pub description: Option<ValueSpan>,
    /// Set when the item is not a block mapping.
    pub unsupported: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub fields: Vec<FieldLayout>,
    pub eol: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    start: usize,
    /// Line content without its terminator.
    text: &'a str,
    /// Offset of the following line.
    next: usize,
}

impl Line<'_> {
    fn indent(&self) -> usize {
        self.text.len() - self.text.trim_start_matches(' ').len()
    }

    fn content(&self) -> &str {
        self.text.trim_start_matches(' ')
    }

    fn is_blank_or_comment(&self) -> bool {
        let content = self.text.trim_start();
        content.is_empty() || content.starts_with('#')
    }

    fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

fn split_lines(src: &str) -> Vec<Line<'_>> {
    let mut start = 0;
    src.split_inclusive('\n')
        .map(|raw| {
            let text = raw.strip_suffix('\n').unwrap_or(raw);
            let text = text.strip_suffix('\r').unwrap_or(text);
            let line = Line {
                start,
                text,
                next: start + raw.len(),
            };
            start = line.next;
            line
        })
        .collect()
}

fn line_of(lines: &[Line], offset: usize) -> usize {
    lines.partition_point(|line| line.next <= offset)
}

fn is_dash(content: &str) -> bool {
    content == "-" || content.starts_with("- ") || content.starts_with("-\t")
}

type ParseResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

fn double_quoted<'a>(input: &mut &'a str) -> ParseResult<&'a str> {
    let escaped = preceded('\\', any).void();
    let unescaped = none_of(['"', '\\']).void();
    delimited('"', repeat(0.., alt((escaped, unescaped))).map(|()| ()), '"')
        .take()
        .parse_next(input)
}

fn single_quoted<'a>(input: &mut &'a str) -> ParseResult<&'a str> {
    let escaped = "''".void();
    let unescaped = none_of('\'').void();
    delimited('\'', repeat(0.., alt((escaped, unescaped))).map(|()| ()), '\'')
        .take()
        .parse_next(input)
}

/// Length of a quoted scalar starting at the beginning of `src`.
fn quoted_len(src: &str) -> Option<usize> {
    let mut input = src;
    let quoted = if src.starts_with('"') {
        double_quoted(&mut input)
    } else {
        single_quoted(&mut input)
    };
    quoted.ok().map(str::len)
}

/// Split `key: ...` into the key and the byte offset just past the colon.
fn mapping_key(content: &str) -> Option<(&str, usize)> {
    let (key, rest_at) = match content.chars().next()? {
        '"' | '\'' => {
            let len = quoted_len(content)?;
            (&content[1..len - 1], len)
        }
        '{' | '[' | '#' | '?' => return None,
        _ => {
            let mut prev_blank = false;
            let mut colon = None;
            for (i, ch) in content.char_indices() {
                match ch {
                    '#' if prev_blank => return None,
                    ':' if content[i + 1..].is_empty()
                        || content[i + 1..].starts_with([' ', '\t']) =>
                    {
                        colon = Some(i);
                        break;
                    }
                    _ => {}
                }
                prev_blank = ch == ' ' || ch == '\t';
            }
            let colon = colon?;
            return Some((content[..colon].trim_end(), colon + 1));
        }
    };
    let rest = &content[rest_at..];
    let trimmed = rest.trim_start_matches([' ', '\t']);
    let after = trimmed.strip_prefix(':')?;
    if !after.is_empty() && !after.starts_with([' ', '\t']) {
        return None;
    }
    Some((key, content.len() - after.len()))
}

/// Length of a plain scalar on one line, stopping at a trailing comment.
fn plain_len(text: &str) -> (usize, bool) {
    let mut prev_blank = false;
    for (i, ch) in text.char_indices() {
        if ch == '#' && prev_blank {
            return (text[..i].trim_end().len(), true);
        }
        prev_blank = ch == ' ' || ch == '\t';
    }
    (text.trim_end().len(), false)
}

/// Locate the value of the key whose colon ends at `colon` on line `li`.
///
/// Returns the span and the index of the first line after the value.
fn value_span(
    src: &str,
    lines: &[Line],
    li: usize,
    colon: usize,
    key_indent: usize,
) -> Result<(ValueSpan, usize), Error> {
    let line = lines[li];
    let rest = &src[colon..line.end()];
    let trimmed = rest.trim_start_matches([' ', '\t']);
    let on_key_line = !trimmed.is_empty() && !trimmed.starts_with('#');

    let deeper = |line: &Line| line.indent() > key_indent;

    let (node_start, node_line) = if on_key_line {
        (line.end() - trimmed.len(), li)
    } else {
        match lines[li + 1..]
            .iter()
            .position(|line| !line.is_blank_or_comment())
            .map(|offset| li + 1 + offset)
            .filter(|&next| deeper(&lines[next]))
        {
            Some(next) => (lines[next].start + lines[next].indent(), next),
            None => {
                let span = ValueSpan {
                    start: colon,
                    end: colon,
                    style: Some(ScalarStyle::Empty),
                    after_colon: true,
                    block_indent: key_indent + 2,
                };
                return Ok((span, li + 1));
            }
        }
    };

    let first = src[node_start..].chars().next().unwrap_or(' ');
    let style = ScalarStyle::detect(first);
    let mut block_indent = key_indent + 2;

    let (end, next_line) = match style {
        Some(ScalarStyle::DoubleQuoted | ScalarStyle::SingleQuoted) => {
            let len = quoted_len(&src[node_start..]).ok_or(Error::UnterminatedQuote {
                line: node_line + 1,
            })?;
            let end = node_start + len;
            (end, line_of(lines, end - 1) + 1)
        }
        Some(ScalarStyle::Literal | ScalarStyle::Folded) => {
            let mut end = lines[node_line].end();
            let mut next = node_line + 1;
            let mut content_indent = None;
            for (i, line) in lines.iter().enumerate().skip(node_line + 1) {
                if line.text.trim().is_empty() {
                    continue;
                }
                if !deeper(line) {
                    break;
                }
                content_indent.get_or_insert(line.indent());
                end = line.end();
                next = i + 1;
            }
            if let Some(indent) = content_indent {
                block_indent = indent;
            }
            (end, next)
        }
        _ => {
            let (len, commented) = plain_len(&src[node_start..lines[node_line].end()]);
            let mut end = node_start + len;
            let mut next = node_line + 1;
            if !commented {
                for (i, line) in lines.iter().enumerate().skip(node_line + 1) {
                    if line.text.trim().is_empty() {
                        continue;
                    }
                    if !deeper(line) || line.content().starts_with('#') {
                        break;
                    }
                    let (len, commented) = plain_len(line.content());
                    end = line.start + line.indent() + len;
                    next = i + 1;
                    if commented {
                        break;
                    }
                }
            }
            (end, next)
        }
    };

    // starting at the node keeps a comment between the colon and the value
    let span = ValueSpan {
        start: node_start,
        end,
        style,
        after_colon: false,
        block_indent,
    };
    Ok((span, next_line))
}

impl FieldLayout {
    fn new() -> Self {
        Self {
            key_indent: None,
            after_name: None,
            description: None,
            unsupported: None,
        }
    }

    /// Record the key on line `li` starting at column `column`; returns the
    /// index of the next line to scan.
    fn record_key(
        &mut self,
        src: &str,
        lines: &[Line],
        li: usize,
        column: usize,
        key_indent: usize,
    ) -> Result<usize, Error> {
        let line = lines[li];
        let content = &line.text[column..];
        let Some((key, colon)) = mapping_key(content) else {
            if column > line.indent() {
                // text right after `- ` that is not a key
                self.unsupported = Some("sequence item is not a block mapping");
            }
            return Ok(li + 1);
        };
        let (span, next) = value_span(src, lines, li, line.start + column + colon, key_indent)?;
        match key {
            "name" if self.after_name.is_none() => {
                self.after_name = Some(lines[next - 1].next);
            }
            "description" if self.description.is_none() => {
                self.description = Some(span);
            }
            _ => {}
        }
        Ok(next)
    }
}

pub fn scan(src: &str) -> Result<Layout, Error> {
    let eol = if src.contains("\r\n") { "\r\n" } else { "\n" };
    let lines = split_lines(src);

    let fields_line = lines
        .iter()
        .position(|line| {
            !line.text.starts_with([' ', '\t'])
                && mapping_key(line.text).is_some_and(|(key, _)| key == "fields")
        })
        .ok_or(Error::FieldsNotFound)?;
    let header = lines[fields_line].text;
    if let Some((_, colon)) = mapping_key(header) {
        let rest = header[colon..].trim_start();
        if !rest.is_empty() && !rest.starts_with('#') {
            return Err(Error::NotBlockSequence);
        }
    }

    let mut fields = Vec::new();
    let mut current: Option<FieldLayout> = None;
    let mut seq_indent = None;
    let mut i = fields_line + 1;
    while i < lines.len() {
        let line = lines[i];
        if line.is_blank_or_comment() {
            i += 1;
            continue;
        }
        let indent = line.indent();
        let content = line.content();
        let seq_indent = *seq_indent.get_or_insert(indent);
        if indent < seq_indent || (indent == seq_indent && !is_dash(content)) {
            break;
        }

        if indent == seq_indent {
            fields.extend(current.take());
            let mut field = FieldLayout::new();
            let after_dash = &content[1..];
            let rest = after_dash.trim_start_matches([' ', '\t']);
            if rest.is_empty() || rest.starts_with('#') {
                current = Some(field);
                i += 1;
                continue;
            }
            let column = indent + 1 + (after_dash.len() - rest.len());
            field.key_indent = Some(column);
            i = field.record_key(src, &lines, i, column, column)?;
            current = Some(field);
            continue;
        }

        let Some(field) = current.as_mut() else {
            i += 1;
            continue;
        };
        let key_indent = *field.key_indent.get_or_insert(indent);
        if indent == key_indent && !is_dash(content) {
            i = field.record_key(src, &lines, i, indent, key_indent)?;
        } else {
            i += 1;
        }
    }
    fields.extend(current);

    Ok(Layout { fields, eol })
}
