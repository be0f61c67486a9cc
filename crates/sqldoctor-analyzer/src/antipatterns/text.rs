//! Offset-preserving views of query text
//!
//! Every helper here replaces characters with the same number of bytes of
//! spaces, so a byte range found in a masked view is valid in every other
//! view of the same query.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static SUBQUERY_OPEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(\s*SELECT\b").expect("valid regex"));

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Literal,
    QuotedIdent(char),
    LineComment,
    BlockComment(usize),
}

fn push_blank(out: &mut String, c: char) {
    if c == '\n' {
        out.push('\n');
    } else {
        out.extend(std::iter::repeat_n(' ', c.len_utf8()));
    }
}

/// Blanks out `--` and (nested) `/* */` comments
pub fn mask_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut state = Scan::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Scan::Code => match c {
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    out.push_str("  ");
                    state = Scan::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    state = Scan::BlockComment(1);
                }
                '\'' => {
                    out.push(c);
                    state = Scan::Literal;
                }
                '[' => {
                    out.push(c);
                    state = Scan::QuotedIdent(']');
                }
                '"' => {
                    out.push(c);
                    state = Scan::QuotedIdent('"');
                }
                _ => out.push(c),
            },
            Scan::Literal => {
                out.push(c);
                if c == '\'' {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        out.push('\'');
                    } else {
                        state = Scan::Code;
                    }
                }
            }
            Scan::QuotedIdent(close) => {
                out.push(c);
                if c == close {
                    state = Scan::Code;
                }
            }
            Scan::LineComment => {
                push_blank(&mut out, c);
                if c == '\n' {
                    state = Scan::Code;
                }
            }
            Scan::BlockComment(depth) => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = if depth == 1 {
                        Scan::Code
                    } else {
                        Scan::BlockComment(depth - 1)
                    };
                } else if c == '/' && chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str("  ");
                    state = Scan::BlockComment(depth + 1);
                } else {
                    push_blank(&mut out, c);
                }
            }
        }
    }

    out
}

/// Blanks out the contents of `'...'` literals, keeping the quotes
///
/// Expects comments to be masked already. `[...]` and `"..."` identifiers
/// are kept as written.
pub fn mask_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut state = Scan::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Scan::Literal => {
                if c == '\'' {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        out.push_str("  ");
                    } else {
                        out.push(c);
                        state = Scan::Code;
                    }
                } else {
                    push_blank(&mut out, c);
                }
            }
            Scan::QuotedIdent(close) => {
                out.push(c);
                if c == close {
                    state = Scan::Code;
                }
            }
            _ => {
                out.push(c);
                state = match c {
                    '\'' => Scan::Literal,
                    '[' => Scan::QuotedIdent(']'),
                    '"' => Scan::QuotedIdent('"'),
                    _ => Scan::Code,
                };
            }
        }
    }

    out
}

/// Byte index of the parenthesis closing the one at `open`
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0usize;
    for (offset, b) in bytes[open..].iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Ranges of `( SELECT ... )` blocks, outermost first, including the parentheses
///
/// An unbalanced block runs to the end of the text.
pub fn subquery_ranges(sql: &str) -> Vec<Range<usize>> {
    SUBQUERY_OPEN_REGEX
        .find_iter(sql)
        .map(|m| {
            let end = matching_paren(sql, m.start())
                .map(|close| close + 1)
                .unwrap_or(sql.len());
            m.start()..end
        })
        .collect()
}

/// Blanks out the body of every `( SELECT ... )`, keeping the parentheses
pub fn mask_subqueries(sql: &str) -> String {
    let mut bytes = sql.as_bytes().to_vec();
    for range in subquery_ranges(sql) {
        let body_end = if sql.as_bytes().get(range.end - 1) == Some(&b')') {
            range.end - 1
        } else {
            range.end
        };
        for b in &mut bytes[range.start + 1..body_end] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    }
    // Whole characters are blanked, continuation bytes included.
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Collapses runs of whitespace into single spaces and trims
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of `range`, preferring the original query over its masked view
pub fn fragment(original: &str, masked: &str, range: Range<usize>) -> String {
    let raw = original
        .get(range.clone())
        .or_else(|| masked.get(range))
        .unwrap_or_default();
    collapse_whitespace(raw)
}

/// Shortens `text` to at most `max` characters, marking the cut
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut.trim_end())
    }
}

#[cfg(test)]
mod tests;
