//! Stale-test pruning.
//!
//! Removes `describe(...)` blocks whose label names a removed function. The
//! end of a block is found by a balanced-parenthesis scan that skips string
//! literals, template literals (including `${…}` expressions) and comments.
//! Regex literals are not recognised.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static DESCRIBE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r#"\bdescribe(?:\.(?:only|skip))?\s*(\()\s*(['"`])"#));

static BLANK_RUNS: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"\n\s*\n\s*\n"));

/// Outcome of [`prune`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneResult {
    pub content: String,
    /// `true` when at least one block was removed.
    pub changed: bool,
    /// Names for which at least one block was removed.
    pub removed: BTreeSet<String>,
}

/// Remove every `describe` block labelled with one of `names`.
///
/// A label matches when its leading identifier equals the name, so `"add"`
/// matches `describe('add', …)` and `describe('add()', …)` but not
/// `describe('addAll', …)`. When nothing is removed the input is returned
/// untouched.
pub fn prune<I, S>(content: &str, names: I) -> PruneResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unchanged = |content: &str| PruneResult {
        content: content.to_owned(),
        changed: false,
        removed: BTreeSet::new(),
    };

    let Ok(describe) = Lazy::force(&DESCRIBE).as_ref() else {
        return unchanged(content);
    };

    let mut text = content.to_owned();
    let mut removed = BTreeSet::new();

    for name in names {
        let name = name.as_ref();
        if name.is_empty() {
            continue;
        }
        while let Some((start, end)) = find_block(describe, &text, name) {
            text.replace_range(start..end, "");
            removed.insert(name.to_owned());
        }
    }

    if removed.is_empty() {
        return unchanged(content);
    }

    let collapsed = match Lazy::force(&BLANK_RUNS).as_ref() {
        Ok(blank_runs) => blank_runs.replace_all(&text, "\n\n").into_owned(),
        Err(_) => text,
    };
    debug!(removed = ?removed, "pruned test blocks");

    PruneResult {
        content: collapsed.trim().to_owned(),
        changed: true,
        removed,
    }
}

/// Byte range of the first block labelled `name`, expanded to whole lines
/// where the block stands on its own.
fn find_block(describe: &Regex, text: &str, name: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    for caps in describe.captures_iter(text) {
        let (Some(call), Some(paren), Some(quote)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if !label_matches(&text[quote.end()..], name) {
            continue;
        }
        let Some(close) = matching_paren(bytes, paren.start()) else {
            continue;
        };

        let line_start = text[..call.start()].rfind('\n').map_or(0, |i| i + 1);
        let start = if text[line_start..call.start()].trim().is_empty() {
            line_start
        } else {
            call.start()
        };

        let mut end = close + 1;
        while end < bytes.len() && matches!(bytes[end], b' ' | b'\t') {
            end += 1;
        }
        if end < bytes.len() && bytes[end] == b';' {
            end += 1;
        }
        let line_end = text[end..].find('\n').map_or(bytes.len(), |i| end + i + 1);
        if text[end..line_end].trim().is_empty() {
            end = line_end;
        }
        return Some((start, end));
    }
    None
}

fn label_matches(label: &str, name: &str) -> bool {
    let Some(rest) = label.strip_prefix(name) else {
        return false;
    };
    !rest
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[derive(Clone, Copy)]
enum Frame {
    /// Code with the count of `{` opened since this frame began.
    Code(usize),
    Template,
}

/// Index of the `)` closing the `(` at `open`, or `None` when unbalanced.
fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut stack = vec![Frame::Code(0)];
    let mut depth = 0usize;
    let mut i = open;

    while i < bytes.len() {
        let c = bytes[i];
        let next = bytes.get(i + 1).copied();
        let nested = stack.len() > 1;
        match *stack.last()? {
            Frame::Template => match c {
                b'\\' => i += 1,
                b'`' => {
                    stack.pop();
                }
                b'$' if next == Some(b'{') => {
                    stack.push(Frame::Code(0));
                    i += 1;
                }
                _ => {}
            },
            Frame::Code(braces) => match c {
                b'/' if next == Some(b'/') => {
                    i = bytes[i..].iter().position(|&b| b == b'\n').map_or(bytes.len(), |p| i + p);
                    continue;
                }
                b'/' if next == Some(b'*') => {
                    let p = bytes[i + 2..].windows(2).position(|w| w == b"*/")?;
                    i += 2 + p + 2;
                    continue;
                }
                b'\'' | b'"' => i = skip_string(bytes, i)?,
                b'`' => stack.push(Frame::Template),
                b'{' => set_top(&mut stack, Frame::Code(braces + 1)),
                b'}' if braces == 0 && nested => {
                    stack.pop();
                }
                b'}' => set_top(&mut stack, Frame::Code(braces.saturating_sub(1))),
                b'(' => depth += 1,
                b')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 && !nested {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

fn set_top(stack: &mut [Frame], frame: Frame) {
    if let Some(top) = stack.last_mut() {
        *top = frame;
    }
}

/// Index of the closing quote of the string starting at `start`.
fn skip_string(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i),
            b'\n' => return None,
            _ => i += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paren_scan_skips_strings_and_comments() {
        let src = b"(a, ')', \"(\", `x ${f(1)} )`, /* ) */ // )\n b)";
        let close = matching_paren(src, 0).expect("balanced");
        assert_eq!(close, src.len() - 1);
    }

    #[test]
    fn unbalanced_call_is_not_matched() {
        assert_eq!(matching_paren(b"(a, (b)", 0), None);
        assert_eq!(matching_paren(b"('unterminated)", 0), None);
    }

    #[test]
    fn label_leading_identifier() {
        assert!(label_matches("add'", "add"));
        assert!(label_matches("add function'", "add"));
        assert!(label_matches("add()'", "add"));
        assert!(!label_matches("addAll'", "add"));
        assert!(!label_matches("add_x'", "add"));
        assert!(!label_matches("sub'", "add"));
    }
}
