//! Combined scanning regexes.
//!
//! Every sub-pattern of a context is wrapped in a named group
//! `_{marker}_{rule}` (or `_{marker}_{rule}_{variant}` for back-reference
//! end variants). After compiling, the group names are resolved to group
//! positions once, so a match is decoded without re-parsing names.
//!
//! Back-references written inside a sub-pattern count groups from that
//! sub-pattern; they are renumbered against the combined regex before it is
//! compiled.

use crate::models::Marker;
use fancy_regex::{Captures, Regex};

/// Name of the group wrapping a sub-pattern
pub(crate) fn group_name(marker: Marker, rule: usize, variant: Option<usize>) -> String {
    match variant {
        Some(variant) => format!("_{}_{}_{}", marker.code(), rule, variant),
        None => format!("_{}_{}", marker.code(), rule),
    }
}

/// Wrap `source` in its marker group
pub(crate) fn wrap(marker: Marker, rule: usize, variant: Option<usize>, source: &str) -> String {
    format!("(?P<{}>{})", group_name(marker, rule, variant), source)
}

/// A marker group resolved to its position in the compiled regex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSlot {
    pub group: usize,
    pub marker: Marker,
    pub rule: usize,
    pub variant: Option<usize>,
}

impl GroupSlot {
    fn parse(group: usize, name: &str) -> Option<Self> {
        let mut parts = name.strip_prefix('_')?.split('_');
        let marker = Marker::from_code(parts.next()?.parse().ok()?)?;
        let rule = parts.next()?.parse().ok()?;
        let variant = match parts.next() {
            Some(part) => Some(part.parse().ok()?),
            None => None,
        };
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            group,
            marker,
            rule,
            variant,
        })
    }
}

/// One decoded match of a context
#[derive(Debug)]
pub struct MarkerMatch<'t> {
    pub captures: Captures<'t>,
    pub slot: GroupSlot,
    /// Byte offset of the match start
    pub start: usize,
    /// Byte offset of the match end
    pub end: usize,
    /// Where the next search on the same line starts (always past `start`)
    pub next_offset: usize,
}

/// A compiled scanning context (main document, private loop or variant loop)
#[derive(Debug)]
pub struct ScanContext {
    name: String,
    source: String,
    regex: Regex,
    slots: Vec<GroupSlot>,
}

impl ScanContext {
    pub fn new(name: impl Into<String>, source: &str) -> Result<Self, fancy_regex::Error> {
        let regex = Regex::new(&anchor_backrefs(source))?;
        let slots = regex
            .capture_names()
            .enumerate()
            .filter_map(|(group, name)| name.and_then(|name| GroupSlot::parse(group, name)))
            .collect();

        Ok(Self {
            name: name.into(),
            source: source.to_string(),
            regex,
            slots,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Combined source as assembled, before back-references are renumbered
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn slots(&self) -> &[GroupSlot] {
        &self.slots
    }

    /// Find the next marker in `text` at or after `offset`
    pub fn find_at<'t>(&self, text: &'t str, offset: usize) -> Result<Option<MarkerMatch<'t>>, fancy_regex::Error> {
        if offset > text.len() || !text.is_char_boundary(offset) {
            return Ok(None);
        }

        let Some(captures) = self.regex.captures_from_pos(text, offset)? else {
            return Ok(None);
        };
        let Some(whole) = captures.get(0) else {
            return Ok(None);
        };
        let Some(slot) = self
            .slots
            .iter()
            .find(|slot| captures.get(slot.group).is_some())
            .copied()
        else {
            return Ok(None);
        };

        let (start, end) = (whole.start(), whole.end());
        let next_offset = if end > start {
            end
        } else {
            text[start..]
                .chars()
                .next()
                .map_or(start + 1, |ch| start + ch.len_utf8())
        };

        Ok(Some(MarkerMatch {
            captures,
            slot,
            start,
            end,
            next_offset,
        }))
    }
}

/// Capture group opened by a `(` followed by `rest`: `None` when the group
/// does not capture, otherwise its name if it has one
fn capture_name(rest: &str) -> Option<Option<&str>> {
    let Some(head) = rest.strip_prefix('?') else {
        return Some(None);
    };
    let named = head
        .strip_prefix("P<")
        .or_else(|| head.strip_prefix('<').filter(|s| !s.starts_with('=') && !s.starts_with('!')))?;

    named.find('>').map(|end| Some(&named[..end]))
}

/// Renumber `\N` inside marker groups to the absolute group `base + N`,
/// where `base` is the index of the innermost enclosing marker group
fn anchor_backrefs(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.char_indices().peekable();
    // open groups; marker groups carry their absolute index
    let mut open: Vec<Option<usize>> = Vec::new();
    let mut groups = 0usize;
    let mut class_depth = 0usize;

    while let Some((at, ch)) = chars.next() {
        match ch {
            '\\' => {
                let digit = chars.peek().map_or(false, |(_, d)| ('1'..='9').contains(d));
                if class_depth > 0 || !digit {
                    out.push(ch);
                    if let Some((_, next)) = chars.next() {
                        out.push(next);
                    }
                    continue;
                }

                let mut digits = String::new();
                while let Some((_, d)) = chars.next_if(|(_, d)| d.is_ascii_digit()) {
                    digits.push(d);
                }
                let base = open.iter().rev().find_map(|group| *group);
                match (base, digits.parse::<usize>()) {
                    (Some(base), Ok(n)) => out.push_str(&format!("\\{}", base + n)),
                    _ => {
                        out.push(ch);
                        out.push_str(&digits);
                    }
                }
            }
            '[' => {
                class_depth += 1;
                out.push(ch);
                // a leading `]` is literal
                if let Some((_, caret)) = chars.next_if(|(_, c)| *c == '^') {
                    out.push(caret);
                }
                if let Some((_, bracket)) = chars.next_if(|(_, c)| *c == ']') {
                    out.push(bracket);
                }
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(ch);
            }
            '(' if class_depth == 0 => {
                out.push(ch);
                match capture_name(&source[at + 1..]) {
                    Some(name) => {
                        groups += 1;
                        let marker = name.and_then(|name| GroupSlot::parse(groups, name));
                        open.push(marker.map(|slot| slot.group));
                    }
                    None => open.push(None),
                }
            }
            ')' if class_depth == 0 => {
                open.pop();
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }

    out
}
