//! Regex helpers: guarded compilation and back-referencing end patterns.

use super::CompileError;
use fancy_regex::{Captures, Regex};

/// Compile `source`, rejecting patterns that match the empty string unless
/// `bypass` is set
pub(crate) fn compile_checked(rule: usize, source: &str, bypass: bool) -> Result<Regex, CompileError> {
    let invalid = |message: String| CompileError::InvalidRegex {
        rule,
        pattern: source.to_string(),
        message,
    };
    let regex = Regex::new(source).map_err(|e| invalid(e.to_string()))?;

    if !bypass && regex.is_match("").map_err(|e| invalid(e.to_string()))? {
        return Err(CompileError::EmptyMatch {
            rule,
            pattern: source.to_string(),
        });
    }

    Ok(regex)
}

/// Number of capture groups, excluding the implicit whole-match group
pub(crate) fn capture_count(regex: &Regex) -> usize {
    regex.captures_len().saturating_sub(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EndPiece {
    Literal(String),
    Capture(usize),
}

/// End pattern referring to the captures of its begin match (`\1`, `\2`, ...).
///
/// Begin and end are matched separately, so each begin match produces a
/// concrete end pattern where every reference is replaced by the escaped text
/// it captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndMatcher {
    pieces: Vec<EndPiece>,
}

impl EndMatcher {
    /// Split `source` on its back-references; `None` when it has none
    pub fn parse(source: &str) -> Option<Self> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();
        let mut has_capture = false;

        while let Some(ch) = chars.next() {
            if ch != '\\' {
                literal.push(ch);
                continue;
            }

            match chars.peek() {
                Some(d) if d.is_ascii_digit() && *d != '0' => {
                    let mut group = 0usize;
                    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                        group = group * 10 + d as usize;
                        chars.next();
                    }
                    if !literal.is_empty() {
                        pieces.push(EndPiece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(EndPiece::Capture(group));
                    has_capture = true;
                }
                Some(_) => {
                    literal.push(ch);
                    if let Some(next) = chars.next() {
                        literal.push(next);
                    }
                }
                None => literal.push(ch),
            }
        }

        if !has_capture {
            return None;
        }
        if !literal.is_empty() {
            pieces.push(EndPiece::Literal(literal));
        }

        Some(Self { pieces })
    }

    /// Highest capture group referenced
    pub fn max_group(&self) -> usize {
        self.pieces
            .iter()
            .filter_map(|piece| match piece {
                EndPiece::Capture(group) => Some(*group),
                EndPiece::Literal(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Pattern with every reference replaced by an empty group, used to
    /// validate the end pattern and count its own groups
    pub fn probe(&self) -> String {
        self.render(|_| String::from("(?:)"))
    }

    /// Concrete end pattern for a begin match whose marker group is `group`
    pub fn build(&self, captures: &Captures<'_>, group: usize) -> String {
        self.render(|n| {
            captures
                .get(group + n)
                .map(|m| regex::escape(m.as_str()))
                .unwrap_or_default()
        })
    }

    fn render<F>(&self, mut capture: F) -> String
    where
        F: FnMut(usize) -> String,
    {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                EndPiece::Literal(text) => out.push_str(text),
                EndPiece::Capture(n) => out.push_str(&capture(*n)),
            }
        }
        out
    }
}
