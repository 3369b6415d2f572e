//! Line-addressable documents consumed by the folding engine.

use ropey::Rope;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

/// A document the engine can scan line by line.
///
/// Implementations must stay stable for the duration of one scan.
pub trait Document {
    /// Number of lines, including a trailing empty line after a final newline
    fn line_count(&self) -> usize;

    /// Text of a line without its line terminator
    fn line_at(&self, index: usize) -> Option<Cow<'_, str>>;

    /// Path used for routing and trace output
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Rope-backed text document
#[derive(Debug, Clone)]
pub struct TextDocument {
    path: Option<PathBuf>,
    rope: Rope,
}

impl TextDocument {
    pub fn from_str(text: &str) -> Self {
        Self {
            path: None,
            rope: Rope::from_str(text),
        }
    }

    /// Read a document from disk
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_str(&content).with_path(path.to_path_buf()))
    }

    /// Attach a path (builder pattern)
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }
}

impl Document for TextDocument {
    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line_at(&self, index: usize) -> Option<Cow<'_, str>> {
        let line: Cow<'_, str> = self.rope.get_line(index)?.into();

        Some(match line {
            Cow::Borrowed(text) => Cow::Borrowed(trim_line_ending(text)),
            Cow::Owned(mut text) => {
                let len = trim_line_ending(&text).len();
                text.truncate(len);
                Cow::Owned(text)
            }
        })
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl<S: AsRef<str>> Document for Vec<S> {
    fn line_count(&self) -> usize {
        self.len()
    }

    fn line_at(&self, index: usize) -> Option<Cow<'_, str>> {
        self.get(index).map(|line| Cow::Borrowed(line.as_ref()))
    }
}

fn trim_line_ending(text: &str) -> &str {
    let text = text.strip_suffix('\n').unwrap_or(text);
    text.strip_suffix('\r').unwrap_or(text)
}

/// Width of the leading whitespace of `line`, or `None` for a blank line
pub fn indent_level(line: &str, tab_size: usize) -> Option<usize> {
    let tab_size = tab_size.max(1);
    let mut indent = 0;

    for ch in line.chars() {
        match ch {
            ' ' => indent += 1,
            '\t' => indent = indent - (indent % tab_size) + tab_size,
            _ => return Some(indent),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_count_matches_split() {
        assert_eq!(TextDocument::from_str("").line_count(), 1);
        assert_eq!(TextDocument::from_str("a\nb").line_count(), 2);
        assert_eq!(TextDocument::from_str("a\nb\n").line_count(), 3);
    }

    #[test]
    fn test_line_at_strips_terminators() {
        let doc = TextDocument::from_str("first\r\nsecond\nthird");
        assert_eq!(doc.line_at(0).as_deref(), Some("first"));
        assert_eq!(doc.line_at(1).as_deref(), Some("second"));
        assert_eq!(doc.line_at(2).as_deref(), Some("third"));
        assert_eq!(doc.line_at(3), None);
    }

    #[test]
    fn test_indent_level() {
        assert_eq!(indent_level("    x", 4), Some(4));
        assert_eq!(indent_level("\tx", 4), Some(4));
        assert_eq!(indent_level("  \tx", 4), Some(4));
        assert_eq!(indent_level("x", 4), Some(0));
        assert_eq!(indent_level("   ", 4), None);
        assert_eq!(indent_level("", 4), None);
    }

    #[test]
    fn test_vec_document() {
        let doc = vec!["a", "b"];
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.line_at(1).as_deref(), Some("b"));
        assert!(doc.path().is_none());
    }
}
