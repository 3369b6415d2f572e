use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of a folding range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldingKind {
    /// Plain collapsible region
    #[default]
    Region,
    /// Comment block
    Comment,
}

impl FoldingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoldingKind::Region => "region",
            FoldingKind::Comment => "comment",
        }
    }
}

/// A collapsible line span, both ends inclusive (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FoldingRange {
    pub start: usize,
    pub end: usize,
    pub kind: FoldingKind,
}

impl FoldingRange {
    pub fn new(start: usize, end: usize, kind: FoldingKind) -> Self {
        Self { start, end, kind }
    }

    /// Number of lines spanned
    pub fn line_count(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    /// Check if this range contains another
    pub fn contains(&self, other: &FoldingRange) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// Check if this range partially overlaps another (neither nested nor disjoint)
    pub fn crosses(&self, other: &FoldingRange) -> bool {
        let disjoint = self.end < other.start || other.end < self.start;
        !disjoint && !self.contains(other) && !other.contains(self)
    }
}

/// Structural role of a matched sub-pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Begin,
    Middle,
    End,
    Docstring,
    Separator,
    While,
}

impl Marker {
    /// Numeric code used in capture-group names
    pub fn code(&self) -> u8 {
        match self {
            Marker::Begin => 0,
            Marker::Middle => 1,
            Marker::End => 2,
            Marker::Docstring => 3,
            Marker::Separator => 4,
            Marker::While => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Marker::Begin),
            1 => Some(Marker::Middle),
            2 => Some(Marker::End),
            3 => Some(Marker::Docstring),
            4 => Some(Marker::Separator),
            5 => Some(Marker::While),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Marker::Begin => "BEGIN",
            Marker::Middle => "MIDDLE",
            Marker::End => "END",
            Marker::Docstring => "DOCSTRING",
            Marker::Separator => "SEPARATOR",
            Marker::While => "WHILE",
        }
    }
}

/// Scan cursor: a line and a byte offset inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, offset: usize) -> Self {
        Self { line, offset }
    }

    /// Start of the line after `line`
    pub fn next_line(line: usize) -> Self {
        Self {
            line: line + 1,
            offset: 0,
        }
    }
}

/// Result of scanning one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldingOutcome {
    /// Folding ranges, in emission order
    pub ranges: Vec<FoldingRange>,
    /// Start lines of ranges whose rule asks to be folded automatically
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_fold_lines: Vec<usize>,
}

/// A scanned file with its folding ranges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Relative path from project root
    pub path: PathBuf,
    /// Absolute path
    pub absolute_path: PathBuf,
    /// Label of the route that handled the file ("main" for the default engine)
    pub route: String,
    /// All folding ranges in this file
    pub ranges: Vec<FoldingRange>,
    /// Lines flagged for automatic folding
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_fold_lines: Vec<usize>,
    /// Total line count
    pub line_count: usize,
    /// Whether the file was read successfully
    pub parsed: bool,
    /// Read error message if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Statistics about a scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoldStats {
    pub total_files: usize,
    pub total_folds: usize,
    pub region_folds: usize,
    pub comment_folds: usize,
    pub auto_fold_lines: usize,
    pub failed_files: usize,
    pub total_lines: usize,
    pub foldable_lines: usize,
}

impl FoldStats {
    pub fn add_range(&mut self, range: &FoldingRange) {
        self.total_folds += 1;
        self.foldable_lines += range.line_count();
        match range.kind {
            FoldingKind::Region => self.region_folds += 1,
            FoldingKind::Comment => self.comment_folds += 1,
        }
    }
}

/// Scan metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub scan_duration_ms: u64,
    pub files_per_second: f64,
    pub timestamp: String,
    pub tool_version: String,
}

impl Default for ScanMetadata {
    fn default() -> Self {
        Self {
            scan_duration_ms: 0,
            files_per_second: 0.0,
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Aggregated results of a project scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldMap {
    /// Project root path
    pub root: PathBuf,
    /// All files scanned
    pub files: Vec<SourceFile>,
    /// Fold statistics
    pub stats: FoldStats,
    /// Scan metadata
    pub metadata: ScanMetadata,
}

/// Rendered output for a single file
#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub content: String,
    pub fold_count: usize,
    pub lines_hidden: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_codes_round_trip() {
        for marker in [
            Marker::Begin,
            Marker::Middle,
            Marker::End,
            Marker::Docstring,
            Marker::Separator,
            Marker::While,
        ] {
            assert_eq!(Marker::from_code(marker.code()), Some(marker));
        }
        assert_eq!(Marker::from_code(9), None);
    }

    #[test]
    fn test_range_relations() {
        let outer = FoldingRange::new(0, 10, FoldingKind::Region);
        let inner = FoldingRange::new(2, 5, FoldingKind::Region);
        let crossing = FoldingRange::new(8, 12, FoldingKind::Region);
        let after = FoldingRange::new(11, 12, FoldingKind::Comment);

        assert!(outer.contains(&inner));
        assert!(!outer.crosses(&inner));
        assert!(outer.crosses(&crossing));
        assert!(!outer.crosses(&after));
        assert_eq!(inner.line_count(), 4);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let range = FoldingRange::new(1, 3, FoldingKind::Comment);
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(json, r#"{"start":1,"end":3,"kind":"comment"}"#);
    }
}
