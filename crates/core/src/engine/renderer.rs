use super::Router;
use crate::models::{FoldingKind, FoldingOutcome, FoldingRange, RenderedFile};
use ropey::Rope;
use std::fs;
use std::path::Path;
use termcolor::Color;

/// Renderer showing a document with its folding ranges collapsed
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    auto_fold_only: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collapse only ranges flagged `autoFold` (builder pattern)
    pub fn with_auto_fold_only(mut self, auto_fold_only: bool) -> Self {
        self.auto_fold_only = auto_fold_only;
        self
    }

    /// Render with folds applied, returning plain text
    pub fn render(&self, source: &str, outcome: &FoldingOutcome) -> String {
        self.render_with(source, outcome, |range| self.format_placeholder(range))
    }

    /// Render with ANSI colored placeholders
    pub fn render_ansi(&self, source: &str, outcome: &FoldingOutcome) -> String {
        self.render_with(source, outcome, |range| self.format_placeholder_ansi(range))
    }

    /// Ranges that will be collapsed, outermost only, sorted by start line
    pub fn collapsed_ranges(&self, outcome: &FoldingOutcome) -> Vec<FoldingRange> {
        let mut sorted: Vec<&FoldingRange> = outcome
            .ranges
            .iter()
            .filter(|range| !self.auto_fold_only || outcome.auto_fold_lines.contains(&range.start))
            .collect();
        sorted.sort_by_key(|range| (range.start, std::cmp::Reverse(range.end)));

        self.filter_overlapping_folds(&sorted)
            .into_iter()
            .copied()
            .collect()
    }

    fn render_with<F>(&self, source: &str, outcome: &FoldingOutcome, placeholder: F) -> String
    where
        F: Fn(&FoldingRange) -> String,
    {
        let folds = self.collapsed_ranges(outcome);
        if folds.is_empty() {
            return source.to_string();
        }

        let rope = Rope::from_str(source);
        let mut result = String::with_capacity(source.len());
        let mut folds = folds.iter().peekable();
        let mut line = 0;

        while line < rope.len_lines() {
            let text = rope.line(line).to_string();

            let Some(fold) = folds.next_if(|fold| fold.start == line) else {
                result.push_str(&text);
                line += 1;
                continue;
            };

            // header line stays visible with the placeholder appended
            let header = text.trim_end_matches(['\n', '\r']);
            result.push_str(header);
            result.push(' ');
            result.push_str(&placeholder(fold));
            result.push('\n');

            line = fold.end + 1;
            while folds.next_if(|next| next.start < line).is_some() {}
        }

        result
    }

    /// Filter out contained folds, keeping only outermost ones
    fn filter_overlapping_folds<'a>(&self, folds: &[&'a FoldingRange]) -> Vec<&'a FoldingRange> {
        let mut result: Vec<&FoldingRange> = Vec::new();

        for fold in folds {
            let is_nested = result.iter().any(|f| f.start <= fold.start && f.end >= fold.start);

            if !is_nested {
                result.retain(|f| !fold.contains(f));
                result.push(fold);
            }
        }

        result.sort_by_key(|f| f.start);
        result
    }

    /// Format a fold placeholder (plain text)
    fn format_placeholder(&self, fold: &FoldingRange) -> String {
        format!("⋯ {} lines", fold.line_count() - 1)
    }

    /// Format a fold placeholder with ANSI colors
    fn format_placeholder_ansi(&self, fold: &FoldingRange) -> String {
        let dim = "\x1b[2m";
        let reset = "\x1b[0m";
        let fg_color = match self.get_fold_color(fold.kind) {
            Color::Blue => "\x1b[34m",
            Color::Green => "\x1b[32m",
            _ => "\x1b[90m",
        };

        format!("{}{}{}{}", dim, fg_color, self.format_placeholder(fold), reset)
    }

    /// Get color for a range kind
    fn get_fold_color(&self, kind: FoldingKind) -> Color {
        match kind {
            FoldingKind::Region => Color::Blue,
            FoldingKind::Comment => Color::Green,
        }
    }
}

/// Render a file with folds applied (convenience function)
pub fn render_file(path: &Path, router: &Router, renderer: &Renderer) -> Result<RenderedFile, std::io::Error> {
    render_file_with(path, router, renderer, false)
}

/// Render a file with ANSI colors (convenience function)
pub fn render_file_ansi(path: &Path, router: &Router, renderer: &Renderer) -> Result<RenderedFile, std::io::Error> {
    render_file_with(path, router, renderer, true)
}

fn render_file_with(
    path: &Path,
    router: &Router,
    renderer: &Renderer,
    ansi: bool,
) -> Result<RenderedFile, std::io::Error> {
    let content = fs::read_to_string(path)?;
    let document = crate::document::TextDocument::from_str(&content).with_path(path.to_path_buf());
    let outcome = router.provide_folding_ranges(&document);

    let rendered = if ansi {
        renderer.render_ansi(&content, &outcome)
    } else {
        renderer.render(&content, &outcome)
    };

    let collapsed = renderer.collapsed_ranges(&outcome);
    let lines_hidden: usize = collapsed.iter().map(|f| f.line_count() - 1).sum();

    Ok(RenderedFile {
        path: path.to_path_buf(),
        content: rendered,
        fold_count: collapsed.len(),
        lines_hidden,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(ranges: &[(usize, usize)], auto_fold_lines: Vec<usize>) -> FoldingOutcome {
        FoldingOutcome {
            ranges: ranges
                .iter()
                .map(|&(start, end)| FoldingRange::new(start, end, FoldingKind::Region))
                .collect(),
            auto_fold_lines,
        }
    }

    #[test]
    fn test_renderer_no_folds() {
        let renderer = Renderer::new();
        let source = "hello world";
        assert_eq!(renderer.render(source, &FoldingOutcome::default()), source);
    }

    #[test]
    fn test_renderer_outermost_fold() {
        let renderer = Renderer::new();
        let source = "fn test() {\n  if x {\n    y\n  }\n}\nafter\n";

        let result = renderer.render(source, &outcome(&[(1, 3), (0, 4)], vec![]));
        assert_eq!(result, "fn test() { ⋯ 4 lines\nafter\n");
    }

    #[test]
    fn test_renderer_sibling_folds() {
        let renderer = Renderer::new();
        let source = "a {\n1\n}\nb {\n2\n}";

        let result = renderer.render(source, &outcome(&[(0, 2), (3, 5)], vec![]));
        assert_eq!(result, "a { ⋯ 2 lines\nb { ⋯ 2 lines\n");
    }

    #[test]
    fn test_auto_fold_only() {
        let renderer = Renderer::new().with_auto_fold_only(true);
        let source = "a\nb\nc\nd\ne";

        let result = renderer.render(source, &outcome(&[(0, 1), (2, 4)], vec![2]));
        assert_eq!(result, "a\nb\nc ⋯ 2 lines\n");
    }

    #[test]
    fn test_ansi_placeholder_is_colored() {
        let renderer = Renderer::new();
        let result = renderer.render_ansi("a {\n}\n", &outcome(&[(0, 1)], vec![]));
        assert!(result.contains("\x1b[34m⋯ 1 lines\x1b[0m"));
    }
}
