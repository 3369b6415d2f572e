//! Indentation fallback: folds indented blocks no explicit rule covers.

use crate::compiler::IndentationConfig;
use crate::debug::DebugChannel;
use crate::document::{indent_level, Document};
use crate::models::{FoldingKind, FoldingRange};
use std::borrow::Cow;
use std::collections::HashSet;

/// A block found by the backward pass: header line and last body line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndentBlock {
    pub header: usize,
    pub end: usize,
}

#[derive(Debug)]
struct OpenRegion {
    /// `None` for the sentinel below every real indent
    indent: Option<usize>,
    end: usize,
}

impl OpenRegion {
    fn deeper_than(&self, indent: usize) -> bool {
        self.indent.map_or(false, |level| level > indent)
    }
}

/// Walk the document backwards, appending a range for every indented block
/// whose header passes the filter and carries no explicit range yet.
/// Returns the blocks that passed the filter.
pub(crate) fn fold_indentation(
    document: &dyn Document,
    config: &IndentationConfig,
    tab_size: usize,
    ranges: &mut Vec<FoldingRange>,
    debug: &DebugChannel,
) -> Vec<IndentBlock> {
    let line_count = document.line_count();
    debug.trace(|| format!("[indentation] tabSize: {}", tab_size));

    let existing: HashSet<usize> = ranges.iter().map(|range| range.start).collect();
    let mut regions = vec![OpenRegion {
        indent: None,
        end: line_count,
    }];
    let mut blocks = Vec::new();

    for line in (0..line_count).rev() {
        let text = document.line_at(line).unwrap_or(Cow::Borrowed(""));

        let Some(indent) = indent_level(&text, tab_size) else {
            if config.off_side {
                // blank lines end the block above them
                if let Some(previous) = regions.last_mut() {
                    previous.end = line;
                }
            }
            continue;
        };

        let Some(previous) = regions.last_mut() else {
            break;
        };

        if previous.deeper_than(indent) {
            while regions.last().map_or(false, |region| region.deeper_than(indent)) {
                regions.pop();
            }

            let fold = match &config.filter {
                Some(filter) => filter.is_match(&text).unwrap_or_else(|e| {
                    debug.warn(&format!("[indentation] line: {}, {}", line + 1, e));
                    false
                }),
                None => true,
            };
            debug.trace(|| {
                format!(
                    "[indentation] line: {}, match(begin): {}",
                    line + 1,
                    if fold { "yes" } else { "no" }
                )
            });

            if fold {
                let end = regions
                    .last()
                    .map_or(line_count, |region| region.end)
                    .saturating_sub(1);
                if end > line {
                    blocks.push(IndentBlock { header: line, end });
                    if !existing.contains(&line) {
                        ranges.push(FoldingRange::new(line, end, FoldingKind::Region));
                    }
                }
            }

            regions.push(OpenRegion {
                indent: Some(indent),
                end: line,
            });
        } else if previous.indent == Some(indent) {
            previous.end = line;
        } else {
            regions.push(OpenRegion {
                indent: Some(indent),
                end: line,
            });
        }
    }

    blocks
}

/// Body of an indentation block as seen by the nested sweep: only lines at
/// the block's inner indent level are visible, deeper lines read as blank
pub(crate) struct BlockView<'a> {
    document: &'a dyn Document,
    first: usize,
    len: usize,
    level: Option<usize>,
    tab_size: usize,
}

impl<'a> BlockView<'a> {
    pub(crate) fn new(document: &'a dyn Document, block: IndentBlock, tab_size: usize) -> Self {
        let first = block.header + 1;
        let len = (block.end + 1).saturating_sub(first);
        let level = (first..first + len)
            .filter_map(|line| document.line_at(line))
            .filter_map(|text| indent_level(&text, tab_size))
            .min();

        Self {
            document,
            first,
            len,
            level,
            tab_size,
        }
    }

    /// Document line shown as view line 0
    pub(crate) fn offset(&self) -> usize {
        self.first
    }
}

impl Document for BlockView<'_> {
    fn line_count(&self) -> usize {
        self.len
    }

    fn line_at(&self, index: usize) -> Option<Cow<'_, str>> {
        if index >= self.len {
            return None;
        }

        let text = self.document.line_at(self.first + index)?;
        match indent_level(&text, self.tab_size) {
            Some(indent) if Some(indent) != self.level => Some(Cow::Borrowed("")),
            _ => Some(text),
        }
    }
}
