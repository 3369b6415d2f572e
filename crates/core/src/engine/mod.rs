//! Folding engine: compiled rules plus the scan of one document.

mod folding;
mod indentation;
mod options;
mod renderer;
mod router;
mod scanner;

pub use folding::ScanError;
pub use options::EngineOptions;
pub use renderer::{render_file, render_file_ansi, Renderer};
pub use router::{RouteError, Router};
pub use scanner::{FoldScanner, ProjectScanError};

use crate::compiler::{compile, CompileError, IndentationConfig, Rule, ScanContext};
use crate::document::Document;
use crate::models::FoldingOutcome;
use crate::rules::RuleConfig;
use folding::LineScanner;
use indentation::{fold_indentation, BlockView};
use std::collections::HashSet;
use std::sync::Arc;

/// Compiled rule set, reused for every document until the rules change
#[derive(Debug)]
pub struct FoldingEngine {
    rules: Vec<Rule>,
    main: Option<Arc<ScanContext>>,
    indentation: IndentationConfig,
    errors: Vec<CompileError>,
    options: EngineOptions,
}

impl FoldingEngine {
    pub fn new(configs: &[RuleConfig], options: EngineOptions) -> Self {
        let compiled = compile(configs, &options.variables, &options.debug);

        if let Some(main) = &compiled.main {
            options
                .debug
                .trace(|| format!("[main] regex: {}", main.source()));
        }

        Self {
            rules: compiled.rules,
            main: compiled.main,
            indentation: compiled.indentation,
            errors: compiled.errors,
            options,
        }
    }

    /// Compiled rules, indexed by rule index
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules dropped while compiling
    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    /// Source of the main context regex, if any rule contributes to it
    pub fn main_source(&self) -> Option<&str> {
        self.main.as_ref().map(|context| context.source())
    }

    pub fn indentation(&self) -> &IndentationConfig {
        &self.indentation
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Compute the folding ranges of `document`.
    ///
    /// Never fails: a scan error is logged and the ranges found up to that
    /// point are returned.
    pub fn provide_folding_ranges(&self, document: &dyn Document) -> FoldingOutcome {
        let debug = &self.options.debug;
        let label = document
            .path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| String::from("<untitled>"));
        debug.trace(|| format!("[document] fileName: {}", label));

        let mut outcome = FoldingOutcome::default();
        let mut result = self.scan_explicit(document, &mut outcome);

        if result.is_ok() && self.indentation.enabled {
            result = self.scan_indentation(document, &mut outcome);
        }

        if let Err(error) = result {
            debug.warn(&format!("[document] {}: {}", label, error));
        }

        debug.trace(|| {
            format!(
                "[document] foldingRanges: {}",
                serde_json::to_string(&outcome.ranges).unwrap_or_default()
            )
        });

        outcome
    }

    fn scan_explicit(&self, document: &dyn Document, outcome: &mut FoldingOutcome) -> Result<(), ScanError> {
        let Some(main) = &self.main else {
            return Ok(());
        };

        let mut scanner = LineScanner::new(&self.rules, document, &self.options.debug);
        let result = scanner.run(main);
        let found = scanner.finish();
        outcome.ranges.extend(found.ranges);
        outcome.auto_fold_lines.extend(found.auto_fold_lines);

        result
    }

    fn scan_indentation(&self, document: &dyn Document, outcome: &mut FoldingOutcome) -> Result<(), ScanError> {
        let tab_size = self.options.tab_size;
        let blocks = fold_indentation(
            document,
            &self.indentation,
            tab_size,
            &mut outcome.ranges,
            &self.options.debug,
        );

        let Some(nested) = &self.indentation.nested else {
            return Ok(());
        };

        let mut seen: HashSet<(usize, usize)> = outcome
            .ranges
            .iter()
            .map(|range| (range.start, range.end))
            .collect();

        for block in blocks {
            let view = BlockView::new(document, block, tab_size);
            let offset = view.offset();

            let mut scanner = LineScanner::new(&self.rules, &view, &self.options.debug);
            let result = scanner.run(nested);
            let found = scanner.finish();

            for mut range in found.ranges {
                range.start += offset;
                range.end += offset;
                if seen.insert((range.start, range.end)) {
                    outcome.ranges.push(range);
                }
            }
            outcome
                .auto_fold_lines
                .extend(found.auto_fold_lines.into_iter().map(|line| line + offset));

            result?;
        }

        Ok(())
    }
}
