//! Stack-based line scanner.
//!
//! The scan cursor is a [`Position`] threaded through calls and returns.
//! Private loops (non-nested rules, back-reference variants) recurse with
//! their own stack and context and hand back the position to resume at.

use crate::compiler::{wrap, MarkerMatch, Rule, ScanContext};
use crate::debug::DebugChannel;
use crate::document::Document;
use crate::models::{FoldingOutcome, FoldingRange, Marker, Position};
use fancy_regex::Captures;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Failure aborting the scan of one document
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("line {0} is out of range")]
    LineOutOfRange(usize),

    #[error("cannot compile loop pattern for `{context}`: {message}")]
    LoopPattern { context: String, message: String },

    #[error("matching `{context}` failed: {message}")]
    Match { context: String, message: String },
}

impl ScanError {
    fn matching(context: &str, error: fancy_regex::Error) -> Self {
        ScanError::Match {
            context: context.to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct StackItem {
    rule: usize,
    line: usize,
    variant: Option<usize>,
}

impl StackItem {
    fn new(rule: usize, line: usize) -> Self {
        Self {
            rule,
            line,
            variant: None,
        }
    }
}

/// A concrete end pattern of a back-referencing rule, active for the
/// duration of its variant loop
#[derive(Debug)]
struct EndVariant {
    id: usize,
    pattern: String,
}

pub(crate) struct LineScanner<'a> {
    rules: &'a [Rule],
    document: &'a dyn Document,
    debug: &'a DebugChannel,
    line_count: usize,
    ranges: Vec<FoldingRange>,
    auto_fold_lines: Vec<usize>,
    variants: HashMap<usize, Vec<EndVariant>>,
    contexts: HashMap<String, Arc<ScanContext>>,
}

impl<'a> LineScanner<'a> {
    pub(crate) fn new(rules: &'a [Rule], document: &'a dyn Document, debug: &'a DebugChannel) -> Self {
        Self {
            rules,
            document,
            debug,
            line_count: document.line_count(),
            ranges: Vec::new(),
            auto_fold_lines: Vec::new(),
            variants: HashMap::new(),
            contexts: HashMap::new(),
        }
    }

    /// Scan the whole document against `main`
    pub(crate) fn run(&mut self, main: &Arc<ScanContext>) -> Result<(), ScanError> {
        let mut stack = Vec::new();
        let mut position = Position::default();

        while position.line < self.line_count {
            position = self.resolve(main, &mut stack, false, position)?;
        }

        self.flush_eof(&mut stack);
        Ok(())
    }

    /// Ranges found so far (also after a failed [`run`](Self::run))
    pub(crate) fn finish(self) -> FoldingOutcome {
        FoldingOutcome {
            ranges: self.ranges,
            auto_fold_lines: self.auto_fold_lines,
        }
    }

    /// Dispatch every marker of one line, starting at `position`
    fn resolve(
        &mut self,
        context: &Arc<ScanContext>,
        stack: &mut Vec<StackItem>,
        private: bool,
        position: Position,
    ) -> Result<Position, ScanError> {
        let (rules, document) = (self.rules, self.document);
        let line = position.line;
        let text = document
            .line_at(line)
            .ok_or(ScanError::LineOutOfRange(line))?;
        let mut offset = position.offset;

        while let Some(found) = context
            .find_at(&text, offset)
            .map_err(|e| ScanError::matching(context.name(), e))?
        {
            offset = found.next_offset;
            let Some(rule) = rules.get(found.slot.rule) else {
                continue;
            };

            self.debug.trace(|| {
                format!(
                    "[{}] line: {}, offset: {}, type: {}, match: {}, regex: {}",
                    context.name(),
                    line + 1,
                    found.start,
                    found.slot.marker.as_str(),
                    &text[found.start..found.end],
                    rule.index
                )
            });

            let next = match found.slot.marker {
                Marker::Begin => self.on_begin(context, stack, private, rule, &found, line, &text)?,
                Marker::Middle => {
                    self.on_middle(stack, rule, line);
                    None
                }
                Marker::End => self.on_end(stack, private, rule, &found, line),
                Marker::Docstring => {
                    self.on_docstring(stack, private, rule, line);
                    None
                }
                Marker::Separator => {
                    self.on_separator(stack, private, rule, line);
                    None
                }
                Marker::While => Some(self.extend_while(rule, line, false)?),
            };

            if let Some(next) = next {
                return Ok(next);
            }
        }

        Ok(Position::next_line(line))
    }

    /// Whether a new region may be pushed on `stack`
    fn can_open(&self, stack: &[StackItem], private: bool) -> bool {
        match stack.last() {
            None => true,
            // the seed of a private loop admits the rules of its own context
            Some(top) => self.rules[top.rule].nested || (private && stack.len() == 1),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn on_begin(
        &mut self,
        context: &Arc<ScanContext>,
        stack: &mut Vec<StackItem>,
        private: bool,
        rule: &Rule,
        found: &MarkerMatch<'_>,
        line: usize,
        text: &str,
    ) -> Result<Option<Position>, ScanError> {
        if !self.can_open(stack, private) {
            return Ok(None);
        }

        if !rule.nested && (rule.loop_context.is_some() || rule.end_matcher.is_some()) {
            return self.enter_private_loop(rule, found, line).map(Some);
        }

        if rule.end_matcher.is_some() {
            return self.enter_variant_loop(context, rule, found, line).map(Some);
        }

        if rule.continuation {
            let opens = match &rule.while_ {
                Some(pattern) => pattern
                    .is_match(text)
                    .map_err(|e| ScanError::matching(rule.loop_name().as_str(), e))?,
                None => false,
            };
            if !opens {
                return Ok(Some(Position::next_line(line)));
            }
            return self.extend_while(rule, line, true).map(Some);
        }

        if rule.while_.is_some() {
            return self.extend_while(rule, line, false).map(Some);
        }

        stack.push(StackItem::new(rule.index, line));
        Ok(None)
    }

    /// Scan the body of a non-nested rule with its own context
    fn enter_private_loop(
        &mut self,
        rule: &Rule,
        found: &MarkerMatch<'_>,
        line: usize,
    ) -> Result<Position, ScanError> {
        let context = match &rule.end_matcher {
            Some(matcher) => {
                let end = matcher.build(&found.captures, found.slot.group);
                let mut source = rule
                    .loop_context
                    .as_ref()
                    .map(|c| c.source().to_string())
                    .unwrap_or_default();
                if !source.is_empty() {
                    source.push('|');
                }
                source.push_str(&wrap(Marker::End, rule.index, None, &end));
                self.context_for(rule.loop_name(), source)?
            }
            None => match &rule.loop_context {
                Some(context) => Arc::clone(context),
                None => return Ok(Position::new(line, found.next_offset)),
            },
        };

        self.debug
            .trace(|| format!("[{}] regex: {}", context.name(), context.source()));

        let mut stack = vec![StackItem::new(rule.index, line)];
        self.run_loop(&context, &mut stack, Position::new(line, found.next_offset))
    }

    /// Scan the body of a nested back-referencing rule: the current context
    /// plus this occurrence's concrete end pattern
    fn enter_variant_loop(
        &mut self,
        context: &Arc<ScanContext>,
        rule: &Rule,
        found: &MarkerMatch<'_>,
        line: usize,
    ) -> Result<Position, ScanError> {
        let Some(matcher) = &rule.end_matcher else {
            return Ok(Position::new(line, found.next_offset));
        };
        let end = matcher.build(&found.captures, found.slot.group);

        let active = self.variants.entry(rule.index).or_default();
        let (variant, fresh) = match active.iter().find(|v| v.pattern == end) {
            Some(existing) => (existing.id, false),
            None => {
                let id = active.len() + 1;
                active.push(EndVariant {
                    id,
                    pattern: end.clone(),
                });
                (id, true)
            }
        };

        let loop_context = if fresh {
            let source = format!(
                "{}|{}",
                wrap(Marker::End, rule.index, Some(variant), &end),
                context.source()
            );
            self.context_for(context.name().to_string(), source)
        } else {
            Ok(Arc::clone(context))
        };

        let mut stack = vec![StackItem {
            variant: Some(variant),
            ..StackItem::new(rule.index, line)
        }];
        let start = Position::new(line, found.next_offset);
        let result = loop_context.and_then(|ctx| self.run_loop(&ctx, &mut stack, start));

        if fresh {
            if let Some(active) = self.variants.get_mut(&rule.index) {
                active.retain(|v| v.id != variant);
            }
        }

        result
    }

    /// Drive a private loop until its stack empties or the document ends
    fn run_loop(
        &mut self,
        context: &Arc<ScanContext>,
        stack: &mut Vec<StackItem>,
        start: Position,
    ) -> Result<Position, ScanError> {
        let mut position = start;

        while !stack.is_empty() && position.line < self.line_count {
            position = self.resolve(context, stack, true, position)?;
        }

        if !stack.is_empty() {
            self.flush_eof(stack);
        }

        Ok(position)
    }

    /// Compiled context for `source`, cached for the rest of the scan
    fn context_for(&mut self, name: String, source: String) -> Result<Arc<ScanContext>, ScanError> {
        if let Some(context) = self.contexts.get(&source) {
            return Ok(Arc::clone(context));
        }

        let context = ScanContext::new(name.clone(), &source).map_err(|e| ScanError::LoopPattern {
            context: name,
            message: e.to_string(),
        })?;
        let context = Arc::new(context);
        self.contexts.insert(source, Arc::clone(&context));

        Ok(context)
    }

    fn on_middle(&mut self, stack: &mut [StackItem], rule: &Rule, line: usize) {
        let Some(top) = stack.last_mut() else {
            return;
        };
        if top.rule != rule.index {
            return;
        }

        let begin = top.line;
        top.line = line;
        if line > begin + 1 {
            self.push_range(rule, begin, line - 1);
        }
    }

    fn on_end(
        &mut self,
        stack: &mut Vec<StackItem>,
        private: bool,
        rule: &Rule,
        found: &MarkerMatch<'_>,
        line: usize,
    ) -> Option<Position> {
        let rules = self.rules;
        let matched = Some((&found.captures, found.slot.group));

        if private {
            if let Some(bottom) = stack.first().copied() {
                if bottom.rule == rule.index {
                    if bottom.variant.is_some() && bottom.variant != found.slot.variant {
                        // belongs to an enclosing variant loop
                        stack.clear();
                        return Some(Position::new(line, found.start));
                    }

                    let end = self.end_line(rule, found, line, bottom.line);
                    while stack.len() > 1 {
                        if let Some(item) = stack.pop() {
                            if end > item.line + 1 {
                                self.push_range(&rules[item.rule], item.line, end - 1);
                            }
                        }
                    }
                    stack.clear();
                    self.close(rule, bottom.line, end, matched);

                    return Some(Position::new(line, found.next_offset));
                }
            }
        }

        if let Some(top) = stack.last().copied() {
            if top.rule == rule.index && top.variant.is_none() {
                stack.pop();
                let end = self.end_line(rule, found, line, top.line);
                self.close(rule, top.line, end, matched);
            }
        }

        None
    }

    /// Closing line of an END match, honouring `consumeEnd`
    fn end_line(&self, rule: &Rule, found: &MarkerMatch<'_>, line: usize, begin: usize) -> usize {
        if rule
            .consume_end
            .evaluate(Some((&found.captures, found.slot.group)))
        {
            line
        } else {
            line.saturating_sub(1).max(begin)
        }
    }

    fn on_docstring(&mut self, stack: &mut Vec<StackItem>, private: bool, rule: &Rule, line: usize) {
        if let Some(top) = stack.last().copied() {
            if top.rule == rule.index {
                stack.pop();
                self.close(rule, top.line, line, None);
                return;
            }
        }

        if self.can_open(stack, private) {
            stack.push(StackItem::new(rule.index, line));
        }
    }

    fn on_separator(&mut self, stack: &mut Vec<StackItem>, private: bool, rule: &Rule, line: usize) {
        let rules = self.rules;
        let item = StackItem::new(rule.index, line);

        if stack.is_empty() {
            if rule.parents.is_empty() {
                if rule.fold_bof && line > 1 {
                    self.push_range(rule, 0, line - 1);
                }
                stack.push(item);
            }
            return;
        }

        // an enclosing separator closes everything declared under it
        while let Some(top) = stack.last().copied() {
            if !rules[top.rule].parents.contains(&rule.index) {
                break;
            }
            stack.pop();
            if line > top.line + 1 {
                self.push_range(&rules[top.rule], top.line, line - 1);
            }
        }

        let Some(top) = stack.last().copied() else {
            if rule.parents.is_empty() {
                stack.push(item);
            }
            return;
        };

        if top.rule == rule.index {
            if let Some(top) = stack.last_mut() {
                top.line = line;
            }
            if line > top.line + 1 {
                self.push_range(rule, top.line, line - 1);
            }
            return;
        }

        if self.can_open(stack, private) && self.separator_admitted(stack, rule) {
            stack.push(item);
        }
    }

    /// Ancestor policy of a separator declared inside a whitelist
    fn separator_admitted(&self, stack: &[StackItem], rule: &Rule) -> bool {
        let Some(&nearest) = rule.parents.last() else {
            return true;
        };

        if self.rules[nearest].strict {
            stack.iter().any(|item| item.rule == nearest)
        } else {
            stack.iter().any(|item| rule.parents.contains(&item.rule))
        }
    }

    /// Extend a region from `begin` while lines keep matching the rule's
    /// `while` pattern; returns where scanning resumes
    fn extend_while(&mut self, rule: &Rule, begin: usize, continuation: bool) -> Result<Position, ScanError> {
        let document = self.document;
        let Some(pattern) = &rule.while_ else {
            return Ok(Position::next_line(begin));
        };
        let fold_last_line = rule.fold_last_line.evaluate(None);

        let mut line = begin + 1;
        while line < self.line_count {
            let matches = match document.line_at(line) {
                Some(text) => pattern
                    .is_match(&text)
                    .map_err(|e| ScanError::matching(rule.loop_name().as_str(), e))?,
                None => false,
            };

            if !matches {
                // continuation mode keeps the first non-matching line
                let end = if continuation { line } else { line - 1 };
                if fold_last_line {
                    if end > begin {
                        self.push_range(rule, begin, end);
                    }
                } else if end > begin + 1 {
                    self.push_range(rule, begin, end - 1);
                }

                // the line closing a continuation stays outside the range
                // and is scanned again
                if continuation && !fold_last_line {
                    return Ok(Position::new(end, 0));
                }
                return Ok(Position::next_line(end));
            }

            line += 1;
        }

        let end = line.min(self.line_count.saturating_sub(1));
        if fold_last_line {
            if end > begin {
                self.push_range(rule, begin, end);
            }
        } else if end > begin + 1 {
            self.push_range(rule, begin, end - 1);
        }

        Ok(Position::new(line, 0))
    }

    /// Close a region whose last line is `end`, dropping it when
    /// `foldLastLine` is off
    fn close(&mut self, rule: &Rule, begin: usize, end: usize, matched: Option<(&Captures<'_>, usize)>) {
        if rule.fold_last_line.evaluate(matched) {
            if end > begin {
                self.push_range(rule, begin, end);
            }
        } else if end > begin + 1 {
            self.push_range(rule, begin, end - 1);
        }
    }

    fn flush_eof(&mut self, stack: &mut Vec<StackItem>) {
        let rules = self.rules;
        while let Some(item) = stack.pop() {
            let rule = &rules[item.rule];
            if rule.fold_eof && self.line_count > item.line + 1 {
                self.push_range(rule, item.line, self.line_count - 1);
            }
        }
    }

    fn push_range(&mut self, rule: &Rule, begin: usize, end: usize) {
        self.ranges.push(FoldingRange::new(begin, end, rule.kind));
        if rule.auto_fold {
            self.auto_fold_lines.push(begin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile, CompiledRules};
    use crate::document::TextDocument;
    use crate::rules::RuleConfig;
    use pretty_assertions::assert_eq;
    use std::borrow::Cow;
    use std::collections::BTreeMap;

    fn compiled(json: &str) -> CompiledRules {
        let configs: Vec<RuleConfig> = serde_json::from_str(json).unwrap();
        let compiled = compile(&configs, &BTreeMap::new(), &DebugChannel::default());
        assert!(compiled.errors.is_empty(), "{:?}", compiled.errors);
        compiled
    }

    fn scan(compiled: &CompiledRules, document: &dyn Document) -> (Result<(), ScanError>, Vec<(usize, usize)>) {
        let debug = DebugChannel::default();
        let main = compiled.main.as_ref().unwrap();
        let mut scanner = LineScanner::new(&compiled.rules, document, &debug);
        let result = scanner.run(main);
        let mut spans: Vec<(usize, usize)> = scanner.finish().ranges.iter().map(|r| (r.start, r.end)).collect();
        spans.sort();
        (result, spans)
    }

    fn spans(json: &str, text: &str) -> Vec<(usize, usize)> {
        let (result, spans) = scan(&compiled(json), &TextDocument::from_str(text));
        assert!(result.is_ok());
        spans
    }

    #[test]
    fn test_enclosing_separator_closes_descendants() {
        let rules = r#"[{"separatorRegex": "^# ", "descendants": [{"separatorRegex": "^## "}]}]"#;
        let text = "# A\n## a1\nx\n## a2\ny\n# B\nz";

        assert_eq!(spans(rules, text), vec![(0, 4), (1, 2), (3, 4), (5, 6)]);
    }

    #[test]
    fn test_descendant_separator_needs_its_ancestor() {
        let rules = r#"[{"separatorRegex": "^# ", "descendants": [{"separatorRegex": "^## "}]}]"#;

        // the first `## ` has no open `# ` section; `# B` folds the lines above it
        assert_eq!(spans(rules, "## a\nx\n# B\n## b\ny"), vec![(0, 1), (2, 4), (3, 4)]);
    }

    #[test]
    fn test_separator_whitelisted_in_private_loop() {
        let rules = r#"[{"beginRegex": "^case", "endRegex": "^esac", "nested": [{"separatorRegex": "\\)$"}]}]"#;
        let text = "case x in\na)\n  one\nb)\n  two\nesac\nz)\nw";

        assert_eq!(spans(rules, text), vec![(0, 5), (1, 2), (3, 4)]);
    }

    #[test]
    fn test_strict_ancestor_admission() {
        let strict = compiled(
            r#"[{"beginRegex": "^a", "endRegex": "^z",
                 "nested": [{"beginRegex": "\\{", "endRegex": "\\}",
                             "nested": [{"separatorRegex": "^--"}]}]}]"#,
        );
        let loose = compiled(
            r#"[{"beginRegex": "^a", "endRegex": "^z",
                 "nested": [{"beginRegex": "\\{", "endRegex": "\\}", "strict": false,
                             "nested": [{"separatorRegex": "^--"}]}]}]"#,
        );
        let document = TextDocument::from_str("");
        let debug = DebugChannel::default();

        for (rules, outer_only) in [(&strict, false), (&loose, true)] {
            let separator = &rules.rules[2];
            assert_eq!(separator.parents, vec![0, 1]);

            let scanner = LineScanner::new(&rules.rules, &document, &debug);
            let outer = [StackItem::new(0, 0)];
            let both = [StackItem::new(0, 0), StackItem::new(1, 1)];
            assert_eq!(scanner.separator_admitted(&outer, separator), outer_only);
            assert!(scanner.separator_admitted(&both, separator));
            assert!(!scanner.separator_admitted(&[], separator));
        }
    }

    #[test]
    fn test_nested_same_tag_variants() {
        let rules = r#"[{"beginRegex": "<(\\w+)>", "endRegex": "</\\1>"}]"#;

        assert_eq!(spans(rules, "<a>\n<a>\nx\n</a>\n</a>"), vec![(0, 4), (1, 3)]);
    }

    #[test]
    fn test_variant_mismatch_abandons_inner_loop() {
        let rules = r#"[{"beginRegex": "<(\\w+)>", "endRegex": "</\\1>"}]"#;

        // `</a>` closes the outer tag; the unclosed `<b>` yields nothing
        assert_eq!(spans(rules, "<a>\n<b>\nx\n</a>\ny\n</b>"), vec![(0, 3)]);
    }

    #[test]
    fn test_whitelisted_begin_inside_private_loop() {
        let rules = r#"[{"beginRegex": "^begin", "endRegex": "^end",
                          "nested": [{"beginRegex": "\\{", "endRegex": "\\}"}]},
                         {"beginRegex": "\\(", "endRegex": "\\)"}]"#;
        let text = "begin\n{\n(\n)\n}\nend\n(\n)\n{\n}";

        assert_eq!(spans(rules, text), vec![(0, 5), (1, 4), (6, 7)]);
    }

    #[test]
    fn test_per_branch_end_policies() {
        let rules = r#"[{"beginRegex": "^if", "endRegex": "^(fi)|^(done)", "foldLastLine": [true, true, false]},
                         {"beginRegex": "^repeat", "endRegex": "^(until)|^(stop)", "consumeEnd": [true, true, false]}]"#;
        let text = "if a\nx\nfi\nif b\ny\ndone\nrepeat\nx\nuntil\nrepeat\ny\nstop";

        assert_eq!(spans(rules, text), vec![(0, 2), (3, 4), (6, 8), (9, 10)]);
    }

    /// Document whose text ends before its reported line count
    struct Truncated {
        lines: Vec<&'static str>,
        count: usize,
    }

    impl Document for Truncated {
        fn line_count(&self) -> usize {
            self.count
        }

        fn line_at(&self, index: usize) -> Option<Cow<'_, str>> {
            self.lines.get(index).map(|line| Cow::Borrowed(*line))
        }
    }

    #[test]
    fn test_scan_error_keeps_ranges_found_before() {
        let rules = compiled(r#"[{"beginRegex": "\\{", "endRegex": "\\}"}]"#);
        let document = Truncated {
            lines: vec!["{", "}", "{", "x"],
            count: 6,
        };

        let (result, spans) = scan(&rules, &document);
        assert!(matches!(result, Err(ScanError::LineOutOfRange(4))));
        assert_eq!(spans, vec![(0, 1)]);
    }
}
