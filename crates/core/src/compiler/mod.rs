//! Rule compiler.
//!
//! Turns a tree of [`RuleConfig`]s into a flat list of [`Rule`]s plus the
//! combined regex of the main context. Nested whitelists are compiled
//! recursively; a rule that fails to compile is dropped with a message on the
//! debug channel and its siblings are unaffected.

mod context;
mod pattern;
mod rule;
mod shape;
mod variables;

pub use context::{GroupSlot, MarkerMatch, ScanContext};
pub use pattern::EndMatcher;
pub use rule::{BranchPolicy, Rule, RuleShape};

pub(crate) use context::wrap;

use crate::debug::DebugChannel;
use crate::models::Marker;
use crate::rules::{RuleConfig, Strict};
use pattern::{capture_count, compile_checked};
use fancy_regex::Regex;
use shape::{Fields, Shape};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use variables::Variables;

/// Why a rule was dropped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("rule #{rule}: unknown variable `{name}`")]
    UnknownVariable { rule: usize, name: String },

    #[error("rule #{rule}: raw variable `{{{{!{name}}}}}` is only allowed in regex fields")]
    RawVariableInLiteral { rule: usize, name: String },

    #[error("rule #{rule}: invalid regex `{pattern}`: {message}")]
    InvalidRegex {
        rule: usize,
        pattern: String,
        message: String,
    },

    #[error("rule #{rule}: pattern `{pattern}` matches the empty string")]
    EmptyMatch { rule: usize, pattern: String },

    #[error("rule #{rule}: {reason}")]
    UnsupportedShape { rule: usize, reason: String },

    #[error("rule #{rule}: end references group {group} but begin only has {available}")]
    InvalidBackReference {
        rule: usize,
        group: usize,
        available: usize,
    },

    #[error("context `{context}`: {message}")]
    InvalidContext { context: String, message: String },
}

/// Engine-level indentation fallback settings
#[derive(Debug, Clone, Default)]
pub struct IndentationConfig {
    pub enabled: bool,
    pub off_side: bool,
    /// Header lines must match this to fold
    pub filter: Option<Regex>,
    /// Explicit rules swept over each indentation block
    pub nested: Option<Arc<ScanContext>>,
}

/// Output of [`compile`]
#[derive(Debug, Default)]
pub struct CompiledRules {
    pub rules: Vec<Rule>,
    pub main: Option<Arc<ScanContext>>,
    pub indentation: IndentationConfig,
    pub errors: Vec<CompileError>,
}

/// Compile `configs` with the global variable table `variables`
pub fn compile(
    configs: &[RuleConfig],
    variables: &BTreeMap<String, String>,
    debug: &DebugChannel,
) -> CompiledRules {
    let mut compiler = Compiler {
        debug,
        rules: Vec::new(),
        indentation: IndentationConfig::default(),
        errors: Vec::new(),
    };

    let vars = Variables::new(variables.clone());
    let fragments: Vec<String> = configs
        .iter()
        .map(|config| compiler.add_rule(config, &vars, true, &[]))
        .filter(|source| !source.is_empty())
        .collect();

    let main = compiler.build_context("main", &fragments);
    debug.info(&format!(
        "[compiler] {} rule(s), {} error(s)",
        compiler.rules.len(),
        compiler.errors.len()
    ));

    CompiledRules {
        rules: compiler.rules,
        main,
        indentation: compiler.indentation,
        errors: compiler.errors,
    }
}

struct Compiler<'a> {
    debug: &'a DebugChannel,
    rules: Vec<Rule>,
    indentation: IndentationConfig,
    errors: Vec<CompileError>,
}

impl<'a> Compiler<'a> {
    /// Compile one config; returns its fragment for the enclosing context
    /// (empty when the rule contributes nothing there)
    fn add_rule(&mut self, config: &RuleConfig, vars: &Variables, strict: bool, parents: &[usize]) -> String {
        let index = self.rules.len();
        match self.try_add_rule(index, config, vars, strict, parents) {
            Ok(source) => source,
            Err(error) => {
                self.debug.warn(&format!("[compiler] {}", error));
                self.errors.push(error);
                String::new()
            }
        }
    }

    fn try_add_rule(
        &mut self,
        index: usize,
        config: &RuleConfig,
        vars: &Variables,
        strict: bool,
        parents: &[usize],
    ) -> Result<String, CompileError> {
        let vars = vars.extend(config.variables.as_ref());
        let bypass = config.bypass_protection.unwrap_or(false);
        let shape = Shape::classify(config, &Fields::new(index, &vars))?;

        match shape {
            Shape::Docstring { marker } => {
                let begin = compile_checked(index, &marker, bypass)?;
                let mut rule = Rule::new(index, RuleShape::Docstring, config, parents);
                rule.begin = Some(begin);
                rule.nested = config.nested_flag().unwrap_or(true);
                self.rules.push(rule);

                Ok(wrap(Marker::Docstring, index, None, &marker))
            }
            Shape::Indentation { filter } => {
                self.set_indentation(index, config, filter, bypass, &vars, strict, parents)?;
                Ok(String::new())
            }
            Shape::BeginEnd { begin, middle, end } => {
                self.add_begin_end(index, config, &begin, middle.as_deref(), &end, bypass, &vars, strict, parents)
            }
            Shape::BeginContinuation { begin, continuation } => {
                let mut rule = Rule::new(index, RuleShape::BeginContinuation, config, parents);
                rule.begin = Some(compile_checked(index, &begin, bypass)?);
                rule.while_ = Some(compile_checked(index, &continuation, bypass)?);
                rule.continuation = true;
                self.rules.push(rule);

                Ok(wrap(Marker::Begin, index, None, &begin))
            }
            Shape::BeginWhile { begin, while_ } => {
                let mut rule = Rule::new(index, RuleShape::BeginWhile, config, parents);
                rule.begin = Some(compile_checked(index, &begin, bypass)?);
                rule.while_ = Some(compile_checked(index, &while_, bypass)?);
                self.rules.push(rule);

                Ok(wrap(Marker::Begin, index, None, &begin))
            }
            Shape::While { while_ } => {
                let mut rule = Rule::new(index, RuleShape::While, config, parents);
                rule.while_ = Some(compile_checked(index, &while_, bypass)?);
                self.rules.push(rule);

                Ok(wrap(Marker::While, index, None, &while_))
            }
            Shape::Separator { separator } => {
                self.add_separator(index, config, &separator, bypass, &vars, strict, parents)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add_begin_end(
        &mut self,
        index: usize,
        config: &RuleConfig,
        begin: &str,
        middle: Option<&str>,
        end: &str,
        bypass: bool,
        vars: &Variables,
        strict: bool,
        parents: &[usize],
    ) -> Result<String, CompileError> {
        let begin_regex = compile_checked(index, begin, bypass)?;
        let middle_regex = middle
            .map(|source| compile_checked(index, source, bypass))
            .transpose()?;

        let end_matcher = EndMatcher::parse(end);
        let (end_regex, end_groups) = match &end_matcher {
            Some(matcher) => {
                let available = capture_count(&begin_regex);
                if matcher.max_group() > available {
                    return Err(CompileError::InvalidBackReference {
                        rule: index,
                        group: matcher.max_group(),
                        available,
                    });
                }
                // an end made only of references matches the empty probe
                let probe = compile_checked(index, &matcher.probe(), true)?;
                (None, capture_count(&probe))
            }
            None => {
                let regex = compile_checked(index, end, bypass)?;
                let groups = capture_count(&regex);
                (Some(regex), groups)
            }
        };

        let mut rule = Rule::new(index, RuleShape::BeginEnd, config, parents);
        rule.begin = Some(begin_regex);
        rule.middle = middle_regex;
        rule.end = end_regex;
        rule.nested = config
            .nested_flag()
            .unwrap_or_else(|| config.nested_rules().is_none());
        rule.strict = match config.strict {
            Some(Strict::Flag(flag)) => flag,
            Some(Strict::Keyword(_)) => false,
            None => strict,
        };
        rule.consume_end = BranchPolicy::from_flag(config.consume_end.as_ref(), end_groups + 1);
        rule.fold_last_line = BranchPolicy::from_flag(config.fold_last_line.as_ref(), end_groups + 1);
        let has_matcher = end_matcher.is_some();
        rule.end_matcher = end_matcher;
        let nested = rule.nested;
        let loop_name = rule.loop_name();
        self.rules.push(rule);

        let mut source = wrap(Marker::Begin, index, None, begin);
        let mut loop_parts = Vec::new();
        if let Some(middle) = middle {
            loop_parts.push(wrap(Marker::Middle, index, None, middle));
        }
        if !has_matcher {
            loop_parts.push(wrap(Marker::End, index, None, end));
        }

        if nested {
            for part in loop_parts {
                source.push('|');
                source.push_str(&part);
            }
            return Ok(source);
        }

        if let Some(children) = config.nested_rules() {
            let mut chain = parents.to_vec();
            chain.push(index);
            let strict_parent = !config.is_strict_never() && strict;

            if !strict_parent {
                for child in children {
                    let fragment = self.add_rule(child, vars, false, &chain);
                    if !fragment.is_empty() {
                        source.push('|');
                        source.push_str(&fragment);
                    }
                }
            }

            for child in children {
                let fragment = self.add_rule(child, vars, strict_parent, &chain);
                if !fragment.is_empty() {
                    loop_parts.push(fragment);
                }
            }
        }

        if !loop_parts.is_empty() {
            let context = ScanContext::new(loop_name.clone(), &loop_parts.join("|")).map_err(|e| {
                CompileError::InvalidContext {
                    context: loop_name,
                    message: e.to_string(),
                }
            })?;
            self.rules[index].loop_context = Some(Arc::new(context));
        }

        Ok(source)
    }

    #[allow(clippy::too_many_arguments)]
    fn add_separator(
        &mut self,
        index: usize,
        config: &RuleConfig,
        separator: &str,
        bypass: bool,
        vars: &Variables,
        strict: bool,
        parents: &[usize],
    ) -> Result<String, CompileError> {
        let mut rule = Rule::new(index, RuleShape::Separator, config, parents);
        rule.begin = Some(compile_checked(index, separator, bypass)?);
        rule.fold_last_line = BranchPolicy::Constant(false);
        rule.fold_bof = config.fold_bof.unwrap_or(true);
        rule.fold_eof = config.fold_eof.unwrap_or(true);
        rule.nested = config.nested_flag().unwrap_or(true);
        rule.strict = match config.strict {
            Some(Strict::Flag(flag)) => flag,
            Some(Strict::Keyword(_)) => false,
            None => strict,
        };
        self.rules.push(rule);

        let mut source = wrap(Marker::Separator, index, None, separator);

        let children = config.descendants.as_deref().or_else(|| config.nested_rules());
        if let Some(children) = children {
            let mut chain = parents.to_vec();
            chain.push(index);
            let child_strict = !config.is_strict_never() && strict;

            for child in children {
                let fragment = self.add_rule(child, vars, child_strict, &chain);
                if !fragment.is_empty() {
                    source.push('|');
                    source.push_str(&fragment);
                }
            }
        }

        Ok(source)
    }

    #[allow(clippy::too_many_arguments)]
    fn set_indentation(
        &mut self,
        index: usize,
        config: &RuleConfig,
        filter: Option<String>,
        bypass: bool,
        vars: &Variables,
        strict: bool,
        parents: &[usize],
    ) -> Result<(), CompileError> {
        let filter = filter
            .map(|source| compile_checked(index, &source, bypass))
            .transpose()?;

        self.indentation.enabled = true;
        self.indentation.off_side = config.off_side.unwrap_or(false);
        self.indentation.filter = filter;

        if let Some(children) = config.nested_rules() {
            let fragments: Vec<String> = children
                .iter()
                .map(|child| self.add_rule(child, vars, strict, parents))
                .filter(|source| !source.is_empty())
                .collect();
            self.indentation.nested = self.build_context("indentation", &fragments);
        }

        Ok(())
    }

    fn build_context(&mut self, name: &str, fragments: &[String]) -> Option<Arc<ScanContext>> {
        if fragments.is_empty() {
            return None;
        }

        match ScanContext::new(name, &fragments.join("|")) {
            Ok(context) => Some(Arc::new(context)),
            Err(e) => {
                let error = CompileError::InvalidContext {
                    context: name.to_string(),
                    message: e.to_string(),
                };
                self.debug.warn(&format!("[compiler] {}", error));
                self.errors.push(error);
                None
            }
        }
    }
}
