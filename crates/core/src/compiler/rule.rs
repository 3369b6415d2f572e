use super::context::ScanContext;
use super::pattern::EndMatcher;
use crate::models::FoldingKind;
use crate::rules::{BranchFlag, RuleConfig};
use fancy_regex::{Captures, Regex};
use std::sync::Arc;

/// Shape of a compiled rule, resolved once by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleShape {
    Docstring,
    BeginEnd,
    BeginContinuation,
    BeginWhile,
    While,
    Separator,
}

impl RuleShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleShape::Docstring => "docstring",
            RuleShape::BeginEnd => "begin-end",
            RuleShape::BeginContinuation => "begin-continuation",
            RuleShape::BeginWhile => "begin-while",
            RuleShape::While => "while",
            RuleShape::Separator => "separator",
        }
    }
}

/// `foldLastLine` / `consumeEnd` after compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchPolicy {
    Constant(bool),
    /// `[whole, branch1, branch2, ...]`, one entry per capture group of the
    /// end pattern plus one for the pattern as a whole
    PerBranch(Vec<bool>),
}

impl BranchPolicy {
    pub(crate) fn from_flag(flag: Option<&BranchFlag>, expected: usize) -> Self {
        match flag {
            Some(BranchFlag::Single(value)) => BranchPolicy::Constant(*value),
            Some(BranchFlag::PerBranch(values)) if values.len() == expected => {
                BranchPolicy::PerBranch(values.clone())
            }
            _ => BranchPolicy::Constant(true),
        }
    }

    /// Evaluate against an end match whose marker group is `group`; the first
    /// participating branch group decides
    pub fn evaluate(&self, matched: Option<(&Captures<'_>, usize)>) -> bool {
        match self {
            BranchPolicy::Constant(value) => *value,
            BranchPolicy::PerBranch(values) => {
                if let Some((captures, group)) = matched {
                    for (k, value) in values.iter().enumerate().skip(1) {
                        if captures.get(group + k).is_some() {
                            return *value;
                        }
                    }
                }
                values.first().copied().unwrap_or(true)
            }
        }
    }
}

/// A compiled folding rule. `index` is its position in the engine's rule list
/// and its only identity.
#[derive(Debug)]
pub struct Rule {
    pub index: usize,
    pub name: Option<String>,
    pub shape: RuleShape,
    pub begin: Option<Regex>,
    pub middle: Option<Regex>,
    /// Absent when the end pattern depends on begin captures
    pub end: Option<Regex>,
    pub while_: Option<Regex>,
    pub continuation: bool,
    pub consume_end: BranchPolicy,
    pub fold_last_line: BranchPolicy,
    pub fold_bof: bool,
    pub fold_eof: bool,
    pub nested: bool,
    pub strict: bool,
    pub auto_fold: bool,
    pub kind: FoldingKind,
    pub end_matcher: Option<EndMatcher>,
    /// Private context of a non-nested rule (middle, end and whitelisted children)
    pub loop_context: Option<Arc<ScanContext>>,
    /// Ancestor chain of a rule compiled inside a whitelist, outermost first
    pub parents: Vec<usize>,
}

impl Rule {
    pub(crate) fn new(index: usize, shape: RuleShape, config: &RuleConfig, parents: &[usize]) -> Self {
        let fold_last_line = match &config.fold_last_line {
            Some(BranchFlag::Single(value)) => BranchPolicy::Constant(*value),
            _ => BranchPolicy::Constant(true),
        };

        Self {
            index,
            name: config.name.clone(),
            shape,
            begin: None,
            middle: None,
            end: None,
            while_: None,
            continuation: false,
            consume_end: BranchPolicy::Constant(true),
            fold_last_line,
            fold_bof: false,
            fold_eof: config.fold_eof.unwrap_or(false),
            nested: false,
            strict: false,
            auto_fold: config.auto_fold.unwrap_or(false),
            kind: config.kind.unwrap_or_default(),
            end_matcher: None,
            loop_context: None,
            parents: parents.to_vec(),
        }
    }

    /// Label of the private loop in trace output
    pub fn loop_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("loop={}", self.index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_branch_policy() {
        let end = Regex::new("(?P<_2_0>(end)|(fi))").unwrap();
        let policy = BranchPolicy::PerBranch(vec![true, false, true]);

        let caps = end.captures("end").unwrap().unwrap();
        assert!(!policy.evaluate(Some((&caps, 1))));

        let caps = end.captures("fi").unwrap().unwrap();
        assert!(policy.evaluate(Some((&caps, 1))));

        assert!(policy.evaluate(None));
    }

    #[test]
    fn test_branch_flag_length_must_match() {
        let flag = BranchFlag::PerBranch(vec![false, true]);
        assert_eq!(
            BranchPolicy::from_flag(Some(&flag), 3),
            BranchPolicy::Constant(true)
        );
        assert_eq!(
            BranchPolicy::from_flag(Some(&flag), 2),
            BranchPolicy::PerBranch(vec![false, true])
        );
        assert_eq!(
            BranchPolicy::from_flag(Some(&BranchFlag::Single(false)), 2),
            BranchPolicy::Constant(false)
        );
    }
}
