//! User-authored folding rule configuration.
//!
//! The wire shape is the camelCase JSON/YAML object used by existing rule
//! sets. Every field is optional and a field holding a value of the wrong
//! type is ignored instead of failing the whole rule set.

mod file;

pub use file::{RuleSet, RulesFile};

use crate::models::FoldingKind;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One folding construct as written by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub begin: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub middle: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub continuation: Option<String>,
    #[serde(
        rename = "while",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub while_: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub begin_regex: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub middle_regex: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub end_regex: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub continuation_regex: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub while_regex: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub separator_regex: Option<String>,

    /// Nesting flag, or an explicit whitelist of constructs visible inside
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub nested: Option<Nested>,
    /// Separator whitelist
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub descendants: Option<Vec<RuleConfig>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub strict: Option<Strict>,

    #[serde(
        rename = "foldBOF",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub fold_bof: Option<bool>,
    #[serde(
        rename = "foldEOF",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub fold_eof: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub fold_last_line: Option<BranchFlag>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub consume_end: Option<BranchFlag>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub kind: Option<FoldingKind>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub auto_fold: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub bypass_protection: Option<bool>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub indentation: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub off_side: Option<bool>,

    /// Label of the private loop in trace output
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Values for `{{:name}}` / `{{!name}}` placeholders
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, String>>,
}

/// `nested`: a flag or a whitelist of rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nested {
    Flag(bool),
    Rules(Vec<RuleConfig>),
}

/// `strict`: a flag, or `"never"` to opt out of inherited strictness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Strict {
    Flag(bool),
    Keyword(StrictKeyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrictKeyword {
    Never,
}

/// `foldLastLine` / `consumeEnd`: one flag, or one per end-pattern branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BranchFlag {
    Single(bool),
    PerBranch(Vec<bool>),
}

impl RuleConfig {
    /// Whether `nested` holds an explicit whitelist
    pub fn nested_rules(&self) -> Option<&[RuleConfig]> {
        match &self.nested {
            Some(Nested::Rules(rules)) => Some(rules),
            _ => None,
        }
    }

    pub fn nested_flag(&self) -> Option<bool> {
        match self.nested {
            Some(Nested::Flag(flag)) => Some(flag),
            _ => None,
        }
    }

    pub fn is_strict_never(&self) -> bool {
        matches!(self.strict, Some(Strict::Keyword(StrictKeyword::Never)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Valid(T),
    Invalid(serde::de::IgnoredAny),
}

/// Deserialize an optional field, turning a value of the wrong type into `None`
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<Lenient<T>>::deserialize(deserializer)? {
        Some(Lenient::Valid(value)) => Some(value),
        Some(Lenient::Invalid(_)) | None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_begin_end() {
        let config: RuleConfig = serde_json::from_str(
            r#"{"beginRegex": "\\{", "endRegex": "\\}", "foldLastLine": false, "kind": "comment"}"#,
        )
        .unwrap();

        assert_eq!(config.begin_regex.as_deref(), Some("\\{"));
        assert_eq!(config.end_regex.as_deref(), Some("\\}"));
        assert_eq!(config.fold_last_line, Some(BranchFlag::Single(false)));
        assert_eq!(config.kind, Some(FoldingKind::Comment));
    }

    #[test]
    fn test_malformed_fields_are_ignored() {
        let config: RuleConfig = serde_json::from_str(
            r##"{"begin": "#region", "end": 42, "foldEOF": "yes", "kind": "banana", "strict": "sometimes"}"##,
        )
        .unwrap();

        assert_eq!(config.begin.as_deref(), Some("#region"));
        assert_eq!(config.end, None);
        assert_eq!(config.fold_eof, None);
        assert_eq!(config.kind, None);
        assert_eq!(config.strict, None);
    }

    #[test]
    fn test_nested_whitelist_and_strict_never() {
        let yaml = r#"
beginRegex: "^\\s*case"
endRegex: "^\\s*esac"
strict: never
nested:
  - separatorRegex: "^\\s*;;"
foldLastLine: [true, false]
"#;
        let config: RuleConfig = serde_yaml::from_str(yaml).unwrap();

        assert!(config.is_strict_never());
        assert_eq!(config.nested_rules().map(|rules| rules.len()), Some(1));
        assert_eq!(
            config.fold_last_line,
            Some(BranchFlag::PerBranch(vec![true, false]))
        );
    }

    #[test]
    fn test_while_keyword_and_variables() {
        let config: RuleConfig = serde_json::from_str(
            r#"{"while": "//", "variables": {"ws": "\\s*"}, "autoFold": true}"#,
        )
        .unwrap();

        assert_eq!(config.while_.as_deref(), Some("//"));
        assert_eq!(
            config.variables.as_ref().and_then(|v| v.get("ws")).map(String::as_str),
            Some("\\s*")
        );
        assert_eq!(config.auto_fold, Some(true));
    }
}
