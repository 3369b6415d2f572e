use super::RuleConfig;
use crate::config::ConfigError;
use crate::debug::DebugChannel;
use crate::engine::EngineOptions;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// A single rule or a list of rules
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RuleSet {
    Many(Vec<RuleConfig>),
    One(Box<RuleConfig>),
}

impl RuleSet {
    pub fn into_rules(self) -> Vec<RuleConfig> {
        match self {
            RuleSet::Many(rules) => rules,
            RuleSet::One(rule) => vec![*rule],
        }
    }
}

/// Contents of a rules file
///
/// ```yaml
/// rules:
///   - beginRegex: "\\{"
///     endRegex: "\\}"
/// perFiles:
///   "*.md":
///     separatorRegex: "^#+ "
/// variables:
///   ws: "\\s*"
/// tabSize: 4
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesFile {
    /// Rules of the default engine
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    /// Per-file routes, in declaration order
    #[serde(default, deserialize_with = "ordered_routes")]
    pub per_files: Vec<(String, Vec<RuleConfig>)>,
    /// Global variable table
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// Tab width used by the indentation fallback
    #[serde(default)]
    pub tab_size: Option<usize>,
    /// Enable the per-match trace
    #[serde(default)]
    pub debug: bool,
}

impl RulesFile {
    /// Load a rules file, picking the format from the extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "json" => Self::from_json(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            "toml" => Self::from_toml(&content),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    /// Engine options carrying this file's variables and tab size.
    /// `debug: true` in the file turns tracing on for `channel`.
    pub fn engine_options(&self, channel: DebugChannel) -> EngineOptions {
        let tracing = channel.is_tracing() || self.debug;
        let mut options = EngineOptions::new()
            .with_variables(self.variables.clone())
            .with_debug(channel.with_trace(tracing));

        if let Some(tab_size) = self.tab_size {
            options = options.with_tab_size(tab_size);
        }
        options
    }
}

/// Deserialize `perFiles` keeping the declaration order, skipping null entries
fn ordered_routes<'de, D>(deserializer: D) -> Result<Vec<(String, Vec<RuleConfig>)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct RoutesVisitor;

    impl<'de> Visitor<'de> for RoutesVisitor {
        type Value = Vec<(String, Vec<RuleConfig>)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of glob patterns to rules")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut routes = Vec::new();
            while let Some((pattern, rules)) = map.next_entry::<String, Option<RuleSet>>()? {
                if let Some(rules) = rules {
                    routes.push((pattern, rules.into_rules()));
                }
            }
            Ok(routes)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(RoutesVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_rules_file_keeps_route_order() {
        let yaml = r#"
rules:
  - beginRegex: "\\{"
    endRegex: "\\}"
perFiles:
  "*.md":
    separatorRegex: "^#+ "
  "docs/*.txt":
    - begin: "<<"
      end: ">>"
    - while: "> "
  "*.skip": ~
variables:
  ws: "\\s*"
tabSize: 2
"#;
        let file = RulesFile::from_yaml(yaml).unwrap();

        assert_eq!(file.rules.len(), 1);
        let patterns: Vec<&str> = file.per_files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(patterns, vec!["*.md", "docs/*.txt"]);
        assert_eq!(file.per_files[1].1.len(), 2);
        assert_eq!(file.variables.get("ws").map(String::as_str), Some("\\s*"));
        assert_eq!(file.tab_size, Some(2));
        assert!(!file.debug);
    }

    #[test]
    fn test_json_rules_file() {
        let json = r##"{"rules": [{"begin": "#region", "end": "#endregion"}], "debug": true}"##;
        let file = RulesFile::from_json(json).unwrap();

        assert_eq!(file.rules[0].begin.as_deref(), Some("#region"));
        assert!(file.per_files.is_empty());
        assert!(file.debug);
    }

    #[test]
    fn test_toml_rules_file() {
        let toml = r#"
tabSize = 8

[[rules]]
begin = "{{{"
end = "}}}"
"#;
        let file = RulesFile::from_toml(toml).unwrap();

        assert_eq!(file.rules[0].end.as_deref(), Some("}}}"));
        assert_eq!(file.tab_size, Some(8));
    }

    #[test]
    fn test_engine_options_from_file() {
        let file = RulesFile::from_yaml("variables:\n  ws: \" \"\ntabSize: 2\ndebug: true\n").unwrap();
        let options = file.engine_options(DebugChannel::default());

        assert_eq!(options.tab_size, 2);
        assert_eq!(options.variables.get("ws").map(String::as_str), Some(" "));
        assert!(options.debug.is_tracing());

        let quiet = RulesFile::default().engine_options(DebugChannel::default());
        assert_eq!(quiet.tab_size, 4);
        assert!(!quiet.debug.is_tracing());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.ini");
        std::fs::write(&path, "x").unwrap();

        assert!(matches!(
            RulesFile::load(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
