//! `{{:name}}` / `{{!name}}` placeholder substitution.

use super::CompileError;
use std::collections::BTreeMap;

/// Where a pattern string is used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    /// `beginRegex`, `endRegex`, ...: the value is regex source
    Regex,
    /// `begin`, `end`, ...: the value is matched literally
    Literal,
}

/// Variable table visible to one rule (globals overlaid by ancestors' tables)
#[derive(Debug, Clone, Default)]
pub(crate) struct Variables {
    values: BTreeMap<String, String>,
}

impl Variables {
    pub(crate) fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Table for a rule declaring its own `variables`
    pub(crate) fn extend(&self, local: Option<&BTreeMap<String, String>>) -> Self {
        let Some(local) = local else {
            return self.clone();
        };

        let mut values = self.values.clone();
        values.extend(local.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { values }
    }

    /// Replace every placeholder of `pattern`
    pub(crate) fn substitute(
        &self,
        rule: usize,
        pattern: &str,
        kind: FieldKind,
    ) -> Result<String, CompileError> {
        let mut out = String::with_capacity(pattern.len());
        let mut rest = pattern;

        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            let mode = after.chars().next();
            let close = after.find("}}");

            let (Some(mode @ (':' | '!')), Some(close)) = (mode, close) else {
                out.push_str(&rest[..start + 2]);
                rest = after;
                continue;
            };

            let name = &after[1..close];
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
                out.push_str(&rest[..start + 2]);
                rest = after;
                continue;
            }

            let value = self
                .values
                .get(name)
                .ok_or_else(|| CompileError::UnknownVariable {
                    rule,
                    name: name.to_string(),
                })?;

            out.push_str(&rest[..start]);
            match (mode, kind) {
                (':', FieldKind::Regex) => out.push_str(&regex::escape(value)),
                (':', FieldKind::Literal) => out.push_str(value),
                (_, FieldKind::Regex) => out.push_str(value),
                (_, FieldKind::Literal) => {
                    return Err(CompileError::RawVariableInLiteral {
                        rule,
                        name: name.to_string(),
                    })
                }
            }
            rest = &after[close + 2..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Variables {
        let mut values = BTreeMap::new();
        values.insert("op".to_string(), "a.b".to_string());
        values.insert("ws".to_string(), "\\s*".to_string());
        Variables::new(values)
    }

    #[test]
    fn test_escaped_and_raw_in_regex() {
        let vars = table();
        let out = vars
            .substitute(0, "^{{!ws}}{{:op}}$", FieldKind::Regex)
            .unwrap();
        assert_eq!(out, "^\\s*a\\.b$");
    }

    #[test]
    fn test_literal_field() {
        let vars = table();
        assert_eq!(
            vars.substitute(0, "<{{:op}}>", FieldKind::Literal).unwrap(),
            "<a.b>"
        );
        assert_eq!(
            vars.substitute(3, "{{!ws}}", FieldKind::Literal),
            Err(CompileError::RawVariableInLiteral {
                rule: 3,
                name: "ws".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_variable() {
        let vars = table();
        assert_eq!(
            vars.substitute(1, "{{:missing}}", FieldKind::Regex),
            Err(CompileError::UnknownVariable {
                rule: 1,
                name: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_non_placeholders_are_kept() {
        let vars = table();
        assert_eq!(
            vars.substitute(0, "{{{ x{2,3} {{ }}", FieldKind::Regex).unwrap(),
            "{{{ x{2,3} {{ }}"
        );
    }

    #[test]
    fn test_local_table_overrides() {
        let mut local = BTreeMap::new();
        local.insert("op".to_string(), "::".to_string());
        let vars = table().extend(Some(&local));
        assert_eq!(
            vars.substitute(0, "{{:op}}", FieldKind::Literal).unwrap(),
            "::"
        );
    }
}
