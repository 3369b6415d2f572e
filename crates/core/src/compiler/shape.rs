use super::variables::{FieldKind, Variables};
use super::CompileError;
use crate::rules::RuleConfig;

/// Classified rule configuration with its patterns resolved to regex source
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Shape {
    Docstring { marker: String },
    Indentation { filter: Option<String> },
    BeginEnd { begin: String, middle: Option<String>, end: String },
    BeginContinuation { begin: String, continuation: String },
    BeginWhile { begin: String, while_: String },
    While { while_: String },
    Separator { separator: String },
}

/// Resolves the regex/literal form of a field for one rule
pub(crate) struct Fields<'a> {
    rule: usize,
    vars: &'a Variables,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(rule: usize, vars: &'a Variables) -> Self {
        Self { rule, vars }
    }

    /// Regex source of a field; the regex form wins over the literal form
    pub(crate) fn pattern(
        &self,
        regex: Option<&str>,
        literal: Option<&str>,
    ) -> Result<Option<String>, CompileError> {
        if let Some(regex) = regex.filter(|s| !s.is_empty()) {
            return self
                .vars
                .substitute(self.rule, regex, FieldKind::Regex)
                .map(Some);
        }

        if let Some(literal) = literal.filter(|s| !s.is_empty()) {
            let text = self.vars.substitute(self.rule, literal, FieldKind::Literal)?;
            return Ok(Some(regex::escape(&text)));
        }

        Ok(None)
    }
}

impl Shape {
    pub(crate) fn classify(config: &RuleConfig, fields: &Fields<'_>) -> Result<Self, CompileError> {
        let begin = fields.pattern(config.begin_regex.as_deref(), config.begin.as_deref())?;

        if let Some(begin) = &begin {
            let same_marker = match config.begin_regex.as_deref().filter(|s| !s.is_empty()) {
                Some(regex) => config.end_regex.as_deref() == Some(regex),
                None => config.begin.is_some() && config.begin == config.end,
            };
            if same_marker {
                return Ok(Shape::Docstring {
                    marker: begin.clone(),
                });
            }
        }

        if config.indentation == Some(true) {
            return Ok(Shape::Indentation { filter: begin });
        }

        if let Some(begin) = begin {
            if let Some(end) = fields.pattern(config.end_regex.as_deref(), config.end.as_deref())? {
                let middle = fields.pattern(config.middle_regex.as_deref(), config.middle.as_deref())?;
                return Ok(Shape::BeginEnd { begin, middle, end });
            }

            if let Some(continuation) = fields.pattern(
                config.continuation_regex.as_deref(),
                config.continuation.as_deref(),
            )? {
                return Ok(Shape::BeginContinuation {
                    begin,
                    continuation: format!("(?:{})$", continuation),
                });
            }

            if let Some(while_) = fields.pattern(config.while_regex.as_deref(), config.while_.as_deref())? {
                return Ok(Shape::BeginWhile { begin, while_ });
            }

            return Err(CompileError::UnsupportedShape {
                rule: fields.rule,
                reason: "`begin` needs an `end`, `continuation` or `while` pattern".to_string(),
            });
        }

        if let Some(while_) = fields.pattern(config.while_regex.as_deref(), config.while_.as_deref())? {
            return Ok(Shape::While { while_ });
        }

        if let Some(separator) =
            fields.pattern(config.separator_regex.as_deref(), config.separator.as_deref())?
        {
            return Ok(Shape::Separator { separator });
        }

        Err(CompileError::UnsupportedShape {
            rule: fields.rule,
            reason: "no `begin`, `while` or `separator` pattern".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classify(json: &str) -> Result<Shape, CompileError> {
        let config: RuleConfig = serde_json::from_str(json).unwrap();
        let vars = Variables::default();
        Shape::classify(&config, &Fields::new(0, &vars))
    }

    #[test]
    fn test_docstring_wins() {
        assert_eq!(
            classify(r#"{"begin": "\"\"\"", "end": "\"\"\""}"#).unwrap(),
            Shape::Docstring {
                marker: "\"\"\"".to_string()
            }
        );
        assert_eq!(
            classify(r#"{"beginRegex": "^---$", "endRegex": "^---$"}"#).unwrap(),
            Shape::Docstring {
                marker: "^---$".to_string()
            }
        );
    }

    #[test]
    fn test_literal_patterns_are_escaped() {
        assert_eq!(
            classify(r#"{"begin": "{{{", "end": "}}}"}"#).unwrap(),
            Shape::BeginEnd {
                begin: "\\{\\{\\{".to_string(),
                middle: None,
                end: "\\}\\}\\}".to_string()
            }
        );
    }

    #[test]
    fn test_end_beats_continuation_and_while() {
        let shape = classify(r#"{"begin": "a", "end": "b", "continuation": "c", "while": "d"}"#).unwrap();
        assert!(matches!(shape, Shape::BeginEnd { .. }));

        let shape = classify(r#"{"begin": "a", "continuation": "\\", "while": "d"}"#).unwrap();
        assert_eq!(
            shape,
            Shape::BeginContinuation {
                begin: "a".to_string(),
                continuation: "(?:\\\\)$".to_string()
            }
        );

        let shape = classify(r#"{"beginRegex": "^#if", "whileRegex": "^#"}"#).unwrap();
        assert!(matches!(shape, Shape::BeginWhile { .. }));
    }

    #[test]
    fn test_indentation_before_begin_shapes() {
        let shape = classify(r#"{"indentation": true, "beginRegex": ":$", "endRegex": "x"}"#).unwrap();
        assert_eq!(
            shape,
            Shape::Indentation {
                filter: Some(":$".to_string())
            }
        );
    }

    #[test]
    fn test_unsupported_shapes() {
        assert!(matches!(
            classify(r#"{"begin": "a"}"#),
            Err(CompileError::UnsupportedShape { .. })
        ));
        assert!(matches!(
            classify(r#"{"kind": "comment"}"#),
            Err(CompileError::UnsupportedShape { .. })
        ));
        assert!(matches!(
            classify(r#"{"separatorRegex": "^# "}"#),
            Ok(Shape::Separator { .. })
        ));
    }
}
