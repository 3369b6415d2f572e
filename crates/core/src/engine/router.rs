use super::{EngineOptions, FoldingEngine};
use crate::config::route_pattern;
use crate::document::Document;
use crate::models::FoldingOutcome;
use crate::rules::{RuleConfig, RulesFile};
use globset::{Glob, GlobMatcher};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("Invalid route glob `{pattern}`: {message}")]
    InvalidGlob { pattern: String, message: String },
}

struct Route {
    label: String,
    matcher: GlobMatcher,
    engine: FoldingEngine,
}

/// Dispatches a document to the first engine whose glob matches its path,
/// else to the default engine
pub struct Router {
    routes: Vec<Route>,
    default: FoldingEngine,
}

impl Router {
    pub fn new(default: FoldingEngine) -> Self {
        Self {
            routes: Vec::new(),
            default,
        }
    }

    /// Build the default engine and one engine per `perFiles` entry
    pub fn from_rules_file(file: &RulesFile, options: EngineOptions) -> Self {
        let mut router = Self::new(FoldingEngine::new(&file.rules, options.clone()));
        router.add_routes(&file.per_files, &options);
        router
    }

    /// Compile one engine per `(glob, rules)` entry, in order. Routes with an
    /// invalid glob are reported and skipped.
    pub fn add_routes(&mut self, per_files: &[(String, Vec<RuleConfig>)], options: &EngineOptions) {
        for (pattern, rules) in per_files {
            let engine = FoldingEngine::new(rules, options.clone());
            if let Err(error) = self.add_route(pattern, engine) {
                options.debug.warn(&format!("[router] {}", error));
            }
        }
    }

    /// Append a route; a glob without a directory part matches at any depth
    pub fn add_route(&mut self, pattern: &str, engine: FoldingEngine) -> Result<(), RouteError> {
        let anchored = route_pattern(pattern);
        let glob = Glob::new(&anchored).map_err(|e| RouteError::InvalidGlob {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        self.routes.push(Route {
            label: pattern.to_string(),
            matcher: glob.compile_matcher(),
            engine,
        });

        Ok(())
    }

    /// Label and engine for `path` ("main" for the default engine)
    pub fn route_for(&self, path: Option<&Path>) -> (&str, &FoldingEngine) {
        if let Some(path) = path {
            if let Some(route) = self.routes.iter().find(|route| route.matcher.is_match(path)) {
                return (route.label.as_str(), &route.engine);
            }
        }

        ("main", &self.default)
    }

    pub fn provide_folding_ranges(&self, document: &dyn Document) -> FoldingOutcome {
        let (label, engine) = self.route_for(document.path());
        tracing::debug!(route = label, "routing document");
        engine.provide_folding_ranges(document)
    }

    /// Every engine with its label, default first
    pub fn engines(&self) -> impl Iterator<Item = (&str, &FoldingEngine)> {
        std::iter::once(("main", &self.default))
            .chain(self.routes.iter().map(|route| (route.label.as_str(), &route.engine)))
    }
}
