//! Per-language rule registry.
//!
//! Other components register the rules of a language; the owner of the hub
//! is told about every change through the setup callback and rebuilds its
//! engines from [`FoldingHub::build_router`].

use crate::engine::{EngineOptions, FoldingEngine, Router};
use crate::rules::RuleConfig;
use std::collections::BTreeMap;
use std::fmt;

type SetupFn = Box<dyn Fn(&str) + Send + Sync>;

/// Registry of rules keyed by language id
pub struct FoldingHub {
    per_languages: BTreeMap<String, Vec<RuleConfig>>,
    setup: SetupFn,
}

impl fmt::Debug for FoldingHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FoldingHub")
            .field("languages", &self.per_languages.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for FoldingHub {
    fn default() -> Self {
        Self::new(|_| {})
    }
}

impl FoldingHub {
    /// `setup` runs after every registration change with the language id
    pub fn new<F>(setup: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            per_languages: BTreeMap::new(),
            setup: Box::new(setup),
        }
    }

    /// Replace the rules of `language`
    pub fn register_folding_rules(&mut self, language: &str, rules: Vec<RuleConfig>) {
        tracing::debug!(language, count = rules.len(), "registering folding rules");
        self.per_languages.insert(language.to_string(), rules);
        (self.setup)(language);
    }

    pub fn unregister_folding_rules(&mut self, language: &str) {
        tracing::debug!(language, "unregistering folding rules");
        self.per_languages.remove(language);
        (self.setup)(language);
    }

    pub fn get_rules(&self, language: &str) -> Option<&[RuleConfig]> {
        self.per_languages.get(language).map(Vec::as_slice)
    }

    pub fn has_rules(&self, language: &str) -> bool {
        self.per_languages.contains_key(language)
    }

    /// Registered language ids, sorted
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.per_languages.keys().map(String::as_str)
    }

    /// Engine for the rules of `language`; an unregistered language gets an
    /// engine without rules
    pub fn build_engine(&self, language: &str, options: EngineOptions) -> FoldingEngine {
        FoldingEngine::new(self.get_rules(language).unwrap_or_default(), options)
    }

    /// Router whose default engine uses the rules of `language`, with one
    /// route per `per_files` entry
    pub fn build_router(
        &self,
        language: &str,
        per_files: &[(String, Vec<RuleConfig>)],
        options: EngineOptions,
    ) -> Router {
        let mut router = Router::new(self.build_engine(language, options.clone()));
        router.add_routes(per_files, &options);
        router
    }
}
