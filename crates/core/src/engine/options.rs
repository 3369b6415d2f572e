use crate::debug::DebugChannel;
use std::collections::BTreeMap;

/// Options shared by every document an engine scans
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Tab width used by the indentation fallback
    pub tab_size: usize,
    /// Global `{{:name}}` / `{{!name}}` table
    pub variables: BTreeMap<String, String>,
    /// Receiver of compile errors and the per-match trace
    pub debug: DebugChannel,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tab_size: 4,
            variables: BTreeMap::new(),
            debug: DebugChannel::default(),
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set tab width (builder pattern)
    pub fn with_tab_size(mut self, tab_size: usize) -> Self {
        self.tab_size = tab_size.max(1);
        self
    }

    /// Set the variable table (builder pattern)
    pub fn with_variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    /// Add one variable (builder pattern)
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Set debug channel (builder pattern)
    pub fn with_debug(mut self, debug: DebugChannel) -> Self {
        self.debug = debug;
        self
    }
}
