//! Explicit Folding Core Library
//!
//! Computes folding ranges from user-declared rules instead of syntax trees.
//! Rules describe regions with regular expressions (begin/end pairs,
//! continuation lines, while-runs, separators, docstrings) and are compiled
//! once into combined scan contexts; a line scanner then walks each document
//! and emits region and comment ranges.
//!
//! # Features
//!
//! - Rule compiler with `{{:var}}` / `{{!var}}` substitution and end patterns
//!   that refer back to the begin captures
//! - Nested and private-loop rules, middle markers, separators, docstrings
//! - Indentation fallback, optionally swept with nested rules
//! - Per-file routing with globs and a per-language rule hub
//! - Project scan with gitignore support, output in JSON, YAML or a summary
//!
//! # Example
//!
//! ```no_run
//! use exfold_core::{format_output, FoldScanner, OutputFormat, Router, RulesFile, ScanConfig};
//! use exfold_core::debug::DebugChannel;
//! use std::path::{Path, PathBuf};
//!
//! let rules = RulesFile::load(Path::new("folding.yaml")).unwrap();
//! let router = Router::from_rules_file(&rules, rules.engine_options(DebugChannel::default()));
//!
//! let scanner = FoldScanner::new(ScanConfig::new(PathBuf::from(".")), router).unwrap();
//! let fold_map = scanner.scan().unwrap();
//!
//! println!("{}", format_output(&fold_map, OutputFormat::Summary).unwrap());
//! ```

pub mod compiler;
pub mod config;
pub mod debug;
pub mod document;
pub mod engine;
pub mod hub;
pub mod models;
pub mod output;
pub mod rules;

// Re-exports for convenience
pub use compiler::CompileError;
pub use config::ScanConfig;
pub use document::{Document, TextDocument};
pub use engine::{
    render_file, render_file_ansi, EngineOptions, FoldScanner, FoldingEngine, Renderer, Router, ScanError,
};
pub use hub::FoldingHub;
pub use models::*;
pub use output::{format_file, format_output, format_summary, FormatError, OutputFormat};
pub use rules::{RuleConfig, RulesFile};
