//! Configuration for project scans.
//!
//! This module provides the scan configuration and the ignore filtering
//! logic that decides which files of a project tree are handed to the
//! folding router.

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported rules file format: {0}")]
    UnsupportedFormat(String),
}

/// Configuration for a project scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root directory to scan
    pub root: PathBuf,

    /// Only scan files matching one of these globs (empty = every file)
    pub include_patterns: Vec<String>,

    /// Custom ignore patterns
    pub ignore_patterns: Vec<String>,

    /// Path to custom ignore file
    pub ignore_file: Option<PathBuf>,

    /// Include dependency directories (node_modules, .venv, target, ...)
    pub include_deps: bool,

    /// Number of threads for parallel processing (0 = auto, 1 = sequential)
    pub threads: usize,

    /// Maximum file size to process (bytes)
    pub max_file_size: u64,

    /// Whether to follow symlinks
    pub follow_symlinks: bool,

    /// Whether to include hidden files
    pub include_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            include_patterns: Vec::new(),
            ignore_patterns: Vec::new(),
            ignore_file: None,
            include_deps: false,
            threads: 0,
            max_file_size: 10 * 1024 * 1024, // 10 MB
            follow_symlinks: false,
            include_hidden: false,
        }
    }
}

impl ScanConfig {
    /// Create new config with root directory
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    /// Set include patterns (builder pattern)
    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> Self {
        self.include_patterns = patterns;
        self
    }

    /// Set ignore patterns (builder pattern)
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Set ignore file path (builder pattern)
    pub fn with_ignore_file(mut self, path: PathBuf) -> Self {
        self.ignore_file = Some(path);
        self
    }

    /// Include dependency directories (builder pattern)
    pub fn with_include_deps(mut self, include: bool) -> Self {
        self.include_deps = include;
        self
    }

    /// Set number of threads (builder pattern)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set max file size (builder pattern)
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set follow symlinks (builder pattern)
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set include hidden files (builder pattern)
    pub fn with_include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }
}

const DEPENDENCY_PATTERNS: &[&str] = &[
    "**/node_modules/**",
    "**/.venv/**",
    "**/venv/**",
    "**/vendor/**",
    "**/target/**",
];

const DEFAULT_IGNORES: &[&str] = &[
    "**/.git/**",
    "**/__pycache__/**",
    "**/dist/**",
    "**/build/**",
    "**/.tox/**",
    "**/.pytest_cache/**",
    "**/.mypy_cache/**",
    "**/coverage/**",
    "**/*.min.js",
    "**/*.map",
    "**/*.lock",
    "**/*.png",
    "**/*.jpg",
    "**/*.gif",
    "**/*.ico",
    "**/*.pdf",
    "**/*.zip",
];

/// Filter for ignoring files and directories
pub struct IgnoreFilter {
    /// Gitignore rules
    gitignore: Option<Gitignore>,

    /// Custom glob patterns
    custom_globs: GlobSet,

    /// Default ignore patterns
    default_ignores: GlobSet,

    /// Files to keep (None = every file)
    includes: Option<GlobSet>,

    /// Whether to include hidden files
    include_hidden: bool,
}

impl IgnoreFilter {
    /// Create a new ignore filter from config
    pub fn new(config: &ScanConfig) -> Result<Self, ConfigError> {
        let gitignore = Self::build_gitignore(&config.root, config.ignore_file.as_deref());

        let custom_globs = Self::build_globset(&config.ignore_patterns)?;

        let mut default_patterns: Vec<String> =
            DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect();
        if !config.include_deps {
            default_patterns.extend(DEPENDENCY_PATTERNS.iter().map(|s| s.to_string()));
        }
        let default_ignores = Self::build_globset(&default_patterns)?;

        let includes = if config.include_patterns.is_empty() {
            None
        } else {
            let patterns: Vec<String> = config
                .include_patterns
                .iter()
                .map(|p| route_pattern(p))
                .collect();
            Some(Self::build_globset(&patterns)?)
        };

        Ok(Self {
            gitignore,
            custom_globs,
            default_ignores,
            includes,
            include_hidden: config.include_hidden,
        })
    }

    /// Build gitignore from root directory and an optional extra ignore file
    fn build_gitignore(root: &Path, extra: Option<&Path>) -> Option<Gitignore> {
        let gitignore_path = root.join(".gitignore");
        let mut builder = GitignoreBuilder::new(root);
        let mut any = false;

        if gitignore_path.exists() {
            any |= builder.add(&gitignore_path).is_none();
        }
        if let Some(extra) = extra {
            any |= builder.add(extra).is_none();
        }

        if !any {
            return None;
        }

        // Ignore gitignore errors
        builder.build().ok()
    }

    /// Build a globset from patterns
    fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidGlob(e.to_string()))?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| ConfigError::InvalidGlob(e.to_string()))
    }

    /// Check if a path should be ignored
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        let path_str = path.to_string_lossy();

        // Check hidden files
        if !self.include_hidden {
            if let Some(name) = path.file_name() {
                let name = name.to_string_lossy();
                if name.starts_with('.') && name != "." && name != ".." {
                    return true;
                }
            }
        }

        if self.default_ignores.is_match(&*path_str) {
            return true;
        }

        if self.custom_globs.is_match(&*path_str) {
            return true;
        }

        if let Some(ref gi) = self.gitignore {
            if gi.matched(path, is_dir).is_ignore() {
                return true;
            }
        }

        false
    }

    /// Check if a file passes the include globs
    pub fn is_included(&self, path: &Path) -> bool {
        match &self.includes {
            Some(includes) => includes.is_match(path),
            None => true,
        }
    }
}

/// Anchor a glob without a directory part so it matches at any depth
pub fn route_pattern(pattern: &str) -> String {
    if pattern.contains('/') || pattern.contains('\\') {
        pattern.to_string()
    } else {
        format!("**/{}", pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::new(PathBuf::from("/test"))
            .with_threads(4)
            .with_include_patterns(vec!["*.py".to_string()])
            .with_max_file_size(1024);

        assert_eq!(config.threads, 4);
        assert_eq!(config.include_patterns.len(), 1);
        assert_eq!(config.max_file_size, 1024);
    }

    #[test]
    fn test_include_filter() {
        let config = ScanConfig::new(PathBuf::from("."))
            .with_include_patterns(vec!["*.py".to_string(), "docs/*.md".to_string()]);
        let filter = IgnoreFilter::new(&config).unwrap();

        assert!(filter.is_included(Path::new("src/pkg/test.py")));
        assert!(filter.is_included(Path::new("docs/readme.md")));
        assert!(!filter.is_included(Path::new("src/test.js")));
    }

    #[test]
    fn test_default_ignores() {
        let config = ScanConfig::new(PathBuf::from("."));
        let filter = IgnoreFilter::new(&config).unwrap();

        assert!(filter.should_ignore(Path::new("app/node_modules/x/index.js"), false));
        assert!(filter.should_ignore(Path::new("app/.env"), false));
        assert!(!filter.should_ignore(Path::new("app/src/main.rs"), false));

        let with_deps = ScanConfig::new(PathBuf::from(".")).with_include_deps(true);
        let filter = IgnoreFilter::new(&with_deps).unwrap();
        assert!(!filter.should_ignore(Path::new("app/node_modules/x/index.js"), false));
    }

    #[test]
    fn test_route_pattern() {
        assert_eq!(route_pattern("*.md"), "**/*.md");
        assert_eq!(route_pattern("docs/*.md"), "docs/*.md");
    }
}
