use super::Router;
use crate::config::{IgnoreFilter, ScanConfig};
use crate::document::{Document, TextDocument};
use crate::models::{FoldMap, FoldStats, ScanMetadata, SourceFile};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProjectScanError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
    #[error("File too large: {path} ({size} bytes)")]
    FileTooLarge { path: PathBuf, size: u64 },
}

/// Runs the folding router over every file of a project
pub struct FoldScanner {
    config: ScanConfig,
    ignore_filter: IgnoreFilter,
    router: Router,
}

impl FoldScanner {
    pub fn new(config: ScanConfig, router: Router) -> Result<Self, ProjectScanError> {
        let ignore_filter = IgnoreFilter::new(&config)?;
        Ok(Self {
            config,
            ignore_filter,
            router,
        })
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Scan the project and return the fold map
    pub fn scan(&self) -> Result<FoldMap, ProjectScanError> {
        let start = Instant::now();

        let paths = self.find_files();
        tracing::debug!(count = paths.len(), "files selected for scan");

        let files: Vec<SourceFile> = if self.config.threads == 1 {
            paths.iter().map(|path| self.process_file(path)).collect()
        } else {
            let pool = if self.config.threads > 0 {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.threads)
                    .build()
                    .ok()
            } else {
                None
            };

            match pool {
                Some(pool) => pool.install(|| paths.par_iter().map(|path| self.process_file(path)).collect()),
                None => paths.par_iter().map(|path| self.process_file(path)).collect(),
            }
        };

        let stats = calculate_stats(&files);

        let duration = start.elapsed();
        let metadata = ScanMetadata {
            scan_duration_ms: duration.as_millis() as u64,
            files_per_second: if duration.as_secs_f64() > 0.0 {
                files.len() as f64 / duration.as_secs_f64()
            } else {
                0.0
            },
            ..ScanMetadata::default()
        };

        Ok(FoldMap {
            root: self.config.root.clone(),
            files,
            stats,
            metadata,
        })
    }

    /// Scan a single file, bypassing the ignore and include filters
    pub fn scan_file(&self, path: &Path) -> Result<SourceFile, ProjectScanError> {
        let size = fs::metadata(path)?.len();
        if size > self.config.max_file_size {
            return Err(ProjectScanError::FileTooLarge {
                path: path.to_path_buf(),
                size,
            });
        }

        let document = TextDocument::open(path)?;
        Ok(self.fold_document(path, &document))
    }

    /// Collect the files to scan, sorted for a stable output order
    fn find_files(&self) -> Vec<PathBuf> {
        let filter = &self.ignore_filter;
        let root = &self.config.root;

        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !filter.should_ignore(entry.path(), entry.file_type().is_dir())
            })
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                filter.is_included(relative)
            })
            .filter(|entry| {
                entry
                    .metadata()
                    .map(|m| m.len() <= self.config.max_file_size)
                    .unwrap_or(false)
            })
            .map(|entry| entry.into_path())
            .collect();

        files.sort();
        files
    }

    /// Read and fold one file; read failures are recorded on the result
    fn process_file(&self, path: &Path) -> SourceFile {
        match TextDocument::open(path) {
            Ok(document) => self.fold_document(path, &document),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read file");
                SourceFile {
                    path: self.relative(path),
                    absolute_path: path.to_path_buf(),
                    route: String::new(),
                    ranges: Vec::new(),
                    auto_fold_lines: Vec::new(),
                    line_count: 0,
                    parsed: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn fold_document(&self, path: &Path, document: &TextDocument) -> SourceFile {
        let relative = self.relative(path);
        let (route, engine) = self.router.route_for(Some(&relative));
        let outcome = engine.provide_folding_ranges(document);

        SourceFile {
            path: relative.clone(),
            absolute_path: path.to_path_buf(),
            route: route.to_string(),
            ranges: outcome.ranges,
            auto_fold_lines: outcome.auto_fold_lines,
            line_count: document.line_count(),
            parsed: true,
            error: None,
        }
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.config.root)
            .unwrap_or(path)
            .to_path_buf()
    }
}

/// Calculate fold statistics
fn calculate_stats(files: &[SourceFile]) -> FoldStats {
    let mut stats = FoldStats {
        total_files: files.len(),
        ..FoldStats::default()
    };

    for file in files {
        if !file.parsed {
            stats.failed_files += 1;
        }
        stats.total_lines += file.line_count;
        stats.auto_fold_lines += file.auto_fold_lines.len();

        for range in &file.ranges {
            stats.add_range(range);
        }
    }

    stats
}
