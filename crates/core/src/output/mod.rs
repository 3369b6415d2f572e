mod json;
mod yaml;

pub use json::to_json;
pub use yaml::to_yaml;

use crate::models::{FoldMap, SourceFile};
use std::collections::BTreeMap;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Summary,
    Ansi,
}

/// Format a FoldMap according to the specified format
pub fn format_output(fold_map: &FoldMap, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => to_json(fold_map),
        OutputFormat::Yaml => to_yaml(fold_map),
        OutputFormat::Summary => Ok(format_summary(fold_map)),
        OutputFormat::Ansi => Ok(format_summary_ansi(fold_map)),
    }
}

/// Format the ranges of a single file
pub fn format_file(file: &SourceFile, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => to_json(file),
        OutputFormat::Yaml => to_yaml(file),
        OutputFormat::Summary | OutputFormat::Ansi => {
            let ansi = format == OutputFormat::Ansi;
            let (dim, reset) = if ansi { ("\x1b[2m", "\x1b[0m") } else { ("", "") };

            let mut output = format!(
                "{} ({} lines, route: {})\n",
                file.path.display(),
                file.line_count,
                file.route
            );
            for range in &file.ranges {
                let auto = if file.auto_fold_lines.contains(&range.start) {
                    " [auto]"
                } else {
                    ""
                };
                output.push_str(&format!(
                    "  {}{:>5}-{:<5}{} {}{}\n",
                    dim,
                    range.start + 1,
                    range.end + 1,
                    reset,
                    range.kind.as_str(),
                    auto
                ));
            }
            Ok(output)
        }
    }
}

/// Number of files handled by each route
fn files_per_route(fold_map: &FoldMap) -> BTreeMap<&str, usize> {
    let mut routes = BTreeMap::new();
    for file in &fold_map.files {
        *routes.entry(file.route.as_str()).or_insert(0) += 1;
    }
    routes
}

fn foldable_percent(fold_map: &FoldMap) -> f64 {
    if fold_map.stats.total_lines > 0 {
        (fold_map.stats.foldable_lines as f64 / fold_map.stats.total_lines as f64) * 100.0
    } else {
        0.0
    }
}

/// Generate a human-readable summary
pub fn format_summary(fold_map: &FoldMap) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Fold Analysis Summary\n\
         =====================\n\
         Root: {}\n\n",
        fold_map.root.display()
    ));

    output.push_str(&format!(
        "Files Scanned: {} (unreadable: {})\n",
        fold_map.stats.total_files, fold_map.stats.failed_files
    ));
    for (route, count) in files_per_route(fold_map) {
        if !route.is_empty() {
            output.push_str(&format!("- {}: {}\n", route, count));
        }
    }
    output.push('\n');

    output.push_str(&format!(
        "Total Lines: {} | Foldable Lines: {} ({:.1}%)\n\n",
        fold_map.stats.total_lines,
        fold_map.stats.foldable_lines,
        foldable_percent(fold_map)
    ));

    output.push_str(&format!(
        "Total Folds: {}\n\
         - Regions: {}\n\
         - Comments: {}\n\
         - Auto-fold: {}\n\n",
        fold_map.stats.total_folds,
        fold_map.stats.region_folds,
        fold_map.stats.comment_folds,
        fold_map.stats.auto_fold_lines
    ));

    let mut files_by_folds: Vec<&SourceFile> = fold_map
        .files
        .iter()
        .filter(|f| !f.ranges.is_empty())
        .collect();
    files_by_folds.sort_by(|a, b| b.ranges.len().cmp(&a.ranges.len()));

    if !files_by_folds.is_empty() {
        output.push_str("Top files by folds:\n");
        for file in files_by_folds.iter().take(5) {
            output.push_str(&format!(
                "  {} ({} folds, {} lines)\n",
                file.path.display(),
                file.ranges.len(),
                file.line_count
            ));
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "Scan Duration: {}ms ({:.2} files/sec)\n\
         Timestamp: {}\n\
         Tool Version: {}\n",
        fold_map.metadata.scan_duration_ms,
        fold_map.metadata.files_per_second,
        fold_map.metadata.timestamp,
        fold_map.metadata.tool_version
    ));

    output
}

fn format_summary_ansi(fold_map: &FoldMap) -> String {
    let mut output = String::new();

    let bold = "\x1b[1m";
    let reset = "\x1b[0m";
    let cyan = "\x1b[36m";
    let yellow = "\x1b[33m";
    let dim = "\x1b[2m";

    output.push_str(&format!(
        "{}{}Fold Analysis Summary{}\n\
         {}====================={}\n\
         {}Root:{} {}\n\n",
        bold, cyan, reset, cyan, reset, dim, reset,
        fold_map.root.display()
    ));

    let routes: Vec<String> = files_per_route(fold_map)
        .into_iter()
        .filter(|(route, _)| !route.is_empty())
        .map(|(route, count)| format!("{}: {}", route, count))
        .collect();
    output.push_str(&format!(
        "{}Files Scanned:{} {} ({})\n\n",
        dim, reset,
        fold_map.stats.total_files,
        routes.join(", ")
    ));

    output.push_str(&format!(
        "{}Total Lines:{} {} | {}Foldable:{} {} ({:.1}%)\n\n",
        dim, reset,
        fold_map.stats.total_lines,
        dim, reset,
        fold_map.stats.foldable_lines,
        foldable_percent(fold_map)
    ));

    output.push_str(&format!(
        "{}Total Folds:{} {}\n\
         {}  Regions:{} {} | {}Comments:{} {} | {}Auto-fold:{} {}\n\n",
        dim, reset, fold_map.stats.total_folds,
        dim, reset, fold_map.stats.region_folds,
        dim, reset, fold_map.stats.comment_folds,
        dim, reset, fold_map.stats.auto_fold_lines
    ));

    let mut files_by_folds: Vec<&SourceFile> = fold_map
        .files
        .iter()
        .filter(|f| !f.ranges.is_empty())
        .collect();
    files_by_folds.sort_by(|a, b| b.ranges.len().cmp(&a.ranges.len()));

    if !files_by_folds.is_empty() {
        output.push_str(&format!("{}Top files by folds:{}\n", dim, reset));
        for file in files_by_folds.iter().take(5) {
            output.push_str(&format!(
                "  {}{}{} ({}{} folds{}, {} lines)\n",
                yellow,
                file.path.display(),
                reset,
                cyan,
                file.ranges.len(),
                reset,
                file.line_count
            ));
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "{}Scan:{} {}ms ({:.2} files/sec)\n",
        dim, reset,
        fold_map.metadata.scan_duration_ms,
        fold_map.metadata.files_per_second,
    ));

    output
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML serialization error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FoldStats, FoldingKind, FoldingRange, ScanMetadata};
    use std::path::PathBuf;

    fn sample() -> FoldMap {
        let ranges = vec![
            FoldingRange::new(0, 4, FoldingKind::Region),
            FoldingRange::new(6, 8, FoldingKind::Comment),
        ];
        let mut stats = FoldStats {
            total_files: 1,
            total_lines: 10,
            ..FoldStats::default()
        };
        for range in &ranges {
            stats.add_range(range);
        }

        FoldMap {
            root: PathBuf::from("/project"),
            files: vec![SourceFile {
                path: PathBuf::from("src/a.c"),
                absolute_path: PathBuf::from("/project/src/a.c"),
                route: "main".to_string(),
                ranges,
                auto_fold_lines: vec![6],
                line_count: 10,
                parsed: true,
                error: None,
            }],
            stats,
            metadata: ScanMetadata::default(),
        }
    }

    #[test]
    fn test_summary_counts_kinds() {
        let summary = format_output(&sample(), OutputFormat::Summary).unwrap();

        assert!(summary.contains("Total Folds: 2"));
        assert!(summary.contains("- Regions: 1"));
        assert!(summary.contains("- Comments: 1"));
        assert!(summary.contains("- main: 1"));
        assert!(summary.contains("Foldable Lines: 8 (80.0%)"));
    }

    #[test]
    fn test_file_listing() {
        let fold_map = sample();
        let listing = format_file(&fold_map.files[0], OutputFormat::Summary).unwrap();

        assert!(listing.starts_with("src/a.c (10 lines, route: main)\n"));
        assert!(listing.contains("    1-5     region\n"));
        assert!(listing.contains("    7-9     comment [auto]\n"));
    }

    #[test]
    fn test_ansi_summary_is_colored() {
        let summary = format_output(&sample(), OutputFormat::Ansi).unwrap();
        assert!(summary.contains("\x1b[1m"));
        assert!(summary.contains("main: 1"));
    }
}
