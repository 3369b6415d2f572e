use exfold_core::debug::DebugChannel;
use exfold_core::{format_output, FoldScanner, OutputFormat, Router, RulesFile, ScanConfig};
use std::fs;

#[test]
fn scan_project_with_rules_file() {
    let dir = tempfile::tempdir().unwrap();
    let rules_path = dir.path().join("folding.toml");
    fs::write(
        &rules_path,
        r#"
tabSize = 2

[[rules]]
beginRegex = "\\{"
endRegex = "\\}"

[[perFiles."*.md"]]
separatorRegex = "^## "
"#,
    )
    .unwrap();

    let project = dir.path().join("project");
    fs::create_dir_all(project.join("src")).unwrap();
    fs::write(project.join("src/lib.c"), "int f() {\n  return 1;\n}\n").unwrap();
    fs::write(project.join("NOTES.md"), "## a\n1\n## b\n2\n").unwrap();
    fs::write(project.join(".gitignore"), "skip/\n").unwrap();
    fs::create_dir_all(project.join("skip")).unwrap();
    fs::write(project.join("skip/x.c"), "{\n}\n").unwrap();

    let rules = RulesFile::load(&rules_path).unwrap();
    let router = Router::from_rules_file(&rules, rules.engine_options(DebugChannel::default()));
    let scanner = FoldScanner::new(ScanConfig::new(project.clone()).with_threads(1), router).unwrap();
    let fold_map = scanner.scan().unwrap();

    // hidden files and gitignored directories are skipped
    let routes: Vec<(String, &str)> = fold_map
        .files
        .iter()
        .map(|f| (f.path.to_string_lossy().replace('\\', "/"), f.route.as_str()))
        .collect();
    assert_eq!(
        routes,
        vec![
            ("NOTES.md".to_string(), "*.md"),
            ("src/lib.c".to_string(), "main"),
        ]
    );
    assert_eq!(fold_map.stats.total_folds, 3);

    let json = format_output(&fold_map, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["files"][1]["ranges"][0]["start"], 0);
    assert_eq!(value["files"][1]["ranges"][0]["end"], 2);
}
