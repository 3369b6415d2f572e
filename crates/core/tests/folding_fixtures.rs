//! Rule sets and documents under `tests/fixtures/`, each with the ranges the
//! engine must produce.

use exfold_core::{EngineOptions, FoldingEngine, RuleConfig, TextDocument};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fixture {
    rules: Vec<RuleConfig>,
    #[serde(default)]
    variables: BTreeMap<String, String>,
    text: String,
    expected: Vec<(usize, usize, String)>,
    #[serde(default)]
    auto_fold: Option<Vec<usize>>,
}

fn load_fixture(name: &str) -> Fixture {
    let path = format!("{}/tests/fixtures/{name}.yaml", env!("CARGO_MANIFEST_DIR"));
    let content = std::fs::read_to_string(&path).unwrap();
    serde_yaml::from_str(&content).unwrap()
}

#[rstest]
#[case("backreference")]
#[case("separator")]
#[case("docstring")]
#[case("eof_flush")]
#[case("region_markers")]
#[case("line_comments")]
#[case("variables")]
fn fixture(#[case] name: &str) {
    let fixture = load_fixture(name);
    let engine = FoldingEngine::new(
        &fixture.rules,
        EngineOptions::default().with_variables(fixture.variables),
    );
    assert!(engine.errors().is_empty(), "{name}: {:?}", engine.errors());

    let outcome = engine.provide_folding_ranges(&TextDocument::from_str(&fixture.text));

    let mut ranges: Vec<(usize, usize, String)> = outcome
        .ranges
        .iter()
        .map(|r| (r.start, r.end, r.kind.as_str().to_string()))
        .collect();
    ranges.sort();
    assert_eq!(ranges, fixture.expected, "{name}");

    if let Some(auto_fold) = fixture.auto_fold {
        assert_eq!(outcome.auto_fold_lines, auto_fold, "{name}");
    }
}

#[test]
fn docstring_scan_is_idempotent() {
    let fixture = load_fixture("docstring");
    let engine = FoldingEngine::new(&fixture.rules, EngineOptions::default());
    let document = TextDocument::from_str(&fixture.text);

    let first = engine.provide_folding_ranges(&document);
    let second = engine.provide_folding_ranges(&document);

    assert_eq!(first.ranges, second.ranges);
    assert_eq!(first.ranges.len(), 1);
}

#[test]
fn docstring_without_last_line() {
    let rules: Vec<RuleConfig> =
        serde_yaml::from_str("- {beginRegex: '\"\"\"', endRegex: '\"\"\"', foldLastLine: false}").unwrap();
    let engine = FoldingEngine::new(&rules, EngineOptions::default());
    let outcome = engine.provide_folding_ranges(&TextDocument::from_str("\"\"\"\na\nb\n\"\"\""));

    let spans: Vec<(usize, usize)> = outcome.ranges.iter().map(|r| (r.start, r.end)).collect();
    assert_eq!(spans, vec![(0, 2)]);
}

#[test]
fn unterminated_region_without_eof_flush_vanishes() {
    let rules: Vec<RuleConfig> = serde_yaml::from_str("- {beginRegex: '\\{', endRegex: '\\}'}").unwrap();
    let engine = FoldingEngine::new(&rules, EngineOptions::default());
    let outcome = engine.provide_folding_ranges(&TextDocument::from_str("a\nb\n{\nc\nd"));

    assert!(outcome.ranges.is_empty());
}

#[test]
fn separator_tail_folds_with_eof_flag() {
    let rules: Vec<RuleConfig> = serde_yaml::from_str("- {separatorRegex: '^# '}").unwrap();
    let engine = FoldingEngine::new(&rules, EngineOptions::default());
    let outcome = engine.provide_folding_ranges(&TextDocument::from_str("# a\n1\n# b\n3\n4"));

    let spans: Vec<(usize, usize)> = outcome.ranges.iter().map(|r| (r.start, r.end)).collect();
    assert_eq!(spans, vec![(0, 1), (2, 4)]);
}
