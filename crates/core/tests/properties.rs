//! Property tests over generated brace documents.

use exfold_core::{EngineOptions, FoldingEngine, FoldingRange, RuleConfig, TextDocument};
use proptest::prelude::*;

fn brace_engine() -> FoldingEngine {
    let rules: Vec<RuleConfig> =
        serde_json::from_str(r#"[{"beginRegex": "\\{", "endRegex": "\\}"}]"#).unwrap();
    FoldingEngine::new(&rules, EngineOptions::default())
}

/// One marker per line so that no range can share a line with another
fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!["{", "}", "x"]), 0..60).prop_map(|lines| lines.join("\n"))
}

proptest! {
    #[test]
    fn ranges_nest_or_are_disjoint(text in document()) {
        let outcome = brace_engine().provide_folding_ranges(&TextDocument::from_str(&text));
        let ranges: &[FoldingRange] = &outcome.ranges;

        for (i, a) in ranges.iter().enumerate() {
            prop_assert!(a.end > a.start);
            for b in &ranges[i + 1..] {
                prop_assert!(!a.crosses(b), "{:?} crosses {:?}", a, b);
            }
        }
    }

    #[test]
    fn scan_is_deterministic(text in document()) {
        let engine = brace_engine();
        let document = TextDocument::from_str(&text);

        let first = engine.provide_folding_ranges(&document);
        let second = engine.provide_folding_ranges(&document);

        prop_assert_eq!(first, second);
    }

    #[test]
    fn ranges_stay_inside_the_document(text in document()) {
        let document = TextDocument::from_str(&text);
        let line_count = exfold_core::Document::line_count(&document);
        let outcome = brace_engine().provide_folding_ranges(&document);

        for range in &outcome.ranges {
            prop_assert!(range.end < line_count);
        }
    }
}
