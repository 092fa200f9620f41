//! Property-based tests for the analysis pipeline
//!
//! These hold for every input:
//! - Classifier confidence stays within [0, 1]
//! - The first recommended scenario is always the baseline
//! - Analysis never panics on arbitrary text

use perflab::{AnalysisEngine, Error, TestType};
use proptest::prelude::*;

const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield", "None",
    "True", "False",
];

fn python_identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,12}".prop_filter("not a keyword", |s| !PYTHON_KEYWORDS.contains(&s.as_str()))
}

/// Lines drawn from the constructs the scanner recognizes, in any order.
fn snippet_line() -> impl Strategy<Value = String> {
    prop_oneof![
        python_identifier().prop_map(|n| format!("{n} = {{}}")),
        python_identifier().prop_map(|n| format!("{n} = []")),
        Just("import sqlite3".to_string()),
        Just("import redis".to_string()),
        Just("import time".to_string()),
        Just("cache = redis.Redis()".to_string()),
        python_identifier().prop_map(|n| format!("def {n}(k, v): store[k] = v")),
        python_identifier().prop_map(|n| format!("def {n}(k):\n    return cache.get(k)")),
        python_identifier()
            .prop_map(|n| format!("def {n}():\n    time.sleep(1)\n    return time.time()")),
        Just("conn = sqlite3.connect('x.db')".to_string()),
        Just("conn.execute(\"SELECT * FROM t WHERE id = %s\" % key)".to_string()),
        Just("for i in range(3):\n    out += str(i)".to_string()),
        Just("print(f\"{x}\")".to_string()),
    ]
}

fn snippet() -> impl Strategy<Value = String> {
    prop::collection::vec(snippet_line(), 1..12).prop_map(|lines| lines.join("\n"))
}

proptest! {
    #[test]
    fn prop_confidence_is_bounded(code in snippet()) {
        let report = AnalysisEngine::default().analyze(&code, None).unwrap();
        let confidence = report.architecture.confidence;
        prop_assert!((0.0..=1.0).contains(&confidence), "confidence {}", confidence);
    }

    #[test]
    fn prop_baseline_is_always_first(code in snippet()) {
        let report = AnalysisEngine::default().analyze(&code, None).unwrap();
        prop_assert_eq!(report.recommended_tests[0].test_type, TestType::Baseline);
        let baselines = report
            .recommended_tests
            .iter()
            .filter(|s| s.test_type == TestType::Baseline)
            .count();
        prop_assert_eq!(baselines, 1);
    }

    #[test]
    fn prop_rating_stays_in_range(code in snippet()) {
        let report = AnalysisEngine::default().analyze(&code, None).unwrap();
        let rating = report.performance_metrics.scalability_rating;
        prop_assert!((1..=10).contains(&rating));
    }

    #[test]
    fn prop_arbitrary_text_never_panics(code in "\\PC{0,400}") {
        match AnalysisEngine::default().analyze(&code, None) {
            Ok(report) => prop_assert!(report.architecture.confidence <= 1.0),
            Err(Error::Input(_)) => {}
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
