mod common;

use common::*;
use perflab::insights::rules;
use perflab::{ArchitectureType, Severity, SystemDiagram, TestType};
use pretty_assertions::assert_eq;

fn test_types(report: &perflab::AnalysisReport) -> Vec<TestType> {
    report.recommended_tests.iter().map(|s| s.test_type).collect()
}

#[test]
fn test_store_example_end_to_end() {
    let report = engine().analyze(IN_MEMORY_STORE, None).unwrap();

    assert_eq!(report.architecture.architecture_type, ArchitectureType::InMemory);
    assert!(report.architecture.confidence >= 0.3);
    let unbounded: Vec<_> = report
        .insights
        .iter()
        .filter(|i| i.rule == rules::UNBOUNDED_GLOBAL)
        .collect();
    assert_eq!(unbounded.len(), 1);
    assert!(unbounded[0].title.contains("Global"));
    assert!(unbounded[0].title.contains("`store`"));
    assert_eq!(test_types(&report), vec![TestType::Baseline, TestType::Memory]);
}

#[test]
fn test_database_store_recommends_fan_out() {
    let report = engine().analyze(DATABASE_STORE, None).unwrap();

    assert_eq!(report.architecture.architecture_type, ArchitectureType::Database);
    assert_eq!(report.architecture.imports, vec!["sqlite3".to_string()]);
    assert!(report
        .insights
        .iter()
        .any(|i| i.rule == rules::CONNECTION_PER_CALL && i.title.contains("`put`")));
    assert_eq!(
        test_types(&report),
        vec![TestType::Baseline, TestType::Concurrency, TestType::Load]
    );
}

#[test]
fn test_caching_store() {
    let report = engine().analyze(CACHING_STORE, None).unwrap();

    assert_eq!(report.architecture.architecture_type, ArchitectureType::Caching);
    assert!(report
        .architecture
        .detected_features
        .contains(&"ttl_bearing_writes".to_string()));
    assert!(!report.insights.iter().any(|i| i.rule == rules::CACHE_WITHOUT_TTL));
}

#[test]
fn test_cache_write_without_expiry_is_flagged() {
    let code = CACHING_STORE.replace("cache.setex(k, 60, v)", "cache.set(k, v)");
    let report = engine().analyze(&code, None).unwrap();

    let insight = report
        .insights
        .iter()
        .find(|i| i.rule == rules::CACHE_WITHOUT_TTL)
        .unwrap();
    assert_eq!(insight.title, "Cache Writes Without Expiration (1 call)");
    assert_eq!(insight.severity, Severity::Medium);
}

#[test]
fn test_hybrid_beats_its_parts() {
    let report = engine().analyze(HYBRID_STORE, None).unwrap();

    assert_eq!(report.architecture.architecture_type, ArchitectureType::Hybrid);
    assert_eq!(
        report.architecture.detected_features,
        vec!["persistence_with_cache_layer", "cache_aside_reads", "write_through"]
    );
}

#[test]
fn test_performance_issues_fire_every_rule() {
    let report = engine().analyze(PERFORMANCE_ISSUES, None).unwrap();
    let fired = |rule: &str| report.insights.iter().any(|i| i.rule == rule);

    assert!(fired(rules::SQL_INTERPOLATION));
    assert!(fired(rules::UNBOUNDED_GLOBAL));
    assert!(fired(rules::BLOCKING_CALL));
    assert!(fired(rules::REDUNDANT_TIMESTAMP));
    assert!(fired(rules::CONNECTION_PER_CALL));
    assert!(fired(rules::STRING_CONCAT_IN_LOOP));
    assert_eq!(report.insights[0].severity, Severity::Critical);

    let timestamp = report
        .insights
        .iter()
        .find(|i| i.rule == rules::REDUNDANT_TIMESTAMP)
        .unwrap();
    assert!(timestamp.description.contains("redundant timestamp"));
    assert!(timestamp.title.contains("`record`"));

    // Blocking call plus unbounded state: every scenario applies.
    assert_eq!(
        test_types(&report),
        vec![
            TestType::Baseline,
            TestType::Memory,
            TestType::Concurrency,
            TestType::Load
        ]
    );
    assert_eq!(report.performance_metrics.scalability_rating, 1);
}

#[test]
fn test_diagram_components_raise_user_counts() {
    let diagram = SystemDiagram {
        components: vec!["API".into(), "Postgres DB".into(), "Redis Cache".into()],
        architecture: Some("database".into()),
    };
    let report = engine().analyze(DATABASE_STORE, Some(&diagram)).unwrap();

    let concurrency = report
        .recommended_tests
        .iter()
        .find(|s| s.test_type == TestType::Concurrency)
        .unwrap();
    assert_eq!(concurrency.parameters.user_count, Some(10 + 3 * 5));

    let missing: Vec<_> = report
        .insights
        .iter()
        .filter(|i| i.rule == rules::MISSING_COMPONENT)
        .map(|i| i.title.as_str())
        .collect();
    assert_eq!(missing, vec!["Declared Component Not Found in Code: Redis Cache"]);
}

#[test]
fn test_clean_code_rates_well() {
    let report = engine().analyze(FAST_FUNCTIONS, None).unwrap();

    assert_eq!(report.architecture.architecture_type, ArchitectureType::Unknown);
    assert!(report.insights.is_empty());
    assert_eq!(report.performance_metrics.scalability_rating, 10);
    assert_eq!(test_types(&report), vec![TestType::Baseline]);
}

#[test]
fn test_analysis_is_deterministic() {
    let first = engine().analyze(PERFORMANCE_ISSUES, None).unwrap();
    let second = engine().analyze(PERFORMANCE_ISSUES, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_report_wire_shape() {
    let report = engine().analyze(IN_MEMORY_STORE, None).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["architecture"]["type"], "in-memory");
    assert_eq!(json["recommendedTests"][0]["testType"], "baseline");
    assert_eq!(json["insights"][0]["type"], "scalability");
    assert!(json["performanceMetrics"]["scalabilityRating"].is_u64());
}
