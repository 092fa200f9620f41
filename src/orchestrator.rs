//! Composition of the analysis pipeline and scenario execution.

use crate::classifier::ArchitectureClassifier;
use crate::config::PerflabConfig;
use crate::core::{
    AnalysisReport, ArchitectureProfile, ArchitectureType, Error, ExecutionResult, InputError,
    Insight, PerformanceSummary, RawTestScenario, Result, Severity, SystemDiagram,
};
use crate::executor::PerformanceExecutor;
use crate::insights::{fired, rules, InsightGenerator};
use crate::observability::{
    increment_completed, set_phase, set_progress, set_recovering, AnalysisPhase,
};
use crate::recommend::TestRecommender;
use crate::scanner::{SourceFacts, SourceScanner};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info, info_span, Instrument};

/// Analysis plus the results of the scenarios that were run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestedAnalysis {
    pub analysis: AnalysisReport,
    pub performance_results: Vec<ExecutionResult>,
}

/// The analysis engine. Holds configuration only; every request is independent.
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    scanner: SourceScanner,
    classifier: ArchitectureClassifier,
    insights: InsightGenerator,
    recommender: TestRecommender,
    executor: PerformanceExecutor,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new(&PerflabConfig::default())
    }
}

impl AnalysisEngine {
    pub fn new(config: &PerflabConfig) -> Self {
        let scanner = SourceScanner::new(&config.scanner);
        Self {
            classifier: ArchitectureClassifier::new(&config.classifier),
            insights: InsightGenerator::new(),
            recommender: TestRecommender::new(&config.recommender),
            executor: PerformanceExecutor::new(&config.executor, scanner.clone()),
            scanner,
        }
    }

    pub fn executor(&self) -> &PerformanceExecutor {
        &self.executor
    }

    /// Scan, classify, generate insights and recommend scenarios. Runs nothing.
    pub fn analyze(&self, code: &str, diagram: Option<&SystemDiagram>) -> Result<AnalysisReport> {
        let span = info_span!("analyze", bytes = code.len());
        let _enter = span.enter();
        self.run_pipeline(code, diagram).map(|(_, report)| report)
    }

    /// Analyze, then run the baseline scenario or every recommended scenario in order.
    pub async fn analyze_and_test(
        &self,
        code: &str,
        diagram: Option<&SystemDiagram>,
        run_all_tests: bool,
    ) -> Result<TestedAnalysis> {
        let span = info_span!("analyze_and_test", bytes = code.len(), run_all_tests);
        async {
            let (facts, analysis) = self.run_pipeline(code, diagram)?;
            self.ensure_executor()?;

            let selected = if run_all_tests {
                analysis.recommended_tests.len()
            } else {
                1
            };
            set_progress(0, selected);

            let mut performance_results = Vec::with_capacity(selected);
            for scenario in analysis.recommended_tests.iter().take(selected) {
                let result = self.executor.execute_with_facts(code, &facts, scenario).await;
                increment_completed();
                performance_results.push(result);
            }

            info!(
                scenarios = performance_results.len(),
                passed = performance_results.iter().filter(|r| r.success).count(),
                "performance scenarios finished"
            );
            Ok(TestedAnalysis {
                analysis,
                performance_results,
            })
        }
        .instrument(span)
        .await
    }

    /// Run one caller-supplied scenario after validating its test type.
    pub async fn performance_test(
        &self,
        code: &str,
        scenario: RawTestScenario,
    ) -> Result<ExecutionResult> {
        let scenario = scenario
            .validate()
            .map_err(|e| Error::validation(e.to_string()))?;
        self.scanner.validate(code)?;
        self.ensure_executor()?;

        let span = info_span!("performance_test", scenario = %scenario.name);
        Ok(self.executor.execute(code, &scenario).instrument(span).await)
    }

    fn ensure_executor(&self) -> Result<()> {
        if self.executor.is_available() {
            Ok(())
        } else {
            Err(Error::infrastructure(format!(
                "execution sandbox unavailable: python interpreter '{}' was not found",
                self.executor.config().python
            )))
        }
    }

    /// The pure pipeline, with panics converted into analysis errors.
    fn run_pipeline(
        &self,
        code: &str,
        diagram: Option<&SystemDiagram>,
    ) -> Result<(SourceFacts, AnalysisReport)> {
        self.scanner.validate(code)?;

        let reached = Cell::new(AnalysisPhase::Scanning);
        let _recovering = set_recovering();
        let outcome = catch_unwind(AssertUnwindSafe(|| -> std::result::Result<_, InputError> {
            let facts = {
                let _phase = set_phase(AnalysisPhase::Scanning);
                self.scanner.scan(code)
            }?;

            reached.set(AnalysisPhase::Classification);
            let profile = {
                let _phase = set_phase(AnalysisPhase::Classification);
                self.classifier.classify(&facts)
            };

            reached.set(AnalysisPhase::InsightGeneration);
            let insights = {
                let _phase = set_phase(AnalysisPhase::InsightGeneration);
                self.insights.generate_with_diagram(&facts, &profile, diagram)
            };

            reached.set(AnalysisPhase::Recommendation);
            let recommended_tests = {
                let _phase = set_phase(AnalysisPhase::Recommendation);
                self.recommender.recommend_with_hints(&profile, &insights, diagram)
            };

            debug!(
                architecture = %profile.architecture_type,
                confidence = profile.confidence,
                insights = insights.len(),
                scenarios = recommended_tests.len(),
                "analysis complete"
            );
            let performance_metrics = summarize(&profile, &insights);
            Ok((
                facts,
                AnalysisReport {
                    architecture: profile,
                    insights,
                    recommended_tests,
                    performance_metrics,
                },
            ))
        }));

        match outcome {
            Ok(result) => result.map_err(Error::Input),
            Err(payload) => Err(Error::analysis(format!(
                "internal fault during {}: {}",
                reached.get(),
                panic_message(payload.as_ref())
            ))),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Static estimate of runtime characteristics from the profile and insights.
pub fn summarize(profile: &ArchitectureProfile, insights: &[Insight]) -> PerformanceSummary {
    let unbounded = fired(insights, rules::UNBOUNDED_GLOBAL);
    let blocking = fired(insights, rules::BLOCKING_CALL);

    let estimated_memory_usage = match profile.architecture_type {
        _ if unbounded => "Unbounded: grows with every stored entry",
        ArchitectureType::InMemory => "Proportional to stored entries, held in process memory",
        ArchitectureType::Database => "Low in process: data lives in the database",
        ArchitectureType::Caching => "Bounded by cache server capacity",
        ArchitectureType::Hybrid => {
            "Low in process: hot entries in the cache, the rest in the database"
        }
        ArchitectureType::Unknown => "Unknown",
    };
    let estimated_concurrency = match profile.architecture_type {
        _ if blocking => "Limited: blocking calls serialize requests",
        ArchitectureType::InMemory => "Single process only: state is not shared between workers",
        ArchitectureType::Database => "Limited by database connections and locking",
        ArchitectureType::Caching | ArchitectureType::Hybrid => {
            "High: a shared cache serves concurrent readers"
        }
        ArchitectureType::Unknown => "Unknown",
    };

    PerformanceSummary {
        estimated_memory_usage: estimated_memory_usage.to_string(),
        estimated_concurrency: estimated_concurrency.to_string(),
        scalability_rating: scalability_rating(insights),
    }
}

/// Starts at 10 and loses 4/2/1/0 per critical/high/medium/low insight, floored at 1.
pub fn scalability_rating(insights: &[Insight]) -> u8 {
    let penalty: u32 = insights
        .iter()
        .map(|insight| match insight.severity {
            Severity::Critical => 4,
            Severity::High => 2,
            Severity::Medium => 1,
            Severity::Low => 0,
        })
        .sum();
    10u32.saturating_sub(penalty).max(1) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InsightType, TestType};
    use indoc::indoc;

    fn insight(severity: Severity) -> Insight {
        Insight {
            insight_type: InsightType::Performance,
            title: "t".into(),
            description: "d".into(),
            recommendation: None,
            severity,
            rule: "r".into(),
            line: None,
        }
    }

    #[test]
    fn test_scalability_rating_floors_at_one() {
        assert_eq!(scalability_rating(&[]), 10);
        assert_eq!(
            scalability_rating(&[
                insight(Severity::High),
                insight(Severity::Medium),
                insight(Severity::Low),
            ]),
            7
        );
        let many = vec![insight(Severity::Critical); 5];
        assert_eq!(scalability_rating(&many), 1);
    }

    #[test]
    fn test_analyze_in_memory_store() {
        let report = AnalysisEngine::default()
            .analyze(
                indoc! {r#"
                    store = {}
                    def put(k, v): store[k] = v
                    def get(k): return store.get(k, "missing")
                "#},
                None,
            )
            .unwrap();
        assert_eq!(report.architecture.architecture_type, ArchitectureType::InMemory);
        assert!(report.architecture.confidence >= 0.3);
        assert_eq!(report.recommended_tests[0].test_type, TestType::Baseline);
        assert!(report
            .recommended_tests
            .iter()
            .any(|s| s.test_type == TestType::Memory));
        assert_eq!(
            report.performance_metrics.estimated_memory_usage,
            "Unbounded: grows with every stored entry"
        );
    }

    fn exploding_rule(_: &crate::insights::RuleContext<'_>) -> Vec<Insight> {
        panic!("rule exploded")
    }

    static EXPLODING_RULES: &[crate::insights::InsightRule] = &[crate::insights::InsightRule {
        id: "exploding",
        insight_type: InsightType::Performance,
        evaluate: exploding_rule,
    }];

    #[test]
    fn test_rule_panic_becomes_analysis_error() {
        let engine = AnalysisEngine {
            insights: InsightGenerator::with_rules(EXPLODING_RULES),
            ..AnalysisEngine::default()
        };
        let err = engine.analyze("x = 1\n", None).unwrap_err();
        assert!(matches!(err, Error::Analysis(_)));
        assert_eq!(
            err.to_string(),
            "Analysis error: internal fault during insight_generation: rule exploded"
        );
        assert!(!crate::observability::get_current_context().recovering);
    }

    #[test]
    fn test_empty_code_is_an_input_error() {
        let err = AnalysisEngine::default().analyze("\n\n", None).unwrap_err();
        assert!(matches!(err, Error::Input(InputError::Empty)));
    }

    #[tokio::test]
    async fn test_unknown_test_type_fails_fast() {
        let scenario = RawTestScenario {
            name: "x".into(),
            test_type: "chaos".into(),
            description: String::new(),
            parameters: Default::default(),
        };
        let err = AnalysisEngine::default()
            .performance_test("def f():\n    pass\n", scenario)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("chaos"));
        assert!(err.to_string().contains("baseline, memory, concurrency, load"));
    }
}
