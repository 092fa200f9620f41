//! Weighted architecture classification.

pub mod profiles;

pub use profiles::{FeaturePredicate, Predicate, ProfileRule, PROFILE_TABLE};

use crate::config::ClassifierConfig;
use crate::core::{ArchitectureProfile, ArchitectureType};
use crate::scanner::SourceFacts;

const SCORE_EPSILON: f64 = 1e-9;

/// Score of one profile row against a set of facts.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileScore {
    pub architecture: ArchitectureType,
    pub specificity: u8,
    /// Sum of matched weights, capped at 1.0
    pub score: f64,
    pub matched: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct ArchitectureClassifier {
    min_confidence: f64,
    table: &'static [ProfileRule],
}

impl Default for ArchitectureClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

impl ArchitectureClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self::with_table(config, PROFILE_TABLE)
    }

    pub fn with_table(config: &ClassifierConfig, table: &'static [ProfileRule]) -> Self {
        Self {
            min_confidence: config.min_confidence.clamp(0.0, 1.0),
            table,
        }
    }

    /// Score every profile row in table order.
    pub fn scores(&self, facts: &SourceFacts) -> Vec<ProfileScore> {
        self.table
            .iter()
            .map(|rule| {
                let matched: Vec<&'static str> = rule
                    .features
                    .iter()
                    .filter(|feature| (feature.test)(facts))
                    .map(|feature| feature.name)
                    .collect();
                let raw: f64 = rule
                    .features
                    .iter()
                    .filter(|feature| matched.contains(&feature.name))
                    .map(|feature| feature.weight)
                    .sum();
                ProfileScore {
                    architecture: rule.architecture,
                    specificity: rule.specificity,
                    score: normalize(raw),
                    matched,
                }
            })
            .collect()
    }

    pub fn classify(&self, facts: &SourceFacts) -> ArchitectureProfile {
        let imports = facts.import_names();
        let Some(best) = pick_best(self.scores(facts)) else {
            return ArchitectureProfile {
                architecture_type: ArchitectureType::Unknown,
                confidence: 0.0,
                detected_features: Vec::new(),
                imports,
            };
        };

        let architecture_type = if best.score + SCORE_EPSILON < self.min_confidence {
            ArchitectureType::Unknown
        } else {
            best.architecture
        };

        ArchitectureProfile {
            architecture_type,
            confidence: best.score,
            detected_features: best.matched.iter().map(|name| name.to_string()).collect(),
            imports,
        }
    }
}

/// Highest score wins; equal scores go to the more specific profile, then table order.
fn pick_best(scores: Vec<ProfileScore>) -> Option<ProfileScore> {
    scores.into_iter().reduce(|best, candidate| {
        let diff = candidate.score - best.score;
        let better = diff > SCORE_EPSILON
            || (diff.abs() <= SCORE_EPSILON && candidate.specificity > best.specificity);
        if better {
            candidate
        } else {
            best
        }
    })
}

/// Cap at 1.0 and round to two decimals so summed weights compare cleanly.
fn normalize(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    (raw.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::SourceScanner;
    use indoc::indoc;

    fn classify(source: &str) -> ArchitectureProfile {
        let facts = SourceScanner::default().scan(source).unwrap();
        ArchitectureClassifier::default().classify(&facts)
    }

    #[test]
    fn test_in_memory_store() {
        let profile = classify(indoc! {r#"
            store = {}
            def put(k, v): store[k] = v
            def get(k): return store.get(k, "missing")
        "#});
        assert_eq!(profile.architecture_type, ArchitectureType::InMemory);
        assert_eq!(profile.confidence, 1.0);
        assert_eq!(
            profile.detected_features,
            vec![
                "module_level_container",
                "global_indexed_writes",
                "no_persistence_imports",
                "dict_lookup_accessors"
            ]
        );
    }

    #[test]
    fn test_database_store() {
        let profile = classify(indoc! {r#"
            import sqlite3
            conn = sqlite3.connect("urls.db")
            conn.execute("CREATE TABLE IF NOT EXISTS urls (code TEXT, url TEXT)")
            def get(code):
                cur = conn.cursor()
                cur.execute("SELECT url FROM urls WHERE code = ?", (code,))
                return cur.fetchone()
        "#});
        assert_eq!(profile.architecture_type, ArchitectureType::Database);
        assert_eq!(profile.confidence, 1.0);
        assert_eq!(profile.imports, vec!["sqlite3"]);
    }

    #[test]
    fn test_weak_signals_are_unknown_with_best_score() {
        let profile = classify("def save(cur, row):\n    cur.execute(row)\n");
        assert_eq!(profile.architecture_type, ArchitectureType::Unknown);
        assert_eq!(profile.confidence, 0.2);
        assert_eq!(profile.detected_features, vec!["cursor_calls"]);
        let profile = classify("def add(a, b):\n    return a + b\n");
        assert_eq!(profile.architecture_type, ArchitectureType::Unknown);
        assert_eq!(profile.confidence, 0.0);
    }

    #[test]
    fn test_tie_prefers_more_specific_profile() {
        let scores = vec![
            ProfileScore {
                architecture: ArchitectureType::InMemory,
                specificity: 0,
                score: 0.5,
                matched: vec![],
            },
            ProfileScore {
                architecture: ArchitectureType::Database,
                specificity: 1,
                score: 0.5,
                matched: vec![],
            },
            ProfileScore {
                architecture: ArchitectureType::Caching,
                specificity: 1,
                score: 0.5,
                matched: vec![],
            },
        ];
        let best = pick_best(scores).unwrap();
        assert_eq!(best.architecture, ArchitectureType::Database);
    }

    #[test]
    fn test_normalize_caps_and_rounds() {
        assert_eq!(normalize(0.1 + 0.2), 0.3);
        assert_eq!(normalize(1.7), 1.0);
        assert_eq!(normalize(f64::NAN), 0.0);
    }
}
