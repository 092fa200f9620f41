//! Educational insight generation.

pub mod rules;

pub use rules::{InsightRule, RuleContext, RULE_TABLE};

use crate::core::{ArchitectureProfile, Insight, SystemDiagram};
use crate::scanner::SourceFacts;

#[derive(Debug, Clone)]
pub struct InsightGenerator {
    rules: &'static [InsightRule],
}

impl Default for InsightGenerator {
    fn default() -> Self {
        Self { rules: RULE_TABLE }
    }
}

impl InsightGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: &'static [InsightRule]) -> Self {
        Self { rules }
    }

    pub fn generate(&self, facts: &SourceFacts, profile: &ArchitectureProfile) -> Vec<Insight> {
        self.generate_with_diagram(facts, profile, None)
    }

    /// Evaluate every rule, then order by severity with ties kept in rule order.
    pub fn generate_with_diagram(
        &self,
        facts: &SourceFacts,
        profile: &ArchitectureProfile,
        diagram: Option<&SystemDiagram>,
    ) -> Vec<Insight> {
        let ctx = RuleContext {
            facts,
            profile,
            diagram,
        };
        let mut insights: Vec<Insight> = self
            .rules
            .iter()
            .flat_map(|rule| (rule.evaluate)(&ctx))
            .collect();
        insights.sort_by(|a, b| b.severity.cmp(&a.severity));
        insights
    }
}

/// True when some insight was produced by the given rule.
pub fn fired(insights: &[Insight], rule_id: &str) -> bool {
    insights.iter().any(|insight| insight.rule == rule_id)
}
