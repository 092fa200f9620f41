//! Maps detected characteristics to performance test scenarios.

use crate::config::RecommenderConfig;
use crate::core::{
    ArchitectureProfile, ArchitectureType, Insight, ScenarioParameters, SystemDiagram,
    TestScenario, TestType,
};
use crate::insights::{fired, rules};

#[derive(Debug, Clone, Default)]
pub struct TestRecommender {
    config: RecommenderConfig,
}

impl TestRecommender {
    pub fn new(config: &RecommenderConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn recommend(&self, profile: &ArchitectureProfile, insights: &[Insight]) -> Vec<TestScenario> {
        self.recommend_with_hints(profile, insights, None)
    }

    /// Baseline first, then memory, then concurrency and load when they apply.
    pub fn recommend_with_hints(
        &self,
        profile: &ArchitectureProfile,
        insights: &[Insight],
        diagram: Option<&SystemDiagram>,
    ) -> Vec<TestScenario> {
        let mut scenarios = vec![baseline()];

        if profile.architecture_type == ArchitectureType::InMemory
            || fired(insights, rules::UNBOUNDED_GLOBAL)
        {
            scenarios.push(self.memory());
        }

        if profile.architecture_type.is_persistent() || fired(insights, rules::BLOCKING_CALL) {
            let extra_users = diagram
                .map(|d| d.components.len() as u64 * self.config.users_per_component)
                .unwrap_or(0);
            scenarios.push(self.concurrency(extra_users));
            scenarios.push(self.load(extra_users));
        }

        scenarios
    }

    fn memory(&self) -> TestScenario {
        TestScenario {
            name: "Memory Usage Test".to_string(),
            test_type: TestType::Memory,
            description: format!(
                "Store {} synthetic entries and measure how memory grows",
                self.config.memory_data_size
            ),
            parameters: ScenarioParameters {
                data_size: Some(self.config.memory_data_size),
                ..Default::default()
            },
        }
    }

    fn concurrency(&self, extra_users: u64) -> TestScenario {
        let users = self.config.concurrency_users + extra_users;
        TestScenario {
            name: "Concurrent Users Test".to_string(),
            test_type: TestType::Concurrency,
            description: format!(
                "{} simultaneous users for {}s, recording latency and errors",
                users, self.config.concurrency_duration_secs
            ),
            parameters: ScenarioParameters {
                user_count: Some(users),
                duration: Some(self.config.concurrency_duration_secs),
                ..Default::default()
            },
        }
    }

    fn load(&self, extra_users: u64) -> TestScenario {
        let users = self.config.load_users + extra_users;
        TestScenario {
            name: "Load Test".to_string(),
            test_type: TestType::Load,
            description: format!(
                "Sustained traffic from {} users for {}s, measuring throughput",
                users, self.config.load_duration_secs
            ),
            parameters: ScenarioParameters {
                user_count: Some(users),
                duration: Some(self.config.load_duration_secs),
                ..Default::default()
            },
        }
    }
}

fn baseline() -> TestScenario {
    TestScenario {
        name: "Baseline Performance".to_string(),
        test_type: TestType::Baseline,
        description: "Single invocation of each entry point with no load".to_string(),
        parameters: ScenarioParameters {
            iterations: Some(1),
            ..Default::default()
        },
    }
}
