use super::Envelope;
use anyhow::Result;

/// Pretty-printed wire form of the envelope, exactly as the contracts define it.
pub fn to_json(envelope: &Envelope) -> Result<String> {
    let json = match envelope {
        Envelope::Analyze(r) => serde_json::to_string_pretty(r)?,
        Envelope::AnalyzeAndTest(r) => serde_json::to_string_pretty(r)?,
        Envelope::PerformanceTest(r) => serde_json::to_string_pretty(r)?,
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PerformanceTestResponse;
    use crate::core::ExecutionResult;
    use std::collections::BTreeMap;

    #[test]
    fn test_json_uses_camel_case_envelope() {
        let mut metrics = BTreeMap::new();
        metrics.insert("execution_time".to_string(), 0.25);
        let envelope = Envelope::PerformanceTest(PerformanceTestResponse {
            success: true,
            test_result: Some(ExecutionResult::passed("Baseline Performance", metrics)),
            error: None,
        });

        let rendered = to_json(&envelope).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["testResult"]["testName"], "Baseline Performance");
        assert_eq!(value["testResult"]["metrics"]["execution_time"], 0.25);
        assert!(value.get("error").is_none());
    }
}
