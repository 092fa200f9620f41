//! Runs the three contracts against a file on disk.

use crate::api::{
    handle_analyze, handle_analyze_and_test, handle_performance_test, AnalyzeAndTestRequest,
    AnalyzeRequest, PerformanceTestRequest,
};
use crate::cli::{raw_scenario, CommonArgs};
use crate::config::{load_config, load_config_from, PerflabConfig};
use crate::core::ScenarioParameters;
use crate::orchestrator::AnalysisEngine;
use crate::output::Envelope;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Config from `--config` when given, otherwise the nearest `.perflab.toml`.
pub fn resolve_config(common: &CommonArgs) -> Result<PerflabConfig> {
    match &common.config {
        Some(path) => Ok(load_config_from(path)?),
        None => Ok(load_config()),
    }
}

/// Read a submission. Invalid UTF-8 is replaced so binary input is rejected by the scanner.
pub fn read_submission(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn run_analyze(file: &Path, common: &CommonArgs) -> Result<Envelope> {
    let engine = AnalysisEngine::new(&resolve_config(common)?);
    let request = AnalyzeRequest {
        code: read_submission(file)?,
        system_diagram: common.system_diagram(),
    };
    Ok(Envelope::Analyze(handle_analyze(&engine, &request)))
}

pub async fn run_analyze_and_test(
    file: &Path,
    run_all_tests: bool,
    common: &CommonArgs,
) -> Result<Envelope> {
    let engine = AnalysisEngine::new(&resolve_config(common)?);
    let request = AnalyzeAndTestRequest {
        code: read_submission(file)?,
        system_diagram: common.system_diagram(),
        run_all_tests,
    };
    Ok(Envelope::AnalyzeAndTest(
        handle_analyze_and_test(&engine, &request).await,
    ))
}

pub async fn run_performance_test(
    file: &Path,
    test_type: String,
    name: Option<String>,
    parameters: ScenarioParameters,
    common: &CommonArgs,
) -> Result<Envelope> {
    let engine = AnalysisEngine::new(&resolve_config(common)?);
    let request = PerformanceTestRequest {
        code: read_submission(file)?,
        test_scenario: raw_scenario(test_type, name, parameters),
    };
    Ok(Envelope::PerformanceTest(
        handle_performance_test(&engine, request).await,
    ))
}
