pub mod json;
pub mod terminal;

use crate::api::{AnalyzeAndTestResponse, AnalyzeResponse, PerformanceTestResponse};
use crate::cli::OutputFormat;
use anyhow::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub use json::to_json;
pub use terminal::{format_analysis, format_envelope, format_results};

/// Response envelope of one of the three contracts.
#[derive(Debug, Clone)]
pub enum Envelope {
    Analyze(AnalyzeResponse),
    AnalyzeAndTest(AnalyzeAndTestResponse),
    PerformanceTest(PerformanceTestResponse),
}

impl Envelope {
    pub fn success(&self) -> bool {
        match self {
            Self::Analyze(r) => r.success,
            Self::AnalyzeAndTest(r) => r.success,
            Self::PerformanceTest(r) => r.success,
        }
    }
}

pub fn output_envelope(
    envelope: &Envelope,
    format: OutputFormat,
    output_file: Option<PathBuf>,
) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => to_json(envelope)?,
        OutputFormat::Terminal => format_envelope(envelope),
    };
    match output_file {
        Some(path) => write_file(&path, &rendered),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_json_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("nested").join("report.json");
        let envelope = Envelope::Analyze(AnalyzeResponse {
            success: false,
            analysis: None,
            error: Some("Invalid input: code is empty".into()),
        });

        output_envelope(&envelope, OutputFormat::Json, Some(nested_path.clone())).unwrap();

        let content = fs::read_to_string(&nested_path).unwrap();
        assert!(content.contains("\"success\": false"));
        assert!(!envelope.success());
    }
}
