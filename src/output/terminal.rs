use super::Envelope;
use crate::core::{AnalysisReport, ExecutionResult, Severity};
use colored::*;
use std::fmt::{self, Write};

const DIVIDER_WIDTH: usize = 44;

pub fn get_severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Critical => Color::Red,
        Severity::High => Color::Yellow,
        Severity::Medium => Color::Blue,
        Severity::Low => Color::Green,
    }
}

pub fn format_envelope(envelope: &Envelope) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = write_envelope(&mut output, envelope);
    output
}

pub fn format_analysis(report: &AnalysisReport) -> String {
    let mut output = String::new();
    let _ = write_analysis(&mut output, report);
    output
}

pub fn format_results(results: &[ExecutionResult]) -> String {
    let mut output = String::new();
    let _ = write_results(&mut output, results);
    output
}

fn write_envelope(out: &mut String, envelope: &Envelope) -> fmt::Result {
    let divider = "═".repeat(DIVIDER_WIDTH);
    writeln!(out, "{}", divider.bright_blue())?;
    writeln!(
        out,
        "    {}",
        format!("perflab v{}", env!("CARGO_PKG_VERSION"))
            .bright_white()
            .bold()
    )?;
    writeln!(out, "{}", divider.bright_blue())?;
    writeln!(out)?;

    let (analysis, results, error) = match envelope {
        Envelope::Analyze(r) => (r.analysis.as_ref(), None, r.error.as_deref()),
        Envelope::AnalyzeAndTest(r) => (
            r.analysis.as_ref(),
            r.performance_results.as_deref(),
            r.error.as_deref(),
        ),
        Envelope::PerformanceTest(r) => (
            None,
            r.test_result.as_ref().map(std::slice::from_ref),
            r.error.as_deref(),
        ),
    };

    if let Some(error) = error {
        writeln!(out, "{} {}", "[ERROR]".bright_red().bold(), error)?;
    }
    if let Some(report) = analysis {
        write_analysis(out, report)?;
    }
    if let Some(results) = results {
        write_results(out, results)?;
    }
    Ok(())
}

fn write_analysis(out: &mut String, report: &AnalysisReport) -> fmt::Result {
    let profile = &report.architecture;
    writeln!(
        out,
        "{} {} (confidence {:.2})",
        "ARCHITECTURE:".bright_yellow().bold(),
        profile.architecture_type.to_string().bright_cyan().bold(),
        profile.confidence
    )?;
    if !profile.detected_features.is_empty() {
        writeln!(out, "├─ features: {}", profile.detected_features.join(", "))?;
    }
    if !profile.imports.is_empty() {
        writeln!(out, "└─ imports: {}", profile.imports.join(", ").dimmed())?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "{}",
        format!("INSIGHTS ({})", report.insights.len())
            .bright_yellow()
            .bold()
    )?;
    if report.insights.is_empty() {
        writeln!(out, "  {}", "No anti-patterns detected".green())?;
    }
    for (idx, insight) in report.insights.iter().enumerate() {
        writeln!(
            out,
            "#{} {} [{}]",
            (idx + 1).to_string().bright_cyan().bold(),
            insight.title.bold(),
            insight
                .severity
                .to_string()
                .to_uppercase()
                .color(get_severity_color(insight.severity))
                .bold()
        )?;
        let location = insight
            .line
            .map(|line| format!(" (line {line})"))
            .unwrap_or_default();
        writeln!(out, "├─ {}: {}{}", insight.insight_type, insight.description, location)?;
        if let Some(recommendation) = &insight.recommendation {
            writeln!(out, "└─ {} {}", "FIX:".bright_green().bold(), recommendation)?;
        }
    }
    writeln!(out)?;

    writeln!(out, "{}", "RECOMMENDED TESTS".bright_yellow().bold())?;
    for scenario in &report.recommended_tests {
        writeln!(
            out,
            "- {} [{}] {}",
            scenario.name.bright_white(),
            scenario.test_type.to_string().cyan(),
            scenario.description.dimmed()
        )?;
    }
    writeln!(out)?;

    let summary = &report.performance_metrics;
    writeln!(
        out,
        "{} {}/10",
        "SCALABILITY RATING:".bright_cyan(),
        summary.scalability_rating
    )?;
    writeln!(out, "├─ memory: {}", summary.estimated_memory_usage)?;
    writeln!(out, "└─ concurrency: {}", summary.estimated_concurrency)?;
    writeln!(out)
}

fn write_results(out: &mut String, results: &[ExecutionResult]) -> fmt::Result {
    writeln!(
        out,
        "{}",
        format!("PERFORMANCE RESULTS ({})", results.len())
            .bright_yellow()
            .bold()
    )?;
    for result in results {
        let status = if result.success {
            "PASS".bright_green().bold()
        } else {
            "FAIL".bright_red().bold()
        };
        writeln!(out, "[{}] {}", status, result.test_name.bold())?;
        if let Some(error) = &result.error {
            writeln!(out, "├─ error: {}", error.red())?;
        }
        let metrics: Vec<String> = result
            .metrics
            .iter()
            .map(|(name, value)| format!("{name}={}", format_metric(*value)))
            .collect();
        if !metrics.is_empty() {
            writeln!(out, "└─ {}", metrics.join(" "))?;
        }
    }
    Ok(())
}

fn format_metric(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_format_metric() {
        assert_eq!(format_metric(1000.0), "1000");
        assert_eq!(format_metric(0.123456), "0.1235");
    }

    #[test]
    fn test_results_show_pass_and_failure_message() {
        colored::control::set_override(false);
        let mut metrics = BTreeMap::new();
        metrics.insert("calls".to_string(), 3.0);
        let results = vec![
            ExecutionResult::passed("Baseline Performance", metrics),
            ExecutionResult::failed("Load Test", "timeout", BTreeMap::new()),
        ];

        let text = format_results(&results);
        assert!(text.contains("[PASS] Baseline Performance"));
        assert!(text.contains("calls=3"));
        assert!(text.contains("[FAIL] Load Test"));
        assert!(text.contains("error: timeout"));
    }

    #[test]
    fn test_severity_colors() {
        assert_eq!(get_severity_color(Severity::Critical), Color::Red);
        assert_eq!(get_severity_color(Severity::Low), Color::Green);
    }
}
