//! Panic hook printing a structured crash report.
//!
//! The report names the analysis phase and scenario that were active so a
//! crash can be traced back to the stage of the pipeline that caused it.
//! Panics raised under [`set_recovering`](super::set_recovering) are caught
//! by the caller, so they only produce a warning event.

use super::context::{get_current_context, get_progress, AnalysisContext};
use std::panic::PanicHookInfo;
use tracing::{warn, Span};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const WIDTH: usize = 78;

/// Install the crash report hook. Call once, early in `main`.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let context = get_current_context();
        if context.recovering {
            let location = info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()));
            warn!("{}", recovered_fault(&panic_message(info), location, &context));
        } else {
            eprint!("{}", crash_report(info));
        }
    }));
}

fn recovered_fault(message: &str, location: Option<String>, context: &AnalysisContext) -> String {
    let mut line = String::from("recovered internal fault");
    if let Some(phase) = &context.phase {
        line.push_str(&format!(" during {}", phase));
    }
    line.push_str(&format!(": {}", message));
    if let Some(location) = location {
        line.push_str(&format!(" ({})", location));
    }
    line
}

fn crash_report(info: &PanicHookInfo<'_>) -> String {
    let context = get_current_context();
    let (completed, total) = get_progress();
    let rule = "═".repeat(WIDTH);

    let mut lines = vec![
        String::new(),
        format!("╔{}╗", rule),
        boxed(&format!("{:^w$}", "PERFLAB CRASH REPORT", w = WIDTH - 4)),
        format!("╠{}╣", rule),
        boxed(&format!("Version: {}", VERSION)),
        boxed(&format!("Platform: {}", std::env::consts::OS)),
        format!("╠{}╣", rule),
        boxed(&format!("PANIC: {}", panic_message(info))),
    ];
    if let Some(location) = info.location() {
        lines.push(boxed(&format!(
            "Location: {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        )));
    }

    lines.push(format!("╠{}╣", rule));
    lines.extend(context_lines(&context, completed, total));
    lines.push(format!("╠{}╣", rule));
    let backtrace = std::env::var("RUST_BACKTRACE").is_ok();
    if backtrace {
        lines.push(boxed("STACK TRACE:"));
    } else {
        lines.push(boxed("Run with RUST_BACKTRACE=1 for stack trace"));
    }
    lines.push(format!("╚{}╝", rule));

    let mut report = lines.join("\n");
    report.push('\n');
    if backtrace {
        report.push_str(&format!("\n{}\n", std::backtrace::Backtrace::capture()));
    }
    report
}

fn context_lines(context: &AnalysisContext, completed: usize, total: usize) -> Vec<String> {
    let mut lines = vec![boxed("OPERATION CONTEXT:")];
    match &context.phase {
        Some(phase) => lines.push(boxed(&format!("  Phase: {}", phase))),
        None => lines.push(boxed("  Phase: (not set, crash occurred outside analysis)")),
    }
    if let Some(metadata) = Span::current().metadata() {
        lines.push(boxed(&format!("  Span: {}", metadata.name())));
    }
    if let Some(scenario) = &context.scenario {
        lines.push(boxed(&format!("  Scenario: {}", scenario)));
    }
    if total > 0 {
        lines.push(boxed(&format!("  Progress: {} / {} scenarios", completed, total)));
    }
    lines
}

fn boxed(text: &str) -> String {
    format!("║  {:<w$}║", truncate(text, WIDTH - 2), w = WIDTH - 2)
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::context::{reset_context, set_phase, AnalysisPhase};

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_truncate_long_string_counts_chars() {
        let result = truncate("ééééééééééééééééééééééé", 10);
        assert_eq!(result.chars().count(), 10);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_boxed_lines_have_fixed_width() {
        let line = boxed("Phase: scanning");
        assert_eq!(line.chars().count(), WIDTH + 2);
    }

    #[test]
    fn test_recovered_fault_is_one_line() {
        let context = AnalysisContext {
            phase: Some(AnalysisPhase::Scanning),
            scenario: None,
            recovering: true,
        };
        let location = Some("src/scanner/mod.rs:10".to_string());
        let line = recovered_fault("index out of bounds", location, &context);
        assert_eq!(
            line,
            "recovered internal fault during scanning: index out of bounds (src/scanner/mod.rs:10)"
        );
        assert!(!line.contains("CRASH REPORT"));
    }

    #[test]
    fn test_context_lines_name_the_phase() {
        reset_context();
        let _phase = set_phase(AnalysisPhase::Classification);
        let lines = context_lines(&get_current_context(), 0, 0);
        assert!(lines.iter().any(|l| l.contains("Phase: classification")));
        assert!(!lines.iter().any(|l| l.contains("Progress")));
    }
}
