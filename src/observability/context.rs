//! Thread-local context tracking for crash reports.
//!
//! Records which analysis phase and which scenario the current thread is
//! working on. Guards restore the previous context on drop, so phases nest.
//! Scenario progress is kept in global atomic counters.
//!
//! Guards must not be held across `.await` points: a task may resume on a
//! different thread than the one whose context it changed.

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

static SCENARIOS_COMPLETED: AtomicUsize = AtomicUsize::new(0);
static SCENARIOS_TOTAL: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT_CONTEXT: RefCell<AnalysisContext> = const { RefCell::new(AnalysisContext::new()) };
}

/// Snapshot of what the engine was doing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisContext {
    pub phase: Option<AnalysisPhase>,
    /// Scenario being executed, if any
    pub scenario: Option<String>,
    /// A caller catches panics here and turns them into errors
    pub recovering: bool,
}

impl AnalysisContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            scenario: None,
            recovering: false,
        }
    }
}

/// Stages of one analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    Scanning,
    Classification,
    InsightGeneration,
    Recommendation,
    Execution,
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scanning => write!(f, "scanning"),
            Self::Classification => write!(f, "classification"),
            Self::InsightGeneration => write!(f, "insight_generation"),
            Self::Recommendation => write!(f, "recommendation"),
            Self::Execution => write!(f, "execution"),
        }
    }
}

/// RAII guard restoring the previous context on drop.
pub struct ContextGuard {
    previous: AnalysisContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = std::mem::take(&mut self.previous);
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = previous;
        });
    }
}

fn update(apply: impl FnOnce(&mut AnalysisContext)) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        apply(&mut ctx.borrow_mut());
        ContextGuard { previous }
    })
}

/// Set the current phase until the guard drops.
#[must_use]
pub fn set_phase(phase: AnalysisPhase) -> ContextGuard {
    update(|ctx| ctx.phase = Some(phase))
}

/// Set the scenario being executed until the guard drops.
#[must_use]
pub fn set_current_scenario(name: impl Into<String>) -> ContextGuard {
    let name = name.into();
    update(|ctx| ctx.scenario = Some(name))
}

/// Mark panics on this thread as recoverable until the guard drops.
#[must_use]
pub fn set_recovering() -> ContextGuard {
    update(|ctx| ctx.recovering = true)
}

pub fn set_progress(completed: usize, total: usize) {
    SCENARIOS_COMPLETED.store(completed, Ordering::Relaxed);
    SCENARIOS_TOTAL.store(total, Ordering::Relaxed);
}

pub fn increment_completed() {
    SCENARIOS_COMPLETED.fetch_add(1, Ordering::Relaxed);
}

#[must_use]
pub fn get_current_context() -> AnalysisContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Scenario progress as (completed, total).
#[must_use]
pub fn get_progress() -> (usize, usize) {
    (
        SCENARIOS_COMPLETED.load(Ordering::Relaxed),
        SCENARIOS_TOTAL.load(Ordering::Relaxed),
    )
}

pub fn reset_context() {
    CURRENT_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = AnalysisContext::new();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_guard_restores_previous() {
        reset_context();

        let _outer = set_phase(AnalysisPhase::Scanning);
        {
            let _inner = set_phase(AnalysisPhase::Classification);
            assert_eq!(
                get_current_context().phase,
                Some(AnalysisPhase::Classification)
            );
        }
        assert_eq!(get_current_context().phase, Some(AnalysisPhase::Scanning));
    }

    #[test]
    fn test_scenario_nests_inside_phase() {
        reset_context();

        let _phase = set_phase(AnalysisPhase::Execution);
        {
            let _scenario = set_current_scenario("Load Test");
            let ctx = get_current_context();
            assert_eq!(ctx.phase, Some(AnalysisPhase::Execution));
            assert_eq!(ctx.scenario.as_deref(), Some("Load Test"));
        }
        assert_eq!(get_current_context().scenario, None);
    }

    #[test]
    fn test_recovering_flag_is_scoped() {
        reset_context();
        {
            let _recovering = set_recovering();
            let _phase = set_phase(AnalysisPhase::Scanning);
            assert!(get_current_context().recovering);
        }
        assert!(!get_current_context().recovering);
    }

    #[test]
    fn test_context_is_per_thread() {
        reset_context();
        let _phase = set_phase(AnalysisPhase::Recommendation);

        let other = std::thread::spawn(|| get_current_context().phase)
            .join()
            .unwrap();
        assert_eq!(other, None);
    }

    #[test]
    fn test_phase_display_names() {
        assert_eq!(AnalysisPhase::InsightGeneration.to_string(), "insight_generation");
        assert_eq!(AnalysisPhase::Execution.to_string(), "execution");
    }
}
