//! Crash reports and phase tracking.
//!
//! Install the panic hook at startup:
//!
//! ```ignore
//! perflab::observability::install_panic_hook();
//! ```
//!
//! Mark pipeline stages so crashes and caught panics name where they happened:
//!
//! ```ignore
//! use perflab::observability::{set_phase, AnalysisPhase};
//!
//! let _phase = set_phase(AnalysisPhase::Scanning);
//! let facts = scanner.scan(code)?;
//! ```

pub mod context;
pub mod panic_hook;

pub use context::{
    get_current_context, get_progress, increment_completed, reset_context, set_current_scenario,
    set_phase, set_progress, set_recovering, AnalysisContext, AnalysisPhase, ContextGuard,
};
pub use panic_hook::install_panic_hook;
