/*!
 * Progress reporting and cooperative cancellation for a translation run.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Progress snapshot sent to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationProgress {
    /// Units of work in the current phase
    pub total: usize,
    /// Units completed, never decreasing within a phase
    pub current: usize,
    /// Human-readable description of the current step
    pub current_section: String,
}

impl TranslationProgress {
    pub fn new(total: usize, current: usize, current_section: impl Into<String>) -> Self {
        Self {
            total,
            current,
            current_section: current_section.into(),
        }
    }

    /// Completion ratio in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.current.min(self.total) as f64 / self.total as f64
        }
    }
}

/// Progress callback, invoked synchronously and expected to return quickly
pub type ProgressCallback = Box<dyn Fn(TranslationProgress) + Send + Sync>;

/// Cloneable flag checked between units of work
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the run stops at its next check
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
