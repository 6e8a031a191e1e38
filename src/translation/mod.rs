/*!
 * Translation pipeline for EPUB books.
 *
 * This module contains the functionality that turns an EPUB into a translated
 * EPUB. It is split into several submodules:
 *
 * - `core`: the run orchestrator and its outcome types
 * - `batch`: batching of text units and delimiter-based batch translation
 * - `prompts`: system prompts and batch instructions
 * - `progress`: progress events and cooperative cancellation
 * - `rebuild`: title patching and output archive encoding
 */

// Re-export main types for easier usage
pub use self::batch::{Batch, BatchTranslator, DocumentStats, plan_batches};
pub use self::core::{EpubTranslator, RunState, RunStats, TranslationOutcome};
pub use self::progress::{CancellationFlag, ProgressCallback, TranslationProgress};

// Submodules
pub mod batch;
pub mod core;
pub mod progress;
pub mod prompts;
pub mod rebuild;
