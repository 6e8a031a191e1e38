/*!
 * # epubtl - EPUB translation with AI
 *
 * A Rust library for translating EPUB books with large language models.
 *
 * ## Features
 *
 * - Translate EPUB books using remote AI providers:
 *   - Anthropic API
 *   - OpenAI API
 * - Preserve markup, resources and container structure
 * - Size-bounded batching of text nodes to keep request counts low
 * - Fine-grained tolerance of provider failures, early abort on systemic ones
 * - Progress reporting and cooperative cancellation
 * - ISO 639-1 and ISO 639-2 target language codes
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Run configuration, batching limits and the CLI config file
 * - `epub`: Archive codec, package loading, XHTML documents and path resolution
 * - `translation`: The translation pipeline:
 *   - `translation::core`: Run orchestration
 *   - `translation::batch`: Batching and batch translation
 *   - `translation::prompts`: Prompt construction
 *   - `translation::rebuild`: Output archive assembly
 * - `providers`: Client implementations for the LLM providers:
 *   - `providers::anthropic`: Anthropic API client
 *   - `providers::openai`: OpenAI API client
 *   - `providers::mock`: In-process provider for tests
 * - `secrets`: Secret-store collaborator
 * - `job_slot`: One-run-at-a-time guard for callers
 * - `app_controller`: Command line application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod epub;
pub mod errors;
pub mod job_slot;
pub mod language_utils;
pub mod providers;
pub mod secrets;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{AiConfiguration, BatchLimits, Config, ProviderKind};
pub use errors::{EpubError, ErrorKind, JobSlotError, ProviderError, TranslationError};
pub use job_slot::{JobGuard, JobSlot};
pub use language_utils::{get_language_name, normalize_to_part2t};
pub use translation::{
    CancellationFlag, EpubTranslator, ProgressCallback, RunStats, TranslationOutcome,
    TranslationProgress,
};
