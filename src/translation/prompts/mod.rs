/*!
 * Prompt construction for book translation.
 *
 * This module provides:
 * - The segment delimiter that joins text nodes inside one request
 * - Provider-specific system prompts
 * - Batch instructions telling the model to keep the delimiter intact
 */

pub mod templates;

// Re-export main types
pub use templates::{
    PromptTemplate, SEGMENT_DELIMITER, anthropic_system_prompt, batch_instructions,
    openai_system_prompt, run_instructions,
};
