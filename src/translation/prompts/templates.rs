/*!
 * Prompt templates for book translation.
 *
 * The wording is part of the provider contract: models were tuned against
 * these exact strings, so changes here alter translation output.
 */

use crate::language_utils;

/// Separator placed between text nodes of one batch
pub const SEGMENT_DELIMITER: &str = "<<<TEXTNODE_SEPARATOR>>>";

/// System prompt template with an `{instructions}` placeholder.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: &'static str,
}

impl PromptTemplate {
    /// Preamble shared by every system prompt.
    pub const TRANSLATOR_ROLE: &'static str = "You are a professional translator.";

    /// Default task when the caller gave no instructions.
    pub const DEFAULT_TASK: &'static str = "Translate the following text while preserving formatting, HTML tags, and the overall meaning. Only return the translated text, nothing else.";

    /// Anthropic: custom instructions replace the default task.
    pub const ANTHROPIC_WITH_INSTRUCTIONS: PromptTemplate = PromptTemplate {
        template: "You are a professional translator. {instructions}",
    };

    /// OpenAI: custom instructions are followed by the default task.
    pub const OPENAI_WITH_INSTRUCTIONS: PromptTemplate = PromptTemplate {
        template: "You are a professional translator. {instructions} Translate the following text while preserving formatting, HTML tags, and the overall meaning. Only return the translated text, nothing else.",
    };

    /// Batch framing when the caller gave instructions.
    pub const BATCH_WITH_INSTRUCTIONS: PromptTemplate = PromptTemplate {
        template: "{instructions}\n\nIMPORTANT: Keep the exact delimiter \"{delimiter}\" between text segments. Do not translate or modify this delimiter.",
    };

    /// Batch framing without caller instructions.
    pub const BATCH_DEFAULT: PromptTemplate = PromptTemplate {
        template: "Translate the following text segments. Keep the exact delimiter \"{delimiter}\" between segments. Do not translate or modify this delimiter.",
    };

    /// Render the template with the given instructions.
    pub fn render(&self, instructions: &str) -> String {
        self.template
            .replace("{instructions}", instructions)
            .replace("{delimiter}", SEGMENT_DELIMITER)
    }

    fn default_prompt() -> String {
        format!("{} {}", Self::TRANSLATOR_ROLE, Self::DEFAULT_TASK)
    }
}

fn non_blank(instructions: Option<&str>) -> Option<&str> {
    instructions.filter(|text| !text.trim().is_empty())
}

/// System prompt for the Anthropic Messages API
pub fn anthropic_system_prompt(instructions: Option<&str>) -> String {
    match non_blank(instructions) {
        Some(text) => PromptTemplate::ANTHROPIC_WITH_INSTRUCTIONS.render(text),
        None => PromptTemplate::default_prompt(),
    }
}

/// System message for the OpenAI Chat Completions API
pub fn openai_system_prompt(instructions: Option<&str>) -> String {
    match non_blank(instructions) {
        Some(text) => PromptTemplate::OPENAI_WITH_INSTRUCTIONS.render(text),
        None => PromptTemplate::default_prompt(),
    }
}

/// Instructions sent with every section batch
pub fn batch_instructions(instructions: Option<&str>) -> String {
    match non_blank(instructions) {
        Some(text) => PromptTemplate::BATCH_WITH_INSTRUCTIONS.render(text),
        None => PromptTemplate::BATCH_DEFAULT.render(""),
    }
}

/// Caller instructions for a whole run.
///
/// A configured target language becomes a leading "Translate into X."
/// sentence; ISO codes are expanded to the English language name.
pub fn run_instructions(instructions: Option<&str>, target_language: Option<&str>) -> Option<String> {
    let instructions = non_blank(instructions).map(str::trim);
    let target = target_language
        .filter(|value| !value.trim().is_empty())
        .map(|value| format!("Translate into {}.", language_utils::target_language_label(value)));

    match (target, instructions) {
        (Some(target), Some(text)) => Some(format!("{} {}", target, text)),
        (Some(target), None) => Some(target),
        (None, Some(text)) => Some(text.to_string()),
        (None, None) => None,
    }
}
