/*!
 * Provider implementations for the supported translation services.
 *
 * This module contains client implementations for the remote LLM providers:
 * - Anthropic: Messages API integration
 * - OpenAI: Chat Completions API integration
 * - Mock: scriptable in-process provider for tests
 *
 * Callers never branch on provider identity: the closed [`ProviderClient`]
 * enum exposes both back-ends behind the [`TextTranslator`] capability, and
 * both clients normalize HTTP failures into the same [`ProviderError`] taxonomy.
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::ProviderKind;
use crate::errors::ProviderError;
use crate::translation::prompts;

/// Upper bound on generated tokens for every translation request
pub const MAX_OUTPUT_TOKENS: u32 = 16384;

/// Sampling temperature sent to OpenAI
pub const OPENAI_TEMPERATURE: f32 = 0.3;

/// Common trait for the typed HTTP clients
///
/// This trait defines the request/response contract each provider client
/// implements, keeping wire types out of the translation pipeline.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or a classified error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Extract the translated text from the provider response
    fn extract_text(response: &Self::Response) -> Result<String, ProviderError>;
}

/// Capability shared by every translation back-end
#[async_trait]
pub trait TextTranslator: Send + Sync + Debug {
    /// Send one translation request.
    ///
    /// `instructions` are the caller's extra instructions; each back-end folds
    /// them into its own system prompt shape.
    async fn request(&self, text: &str, instructions: Option<&str>) -> Result<String, ProviderError>;

    /// Translate `text`, returning blank input unchanged without a network call
    async fn translate(&self, text: &str, instructions: Option<&str>) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        self.request(text, instructions).await
    }
}

/// Everything needed to talk to a provider once the token has been decrypted
#[derive(Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_token: String,
    pub model: String,
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("kind", &self.kind)
            .field("api_token", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Builds a translator for a run
pub trait ProviderConnector: Send + Sync {
    fn connect(&self, settings: &ProviderSettings) -> Arc<dyn TextTranslator>;
}

/// Connector producing real HTTP clients
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

impl ProviderConnector for HttpConnector {
    fn connect(&self, settings: &ProviderSettings) -> Arc<dyn TextTranslator> {
        Arc::new(ProviderClient::new(settings))
    }
}

/// Closed set of supported back-ends
#[derive(Debug)]
pub enum ProviderClient {
    /// Anthropic Messages API
    Anthropic {
        /// Client instance
        client: Anthropic,
        /// Model identifier
        model: String,
    },

    /// OpenAI Chat Completions API
    OpenAI {
        /// Client instance
        client: OpenAI,
        /// Model identifier
        model: String,
    },
}

impl ProviderClient {
    pub fn new(settings: &ProviderSettings) -> Self {
        let endpoint = settings.endpoint.clone().unwrap_or_default();
        match settings.kind {
            ProviderKind::Anthropic => Self::Anthropic {
                client: Anthropic::new(&settings.api_token, endpoint, settings.timeout_secs),
                model: settings.model.clone(),
            },
            ProviderKind::OpenAI => Self::OpenAI {
                client: OpenAI::new(&settings.api_token, endpoint, settings.timeout_secs),
                model: settings.model.clone(),
            },
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Anthropic { .. } => ProviderKind::Anthropic,
            Self::OpenAI { .. } => ProviderKind::OpenAI,
        }
    }
}

#[async_trait]
impl TextTranslator for ProviderClient {
    async fn request(&self, text: &str, instructions: Option<&str>) -> Result<String, ProviderError> {
        match self {
            Self::Anthropic { client, model } => {
                let request = AnthropicRequest::new(model.as_str(), MAX_OUTPUT_TOKENS)
                    .add_message("user", text)
                    .system(prompts::anthropic_system_prompt(instructions));
                let response = client.complete(request).await?;
                Anthropic::extract_text(&response)
            }
            Self::OpenAI { client, model } => {
                let request = OpenAIRequest::new(model.as_str())
                    .add_message("system", prompts::openai_system_prompt(instructions))
                    .add_message("user", text)
                    .max_tokens(MAX_OUTPUT_TOKENS)
                    .temperature(OPENAI_TEMPERATURE);
                let response = client.complete(request).await?;
                OpenAI::extract_text(&response)
            }
        }
    }
}

pub mod anthropic;
pub mod mock;
pub mod openai;

pub use anthropic::{Anthropic, AnthropicRequest};
pub use openai::{OpenAI, OpenAIRequest};
