use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::TranslationError;

/// Application configuration module
/// This module handles the per-run AI configuration consumed by the translation
/// core, the batching thresholds, and the configuration file used by the CLI.
/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    // @provider: Anthropic Messages API
    Anthropic,
    // @provider: OpenAI Chat Completions API
    OpenAI,
}

impl ProviderKind {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Anthropic => "Anthropic",
            Self::OpenAI => "OpenAI",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAI => "openai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAI),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// AI configuration for a single translation run
///
/// Every field is optional on the wire so that an incomplete configuration can
/// be loaded and then rejected with a precise error by [`AiConfiguration::validate`].
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiConfiguration {
    /// Which provider to call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,

    /// Opaque secret; handed to the secret store before use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Model identifier sent verbatim to the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Extra instructions appended to the translator system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Target language, as an ISO 639 code or a plain language name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,

    /// Base URL override for proxies and self-hosted gateways
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Borrowed view of the fields a run cannot start without
#[derive(Debug, Clone, Copy)]
pub struct ValidatedConfig<'a> {
    pub provider: ProviderKind,
    pub api_token: &'a str,
    pub model: &'a str,
}

impl AiConfiguration {
    /// Create a configuration with the three required fields set
    pub fn new(provider: ProviderKind, api_token: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: Some(provider),
            api_token: Some(api_token.into()),
            model: Some(model.into()),
            ..Default::default()
        }
    }

    /// Set the custom instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Set the target language
    pub fn with_target_language(mut self, target_language: impl Into<String>) -> Self {
        self.target_language = Some(target_language.into());
        self
    }

    /// Set the endpoint override
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Check that provider, token and model are present, in that order
    pub fn validate(&self) -> std::result::Result<ValidatedConfig<'_>, TranslationError> {
        let provider = self.provider.ok_or(TranslationError::MissingProvider)?;
        let api_token = non_blank(self.api_token.as_deref()).ok_or(TranslationError::MissingApiKey)?;
        let model = non_blank(self.model.as_deref()).ok_or(TranslationError::MissingModel)?;

        Ok(ValidatedConfig {
            provider,
            api_token,
            model,
        })
    }

    /// Instructions with blank values treated as absent
    pub fn instructions(&self) -> Option<&str> {
        non_blank(self.instructions.as_deref())
    }

    /// Target language with blank values treated as absent
    pub fn target_language(&self) -> Option<&str> {
        non_blank(self.target_language.as_deref())
    }

    /// Endpoint override with blank values treated as absent
    pub fn endpoint(&self) -> Option<&str> {
        non_blank(self.endpoint.as_deref())
    }

    /// HTTP timeout, defaulting to two minutes
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.filter(|secs| *secs > 0).unwrap_or_else(default_timeout_secs)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Character thresholds used to group text units into provider requests
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// A batch at or above this size is closed early once it nears `max_chars`
    #[serde(default = "default_min_chars_per_batch")]
    pub min_chars: usize,

    /// Hard upper bound for a batch, except for a single oversized unit
    #[serde(default = "default_max_chars_per_batch")]
    pub max_chars: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars_per_batch(),
            max_chars: default_max_chars_per_batch(),
        }
    }
}

impl BatchLimits {
    pub fn new(min_chars: usize, max_chars: usize) -> Self {
        Self { min_chars, max_chars }
    }

    /// Require `0 < min_chars < max_chars`
    pub fn validate(&self) -> Result<()> {
        if self.min_chars == 0 {
            return Err(anyhow!("Batch min_chars must be greater than zero"));
        }
        if self.min_chars >= self.max_chars {
            return Err(anyhow!(
                "Batch min_chars ({}) must be lower than max_chars ({})",
                self.min_chars,
                self.max_chars
            ));
        }
        Ok(())
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Configuration file of the command line tool
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// AI settings for translation runs
    #[serde(default)]
    pub translation: AiConfiguration,

    /// Batching thresholds
    #[serde(default)]
    pub batching: BatchLimits,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Config {
    /// Load a configuration file in JSON format
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Locate the configuration file to use.
    ///
    /// An explicit path wins; otherwise `conf.json` in the working directory,
    /// then `epubtl/conf.json` in the per-user configuration directory.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("epubtl").join(DEFAULT_CONFIG_FILE))
            .filter(|path| path.exists())
    }

    /// Validate settings that the translation core does not check itself
    pub fn validate(&self) -> Result<()> {
        self.batching.validate()?;

        if let Some(language) = self.translation.target_language() {
            if crate::language_utils::get_language_name(language).is_err() {
                log::debug!("Target language '{}' is not an ISO code; using it verbatim", language);
            }
        }

        Ok(())
    }
}

/// Name of the configuration file looked up by the CLI
pub const DEFAULT_CONFIG_FILE: &str = "conf.json";

fn default_min_chars_per_batch() -> usize {
    60_000
}

fn default_max_chars_per_batch() -> usize {
    80_000
}

fn default_timeout_secs() -> u64 {
    120
}
