/*!
 * Tests for application configuration functionality
 */

use epubtl::app_config::{AiConfiguration, BatchLimits, Config, LogLevel, ProviderKind};
use epubtl::errors::ErrorKind;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.translation, AiConfiguration::default());
    assert_eq!(config.batching.min_chars, 60_000);
    assert_eq!(config.batching.max_chars, 80_000);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.translation.timeout_secs(), 120);
    assert!(config.validate().is_ok());
}

/// Test the camelCase wire format of the AI configuration
#[test]
fn test_aiConfiguration_fromJson_shouldReadCamelCaseFields() {
    let json = r#"{
        "provider": "openai",
        "apiToken": "sk-abc",
        "model": "gpt-4o",
        "instructions": "Keep names",
        "targetLanguage": "de"
    }"#;
    let config: AiConfiguration = serde_json::from_str(json).unwrap();

    assert_eq!(config.provider, Some(ProviderKind::OpenAI));
    assert_eq!(config.api_token.as_deref(), Some("sk-abc"));
    assert_eq!(config.model.as_deref(), Some("gpt-4o"));
    assert_eq!(config.instructions(), Some("Keep names"));
    assert_eq!(config.target_language(), Some("de"));
    assert_eq!(config.endpoint(), None);
}

/// Test that required fields are checked in order: provider, token, model
#[test]
fn test_aiConfiguration_validate_shouldReportFirstMissingField() {
    let mut config = AiConfiguration::default();
    assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::MissingProvider);

    config.provider = Some(ProviderKind::Anthropic);
    assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::MissingApiKey);

    config.api_token = Some("   ".to_string());
    assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::MissingApiKey);

    config.api_token = Some("sk-abc".to_string());
    assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::MissingModel);

    config.model = Some("claude".to_string());
    let validated = config.validate().unwrap();
    assert_eq!(validated.provider, ProviderKind::Anthropic);
    assert_eq!(validated.api_token, "sk-abc");
    assert_eq!(validated.model, "claude");
}

/// Test blank optional fields are treated as absent
#[test]
fn test_aiConfiguration_blankOptionals_shouldBeAbsent() {
    let config = AiConfiguration::new(ProviderKind::OpenAI, "sk", "gpt")
        .with_instructions("  ")
        .with_target_language("")
        .with_endpoint(" ");

    assert_eq!(config.instructions(), None);
    assert_eq!(config.target_language(), None);
    assert_eq!(config.endpoint(), None);
}

/// Test batch limit validation
#[test]
fn test_batchLimits_validate_shouldRequireOrderedPositiveLimits() {
    assert!(BatchLimits::default().validate().is_ok());
    assert!(BatchLimits::new(0, 100).validate().is_err());
    assert!(BatchLimits::new(100, 100).validate().is_err());
    assert!(BatchLimits::new(200, 100).validate().is_err());
    assert!(BatchLimits::new(10, 100).validate().is_ok());
}

/// Test saving and loading the configuration file
#[test]
fn test_config_saveThenLoad_shouldPreserveValues() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");

    let config = Config {
        translation: AiConfiguration::new(ProviderKind::Anthropic, "sk-abc", "claude").with_target_language("fr"),
        batching: BatchLimits::new(1_000, 2_000),
        log_level: LogLevel::Debug,
    };
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

/// Test a partial file falls back to defaults
#[test]
fn test_config_loadPartialFile_shouldUseDefaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, r#"{"translation": {"model": "gpt-4o"}}"#).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.translation.model.as_deref(), Some("gpt-4o"));
    assert_eq!(config.batching, BatchLimits::default());
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test an explicit config path always wins
#[test]
fn test_config_locate_withExplicitPath_shouldReturnIt() {
    let explicit = std::path::Path::new("/tmp/does-not-exist/conf.json");
    assert_eq!(Config::locate(Some(explicit)).as_deref(), Some(explicit));
}

/// Test provider parsing
#[test]
fn test_providerKind_fromStr_shouldIgnoreCase() {
    assert_eq!("Anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
    assert_eq!(" openai ".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAI);
    assert!("ollama".parse::<ProviderKind>().is_err());
}
