/*!
 * Tests for provider implementations
 */

use epubtl::app_config::ProviderKind;
use epubtl::errors::{ErrorKind, ProviderError};
use epubtl::providers::mock::{MockConnector, MockProvider};
use epubtl::providers::{ProviderClient, ProviderConnector, ProviderSettings, TextTranslator};

fn settings(kind: ProviderKind) -> ProviderSettings {
    ProviderSettings {
        kind,
        api_token: "sk-very-secret".to_string(),
        model: "test-model".to_string(),
        endpoint: Some("http://127.0.0.1:9".to_string()),
        timeout_secs: 2,
    }
}

#[test]
fn test_providerClient_new_shouldFollowConfiguredKind() {
    assert_eq!(
        ProviderClient::new(&settings(ProviderKind::Anthropic)).kind(),
        ProviderKind::Anthropic
    );
    assert_eq!(ProviderClient::new(&settings(ProviderKind::OpenAI)).kind(), ProviderKind::OpenAI);
}

#[test]
fn test_providerSettings_debug_shouldRedactToken() {
    let rendered = format!("{:?}", settings(ProviderKind::OpenAI));
    assert!(!rendered.contains("sk-very-secret"));
    assert!(rendered.contains("test-model"));
}

#[tokio::test]
async fn test_openAiClient_unreachableEndpoint_shouldFailWithCriticalNetworkError() {
    let client = ProviderClient::new(&settings(ProviderKind::OpenAI));

    let error = client.translate("Hello", None).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NetworkError);
    assert!(error.is_critical());
}

#[tokio::test]
async fn test_mockProvider_behaviors_shouldMatchTheirNames() {
    let echo = MockProvider::echo();
    assert_eq!(echo.translate("Hello", Some("be nice")).await.unwrap(), "Hello");
    assert_eq!(echo.requests()[0].instructions.as_deref(), Some("be nice"));

    let upper = MockProvider::uppercase();
    assert_eq!(upper.translate("Hello", None).await.unwrap(), "HELLO");

    let failing = MockProvider::failing(ProviderError::RateLimit);
    assert_eq!(failing.translate("Hello", None).await.unwrap_err(), ProviderError::RateLimit);
    assert_eq!(failing.call_count(), 1);
}

#[tokio::test]
async fn test_mockProvider_failingAfter_shouldFailOnceBudgetIsSpent() {
    let provider = MockProvider::failing_after(1, ProviderError::RateLimit);

    assert!(provider.translate("one", None).await.is_ok());
    assert!(provider.translate("two", None).await.is_err());
    assert!(provider.translate("three", None).await.is_err());
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_mockProvider_blankInput_shouldNotBeSent() {
    let provider = MockProvider::echo();
    assert_eq!(provider.translate("   ", None).await.unwrap(), "   ");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_mockConnector_connect_shouldShareRequestLog() {
    let provider = MockProvider::echo();
    let connector = MockConnector::new(provider.clone());

    let translator = connector.connect(&settings(ProviderKind::Anthropic));
    translator.translate("Hi", None).await.unwrap();

    assert_eq!(provider.call_count(), 1);
    let connections = connector.connections();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].api_token, "sk-very-secret");
}
