/*!
 * Mock provider implementations for testing.
 *
 * The mock understands the segment delimiter used by the batcher so it can
 * simulate well-behaved and misbehaving models:
 * - `MockProvider::echo()` - returns the input unchanged
 * - `MockProvider::uppercase()` - upper-cases every segment
 * - `MockProvider::dropping_delimiters()` - loses the delimiters, keeping only the first segment
 * - `MockProvider::failing(error)` - always fails with the given error
 * - `MockProvider::failing_after(n, error)` - succeeds `n` times, then fails
 *
 * Clones share their request log, so a connector can hand out copies while
 * the test keeps the original for assertions.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{Provider, ProviderConnector, ProviderSettings, TextTranslator};
use crate::translation::prompts::SEGMENT_DELIMITER;

/// Mock request for testing
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    /// The text to translate
    pub text: String,
    /// Instructions forwarded by the caller
    pub instructions: Option<String>,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// The translated text
    pub text: String,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Returns the input unchanged
    Echo,
    /// Upper-cases the input (the delimiter is already upper case)
    Uppercase,
    /// Returns only the first delimited segment
    DropDelimiters,
    /// Always fails with this error
    Failing(ProviderError),
    /// Succeeds `successes` times, then fails with `error` on every call
    FailingAfter { successes: usize, error: ProviderError },
    /// Custom response generator
    Custom(fn(&MockRequest) -> Result<String, ProviderError>),
}

#[derive(Debug, Default)]
struct MockState {
    requests: Vec<MockRequest>,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Shared request log
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn uppercase() -> Self {
        Self::new(MockBehavior::Uppercase)
    }

    pub fn dropping_delimiters() -> Self {
        Self::new(MockBehavior::DropDelimiters)
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    pub fn failing_after(successes: usize, error: ProviderError) -> Self {
        Self::new(MockBehavior::FailingAfter { successes, error })
    }

    pub fn custom(generator: fn(&MockRequest) -> Result<String, ProviderError>) -> Self {
        Self::new(MockBehavior::Custom(generator))
    }

    /// Number of requests received so far, including failed ones
    pub fn call_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Snapshot of every request received
    pub fn requests(&self) -> Vec<MockRequest> {
        self.state.lock().requests.clone()
    }

    fn respond(&self, request: &MockRequest, call_index: usize) -> Result<String, ProviderError> {
        match &self.behavior {
            MockBehavior::Echo => Ok(request.text.clone()),
            MockBehavior::Uppercase => Ok(request.text.to_uppercase()),
            MockBehavior::DropDelimiters => Ok(request
                .text
                .split(SEGMENT_DELIMITER)
                .next()
                .unwrap_or_default()
                .to_string()),
            MockBehavior::Failing(error) => Err(error.clone()),
            MockBehavior::FailingAfter { successes, error } => {
                if call_index < *successes {
                    Ok(request.text.clone())
                } else {
                    Err(error.clone())
                }
            }
            MockBehavior::Custom(generator) => generator(request),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    async fn complete(&self, request: MockRequest) -> Result<MockResponse, ProviderError> {
        let call_index = {
            let mut state = self.state.lock();
            state.requests.push(request.clone());
            state.requests.len() - 1
        };
        let text = self.respond(&request, call_index)?;
        Ok(MockResponse { text })
    }

    fn extract_text(response: &MockResponse) -> Result<String, ProviderError> {
        Ok(response.text.clone())
    }
}

#[async_trait]
impl TextTranslator for MockProvider {
    async fn request(&self, text: &str, instructions: Option<&str>) -> Result<String, ProviderError> {
        let response = self
            .complete(MockRequest {
                text: text.to_string(),
                instructions: instructions.map(str::to_string),
            })
            .await?;
        Self::extract_text(&response)
    }
}

/// Connector handing out clones of one mock provider
#[derive(Debug, Default)]
pub struct MockConnector {
    provider: Option<MockProvider>,
    connections: Mutex<Vec<ProviderSettings>>,
}

impl MockConnector {
    pub fn new(provider: MockProvider) -> Self {
        Self {
            provider: Some(provider),
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Settings passed to every `connect` call
    pub fn connections(&self) -> Vec<ProviderSettings> {
        self.connections.lock().clone()
    }
}

impl ProviderConnector for MockConnector {
    fn connect(&self, settings: &ProviderSettings) -> Arc<dyn TextTranslator> {
        self.connections.lock().push(settings.clone());
        Arc::new(self.provider.clone().unwrap_or_else(MockProvider::echo))
    }
}
