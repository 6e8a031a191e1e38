/*!
 * End-to-end translation runs against the mock provider
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use epubtl::epub::{Archive, DocumentLoader, EpubLoader, XhtmlDocument};
use epubtl::errors::{ErrorKind, ProviderError, TranslationError};
use epubtl::providers::mock::{MockConnector, MockProvider, MockRequest};
use epubtl::secrets::SecretStore;
use epubtl::translation::{CancellationFlag, EpubTranslator, TranslationOutcome, TranslationProgress};
use zip::CompressionMethod;

use crate::common::{COVER_BYTES, EpubBuilder, STYLESHEET, init_test_logging, test_config};

fn translator_with(provider: &MockProvider) -> EpubTranslator {
    init_test_logging();
    EpubTranslator::new().with_connector(Arc::new(MockConnector::new(provider.clone())))
}

fn section_texts(archive: &Archive, index: usize) -> Vec<String> {
    let source = archive.read_string(&EpubBuilder::section_path(index)).unwrap();
    XhtmlDocument::parse(&EpubBuilder::section_path(index), &source)
        .unwrap()
        .text_units()
        .into_iter()
        .map(|unit| unit.text)
        .collect()
}

async fn run(builder: &EpubBuilder, provider: &MockProvider) -> Result<TranslationOutcome, TranslationError> {
    translator_with(provider)
        .translate(builder.build(), &test_config(), None)
        .await
}

#[tokio::test]
async fn test_translate_helloWorld_shouldTranslateEveryTextNode() {
    let builder = EpubBuilder::new().title("Greetings").section(&["Hello", "World"]);
    let provider = MockProvider::uppercase();

    let outcome = run(&builder, &provider).await.unwrap();

    let archive = Archive::open(outcome.archive.clone()).unwrap();
    assert_eq!(section_texts(&archive, 0), vec!["HELLO", "WORLD"]);
    assert_eq!(outcome.original_title, "Greetings");
    assert_eq!(outcome.translated_title, "GREETINGS");
    assert_eq!(outcome.file_name(), "GREETINGS.epub");
    assert_eq!(outcome.media_type(), "application/epub+zip");

    // One request for the title, one batch for the section
    assert_eq!(provider.call_count(), 2);
    assert_eq!(outcome.stats.total_sections, 1);
    assert_eq!(outcome.stats.successful_sections, 1);
    assert_eq!(outcome.stats.documents.text_units, 2);
    assert_eq!(outcome.stats.documents.batches, 1);
}

#[tokio::test]
async fn test_translate_echo_shouldPreserveEverythingElse() {
    let builder = EpubBuilder::new().section(&["Hello", "World"]).section(&["Again"]);
    let input = Archive::open(builder.build()).unwrap();

    let outcome = run(&builder, &MockProvider::echo()).await.unwrap();
    let output = Archive::open(outcome.archive).unwrap();

    let input_paths: Vec<&str> = input.paths().collect();
    let output_paths: Vec<&str> = output.paths().collect();
    assert_eq!(output_paths, input_paths);

    let first = &output.entries()[0];
    assert_eq!(first.path, "mimetype");
    assert_eq!(first.compression, CompressionMethod::Stored);
    assert_eq!(first.data.as_ref(), b"application/epub+zip");

    assert_eq!(output.read_string("OEBPS/css/style.css").unwrap(), STYLESHEET);
    assert_eq!(output.get("OEBPS/images/cover.png").unwrap().as_ref(), COVER_BYTES);
    assert_eq!(
        output.read_string("META-INF/container.xml").unwrap(),
        input.read_string("META-INF/container.xml").unwrap()
    );

    assert_eq!(section_texts(&output, 0), section_texts(&input, 0));
    assert_eq!(section_texts(&output, 1), vec!["Again"]);
}

#[tokio::test]
async fn test_translate_title_shouldBePatchedIntoPackage() {
    let builder = EpubBuilder::new().title("Der Prozess").numbered_sections(1);

    let outcome = run(&builder, &MockProvider::uppercase()).await.unwrap();
    let archive = Archive::open(outcome.archive).unwrap();

    let package = archive.read_string("OEBPS/content.opf").unwrap();
    assert!(package.contains("<dc:title>DER PROZESS</dc:title>"));
    assert_eq!(
        EpubLoader.open(&archive).unwrap().title.as_deref(),
        Some("DER PROZESS")
    );
}

#[tokio::test]
async fn test_translate_withoutTitle_shouldFallBackToUntitled() {
    let builder = EpubBuilder::new().without_title().numbered_sections(1);

    let outcome = run(&builder, &MockProvider::echo()).await.unwrap();
    assert_eq!(outcome.original_title, "Untitled");
    assert_eq!(outcome.file_name(), "Untitled.epub");
}

#[tokio::test]
async fn test_translateNamed_withoutTitle_shouldFallBackToFileName() {
    let builder = EpubBuilder::new().without_title().numbered_sections(1);
    let provider = MockProvider::echo();

    let outcome = translator_with(&provider)
        .translate_named(
            builder.build(),
            Some("Die Verwandlung.epub"),
            &test_config(),
            None,
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.original_title, "Die Verwandlung");
    assert_eq!(outcome.file_name(), "Die Verwandlung.epub");
}

#[tokio::test]
async fn test_translateNamed_withTitle_shouldIgnoreFileName() {
    let builder = EpubBuilder::new().title("Der Prozess").numbered_sections(1);

    let outcome = translator_with(&MockProvider::echo())
        .translate_named(builder.build(), Some("upload.epub"), &test_config(), None, &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(outcome.original_title, "Der Prozess");
}

#[tokio::test]
async fn test_translate_invalidApiKeyOnSecondSection_shouldAbort() {
    let builder = EpubBuilder::new().numbered_sections(3);
    // Title and first section succeed, the second section is rejected
    let provider = MockProvider::failing_after(
        2,
        ProviderError::InvalidApiKey {
            provider: "Anthropic".to_string(),
        },
    );

    let error = run(&builder, &provider).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidApiKey);
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_translate_mostSectionsMissing_shouldAbortWithTooManyFailures() {
    let mut builder = EpubBuilder::new().numbered_sections(10);
    for index in 0..6 {
        builder = builder.missing_section(index);
    }
    let provider = MockProvider::echo();

    let error = run(&builder, &provider).await.unwrap_err();
    assert!(matches!(
        error,
        TranslationError::TooManyFailures { failed: 6, total: 10 }
    ));
    assert_eq!(error.kind(), ErrorKind::TooManyFailures);
    // Only the title was sent; sections 7 to 10 were never reached
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_translate_fewSectionsMissing_shouldSucceedWithFailureCount() {
    let builder = EpubBuilder::new()
        .numbered_sections(4)
        .missing_section(1)
        .missing_section(3);
    let provider = MockProvider::echo();

    let outcome = run(&builder, &provider).await.unwrap();
    assert_eq!(outcome.stats.successful_sections, 2);
    assert_eq!(outcome.stats.failed_sections, 2);
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_translate_nonCriticalProviderError_shouldKeepOriginalText() {
    let builder = EpubBuilder::new().section(&["Hello", "World"]);
    let provider = MockProvider::failing(ProviderError::ApiError {
        status_code: 503,
        message: "overloaded".to_string(),
    });

    let outcome = run(&builder, &provider).await.unwrap();
    let archive = Archive::open(outcome.archive).unwrap();

    assert_eq!(section_texts(&archive, 0), vec!["Hello", "World"]);
    assert_eq!(outcome.translated_title, "Test Book");
    assert_eq!(outcome.stats.successful_sections, 1);
    assert_eq!(outcome.stats.documents.failed_batches, 1);
    assert_eq!(outcome.stats.documents.untranslated_units, 2);
}

#[tokio::test]
async fn test_translate_droppedDelimiters_shouldKeepRemainingUnits() {
    let builder = EpubBuilder::new().section(&["One", "Two", "Three"]);
    let provider = MockProvider::custom(|_request: &MockRequest| Ok("EINS".to_string()));

    let outcome = run(&builder, &provider).await.unwrap();
    let archive = Archive::open(outcome.archive).unwrap();

    assert_eq!(section_texts(&archive, 0), vec!["EINS", "Two", "Three"]);
    assert_eq!(outcome.stats.documents.untranslated_units, 2);
}

#[tokio::test]
async fn test_translate_missingApiToken_shouldFailBeforeAnyRequest() {
    let provider = MockProvider::echo();
    let mut config = test_config();
    config.api_token = None;

    let error = translator_with(&provider)
        .translate(EpubBuilder::new().numbered_sections(1).build(), &config, None)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::MissingApiKey);
    assert_eq!(provider.call_count(), 0);
}

struct BrokenSecretStore;

#[async_trait]
impl SecretStore for BrokenSecretStore {
    async fn decrypt(&self, _secret: &str) -> String {
        String::new()
    }
}

#[tokio::test]
async fn test_translate_failedDecryption_shouldReportDecryptionError() {
    let provider = MockProvider::echo();
    let translator = translator_with(&provider).with_secret_store(Arc::new(BrokenSecretStore));

    let error = translator
        .translate(EpubBuilder::new().numbered_sections(1).build(), &test_config(), None)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::DecryptionError);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_translate_emptySpine_shouldReportEmptyEpub() {
    let provider = MockProvider::echo();

    let error = run(&EpubBuilder::new(), &provider).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::EmptyEpub);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_translate_notAZip_shouldReportEpubLoadError() {
    let provider = MockProvider::echo();

    let error = translator_with(&provider)
        .translate(b"PK but not really".to_vec(), &test_config(), None)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::EpubLoadError);
}

#[tokio::test]
async fn test_translate_progress_shouldReportEveryPhase() {
    let builder = EpubBuilder::new().numbered_sections(2);
    let events: Arc<Mutex<Vec<TranslationProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    translator_with(&MockProvider::echo())
        .translate(
            builder.build(),
            &test_config(),
            Some(Box::new(move |progress: TranslationProgress| sink.lock().push(progress))),
        )
        .await
        .unwrap();

    let events: Vec<(usize, usize, String)> = events
        .lock()
        .iter()
        .map(|p| (p.total, p.current, p.current_section.clone()))
        .collect();
    assert_eq!(
        events,
        vec![
            (1, 0, "Loading ePub file...".to_string()),
            (1, 0, "Translating title...".to_string()),
            (2, 0, "Preparing translation...".to_string()),
            (2, 1, EpubBuilder::section_href(0)),
            (2, 2, EpubBuilder::section_href(1)),
            (2, 2, "Generating ePub file...".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_translate_cancelledFromProgress_shouldStopBeforeSections() {
    let provider = MockProvider::echo();
    let cancel = CancellationFlag::new();
    let trigger = cancel.clone();

    let error = translator_with(&provider)
        .translate_with_cancel(
            EpubBuilder::new().numbered_sections(3).build(),
            &test_config(),
            Some(Box::new(move |progress: TranslationProgress| {
                if progress.current_section == "Preparing translation..." {
                    trigger.cancel();
                }
            })),
            &cancel,
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Cancelled);
    // Only the title request went out
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_translate_instructions_shouldReachProvider() {
    let provider = MockProvider::echo();
    let config = test_config()
        .with_instructions("Keep the names")
        .with_target_language("de");

    translator_with(&provider)
        .translate(EpubBuilder::new().numbered_sections(1).build(), &config, None)
        .await
        .unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        let instructions = request.instructions.as_deref().unwrap();
        assert!(instructions.contains("Keep the names"));
        assert!(instructions.contains("German"));
    }
}
