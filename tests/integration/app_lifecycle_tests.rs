/*!
 * Full app lifecycle tests
 */

use std::sync::Arc;

use epubtl::app_config::{BatchLimits, Config, LogLevel};
use epubtl::app_controller::Controller;
use epubtl::epub::{Archive, EpubLoader, DocumentLoader};
use epubtl::errors::{JobSlotError, ProviderError};
use epubtl::job_slot::JobSlot;
use epubtl::providers::mock::{MockConnector, MockProvider};
use epubtl::translation::EpubTranslator;

use crate::common::{EpubBuilder, test_config};

fn controller_with(provider: &MockProvider) -> Controller {
    let config = Config {
        translation: test_config().with_target_language("fr"),
        batching: BatchLimits::default(),
        log_level: LogLevel::Info,
    };
    let translator = EpubTranslator::new().with_connector(Arc::new(MockConnector::new(provider.clone())));
    Controller::with_translator(config, translator).unwrap()
}

// The controller admits one run per process, so all of its runs share one test
#[tokio::test]
async fn test_controller_run_shouldWriteOutputAndNeverReplaceFiles() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.epub");
    std::fs::write(&input, EpubBuilder::new().title("Le Livre").numbered_sections(2).build()).unwrap();

    // Default output name comes from the translated title
    let controller = controller_with(&MockProvider::uppercase());
    let written = controller.run(input.clone(), None, false).await.unwrap();
    assert_eq!(written, dir.path().join("LE LIVRE.epub"));
    let archive = Archive::open(std::fs::read(&written).unwrap()).unwrap();
    assert_eq!(EpubLoader.open(&archive).unwrap().title.as_deref(), Some("LE LIVRE"));

    // A second run picks a fresh name instead of overwriting
    let again = controller.run(input.clone(), None, false).await.unwrap();
    assert_eq!(again, dir.path().join("LE LIVRE (1).epub"));

    // An explicit, existing output needs the force flag
    let explicit = dir.path().join("out.epub");
    std::fs::write(&explicit, b"keep me").unwrap();
    assert!(controller.run(input.clone(), Some(explicit.clone()), false).await.is_err());
    assert_eq!(std::fs::read(&explicit).unwrap(), b"keep me");
    controller.run(input.clone(), Some(explicit.clone()), true).await.unwrap();
    assert!(Archive::open(std::fs::read(&explicit).unwrap()).is_ok());

    // A critical provider failure leaves no output behind
    let failing = controller_with(&MockProvider::failing(ProviderError::RateLimit));
    let failed_output = dir.path().join("failed.epub");
    let error = failing
        .run(input.clone(), Some(failed_output.clone()), false)
        .await
        .unwrap_err();
    assert!(error.to_string().contains("RATE_LIMIT"));
    assert!(!failed_output.exists());

    // Missing input is reported before anything else
    assert!(controller.run(dir.path().join("nope.epub"), None, false).await.is_err());
}

#[test]
fn test_controller_invalidBatchLimits_shouldBeRejected() {
    let config = Config {
        batching: BatchLimits::new(100, 10),
        ..Config::default()
    };
    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_jobSlot_secondRun_shouldBeBusyUntilFirstEnds() {
    let slot = JobSlot::new();

    let guard = slot.try_acquire("/books/a.epub").unwrap();
    assert_eq!(
        slot.try_acquire("/books/b.epub").unwrap_err(),
        JobSlotError::Busy {
            holder: "/books/a.epub".to_string()
        }
    );
    assert_eq!(slot.holder().as_deref(), Some("/books/a.epub"));

    drop(guard);
    assert!(!slot.is_busy());
    assert!(slot.try_acquire("/books/b.epub").is_ok());
}
