/*!
 * Core translation orchestration.
 *
 * `EpubTranslator` drives one run end to end: it validates the configuration,
 * decrypts the token, loads the archive, translates the title and then every
 * spine section in order, and finally rebuilds the archive. A run either
 * returns a complete `TranslationOutcome` or a classified error; partially
 * translated archives are never handed out.
 */

use bytes::Bytes;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{AiConfiguration, BatchLimits};
use crate::epub::archive::{Archive, OutputArchive};
use crate::epub::package::{DocumentLoader, EpubLoader, Section};
use crate::epub::paths::resolve_section_path;
use crate::errors::{EpubError, ErrorKind, TranslationError};
use crate::providers::{HttpConnector, ProviderConnector, ProviderSettings, TextTranslator};
use crate::secrets::{PlaintextSecretStore, SecretStore};
use crate::translation::batch::{BatchTranslator, DocumentStats};
use crate::translation::progress::{CancellationFlag, ProgressCallback, TranslationProgress};
use crate::translation::prompts;
use crate::translation::rebuild::{EPUB_MEDIA_TYPE, patch_package_title, rebuild};

/// Title used when the package metadata declares none
pub const DEFAULT_TITLE: &str = "Untitled";

/// Characters replaced when deriving a file name from the title
const FILE_NAME_RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Lifecycle of a run, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    ValidatingConfig,
    LoadingArchive,
    TranslatingTitle,
    TranslatingSections,
    Rebuilding,
    Done,
    Failed(ErrorKind),
}

/// Counters collected over a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Sections in the spine
    pub total_sections: usize,
    /// Sections written back to the archive
    pub successful_sections: usize,
    /// Sections that failed with a non-critical error
    pub failed_sections: usize,
    /// Per-document counters summed over successful sections
    pub documents: DocumentStats,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunStats {
    /// One-line human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "{}/{} sections translated ({} failed), {} text units in {} requests ({} failed, {} units kept original text) in {:.1}s",
            self.successful_sections,
            self.total_sections,
            self.failed_sections,
            self.documents.text_units,
            self.documents.batches,
            self.documents.failed_batches,
            self.documents.untranslated_units,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    /// The translated EPUB
    pub archive: Vec<u8>,
    /// Title written into the package metadata
    pub translated_title: String,
    /// Title as found in the input (or the fallback)
    pub original_title: String,
    /// Run counters
    pub stats: RunStats,
}

impl TranslationOutcome {
    /// Suggested file name: the translated title with path-hostile characters replaced
    pub fn file_name(&self) -> String {
        let stem: String = self
            .translated_title
            .trim()
            .chars()
            .map(|c| {
                if c.is_control() || FILE_NAME_RESERVED.contains(&c) {
                    '_'
                } else {
                    c
                }
            })
            .collect();
        let stem = stem.trim_matches(|c: char| c == '.' || c.is_whitespace());

        if stem.is_empty() {
            format!("{}.epub", DEFAULT_TITLE)
        } else {
            format!("{}.epub", stem)
        }
    }

    pub fn media_type(&self) -> &'static str {
        EPUB_MEDIA_TYPE
    }
}

/// Progress and state bookkeeping of one run
struct RunContext {
    state: RunState,
    on_progress: Option<ProgressCallback>,
    started: Instant,
}

impl RunContext {
    fn new(on_progress: Option<ProgressCallback>) -> Self {
        Self {
            state: RunState::Idle,
            on_progress,
            started: Instant::now(),
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!("Run state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn emit(&self, total: usize, current: usize, current_section: impl Into<String>) {
        if let Some(callback) = &self.on_progress {
            callback(TranslationProgress::new(total, current, current_section));
        }
    }
}

/// EPUB translation orchestrator
pub struct EpubTranslator {
    /// Reads package metadata and section documents
    loader: Arc<dyn DocumentLoader>,
    /// Supplies the plaintext API token
    secrets: Arc<dyn SecretStore>,
    /// Builds the provider client for a run
    connector: Arc<dyn ProviderConnector>,
    /// Batch size thresholds
    limits: BatchLimits,
}

impl Default for EpubTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl EpubTranslator {
    /// Translator using the built-in loader, plaintext secrets and HTTP providers
    pub fn new() -> Self {
        Self {
            loader: Arc::new(EpubLoader),
            secrets: Arc::new(PlaintextSecretStore),
            connector: Arc::new(HttpConnector),
            limits: BatchLimits::default(),
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_secret_store(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn ProviderConnector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_batch_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Translate an EPUB held in memory
    pub async fn translate(
        &self,
        input: impl Into<Bytes>,
        config: &AiConfiguration,
        on_progress: Option<ProgressCallback>,
    ) -> Result<TranslationOutcome, TranslationError> {
        self.translate_with_cancel(input, config, on_progress, &CancellationFlag::new())
            .await
    }

    /// Translate an EPUB held in memory, stopping early once `cancel` is set
    pub async fn translate_with_cancel(
        &self,
        input: impl Into<Bytes>,
        config: &AiConfiguration,
        on_progress: Option<ProgressCallback>,
        cancel: &CancellationFlag,
    ) -> Result<TranslationOutcome, TranslationError> {
        self.translate_named(input, None, config, on_progress, cancel)
            .await
    }

    /// Like [`EpubTranslator::translate_with_cancel`] for input read from `file_name`.
    ///
    /// A book without a title is then named after the file, minus its
    /// `.epub` extension, instead of [`DEFAULT_TITLE`].
    pub async fn translate_named(
        &self,
        input: impl Into<Bytes>,
        file_name: Option<&str>,
        config: &AiConfiguration,
        on_progress: Option<ProgressCallback>,
        cancel: &CancellationFlag,
    ) -> Result<TranslationOutcome, TranslationError> {
        let fallback_title = file_name
            .and_then(title_from_file_name)
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let mut context = RunContext::new(on_progress);
        match self.run(input.into(), &fallback_title, config, &mut context, cancel).await {
            Ok(outcome) => {
                context.transition(RunState::Done);
                Ok(outcome)
            }
            Err(e) => {
                context.transition(RunState::Failed(e.kind()));
                error!("Translation failed [{}]: {}", e.kind().code(), e);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        input: Bytes,
        fallback_title: &str,
        config: &AiConfiguration,
        context: &mut RunContext,
        cancel: &CancellationFlag,
    ) -> Result<TranslationOutcome, TranslationError> {
        context.transition(RunState::ValidatingConfig);
        let validated = config.validate()?;

        let api_token = self.secrets.decrypt(validated.api_token).await;
        if api_token.trim().is_empty() {
            return Err(TranslationError::Decryption);
        }
        let settings = ProviderSettings {
            kind: validated.provider,
            api_token,
            model: validated.model.to_string(),
            endpoint: config.endpoint().map(str::to_string),
            timeout_secs: config.timeout_secs(),
        };
        let instructions = prompts::run_instructions(config.instructions(), config.target_language());

        context.transition(RunState::LoadingArchive);
        context.emit(1, 0, "Loading ePub file...");
        let archive = Arc::new(open_archive(input).await?);
        let publication = self
            .loader
            .open(&archive)
            .map_err(|e| TranslationError::EpubLoad(e.to_string()))?;
        if publication.sections.is_empty() {
            return Err(TranslationError::EmptyEpub);
        }

        let translator = self.connector.connect(&settings);
        info!(
            "Translating {} sections with {} model {}",
            publication.sections.len(),
            settings.kind.display_name(),
            settings.model
        );

        context.transition(RunState::TranslatingTitle);
        if cancel.is_cancelled() {
            return Err(TranslationError::Cancelled);
        }
        context.emit(1, 0, "Translating title...");
        let original_title = publication
            .title
            .clone()
            .unwrap_or_else(|| fallback_title.to_string());
        let translated_title = translate_title(translator.as_ref(), &original_title, instructions.as_deref()).await;

        context.transition(RunState::TranslatingSections);
        let total = publication.sections.len();
        context.emit(total, 0, "Preparing translation...");

        let mut output = OutputArchive::new(Arc::clone(&archive));
        let mut stats = RunStats {
            total_sections: total,
            ..RunStats::default()
        };

        for (index, section) in publication.sections.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(TranslationError::Cancelled);
            }

            let result = self
                .translate_section(
                    &archive,
                    &mut output,
                    section,
                    translator.as_ref(),
                    instructions.as_deref(),
                    cancel,
                )
                .await;

            match result {
                Ok(document_stats) => {
                    stats.successful_sections += 1;
                    stats.documents.merge(&document_stats);
                }
                Err(e) if e.is_critical() => return Err(e),
                Err(e) => {
                    stats.failed_sections += 1;
                    warn!("Failed to translate section {}: {}", section.href, e);
                    if stats.failed_sections * 2 > total {
                        return Err(TranslationError::TooManyFailures {
                            failed: stats.failed_sections,
                            total,
                        });
                    }
                }
            }
            context.emit(total, index + 1, section.href.as_str());
        }

        if stats.successful_sections == 0 {
            return Err(TranslationError::NoSectionsTranslated);
        }
        if cancel.is_cancelled() {
            return Err(TranslationError::Cancelled);
        }

        context.transition(RunState::Rebuilding);
        match patch_package_title(&mut output, &translated_title) {
            Ok(Some(path)) => debug!("Updated title in {}", path),
            Ok(None) => warn!("No package title element found, title left unchanged"),
            Err(e) => warn!("Failed to update package metadata: {}", e),
        }
        let archive_bytes = rebuild(output).await?;
        context.emit(total, total, "Generating ePub file...");

        stats.elapsed = context.started.elapsed();
        info!("Translation complete: {}", stats.summary());

        Ok(TranslationOutcome {
            archive: archive_bytes,
            translated_title,
            original_title,
            stats,
        })
    }

    /// Translate one section and overwrite its entry in `output`
    async fn translate_section(
        &self,
        archive: &Archive,
        output: &mut OutputArchive,
        section: &Section,
        translator: &dyn TextTranslator,
        instructions: Option<&str>,
        cancel: &CancellationFlag,
    ) -> Result<DocumentStats, TranslationError> {
        let paths: Vec<&str> = output.paths().collect();
        let (path, strategy) =
            resolve_section_path(section, &paths).ok_or_else(|| EpubError::SectionNotFound(section.href.clone()))?;
        let path = path.to_string();
        debug!("Section {} maps to {} ({:?})", section.href, path, strategy);

        let mut document = self.loader.load_section(archive, section)?;
        let stats = BatchTranslator::new(translator, instructions, self.limits)
            .with_cancellation(cancel)
            .translate_document(&mut document)
            .await?;

        output.overwrite(&path, document.serialize()?)?;
        Ok(stats)
    }
}

/// File name without directories and without a trailing `.epub`, if anything is left
fn title_from_file_name(file_name: &str) -> Option<String> {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name).trim();
    let stem = match name.len().checked_sub(".epub".len()) {
        Some(split) if name.is_char_boundary(split) && name[split..].eq_ignore_ascii_case(".epub") => &name[..split],
        _ => name,
    };
    let stem = stem.trim();
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Decode the input archive off the async runtime
async fn open_archive(input: Bytes) -> Result<Archive, TranslationError> {
    tokio::task::spawn_blocking(move || Archive::open(input))
        .await
        .map_err(|e| TranslationError::EpubLoad(e.to_string()))?
        .map_err(|e| TranslationError::EpubLoad(e.to_string()))
}

/// Translate the title; any failure keeps the original
async fn translate_title(translator: &dyn TextTranslator, title: &str, instructions: Option<&str>) -> String {
    match translator.translate(title, instructions).await {
        Ok(translated) if !translated.trim().is_empty() => {
            let translated = translated.trim().to_string();
            info!("Title: \"{}\" -> \"{}\"", title, translated);
            translated
        }
        Ok(_) => {
            warn!("Provider returned an empty title, keeping \"{}\"", title);
            title.to_string()
        }
        Err(e) => {
            warn!("Failed to translate title, keeping original: {}", e);
            title.to_string()
        }
    }
}
