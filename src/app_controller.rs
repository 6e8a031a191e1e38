use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use crate::job_slot::JobSlot;
use crate::translation::{CancellationFlag, EpubTranslator, ProgressCallback, TranslationOutcome, TranslationProgress};

// @module: Application controller for EPUB translation

/// Admits one translation per process
static JOB_SLOT: JobSlot = JobSlot::new();

/// Main application controller for EPUB translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Translation core
    translator: EpubTranslator,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let translator = EpubTranslator::new().with_batch_limits(config.batching);
        Self::with_translator(config, translator)
    }

    /// Create a controller around a preconfigured translator
    pub fn with_translator(config: Config, translator: EpubTranslator) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config, translator })
    }

    /// Translate `input_file` and write the result.
    ///
    /// Without an explicit `output`, the file is written next to the input and
    /// named after the translated title; an existing file is then never
    /// replaced unless `force_overwrite` is set.
    pub async fn run(&self, input_file: PathBuf, output: Option<PathBuf>, force_overwrite: bool) -> Result<PathBuf> {
        let start_time = std::time::Instant::now();

        if !input_file.is_file() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        if let Some(output) = &output {
            if output.exists() && !force_overwrite {
                return Err(anyhow!(
                    "Output file already exists: {:?}. Use -f to force overwrite.",
                    output
                ));
            }
        }

        let key = input_file
            .canonicalize()
            .unwrap_or_else(|_| input_file.clone())
            .display()
            .to_string();
        let _guard = JOB_SLOT.try_acquire(key)?;

        let input = tokio::fs::read(&input_file)
            .await
            .with_context(|| format!("Failed to read input file: {:?}", input_file))?;
        info!("Translating {:?} ({} bytes)", input_file, input.len());

        let file_name = input_file.file_name().and_then(|name| name.to_str());
        let outcome = self.translate_with_progress(input, file_name).await?;

        let output_path = match output {
            Some(path) => path,
            None => {
                let directory = input_file.parent().unwrap_or(Path::new("."));
                let candidate = directory.join(outcome.file_name());
                if force_overwrite {
                    candidate
                } else {
                    Self::unique_path(candidate)
                }
            }
        };

        tokio::fs::write(&output_path, &outcome.archive)
            .await
            .with_context(|| format!("Failed to write output file: {:?}", output_path))?;

        info!("\"{}\" -> \"{}\"", outcome.original_title, outcome.translated_title);
        info!("{}", outcome.stats.summary());
        info!(
            "Success: {} ({})",
            output_path.display(),
            Self::format_duration(start_time.elapsed())
        );
        Ok(output_path)
    }

    /// Run the translator with a progress bar and Ctrl-C cancellation
    async fn translate_with_progress(&self, input: Vec<u8>, file_name: Option<&str>) -> Result<TranslationOutcome> {
        let progress_bar = ProgressBar::new(0);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} sections ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));

        let bar = progress_bar.clone();
        let on_progress: ProgressCallback = Box::new(move |progress: TranslationProgress| {
            bar.set_length(progress.total as u64);
            bar.set_position(progress.current as u64);
            bar.set_message(progress.current_section);
        });

        let cancel = CancellationFlag::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, stopping after the current request...");
                    cancel.cancel();
                }
            })
        };

        let result = self
            .translator
            .translate_named(input, file_name, &self.config.translation, Some(on_progress), &cancel)
            .await;
        interrupt.abort();
        progress_bar.finish_and_clear();

        result.map_err(|e| anyhow!("{} [{}]", e, e.kind().code()))
    }

    /// First path of `name`, `name (1)`, `name (2)`, ... that does not exist yet
    fn unique_path(candidate: PathBuf) -> PathBuf {
        if !candidate.exists() {
            return candidate;
        }

        let stem = candidate
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let directory = candidate.parent().map(Path::to_path_buf).unwrap_or_default();
        let path = (1..)
            .map(|n| directory.join(format!("{} ({}).epub", stem, n)))
            .find(|path| !path.exists())
            .unwrap_or(candidate);
        debug!("Output name taken, using {:?}", path);
        path
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
