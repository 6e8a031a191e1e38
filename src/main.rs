// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, warn};
use std::io::Write;
use std::path::PathBuf;

use epubtl::app_config::{self, Config, ProviderKind};
use epubtl::app_controller::Controller;

/// CLI Wrapper for ProviderKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliProvider {
    Anthropic,
    #[value(name = "openai")]
    OpenAI,
}

impl From<CliProvider> for ProviderKind {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::Anthropic => ProviderKind::Anthropic,
            CliProvider::OpenAI => ProviderKind::OpenAI,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an EPUB book
    Translate(TranslateArgs),

    /// Generate shell completions for epubtl
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// EPUB file to translate
    #[arg(value_name = "INPUT")]
    input_path: PathBuf,

    /// Output file (default: "<translated title>.epub" next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// API token for the provider
    #[arg(long, env = "EPUBTL_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Extra instructions for the translator (tone, glossary, ...)
    #[arg(short, long)]
    instructions: Option<String>,

    /// Target language, as an ISO code (e.g., 'de', 'fra') or a name
    #[arg(short, long)]
    target_language: Option<String>,

    /// Base URL override for the provider API
    #[arg(long)]
    endpoint: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config_path: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// epubtl - EPUB translation with AI
///
/// Translates the text of an EPUB book with Anthropic or OpenAI models while
/// keeping its markup, images and styles untouched.
#[derive(Parser, Debug)]
#[command(name = "epubtl")]
#[command(version)]
#[command(about = "AI-powered EPUB translation tool")]
#[command(long_about = "epubtl translates the text of EPUB books using AI providers.

EXAMPLES:
    epubtl translate book.epub                                  # Translate using conf.json
    epubtl translate -p openai -m gpt-4o -t de book.epub        # Translate into German with OpenAI
    epubtl translate -o out.epub -f book.epub                   # Write to a given file, overwriting it
    epubtl translate -i 'Keep character names' book.epub        # Add instructions for the translator
    epubtl completions bash > epubtl.bash                       # Generate bash completions

CONFIGURATION:
    Configuration is read from conf.json in the working directory, or from
    epubtl/conf.json in the user configuration directory. Use --config-path to
    point at another file; a missing file given that way is created with defaults.
    The API token can also be passed with the EPUBTL_API_TOKEN environment variable.

SUPPORTED PROVIDERS:
    anthropic - Anthropic Messages API (requires API key)
    openai    - OpenAI Chat Completions API (requires API key)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // The logger itself lets everything through; `set_max_level` filters
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "epubtl", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(log_level.to_level_filter());
    }

    let mut config = load_config(&options)?;

    // Override config with CLI options if provided
    if let Some(provider) = &options.provider {
        config.translation.provider = Some(provider.clone().into());
    }
    if let Some(model) = &options.model {
        config.translation.model = Some(model.clone());
    }
    if let Some(api_token) = &options.api_token {
        config.translation.api_token = Some(api_token.clone());
    }
    if let Some(instructions) = &options.instructions {
        config.translation.instructions = Some(instructions.clone());
    }
    if let Some(target_language) = &options.target_language {
        config.translation.target_language = Some(target_language.clone());
    }
    if let Some(endpoint) = &options.endpoint {
        config.translation.endpoint = Some(endpoint.clone());
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    } else {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let controller = Controller::with_config(config)?;
    controller
        .run(options.input_path.clone(), options.output.clone(), options.force_overwrite)
        .await?;

    Ok(())
}

/// Load the configuration file, creating a default one at an explicit but missing path
fn load_config(options: &TranslateArgs) -> Result<Config> {
    match Config::locate(options.config_path.as_deref()) {
        Some(path) if path.exists() => {
            debug!("Using config file {}", path.display());
            Config::load(&path)
        }
        Some(path) => {
            warn!("Config file not found at '{}', creating default config.", path.display());
            let config = Config::default();
            config.save(&path)?;
            Ok(config)
        }
        None => {
            if options.provider.is_none() && options.model.is_none() {
                return Err(anyhow!(
                    "No configuration found. Create conf.json or pass --provider and --model."
                ));
            }
            debug!("No config file found, using command line options only");
            Ok(Config::default())
        }
    }
}
